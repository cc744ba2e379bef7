//   Copyright 2018 Egor Larionov
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

use ffi::{Index, Number};

use crate::status::SolveStatus;

/// Sizes of a non-linear problem.
///
/// These must stay fixed for the duration of a solve and, when warm starting, across solves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    /// Number of optimization variables `n`.
    pub num_variables: usize,
    /// Number of equality and inequality constraints `m`.
    pub num_constraints: usize,
    /// Number of structural non-zeros in the constraint Jacobian.
    pub num_jacobian_non_zeros: usize,
    /// Number of structural non-zeros in the lower triangle of the Lagrangian Hessian.
    pub num_hessian_non_zeros: usize,
}

impl Dimensions {
    /// Dimensions of an unconstrained problem with `n` variables and no Hessian.
    pub fn unconstrained(num_variables: usize) -> Self {
        Dimensions {
            num_variables,
            ..Default::default()
        }
    }
}

/// Final iterate handed to the problem once the engine terminates.
#[derive(Copy, Clone, Debug)]
pub struct Solution<'a> {
    /// Status the engine terminated with.
    pub status: SolveStatus,
    /// Final primal variables `x`.
    pub primal_variables: &'a [Number],
    /// Multipliers of the variable lower bounds `z_L`.
    pub lower_bound_multipliers: &'a [Number],
    /// Multipliers of the variable upper bounds `z_U`.
    pub upper_bound_multipliers: &'a [Number],
    /// Constraint multipliers `lambda`.
    pub constraint_multipliers: &'a [Number],
    /// Constraint values at the final iterate.
    pub constraint_values: &'a [Number],
    /// Objective value at the final iterate.
    pub objective_value: Number,
}

/// The non-linear problem to be solved by Ipopt.
///
/// Every output buffer handed to these methods is already sized according to `dimensions`.
/// Evaluation methods are preceded by a call to `extract` with the current iterate, so the
/// problem can refresh any state derived from `x` only when `is_new_x` is set and reuse it
/// otherwise.
///
/// Methods returning `bool` are allowed to fail. Returning `false` tells Ipopt that the value could
/// not be produced at this point, which it may handle by cutting back the step.
///
/// The constraint and Hessian methods have empty default implementations, which suits
/// unconstrained problems solved with a limited-memory Hessian approximation.
pub trait Nlp {
    /// Problem sizes. Queried once at the start of every solve.
    fn dimensions(&self) -> Dimensions;

    /// Fill the variable bounds. Use `±1e19` or beyond for unbounded variables.
    fn variable_bounds(&self, x_l: &mut [Number], x_u: &mut [Number]) -> bool;

    /// Fill the constraint bounds. Equality constraints have equal lower and upper bounds.
    fn constraint_bounds(&self, _g_l: &mut [Number], _g_u: &mut [Number]) -> bool {
        true
    }

    /// Fill the starting point. For warm starts this is typically the previous solution.
    fn initial_point(&self, x: &mut [Number]) -> bool;

    /// Fill the starting bound multipliers. Only requested when warm starting.
    fn initial_bound_multipliers(&self, z_l: &mut [Number], z_u: &mut [Number]) -> bool {
        z_l.fill(0.0);
        z_u.fill(0.0);
        true
    }

    /// Fill the starting constraint multipliers. Only requested when warm starting.
    fn initial_constraint_multipliers(&self, lambda: &mut [Number]) -> bool {
        lambda.fill(0.0);
        true
    }

    /// Take the current iterate before any evaluation.
    fn extract(&mut self, x: &[Number], is_new_x: bool);

    /// Objective value at the last extracted iterate.
    fn objective(&mut self, obj: &mut Number) -> bool;

    /// Objective gradient at the last extracted iterate.
    fn objective_gradient(&mut self, grad_f: &mut [Number]) -> bool;

    /// Constraint values at the last extracted iterate, in the order of `constraint_bounds`.
    fn constraints(&mut self, _g: &mut [Number]) -> bool {
        true
    }

    /// Row and column indices (zero-based) of the constraint Jacobian non-zeros.
    fn jacobian_sparsity(&self, _rows: &mut [Index], _cols: &mut [Index]) -> bool {
        true
    }

    /// Jacobian values in the order given by `jacobian_sparsity`.
    fn jacobian_values(&mut self, _vals: &mut [Number]) -> bool {
        true
    }

    /// Row and column indices (zero-based) of the Lagrangian Hessian non-zeros.
    /// This is a symmetric matrix, list the lower left triangle only (`row >= col`).
    fn hessian_sparsity(&self, _rows: &mut [Index], _cols: &mut [Index]) -> bool {
        true
    }

    /// Values of `obj_factor * ∇²f + Σ lambda[i] * ∇²g[i]` in the order given by
    /// `hessian_sparsity`.
    fn hessian_values(
        &mut self,
        _obj_factor: Number,
        _lambda: &[Number],
        _vals: &mut [Number],
    ) -> bool {
        true
    }

    /// Retain the final iterate. Called exactly once per solve that reaches the engine.
    fn accept_solution(&mut self, solution: Solution<'_>);
}
