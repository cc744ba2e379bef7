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

//! Problems shared by the unit tests.

use ffi::{Index, Number};

use crate::problem::{Dimensions, Nlp, Solution};

/// minimize x0² + x0·x1 + 2·x1² subject to x0 + x1 = 1, x ≥ 0.
///
/// The solution is x = (0.75, 0.25) with objective 0.875.
#[derive(Debug, Default)]
pub struct Quadratic {
    pub x: Vec<Number>,
    /// `is_new_x` of every `extract` call.
    pub extracted: Vec<bool>,
    pub solution: Option<Vec<Number>>,
    pub accepted: usize,
    pub iterations: usize,

    // Defects to inject.
    pub upper_hessian: bool,
    pub jacobian_row_offset: Index,
    pub nan_objective: bool,
    pub fail_gradient: bool,
}

impl Nlp for Quadratic {
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            num_variables: 2,
            num_constraints: 1,
            num_jacobian_non_zeros: 2,
            num_hessian_non_zeros: 3,
        }
    }
    fn variable_bounds(&self, x_l: &mut [Number], x_u: &mut [Number]) -> bool {
        x_l.fill(0.0);
        x_u.fill(1e20);
        true
    }
    fn constraint_bounds(&self, g_l: &mut [Number], g_u: &mut [Number]) -> bool {
        g_l[0] = 1.0;
        g_u[0] = 1.0;
        true
    }
    fn initial_point(&self, x: &mut [Number]) -> bool {
        x.fill(0.5);
        true
    }
    fn extract(&mut self, x: &[Number], is_new_x: bool) {
        self.extracted.push(is_new_x);
        if is_new_x {
            self.x = x.to_vec();
        }
    }
    fn objective(&mut self, obj: &mut Number) -> bool {
        let x = &self.x;
        *obj = if self.nan_objective {
            Number::NAN
        } else {
            x[0] * x[0] + x[0] * x[1] + 2.0 * x[1] * x[1]
        };
        true
    }
    fn objective_gradient(&mut self, grad_f: &mut [Number]) -> bool {
        if self.fail_gradient {
            return false;
        }
        let x = &self.x;
        grad_f[0] = 2.0 * x[0] + x[1];
        grad_f[1] = x[0] + 4.0 * x[1];
        true
    }
    fn constraints(&mut self, g: &mut [Number]) -> bool {
        g[0] = self.x[0] + self.x[1];
        true
    }
    fn jacobian_sparsity(&self, rows: &mut [Index], cols: &mut [Index]) -> bool {
        rows[0] = self.jacobian_row_offset;
        cols[0] = 0;
        rows[1] = self.jacobian_row_offset;
        cols[1] = 1;
        true
    }
    fn jacobian_values(&mut self, vals: &mut [Number]) -> bool {
        vals[0] = 1.0;
        vals[1] = 1.0;
        true
    }
    fn hessian_sparsity(&self, rows: &mut [Index], cols: &mut [Index]) -> bool {
        rows.copy_from_slice(&[0, 1, 1]);
        cols.copy_from_slice(&[0, 0, 1]);
        if self.upper_hessian {
            rows.swap_with_slice(cols);
        }
        true
    }
    fn hessian_values(&mut self, obj_factor: Number, _lambda: &[Number], vals: &mut [Number]) -> bool {
        // The constraint is linear.
        vals[0] = obj_factor * 2.0;
        vals[1] = obj_factor;
        vals[2] = obj_factor * 4.0;
        true
    }
    fn accept_solution(&mut self, solution: Solution<'_>) {
        self.solution = Some(solution.primal_variables.to_vec());
        self.accepted += 1;
    }
}
