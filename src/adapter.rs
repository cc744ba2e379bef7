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

//! The callback protocol Ipopt drives during a solve, served from an `Nlp`.
//!
//! Every operation here works on borrowed slices. The raw `extern "C"` entry points in
//! `callbacks` wrap the engine's buffers and forward to these methods, and the lifecycle
//! controller calls the setup operations directly.

use ffi::{Index, Number};
use tracing::{debug, trace};

use crate::error::AdapterError;
use crate::problem::{Dimensions, Nlp, Solution};

/// Indexing of the sparsity arrays handed to Ipopt. Only zero-based (C style) indices are
/// produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexingStyle {
    CStyle = 0,
}

/// What a sparse matrix callback is asked to produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Row and column indices of the non-zeros.
    Structure,
    /// Numeric values of the non-zeros at the current iterate.
    Values,
}

/// Output target of a sparse matrix callback. Exactly one of the two is ever filled per call.
#[derive(Debug)]
pub enum SparseOutput<'a> {
    Structure {
        rows: &'a mut [Index],
        cols: &'a mut [Index],
    },
    Values(&'a mut [Number]),
}

impl SparseOutput<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            SparseOutput::Structure { .. } => Phase::Structure,
            SparseOutput::Values(_) => Phase::Values,
        }
    }
}

/// Answer to `get_nlp_info`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NlpInfo {
    pub dimensions: Dimensions,
    pub index_style: IndexingStyle,
}

/// Serves Ipopt's callbacks from a borrowed problem.
///
/// The adapter keeps nothing but the reference and the dimensions reported by the last
/// `get_nlp_info`, which every later call is checked against.
pub struct NlpAdapter<'a, P: ?Sized> {
    nlp: &'a mut P,
    info: Option<NlpInfo>,
}

impl<'a, P: Nlp + ?Sized> NlpAdapter<'a, P> {
    pub fn new(nlp: &'a mut P) -> Self {
        NlpAdapter { nlp, info: None }
    }

    pub fn nlp(&self) -> &P {
        self.nlp
    }

    pub fn nlp_mut(&mut self) -> &mut P {
        self.nlp
    }

    /// Dimensions reported by the last `get_nlp_info`, if any.
    pub fn info(&self) -> Option<NlpInfo> {
        self.info
    }

    fn dimensions(&self) -> Result<Dimensions, AdapterError> {
        self.info
            .map(|info| info.dimensions)
            .ok_or(AdapterError::MissingNlpInfo)
    }

    /// Query the problem sizes. These stay fixed until the next call.
    pub fn get_nlp_info(&mut self) -> NlpInfo {
        let info = NlpInfo {
            dimensions: self.nlp.dimensions(),
            index_style: IndexingStyle::CStyle,
        };
        debug!(
            n = info.dimensions.num_variables,
            m = info.dimensions.num_constraints,
            nnz_jac = info.dimensions.num_jacobian_non_zeros,
            nnz_hess = info.dimensions.num_hessian_non_zeros,
            "nlp info"
        );
        self.info = Some(info);
        info
    }

    pub fn get_bounds_info(
        &mut self,
        x_l: &mut [Number],
        x_u: &mut [Number],
        g_l: &mut [Number],
        g_u: &mut [Number],
    ) -> Result<(), AdapterError> {
        trace!("get_bounds_info");
        let dims = self.dimensions()?;
        check_len("x_l", dims.num_variables, x_l.len())?;
        check_len("x_u", dims.num_variables, x_u.len())?;
        check_len("g_l", dims.num_constraints, g_l.len())?;
        check_len("g_u", dims.num_constraints, g_u.len())?;

        succeed(self.nlp.variable_bounds(x_l, x_u), "variable bounds")?;
        succeed(self.nlp.constraint_bounds(g_l, g_u), "constraint bounds")
    }

    /// Fill the requested parts of the starting point. A `None` buffer is never touched.
    pub fn get_starting_point(
        &mut self,
        x: Option<&mut [Number]>,
        z: Option<(&mut [Number], &mut [Number])>,
        lambda: Option<&mut [Number]>,
    ) -> Result<(), AdapterError> {
        trace!(
            init_x = x.is_some(),
            init_z = z.is_some(),
            init_lambda = lambda.is_some(),
            "get_starting_point"
        );
        let dims = self.dimensions()?;

        if let Some(x) = x {
            check_len("x", dims.num_variables, x.len())?;
            succeed(self.nlp.initial_point(x), "initial point")?;
            check_finite("x", x)?;
        }

        if let Some((z_l, z_u)) = z {
            check_len("z_l", dims.num_variables, z_l.len())?;
            check_len("z_u", dims.num_variables, z_u.len())?;
            succeed(
                self.nlp.initial_bound_multipliers(z_l, z_u),
                "initial bound multipliers",
            )?;
            check_finite("z_l", z_l)?;
            check_finite("z_u", z_u)?;
        }

        if let Some(lambda) = lambda {
            check_len("lambda", dims.num_constraints, lambda.len())?;
            succeed(
                self.nlp.initial_constraint_multipliers(lambda),
                "initial constraint multipliers",
            )?;
            check_finite("lambda", lambda)?;
        }

        Ok(())
    }

    fn extract(&mut self, x: &[Number], new_x: bool) -> Result<Dimensions, AdapterError> {
        let dims = self.dimensions()?;
        check_len("x", dims.num_variables, x.len())?;
        self.nlp.extract(x, new_x);
        Ok(dims)
    }

    pub fn eval_f(&mut self, x: &[Number], new_x: bool) -> Result<Number, AdapterError> {
        trace!(new_x, "eval_f");
        self.extract(x, new_x)?;
        let mut obj = 0.0;
        succeed(self.nlp.objective(&mut obj), "objective")?;
        check_finite("objective", std::slice::from_ref(&obj))?;
        Ok(obj)
    }

    pub fn eval_grad_f(
        &mut self,
        x: &[Number],
        new_x: bool,
        grad_f: &mut [Number],
    ) -> Result<(), AdapterError> {
        trace!(new_x, "eval_grad_f");
        let dims = self.extract(x, new_x)?;
        check_len("grad_f", dims.num_variables, grad_f.len())?;
        succeed(self.nlp.objective_gradient(grad_f), "objective gradient")?;
        check_finite("grad_f", grad_f)
    }

    pub fn eval_g(&mut self, x: &[Number], new_x: bool, g: &mut [Number]) -> Result<(), AdapterError> {
        trace!(new_x, "eval_g");
        let dims = self.extract(x, new_x)?;
        check_len("g", dims.num_constraints, g.len())?;
        succeed(self.nlp.constraints(g), "constraints")?;
        check_finite("g", g)
    }

    /// Constraint Jacobian. The iterate is only extracted in the values phase; Ipopt passes no
    /// `x` when it asks for the structure.
    pub fn eval_jac_g(
        &mut self,
        x: &[Number],
        new_x: bool,
        output: SparseOutput<'_>,
    ) -> Result<(), AdapterError> {
        trace!(phase = ?output.phase(), new_x, "eval_jac_g");
        let dims = self.dimensions()?;
        let nnz = dims.num_jacobian_non_zeros;
        match output {
            SparseOutput::Structure { rows, cols } => {
                check_len("jacobian rows", nnz, rows.len())?;
                check_len("jacobian cols", nnz, cols.len())?;
                succeed(
                    self.nlp.jacobian_sparsity(rows, cols),
                    "jacobian sparsity",
                )?;
                check_pattern(
                    "jacobian",
                    rows,
                    cols,
                    dims.num_constraints,
                    dims.num_variables,
                    false,
                )
            }
            SparseOutput::Values(vals) => {
                self.extract(x, new_x)?;
                check_len("jacobian values", nnz, vals.len())?;
                succeed(self.nlp.jacobian_values(vals), "jacobian values")?;
                check_finite("jacobian values", vals)
            }
        }
    }

    /// Lower triangle of the Lagrangian Hessian
    /// `obj_factor * ∇²f(x) + Σ lambda[i] * ∇²g[i](x)`.
    pub fn eval_h(
        &mut self,
        x: &[Number],
        new_x: bool,
        obj_factor: Number,
        lambda: &[Number],
        new_lambda: bool,
        output: SparseOutput<'_>,
    ) -> Result<(), AdapterError> {
        trace!(phase = ?output.phase(), new_x, new_lambda, "eval_h");
        let dims = self.dimensions()?;
        let nnz = dims.num_hessian_non_zeros;
        match output {
            SparseOutput::Structure { rows, cols } => {
                check_len("hessian rows", nnz, rows.len())?;
                check_len("hessian cols", nnz, cols.len())?;
                succeed(self.nlp.hessian_sparsity(rows, cols), "hessian sparsity")?;
                check_pattern(
                    "hessian",
                    rows,
                    cols,
                    dims.num_variables,
                    dims.num_variables,
                    true,
                )
            }
            SparseOutput::Values(vals) => {
                self.extract(x, new_x)?;
                check_len("lambda", dims.num_constraints, lambda.len())?;
                check_len("hessian values", nnz, vals.len())?;
                succeed(
                    self.nlp.hessian_values(obj_factor, lambda, vals),
                    "hessian values",
                )?;
                check_finite("hessian values", vals)
            }
        }
    }

    /// Hand the final iterate to the problem.
    pub fn finalize_solution(&mut self, solution: Solution<'_>) -> Result<(), AdapterError> {
        trace!(status = %solution.status, "finalize_solution");
        let dims = self.dimensions()?;
        check_len("x", dims.num_variables, solution.primal_variables.len())?;
        check_len("z_l", dims.num_variables, solution.lower_bound_multipliers.len())?;
        check_len("z_u", dims.num_variables, solution.upper_bound_multipliers.len())?;
        check_len("lambda", dims.num_constraints, solution.constraint_multipliers.len())?;
        check_len("g", dims.num_constraints, solution.constraint_values.len())?;
        self.nlp.accept_solution(solution);
        Ok(())
    }
}

fn succeed(ok: bool, what: &'static str) -> Result<(), AdapterError> {
    if ok {
        Ok(())
    } else {
        Err(AdapterError::Evaluation(what))
    }
}

fn check_len(quantity: &'static str, expected: usize, actual: usize) -> Result<(), AdapterError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AdapterError::DimensionMismatch {
            quantity,
            expected,
            actual,
        })
    }
}

fn check_finite(quantity: &'static str, values: &[Number]) -> Result<(), AdapterError> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(index) => Err(AdapterError::NonFinite {
            quantity,
            index,
            value: values[index],
        }),
    }
}

/// Zero-based indices must lie inside the matrix and, for the Hessian, on or below the diagonal.
fn check_pattern(
    quantity: &'static str,
    rows: &[Index],
    cols: &[Index],
    num_rows: usize,
    num_cols: usize,
    lower_triangular: bool,
) -> Result<(), AdapterError> {
    for (entry, (&row, &col)) in rows.iter().zip(cols.iter()).enumerate() {
        if row < 0 || col < 0 || row as usize >= num_rows || col as usize >= num_cols {
            return Err(AdapterError::IndexOutOfRange {
                quantity,
                entry,
                row,
                col,
            });
        }
        if lower_triangular && row < col {
            return Err(AdapterError::UpperTriangularEntry { entry, row, col });
        }
    }
    Ok(())
}
