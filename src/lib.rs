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

//! Solve a generic non-linear program with [Ipopt](https://github.com/coin-or/Ipopt).
//!
//! Implement [`Nlp`] for your problem and hand it to an [`IpoptSolver`]. The solver reports the
//! problem to Ipopt, serves Ipopt's callbacks through an [`NlpAdapter`] and passes the final
//! iterate back through [`Nlp::accept_solution`]. A converged solve can be followed by a warm
//! started one via [`IpoptSolver::prepare_warm_start`].
//!
//! ```no_run
//! use ipopt_nlp::*;
//!
//! /// minimize (x - 1)^2
//! struct Parabola {
//!     x: Number,
//!     solution: Number,
//! }
//!
//! impl Nlp for Parabola {
//!     fn dimensions(&self) -> Dimensions {
//!         Dimensions::unconstrained(1)
//!     }
//!     fn variable_bounds(&self, x_l: &mut [Number], x_u: &mut [Number]) -> bool {
//!         x_l[0] = -10.0;
//!         x_u[0] = 10.0;
//!         true
//!     }
//!     fn initial_point(&self, x: &mut [Number]) -> bool {
//!         x[0] = 5.0;
//!         true
//!     }
//!     fn extract(&mut self, x: &[Number], _is_new_x: bool) {
//!         self.x = x[0];
//!     }
//!     fn objective(&mut self, obj: &mut Number) -> bool {
//!         *obj = (self.x - 1.0) * (self.x - 1.0);
//!         true
//!     }
//!     fn objective_gradient(&mut self, grad_f: &mut [Number]) -> bool {
//!         grad_f[0] = 2.0 * (self.x - 1.0);
//!         true
//!     }
//!     fn accept_solution(&mut self, solution: Solution<'_>) {
//!         self.solution = solution.primal_variables[0];
//!     }
//! }
//!
//! let mut settings = IpoptSettings::default();
//! settings.print_level = 0;
//! let mut solver = IpoptSolver::new(Parabola { x: 0.0, solution: 0.0 }, settings);
//! let report = solver.solve().expect("Ipopt failed to initialize");
//! assert!(report.succeeded());
//! ```

extern crate ipopt_sys as ffi;

mod adapter;
mod callbacks;
mod engine;
mod error;
mod problem;
mod settings;
mod solver;
mod status;
pub mod view;

#[cfg(test)]
mod fixtures;

pub use adapter::{IndexingStyle, NlpAdapter, NlpInfo, Phase, SparseOutput};
pub use callbacks::{AlgorithmMode, IntermediateCallback, IntermediateCallbackData};
pub use error::{AdapterError, SettingsError, SolverError};
pub use ffi::{Index, Int, Number};
pub use problem::{Dimensions, Nlp, Solution};
pub use settings::{IpoptSettings, OptionValue};
pub use solver::{warm_start_options, IpoptSolver, SolveReport, SolverState};
pub use status::{Outcome, SolveStatus};
