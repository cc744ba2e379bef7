//   Copyright 2020 Egor Larionov
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

//! In this example we demonstrate how a quadratic function can be minimized subject to a
//! non-linear constraint.
//!
//! Additionally, this example shows how discontinuities in the constraint Jacobian can cause
//! instabilities and ultimately a failed optimization. Set `RUST_LOG=debug` to see the solver
//! lifecycle.

use ipopt_nlp::*;
use tracing_subscriber::EnvFilter;

/// Non-linear problem to be solved.
struct NLP<C, J, H> {
    /// Constraint function.
    ///
    /// This function is a map from R^2 to R.
    pub constraint_f: C,
    /// Constraint Jacobian.
    pub constraint_jac: J,
    /// Constraint Hessian.
    pub constraint_hess: H,
    /// Current iterate.
    pub x: [Number; 2],
    /// Final iterate of the last solve.
    pub solution: [Number; 2],
    /// Keep track of the number of iterations for each solve.
    pub iterations: usize,
}

impl<C, J, H> NLP<C, J, H> {
    fn new(constraint_f: C, constraint_jac: J, constraint_hess: H) -> Self {
        NLP {
            constraint_f,
            constraint_jac,
            constraint_hess,
            x: [0.0; 2],
            solution: [0.0; 2],
            iterations: 0,
        }
    }

    fn count_iterations_cb(&mut self, data: IntermediateCallbackData) -> bool {
        self.iterations = data.iter_count as usize;
        true
    }
}

impl<C, J, H> Nlp for NLP<C, J, H>
where
    C: Fn(f64, f64) -> f64,
    J: Fn(f64, f64) -> [f64; 2],
    H: Fn(f64, f64) -> [f64; 3], // Lower triangular [H00, H11, H10]
{
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            num_variables: 2,
            num_constraints: 1,
            num_jacobian_non_zeros: 2,
            // In reality the Hessian is rather sparse, but we will include all entries for
            // simplicity. 3 for objective Hessian and 3 for constraint Hessian.
            num_hessian_non_zeros: 3 + 3,
        }
    }
    fn variable_bounds(&self, x_l: &mut [Number], x_u: &mut [Number]) -> bool {
        x_l.fill(-1e20);
        x_u.fill(1e20);
        true
    }
    fn constraint_bounds(&self, g_l: &mut [Number], g_u: &mut [Number]) -> bool {
        g_l[0] = 0.0;
        g_u[0] = 1e20;
        true
    }
    fn initial_point(&self, x: &mut [Number]) -> bool {
        x[0] = 0.5;
        x[1] = 0.8;
        true
    }
    fn extract(&mut self, x: &[Number], _is_new_x: bool) {
        self.x.copy_from_slice(x);
    }
    fn objective(&mut self, obj: &mut Number) -> bool {
        *obj = quadratic(self.x[0], self.x[1]);
        true
    }
    fn objective_gradient(&mut self, grad_f: &mut [Number]) -> bool {
        grad_f.copy_from_slice(&quadratic_grad(self.x[0], self.x[1]));
        true
    }
    fn constraints(&mut self, g: &mut [Number]) -> bool {
        g[0] = (self.constraint_f)(self.x[0], self.x[1]);
        true
    }
    fn jacobian_sparsity(&self, rows: &mut [Index], cols: &mut [Index]) -> bool {
        rows.copy_from_slice(&[0, 0]);
        cols.copy_from_slice(&[0, 1]);
        true
    }
    fn jacobian_values(&mut self, vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&(self.constraint_jac)(self.x[0], self.x[1]));
        true
    }
    fn hessian_sparsity(&self, rows: &mut [Index], cols: &mut [Index]) -> bool {
        // Objective entries followed by constraint entries, both as [H00, H11, H10].
        rows.copy_from_slice(&[0, 1, 1, 0, 1, 1]);
        cols.copy_from_slice(&[0, 1, 0, 0, 1, 0]);
        true
    }
    fn hessian_values(&mut self, obj_factor: Number, lambda: &[Number], vals: &mut [Number]) -> bool {
        let obj_hess = quadratic_hessian(self.x[0], self.x[1]);
        let constraint_hess = (self.constraint_hess)(self.x[0], self.x[1]);
        for i in 0..3 {
            vals[i] = obj_hess[i] * obj_factor;
            vals[3 + i] = constraint_hess[i] * lambda[0];
        }
        true
    }
    fn accept_solution(&mut self, solution: Solution<'_>) {
        self.solution.copy_from_slice(solution.primal_variables);
    }
}

fn settings() -> IpoptSettings {
    let mut settings = IpoptSettings::default().with_option("mu_strategy", "adaptive");
    settings.tol = 1e-7;
    settings.hessian_approximation = "exact".to_string();
    settings
}

/// A signed distance field to the absolute value function.
///
/// This function has a cusp at `x = 0`, where it is not differentiable for any `y`.
fn abs_sdf(x: f64, y: f64) -> f64 {
    (y-x).min(x+y)/2.0_f64.sqrt()
}

/// Jacobian of the `abs_sdf` function.
fn abs_sdf_jacobian(x: f64, _y: f64) -> [f64; 2] {
    // Disambiguate the jacobian at x=0 to coincide with the jacobian in x > 0.
    let sqrt2 = 2.0_f64.sqrt();
    if x > 0.0 {
        [-1.0/sqrt2, 1.0/sqrt2]
    } else {
        [1.0/sqrt2, 1.0/sqrt2]
    }
}

// Note that the hessian of `abs_sdf` is zero.

/// A smoothed version of the absolute value function field `abs_sdf`.
fn smoothed_abs_sdf(x: f64, y: f64, eps: f64) -> f64 {
    if -x.abs() + 2.0*eps > y {
        // Near the cusp we use a circle arc as an approximation.
        let y_minus_2_eps = y - 2.0 * eps;
        eps*2.0_f64.sqrt() - (x*x + y_minus_2_eps * y_minus_2_eps).sqrt()
    } else {
        abs_sdf(x, y)
    }
}

/// Jacobian of the `smoothed_abs_sdf` function.
fn smoothed_abs_sdf_jacobian(x: f64, y: f64, eps: f64) -> [f64; 2] {
    if -x.abs() + 2.0*eps > y {
        let y_minus_2_eps = y - 2.0 * eps;
        let factor = -1.0/(x*x + y_minus_2_eps * y_minus_2_eps).sqrt();
        [factor * x, factor * y_minus_2_eps]
    } else {
        abs_sdf_jacobian(x, y)
    }
}

/// The lower triangular part of the Hessian of the `smoothed_abs_sdf` function.
///
/// The returned array contains the lower triangular entries [H00, H11, H10].
fn smoothed_abs_sdf_hessian(x: f64, y: f64, eps: f64) -> [f64; 3] {
    if -x.abs() + 2.0*eps > y {
        let y_minus_2_eps = y - 2.0 * eps;
        let f = x*x + y_minus_2_eps * y_minus_2_eps;
        let factor1 = -1.0/f.sqrt();
        let factor2 = 1.0/(f*f.sqrt());
        [factor1 + factor2 * x * x, factor1 + factor2 * y_minus_2_eps * y_minus_2_eps, factor2 * y_minus_2_eps * x]
    } else {
        [0.0; 3]
    }
}

/// The quadratic function to be minimized.
///
/// This function attains a minimum at (0, -1), and increases parabolically away from that point.
fn quadratic(x: f64, y: f64) -> f64 {
    0.25 * (x * x + (y + 1.0) * (y + 1.0))
}

/// The gradient of the `quadratic`.
fn quadratic_grad(x: f64, y: f64) -> [f64; 2] {
    [0.5 * x, 0.5 * (y + 1.0)]
}

/// The lower triangular part of the Hessian of the `quadratic`.
///
/// The returned array contains the lower triangular entries [H00, H11, H10].
fn quadratic_hessian(_x: f64, _y: f64) -> [f64; 3] {
    [ 0.5, 0.5, 0.0 ]
}

fn main() -> Result<(), SolverError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // First, let us try to minimize the `quadratic` subject to the non-smooth constraint
    // `abs_sdf(x,y) => 0`.
    let non_smooth_constraint_nlp = NLP::new(abs_sdf, abs_sdf_jacobian, |_, _| [0.0; 3]);

    let mut settings = settings();
    settings.max_iter = 1000;
    let mut ipopt = IpoptSolver::new(non_smooth_constraint_nlp, settings);
    ipopt.set_intermediate_callback(Some(NLP::count_iterations_cb));
    let report = ipopt.solve()?;

    if report.status == SolveStatus::MaximumIterationsExceeded {
        eprintln!("Solve did not converge after {} steps.", report.iterations);
    } else {
        eprintln!("Solve stopped with {} after {} steps.", report.status, report.iterations);
    }
    eprintln!("The final result was x: {:?}", ipopt.nlp().solution);

    // We could replace the single absolute value constraint with two linear constraints to fix
    // convergence.  However this is not always desirable or possible with more complex functions.
    // So in this example, to improve convergence, we will smooth the cusp slightly, preserving the
    // total number of constraints.
    // Try smaller values of epsilon to see at which point it starts to affect convergence.
    let epsilon = 0.1;
    let smooth_constraint_nlp = NLP::new(
        |x, y| smoothed_abs_sdf(x, y, epsilon),
        |x, y| smoothed_abs_sdf_jacobian(x, y, epsilon),
        |x, y| smoothed_abs_sdf_hessian(x, y, epsilon),
    );

    let mut ipopt = IpoptSolver::new(smooth_constraint_nlp, self::settings());
    ipopt.set_intermediate_callback(Some(NLP::count_iterations_cb));
    let report = ipopt.solve()?;

    eprintln!(
        "Solve finished with {} after {} iterations at x: {:?}",
        report.status,
        ipopt.nlp().iterations,
        ipopt.nlp().solution
    );
    Ok(())
}
