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

//! Problem 71 of the Hock-Schittkowski test suite, solved with exact second derivatives.

use approx::assert_relative_eq;

use ipopt_nlp::*;

struct NLP {
    g_offset: [f64; 2],
    iterations: usize,
    accepted: usize,
    x: Vec<f64>,
    x_start: Vec<f64>,      // Save variable results for warm start
    z_l_start: Vec<f64>,    // Save lower bound multipliers for warm start
    z_u_start: Vec<f64>,    // Save upper bound multipliers for warm start
    lambda_start: Vec<f64>, // Save constraint multipliers for warm start
}

impl NLP {
    fn new() -> Self {
        NLP {
            g_offset: [0.0, 0.0],
            iterations: 0,
            accepted: 0,
            x: vec![0.0; 4],
            x_start: vec![1.0, 5.0, 5.0, 1.0],
            z_l_start: Vec::new(),
            z_u_start: Vec::new(),
            lambda_start: Vec::new(),
        }
    }
    fn intermediate_cb(&mut self, data: IntermediateCallbackData) -> bool {
        self.count_iterations_cb(data);
        data.inf_pr >= 1e-4
    }
    fn count_iterations_cb(&mut self, data: IntermediateCallbackData) -> bool {
        self.iterations = data.iter_count as usize;
        true
    }
}

impl Nlp for NLP {
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            num_variables: 4,
            num_constraints: 2,
            num_jacobian_non_zeros: 8,
            num_hessian_non_zeros: 10,
        }
    }
    fn variable_bounds(&self, x_l: &mut [Number], x_u: &mut [Number]) -> bool {
        x_l.fill(1.0);
        x_u.fill(5.0);
        true
    }
    fn constraint_bounds(&self, g_l: &mut [Number], g_u: &mut [Number]) -> bool {
        g_l.copy_from_slice(&[25.0, 40.0]);
        g_u.copy_from_slice(&[2.0e19, 40.0]);
        true
    }
    fn initial_point(&self, x: &mut [Number]) -> bool {
        x.copy_from_slice(&self.x_start);
        true
    }
    fn initial_bound_multipliers(&self, z_l: &mut [Number], z_u: &mut [Number]) -> bool {
        if self.z_l_start.len() != 4 || self.z_u_start.len() != 4 {
            return false;
        }
        z_l.copy_from_slice(&self.z_l_start);
        z_u.copy_from_slice(&self.z_u_start);
        true
    }
    fn initial_constraint_multipliers(&self, lambda: &mut [Number]) -> bool {
        if self.lambda_start.len() != 2 {
            return false;
        }
        lambda.copy_from_slice(&self.lambda_start);
        true
    }
    fn extract(&mut self, x: &[Number], is_new_x: bool) {
        if is_new_x {
            self.x.copy_from_slice(x);
        }
    }
    fn objective(&mut self, obj: &mut Number) -> bool {
        let x = &self.x;
        *obj = x[0] * x[3] * (x[0] + x[1] + x[2]) + x[2];
        true
    }
    fn objective_gradient(&mut self, grad_f: &mut [Number]) -> bool {
        let x = &self.x;
        grad_f[0] = x[0] * x[3] + x[3] * (x[0] + x[1] + x[2]);
        grad_f[1] = x[0] * x[3];
        grad_f[2] = x[0] * x[3] + 1.0;
        grad_f[3] = x[0] * (x[0] + x[1] + x[2]);
        true
    }
    fn constraints(&mut self, g: &mut [Number]) -> bool {
        let x = &self.x;
        g[0] = x[0] * x[1] * x[2] * x[3] + self.g_offset[0];
        g[1] = x[0] * x[0] + x[1] * x[1] + x[2] * x[2] + x[3] * x[3] + self.g_offset[1];
        true
    }
    fn jacobian_sparsity(&self, irow: &mut [Index], jcol: &mut [Index]) -> bool {
        // Dense 2x4 jacobian.
        for idx in 0..8 {
            irow[idx] = (idx / 4) as Index;
            jcol[idx] = (idx % 4) as Index;
        }
        true
    }
    fn jacobian_values(&mut self, vals: &mut [Number]) -> bool {
        let x = &self.x;
        vals[0] = x[1] * x[2] * x[3]; /* 0,0 */
        vals[1] = x[0] * x[2] * x[3]; /* 0,1 */
        vals[2] = x[0] * x[1] * x[3]; /* 0,2 */
        vals[3] = x[0] * x[1] * x[2]; /* 0,3 */

        vals[4] = 2.0 * x[0]; /* 1,0 */
        vals[5] = 2.0 * x[1]; /* 1,1 */
        vals[6] = 2.0 * x[2]; /* 1,2 */
        vals[7] = 2.0 * x[3]; /* 1,3 */
        true
    }
    fn hessian_sparsity(&self, irow: &mut [Index], jcol: &mut [Index]) -> bool {
        let mut idx = 0;
        for row in 0..4 {
            for col in 0..row + 1 {
                irow[idx] = row;
                jcol[idx] = col;
                idx += 1;
            }
        }
        true
    }
    fn hessian_values(&mut self, obj_factor: Number, lambda: &[Number], vals: &mut [Number]) -> bool {
        let x = &self.x;
        vals[0] = obj_factor * 2.0 * x[3]; /* 0,0 */

        vals[1] = obj_factor * x[3]; /* 1,0 */
        vals[2] = 0.0; /* 1,1 */

        vals[3] = obj_factor * x[3]; /* 2,0 */
        vals[4] = 0.0; /* 2,1 */
        vals[5] = 0.0; /* 2,2 */

        vals[6] = obj_factor * (2.0 * x[0] + x[1] + x[2]); /* 3,0 */
        vals[7] = obj_factor * x[0]; /* 3,1 */
        vals[8] = obj_factor * x[0]; /* 3,2 */
        vals[9] = 0.0; /* 3,3 */

        /* add the portion for the first constraint */
        vals[1] += lambda[0] * (x[2] * x[3]); /* 1,0 */

        vals[3] += lambda[0] * (x[1] * x[3]); /* 2,0 */
        vals[4] += lambda[0] * (x[0] * x[3]); /* 2,1 */

        vals[6] += lambda[0] * (x[1] * x[2]); /* 3,0 */
        vals[7] += lambda[0] * (x[0] * x[2]); /* 3,1 */
        vals[8] += lambda[0] * (x[0] * x[1]); /* 3,2 */

        /* add the portion for the second constraint */
        vals[0] += lambda[1] * 2.0; /* 0,0 */
        vals[2] += lambda[1] * 2.0; /* 1,1 */
        vals[5] += lambda[1] * 2.0; /* 2,2 */
        vals[9] += lambda[1] * 2.0; /* 3,3 */
        true
    }
    // Keep the solution around for warm starts.
    fn accept_solution(&mut self, solution: Solution<'_>) {
        self.accepted += 1;
        self.x_start = solution.primal_variables.to_vec();
        self.z_l_start = solution.lower_bound_multipliers.to_vec();
        self.z_u_start = solution.upper_bound_multipliers.to_vec();
        self.lambda_start = solution.constraint_multipliers.to_vec();
    }
}

fn settings() -> IpoptSettings {
    let mut settings = IpoptSettings::default()
        .with_option("mu_strategy", "adaptive")
        .with_option("sb", "yes"); // suppress license message
    settings.tol = 1e-7;
    settings.hessian_approximation = "exact".to_string();
    settings.print_level = 0; // suppress debug output
    settings
}

fn hs071() -> IpoptSolver<NLP> {
    IpoptSolver::new(NLP::new(), settings())
}

#[test]
fn hs071_user_interrupt_test() {
    let mut ipopt = hs071();
    ipopt.set_intermediate_callback(Some(NLP::intermediate_cb));

    let report = ipopt.solve().unwrap();

    assert_eq!(report.status, SolveStatus::UserRequestedStop);
    assert_eq!(report.outcome(), Outcome::Failed);
    assert!(!report.succeeded());
    assert_eq!(ipopt.state(), SolverState::Failed);

    // The interrupted iterate is still handed over, exactly once.
    let problem = ipopt.nlp();
    assert_eq!(problem.accepted, 1);
    assert_eq!(report.iterations, problem.iterations);
    assert!(report.iterations > 0);

    let x = &problem.x_start;
    assert_relative_eq!(x[0], 1.000000e+00, max_relative = 1e-6);
    assert_relative_eq!(x[1], 4.743000e+00, max_relative = 1e-6);
    assert_relative_eq!(x[2], 3.821150e+00, max_relative = 1e-6);
    assert_relative_eq!(x[3], 1.379408e+00, max_relative = 1e-6);
    assert_relative_eq!(report.objective, 1.701402e+01, max_relative = 1e-6);
}

#[test]
fn hs071_warm_start_test() {
    let mut ipopt = hs071();
    ipopt.set_intermediate_callback(Some(NLP::count_iterations_cb));

    let report = ipopt.solve().unwrap();
    assert_eq!(report.status, SolveStatus::SolveSucceeded);
    assert_eq!(ipopt.state(), SolverState::Succeeded);
    assert_eq!(report.iterations, ipopt.nlp().iterations);
    {
        let problem = ipopt.nlp();
        let x = &problem.x_start;
        assert_relative_eq!(x[0], 1.000000e+00, max_relative = 1e-6);
        assert_relative_eq!(x[1], 4.743000e+00, max_relative = 1e-6);
        assert_relative_eq!(x[2], 3.821150e+00, max_relative = 1e-6);
        assert_relative_eq!(x[3], 1.379408e+00, max_relative = 1e-6);

        let mult_g = &problem.lambda_start;
        assert_relative_eq!(mult_g[0], -5.522937e-01, max_relative = 1e-6);
        assert_relative_eq!(mult_g[1], 1.614686e-01, max_relative = 1e-6);

        // x[0] sits on its lower bound.
        assert_relative_eq!(problem.z_l_start[0], 1.087871e+00, max_relative = 1e-6);

        assert_relative_eq!(report.objective, 1.701402e+01, max_relative = 1e-6);
    }
    let cold_iterations = report.iterations;

    // Perturb the first constraint and restart from the previous primal-dual solution.
    ipopt.nlp_mut().g_offset[0] = 0.2;
    ipopt.prepare_warm_start(100).unwrap();
    assert_eq!(ipopt.state(), SolverState::WarmStartConfigured);

    let report = ipopt.solve().unwrap();
    assert_eq!(report.status, SolveStatus::SolveSucceeded);
    assert!(report.iterations <= cold_iterations);
    {
        let problem = ipopt.nlp();
        let x = &problem.x_start;
        assert_relative_eq!(x[0], 1.000000e+00, max_relative = 1e-6);
        assert_relative_eq!(x[1], 4.749269e+00, max_relative = 1e-6);
        assert_relative_eq!(x[2], 3.817510e+00, max_relative = 1e-6);
        assert_relative_eq!(x[3], 1.367870e+00, max_relative = 1e-6);

        let mult_g = &problem.lambda_start;
        assert_relative_eq!(mult_g[0], -5.517016e-01, max_relative = 1e-6);
        assert_relative_eq!(mult_g[1], 1.592915e-01, max_relative = 1e-6);

        assert_relative_eq!(report.objective, 1.690362e+01, max_relative = 1e-6);
        assert_eq!(problem.accepted, 2);
    }
}

#[test]
fn hs071_settings_from_toml_test() {
    let settings = IpoptSettings::from_toml_str(
        r#"
        tol = 1e-7
        hessian_approximation = "exact"
        print_level = 0

        [extra]
        mu_strategy = "adaptive"
        sb = "yes"
        "#,
    )
    .unwrap();
    assert_eq!(settings, self::settings());

    let mut ipopt = IpoptSolver::new(NLP::new(), settings);
    let report = ipopt.solve().unwrap();
    assert_eq!(report.status, SolveStatus::SolveSucceeded);
    assert_relative_eq!(report.objective, 1.701402e+01, max_relative = 1e-6);
}

#[test]
fn hs071_output_file_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hs071.out");

    let mut settings = settings();
    settings.output_file = Some(path.clone());
    let mut ipopt = IpoptSolver::new(NLP::new(), settings);
    let report = ipopt.solve().unwrap();
    assert!(report.succeeded());

    let log = std::fs::read_to_string(&path).unwrap();
    assert!(!log.is_empty());
}
