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

use ffi::Number;
use tracing::{debug, info, warn};

use crate::adapter::NlpAdapter;
use crate::callbacks::{CallbackContext, IntermediateCallback};
use crate::engine::EngineProblem;
use crate::error::SolverError;
use crate::problem::{Dimensions, Nlp, Solution};
use crate::settings::{IpoptSettings, OptionValue};
use crate::status::{Outcome, SolveStatus};

/// Push and frac values used to stay close to a warm start iterate.
const WARM_START_PUSH: Number = 1e-9;

/// Where the solver is in its lifecycle.
///
/// `Initializing` and `Optimizing` are only held while `solve` runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverState {
    Configured,
    Initializing,
    Optimizing,
    Succeeded,
    AcceptableLevel,
    Failed,
    WarmStartConfigured,
}

impl From<Outcome> for SolverState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => SolverState::Succeeded,
            Outcome::AcceptableLevel => SolverState::AcceptableLevel,
            Outcome::Failed => SolverState::Failed,
        }
    }
}

/// Result of a solve that reached the engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolveReport {
    /// Raw engine status.
    pub status: SolveStatus,
    /// Iteration count reported by the last intermediate callback.
    pub iterations: usize,
    /// Objective at the final iterate.
    pub objective: Number,
}

impl SolveReport {
    pub fn outcome(&self) -> Outcome {
        self.status.outcome()
    }

    /// True for `SolveSucceeded` and `SolvedToAcceptableLevel`.
    pub fn succeeded(&self) -> bool {
        self.status.is_success()
    }
}

/// Options overriding the configured ones for a warm started solve.
pub fn warm_start_options(max_iterations: usize) -> Vec<(String, OptionValue)> {
    let max_iter = i32::try_from(max_iterations).unwrap_or(i32::MAX);
    vec![
        ("warm_start_init_point".into(), "yes".into()),
        ("warm_start_bound_push".into(), WARM_START_PUSH.into()),
        ("warm_start_bound_frac".into(), WARM_START_PUSH.into()),
        ("warm_start_slack_bound_frac".into(), WARM_START_PUSH.into()),
        ("warm_start_slack_bound_push".into(), WARM_START_PUSH.into()),
        ("warm_start_mult_bound_push".into(), WARM_START_PUSH.into()),
        ("max_iter".into(), max_iter.into()),
        ("derivative_test".into(), "none".into()),
    ]
}

/// Drives Ipopt on a problem `P`.
///
/// Each call to `solve` creates a fresh engine problem from the current bounds, applies the
/// configured options followed by any options set through `set_option` and, when warm starting,
/// the warm start overrides. The problem receives the final iterate through
/// `Nlp::accept_solution`.
pub struct IpoptSolver<P: Nlp> {
    /// User specified interface defining the problem to be solved.
    nlp: P,
    settings: IpoptSettings,
    /// Options set through `set_option`, applied after `settings`.
    user_options: Vec<(String, OptionValue)>,
    /// Iteration cap of a prepared warm start.
    warm_start: Option<usize>,
    state: SolverState,
    /// Dimensions of the last solve that reached the engine.
    last_dimensions: Option<Dimensions>,
    intermediate_callback: Option<IntermediateCallback<P>>,
}

impl<P: Nlp> IpoptSolver<P> {
    pub fn new(nlp: P, settings: IpoptSettings) -> Self {
        IpoptSolver {
            nlp,
            settings,
            user_options: Vec::new(),
            warm_start: None,
            state: SolverState::Configured,
            last_dimensions: None,
            intermediate_callback: None,
        }
    }

    /// Replace the settings. Any prepared warm start is discarded.
    pub fn configure(&mut self, settings: IpoptSettings) {
        debug!("configuring Ipopt");
        self.settings = settings;
        self.warm_start = None;
        self.state = SolverState::Configured;
    }

    /// Set an Ipopt option, overriding the settings. The option is validated by Ipopt when the
    /// next solve starts.
    pub fn set_option<O: Into<OptionValue>>(&mut self, name: &str, option: O) -> &mut Self {
        let option = option.into();
        match self.user_options.iter_mut().find(|(n, _)| n == name) {
            Some((_, value)) => *value = option,
            None => self.user_options.push((name.to_string(), option)),
        }
        self
    }

    /// Set intermediate callback.
    pub fn set_intermediate_callback(&mut self, cb: Option<IntermediateCallback<P>>) {
        self.intermediate_callback = cb;
    }

    pub fn settings(&self) -> &IpoptSettings {
        &self.settings
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Get an immutable reference to the provided NLP object.
    pub fn nlp(&self) -> &P {
        &self.nlp
    }

    /// Get a mutable reference to the provided NLP object.
    pub fn nlp_mut(&mut self) -> &mut P {
        &mut self.nlp
    }

    pub fn into_nlp(self) -> P {
        self.nlp
    }

    /// Make the next solve start from the iterate and multipliers the problem supplies, capped at
    /// `max_iterations`. Derivative testing is switched off for warm starts.
    ///
    /// Only valid after a solve, and only while the problem dimensions match that solve.
    pub fn prepare_warm_start(&mut self, max_iterations: usize) -> Result<(), SolverError> {
        let previous = match (self.state, self.last_dimensions) {
            (
                SolverState::Succeeded
                | SolverState::AcceptableLevel
                | SolverState::Failed
                | SolverState::WarmStartConfigured,
                Some(previous),
            ) => previous,
            (state, _) => {
                return Err(SolverError::InvalidState {
                    action: "prepare a warm start",
                    state,
                })
            }
        };

        let current = self.nlp.dimensions();
        if current != previous {
            return Err(SolverError::DimensionsChanged { previous, current });
        }

        debug!(max_iterations, "warm start prepared");
        self.warm_start = Some(max_iterations);
        self.state = SolverState::WarmStartConfigured;
        Ok(())
    }

    /// All options for the next solve in application order.
    pub fn options(&self) -> Vec<(String, OptionValue)> {
        let mut options = self.settings.options();
        options.extend(self.user_options.iter().cloned());
        if let Some(max_iterations) = self.warm_start {
            options.extend(warm_start_options(max_iterations));
        }
        options
    }

    /// Solve the non-linear problem.
    ///
    /// Convergence failures are reported through the returned `SolveReport`. Errors are fatal:
    /// the problem was never handed to the engine or the engine refused to initialize. After an
    /// error the solver is back in `Configured` and any prepared warm start is dropped.
    pub fn solve(&mut self) -> Result<SolveReport, SolverError> {
        let options = self.options();
        let warm_start = self.warm_start.is_some();
        let previous = self.last_dimensions;
        self.state = SolverState::Initializing;

        let IpoptSolver {
            nlp,
            settings,
            intermediate_callback,
            state,
            ..
        } = self;

        let result = run(
            nlp,
            settings,
            &options,
            warm_start.then_some(previous).flatten(),
            *intermediate_callback,
            state,
        );

        match &result {
            Ok((report, dimensions)) => {
                self.state = report.outcome().into();
                self.last_dimensions = Some(*dimensions);
                self.warm_start = None;
            }
            Err(_) => {
                self.state = SolverState::Configured;
                self.warm_start = None;
            }
        }
        result.map(|(report, _)| report)
    }
}

fn run<P: Nlp>(
    nlp: &mut P,
    settings: &IpoptSettings,
    options: &[(String, OptionValue)],
    warm_start_dimensions: Option<Dimensions>,
    intermediate_callback: Option<IntermediateCallback<P>>,
    state: &mut SolverState,
) -> Result<(SolveReport, Dimensions), SolverError> {
    let warm_start = warm_start_dimensions.is_some();
    // Rejected options must surface before the problem is consulted.
    EngineProblem::check_options::<P>(options)?;

    let mut adapter = NlpAdapter::new(nlp);
    let info = adapter.get_nlp_info();
    let dims = info.dimensions;

    if let Some(previous) = warm_start_dimensions {
        if previous != dims {
            return Err(SolverError::DimensionsChanged {
                previous,
                current: dims,
            });
        }
    }

    let (n, m) = (dims.num_variables, dims.num_constraints);
    let mut x_l = vec![0.0; n];
    let mut x_u = vec![0.0; n];
    let mut g_l = vec![0.0; m];
    let mut g_u = vec![0.0; m];
    adapter.get_bounds_info(&mut x_l, &mut x_u, &mut g_l, &mut g_u)?;

    let mut engine = EngineProblem::create::<P>(&info, &mut x_l, &mut x_u, &mut g_l, &mut g_u)?;
    for (name, value) in options {
        engine.add_option(name, value)?;
    }
    if let Some(path) = &settings.output_file {
        engine.open_output_file(path, settings.file_print_level)?;
    }
    engine.set_intermediate_callback::<P>();
    info!(warm_start, "Initialized successfully -- starting NLP");

    let mut x = vec![0.0; n];
    let mut z_l = vec![0.0; n];
    let mut z_u = vec![0.0; n];
    let mut lambda = vec![0.0; m];
    adapter.get_starting_point(
        Some(&mut x),
        warm_start.then_some((&mut z_l[..], &mut z_u[..])),
        warm_start.then_some(&mut lambda[..]),
    )?;

    *state = SolverState::Optimizing;
    let mut g = vec![0.0; m];
    let mut context = CallbackContext::new(adapter, intermediate_callback);
    let (status, objective) = engine.solve(
        &mut x,
        &mut g,
        &mut lambda,
        &mut z_l,
        &mut z_u,
        &mut context,
    );

    if status.is_initialization_failure() {
        return Err(SolverError::Initialization(status));
    }

    let iterations = context.iterations;
    context.adapter.finalize_solution(Solution {
        status,
        primal_variables: &x,
        lower_bound_multipliers: &z_l,
        upper_bound_multipliers: &z_u,
        constraint_multipliers: &lambda,
        constraint_values: &g,
        objective_value: objective,
    })?;

    if status.is_success() {
        info!("The problem solved in {} iterations!", iterations);
        info!("The final value of the objective function is {}.", objective);
    } else {
        warn!(%status, iterations, "Ipopt did not converge");
    }

    Ok((
        SolveReport {
            status,
            iterations,
            objective,
        },
        dims,
    ))
}
