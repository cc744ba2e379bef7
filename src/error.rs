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

use std::path::PathBuf;

use thiserror::Error;

use crate::problem::Dimensions;
use crate::solver::SolverState;
use crate::status::SolveStatus;

/// Contract violations detected while serving an engine callback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdapterError {
    #[error("{quantity}: expected length {expected}, got {actual}")]
    DimensionMismatch {
        quantity: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{quantity}[{index}] is not finite ({value})")]
    NonFinite {
        quantity: &'static str,
        index: usize,
        value: f64,
    },
    #[error("Hessian entry {entry} at ({row}, {col}) is above the diagonal")]
    UpperTriangularEntry { entry: usize, row: i32, col: i32 },
    #[error("{quantity} entry {entry} at ({row}, {col}) is outside the matrix")]
    IndexOutOfRange {
        quantity: &'static str,
        entry: usize,
        row: i32,
        col: i32,
    },
    #[error("problem failed to produce {0}")]
    Evaluation(&'static str),
    #[error("callback received before the problem dimensions were reported")]
    MissingNlpInfo,
}

/// Fatal errors of the solve lifecycle. None of these are retried.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Ipopt refused to create the problem")]
    ProblemCreation,
    #[error("Ipopt rejected option {name} = {value}")]
    RejectedOption { name: String, value: String },
    #[error("option name contains an interior nul byte")]
    InvalidOptionName,
    #[error("Ipopt failed to initialize: {0}")]
    Initialization(SolveStatus),
    #[error("problem dimensions changed from {previous:?} to {current:?} across a warm start")]
    DimensionsChanged {
        previous: Dimensions,
        current: Dimensions,
    },
    #[error("cannot {action} while the solver is {state:?}")]
    InvalidState {
        action: &'static str,
        state: SolverState,
    },
    #[error("{quantity} = {count} does not fit Ipopt's index type")]
    DimensionTooLarge { quantity: &'static str, count: usize },
    #[error("could not open Ipopt output file {0:?}")]
    OutputFile(PathBuf),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Failures loading solver settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings")]
    Serialize(#[from] toml::ser::Error),
}
