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

use std::fmt;

/// Program return status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    SolveSucceeded,
    SolvedToAcceptableLevel,
    InfeasibleProblemDetected,
    SearchDirectionBecomesTooSmall,
    DivergingIterates,
    UserRequestedStop,
    FeasiblePointFound,
    MaximumIterationsExceeded,
    RestorationFailed,
    ErrorInStepComputation,
    MaximumCpuTimeExceeded,
    MaximumWallTimeExceeded,
    NotEnoughDegreesOfFreedom,
    InvalidProblemDefinition,
    InvalidOption,
    InvalidNumberDetected,
    UnrecoverableException,
    NonIpoptExceptionThrown,
    InsufficientMemory,
    InternalError,
    /// A code this binding does not know about.
    Unknown(i32),
}

/// Coarse classification of a terminated solve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Succeeded,
    AcceptableLevel,
    Failed,
}

impl SolveStatus {
    pub(crate) fn new(status: ffi::ApplicationReturnStatus) -> Self {
        use SolveStatus as RS;
        match status {
            ffi::ApplicationReturnStatus_Solve_Succeeded => RS::SolveSucceeded,
            ffi::ApplicationReturnStatus_Solved_To_Acceptable_Level => RS::SolvedToAcceptableLevel,
            ffi::ApplicationReturnStatus_Infeasible_Problem_Detected => {
                RS::InfeasibleProblemDetected
            }
            ffi::ApplicationReturnStatus_Search_Direction_Becomes_Too_Small => {
                RS::SearchDirectionBecomesTooSmall
            }
            ffi::ApplicationReturnStatus_Diverging_Iterates => RS::DivergingIterates,
            ffi::ApplicationReturnStatus_User_Requested_Stop => RS::UserRequestedStop,
            ffi::ApplicationReturnStatus_Feasible_Point_Found => RS::FeasiblePointFound,
            ffi::ApplicationReturnStatus_Maximum_Iterations_Exceeded => {
                RS::MaximumIterationsExceeded
            }
            ffi::ApplicationReturnStatus_Restoration_Failed => RS::RestorationFailed,
            ffi::ApplicationReturnStatus_Error_In_Step_Computation => RS::ErrorInStepComputation,
            ffi::ApplicationReturnStatus_Maximum_CpuTime_Exceeded => RS::MaximumCpuTimeExceeded,
            ffi::ApplicationReturnStatus_Maximum_WallTime_Exceeded => RS::MaximumWallTimeExceeded,
            ffi::ApplicationReturnStatus_Not_Enough_Degrees_Of_Freedom => {
                RS::NotEnoughDegreesOfFreedom
            }
            ffi::ApplicationReturnStatus_Invalid_Problem_Definition => RS::InvalidProblemDefinition,
            ffi::ApplicationReturnStatus_Invalid_Option => RS::InvalidOption,
            ffi::ApplicationReturnStatus_Invalid_Number_Detected => RS::InvalidNumberDetected,
            ffi::ApplicationReturnStatus_Unrecoverable_Exception => RS::UnrecoverableException,
            ffi::ApplicationReturnStatus_NonIpopt_Exception_Thrown => RS::NonIpoptExceptionThrown,
            ffi::ApplicationReturnStatus_Insufficient_Memory => RS::InsufficientMemory,
            ffi::ApplicationReturnStatus_Internal_Error => RS::InternalError,
            code => RS::Unknown(code as i32),
        }
    }

    /// The raw `ApplicationReturnStatus` code.
    pub fn code(self) -> i32 {
        use SolveStatus as RS;
        let code = match self {
            RS::SolveSucceeded => ffi::ApplicationReturnStatus_Solve_Succeeded,
            RS::SolvedToAcceptableLevel => ffi::ApplicationReturnStatus_Solved_To_Acceptable_Level,
            RS::InfeasibleProblemDetected => {
                ffi::ApplicationReturnStatus_Infeasible_Problem_Detected
            }
            RS::SearchDirectionBecomesTooSmall => {
                ffi::ApplicationReturnStatus_Search_Direction_Becomes_Too_Small
            }
            RS::DivergingIterates => ffi::ApplicationReturnStatus_Diverging_Iterates,
            RS::UserRequestedStop => ffi::ApplicationReturnStatus_User_Requested_Stop,
            RS::FeasiblePointFound => ffi::ApplicationReturnStatus_Feasible_Point_Found,
            RS::MaximumIterationsExceeded => {
                ffi::ApplicationReturnStatus_Maximum_Iterations_Exceeded
            }
            RS::RestorationFailed => ffi::ApplicationReturnStatus_Restoration_Failed,
            RS::ErrorInStepComputation => ffi::ApplicationReturnStatus_Error_In_Step_Computation,
            RS::MaximumCpuTimeExceeded => ffi::ApplicationReturnStatus_Maximum_CpuTime_Exceeded,
            RS::MaximumWallTimeExceeded => ffi::ApplicationReturnStatus_Maximum_WallTime_Exceeded,
            RS::NotEnoughDegreesOfFreedom => {
                ffi::ApplicationReturnStatus_Not_Enough_Degrees_Of_Freedom
            }
            RS::InvalidProblemDefinition => ffi::ApplicationReturnStatus_Invalid_Problem_Definition,
            RS::InvalidOption => ffi::ApplicationReturnStatus_Invalid_Option,
            RS::InvalidNumberDetected => ffi::ApplicationReturnStatus_Invalid_Number_Detected,
            RS::UnrecoverableException => ffi::ApplicationReturnStatus_Unrecoverable_Exception,
            RS::NonIpoptExceptionThrown => ffi::ApplicationReturnStatus_NonIpopt_Exception_Thrown,
            RS::InsufficientMemory => ffi::ApplicationReturnStatus_Insufficient_Memory,
            RS::InternalError => ffi::ApplicationReturnStatus_Internal_Error,
            RS::Unknown(code) => return code,
        };
        code as i32
    }

    /// Only `SolveSucceeded` and `SolvedToAcceptableLevel` count as success.
    pub fn outcome(self) -> Outcome {
        match self {
            SolveStatus::SolveSucceeded => Outcome::Succeeded,
            SolveStatus::SolvedToAcceptableLevel => Outcome::AcceptableLevel,
            _ => Outcome::Failed,
        }
    }

    pub fn is_success(self) -> bool {
        self.outcome() != Outcome::Failed
    }

    /// Statuses the engine reports when it rejects the problem or its options before iterating.
    pub fn is_initialization_failure(self) -> bool {
        matches!(
            self,
            SolveStatus::InvalidOption | SolveStatus::InvalidProblemDefinition
        )
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Unknown(code) => write!(f, "Unknown({})", code),
            status => write!(f, "{:?}({})", status, status.code()),
        }
    }
}
