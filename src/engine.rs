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

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use ffi::{Index, Int, Number};
use tracing::debug;

use crate::adapter::{IndexingStyle, NlpInfo};
use crate::callbacks::{self, CallbackContext};
use crate::error::SolverError;
use crate::problem::{Dimensions, Nlp};
use crate::settings::OptionValue;
use crate::status::SolveStatus;

/// Owned Ipopt problem handle, freed on drop.
pub(crate) struct EngineProblem {
    raw: ffi::IpoptProblem,
}

/// Pointer to the first element, or null for an empty buffer.
fn ptr_or_null(buf: &mut [Number]) -> *mut Number {
    if buf.is_empty() {
        ptr::null_mut()
    } else {
        buf.as_mut_ptr()
    }
}

/// Convert a problem size to Ipopt's index type.
fn index(quantity: &'static str, count: usize) -> Result<Index, SolverError> {
    Index::try_from(count).map_err(|_| SolverError::DimensionTooLarge { quantity, count })
}

impl EngineProblem {
    /// Create the engine problem with callbacks serving `P`. Ipopt copies the bounds.
    pub fn create<P: Nlp>(
        info: &NlpInfo,
        x_l: &mut [Number],
        x_u: &mut [Number],
        g_l: &mut [Number],
        g_u: &mut [Number],
    ) -> Result<Self, SolverError> {
        let dims = info.dimensions;
        let n = index("num_variables", dims.num_variables)?;
        let m = index("num_constraints", dims.num_constraints)?;
        let nele_jac = index("num_jacobian_non_zeros", dims.num_jacobian_non_zeros)?;
        let nele_hess = index("num_hessian_non_zeros", dims.num_hessian_non_zeros)?;
        let raw = unsafe {
            ffi::CreateIpoptProblem(
                n,
                ptr_or_null(x_l),
                ptr_or_null(x_u),
                m,
                ptr_or_null(g_l),
                ptr_or_null(g_u),
                nele_jac,
                nele_hess,
                info.index_style as Index,
                Some(callbacks::eval_f::<P>),
                Some(callbacks::eval_g::<P>),
                Some(callbacks::eval_grad_f::<P>),
                Some(callbacks::eval_jac_g::<P>),
                Some(callbacks::eval_h::<P>),
            )
        };

        if raw.is_null() {
            Err(SolverError::ProblemCreation)
        } else {
            Ok(EngineProblem { raw })
        }
    }

    /// Check `options` against Ipopt's option registry without consulting any problem.
    ///
    /// The options are applied to a one variable, unbounded problem that is never solved.
    /// Names and values are validated by the registry alone, so a rejection here is the same
    /// rejection the real problem would produce.
    pub fn check_options<P: Nlp>(options: &[(String, OptionValue)]) -> Result<(), SolverError> {
        let info = NlpInfo {
            dimensions: Dimensions::unconstrained(1),
            index_style: IndexingStyle::CStyle,
        };
        let mut scratch =
            EngineProblem::create::<P>(&info, &mut [-1e20], &mut [1e20], &mut [], &mut [])?;
        for (name, value) in options {
            scratch.add_option(name, value)?;
        }
        Ok(())
    }

    /// Set an Ipopt option. Ipopt validates both the name and the value.
    pub fn add_option(&mut self, name: &str, value: &OptionValue) -> Result<(), SolverError> {
        let rejected = || SolverError::RejectedOption {
            name: name.to_string(),
            value: value.to_string(),
        };
        let name_cstr = CString::new(name).map_err(|_| SolverError::InvalidOptionName)?;
        // Match option to one of the three types of options Ipopt can receive.
        let accepted = match value {
            OptionValue::Num(opt) => unsafe {
                ffi::AddIpoptNumOption(self.raw, name_cstr.as_ptr(), *opt as Number)
            },
            OptionValue::Str(opt) => {
                let opt_cstr = CString::new(opt.as_str()).map_err(|_| rejected())?;
                unsafe { ffi::AddIpoptStrOption(self.raw, name_cstr.as_ptr(), opt_cstr.as_ptr()) }
            }
            OptionValue::Int(opt) => unsafe {
                ffi::AddIpoptIntOption(self.raw, name_cstr.as_ptr(), *opt as Int)
            },
        };

        if ffi::from_bool(accepted) {
            debug!(option = name, %value, "applied");
            Ok(())
        } else {
            Err(rejected())
        }
    }

    pub fn open_output_file(&mut self, path: &Path, print_level: i32) -> Result<(), SolverError> {
        let file_error = || SolverError::OutputFile(path.to_path_buf());
        let path_cstr = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(file_error)?;
        let opened =
            unsafe { ffi::OpenIpoptOutputFile(self.raw, path_cstr.as_ptr(), print_level as Int) };
        if ffi::from_bool(opened) {
            Ok(())
        } else {
            Err(file_error())
        }
    }

    /// Route the per-iteration callback to `P`. Always installed so iterations are counted.
    pub fn set_intermediate_callback<P: Nlp>(&mut self) {
        unsafe {
            ffi::SetIntermediateCallback(self.raw, Some(callbacks::intermediate_cb::<P>));
        }
    }

    /// Run the optimization. `x` holds the starting point on entry and the solution on return;
    /// the multiplier arrays are read when warm starting and always receive the final values.
    /// Return the solve status and the final value of the objective function.
    pub fn solve<P: Nlp>(
        &mut self,
        x: &mut [Number],
        g: &mut [Number],
        mult_g: &mut [Number],
        mult_x_l: &mut [Number],
        mult_x_u: &mut [Number],
        context: &mut CallbackContext<'_, P>,
    ) -> (SolveStatus, Number) {
        let mut objective_value = 0.0;
        let udata_ptr = context as *mut CallbackContext<'_, P>;
        let status = SolveStatus::new(unsafe {
            ffi::IpoptSolve(
                self.raw,
                x.as_mut_ptr(),
                ptr_or_null(g),
                &mut objective_value as *mut Number,
                ptr_or_null(mult_g),
                ptr_or_null(mult_x_l),
                ptr_or_null(mult_x_u),
                udata_ptr as ffi::UserDataPtr,
            )
        });

        (status, objective_value)
    }
}

impl Drop for EngineProblem {
    fn drop(&mut self) {
        unsafe {
            ffi::FreeIpoptProblem(self.raw);
        }
    }
}
