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

/*
 * Ipopt C API
 *
 * The functions below are handed to `CreateIpoptProblem`. Ipopt passes back the `user_data`
 * pointer given to `IpoptSolve`, which always points to a `CallbackContext` living on the stack of
 * the solve call.
 */
use ffi::{Bool, Index, Number};
use tracing::{debug, error};

use crate::adapter::{NlpAdapter, SparseOutput};
use crate::error::AdapterError;
use crate::problem::Nlp;
use crate::view::{view, view_mut, view_mut_opt};

/// Phase of the algorithm reported to the intermediate callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AlgorithmMode {
    Regular,
    RestorationPhase,
}

impl AlgorithmMode {
    fn new(mode: ffi::AlgorithmMode) -> Self {
        if mode == ffi::AlgorithmMode_RestorationPhaseMode {
            AlgorithmMode::RestorationPhase
        } else {
            AlgorithmMode::Regular
        }
    }
}

/// Progress of the current iteration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntermediateCallbackData {
    pub alg_mod: AlgorithmMode,
    pub iter_count: Index,
    pub obj_value: Number,
    pub inf_pr: Number,
    pub inf_du: Number,
    pub mu: Number,
    pub d_norm: Number,
    pub regularization_size: Number,
    pub alpha_du: Number,
    pub alpha_pr: Number,
    pub ls_trials: Index,
}

/// Type defining the callback function for giving intermediate execution control to
/// the user. If set, it is called once per iteration, providing the user with some
/// information on the state of the optimization. This can be used to print some user-
/// defined output. It also gives the user a way to terminate the optimization
/// prematurely. If this method returns false, Ipopt will terminate the optimization.
pub type IntermediateCallback<P> = fn(&mut P, IntermediateCallbackData) -> bool;

/// State shared with the engine for the duration of one `IpoptSolve` call.
pub(crate) struct CallbackContext<'a, P: Nlp> {
    pub adapter: NlpAdapter<'a, P>,
    pub intermediate_callback: Option<IntermediateCallback<P>>,
    /// Iteration count of the last intermediate callback.
    pub iterations: usize,
}

impl<'a, P: Nlp> CallbackContext<'a, P> {
    pub fn new(
        adapter: NlpAdapter<'a, P>,
        intermediate_callback: Option<IntermediateCallback<P>>,
    ) -> Self {
        CallbackContext {
            adapter,
            intermediate_callback,
            iterations: 0,
        }
    }
}

unsafe fn context<'a, 'b, P: Nlp>(
    user_data: ffi::UserDataPtr,
) -> Option<&'a mut CallbackContext<'b, P>> {
    (user_data as *mut CallbackContext<'b, P>).as_mut()
}

fn report(callback: &'static str, result: Result<(), AdapterError>) -> Bool {
    match result {
        Ok(()) => ffi::TRUE,
        Err(AdapterError::Evaluation(what)) => {
            debug!(callback, "problem failed to produce {}", what);
            ffi::FALSE
        }
        Err(err) => {
            error!(callback, %err, "problem contract violated");
            ffi::FALSE
        }
    }
}

/// Evaluate the objective function.
pub(crate) unsafe extern "C" fn eval_f<P: Nlp>(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    obj_value: *mut Number,
    user_data: ffi::UserDataPtr,
) -> Bool {
    let Some(ctx) = context::<P>(user_data) else {
        return ffi::FALSE;
    };
    if obj_value.is_null() {
        return ffi::FALSE;
    }
    let result = ctx
        .adapter
        .eval_f(view(x, n), ffi::from_bool(new_x))
        .map(|obj| *obj_value = obj);
    report("eval_f", result)
}

/// Evaluate the objective gradient.
pub(crate) unsafe extern "C" fn eval_grad_f<P: Nlp>(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    grad_f: *mut Number,
    user_data: ffi::UserDataPtr,
) -> Bool {
    let Some(ctx) = context::<P>(user_data) else {
        return ffi::FALSE;
    };
    let result = ctx
        .adapter
        .eval_grad_f(view(x, n), ffi::from_bool(new_x), view_mut(grad_f, n));
    report("eval_grad_f", result)
}

/// Evaluate the constraint function.
pub(crate) unsafe extern "C" fn eval_g<P: Nlp>(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    m: Index,
    g: *mut Number,
    user_data: ffi::UserDataPtr,
) -> Bool {
    let Some(ctx) = context::<P>(user_data) else {
        return ffi::FALSE;
    };
    let result = ctx
        .adapter
        .eval_g(view(x, n), ffi::from_bool(new_x), view_mut(g, m));
    report("eval_g", result)
}

/// Evaluate the constraint jacobian.
pub(crate) unsafe extern "C" fn eval_jac_g<P: Nlp>(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    _m: Index,
    nele_jac: Index,
    irow: *mut Index,
    jcol: *mut Index,
    values: *mut Number,
    user_data: ffi::UserDataPtr,
) -> Bool {
    let Some(ctx) = context::<P>(user_data) else {
        return ffi::FALSE;
    };
    let output = sparse_output(nele_jac, irow, jcol, values);
    let result = ctx
        .adapter
        .eval_jac_g(view(x, n), ffi::from_bool(new_x), output);
    report("eval_jac_g", result)
}

/// Evaluate the hessian of the Lagrangian.
pub(crate) unsafe extern "C" fn eval_h<P: Nlp>(
    n: Index,
    x: *mut Number,
    new_x: Bool,
    obj_factor: Number,
    m: Index,
    lambda: *mut Number,
    new_lambda: Bool,
    nele_hess: Index,
    irow: *mut Index,
    jcol: *mut Index,
    values: *mut Number,
    user_data: ffi::UserDataPtr,
) -> Bool {
    let Some(ctx) = context::<P>(user_data) else {
        return ffi::FALSE;
    };
    let output = sparse_output(nele_hess, irow, jcol, values);
    let result = ctx.adapter.eval_h(
        view(x, n),
        ffi::from_bool(new_x),
        obj_factor,
        view(lambda, m),
        ffi::from_bool(new_lambda),
        output,
    );
    report("eval_h", result)
}

/// A null `values` array is Ipopt's request for the sparsity structure.
unsafe fn sparse_output<'a>(
    nele: Index,
    irow: *mut Index,
    jcol: *mut Index,
    values: *mut Number,
) -> SparseOutput<'a> {
    match view_mut_opt(values, nele) {
        Some(values) => SparseOutput::Values(values),
        None => SparseOutput::Structure {
            rows: view_mut(irow, nele),
            cols: view_mut(jcol, nele),
        },
    }
}

pub(crate) unsafe extern "C" fn intermediate_cb<P: Nlp>(
    alg_mod: ffi::AlgorithmMode,
    iter_count: Index,
    obj_value: Number,
    inf_pr: Number,
    inf_du: Number,
    mu: Number,
    d_norm: Number,
    regularization_size: Number,
    alpha_du: Number,
    alpha_pr: Number,
    ls_trials: Index,
    user_data: ffi::UserDataPtr,
) -> Bool {
    let Some(ctx) = context::<P>(user_data) else {
        return ffi::FALSE;
    };
    ctx.iterations = iter_count.max(0) as usize;
    match ctx.intermediate_callback {
        Some(callback) => {
            let data = IntermediateCallbackData {
                alg_mod: AlgorithmMode::new(alg_mod),
                iter_count,
                obj_value,
                inf_pr,
                inf_du,
                mu,
                d_norm,
                regularization_size,
                alpha_du,
                alpha_pr,
                ls_trials,
            };
            ffi::to_bool(callback(ctx.adapter.nlp_mut(), data))
        }
        None => ffi::TRUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Quadratic;
    use approx::assert_relative_eq;
    use std::ptr;

    fn user_data<P: Nlp>(ctx: &mut CallbackContext<'_, P>) -> ffi::UserDataPtr {
        ctx as *mut CallbackContext<'_, P> as ffi::UserDataPtr
    }

    #[test]
    fn null_values_selects_structure() {
        let mut nlp = Quadratic::default();
        {
            let mut adapter = NlpAdapter::new(&mut nlp);
            adapter.get_nlp_info();
            let mut ctx = CallbackContext::new(adapter, None);
            let ud = user_data(&mut ctx);

            let mut rows = [-1 as Index; 3];
            let mut cols = [-1 as Index; 3];
            let ok = unsafe {
                eval_h::<Quadratic>(
                    2,
                    ptr::null_mut(),
                    ffi::FALSE,
                    1.0,
                    1,
                    ptr::null_mut(),
                    ffi::FALSE,
                    3,
                    rows.as_mut_ptr(),
                    cols.as_mut_ptr(),
                    ptr::null_mut(),
                    ud,
                )
            };
            assert!(ffi::from_bool(ok));
            assert_eq!(rows, [0, 1, 1]);
            assert_eq!(cols, [0, 0, 1]);

            let mut x = [1.0, 0.0];
            let mut lambda = [0.0];
            let mut vals = [0.0; 3];
            let ok = unsafe {
                eval_h::<Quadratic>(
                    2,
                    x.as_mut_ptr(),
                    ffi::TRUE,
                    2.0,
                    1,
                    lambda.as_mut_ptr(),
                    ffi::TRUE,
                    3,
                    ptr::null_mut(),
                    ptr::null_mut(),
                    vals.as_mut_ptr(),
                    ud,
                )
            };
            assert!(ffi::from_bool(ok));
            assert_eq!(vals, [4.0, 2.0, 8.0]);
            // Values requests leave the index arrays alone.
            assert_eq!(rows, [0, 1, 1]);
        }
        assert_eq!(nlp.extracted, vec![true]);
    }

    #[test]
    fn jacobian_trampoline() {
        let mut nlp = Quadratic::default();
        let mut adapter = NlpAdapter::new(&mut nlp);
        adapter.get_nlp_info();
        let mut ctx = CallbackContext::new(adapter, None);
        let ud = user_data(&mut ctx);

        let mut rows = [0 as Index; 2];
        let mut cols = [0 as Index; 2];
        let ok = unsafe {
            eval_jac_g::<Quadratic>(
                2,
                ptr::null_mut(),
                ffi::FALSE,
                1,
                2,
                rows.as_mut_ptr(),
                cols.as_mut_ptr(),
                ptr::null_mut(),
                ud,
            )
        };
        assert!(ffi::from_bool(ok));
        assert_eq!(rows, [0, 0]);
        assert_eq!(cols, [0, 1]);

        let mut x = [0.2, 0.8];
        let mut vals = [0.0; 2];
        let ok = unsafe {
            eval_jac_g::<Quadratic>(
                2,
                x.as_mut_ptr(),
                ffi::TRUE,
                1,
                2,
                ptr::null_mut(),
                ptr::null_mut(),
                vals.as_mut_ptr(),
                ud,
            )
        };
        assert!(ffi::from_bool(ok));
        assert_eq!(vals, [1.0, 1.0]);
    }

    #[test]
    fn objective_trampolines_write_through() {
        let mut nlp = Quadratic::default();
        let mut adapter = NlpAdapter::new(&mut nlp);
        adapter.get_nlp_info();
        let mut ctx = CallbackContext::new(adapter, None);
        let ud = user_data(&mut ctx);

        let mut x = [1.0, 1.0];
        let mut obj = 0.0;
        let ok = unsafe { eval_f::<Quadratic>(2, x.as_mut_ptr(), ffi::TRUE, &mut obj, ud) };
        assert!(ffi::from_bool(ok));
        assert_relative_eq!(obj, 4.0);

        let mut grad = [0.0; 2];
        let ok =
            unsafe { eval_grad_f::<Quadratic>(2, x.as_mut_ptr(), ffi::FALSE, grad.as_mut_ptr(), ud) };
        assert!(ffi::from_bool(ok));
        assert_eq!(grad, [3.0, 5.0]);

        let mut g = [0.0];
        let ok =
            unsafe { eval_g::<Quadratic>(2, x.as_mut_ptr(), ffi::FALSE, 1, g.as_mut_ptr(), ud) };
        assert!(ffi::from_bool(ok));
        assert_eq!(g, [2.0]);
    }

    #[test]
    fn contract_violations_become_false() {
        let mut nlp = Quadratic {
            nan_objective: true,
            ..Default::default()
        };
        let mut adapter = NlpAdapter::new(&mut nlp);
        adapter.get_nlp_info();
        let mut ctx = CallbackContext::new(adapter, None);
        let ud = user_data(&mut ctx);

        let mut x = [1.0, 1.0];
        let mut obj = 0.0;
        let ok = unsafe { eval_f::<Quadratic>(2, x.as_mut_ptr(), ffi::TRUE, &mut obj, ud) };
        assert!(!ffi::from_bool(ok));

        // Wrong variable count.
        let ok = unsafe { eval_f::<Quadratic>(1, x.as_mut_ptr(), ffi::TRUE, &mut obj, ud) };
        assert!(!ffi::from_bool(ok));
    }

    #[test]
    fn missing_user_data_is_rejected() {
        let mut x = [1.0, 1.0];
        let mut obj = 0.0;
        let ok = unsafe {
            eval_f::<Quadratic>(2, x.as_mut_ptr(), ffi::TRUE, &mut obj, ptr::null_mut())
        };
        assert!(!ffi::from_bool(ok));
    }

    fn stop_after_two(nlp: &mut Quadratic, data: IntermediateCallbackData) -> bool {
        nlp.iterations = data.iter_count as usize;
        data.iter_count < 2
    }

    #[test]
    fn intermediate_callback_records_iterations() {
        let mut nlp = Quadratic::default();
        {
            let adapter = NlpAdapter::new(&mut nlp);
            let mut ctx = CallbackContext::new(adapter, Some(stop_after_two));
            let ud = user_data(&mut ctx);

            let call = |iter: Index| unsafe {
                intermediate_cb::<Quadratic>(
                    ffi::AlgorithmMode_RegularMode,
                    iter,
                    1.0,
                    0.0,
                    0.0,
                    0.1,
                    0.0,
                    0.0,
                    1.0,
                    1.0,
                    0,
                    ud,
                )
            };
            assert!(ffi::from_bool(call(1)));
            assert!(!ffi::from_bool(call(2)));
            assert_eq!(ctx.iterations, 2);
        }
        assert_eq!(nlp.iterations, 2);
    }

    #[test]
    fn algorithm_mode() {
        assert_eq!(
            AlgorithmMode::new(ffi::AlgorithmMode_RegularMode),
            AlgorithmMode::Regular
        );
        assert_eq!(
            AlgorithmMode::new(ffi::AlgorithmMode_RestorationPhaseMode),
            AlgorithmMode::RestorationPhase
        );
    }
}
