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

//! Raw declarations of the standard C interface to Ipopt (`IpStdCInterface.h`).
//!
//! Names follow the header so that the Ipopt documentation applies directly.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::os::raw::{c_char, c_int, c_void};

/// Type for all numbers.
pub type Number = f64;
/// Type for all indices.
pub type Index = c_int;
/// Type for all integers.
pub type Int = c_int;

/// Boolean type of the C interface. Ipopt 3.14 changed this to C99 `bool`.
#[cfg(ipopt_c99_bool)]
pub type Bool = bool;
/// Boolean type of the C interface. Ipopt 3.14 changed this to C99 `bool`.
#[cfg(not(ipopt_c99_bool))]
pub type Bool = c_int;

pub const TRUE: Bool = true as Bool;
pub const FALSE: Bool = false as Bool;

/// Convert an Ipopt `Bool` into a Rust `bool`.
#[inline]
pub fn from_bool(b: Bool) -> bool {
    b != FALSE
}

/// Convert a Rust `bool` into an Ipopt `Bool`.
#[inline]
pub fn to_bool(b: bool) -> Bool {
    if b {
        TRUE
    } else {
        FALSE
    }
}

/// Opaque problem structure owned by Ipopt.
#[repr(C)]
pub struct IpoptProblemInfo {
    _private: [u8; 0],
}

pub type IpoptProblem = *mut IpoptProblemInfo;
pub type UserDataPtr = *mut c_void;

/// Return codes of `IpoptSolve` (`enum ApplicationReturnStatus` in `IpReturnCodes_inc.h`).
pub type ApplicationReturnStatus = c_int;
pub const ApplicationReturnStatus_Solve_Succeeded: ApplicationReturnStatus = 0;
pub const ApplicationReturnStatus_Solved_To_Acceptable_Level: ApplicationReturnStatus = 1;
pub const ApplicationReturnStatus_Infeasible_Problem_Detected: ApplicationReturnStatus = 2;
pub const ApplicationReturnStatus_Search_Direction_Becomes_Too_Small: ApplicationReturnStatus = 3;
pub const ApplicationReturnStatus_Diverging_Iterates: ApplicationReturnStatus = 4;
pub const ApplicationReturnStatus_User_Requested_Stop: ApplicationReturnStatus = 5;
pub const ApplicationReturnStatus_Feasible_Point_Found: ApplicationReturnStatus = 6;
pub const ApplicationReturnStatus_Maximum_Iterations_Exceeded: ApplicationReturnStatus = -1;
pub const ApplicationReturnStatus_Restoration_Failed: ApplicationReturnStatus = -2;
pub const ApplicationReturnStatus_Error_In_Step_Computation: ApplicationReturnStatus = -3;
pub const ApplicationReturnStatus_Maximum_CpuTime_Exceeded: ApplicationReturnStatus = -4;
pub const ApplicationReturnStatus_Maximum_WallTime_Exceeded: ApplicationReturnStatus = -5;
pub const ApplicationReturnStatus_Not_Enough_Degrees_Of_Freedom: ApplicationReturnStatus = -10;
pub const ApplicationReturnStatus_Invalid_Problem_Definition: ApplicationReturnStatus = -11;
pub const ApplicationReturnStatus_Invalid_Option: ApplicationReturnStatus = -12;
pub const ApplicationReturnStatus_Invalid_Number_Detected: ApplicationReturnStatus = -13;
pub const ApplicationReturnStatus_Unrecoverable_Exception: ApplicationReturnStatus = -100;
pub const ApplicationReturnStatus_NonIpopt_Exception_Thrown: ApplicationReturnStatus = -101;
pub const ApplicationReturnStatus_Insufficient_Memory: ApplicationReturnStatus = -102;
pub const ApplicationReturnStatus_Internal_Error: ApplicationReturnStatus = -199;

/// Algorithm phase reported to the intermediate callback (`enum AlgorithmMode`).
pub type AlgorithmMode = c_int;
pub const AlgorithmMode_RegularMode: AlgorithmMode = 0;
pub const AlgorithmMode_RestorationPhaseMode: AlgorithmMode = 1;

pub type Eval_F_CB = Option<
    unsafe extern "C" fn(
        n: Index,
        x: *mut Number,
        new_x: Bool,
        obj_value: *mut Number,
        user_data: UserDataPtr,
    ) -> Bool,
>;

pub type Eval_Grad_F_CB = Option<
    unsafe extern "C" fn(
        n: Index,
        x: *mut Number,
        new_x: Bool,
        grad_f: *mut Number,
        user_data: UserDataPtr,
    ) -> Bool,
>;

pub type Eval_G_CB = Option<
    unsafe extern "C" fn(
        n: Index,
        x: *mut Number,
        new_x: Bool,
        m: Index,
        g: *mut Number,
        user_data: UserDataPtr,
    ) -> Bool,
>;

/// Jacobian callback. `values` is null when Ipopt asks for the sparsity structure.
pub type Eval_Jac_G_CB = Option<
    unsafe extern "C" fn(
        n: Index,
        x: *mut Number,
        new_x: Bool,
        m: Index,
        nele_jac: Index,
        iRow: *mut Index,
        jCol: *mut Index,
        values: *mut Number,
        user_data: UserDataPtr,
    ) -> Bool,
>;

/// Lagrangian Hessian callback. `values` is null when Ipopt asks for the sparsity structure.
pub type Eval_H_CB = Option<
    unsafe extern "C" fn(
        n: Index,
        x: *mut Number,
        new_x: Bool,
        obj_factor: Number,
        m: Index,
        lambda: *mut Number,
        new_lambda: Bool,
        nele_hess: Index,
        iRow: *mut Index,
        jCol: *mut Index,
        values: *mut Number,
        user_data: UserDataPtr,
    ) -> Bool,
>;

pub type Intermediate_CB = Option<
    unsafe extern "C" fn(
        alg_mod: AlgorithmMode,
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
        user_data: UserDataPtr,
    ) -> Bool,
>;

extern "C" {
    /// Create a new problem. Returns null if the arguments are inconsistent.
    pub fn CreateIpoptProblem(
        n: Index,
        x_L: *mut Number,
        x_U: *mut Number,
        m: Index,
        g_L: *mut Number,
        g_U: *mut Number,
        nele_jac: Index,
        nele_hess: Index,
        index_style: Index,
        eval_f: Eval_F_CB,
        eval_g: Eval_G_CB,
        eval_grad_f: Eval_Grad_F_CB,
        eval_jac_g: Eval_Jac_G_CB,
        eval_h: Eval_H_CB,
    ) -> IpoptProblem;

    pub fn FreeIpoptProblem(ipopt_problem: IpoptProblem);

    /// Returns false if the keyword or value is not accepted.
    pub fn AddIpoptStrOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: *const c_char,
    ) -> Bool;

    /// Returns false if the keyword or value is not accepted.
    pub fn AddIpoptNumOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: Number,
    ) -> Bool;

    /// Returns false if the keyword or value is not accepted.
    pub fn AddIpoptIntOption(ipopt_problem: IpoptProblem, keyword: *const c_char, val: Int)
        -> Bool;

    pub fn OpenIpoptOutputFile(
        ipopt_problem: IpoptProblem,
        file_name: *const c_char,
        print_level: Int,
    ) -> Bool;

    pub fn SetIpoptProblemScaling(
        ipopt_problem: IpoptProblem,
        obj_scaling: Number,
        x_scaling: *mut Number,
        g_scaling: *mut Number,
    ) -> Bool;

    pub fn SetIntermediateCallback(
        ipopt_problem: IpoptProblem,
        intermediate_cb: Intermediate_CB,
    ) -> Bool;

    /// Solve the problem. `x` holds the starting point on entry and the solution on return.
    /// The multiplier arrays are read as starting values when warm starting and always receive
    /// the final multipliers.
    pub fn IpoptSolve(
        ipopt_problem: IpoptProblem,
        x: *mut Number,
        g: *mut Number,
        obj_val: *mut Number,
        mult_g: *mut Number,
        mult_x_L: *mut Number,
        mult_x_U: *mut Number,
        user_data: UserDataPtr,
    ) -> ApplicationReturnStatus;
}
