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

//! Ipopt options applied before every solve.
//!
//! Settings are plain data and can be stored in TOML. Unspecified fields take the defaults below,
//! and any Ipopt option without a dedicated field can be given in the `[extra]` table:
//!
//! ```toml
//! tol = 1e-7
//! max_iter = 500
//! hessian_approximation = "exact"
//!
//! [extra]
//! mu_strategy = "adaptive"
//! sb = "yes"
//! bound_push = 1.0
//! ```
//!
//! The type of an `[extra]` value selects the Ipopt setter, and Ipopt rejects a value of the
//! wrong type. Numeric options must therefore be written as floats (`bound_push = 1.0`, not
//! `bound_push = 1`), while integer options such as `acceptable_iter` take plain integers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Type of option you can specify to Ipopt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Integer option.
    Int(i32),
    /// Numeric option.
    Num(f64),
    /// String option.
    Str(String),
}

impl From<f64> for OptionValue {
    fn from(opt: f64) -> Self {
        OptionValue::Num(opt)
    }
}

impl From<i32> for OptionValue {
    fn from(opt: i32) -> Self {
        OptionValue::Int(opt)
    }
}

impl<'a> From<&'a str> for OptionValue {
    fn from(opt: &'a str) -> Self {
        OptionValue::Str(opt.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(opt: String) -> Self {
        OptionValue::Str(opt)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Num(v) => write!(f, "{:e}", v),
            OptionValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}

/// Solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpoptSettings {
    /// Desired relative convergence tolerance.
    pub tol: f64,
    /// Absolute tolerance on the constraint violation.
    pub constr_viol_tol: f64,
    /// Maximum number of iterations.
    pub max_iter: i32,
    pub linear_scaling_on_demand: String,
    /// `"exact"` or `"limited-memory"`.
    pub hessian_approximation: String,
    /// Console verbosity, 0 to 12.
    pub print_level: i32,
    pub print_user_options: String,
    /// `"none"`, `"first-order"`, `"second-order"` or `"only-second-order"`.
    pub derivative_test: String,
    pub derivative_test_tol: f64,
    pub derivative_test_perturbation: f64,
    pub point_perturbation_radius: f64,
    pub linear_system_scaling: String,
    /// Linear solver used for the step computation, e.g. `"mumps"` or `"ma27"`.
    pub linear_solver: String,
    /// Also write the Ipopt log to this file.
    pub output_file: Option<PathBuf>,
    /// Verbosity of `output_file`.
    pub file_print_level: i32,
    /// Any other Ipopt options, applied after the fields above.
    pub extra: BTreeMap<String, OptionValue>,
}

impl Default for IpoptSettings {
    fn default() -> Self {
        Self {
            tol: 1e-8,
            constr_viol_tol: 1e-4,
            max_iter: 200,
            linear_scaling_on_demand: "yes".to_string(),
            hessian_approximation: "limited-memory".to_string(),
            print_level: 5,
            print_user_options: "no".to_string(),
            derivative_test: "none".to_string(),
            derivative_test_tol: 1e-5,
            derivative_test_perturbation: 1e-8,
            point_perturbation_radius: 10.0,
            linear_system_scaling: "none".to_string(),
            linear_solver: "mumps".to_string(),
            output_file: None,
            file_print_level: 5,
            extra: BTreeMap::new(),
        }
    }
}

impl IpoptSettings {
    /// Load settings from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(contents)?)
    }

    /// Write settings to a TOML file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set an option that has no dedicated field.
    pub fn with_option(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    /// All options in the order they are handed to Ipopt.
    pub fn options(&self) -> Vec<(String, OptionValue)> {
        let mut options: Vec<(String, OptionValue)> = vec![
            ("tol".into(), self.tol.into()),
            ("constr_viol_tol".into(), self.constr_viol_tol.into()),
            ("max_iter".into(), self.max_iter.into()),
            (
                "linear_scaling_on_demand".into(),
                self.linear_scaling_on_demand.as_str().into(),
            ),
            (
                "hessian_approximation".into(),
                self.hessian_approximation.as_str().into(),
            ),
            ("print_level".into(), self.print_level.into()),
            (
                "print_user_options".into(),
                self.print_user_options.as_str().into(),
            ),
            ("derivative_test".into(), self.derivative_test.as_str().into()),
            ("derivative_test_tol".into(), self.derivative_test_tol.into()),
            (
                "derivative_test_perturbation".into(),
                self.derivative_test_perturbation.into(),
            ),
            (
                "point_perturbation_radius".into(),
                self.point_perturbation_radius.into(),
            ),
            (
                "linear_system_scaling".into(),
                self.linear_system_scaling.as_str().into(),
            ),
            ("linear_solver".into(), self.linear_solver.as_str().into()),
        ];
        options.extend(
            self.extra
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        options
    }
}
