//! Field validation errors rendered the way the Kubernetes API server renders them, so that
//! condition messages read the same as upstream admission errors.

use itertools::Itertools;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A dotted path into an object, e.g. `spec.infrastructure.parametersRef.kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new<S: Into<String>>(root: S) -> Self {
        Self(root.into())
    }

    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The offending value of a field error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Printed quoted.
    Str(String),
    Int(i64),
    /// Printed as is, e.g. a namespaced name.
    Raw(String),
}

impl FieldValue {
    pub fn str<S: Into<String>>(value: S) -> Self {
        Self::Str(value.into())
    }

    pub fn raw<S: ToString>(value: S) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Str(value) => f.write_str(&quote(value)),
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Raw(value) => f.write_str(value),
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_all(values: &[String]) -> String {
    values.iter().map(|v| quote(v)).join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{path}: Invalid value: {value}: {detail}")]
    Invalid {
        path: FieldPath,
        value: FieldValue,
        detail: String,
    },

    #[error("{path}: Unsupported value: {value}: supported values: {}", quote_all(.supported))]
    NotSupported {
        path: FieldPath,
        value: FieldValue,
        supported: Vec<String>,
    },

    #[error("{path}: Required value: {detail}")]
    Required { path: FieldPath, detail: String },

    #[error("{path}: Forbidden: {detail}")]
    Forbidden { path: FieldPath, detail: String },

    #[error("{path}: Not found: {value}")]
    NotFound { path: FieldPath, value: FieldValue },
}

impl FieldError {
    pub fn invalid<D: Into<String>>(path: FieldPath, value: FieldValue, detail: D) -> Self {
        Self::Invalid {
            path,
            value,
            detail: detail.into(),
        }
    }

    pub fn not_supported<S: AsRef<str>>(path: FieldPath, value: FieldValue, supported: &[S]) -> Self {
        Self::NotSupported {
            path,
            value,
            supported: supported.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn required<D: Into<String>>(path: FieldPath, detail: D) -> Self {
        Self::Required {
            path,
            detail: detail.into(),
        }
    }

    pub fn forbidden<D: Into<String>>(path: FieldPath, detail: D) -> Self {
        Self::Forbidden {
            path,
            detail: detail.into(),
        }
    }

    pub fn not_found(path: FieldPath, value: FieldValue) -> Self {
        Self::NotFound { path, value }
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            FieldError::Invalid { path, .. }
            | FieldError::NotSupported { path, .. }
            | FieldError::Required { path, .. }
            | FieldError::Forbidden { path, .. }
            | FieldError::NotFound { path, .. } => path,
        }
    }
}

/// An ordered list of field errors that prints as one aggregate message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend<I: IntoIterator<Item = FieldError>>(&mut self, errors: I) {
        self.0.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl From<Vec<FieldError>> for FieldErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let messages = self.0.iter().map(ToString::to_string).unique().collect_vec();
        match messages.as_slice() {
            [] => Ok(()),
            [single] => f.write_str(single),
            many => write!(f, "[{}]", many.join(", ")),
        }
    }
}

impl std::error::Error for FieldErrors {}
