#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented
)]
#![allow(
    clippy::needless_continue,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_field_names
)]

pub mod config;
pub mod instrumentation;
pub mod net;

use std::fmt::{Display, Formatter};
use unicase::UniCase;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseInsensitiveString(UniCase<String>);

impl CaseInsensitiveString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(UniCase::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ends_with(&self, suffix: &Self) -> bool {
        let self_len = self.0.len();
        let suffix_len = suffix.0.len();
        if self_len < suffix_len || !self.0.is_char_boundary(self_len - suffix_len) {
            return false;
        }
        let self_suffix = Self::new(&self.0[self_len - suffix_len..]);
        self_suffix == *suffix
    }
}

impl Display for CaseInsensitiveString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CaseInsensitiveString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
