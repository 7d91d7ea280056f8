use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;
use thiserror::Error;

const DNS1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const DNS1123_SUBDOMAIN_ERROR_MSG: &str = "a lowercase RFC 1123 subdomain must consist of lower case \
     alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";
const WILDCARD_DNS1123_SUBDOMAIN_ERROR_MSG: &str = "a wildcard DNS-1123 subdomain must start with \
     '*.', followed by a valid DNS subdomain, which must consist of lower case alphanumeric \
     characters, '-' or '.' and end with an alphanumeric character";

static DNS1123_SUBDOMAIN_FMT: LazyLock<String> =
    LazyLock::new(|| format!("{DNS1123_LABEL_FMT}(\\.{DNS1123_LABEL_FMT})*"));

static WILDCARD_DNS1123_SUBDOMAIN_FMT: LazyLock<String> =
    LazyLock::new(|| format!("\\*\\.{}", *DNS1123_SUBDOMAIN_FMT));

#[allow(clippy::expect_used)] // The patterns are constants
static DNS1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", *DNS1123_SUBDOMAIN_FMT)).expect("valid subdomain pattern")
});

#[allow(clippy::expect_used)] // The patterns are constants
static WILDCARD_DNS1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", *WILDCARD_DNS1123_SUBDOMAIN_FMT))
        .expect("valid wildcard subdomain pattern")
});

fn max_len_error(length: usize) -> String {
    format!("must be no more than {length} characters")
}

fn regex_error(message: &str, fmt: &str, example: &str) -> String {
    format!("{message} (e.g. '{example}', regex used for validation is '{fmt}')")
}

/// Returns the reasons `value` is not a DNS-1123 subdomain; empty when it is one.
pub fn is_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(max_len_error(DNS1123_SUBDOMAIN_MAX_LENGTH));
    }
    if !DNS1123_SUBDOMAIN_REGEX.is_match(value) {
        errors.push(regex_error(
            DNS1123_SUBDOMAIN_ERROR_MSG,
            &DNS1123_SUBDOMAIN_FMT,
            "example.com",
        ));
    }
    errors
}

/// Returns the reasons `value` is not a `*.` prefixed DNS-1123 subdomain.
pub fn is_wildcard_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(max_len_error(DNS1123_SUBDOMAIN_MAX_LENGTH));
    }
    if !WILDCARD_DNS1123_SUBDOMAIN_REGEX.is_match(value) {
        errors.push(regex_error(
            WILDCARD_DNS1123_SUBDOMAIN_ERROR_MSG,
            &WILDCARD_DNS1123_SUBDOMAIN_FMT,
            "*.example.com",
        ));
    }
    errors
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostnameError(String);

/// Validates a listener or route hostname. A leading `*.` label is permitted.
pub fn validate_hostname(hostname: &str) -> Result<(), HostnameError> {
    if hostname.is_empty() {
        return Err(HostnameError("cannot be empty string".to_string()));
    }

    let errors = if hostname.starts_with("*.") {
        is_wildcard_dns1123_subdomain(hostname)
    } else {
        is_dns1123_subdomain(hostname)
    };

    if errors.is_empty() {
        Ok(())
    } else {
        Err(HostnameError(errors.join(", ")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("port must be between 1-65535")]
pub struct PortRangeError;

/// A TCP port in `[1, 65535]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(u16);

impl Port {
    pub fn new(port: u16) -> Option<Self> {
        (port != 0).then_some(Self(port))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<i32> for Port {
    type Error = PortRangeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(PortRangeError)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
