//! Compiled Kubernetes label selectors.

use itertools::Itertools;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector as KubeLabelSelector;
use ngf_core::net::is_dns1123_subdomain;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;
use strum::EnumString;
use thiserror::Error;

const QUALIFIED_NAME_FMT: &str = "([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]";
const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
const LABEL_VALUE_FMT: &str = "(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?";
const LABEL_VALUE_MAX_LENGTH: usize = 63;

#[allow(clippy::expect_used)] // The pattern is a constant
static QUALIFIED_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{QUALIFIED_NAME_FMT}$")).expect("valid qualified name pattern")
});

#[allow(clippy::expect_used)] // The pattern is a constant
static LABEL_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{LABEL_VALUE_FMT}$")).expect("valid label value pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelSelectorError {
    #[error("\"{0}\" is not a valid label selector operator")]
    InvalidOperator(String),

    #[error("for 'in', 'notin' operators, values set can't be empty")]
    EmptyValues,

    #[error("values set must be empty for exists and does not exist")]
    UnexpectedValues,

    #[error("key: Invalid value: \"{key}\": {detail}")]
    InvalidKey { key: String, detail: String },

    #[error("values[{index}]: Invalid value: \"{value}\": {detail}")]
    InvalidValue {
        index: usize,
        value: String,
        detail: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumString)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
    #[strum(disabled)]
    Equals,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    fn new(key: &str, operator: Operator, values: &[String]) -> Result<Self, LabelSelectorError> {
        validate_label_key(key)?;
        match operator {
            Operator::In | Operator::NotIn if values.is_empty() => {
                return Err(LabelSelectorError::EmptyValues);
            }
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => {
                return Err(LabelSelectorError::UnexpectedValues);
            }
            _ => {}
        }
        for (index, value) in values.iter().enumerate() {
            validate_label_value(value).map_err(|detail| LabelSelectorError::InvalidValue {
                index,
                value: value.clone(),
                detail,
            })?;
        }

        Ok(Self {
            key: key.to_string(),
            operator,
            values: values.iter().cloned().collect(),
        })
    }

    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::In | Operator::Equals => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn => value.is_none_or(|v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, self.values.iter().join(",")),
            Operator::In => write!(f, "{} in ({})", self.key, self.values.iter().join(",")),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, self.values.iter().join(",")),
            Operator::Exists => f.write_str(&self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

fn validate_label_key(key: &str) -> Result<(), LabelSelectorError> {
    let parts: Vec<&str> = key.split('/').collect();
    let mut errors = Vec::new();

    let name = match parts.as_slice() {
        [name] => *name,
        [prefix, name] => {
            if prefix.is_empty() {
                errors.push("prefix part must be non-empty".to_string());
            } else {
                errors.extend(is_dns1123_subdomain(prefix).into_iter().map(|e| format!("prefix part {e}")));
            }
            *name
        }
        _ => {
            return Err(LabelSelectorError::InvalidKey {
                key: key.to_string(),
                detail: format!(
                    "a qualified name must consist of alphanumeric characters, '-', '_' or '.', and must \
                     start and end with an alphanumeric character (e.g. 'MyName',  or 'my.name',  or \
                     '123-abc', regex used for validation is '{QUALIFIED_NAME_FMT}') with an optional DNS \
                     subdomain prefix and '/' (e.g. 'example.com/MyName')"
                ),
            });
        }
    };

    if name.is_empty() {
        errors.push("name part must be non-empty".to_string());
    } else if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        errors.push(format!("name part must be no more than {QUALIFIED_NAME_MAX_LENGTH} characters"));
    }
    if !name.is_empty() && !QUALIFIED_NAME_REGEX.is_match(name) {
        errors.push(format!(
            "name part must consist of alphanumeric characters, '-', '_' or '.', and must start and \
             end with an alphanumeric character (e.g. 'MyName',  or 'my.name',  or '123-abc', regex \
             used for validation is '{QUALIFIED_NAME_FMT}')"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(LabelSelectorError::InvalidKey {
            key: key.to_string(),
            detail: errors.join("; "),
        })
    }
}

fn validate_label_value(value: &str) -> Result<(), String> {
    let mut errors = Vec::new();
    if value.len() > LABEL_VALUE_MAX_LENGTH {
        errors.push(format!("must be no more than {LABEL_VALUE_MAX_LENGTH} characters"));
    }
    if !LABEL_VALUE_REGEX.is_match(value) {
        errors.push(format!(
            "a valid label must be an empty string or consist of alphanumeric characters, '-', '_' \
             or '.', and must start and end with an alphanumeric character (e.g. 'MyValue',  or \
             'my_value',  or '12345', regex used for validation is '{LABEL_VALUE_FMT}')"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// A validated label selector. An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn compile(selector: &KubeLabelSelector) -> Result<Self, LabelSelectorError> {
        let mut requirements = Vec::new();

        for (key, value) in selector.match_labels.iter().flatten() {
            requirements.push(Requirement::new(key, Operator::Equals, std::slice::from_ref(value))?);
        }

        for expression in selector.match_expressions.iter().flatten() {
            let operator = expression
                .operator
                .parse::<Operator>()
                .map_err(|_| LabelSelectorError::InvalidOperator(expression.operator.clone()))?;
            let values = expression.values.as_deref().unwrap_or_default();
            requirements.push(Requirement::new(&expression.key, operator, values)?);
        }

        requirements.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(Self { requirements })
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl Display for LabelSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.requirements.iter().join(","))
    }
}

impl Serialize for LabelSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertables::{assert_err, assert_ok};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
    use rstest::rstest;

    fn expression(key: &str, operator: &str, values: Option<&[&str]>) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: values.map(|v| v.iter().map(ToString::to_string).collect()),
        }
    }

    fn selector(labels: &[(&str, &str)], expressions: Vec<LabelSelectorRequirement>) -> KubeLabelSelector {
        KubeLabelSelector {
            match_labels: Some(labels.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()),
            match_expressions: Some(expressions),
        }
    }

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[rstest]
    #[case(&[("team", "a")], true)]
    #[case(&[("team", "a"), ("env", "prod")], true)]
    #[case(&[("team", "a"), ("env", "dev")], false)]
    #[case(&[("team", "b")], false)]
    #[case(&[], false)]
    fn test_matches(#[case] pairs: &[(&str, &str)], #[case] expected: bool) {
        let compiled = assert_ok!(LabelSelector::compile(&selector(
            &[("team", "a")],
            vec![
                expression("env", "NotIn", Some(&["dev"])),
                expression("team", "Exists", None),
                expression("legacy", "DoesNotExist", None),
            ],
        )));

        assert_eq!(compiled.matches(&labels(pairs)), expected);
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let compiled = assert_ok!(LabelSelector::compile(&KubeLabelSelector::default()));
        assert!(compiled.is_empty());
        assert!(compiled.matches(&labels(&[("any", "thing")])));
    }

    #[test]
    fn test_display_is_sorted() {
        let compiled = assert_ok!(LabelSelector::compile(&selector(
            &[("team", "a")],
            vec![
                expression("env", "In", Some(&["prod", "canary"])),
                expression("debug", "DoesNotExist", None),
            ],
        )));
        assert_eq!(compiled.to_string(), "!debug,env in (canary,prod),team=a");
    }

    #[rstest]
    #[case(expression("team", "invalid", Some(&["a"])), "\"invalid\" is not a valid label selector operator")]
    #[case(expression("team", "In", Some(&[])), "for 'in', 'notin' operators, values set can't be empty")]
    #[case(expression("team", "Exists", Some(&["a"])), "values set must be empty for exists and does not exist")]
    #[case(expression("-team", "Exists", None), "key: Invalid value: \"-team\": name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character (e.g. 'MyName',  or 'my.name',  or '123-abc', regex used for validation is '([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]')")]
    fn test_compile_errors(#[case] requirement: LabelSelectorRequirement, #[case] expected: &str) {
        let err = assert_err!(LabelSelector::compile(&selector(&[], vec![requirement])));
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_invalid_label_value() {
        let err = assert_err!(LabelSelector::compile(&selector(&[("team", "not valid")], vec![])));
        assert!(matches!(err, LabelSelectorError::InvalidValue { index: 0, .. }));
    }

    #[test]
    fn test_prefixed_keys() {
        assert_ok!(LabelSelector::compile(&selector(&[("example.com/team", "a")], vec![])));
        assert_err!(LabelSelector::compile(&selector(&[("Example.com/team", "a")], vec![])));
    }
}
