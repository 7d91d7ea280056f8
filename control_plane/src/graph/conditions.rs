//! Status conditions attached to graph records. The messages are part of the public contract:
//! status writers publish them unchanged.

use getset::{CopyGetters, Getters};
use serde::Serialize;
use std::collections::HashMap;
use strum::{Display, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum ConditionType {
    Accepted,
    Programmed,
    ResolvedRefs,
    Conflicted,
    SupportedVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum ConditionReason {
    Accepted,
    Programmed,
    ResolvedRefs,
    NoConflicts,
    SupportedVersion,
    UnsupportedVersion,
    GatewayClassConflict,
    InvalidParameters,
    ParametersRefNotFound,
    Invalid,
    UnsupportedValue,
    UnsupportedField,
    UnsupportedProtocol,
    InvalidCertificateRef,
    RefNotPermitted,
    InvalidRouteKinds,
    ProtocolConflict,
    HostnameConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Getters, CopyGetters)]
pub struct Condition {
    #[serde(rename = "type")]
    #[getset(get_copy = "pub")]
    type_: ConditionType,

    #[getset(get_copy = "pub")]
    status: ConditionStatus,

    #[getset(get_copy = "pub")]
    reason: ConditionReason,

    #[getset(get = "pub")]
    message: String,
}

impl Condition {
    pub fn new<M: Into<String>>(
        type_: ConditionType,
        status: ConditionStatus,
        reason: ConditionReason,
        message: M,
    ) -> Self {
        Self {
            type_,
            status,
            reason,
            message: message.into(),
        }
    }
}

/// Keeps the last condition of each type, at the position where the type first appeared.
pub fn deduplicate_conditions(conditions: Vec<Condition>) -> Vec<Condition> {
    let mut positions: HashMap<ConditionType, usize> = HashMap::new();
    let mut deduplicated: Vec<Condition> = Vec::with_capacity(conditions.len());
    for condition in conditions {
        match positions.get(&condition.type_) {
            Some(&position) => deduplicated[position] = condition,
            None => {
                positions.insert(condition.type_, deduplicated.len());
                deduplicated.push(condition);
            }
        }
    }
    deduplicated
}

pub fn has_matching_condition(conditions: &[Condition], condition: &Condition) -> bool {
    conditions.iter().any(|c| c == condition)
}

/// Overlays `conditions` on top of `defaults`, for status writers that publish every type.
pub fn defaults_with(defaults: Vec<Condition>, conditions: &[Condition]) -> Vec<Condition> {
    let mut merged = defaults;
    merged.extend_from_slice(conditions);
    deduplicate_conditions(merged)
}

fn condition<M: Into<String>>(
    type_: ConditionType,
    status: ConditionStatus,
    reason: ConditionReason,
    message: M,
) -> Condition {
    Condition::new(type_, status, reason, message)
}

pub mod gateway_class {
    use super::{Condition, ConditionReason as R, ConditionStatus as S, ConditionType as T, condition};

    pub fn defaults() -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::True, R::Accepted, "GatewayClass is accepted"),
            condition(
                T::SupportedVersion,
                S::True,
                R::SupportedVersion,
                "Gateway API CRD versions are supported",
            ),
        ]
    }

    pub fn unsupported_version(recommended: &str) -> Vec<Condition> {
        let message =
            format!("Gateway API CRD versions are not supported. Please install version {recommended}");
        vec![
            condition(T::Accepted, S::False, R::UnsupportedVersion, message.clone()),
            condition(T::SupportedVersion, S::False, R::UnsupportedVersion, message),
        ]
    }

    pub fn supported_version_best_effort(recommended: &str) -> Vec<Condition> {
        vec![condition(
            T::SupportedVersion,
            S::False,
            R::UnsupportedVersion,
            format!(
                "Gateway API CRD versions are not recommended. Recommended version is {recommended}"
            ),
        )]
    }

    pub fn conflict() -> Condition {
        condition(
            T::Accepted,
            S::False,
            R::GatewayClassConflict,
            "The resource is ignored due to a conflicting GatewayClass",
        )
    }

    pub fn resolved_refs() -> Condition {
        condition(
            T::ResolvedRefs,
            S::True,
            R::ResolvedRefs,
            "ParametersRef resource is resolved",
        )
    }

    pub fn ref_not_found() -> Condition {
        condition(
            T::ResolvedRefs,
            S::False,
            R::ParametersRefNotFound,
            "ParametersRef resource could not be found",
        )
    }

    pub fn ref_invalid(message: &str) -> Condition {
        condition(T::ResolvedRefs, S::False, R::InvalidParameters, message)
    }

    pub fn invalid_parameters(message: &str) -> Condition {
        condition(
            T::Accepted,
            S::True,
            R::InvalidParameters,
            format!("GatewayClass is accepted, but ParametersRef is ignored due to an error: {message}"),
        )
    }
}

pub mod gateway {
    use super::{Condition, ConditionReason as R, ConditionStatus as S, ConditionType as T, condition};

    pub fn defaults() -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::True, R::Accepted, "Gateway is accepted"),
            condition(T::Programmed, S::True, R::Programmed, "Gateway is programmed"),
        ]
    }

    pub fn invalid(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::Invalid, message),
            condition(T::Programmed, S::False, R::Invalid, message),
        ]
    }

    pub fn unsupported_value(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::UnsupportedValue, message),
            condition(T::Programmed, S::False, R::Invalid, message),
        ]
    }

    pub fn accepted_unsupported_field(field: &str) -> Condition {
        condition(
            T::Accepted,
            S::True,
            R::UnsupportedField,
            format!("The Gateway is accepted but the following unsupported fields were ignored: {field}"),
        )
    }

    pub fn resolved_refs() -> Condition {
        condition(
            T::ResolvedRefs,
            S::True,
            R::ResolvedRefs,
            "ParametersRef resource is resolved",
        )
    }

    pub fn ref_not_found() -> Condition {
        condition(
            T::ResolvedRefs,
            S::False,
            R::ParametersRefNotFound,
            "ParametersRef resource could not be found",
        )
    }

    pub fn ref_invalid(message: &str) -> Condition {
        condition(T::ResolvedRefs, S::False, R::InvalidParameters, message)
    }

    pub fn invalid_parameters(message: &str) -> Condition {
        condition(
            T::Accepted,
            S::True,
            R::InvalidParameters,
            format!("Gateway is accepted, but ParametersRef is ignored due to an error: {message}"),
        )
    }
}

pub mod listener {
    use super::{Condition, ConditionReason as R, ConditionStatus as S, ConditionType as T, condition};

    fn not_programmed(message: &str) -> Condition {
        condition(T::Programmed, S::False, R::Invalid, message)
    }

    pub fn defaults() -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::True, R::Accepted, "Listener is accepted"),
            condition(T::Programmed, S::True, R::Programmed, "Listener is programmed"),
            condition(T::ResolvedRefs, S::True, R::ResolvedRefs, "All references are resolved"),
            condition(T::Conflicted, S::False, R::NoConflicts, "No conflicts"),
        ]
    }

    pub fn unsupported_value(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::UnsupportedValue, message),
            not_programmed(message),
        ]
    }

    pub fn unsupported_protocol(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::UnsupportedProtocol, message),
            not_programmed(message),
        ]
    }

    pub fn invalid_certificate_ref(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::InvalidCertificateRef, message),
            condition(T::ResolvedRefs, S::False, R::InvalidCertificateRef, message),
            not_programmed(message),
        ]
    }

    pub fn ref_not_permitted(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::RefNotPermitted, message),
            condition(T::ResolvedRefs, S::False, R::RefNotPermitted, message),
            not_programmed(message),
        ]
    }

    pub fn invalid_route_kinds(message: &str) -> Vec<Condition> {
        vec![
            condition(T::ResolvedRefs, S::False, R::InvalidRouteKinds, message),
            not_programmed(message),
        ]
    }

    pub fn protocol_conflict(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::ProtocolConflict, message),
            condition(T::Conflicted, S::True, R::ProtocolConflict, message),
            not_programmed(message),
        ]
    }

    pub fn hostname_conflict(message: &str) -> Vec<Condition> {
        vec![
            condition(T::Accepted, S::False, R::HostnameConflict, message),
            condition(T::Conflicted, S::True, R::HostnameConflict, message),
            not_programmed(message),
        ]
    }
}
