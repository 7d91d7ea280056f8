use crate::graph::conditions::{Condition, gateway_class};
use crate::kubernetes::objects::ObjectKey;
use getset::{CopyGetters, Getters};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use ngf_api::constants::{BUNDLE_VERSION_ANNOTATION, CHANNEL_ANNOTATION, SUPPORTED_BUNDLE_VERSION};
use std::collections::BTreeMap;
use strum::{EnumString, IntoStaticStr};
use tracing::debug;

/// The Gateway API CRDs whose bundle versions gate the GatewayClass.
pub const GATEWAY_CRDS: [&str; 7] = [
    "gatewayclasses.gateway.networking.k8s.io",
    "gateways.gateway.networking.k8s.io",
    "httproutes.gateway.networking.k8s.io",
    "referencegrants.gateway.networking.k8s.io",
    "backendtlspolicies.gateway.networking.k8s.io",
    "grpcroutes.gateway.networking.k8s.io",
    "tlsroutes.gateway.networking.k8s.io",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FeatureChannel {
    Standard,
    Experimental,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Getters)]
pub struct ApiVersion {
    #[getset(get = "pub")]
    major: String,

    #[getset(get = "pub")]
    minor: String,
}

/// Parses `vMAJOR.MINOR.PATCH[-pre]`. Anything with fewer than three components parses to the
/// empty version, which never matches a real one.
pub fn parse_version_string(version: &str) -> ApiVersion {
    let bits: Vec<&str> = version.split('.').collect();
    if bits.len() < 3 {
        return ApiVersion::default();
    }

    let major = bits[0].strip_prefix('v').unwrap_or(bits[0]);
    ApiVersion {
        major: major.to_string(),
        minor: bits[1].to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct CrdVersionValidation {
    #[getset(get = "pub")]
    conditions: Vec<Condition>,

    #[getset(get_copy = "pub")]
    valid: bool,

    /// Some installed Gateway API CRD comes from the experimental channel.
    #[getset(get_copy = "pub")]
    experimental: bool,

    #[getset(get_copy = "pub")]
    best_effort: bool,
}

fn annotation<'a>(metadata: &'a ObjectMeta, name: &str) -> &'a str {
    metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(name))
        .map(String::as_str)
        .unwrap_or_default()
}

fn bundle_versions(
    crd_metadata: &BTreeMap<ObjectKey, ObjectMeta>,
) -> impl Iterator<Item = (ApiVersion, FeatureChannel)> + '_ {
    crd_metadata
        .iter()
        .filter(|(key, _)| GATEWAY_CRDS.contains(&key.name().as_str()))
        .map(|(_, metadata)| {
            let version = parse_version_string(annotation(metadata, BUNDLE_VERSION_ANNOTATION));
            // A missing channel annotation means the standard channel.
            let channel = annotation(metadata, CHANNEL_ANNOTATION)
                .parse()
                .unwrap_or(FeatureChannel::Standard);
            (version, channel)
        })
}

/// Compares the installed Gateway API CRD bundle versions with the supported one.
pub fn validate_crd_versions(crd_metadata: &BTreeMap<ObjectKey, ObjectMeta>) -> CrdVersionValidation {
    let supported = parse_version_string(SUPPORTED_BUNDLE_VERSION);

    let mut unsupported = false;
    let mut best_effort = false;
    let mut experimental = false;

    for (version, channel) in bundle_versions(crd_metadata) {
        if version.major != supported.major {
            unsupported = true;
        } else if version.minor != supported.minor {
            best_effort = true;
        }
        experimental |= channel == FeatureChannel::Experimental;
    }

    if unsupported {
        debug!("Installed Gateway API CRDs have an unsupported major version");
        return CrdVersionValidation {
            conditions: gateway_class::unsupported_version(SUPPORTED_BUNDLE_VERSION),
            valid: false,
            experimental,
            best_effort: false,
        };
    }

    if best_effort {
        debug!("Installed Gateway API CRDs have a different minor version, running best effort");
        return CrdVersionValidation {
            conditions: gateway_class::supported_version_best_effort(SUPPORTED_BUNDLE_VERSION),
            valid: true,
            experimental,
            best_effort,
        };
    }

    CrdVersionValidation {
        conditions: Vec::new(),
        valid: true,
        experimental,
        best_effort: false,
    }
}
