use getset::{CopyGetters, Getters};
use ngf_api::constants::DEFAULT_CONTROLLER_NAME;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use typed_builder::TypedBuilder;

/// Everything the graph build reads besides the cluster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters, CopyGetters)]
pub struct GraphOptions {
    /// The GatewayClass this controller serves.
    #[getset(get = "pub")]
    #[builder(setter(into))]
    gateway_class_name: String,

    #[getset(get = "pub")]
    #[builder(default = DEFAULT_CONTROLLER_NAME.to_string(), setter(into))]
    controller_name: String,

    #[getset(get_copy = "pub")]
    #[builder(default)]
    experimental_features: bool,
}

#[derive(
    Validate, Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters,
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfiguration {
    #[getset(get = "pub")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(min_length = 1)]
    #[validate(max_length = 253)]
    gateway_class_name: Option<String>,

    #[getset(get = "pub")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(pattern = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*/[A-Za-z0-9/\-._~%!$&'()*+,;=:]+$")]
    controller_name: Option<String>,

    #[getset(get_copy = "pub")]
    #[serde(default)]
    experimental_features: bool,

    /// A `tracing` filter directive, e.g. `info` or `ngf_control_plane=debug`.
    #[getset(get = "pub")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(min_length = 1)]
    log_level: Option<String>,
}
