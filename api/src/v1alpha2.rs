//! The `NginxProxy` parameters resource. It can be referenced from a GatewayClass
//! and from a Gateway. Every field is optional so that a Gateway-level object can
//! override single leaves of the class-level one.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

#[derive(Default, CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[kube(
    kind = "NginxProxy",
    group = "gateway.nginx.org",
    version = "v1alpha2",
    namespaced,
    schema = "disabled"
)]
#[kube(derive = "Default")]
#[kube(derive = "PartialEq")]
#[serde(rename_all = "camelCase")]
pub struct NginxProxySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<IpFamily>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<Telemetry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<NginxLogging>,

    #[serde(
        default,
        rename = "rewriteClientIP",
        skip_serializing_if = "Option::is_none"
    )]
    pub rewrite_client_ip: Option<RewriteClientIp>,

    #[serde(default, rename = "disableHTTP2", skip_serializing_if = "Option::is_none")]
    pub disable_http2: Option<bool>,

    #[serde(
        default,
        rename = "disableSNIHostValidation",
        skip_serializing_if = "Option::is_none"
    )]
    pub disable_sni_host_validation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_connections: Option<i32>,
}

#[derive(Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IpFamily {
    Dual,
    Ipv4,
    Ipv6,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exporter: Option<TelemetryExporter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_attributes: Option<Vec<SpanAttribute>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_features: Option<Vec<DisableTelemetryFeature>>,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryExporter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpanAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum DisableTelemetryFeature {
    DisableTracing,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NginxLogging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_level: Option<NginxErrorLogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_level: Option<AgentLogLevel>,
}

#[derive(
    Default, Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NginxErrorLogLevel {
    Debug,
    #[default]
    Info,
    Notice,
    Warn,
    Error,
    Crit,
    Alert,
    Emerg,
}

#[derive(
    Default, Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentLogLevel {
    Debug,
    #[default]
    Info,
    Error,
    Panic,
    Fatal,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewriteClientIp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RewriteClientIpMode>,

    #[serde(
        default,
        rename = "setIPRecursively",
        skip_serializing_if = "Option::is_none"
    )]
    pub set_ip_recursively: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_addresses: Option<Vec<RewriteClientIpAddress>>,
}

#[derive(Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum RewriteClientIpMode {
    ProxyProtocol,
    XForwardedFor,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewriteClientIpAddress {
    #[serde(rename = "type")]
    pub type_: AddressType,
    pub value: String,
}

#[derive(Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum AddressType {
    #[serde(rename = "CIDR")]
    #[strum(serialize = "CIDR")]
    Cidr,
    #[serde(rename = "IPAddress")]
    #[strum(serialize = "IPAddress")]
    IpAddress,
    Hostname,
}
