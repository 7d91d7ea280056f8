//! `NginxProxy` parameters: validation on intake and the Gateway over GatewayClass overlay.

use crate::graph::field::{FieldError, FieldErrors, FieldPath, FieldValue};
use getset::{CopyGetters, Getters};
use ipnet::IpNet;
use ngf_api::constants::DEFAULT_NGINX_METRICS_PORT;
use ngf_api::v1alpha2::{
    AddressType, Metrics, NginxLogging, NginxProxy as KubeNginxProxy, NginxProxySpec,
    RewriteClientIp, Telemetry, TelemetryExporter,
};
use ngf_core::net::{Port, validate_hostname};
use regex::Regex;
use std::net::IpAddr;
use std::sync::{Arc, LazyLock};
use tracing::debug;

#[allow(clippy::expect_used)] // The pattern is a constant
static ENDPOINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?(:[0-9]{1,5})?$").expect("valid endpoint pattern")
});

#[allow(clippy::expect_used)] // The pattern is a constant
static DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,4}(ms|s|m|h)?$").expect("valid duration pattern"));

#[allow(clippy::expect_used)] // The pattern is a constant
static SERVICE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid service name pattern"));

/// An `NginxProxy` object together with the outcome of its validation.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct NginxProxy {
    #[getset(get = "pub")]
    source: Arc<KubeNginxProxy>,

    #[getset(get_copy = "pub")]
    valid: bool,

    #[getset(get = "pub")]
    errors: FieldErrors,
}

/// Validates an `NginxProxy` object. The result is invalid when any field error was found.
pub fn validate_nginx_proxy(source: Arc<KubeNginxProxy>) -> NginxProxy {
    let errors = validate_spec(&source.spec);
    if !errors.is_empty() {
        debug!(
            "NginxProxy {}/{} is invalid: {}",
            source.metadata.namespace.as_deref().unwrap_or_default(),
            source.metadata.name.as_deref().unwrap_or_default(),
            errors
        );
    }

    NginxProxy {
        valid: errors.is_empty(),
        errors,
        source,
    }
}

fn validate_spec(spec: &NginxProxySpec) -> FieldErrors {
    let path = FieldPath::new("spec");
    let mut errors = FieldErrors::new();

    if let Some(metrics) = &spec.metrics {
        errors.extend(validate_metrics(&path.child("metrics"), metrics));
    }
    if let Some(telemetry) = &spec.telemetry {
        errors.extend(validate_telemetry(&path.child("telemetry"), telemetry));
    }
    if let Some(rewrite) = &spec.rewrite_client_ip {
        errors.extend(validate_rewrite_client_ip(&path.child("rewriteClientIP"), rewrite));
    }
    if let Some(connections) = spec.worker_connections {
        if !(1..=65535).contains(&connections) {
            errors.push(FieldError::invalid(
                path.child("workerConnections"),
                FieldValue::from(connections),
                "must be between 1-65535",
            ));
        }
    }

    errors
}

fn validate_metrics(path: &FieldPath, metrics: &Metrics) -> Vec<FieldError> {
    metrics
        .port
        .and_then(|port| {
            Port::try_from(port)
                .err()
                .map(|err| FieldError::invalid(path.child("port"), FieldValue::from(port), err.to_string()))
        })
        .into_iter()
        .collect()
}

fn validate_telemetry(path: &FieldPath, telemetry: &Telemetry) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(exporter) = &telemetry.exporter {
        errors.extend(validate_exporter(&path.child("exporter"), exporter));
    }

    if let Some(service_name) = &telemetry.service_name {
        if !SERVICE_NAME_REGEX.is_match(service_name) {
            errors.push(FieldError::invalid(
                path.child("serviceName"),
                FieldValue::str(service_name),
                "must only contain alphanumeric characters, '-' or '_'",
            ));
        }
    }

    let attributes_path = path.child("spanAttributes");
    for (index, attribute) in telemetry.span_attributes.iter().flatten().enumerate() {
        let attribute_path = attributes_path.index(index);
        for (name, value) in [("key", &attribute.key), ("value", &attribute.value)] {
            if value.is_empty() {
                errors.push(FieldError::required(
                    attribute_path.child(name),
                    format!("{name} cannot be empty"),
                ));
            } else if value.contains('"') {
                errors.push(FieldError::invalid(
                    attribute_path.child(name),
                    FieldValue::str(value.as_str()),
                    "must not contain double quotes",
                ));
            }
        }
    }

    errors
}

fn validate_exporter(path: &FieldPath, exporter: &TelemetryExporter) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(endpoint) = &exporter.endpoint {
        if endpoint.is_empty() {
            errors.push(FieldError::required(path.child("endpoint"), "endpoint cannot be empty"));
        } else if !ENDPOINT_REGEX.is_match(endpoint) {
            errors.push(FieldError::invalid(
                path.child("endpoint"),
                FieldValue::str(endpoint),
                "must be a valid endpoint in the form host[:port]",
            ));
        }
    }

    if let Some(interval) = &exporter.interval {
        if !DURATION_REGEX.is_match(interval) {
            errors.push(FieldError::invalid(
                path.child("interval"),
                FieldValue::str(interval),
                "must be a valid duration, for example 5s",
            ));
        }
    }

    for (name, value) in [("batchSize", exporter.batch_size), ("batchCount", exporter.batch_count)] {
        if let Some(value) = value.filter(|v| *v <= 0) {
            errors.push(FieldError::invalid(
                path.child(name),
                FieldValue::from(value),
                "must be greater than 0",
            ));
        }
    }

    errors
}

fn validate_rewrite_client_ip(path: &FieldPath, rewrite: &RewriteClientIp) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let addresses = rewrite.trusted_addresses.as_deref().unwrap_or_default();

    if !addresses.is_empty() && rewrite.mode.is_none() {
        errors.push(FieldError::required(
            path.child("mode"),
            "mode must be set when trustedAddresses is set",
        ));
    }

    let addresses_path = path.child("trustedAddresses");
    for (index, address) in addresses.iter().enumerate() {
        let detail = match address.type_ {
            AddressType::Cidr => address
                .value
                .parse::<IpNet>()
                .err()
                .map(|_| "must be a valid CIDR block".to_string()),
            AddressType::IpAddress => address
                .value
                .parse::<IpAddr>()
                .err()
                .map(|_| "must be a valid IP address".to_string()),
            AddressType::Hostname => validate_hostname(&address.value).err().map(|err| err.to_string()),
        };

        if let Some(detail) = detail {
            errors.push(FieldError::invalid(
                addresses_path.index(index).child("value"),
                FieldValue::str(address.value.as_str()),
                detail,
            ));
        }
    }

    errors
}

/// The merged view of the GatewayClass and Gateway level `NginxProxy` specs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveNginxProxy(NginxProxySpec);

impl EffectiveNginxProxy {
    pub fn spec(&self) -> &NginxProxySpec {
        &self.0
    }

    /// Whether NGINX exposes metrics at all; absent configuration means enabled.
    pub fn metrics_enabled(&self) -> bool {
        !self
            .0
            .metrics
            .as_ref()
            .and_then(|metrics| metrics.disable)
            .unwrap_or(false)
    }
}

/// Returns the port listeners must not use, if metrics are enabled.
pub fn protected_metrics_port(effective: Option<&EffectiveNginxProxy>) -> Option<u16> {
    let Some(effective) = effective else {
        return Some(DEFAULT_NGINX_METRICS_PORT);
    };
    if !effective.metrics_enabled() {
        return None;
    }

    let port = effective
        .0
        .metrics
        .as_ref()
        .and_then(|metrics| metrics.port)
        .and_then(|port| Port::try_from(port).ok())
        .map_or(DEFAULT_NGINX_METRICS_PORT, Port::get);
    Some(port)
}

fn valid_spec(proxy: Option<&NginxProxy>) -> Option<&NginxProxySpec> {
    proxy.filter(|p| p.valid()).map(|p| &p.source().spec)
}

/// Overlays the Gateway level spec on the GatewayClass level one. Invalid objects are skipped,
/// so a broken Gateway level object falls back to the class values.
pub fn build_effective_nginx_proxy(
    class_proxy: Option<&NginxProxy>,
    gateway_proxy: Option<&NginxProxy>,
) -> Option<EffectiveNginxProxy> {
    match (valid_spec(class_proxy), valid_spec(gateway_proxy)) {
        (None, None) => None,
        (Some(global), None) => Some(EffectiveNginxProxy(global.clone())),
        (None, Some(local)) => Some(EffectiveNginxProxy(local.clone())),
        (Some(global), Some(local)) => Some(EffectiveNginxProxy(overlay_spec(global, local))),
    }
}

fn overlay<T: Clone>(global: Option<&T>, local: Option<&T>) -> Option<T> {
    local.or(global).cloned()
}

fn overlay_with<T, F>(global: Option<&T>, local: Option<&T>, merge: F) -> Option<T>
where
    T: Clone,
    F: FnOnce(&T, &T) -> T,
{
    match (global, local) {
        (Some(global), Some(local)) => Some(merge(global, local)),
        _ => overlay(global, local),
    }
}

fn overlay_spec(global: &NginxProxySpec, local: &NginxProxySpec) -> NginxProxySpec {
    NginxProxySpec {
        ip_family: overlay(global.ip_family.as_ref(), local.ip_family.as_ref()),
        telemetry: overlay_with(global.telemetry.as_ref(), local.telemetry.as_ref(), overlay_telemetry),
        metrics: overlay_with(global.metrics.as_ref(), local.metrics.as_ref(), |g, l| Metrics {
            port: overlay(g.port.as_ref(), l.port.as_ref()),
            disable: overlay(g.disable.as_ref(), l.disable.as_ref()),
        }),
        logging: overlay_with(global.logging.as_ref(), local.logging.as_ref(), |g, l| NginxLogging {
            error_level: overlay(g.error_level.as_ref(), l.error_level.as_ref()),
            agent_level: overlay(g.agent_level.as_ref(), l.agent_level.as_ref()),
        }),
        rewrite_client_ip: overlay_with(
            global.rewrite_client_ip.as_ref(),
            local.rewrite_client_ip.as_ref(),
            |g, l| RewriteClientIp {
                mode: overlay(g.mode.as_ref(), l.mode.as_ref()),
                set_ip_recursively: overlay(g.set_ip_recursively.as_ref(), l.set_ip_recursively.as_ref()),
                trusted_addresses: overlay(g.trusted_addresses.as_ref(), l.trusted_addresses.as_ref()),
            },
        ),
        disable_http2: overlay(global.disable_http2.as_ref(), local.disable_http2.as_ref()),
        disable_sni_host_validation: overlay(
            global.disable_sni_host_validation.as_ref(),
            local.disable_sni_host_validation.as_ref(),
        ),
        worker_connections: overlay(global.worker_connections.as_ref(), local.worker_connections.as_ref()),
    }
}

fn overlay_telemetry(global: &Telemetry, local: &Telemetry) -> Telemetry {
    Telemetry {
        exporter: overlay_with(global.exporter.as_ref(), local.exporter.as_ref(), |g, l| TelemetryExporter {
            interval: overlay(g.interval.as_ref(), l.interval.as_ref()),
            batch_size: overlay(g.batch_size.as_ref(), l.batch_size.as_ref()),
            batch_count: overlay(g.batch_count.as_ref(), l.batch_count.as_ref()),
            endpoint: overlay(g.endpoint.as_ref(), l.endpoint.as_ref()),
        }),
        service_name: overlay(global.service_name.as_ref(), local.service_name.as_ref()),
        span_attributes: overlay(global.span_attributes.as_ref(), local.span_attributes.as_ref()),
        disabled_features: overlay(global.disabled_features.as_ref(), local.disabled_features.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use ngf_api::v1alpha2::{IpFamily, RewriteClientIpAddress, RewriteClientIpMode, SpanAttribute};
    use proptest::prelude::*;
    use rstest::rstest;

    fn proxy(spec: NginxProxySpec) -> NginxProxy {
        validate_nginx_proxy(Arc::new(KubeNginxProxy {
            metadata: ObjectMeta {
                name: Some("np".to_string()),
                namespace: Some("test".to_string()),
                ..Default::default()
            },
            spec,
        }))
    }

    fn metrics(port: Option<i32>, disable: Option<bool>) -> NginxProxySpec {
        NginxProxySpec {
            metrics: Some(Metrics { port, disable }),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_nginx_proxy() {
        let proxy = proxy(NginxProxySpec {
            ip_family: Some(IpFamily::Ipv4),
            telemetry: Some(Telemetry {
                exporter: Some(TelemetryExporter {
                    interval: Some("5s".to_string()),
                    batch_size: Some(512),
                    batch_count: Some(4),
                    endpoint: Some("collector.monitoring:4317".to_string()),
                }),
                service_name: Some("my-svc".to_string()),
                span_attributes: Some(vec![SpanAttribute {
                    key: "team".to_string(),
                    value: "a".to_string(),
                }]),
                disabled_features: None,
            }),
            worker_connections: Some(1024),
            ..metrics(Some(9114), None)
        });

        assert!(proxy.valid(), "{}", proxy.errors());
    }

    #[rstest]
    #[case(metrics(Some(0), None), "spec.metrics.port: Invalid value: 0: port must be between 1-65535")]
    #[case(
        NginxProxySpec { worker_connections: Some(70000), ..Default::default() },
        "spec.workerConnections: Invalid value: 70000: must be between 1-65535"
    )]
    #[case(
        NginxProxySpec {
            telemetry: Some(Telemetry {
                exporter: Some(TelemetryExporter { endpoint: Some("bad endpoint".to_string()), ..Default::default() }),
                ..Default::default()
            }),
            ..Default::default()
        },
        "spec.telemetry.exporter.endpoint: Invalid value: \"bad endpoint\": must be a valid endpoint in the form host[:port]"
    )]
    #[case(
        NginxProxySpec {
            telemetry: Some(Telemetry {
                exporter: Some(TelemetryExporter { batch_size: Some(0), ..Default::default() }),
                ..Default::default()
            }),
            ..Default::default()
        },
        "spec.telemetry.exporter.batchSize: Invalid value: 0: must be greater than 0"
    )]
    #[case(
        NginxProxySpec {
            telemetry: Some(Telemetry {
                span_attributes: Some(vec![SpanAttribute { key: String::new(), value: "v".to_string() }]),
                ..Default::default()
            }),
            ..Default::default()
        },
        "spec.telemetry.spanAttributes[0].key: Required value: key cannot be empty"
    )]
    #[case(
        NginxProxySpec {
            rewrite_client_ip: Some(RewriteClientIp {
                mode: Some(RewriteClientIpMode::ProxyProtocol),
                set_ip_recursively: None,
                trusted_addresses: Some(vec![RewriteClientIpAddress {
                    type_: AddressType::Cidr,
                    value: "10.0.0.0/33".to_string(),
                }]),
            }),
            ..Default::default()
        },
        "spec.rewriteClientIP.trustedAddresses[0].value: Invalid value: \"10.0.0.0/33\": must be a valid CIDR block"
    )]
    #[case(
        NginxProxySpec {
            rewrite_client_ip: Some(RewriteClientIp {
                mode: None,
                set_ip_recursively: None,
                trusted_addresses: Some(vec![RewriteClientIpAddress {
                    type_: AddressType::IpAddress,
                    value: "10.0.0.1".to_string(),
                }]),
            }),
            ..Default::default()
        },
        "spec.rewriteClientIP.mode: Required value: mode must be set when trustedAddresses is set"
    )]
    fn test_invalid_nginx_proxy(#[case] spec: NginxProxySpec, #[case] expected: &str) {
        let proxy = proxy(spec);

        assert!(!proxy.valid());
        assert_eq!(proxy.errors().to_string(), expected);
    }

    #[test]
    fn test_effective_requires_a_valid_object() {
        let invalid = proxy(metrics(Some(-1), None));
        let valid = proxy(metrics(Some(9200), None));

        assert_eq!(build_effective_nginx_proxy(None, None), None);
        assert_eq!(build_effective_nginx_proxy(Some(&invalid), Some(&invalid)), None);
        assert_eq!(
            build_effective_nginx_proxy(Some(&valid), Some(&invalid)).map(|e| e.spec().clone()),
            Some(valid.source().spec.clone())
        );
        assert_eq!(
            build_effective_nginx_proxy(Some(&invalid), Some(&valid)).map(|e| e.spec().clone()),
            Some(valid.source().spec.clone())
        );
    }

    #[test]
    fn test_effective_overlays_leaves() {
        let class = proxy(NginxProxySpec {
            ip_family: Some(IpFamily::Dual),
            disable_http2: Some(true),
            telemetry: Some(Telemetry {
                exporter: Some(TelemetryExporter {
                    endpoint: Some("collector:4317".to_string()),
                    interval: Some("5s".to_string()),
                    ..Default::default()
                }),
                span_attributes: Some(vec![SpanAttribute {
                    key: "a".to_string(),
                    value: "1".to_string(),
                }]),
                ..Default::default()
            }),
            ..metrics(Some(9114), Some(false))
        });
        let gateway = proxy(NginxProxySpec {
            ip_family: Some(IpFamily::Ipv6),
            telemetry: Some(Telemetry {
                exporter: Some(TelemetryExporter {
                    interval: Some("10s".to_string()),
                    ..Default::default()
                }),
                span_attributes: Some(vec![SpanAttribute {
                    key: "b".to_string(),
                    value: "2".to_string(),
                }]),
                ..Default::default()
            }),
            ..metrics(None, Some(true))
        });

        let effective = build_effective_nginx_proxy(Some(&class), Some(&gateway)).unwrap_or_default();
        let spec = effective.spec();

        assert_eq!(spec.ip_family, Some(IpFamily::Ipv6));
        assert_eq!(spec.disable_http2, Some(true));
        let metrics = spec.metrics.clone().unwrap_or_default();
        assert_eq!(metrics.port, Some(9114));
        assert_eq!(metrics.disable, Some(true));
        let exporter = spec
            .telemetry
            .as_ref()
            .and_then(|t| t.exporter.clone())
            .unwrap_or_default();
        assert_eq!(exporter.endpoint.as_deref(), Some("collector:4317"));
        assert_eq!(exporter.interval.as_deref(), Some("10s"));
        let attributes = spec
            .telemetry
            .as_ref()
            .and_then(|t| t.span_attributes.clone())
            .unwrap_or_default();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].key, "b");
    }

    #[rstest]
    #[case(None, Some(DEFAULT_NGINX_METRICS_PORT))]
    #[case(Some(metrics(None, None)), Some(DEFAULT_NGINX_METRICS_PORT))]
    #[case(Some(metrics(Some(9200), None)), Some(9200))]
    #[case(Some(metrics(Some(9200), Some(true))), None)]
    #[case(Some(NginxProxySpec::default()), Some(DEFAULT_NGINX_METRICS_PORT))]
    fn test_protected_metrics_port(#[case] spec: Option<NginxProxySpec>, #[case] expected: Option<u16>) {
        let effective = spec.map(EffectiveNginxProxy);
        assert_eq!(protected_metrics_port(effective.as_ref()), expected);
    }

    proptest! {
        #[test]
        fn test_local_leaves_win(class_port in 1i32..65535, gateway_port in proptest::option::of(1i32..65535)) {
            let class = proxy(metrics(Some(class_port), None));
            let gateway = proxy(metrics(gateway_port, None));

            let effective = build_effective_nginx_proxy(Some(&class), Some(&gateway));
            let port = effective.and_then(|e| e.spec().metrics.as_ref().and_then(|m| m.port));
            prop_assert_eq!(port, Some(gateway_port.unwrap_or(class_port)));
        }
    }
}
