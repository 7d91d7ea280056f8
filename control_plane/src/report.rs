//! A serializable view of a built graph, shaped like the statuses a status writer would publish.

use crate::graph::Graph;
use crate::graph::conditions::{self, Condition, defaults_with};
use crate::graph::gateway_class::GatewayClass;
use crate::graph::gateways::Gateway;
use crate::graph::label_selector::LabelSelector;
use crate::graph::listeners::{Listener, RouteGroupKind};
use crate::graph::nginx_proxy::NginxProxy;
use crate::kubernetes::objects::ObjectKey;
use ngf_api::v1alpha2::NginxProxySpec;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway_class: Option<GatewayClassReport>,
    gateway_class_exists: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignored_gateway_classes: Vec<IgnoredGatewayClassReport>,
    gateways: Vec<GatewayReport>,
    referenced_secrets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayClassReport {
    name: String,
    valid: bool,
    experimental_supported: bool,
    best_effort: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    nginx_proxy: Option<String>,
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredGatewayClassReport {
    name: String,
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReport {
    name: String,
    valid: bool,
    deployment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    nginx_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_nginx_proxy: Option<NginxProxySpec>,
    conditions: Vec<Condition>,
    listeners: Vec<ListenerReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerReport {
    name: String,
    protocol: String,
    port: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    valid: bool,
    attachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_route_label_selector: Option<LabelSelector>,
    supported_kinds: Vec<RouteGroupKind>,
    conditions: Vec<Condition>,
}

fn proxy_name(proxy: Option<&NginxProxy>) -> Option<String> {
    proxy
        .and_then(|proxy| ObjectKey::for_object(proxy.source().as_ref()).ok())
        .as_ref()
        .map(ToString::to_string)
}

impl From<&GatewayClass> for GatewayClassReport {
    fn from(gateway_class: &GatewayClass) -> Self {
        Self {
            name: gateway_class.source().metadata.name.clone().unwrap_or_default(),
            valid: gateway_class.valid(),
            experimental_supported: gateway_class.experimental_supported(),
            best_effort: gateway_class.best_effort(),
            nginx_proxy: proxy_name(gateway_class.nginx_proxy().as_ref()),
            conditions: defaults_with(conditions::gateway_class::defaults(), gateway_class.conditions()),
        }
    }
}

impl From<(&ObjectKey, &Gateway)> for GatewayReport {
    fn from((key, gateway): (&ObjectKey, &Gateway)) -> Self {
        Self {
            name: key.to_string(),
            valid: gateway.valid(),
            deployment_name: gateway.deployment_name().to_string(),
            nginx_proxy: proxy_name(gateway.nginx_proxy().as_ref()),
            effective_nginx_proxy: gateway.effective_nginx_proxy().as_ref().map(|effective| effective.spec().clone()),
            conditions: defaults_with(conditions::gateway::defaults(), gateway.conditions()),
            listeners: gateway.listeners().iter().map(ListenerReport::from).collect(),
        }
    }
}

impl From<&Listener> for ListenerReport {
    fn from(listener: &Listener) -> Self {
        Self {
            name: listener.name().clone(),
            protocol: listener.source().protocol.clone(),
            port: listener.port(),
            hostname: listener.hostname().map(ToString::to_string),
            valid: listener.valid(),
            attachable: listener.attachable(),
            resolved_secret: listener.resolved_secret().as_ref().map(ToString::to_string),
            allowed_route_label_selector: listener.allowed_route_label_selector().clone(),
            supported_kinds: listener.supported_kinds().clone(),
            conditions: defaults_with(conditions::listener::defaults(), listener.conditions()),
        }
    }
}

impl From<&Graph> for GraphReport {
    fn from(graph: &Graph) -> Self {
        Self {
            gateway_class: graph.gateway_class().as_ref().map(GatewayClassReport::from),
            gateway_class_exists: graph.gateway_class_exists(),
            ignored_gateway_classes: graph
                .ignored_gateway_classes()
                .keys()
                .map(|key| IgnoredGatewayClassReport {
                    name: key.to_string(),
                    conditions: vec![conditions::gateway_class::conflict()],
                })
                .collect(),
            gateways: graph
                .gateways()
                .iter()
                .flatten()
                .map(GatewayReport::from)
                .collect(),
            referenced_secrets: graph.referenced_secrets().keys().map(ToString::to_string).collect(),
        }
    }
}
