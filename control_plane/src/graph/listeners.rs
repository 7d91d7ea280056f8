//! Per-listener validation of a Gateway.

use crate::graph::conditions::{self, Condition};
use crate::graph::field::{FieldError, FieldPath, FieldValue};
use crate::graph::label_selector::LabelSelector;
use crate::graph::reference_grants::{FromResource, ReferenceGrantResolver, to_secret};
use crate::graph::secrets::SecretResolver;
use crate::kubernetes::objects::ObjectKey;
use gateway_api::apis::standard::gateways::{
    GatewayListeners as KubeListener, GatewayListenersAllowedRoutesNamespacesFrom,
    GatewayListenersAllowedRoutesNamespacesSelector, GatewayListenersTls, GatewayListenersTlsMode,
};
use getset::{CopyGetters, Getters};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector as KubeLabelSelector, LabelSelectorRequirement,
};
use ngf_api::constants::{
    CORE_GROUP, GATEWAY_API_GROUP, GRPC_ROUTE_KIND, HTTP_ROUTE_KIND, SECRET_KIND, TLS_ROUTE_KIND,
};
use ngf_core::net::{Port, validate_hostname};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumString, IntoStaticStr, VariantArray};
use tracing::debug;

/// A route kind a listener accepts, with the group always spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteGroupKind {
    pub group: String,
    pub kind: String,
}

impl RouteGroupKind {
    pub fn new<G: Into<String>, K: Into<String>>(group: G, kind: K) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

/// Absent means `Terminate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
enum TlsMode {
    Terminate,
    Passthrough,
}

impl From<&GatewayListenersTls> for TlsMode {
    fn from(tls: &GatewayListenersTls) -> Self {
        match tls.mode {
            Some(GatewayListenersTlsMode::Passthrough) => TlsMode::Passthrough,
            Some(GatewayListenersTlsMode::Terminate) | None => TlsMode::Terminate,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr, VariantArray,
)]
pub enum ListenerProtocol {
    #[strum(serialize = "HTTP")]
    Http,
    #[strum(serialize = "HTTPS")]
    Https,
    #[strum(serialize = "TLS")]
    Tls,
}

/// Listeners sharing a port must belong to the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolFamily {
    Plain,
    Encrypted,
}

impl ListenerProtocol {
    pub fn family(self) -> ProtocolFamily {
        match self {
            ListenerProtocol::Http => ProtocolFamily::Plain,
            ListenerProtocol::Https | ListenerProtocol::Tls => ProtocolFamily::Encrypted,
        }
    }

    pub fn route_kinds(self) -> &'static [&'static str] {
        match self {
            ListenerProtocol::Http | ListenerProtocol::Https => &[HTTP_ROUTE_KIND, GRPC_ROUTE_KIND],
            ListenerProtocol::Tls => &[TLS_ROUTE_KIND],
        }
    }

    fn default_supported_kinds(self) -> Vec<RouteGroupKind> {
        self.route_kinds()
            .iter()
            .map(|kind| RouteGroupKind::new(GATEWAY_API_GROUP, *kind))
            .collect()
    }

    fn supported_names() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|p| <&'static str>::from(*p)).collect()
    }
}

/// A validated listener of a Gateway.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Listener {
    #[getset(get = "pub")]
    name: String,

    /// The Gateway this listener belongs to.
    #[getset(get = "pub")]
    gateway_name: ObjectKey,

    #[getset(get = "pub")]
    source: KubeListener,

    /// `None` when the protocol is not supported.
    #[getset(get_copy = "pub")]
    protocol: Option<ListenerProtocol>,

    #[getset(get_copy = "pub")]
    valid: bool,

    /// Routes may try to attach even when the listener is invalid.
    #[getset(get_copy = "pub")]
    attachable: bool,

    #[getset(get = "pub")]
    resolved_secret: Option<ObjectKey>,

    #[getset(get = "pub")]
    allowed_route_label_selector: Option<LabelSelector>,

    #[getset(get = "pub")]
    supported_kinds: Vec<RouteGroupKind>,

    /// HTTP and gRPC routes attached by later stages.
    #[getset(get = "pub")]
    l7_routes: BTreeSet<ObjectKey>,

    /// TLS routes attached by later stages.
    #[getset(get = "pub")]
    l4_routes: BTreeSet<ObjectKey>,

    #[getset(get = "pub")]
    conditions: Vec<Condition>,
}

impl Listener {
    fn new(gateway_name: ObjectKey, source: KubeListener) -> Self {
        Self {
            name: source.name.clone(),
            gateway_name,
            source,
            protocol: None,
            valid: true,
            attachable: true,
            resolved_secret: None,
            allowed_route_label_selector: None,
            supported_kinds: Vec::new(),
            l7_routes: BTreeSet::new(),
            l4_routes: BTreeSet::new(),
            conditions: Vec::new(),
        }
    }

    /// Records a failure. The listener becomes invalid but keeps its attachability.
    pub(crate) fn reject(&mut self, conditions: Vec<Condition>) {
        self.valid = false;
        self.conditions.extend(conditions);
    }

    pub fn hostname(&self) -> Option<&str> {
        self.source.hostname.as_deref()
    }

    pub fn port(&self) -> i32 {
        self.source.port
    }
}

/// Ports listeners may not bind, mapped to the name of their owner.
pub type ProtectedPorts = BTreeMap<u16, String>;

pub const METRICS_PORT_NAME: &str = "MetricsPort";

/// Validates the listeners of one Gateway against the shared build state.
pub struct ListenerValidator<'a, 's> {
    gateway_name: &'a ObjectKey,
    protected_ports: &'a ProtectedPorts,
    secrets: &'a mut SecretResolver<'s>,
    grants: &'a ReferenceGrantResolver,
}

impl<'a, 's> ListenerValidator<'a, 's> {
    pub fn new(
        gateway_name: &'a ObjectKey,
        protected_ports: &'a ProtectedPorts,
        secrets: &'a mut SecretResolver<'s>,
        grants: &'a ReferenceGrantResolver,
    ) -> Self {
        Self {
            gateway_name,
            protected_ports,
            secrets,
            grants,
        }
    }

    pub fn validate(&mut self, source: &KubeListener) -> Listener {
        let mut listener = Listener::new(self.gateway_name.clone(), source.clone());

        let Ok(protocol) = source.protocol.parse::<ListenerProtocol>() else {
            let message = FieldError::not_supported(
                FieldPath::new("protocol"),
                FieldValue::str(source.protocol.as_str()),
                &ListenerProtocol::supported_names(),
            )
            .to_string();
            listener.attachable = false;
            listener.reject(conditions::listener::unsupported_protocol(&message));
            debug!(
                "Listener {} of Gateway {} has unsupported protocol {}",
                listener.name, self.gateway_name, source.protocol
            );
            return listener;
        };
        listener.protocol = Some(protocol);

        self.validate_port(&mut listener);
        validate_listener_hostname(&mut listener);

        let tls = source.tls.as_ref();
        match protocol {
            ListenerProtocol::Http => validate_http_tls(&mut listener, tls),
            ListenerProtocol::Https => self.validate_https_tls(&mut listener, tls),
            ListenerProtocol::Tls => validate_passthrough_tls(&mut listener, tls),
        }

        validate_allowed_routes(&mut listener);
        listener.supported_kinds = supported_kinds(&mut listener, protocol);

        if !listener.valid {
            debug!(
                "Listener {} of Gateway {} is invalid",
                listener.name, self.gateway_name
            );
        }
        listener
    }

    fn validate_port(&self, listener: &mut Listener) {
        let path = FieldPath::new("port");
        let port = listener.source.port;

        let detail = match Port::try_from(port) {
            Err(err) => Some(err.to_string()),
            Ok(port) => self
                .protected_ports
                .get(&port.get())
                .map(|owner| format!("port is already in use as {owner}")),
        };

        if let Some(detail) = detail {
            let message = FieldError::invalid(path, FieldValue::from(port), detail).to_string();
            listener.reject(conditions::listener::unsupported_value(&message));
        }
    }

    fn validate_https_tls(&mut self, listener: &mut Listener, tls: Option<&GatewayListenersTls>) {
        let path = FieldPath::new("tls");
        let Some(tls) = tls else {
            let message = FieldError::required(path, "tls must be defined for HTTPS listener").to_string();
            listener.reject(conditions::listener::unsupported_value(&message));
            return;
        };

        let mode = TlsMode::from(tls);
        if mode != TlsMode::Terminate {
            let mode: &'static str = mode.into();
            let message = FieldError::not_supported(
                path.child("mode"),
                FieldValue::str(mode),
                &[<&'static str>::from(TlsMode::Terminate)],
            )
            .to_string();
            listener.reject(conditions::listener::unsupported_value(&message));
        }

        if tls.options.as_ref().is_some_and(|options| !options.is_empty()) {
            let message = FieldError::forbidden(path.child("options"), "options are not supported").to_string();
            listener.reject(conditions::listener::unsupported_value(&message));
        }

        let refs_path = path.child("certificateRefs");
        let certificate_refs = tls.certificate_refs.as_deref().unwrap_or_default();
        if certificate_refs.is_empty() {
            let message =
                FieldError::required(refs_path, "certificateRefs must be defined for TLS mode terminate").to_string();
            listener.reject(conditions::listener::invalid_certificate_ref(&message));
            return;
        }

        let gateway_namespace = self.gateway_name.namespace().clone();
        for (index, certificate_ref) in certificate_refs.iter().enumerate() {
            let ref_path = refs_path.index(index);

            let kind = certificate_ref.kind.as_deref().unwrap_or(SECRET_KIND);
            if kind != SECRET_KIND {
                let message =
                    FieldError::not_supported(ref_path.child("kind"), FieldValue::str(kind), &[SECRET_KIND]).to_string();
                listener.reject(conditions::listener::invalid_certificate_ref(&message));
                continue;
            }

            let group = certificate_ref.group.as_deref().unwrap_or_default();
            if !group.is_empty() && group != CORE_GROUP {
                let message =
                    FieldError::not_supported(ref_path.child("group"), FieldValue::str(group), &["", CORE_GROUP])
                        .to_string();
                listener.reject(conditions::listener::invalid_certificate_ref(&message));
                continue;
            }

            let namespace = certificate_ref
                .namespace
                .clone()
                .unwrap_or_else(|| gateway_namespace.clone());
            let key = ObjectKey::new(namespace.as_str(), certificate_ref.name.as_str());

            if namespace != gateway_namespace
                && !self.grants.ref_allowed(
                    &to_secret(namespace.as_str(), certificate_ref.name.as_str()),
                    &FromResource::gateway(gateway_namespace.as_str()),
                )
            {
                let message = format!("Certificate ref to secret {key} not permitted by any ReferenceGrant");
                listener.reject(conditions::listener::ref_not_permitted(&message));
                continue;
            }

            match self.secrets.resolve(&key) {
                Err(err) => {
                    let message = FieldError::invalid(ref_path, FieldValue::raw(&key), err.to_string()).to_string();
                    listener.reject(conditions::listener::invalid_certificate_ref(&message));
                }
                Ok(()) => {
                    listener.resolved_secret.get_or_insert(key);
                }
            }
        }
    }
}

fn validate_listener_hostname(listener: &mut Listener) {
    let Some(hostname) = listener.source.hostname.clone().filter(|h| !h.is_empty()) else {
        return;
    };

    if let Err(err) = validate_hostname(&hostname) {
        let message = FieldError::invalid(FieldPath::new("hostname"), FieldValue::str(hostname), err.to_string())
            .to_string();
        listener.attachable = false;
        listener.reject(conditions::listener::unsupported_value(&message));
    }
}

fn validate_http_tls(listener: &mut Listener, tls: Option<&GatewayListenersTls>) {
    if tls.is_some() {
        let message = FieldError::forbidden(FieldPath::new("tls"), "tls is not supported for HTTP listener").to_string();
        listener.reject(conditions::listener::unsupported_value(&message));
    }
}

fn validate_passthrough_tls(listener: &mut Listener, tls: Option<&GatewayListenersTls>) {
    let path = FieldPath::new("tls");
    let Some(tls) = tls else {
        let message = FieldError::required(path, "tls must be defined for TLS listener").to_string();
        listener.reject(conditions::listener::unsupported_value(&message));
        return;
    };

    let mode = TlsMode::from(tls);
    if mode != TlsMode::Passthrough {
        let mode: &'static str = mode.into();
        let message = FieldError::not_supported(
            path.child("mode"),
            FieldValue::str(mode),
            &[<&'static str>::from(TlsMode::Passthrough)],
        )
        .to_string();
        listener.reject(conditions::listener::unsupported_value(&message));
    }
}

fn validate_allowed_routes(listener: &mut Listener) {
    let Some(namespaces) = listener
        .source
        .allowed_routes
        .as_ref()
        .and_then(|routes| routes.namespaces.clone())
    else {
        return;
    };
    if !matches!(namespaces.from, Some(GatewayListenersAllowedRoutesNamespacesFrom::Selector)) {
        return;
    }

    match namespaces.selector {
        None => {
            listener.attachable = false;
            listener.reject(conditions::listener::unsupported_value(
                "Listener's AllowedRoutes Selector must be set when From is set to type Selector",
            ));
        }
        Some(selector) => match LabelSelector::compile(&to_kube_selector(selector)) {
            Ok(selector) => listener.allowed_route_label_selector = Some(selector),
            Err(err) => {
                listener.reject(conditions::listener::unsupported_value(&format!(
                    "invalid label selector: {err}"
                )));
            }
        },
    }
}

/// Narrows the protocol's route kinds to those the listener asks for. Unsupported kinds are
/// reported and dropped.
fn supported_kinds(listener: &mut Listener, protocol: ListenerProtocol) -> Vec<RouteGroupKind> {
    let requested = listener
        .source
        .allowed_routes
        .as_ref()
        .and_then(|routes| routes.kinds.clone())
        .unwrap_or_default();
    if requested.is_empty() {
        return protocol.default_supported_kinds();
    }

    let mut supported: Vec<RouteGroupKind> = Vec::with_capacity(requested.len());
    for kind in requested {
        // Absent means the Gateway API group, empty means the core group.
        let group = kind.group.as_deref().unwrap_or(GATEWAY_API_GROUP);
        if group == GATEWAY_API_GROUP && protocol.route_kinds().contains(&kind.kind.as_str()) {
            let normalized = RouteGroupKind::new(GATEWAY_API_GROUP, kind.kind.as_str());
            if !supported.contains(&normalized) {
                supported.push(normalized);
            }
        } else {
            let message = format!("Unsupported route kind \"{group}/{}\"", kind.kind);
            listener.reject(conditions::listener::invalid_route_kinds(&message));
        }
    }
    supported
}

fn to_kube_selector(selector: GatewayListenersAllowedRoutesNamespacesSelector) -> KubeLabelSelector {
    KubeLabelSelector {
        match_expressions: selector.match_expressions.map(|expressions| {
            expressions
                .into_iter()
                .map(|expression| LabelSelectorRequirement {
                    key: expression.key,
                    operator: expression.operator,
                    values: expression.values,
                })
                .collect()
        }),
        match_labels: selector.match_labels,
    }
}
