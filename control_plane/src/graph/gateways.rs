use crate::graph::conditions::{self, Condition};
use crate::graph::conflicts::resolve_conflicts;
use crate::graph::field::{FieldError, FieldErrors, FieldPath, FieldValue};
use crate::graph::gateway_class::{GatewayClass, ParametersRefState, resolve_parameters_ref};
use crate::graph::listeners::{Listener, ListenerValidator, METRICS_PORT_NAME, ProtectedPorts};
use crate::graph::nginx_proxy::{
    EffectiveNginxProxy, NginxProxy, build_effective_nginx_proxy, protected_metrics_port,
};
use crate::graph::reference_grants::ReferenceGrantResolver;
use crate::graph::secrets::SecretResolver;
use crate::kubernetes::naming::create_nginx_resource_name;
use crate::kubernetes::objects::{ObjectKey, ObjectMap};
use gateway_api::apis::standard::gateways::Gateway as KubeGateway;
use getset::{CopyGetters, Getters};
use ngf_api::constants::NGINX_PROXY_KIND;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use strum::Display;
use tracing::debug;

/// Experimental Gateway fields that are accepted but ignored. The standard channel types drop
/// them on decode, so their presence is recorded next to the Gateway when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum UnsupportedField {
    #[strum(serialize = "AllowedListeners")]
    AllowedListeners,
    #[strum(serialize = "TLS.Frontend")]
    TlsFrontend,
}

/// The unsupported fields each Gateway sets, keyed like the Gateways themselves.
pub type UnsupportedFields = BTreeMap<ObjectKey, BTreeSet<UnsupportedField>>;

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Gateway {
    #[getset(get = "pub")]
    source: Arc<KubeGateway>,

    /// Empty when the Gateway failed a gate.
    #[getset(get = "pub")]
    listeners: Vec<Listener>,

    /// The NGINX resources provisioned for this Gateway are named after it.
    #[getset(get = "pub")]
    deployment_name: ObjectKey,

    /// The Gateway level parameters object, valid or not.
    #[getset(get = "pub")]
    nginx_proxy: Option<NginxProxy>,

    #[getset(get = "pub")]
    effective_nginx_proxy: Option<EffectiveNginxProxy>,

    #[getset(get_copy = "pub")]
    valid: bool,

    #[getset(get = "pub")]
    conditions: Vec<Condition>,
}

/// Keeps the Gateways that name the configured class. `None` when there are none.
pub fn process_gateways(
    gateways: &ObjectMap<KubeGateway>,
    class_name: &str,
) -> Option<ObjectMap<KubeGateway>> {
    let processed: ObjectMap<KubeGateway> = gateways
        .iter()
        .filter(|(_, gateway)| gateway.spec.gateway_class_name == class_name)
        .map(|(key, gateway)| (key.clone(), gateway.clone()))
        .collect();

    debug!("{} of {} Gateways use GatewayClass {class_name}", processed.len(), gateways.len());
    (!processed.is_empty()).then_some(processed)
}

/// Shared state for building every Gateway of one graph.
pub struct GatewayBuilder<'a, 's> {
    gateway_class: Option<&'a GatewayClass>,
    nginx_proxies: &'a BTreeMap<ObjectKey, NginxProxy>,
    unsupported_fields: &'a UnsupportedFields,
    secrets: &'a mut SecretResolver<'s>,
    grants: &'a ReferenceGrantResolver,
}

impl<'a, 's> GatewayBuilder<'a, 's> {
    pub fn new(
        gateway_class: Option<&'a GatewayClass>,
        nginx_proxies: &'a BTreeMap<ObjectKey, NginxProxy>,
        unsupported_fields: &'a UnsupportedFields,
        secrets: &'a mut SecretResolver<'s>,
        grants: &'a ReferenceGrantResolver,
    ) -> Self {
        Self {
            gateway_class,
            nginx_proxies,
            unsupported_fields,
            secrets,
            grants,
        }
    }

    pub fn build_all(&mut self, gateways: Option<&ObjectMap<KubeGateway>>) -> Option<BTreeMap<ObjectKey, Gateway>> {
        let gateways = gateways.filter(|g| !g.is_empty())?;
        Some(
            gateways
                .iter()
                .map(|(key, gateway)| (key.clone(), self.build(key, gateway)))
                .collect(),
        )
    }

    pub fn build(&mut self, key: &ObjectKey, source: &Arc<KubeGateway>) -> Gateway {
        let mut conditions = Vec::new();

        match self.gateway_class {
            None => conditions.extend(conditions::gateway::invalid("GatewayClass doesn't exist")),
            Some(class) if !class.valid() => {
                conditions.extend(conditions::gateway::invalid("GatewayClass is invalid"));
            }
            Some(_) => {}
        }

        if source.spec.addresses.as_ref().is_some_and(|addresses| !addresses.is_empty()) {
            let message =
                FieldError::forbidden(FieldPath::new("spec").child("addresses"), "addresses are not supported")
                    .to_string();
            conditions.extend(conditions::gateway::unsupported_value(&message));
        }

        let valid = conditions.is_empty();
        conditions.extend(
            self.unsupported_fields
                .get(key)
                .into_iter()
                .flatten()
                .map(|field| conditions::gateway::accepted_unsupported_field(&field.to_string())),
        );

        let parameters_ref = source
            .spec
            .infrastructure
            .as_ref()
            .and_then(|infrastructure| infrastructure.parameters_ref.as_ref());
        let mut nginx_proxy = None;
        if let Some(parameters_ref) = parameters_ref {
            let state = self.resolve_parameters(key, &parameters_ref.kind, &parameters_ref.name);
            conditions.extend(parameters_conditions(&state));
            nginx_proxy = match state {
                ParametersRefState::Linked(proxy) => Some(proxy),
                ParametersRefState::InvalidParameters(_) => {
                    self.nginx_proxies.get(&parameters_key(key, &parameters_ref.name)).cloned()
                }
                ParametersRefState::InvalidRef(_) | ParametersRefState::NotFound(_) => None,
            };
        }

        let class_proxy = self.gateway_class.and_then(|class| class.nginx_proxy().as_ref());
        let effective_nginx_proxy = build_effective_nginx_proxy(class_proxy, nginx_proxy.as_ref());

        let listeners = if valid {
            let protected_ports: ProtectedPorts = protected_metrics_port(effective_nginx_proxy.as_ref())
                .map(|port| (port, METRICS_PORT_NAME.to_string()))
                .into_iter()
                .collect();
            let mut validator = ListenerValidator::new(key, &protected_ports, self.secrets, self.grants);
            let mut listeners: Vec<Listener> = source
                .spec
                .listeners
                .iter()
                .map(|listener| validator.validate(listener))
                .collect();
            resolve_conflicts(&mut listeners);
            listeners
        } else {
            debug!("Gateway {key} is invalid, its listeners are not built");
            Vec::new()
        };

        Gateway {
            source: source.clone(),
            listeners,
            deployment_name: ObjectKey::new(
                key.namespace().as_str(),
                create_nginx_resource_name(key.name(), &source.spec.gateway_class_name),
            ),
            nginx_proxy,
            effective_nginx_proxy,
            valid,
            conditions,
        }
    }

    fn resolve_parameters(&self, key: &ObjectKey, kind: &str, name: &str) -> ParametersRefState {
        let path = FieldPath::new("spec").child("infrastructure").child("parametersRef");

        let mut errors = FieldErrors::new();
        if kind != NGINX_PROXY_KIND {
            errors.push(FieldError::not_supported(
                path.child("kind"),
                FieldValue::str(kind),
                &[NGINX_PROXY_KIND],
            ));
        }

        resolve_parameters_ref(&path, errors, Some(parameters_key(key, name)), self.nginx_proxies)
    }
}

/// A Gateway's parameters always live in its own namespace.
fn parameters_key(gateway: &ObjectKey, name: &str) -> ObjectKey {
    ObjectKey::new(gateway.namespace().as_str(), name)
}

fn parameters_conditions(state: &ParametersRefState) -> Vec<Condition> {
    match state {
        ParametersRefState::InvalidRef(errors) | ParametersRefState::InvalidParameters(errors) => {
            let message = errors.to_string();
            vec![
                conditions::gateway::ref_invalid(&message),
                conditions::gateway::invalid_parameters(&message),
            ]
        }
        ParametersRefState::NotFound(error) => vec![
            conditions::gateway::ref_not_found(),
            conditions::gateway::invalid_parameters(&error.to_string()),
        ],
        ParametersRefState::Linked(_) => vec![conditions::gateway::resolved_refs()],
    }
}
