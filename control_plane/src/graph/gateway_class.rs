use crate::graph::conditions::{self, Condition};
use crate::graph::field::{FieldError, FieldErrors, FieldPath, FieldValue};
use crate::graph::nginx_proxy::NginxProxy;
use crate::graph::version::validate_crd_versions;
use crate::kubernetes::objects::{ObjectKey, ObjectMap};
use gateway_api::apis::standard::gatewayclasses::GatewayClass as KubeGatewayClass;
use getset::{CopyGetters, Getters};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use ngf_api::constants::NGINX_PROXY_KIND;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The outcome of following a `parametersRef` to an `NginxProxy`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParametersRefState {
    /// The reference itself is malformed.
    InvalidRef(FieldErrors),
    NotFound(FieldError),
    /// The referenced object exists but failed validation.
    InvalidParameters(FieldErrors),
    Linked(NginxProxy),
}

/// Resolves a reference once its shape has been validated into `errors`.
pub(crate) fn resolve_parameters_ref(
    path: &FieldPath,
    errors: FieldErrors,
    key: Option<ObjectKey>,
    nginx_proxies: &BTreeMap<ObjectKey, NginxProxy>,
) -> ParametersRefState {
    if !errors.is_empty() {
        return ParametersRefState::InvalidRef(errors);
    }
    let Some(key) = key else {
        return ParametersRefState::InvalidRef(errors);
    };

    match nginx_proxies.get(&key) {
        None => ParametersRefState::NotFound(FieldError::not_found(
            path.child("name"),
            FieldValue::str(key.name().as_str()),
        )),
        Some(proxy) if !proxy.valid() => ParametersRefState::InvalidParameters(proxy.errors().clone()),
        Some(proxy) => ParametersRefState::Linked(proxy.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct GatewayClass {
    #[getset(get = "pub")]
    source: Arc<KubeGatewayClass>,

    /// The class level parameters, when the reference resolved to a valid object.
    #[getset(get = "pub")]
    nginx_proxy: Option<NginxProxy>,

    #[getset(get_copy = "pub")]
    valid: bool,

    #[getset(get = "pub")]
    conditions: Vec<Condition>,

    #[getset(get_copy = "pub")]
    experimental_supported: bool,

    #[getset(get_copy = "pub")]
    best_effort: bool,
}

/// GatewayClasses partitioned by whether this controller should serve them.
#[derive(Debug, Clone, Default, PartialEq, Getters, CopyGetters)]
pub struct ProcessedGatewayClasses {
    #[getset(get = "pub")]
    winner: Option<Arc<KubeGatewayClass>>,

    /// Classes this controller owns that are not the configured one.
    #[getset(get = "pub")]
    ignored: ObjectMap<KubeGatewayClass>,

    /// A class with the configured name exists, whatever its controller.
    #[getset(get_copy = "pub")]
    exists: bool,
}

pub fn process_gateway_classes(
    gateway_classes: &ObjectMap<KubeGatewayClass>,
    class_name: &str,
    controller_name: &str,
) -> ProcessedGatewayClasses {
    let mut processed = ProcessedGatewayClasses::default();

    for (key, gateway_class) in gateway_classes {
        let ours = gateway_class.spec.controller_name == controller_name;
        if key.name() == class_name {
            processed.exists = true;
            if ours {
                processed.winner = Some(gateway_class.clone());
            }
        } else if ours {
            debug!("Ignoring GatewayClass {key}, it is not the configured class {class_name}");
            processed.ignored.insert(key.clone(), gateway_class.clone());
        }
    }

    match &processed.winner {
        Some(_) => info!("Using GatewayClass {class_name}"),
        None if processed.exists => {
            info!("GatewayClass {class_name} exists but is not owned by controller {controller_name}");
        }
        None => info!("GatewayClass {class_name} does not exist"),
    }

    processed
}

pub fn build_gateway_class(
    gateway_class: Option<&Arc<KubeGatewayClass>>,
    nginx_proxies: &BTreeMap<ObjectKey, NginxProxy>,
    crd_metadata: &BTreeMap<ObjectKey, ObjectMeta>,
    experimental_features: bool,
) -> Option<GatewayClass> {
    let source = gateway_class?;

    let versions = validate_crd_versions(crd_metadata);
    let mut conditions = versions.conditions().clone();
    let mut nginx_proxy = None;

    if let Some(parameters_ref) = &source.spec.parameters_ref {
        let path = FieldPath::new("spec").child("parametersRef");

        let mut errors = FieldErrors::new();
        if parameters_ref.kind != NGINX_PROXY_KIND {
            errors.push(FieldError::not_supported(
                path.child("kind"),
                FieldValue::str(parameters_ref.kind.as_str()),
                &[NGINX_PROXY_KIND],
            ));
        }
        if parameters_ref.namespace.is_none() {
            errors.push(FieldError::required(
                path.child("namespace"),
                "ParametersRef must specify Namespace",
            ));
        }

        let key = parameters_ref
            .namespace
            .as_deref()
            .map(|namespace| ObjectKey::new(namespace, parameters_ref.name.as_str()));

        match resolve_parameters_ref(&path, errors, key, nginx_proxies) {
            ParametersRefState::InvalidRef(errors) | ParametersRefState::InvalidParameters(errors) => {
                let message = errors.to_string();
                conditions.push(conditions::gateway_class::ref_invalid(&message));
                conditions.push(conditions::gateway_class::invalid_parameters(&message));
            }
            ParametersRefState::NotFound(error) => {
                conditions.push(conditions::gateway_class::ref_not_found());
                conditions.push(conditions::gateway_class::invalid_parameters(&error.to_string()));
            }
            ParametersRefState::Linked(proxy) => {
                conditions.push(conditions::gateway_class::resolved_refs());
                nginx_proxy = Some(proxy);
            }
        }
    }

    if !versions.valid() {
        debug!("GatewayClass {} is invalid", source.metadata.name.as_deref().unwrap_or_default());
    }

    Some(GatewayClass {
        source: source.clone(),
        nginx_proxy,
        valid: versions.valid(),
        conditions,
        experimental_supported: experimental_features && versions.experimental(),
        best_effort: versions.best_effort(),
    })
}
