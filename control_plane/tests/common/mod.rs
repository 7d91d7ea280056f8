//! Fixtures shared by the graph integration tests.
#![allow(dead_code)]

use gateway_api::apis::standard::gatewayclasses::{GatewayClass, GatewayClassParametersRef, GatewayClassSpec};
use gateway_api::apis::standard::gateways::{
    Gateway, GatewayInfrastructure, GatewayInfrastructureParametersRef, GatewayListeners as Listener,
    GatewayListenersTls, GatewayListenersTlsCertificateRefs, GatewayListenersTlsMode, GatewaySpec,
};
use gateway_api::apis::standard::referencegrants::{
    ReferenceGrant, ReferenceGrantFrom, ReferenceGrantSpec, ReferenceGrantTo,
};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use ngf_api::constants::{
    DEFAULT_CONTROLLER_NAME, GATEWAY_API_GROUP, GATEWAY_KIND, NGINX_GATEWAY_GROUP, NGINX_PROXY_KIND,
    SECRET_KIND, SECRET_TYPE_TLS,
};
use ngf_api::v1alpha2::{NginxProxy as KubeNginxProxy, NginxProxySpec};
use ngf_control_plane::graph::conditions::{Condition, ConditionReason, ConditionType};
use ngf_control_plane::graph::gateways::Gateway as GatewayRecord;
use ngf_control_plane::graph::listeners::Listener as ListenerRecord;
use ngf_control_plane::graph::nginx_proxy::{NginxProxy, validate_nginx_proxy};
use ngf_control_plane::graph::{Graph, Snapshot};
use ngf_control_plane::kubernetes::objects::{ObjectKey, ObjectMap};
use ngf_control_plane::options::GraphOptions;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CLASS_NAME: &str = "my-gc";
pub const GATEWAY_NAMESPACE: &str = "test";

pub fn options() -> GraphOptions {
    GraphOptions::builder().gateway_class_name(CLASS_NAME).build()
}

pub fn gateway_class(parameters_ref: Option<GatewayClassParametersRef>) -> ObjectMap<GatewayClass> {
    let class = GatewayClass::new(
        CLASS_NAME,
        GatewayClassSpec {
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            parameters_ref,
            ..Default::default()
        },
    );
    BTreeMap::from([(ObjectKey::cluster_scoped(CLASS_NAME), Arc::new(class))])
}

pub fn class_parameters_ref(namespace: &str, name: &str) -> GatewayClassParametersRef {
    GatewayClassParametersRef {
        group: NGINX_GATEWAY_GROUP.to_string(),
        kind: NGINX_PROXY_KIND.to_string(),
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
    }
}

pub fn gateway(name: &str, listeners: Vec<Listener>) -> Gateway {
    let mut gateway = Gateway::new(
        name,
        GatewaySpec {
            gateway_class_name: CLASS_NAME.to_string(),
            listeners,
            ..Default::default()
        },
    );
    gateway.metadata.namespace = Some(GATEWAY_NAMESPACE.to_string());
    gateway
}

pub fn with_parameters_ref(mut gateway: Gateway, kind: &str, name: &str) -> Gateway {
    gateway.spec.infrastructure = Some(GatewayInfrastructure {
        parameters_ref: Some(GatewayInfrastructureParametersRef {
            group: NGINX_GATEWAY_GROUP.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        }),
        ..Default::default()
    });
    gateway
}

pub fn gateways(gateways: Vec<Gateway>) -> ObjectMap<Gateway> {
    gateways
        .into_iter()
        .map(|gateway| {
            let key = ObjectKey::new(GATEWAY_NAMESPACE, gateway.metadata.name.clone().unwrap_or_default());
            (key, Arc::new(gateway))
        })
        .collect()
}

pub fn http_listener(name: &str, hostname: Option<&str>, port: i32) -> Listener {
    Listener {
        name: name.to_string(),
        hostname: hostname.map(ToString::to_string),
        port,
        protocol: "HTTP".to_string(),
        ..Default::default()
    }
}

pub fn https_listener(name: &str, hostname: Option<&str>, port: i32, secret: (Option<&str>, &str)) -> Listener {
    let (namespace, secret_name) = secret;
    Listener {
        name: name.to_string(),
        hostname: hostname.map(ToString::to_string),
        port,
        protocol: "HTTPS".to_string(),
        tls: Some(GatewayListenersTls {
            mode: Some(GatewayListenersTlsMode::Terminate),
            certificate_refs: Some(vec![GatewayListenersTlsCertificateRefs {
                kind: Some(SECRET_KIND.to_string()),
                name: secret_name.to_string(),
                namespace: namespace.map(ToString::to_string),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn tls_listener(name: &str, hostname: Option<&str>, port: i32) -> Listener {
    Listener {
        name: name.to_string(),
        hostname: hostname.map(ToString::to_string),
        port,
        protocol: "TLS".to_string(),
        tls: Some(GatewayListenersTls {
            mode: Some(GatewayListenersTlsMode::Passthrough),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn tls_secret(namespace: &str, name: &str) -> (ObjectKey, Arc<Secret>) {
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some(SECRET_TYPE_TLS.to_string()),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(b"cert".to_vec())),
            ("tls.key".to_string(), ByteString(b"key".to_vec())),
        ])),
        ..Default::default()
    };
    (ObjectKey::new(namespace, name), Arc::new(secret))
}

/// A grant in `namespace` that lets Gateways from `from_namespace` use the Secret `secret_name`.
pub fn secret_grant(namespace: &str, from_namespace: &str, secret_name: &str) -> (ObjectKey, Arc<ReferenceGrant>) {
    let mut grant = ReferenceGrant::new(
        "grant",
        ReferenceGrantSpec {
            from: vec![ReferenceGrantFrom {
                group: GATEWAY_API_GROUP.to_string(),
                kind: GATEWAY_KIND.to_string(),
                namespace: from_namespace.to_string(),
            }],
            to: vec![ReferenceGrantTo {
                group: String::new(),
                kind: SECRET_KIND.to_string(),
                name: Some(secret_name.to_string()),
            }],
        },
    );
    grant.metadata.namespace = Some(namespace.to_string());
    (ObjectKey::new(namespace, "grant"), Arc::new(grant))
}

pub fn nginx_proxy(namespace: &str, name: &str, spec: NginxProxySpec) -> (ObjectKey, NginxProxy) {
    let proxy = KubeNginxProxy {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec,
    };
    (ObjectKey::new(namespace, name), validate_nginx_proxy(Arc::new(proxy)))
}

pub fn snapshot(gateway_list: Vec<Gateway>) -> Snapshot {
    Snapshot::builder()
        .gateway_classes(gateway_class(None))
        .gateways(gateways(gateway_list))
        .secrets(BTreeMap::from([tls_secret(GATEWAY_NAMESPACE, "secret")]))
        .build()
}

pub fn only_gateway(graph: &Graph) -> &GatewayRecord {
    let gateways = graph.gateways().as_ref().map(|gateways| gateways.values().collect::<Vec<_>>());
    match gateways.as_deref() {
        Some([gateway]) => *gateway,
        other => panic!("expected exactly one gateway, found {other:?}"),
    }
}

pub fn listener<'a>(gateway: &'a GatewayRecord, name: &str) -> &'a ListenerRecord {
    match gateway.listeners().iter().find(|listener| listener.name() == name) {
        Some(listener) => listener,
        None => panic!("listener {name} not found"),
    }
}

pub fn reasons(listener: &ListenerRecord, type_: ConditionType) -> Vec<ConditionReason> {
    reasons_of(listener.conditions(), type_)
}

pub fn reasons_of(conditions: &[Condition], type_: ConditionType) -> Vec<ConditionReason> {
    conditions
        .iter()
        .filter(|condition| condition.type_() == type_)
        .map(|condition| condition.reason())
        .collect()
}
