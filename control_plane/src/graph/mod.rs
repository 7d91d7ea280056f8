//! Builds the Gateway side of the configuration graph from a snapshot of cluster objects.
//!
//! The build never fails: every problem found in the input is reported as a condition on the
//! record it concerns.

pub mod conditions;
pub mod conflicts;
pub mod field;
pub mod gateway_class;
pub mod gateways;
pub mod label_selector;
pub mod listeners;
pub mod nginx_proxy;
pub mod reference_grants;
pub mod secrets;
pub mod version;

use crate::graph::gateway_class::{GatewayClass, build_gateway_class, process_gateway_classes};
use crate::graph::gateways::{Gateway, GatewayBuilder, UnsupportedField, UnsupportedFields, process_gateways};
use crate::graph::nginx_proxy::NginxProxy;
use crate::graph::reference_grants::ReferenceGrantResolver;
use crate::graph::secrets::SecretResolver;
use crate::kubernetes::objects::{ObjectKey, ObjectMap};
use crate::options::GraphOptions;
use gateway_api::apis::standard::gatewayclasses::GatewayClass as KubeGatewayClass;
use gateway_api::apis::standard::gateways::Gateway as KubeGateway;
use gateway_api::apis::standard::referencegrants::ReferenceGrant;
use getset::{CopyGetters, Getters};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

/// The cluster objects a build reads. `NginxProxy` objects arrive already validated.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder, Getters)]
pub struct Snapshot {
    #[getset(get = "pub")]
    #[builder(default)]
    gateways: ObjectMap<KubeGateway>,

    /// Experimental fields set on each Gateway, which the typed Gateway does not carry.
    #[getset(get = "pub")]
    #[builder(default)]
    unsupported_gateway_fields: UnsupportedFields,

    #[getset(get = "pub")]
    #[builder(default)]
    gateway_classes: ObjectMap<KubeGatewayClass>,

    #[getset(get = "pub")]
    #[builder(default)]
    secrets: ObjectMap<Secret>,

    #[getset(get = "pub")]
    #[builder(default)]
    reference_grants: ObjectMap<ReferenceGrant>,

    #[getset(get = "pub")]
    #[builder(default)]
    nginx_proxies: BTreeMap<ObjectKey, NginxProxy>,

    /// Metadata of installed CustomResourceDefinitions, keyed by name.
    #[getset(get = "pub")]
    #[builder(default)]
    crd_metadata: BTreeMap<ObjectKey, ObjectMeta>,
}

impl Snapshot {
    pub(crate) fn insert_gateway(
        &mut self,
        key: ObjectKey,
        gateway: Arc<KubeGateway>,
        unsupported_fields: BTreeSet<UnsupportedField>,
    ) {
        if unsupported_fields.is_empty() {
            self.unsupported_gateway_fields.remove(&key);
        } else {
            self.unsupported_gateway_fields.insert(key.clone(), unsupported_fields);
        }
        self.gateways.insert(key, gateway);
    }

    pub(crate) fn insert_gateway_class(&mut self, key: ObjectKey, gateway_class: Arc<KubeGatewayClass>) {
        self.gateway_classes.insert(key, gateway_class);
    }

    pub(crate) fn insert_secret(&mut self, key: ObjectKey, secret: Arc<Secret>) {
        self.secrets.insert(key, secret);
    }

    pub(crate) fn insert_reference_grant(&mut self, key: ObjectKey, grant: Arc<ReferenceGrant>) {
        self.reference_grants.insert(key, grant);
    }

    pub(crate) fn insert_nginx_proxy(&mut self, key: ObjectKey, proxy: NginxProxy) {
        self.nginx_proxies.insert(key, proxy);
    }

    pub(crate) fn insert_crd_metadata(&mut self, key: ObjectKey, metadata: ObjectMeta) {
        self.crd_metadata.insert(key, metadata);
    }
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Graph {
    /// The configured class, when it exists and belongs to this controller.
    #[getset(get = "pub")]
    gateway_class: Option<GatewayClass>,

    #[getset(get = "pub")]
    ignored_gateway_classes: ObjectMap<KubeGatewayClass>,

    #[getset(get_copy = "pub")]
    gateway_class_exists: bool,

    /// `None` when no Gateway uses the configured class.
    #[getset(get = "pub")]
    gateways: Option<BTreeMap<ObjectKey, Gateway>>,

    /// Secrets that listeners resolved successfully.
    #[getset(get = "pub")]
    referenced_secrets: BTreeMap<ObjectKey, Arc<Secret>>,
}

pub fn build_graph(snapshot: &Snapshot, options: &GraphOptions) -> Graph {
    debug!(
        "Building graph for GatewayClass {} and controller {}",
        options.gateway_class_name(),
        options.controller_name()
    );

    let processed = process_gateway_classes(
        &snapshot.gateway_classes,
        options.gateway_class_name(),
        options.controller_name(),
    );
    let gateway_class = build_gateway_class(
        processed.winner().as_ref(),
        &snapshot.nginx_proxies,
        &snapshot.crd_metadata,
        options.experimental_features(),
    );

    let processed_gateways = process_gateways(&snapshot.gateways, options.gateway_class_name());

    let mut secrets = SecretResolver::new(&snapshot.secrets);
    let grants = ReferenceGrantResolver::new(&snapshot.reference_grants);
    let gateways = GatewayBuilder::new(
        gateway_class.as_ref(),
        &snapshot.nginx_proxies,
        &snapshot.unsupported_gateway_fields,
        &mut secrets,
        &grants,
    )
    .build_all(processed_gateways.as_ref());

    let graph = Graph {
        gateway_class,
        ignored_gateway_classes: processed.ignored().clone(),
        gateway_class_exists: processed.exists(),
        gateways,
        referenced_secrets: secrets.resolved_secrets(),
    };

    info!(
        "Built graph: gateway_class.valid={:?} ignored_gateway_classes={} gateways={} referenced_secrets={}",
        graph.gateway_class.as_ref().map(GatewayClass::valid),
        graph.ignored_gateway_classes.len(),
        graph.gateways.as_ref().map_or(0, BTreeMap::len),
        graph.referenced_secrets.len()
    );

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngf_api::constants::DEFAULT_CONTROLLER_NAME;
    use gateway_api::apis::standard::gatewayclasses::GatewayClassSpec;
    use test_log::test;

    #[test]
    fn test_empty_snapshot() {
        let options = GraphOptions::builder().gateway_class_name("nginx").build();

        let graph = build_graph(&Snapshot::default(), &options);

        assert!(graph.gateway_class().is_none());
        assert!(!graph.gateway_class_exists());
        assert!(graph.gateways().is_none());
        assert!(graph.referenced_secrets().is_empty());
    }

    #[test]
    fn test_class_without_gateways() {
        let class = KubeGatewayClass::new(
            "nginx",
            GatewayClassSpec {
                controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
                ..Default::default()
            },
        );
        let snapshot = Snapshot::builder()
            .gateway_classes(BTreeMap::from([(ObjectKey::cluster_scoped("nginx"), Arc::new(class))]))
            .build();
        let options = GraphOptions::builder().gateway_class_name("nginx").build();

        let graph = build_graph(&snapshot, &options);

        assert!(graph.gateway_class_exists());
        assert!(graph.gateway_class().as_ref().is_some_and(GatewayClass::valid));
        assert!(graph.gateways().is_none());
    }
}
