//! Loads a graph snapshot from a multi-document YAML stream, as produced by
//! `kubectl get -o yaml` or a directory of manifests joined with `---`.

use crate::graph::Snapshot;
use crate::graph::gateways::UnsupportedField;
use crate::graph::nginx_proxy::validate_nginx_proxy;
use crate::kubernetes::objects::{ObjectKey, ObjectKeyError};
use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::standard::referencegrants::ReferenceGrant;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use ngf_api::constants::{
    CUSTOM_RESOURCE_DEFINITION_KIND, GATEWAY_CLASS_KIND, GATEWAY_KIND, NGINX_PROXY_KIND,
    REFERENCE_GRANT_KIND, SECRET_KIND,
};
use ngf_api::v1alpha2::NginxProxy;
use ngf_core::config::{ReadError, read_documents};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifests: {0}")]
    Read(#[from] ReadError),

    #[error("Document {index} has no kind")]
    MissingKind { index: usize },

    #[error("Failed to decode {kind} in document {index}: {source}")]
    Decode {
        index: usize,
        kind: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid {kind} in document {index}: {source}")]
    InvalidObject {
        index: usize,
        kind: String,
        source: ObjectKeyError,
    },
}

/// Reads every supported object of `reader` into a [`Snapshot`]. `List` documents are flattened.
pub fn load_snapshot(reader: impl Read) -> Result<Snapshot, ManifestError> {
    let mut snapshot = Snapshot::default();

    let documents = read_documents(reader)?;
    let objects = documents.into_iter().flat_map(flatten_list);
    for (index, document) in objects.enumerate() {
        load_object(&mut snapshot, index, document)?;
    }

    Ok(snapshot)
}

fn flatten_list(document: Value) -> Vec<Value> {
    let is_list = document.get("kind").and_then(Value::as_str) == Some("List");
    match document.get("items") {
        Some(Value::Sequence(items)) if is_list => items.clone(),
        _ => vec![document],
    }
}

fn load_object(snapshot: &mut Snapshot, index: usize, document: Value) -> Result<(), ManifestError> {
    let kind = document
        .get("kind")
        .and_then(Value::as_str)
        .ok_or(ManifestError::MissingKind { index })?
        .to_string();

    match kind.as_str() {
        GATEWAY_CLASS_KIND => {
            let (key, object) = decode::<GatewayClass>(index, &kind, document)?;
            snapshot.insert_gateway_class(key, Arc::new(object));
        }
        GATEWAY_KIND => {
            let unsupported = unsupported_gateway_fields(&document);
            let (key, object) = decode::<Gateway>(index, &kind, document)?;
            if !unsupported.is_empty() {
                debug!("Gateway {key} sets unsupported fields {unsupported:?}");
            }
            snapshot.insert_gateway(key, Arc::new(object), unsupported);
        }
        SECRET_KIND => {
            let (key, object) = decode::<Secret>(index, &kind, document)?;
            snapshot.insert_secret(key, Arc::new(object));
        }
        REFERENCE_GRANT_KIND => {
            let (key, object) = decode::<ReferenceGrant>(index, &kind, document)?;
            snapshot.insert_reference_grant(key, Arc::new(object));
        }
        NGINX_PROXY_KIND => {
            let (key, object) = decode::<NginxProxy>(index, &kind, document)?;
            snapshot.insert_nginx_proxy(key, validate_nginx_proxy(Arc::new(object)));
        }
        CUSTOM_RESOURCE_DEFINITION_KIND => {
            let metadata = document.get("metadata").cloned().unwrap_or(Value::Null);
            let metadata: ObjectMeta =
                serde_yaml::from_value(metadata).map_err(|source| ManifestError::Decode {
                    index,
                    kind: kind.clone(),
                    source,
                })?;
            let name = metadata.name.clone().ok_or(ManifestError::InvalidObject {
                index,
                kind: kind.clone(),
                source: ObjectKeyError::MissingName,
            })?;
            snapshot.insert_crd_metadata(ObjectKey::cluster_scoped(name), metadata);
        }
        _ => debug!("Skipping document {index} of unsupported kind {kind}"),
    }

    Ok(())
}

/// Experimental Gateway fields are not part of the standard channel types, so they are looked up
/// in the raw document before it is decoded.
fn unsupported_gateway_fields(document: &Value) -> BTreeSet<UnsupportedField> {
    let spec = document.get("spec");
    let is_set = |value: Option<&Value>| value.is_some_and(|value| !value.is_null());

    let mut fields = BTreeSet::new();
    if is_set(spec.and_then(|spec| spec.get("allowedListeners"))) {
        fields.insert(UnsupportedField::AllowedListeners);
    }
    if is_set(spec.and_then(|spec| spec.get("tls")).and_then(|tls| tls.get("frontend"))) {
        fields.insert(UnsupportedField::TlsFrontend);
    }
    fields
}

fn decode<K>(index: usize, kind: &str, document: Value) -> Result<(ObjectKey, K), ManifestError>
where
    K: Resource + ResourceExt + DeserializeOwned,
{
    let object: K = serde_yaml::from_value(document).map_err(|source| ManifestError::Decode {
        index,
        kind: kind.to_string(),
        source,
    })?;
    let key = ObjectKey::for_object(&object).map_err(|source| ManifestError::InvalidObject {
        index,
        kind: kind.to_string(),
        source,
    })?;

    debug!("Loaded {kind} {key}");
    Ok((key, object))
}
