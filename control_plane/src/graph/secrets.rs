use crate::kubernetes::objects::{ObjectKey, ObjectMap};
use k8s_openapi::api::core::v1::Secret;
use ngf_api::constants::{SECRET_TYPE_TLS, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret does not exist")]
    NotFound,

    #[error("tls secret is invalid: missing required key \"{0}\"")]
    MissingKey(&'static str),

    #[error("unsupported secret type \"{0}\"")]
    UnsupportedType(String),
}

/// Resolves Secret references for one graph build. Every key is checked at most once.
#[derive(Debug)]
pub struct SecretResolver<'a> {
    secrets: &'a ObjectMap<Secret>,
    resolved: BTreeMap<ObjectKey, Result<Arc<Secret>, SecretError>>,
}

impl<'a> SecretResolver<'a> {
    pub fn new(secrets: &'a ObjectMap<Secret>) -> Self {
        Self {
            secrets,
            resolved: BTreeMap::new(),
        }
    }

    pub fn resolve(&mut self, key: &ObjectKey) -> Result<(), SecretError> {
        if let Some(result) = self.resolved.get(key) {
            return result.as_ref().map(|_| ()).map_err(SecretError::clone);
        }

        let result = match self.secrets.get(key) {
            None => Err(SecretError::NotFound),
            Some(secret) => validate_secret(secret).map(|()| secret.clone()),
        };
        if let Err(err) = &result {
            debug!("Secret {key} cannot be used: {err}");
        }

        let outcome = result.as_ref().map(|_| ()).map_err(SecretError::clone);
        self.resolved.insert(key.clone(), result);
        outcome
    }

    /// The Secrets that resolved successfully so far.
    pub fn resolved_secrets(&self) -> BTreeMap<ObjectKey, Arc<Secret>> {
        self.resolved
            .iter()
            .filter_map(|(key, result)| result.as_ref().ok().map(|secret| (key.clone(), secret.clone())))
            .collect()
    }
}

fn validate_secret(secret: &Secret) -> Result<(), SecretError> {
    let secret_type = secret.type_.as_deref().unwrap_or_default();
    if secret_type != SECRET_TYPE_TLS {
        return Err(SecretError::UnsupportedType(secret_type.to_string()));
    }

    for required in [TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY] {
        let present = secret
            .data
            .as_ref()
            .and_then(|data| data.get(required))
            .is_some_and(|value| !value.0.is_empty());
        if !present {
            return Err(SecretError::MissingKey(required));
        }
    }

    Ok(())
}
