use getset::Getters;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Write};
use std::sync::Arc;
use thiserror::Error;
use typed_builder::TypedBuilder;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectKeyError {
    #[error("Object is missing a name")]
    MissingName,
}

/// The namespaced name of an object. Cluster scoped objects carry an empty namespace.
#[derive(TypedBuilder, Getters, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    #[getset(get = "pub")]
    #[builder(default, setter(into))]
    namespace: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    name: String,
}

impl ObjectKey {
    pub fn new<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn cluster_scoped<S: Into<String>>(name: S) -> Self {
        Self::new(String::new(), name)
    }

    pub fn for_object<K: Resource + ResourceExt>(object: &K) -> Result<Self, ObjectKeyError> {
        let name = object
            .meta()
            .name
            .clone()
            .ok_or(ObjectKeyError::MissingName)?;

        Ok(Self::builder()
            .namespace(object.namespace().unwrap_or_default())
            .name(name)
            .build())
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.namespace.is_empty() {
            f.write_str(&self.namespace)?;
            f.write_char('/')?;
        }
        f.write_str(&self.name)
    }
}

/// A typed reference used when matching `ReferenceGrant` targets.
#[derive(TypedBuilder, Getters, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    #[getset(get = "pub")]
    #[builder(setter(into))]
    kind: String,

    #[getset(get = "pub")]
    #[builder(default, setter(into))]
    group: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    namespace: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    name: String,
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())?;
        if !self.group().is_empty() {
            f.write_char('.')?;
            f.write_str(self.group())?;
        }
        f.write_char('/')?;
        f.write_str(self.namespace())?;
        f.write_char('/')?;
        f.write_str(self.name())
    }
}

/// Objects of one kind, keyed by namespaced name so iteration is deterministic.
pub type ObjectMap<K> = BTreeMap<ObjectKey, Arc<K>>;
