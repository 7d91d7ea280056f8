use crate::kubernetes::objects::{ObjectMap, ObjectRef};
use gateway_api::apis::standard::referencegrants::ReferenceGrant;
use getset::Getters;
use ngf_api::constants::{CORE_GROUP, GATEWAY_API_GROUP, GATEWAY_KIND, SECRET_KIND};
use std::collections::BTreeSet;
use typed_builder::TypedBuilder;

/// The referring side of a cross namespace reference.
#[derive(TypedBuilder, Getters, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FromResource {
    #[getset(get = "pub")]
    #[builder(setter(into))]
    group: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    kind: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    namespace: String,
}

impl FromResource {
    pub fn gateway<S: Into<String>>(namespace: S) -> Self {
        Self::builder()
            .group(GATEWAY_API_GROUP)
            .kind(GATEWAY_KIND)
            .namespace(namespace)
            .build()
    }
}

pub fn to_secret<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> ObjectRef {
    ObjectRef::builder()
        .kind(SECRET_KIND)
        .namespace(namespace)
        .name(name)
        .build()
}

/// The core group may be spelled `""` or `"core"`.
fn normalize_group(group: &str) -> &str {
    if group == CORE_GROUP { "" } else { group }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct AllowedReference {
    to: ObjectRef,
    from: FromResource,
}

/// Answers whether a ReferenceGrant permits a cross namespace reference.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGrantResolver {
    allowed: BTreeSet<AllowedReference>,
}

impl ReferenceGrantResolver {
    pub fn new(grants: &ObjectMap<ReferenceGrant>) -> Self {
        let mut allowed = BTreeSet::new();
        for (key, grant) in grants {
            for to in &grant.spec.to {
                for from in &grant.spec.from {
                    let to = ObjectRef::builder()
                        .group(normalize_group(&to.group))
                        .kind(to.kind.as_str())
                        .namespace(key.namespace().as_str())
                        // An empty name stands for every object of the kind.
                        .name(to.name.clone().unwrap_or_default())
                        .build();
                    let from = FromResource::builder()
                        .group(normalize_group(&from.group))
                        .kind(from.kind.as_str())
                        .namespace(from.namespace.as_str())
                        .build();
                    allowed.insert(AllowedReference { to, from });
                }
            }
        }

        Self { allowed }
    }

    pub fn ref_allowed(&self, to: &ObjectRef, from: &FromResource) -> bool {
        let to = ObjectRef::builder()
            .group(normalize_group(to.group()))
            .kind(to.kind().as_str())
            .namespace(to.namespace().as_str())
            .name(to.name().as_str())
            .build();
        let mut reference = AllowedReference {
            to,
            from: from.clone(),
        };
        if self.allowed.contains(&reference) {
            return true;
        }

        reference.to = ObjectRef::builder()
            .group(reference.to.group().as_str())
            .kind(reference.to.kind().as_str())
            .namespace(reference.to.namespace().as_str())
            .name("")
            .build();
        self.allowed.contains(&reference)
    }
}
