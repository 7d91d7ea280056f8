//! Cross-listener conflicts within one Gateway.

use crate::graph::conditions;
use crate::graph::listeners::{Listener, ListenerProtocol};
use itertools::Itertools;
use ngf_core::CaseInsensitiveString;
use std::collections::BTreeMap;
use tracing::debug;

/// Marks listeners that share a port but cannot be served together. Only attachable listeners
/// with a supported protocol take part.
pub fn resolve_conflicts(listeners: &mut [Listener]) {
    let mut by_port: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, listener) in listeners.iter().enumerate() {
        if listener.attachable() && listener.protocol().is_some() {
            by_port.entry(listener.port()).or_default().push(index);
        }
    }

    for (port, members) in by_port {
        let families = members
            .iter()
            .filter_map(|&i| listeners[i].protocol())
            .map(ListenerProtocol::family)
            .unique()
            .count();

        if families > 1 {
            let message = format!(
                "Multiple listeners for the same port {port} specify incompatible protocols; \
                 ensure only one protocol per port"
            );
            for &i in &members {
                debug!("Listener {} has a protocol conflict on port {port}", listeners[i].name());
                listeners[i].reject(conditions::listener::protocol_conflict(&message));
            }
            continue;
        }

        let mut conflicted = vec![false; members.len()];
        for ((a, &i), (b, &j)) in members.iter().enumerate().tuple_combinations() {
            if is_https_tls_pair(&listeners[i], &listeners[j])
                && hostnames_overlap(listeners[i].hostname(), listeners[j].hostname())
            {
                conflicted[a] = true;
                conflicted[b] = true;
            }
        }

        let message = format!(
            "HTTPS and TLS listeners for the same port {port} specify overlapping hostnames; \
             ensure no overlapping hostnames for HTTPS and TLS listeners for the same port"
        );
        for (&i, _) in members.iter().zip(&conflicted).filter(|(_, c)| **c) {
            debug!("Listener {} has a hostname conflict on port {port}", listeners[i].name());
            listeners[i].reject(conditions::listener::hostname_conflict(&message));
        }
    }
}

fn is_https_tls_pair(a: &Listener, b: &Listener) -> bool {
    matches!(
        (a.protocol(), b.protocol()),
        (Some(ListenerProtocol::Https), Some(ListenerProtocol::Tls))
            | (Some(ListenerProtocol::Tls), Some(ListenerProtocol::Https))
    )
}

/// An absent or empty hostname matches everything. A `*.` wildcard covers every name ending in
/// its suffix.
pub fn hostnames_overlap(a: Option<&str>, b: Option<&str>) -> bool {
    let (Some(a), Some(b)) = (a.filter(|h| !h.is_empty()), b.filter(|h| !h.is_empty())) else {
        return true;
    };

    let (a, b) = (CaseInsensitiveString::new(a), CaseInsensitiveString::new(b));
    if a == b {
        return true;
    }

    wildcard_covers(&a, &b) || wildcard_covers(&b, &a)
}

fn wildcard_covers(wildcard: &CaseInsensitiveString, other: &CaseInsensitiveString) -> bool {
    wildcard
        .as_str()
        .strip_prefix('*')
        .filter(|suffix| suffix.starts_with('.'))
        .is_some_and(|suffix| other.ends_with(&CaseInsensitiveString::new(suffix)))
}
