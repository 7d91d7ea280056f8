//! Properties every build holds, whatever listeners a Gateway declares.

mod common;

use crate::common::*;
use gateway_api::apis::standard::gateways::GatewayListeners as Listener;
use ngf_api::constants::NGINX_PROXY_KIND;
use ngf_api::v1alpha2::{Metrics, NginxProxySpec};
use ngf_control_plane::graph::Snapshot;
use ngf_control_plane::graph::build_graph;
use ngf_control_plane::graph::conditions::{ConditionReason, ConditionStatus, ConditionType};
use proptest::prelude::*;
use std::collections::BTreeMap;

const PROTOCOLS: [&str; 4] = ["HTTP", "HTTPS", "TLS", "TCP"];
const PORTS: [i32; 5] = [80, 443, 8080, 9113, 0];
const HOSTNAMES: [Option<&str>; 4] = [None, Some("foo.example.com"), Some("*.example.com"), Some("bar.example.com")];

fn listener_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (0..PROTOCOLS.len(), 0..PORTS.len(), 0..HOSTNAMES.len())
}

fn listeners_strategy() -> impl Strategy<Value = Vec<Listener>> {
    prop::collection::vec(listener_strategy(), 0..6).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(index, (protocol, port, hostname))| {
                let name = format!("listener-{index}");
                let (port, hostname) = (PORTS[port], HOSTNAMES[hostname]);
                match PROTOCOLS[protocol] {
                    "HTTPS" => https_listener(&name, hostname, port, (None, "secret")),
                    "TLS" => tls_listener(&name, hostname, port),
                    other => {
                        let mut listener = http_listener(&name, hostname, port);
                        listener.protocol = other.to_string();
                        listener
                    }
                }
            })
            .collect()
    })
}

fn metrics(port: Option<i32>) -> NginxProxySpec {
    NginxProxySpec {
        metrics: Some(Metrics { port, disable: None }),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn test_build_is_deterministic(listeners in listeners_strategy()) {
        let snapshot = snapshot(vec![gateway("gateway", listeners)]);

        prop_assert_eq!(build_graph(&snapshot, &options()), build_graph(&snapshot, &options()));
    }

    #[test]
    fn test_conflicted_listeners_are_invalid(listeners in listeners_strategy()) {
        let graph = build_graph(&snapshot(vec![gateway("gateway", listeners)]), &options());

        for listener in only_gateway(&graph).listeners() {
            let conflicted = listener
                .conditions()
                .iter()
                .any(|c| c.type_() == ConditionType::Conflicted && c.status() == ConditionStatus::True);
            prop_assert!(!(conflicted && listener.valid()));
            if listener.valid() {
                prop_assert!(listener.conditions().is_empty());
            }
        }
    }

    #[test]
    fn test_gateways_without_class_have_no_listeners(listeners in listeners_strategy()) {
        let snapshot = Snapshot::builder()
            .gateways(gateways(vec![gateway("gateway", listeners)]))
            .build();

        let graph = build_graph(&snapshot, &options());

        let gateway = only_gateway(&graph);
        prop_assert!(!gateway.valid());
        prop_assert!(gateway.listeners().is_empty());
    }

    #[test]
    fn test_cross_namespace_secret_needs_grant(namespace in "[a-z]{3,8}", granted in any::<bool>()) {
        prop_assume!(namespace != GATEWAY_NAMESPACE);
        let grants = if granted {
            BTreeMap::from([secret_grant(&namespace, GATEWAY_NAMESPACE, "secret")])
        } else {
            BTreeMap::new()
        };
        let snapshot = Snapshot::builder()
            .gateway_classes(gateway_class(None))
            .gateways(gateways(vec![gateway(
                "gateway",
                vec![https_listener("https", None, 443, (Some(namespace.as_str()), "secret"))],
            )]))
            .secrets(BTreeMap::from([tls_secret(&namespace, "secret")]))
            .reference_grants(grants)
            .build();

        let graph = build_graph(&snapshot, &options());

        let listener = listener(only_gateway(&graph), "https");
        prop_assert_eq!(listener.valid(), granted);
        prop_assert_eq!(listener.resolved_secret().is_some(), granted);
        if !granted {
            prop_assert_eq!(
                reasons(listener, ConditionType::ResolvedRefs),
                vec![ConditionReason::RefNotPermitted]
            );
        }
    }

    #[test]
    fn test_gateway_metrics_port_overrides_class(class_port in 1..=65535i32, gateway_port in prop::option::of(1..=65535i32)) {
        let (class_key, class_proxy) = nginx_proxy("nginx-gateway", "class-np", metrics(Some(class_port)));
        let (gateway_key, gateway_proxy) = nginx_proxy(GATEWAY_NAMESPACE, "gw-np", metrics(gateway_port));
        let snapshot = Snapshot::builder()
            .gateway_classes(gateway_class(Some(class_parameters_ref("nginx-gateway", "class-np"))))
            .gateways(gateways(vec![with_parameters_ref(gateway("gateway", vec![]), NGINX_PROXY_KIND, "gw-np")]))
            .nginx_proxies(BTreeMap::from([(class_key, class_proxy), (gateway_key, gateway_proxy)]))
            .build();

        let graph = build_graph(&snapshot, &options());

        let effective = only_gateway(&graph).effective_nginx_proxy().clone();
        let port = effective.and_then(|effective| effective.spec().metrics.clone()).and_then(|m| m.port);
        prop_assert_eq!(port, Some(gateway_port.unwrap_or(class_port)));
    }

    #[test]
    fn test_bad_parameters_ref_keeps_gateway_valid(kind in "[A-Z][a-zA-Z]{2,12}", name in "[a-z]{1,10}") {
        let source = with_parameters_ref(gateway("gateway", vec![http_listener("http", None, 80)]), &kind, &name);

        let graph = build_graph(&snapshot(vec![source]), &options());

        let gateway = only_gateway(&graph);
        prop_assert!(gateway.valid());
        prop_assert!(listener(gateway, "http").valid());
        prop_assert_eq!(
            reasons_of(gateway.conditions(), ConditionType::ResolvedRefs).len(),
            1
        );
    }
}
