pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";
pub const NGINX_GATEWAY_GROUP: &str = "gateway.nginx.org";

/// The legacy core group is spelled either as `""` or as `"core"` in references.
pub const CORE_GROUP: &str = "core";

pub const GATEWAY_CLASS_KIND: &str = "GatewayClass";
pub const GATEWAY_KIND: &str = "Gateway";
pub const HTTP_ROUTE_KIND: &str = "HTTPRoute";
pub const GRPC_ROUTE_KIND: &str = "GRPCRoute";
pub const TLS_ROUTE_KIND: &str = "TLSRoute";
pub const REFERENCE_GRANT_KIND: &str = "ReferenceGrant";
pub const SECRET_KIND: &str = "Secret";
pub const NGINX_PROXY_KIND: &str = "NginxProxy";
pub const CUSTOM_RESOURCE_DEFINITION_KIND: &str = "CustomResourceDefinition";

pub const DEFAULT_CONTROLLER_NAME: &str = "gateway.nginx.org/nginx-gateway-controller";

pub const BUNDLE_VERSION_ANNOTATION: &str = "gateway.networking.k8s.io/bundle-version";
pub const CHANNEL_ANNOTATION: &str = "gateway.networking.k8s.io/channel";

/// The Gateway API bundle version the graph is written against.
pub const SUPPORTED_BUNDLE_VERSION: &str = "v1.4.0";

pub const DEFAULT_NGINX_METRICS_PORT: u16 = 9113;

pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";
pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";
