use clap::{Parser, ValueEnum};
use getset::{CopyGetters, Getters};
use std::path::PathBuf;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Debug, Parser, Getters, CopyGetters)]
#[command(
    about = "Builds the NGINX Gateway Fabric Gateway graph from a snapshot of cluster objects",
    long_about = None
)]
pub struct Cli {
    /// A controller configuration file. Flags override its values.
    #[getset(get = "pub")]
    #[arg(env = "NGF_CONFIG", long = "config")]
    config: Option<PathBuf>,

    #[getset(get = "pub")]
    #[arg(env = "GATEWAY_CLASS_NAME", long = "gateway-class")]
    gateway_class: Option<String>,

    #[getset(get = "pub")]
    #[arg(env = "CONTROLLER_NAME", long = "controller-name")]
    controller_name: Option<String>,

    #[getset(get_copy = "pub")]
    #[arg(env = "EXPERIMENTAL_FEATURES", long = "experimental-features")]
    experimental_features: bool,

    /// Multi-document YAML with the GatewayClasses, Gateways, Secrets, ReferenceGrants,
    /// NginxProxies and CustomResourceDefinitions to build from. Reads stdin when absent.
    #[getset(get = "pub")]
    #[arg(long = "snapshot")]
    snapshot: Option<PathBuf>,

    #[getset(get_copy = "pub")]
    #[arg(default_value_t = OutputFormat::Yaml, long = "output", value_enum)]
    output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertables::assert_ok;

    #[test]
    fn test_parse_arguments() {
        let cli = assert_ok!(Cli::try_parse_from([
            "ngf-control-plane",
            "--gateway-class",
            "nginx",
            "--snapshot",
            "snapshot.yaml",
            "--output",
            "json",
            "--experimental-features",
        ]));

        assert_eq!(cli.gateway_class().as_deref(), Some("nginx"));
        assert_eq!(cli.snapshot().as_deref(), Some(std::path::Path::new("snapshot.yaml")));
        assert_eq!(cli.output(), OutputFormat::Json);
        assert!(cli.experimental_features());
    }

    #[test]
    fn test_reject_unknown_output() {
        assert!(Cli::try_parse_from(["ngf-control-plane", "--output", "xml"]).is_err());
    }
}
