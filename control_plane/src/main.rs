#![warn(
    clippy::pedantic,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::needless_pass_by_value,
    clippy::needless_continue,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_field_names
)]

mod cli;

use crate::cli::{Cli, OutputFormat};
use clap::Parser;
use ngf_api::constants::DEFAULT_CONTROLLER_NAME;
use ngf_control_plane::graph::build_graph;
use ngf_control_plane::kubernetes::manifests::{ManifestError, load_snapshot};
use ngf_control_plane::options::{ControllerConfiguration, GraphOptions};
use ngf_control_plane::report::GraphReport;
use ngf_core::config::{ReadError, read_configuration};
use ngf_core::instrumentation::init_instrumentation;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[derive(Debug, Error)]
pub enum MainError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read configuration: {0}")]
    Configuration(#[from] ReadError),
    #[error("No GatewayClass configured, set --gateway-class or gatewayClassName")]
    MissingGatewayClass,
    #[error("Failed to load snapshot: {0}")]
    Snapshot(#[from] ManifestError),
    #[error("Failed to render report as YAML: {0}")]
    RenderYaml(#[from] serde_yaml::Error),
    #[error("Failed to render report as JSON: {0}")]
    RenderJson(#[from] serde_json::Error),
    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),
}

fn open(path: &Path) -> Result<File, MainError> {
    File::open(path).map_err(|source| MainError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn graph_options(args: &Cli, configuration: &ControllerConfiguration) -> Result<GraphOptions, MainError> {
    let gateway_class_name = args
        .gateway_class()
        .clone()
        .or_else(|| configuration.gateway_class_name().clone())
        .ok_or(MainError::MissingGatewayClass)?;
    let controller_name = args
        .controller_name()
        .clone()
        .or_else(|| configuration.controller_name().clone())
        .unwrap_or_else(|| DEFAULT_CONTROLLER_NAME.to_string());

    Ok(GraphOptions::builder()
        .gateway_class_name(gateway_class_name)
        .controller_name(controller_name)
        .experimental_features(args.experimental_features() || configuration.experimental_features())
        .build())
}

fn run(args: &Cli) -> Result<(), MainError> {
    let configuration: ControllerConfiguration = match args.config() {
        Some(path) => read_configuration(open(path)?)?,
        None => ControllerConfiguration::default(),
    };

    init_instrumentation(configuration.log_level().as_deref().unwrap_or(DEFAULT_LOG_DIRECTIVE));

    let options = graph_options(args, &configuration)?;

    let snapshot = match args.snapshot() {
        Some(path) => load_snapshot(open(path)?)?,
        None => load_snapshot(std::io::stdin().lock())?,
    };
    info!(
        "Loaded snapshot: gateway_classes={} gateways={} secrets={} reference_grants={} nginx_proxies={}",
        snapshot.gateway_classes().len(),
        snapshot.gateways().len(),
        snapshot.secrets().len(),
        snapshot.reference_grants().len(),
        snapshot.nginx_proxies().len()
    );

    let graph = build_graph(&snapshot, &options);
    let report = GraphReport::from(&graph);

    let rendered = match args.output() {
        OutputFormat::Yaml => serde_yaml::to_string(&report)?,
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

fn main() -> Result<(), MainError> {
    let args = Cli::parse();

    run(&args).inspect_err(|err| error!("{err}"))
}
