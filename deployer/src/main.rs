//! Marathon Deployer - Entry Point
//!
//! Runs the deployment step for one build: renders the workspace's
//! `marathon.json` with the configured overrides and updates the app.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use colored::Colorize;
use deployer::app::options::StepOptions;
use deployer::app::step::{BuildContext, DeployStep};
use deployer::config::settings::{LabelOverride, StepConfig};
use deployer::config::validate::validate_config;
use deployer::filesys::file::File;
use deployer::logs::{init_logging, LogLevel};
use deployer::utils::version_info;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    let mut labels: Vec<LabelOverride> = Vec::new();

    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            if clean_key == "label" {
                if let Some((name, value)) = value.split_once('=') {
                    labels.push(LabelOverride::new(name, value));
                }
                continue;
            }
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    // Initialize logging
    let mut options = StepOptions::default();
    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => options.log.log_level = level,
            Err(e) => eprintln!("{}", e),
        }
    }
    options.log.json_format = cli_args.contains_key("json-logs");
    options.log.log_dir = cli_args.get("log-dir").map(Into::into);
    if let Err(e) = init_logging(options.log.clone()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    // Load the step configuration
    let mut config = match cli_args.get("config") {
        Some(path) => match StepConfig::load(&File::new(path)).await {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => StepConfig::default(),
    };
    apply_cli_overrides(&mut config, &cli_args, labels);

    let report = validate_config(&config);
    if cli_args.contains_key("validate") {
        match serde_json::to_string_pretty(&report) {
            Ok(report) => println!("{}", report),
            Err(e) => eprintln!("{}", e),
        }
    }
    if !report.is_ok() {
        for (field, message) in report.errors() {
            eprintln!("{} {}: {}", "[INVALID]".red().bold(), field, message);
        }
        return ExitCode::from(2);
    }
    if cli_args.contains_key("validate") {
        return ExitCode::SUCCESS;
    }

    // Describe the build
    let workspace = cli_args
        .get("workspace")
        .cloned()
        .unwrap_or_else(|| ".".to_string());
    let mut ctx = BuildContext::new(workspace);
    ctx.env = env::vars().collect();
    ctx.build_number = cli_args
        .get("build-number")
        .or_else(|| ctx.env.get("BUILD_NUMBER"))
        .and_then(|n| n.parse().ok());

    info!("Deploying to {} from {}", config.url, ctx.workspace.display());
    let step = DeployStep::new(config, options);
    if step.perform(&mut ctx, Box::pin(await_shutdown_signal())).await {
        println!("{} Marathon deployment finished", "[SUCCESS]".green().bold());
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "{} Marathon deployment failed ({:?})",
            "[ERROR]".red().bold(),
            ctx.result
        );
        ExitCode::FAILURE
    }
}

fn apply_cli_overrides(
    config: &mut StepConfig,
    cli_args: &HashMap<String, String>,
    labels: Vec<LabelOverride>,
) {
    if let Some(url) = cli_args.get("url") {
        config.url = url.clone();
    }
    if let Some(filename) = cli_args.get("filename") {
        config.filename = Some(filename.clone());
    }
    if let Some(app_id) = cli_args.get("app-id") {
        config.app_id = Some(app_id.clone());
    }
    if let Some(docker) = cli_args.get("docker") {
        config.docker = Some(docker.clone());
    }
    if cli_args.contains_key("force") {
        config.force_update = true;
    }
    config.labels.extend(labels);
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, abandoning deployment...");
                    }
                    _ = sigint.recv() => {
                        info!("SIGINT received, abandoning deployment...");
                    }
                }
                return;
            }
            _ => error!("Unable to install signal handlers, falling back to Ctrl+C"),
        }
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl+C received, abandoning deployment...");
    } else {
        std::future::pending::<()>().await;
    }
}
