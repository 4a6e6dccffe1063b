//! CLI entrypoint for Conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use conductor_application::{ConductorRuntime, EngineConfig, ExecutionContext, HealthProbe};
use conductor_domain::{CallerIdentity, ChainDefinition, GroupId, ToolParams, params_from_value};
use conductor_infrastructure::{
    ConfigLoader, DEMO_GROUP, FileConfig, FileLoggingConfig, JsonlExecutionSink, StaticProbe,
    builtin_catalog,
};
use conductor_presentation::{Cli, Command, ConsoleFormatter, OutputFormat};
use serde_json::{Value, json};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    // Load configuration
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(cli.verbose, &file_config.logging)?;
    info!("Starting Conductor");

    let runtime = build_runtime(&file_config)?;

    // Background loops and in-flight calls share one shutdown token
    let shutdown = CancellationToken::new();
    let background = runtime.spawn_background(&shutdown);
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight calls");
                shutdown.cancel();
            }
        });
    }

    let result = dispatch(command, cli.output, &runtime, &shutdown).await;

    shutdown.cancel();
    for handle in background {
        let _ = handle.await;
    }

    result
}

/// Initialize logging based on verbosity level, plus an optional daily
/// rolling log file.
fn init_logging(verbose: u8, logging: &FileLoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(dir) = &logging.dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(dir, &logging.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Ok(Some(guard))
}

// === Dependency Injection ===
fn build_runtime(file_config: &FileConfig) -> Result<ConductorRuntime> {
    let config = file_config
        .into_engine_config()
        .context("Invalid configuration")?;
    let catalog = builtin_catalog()?;

    let mut builder = ConductorRuntime::builder(catalog, config.clone())
        .with_probe(DEMO_GROUP, Arc::new(StaticProbe::default()));

    if let Some(path) = &file_config.audit.jsonl_path {
        match JsonlExecutionSink::new(path) {
            Some(sink) => {
                info!("Audit log: {}", sink.path().display());
                builder = builder.with_sink(Arc::new(sink));
            }
            None => warn!("Audit log disabled: could not open {}", path.display()),
        }
    }

    for (group, url) in file_config.health_groups() {
        let probe = probe_for(&group, url, &config)?;
        builder = builder.with_probe(group, probe);
    }

    Ok(builder.build())
}

/// Probe for one configured group. Groups without a URL (or built without
/// HTTP support) get a probe that always reports healthy, so they still show
/// up in `status`.
#[cfg_attr(not(feature = "http-probe"), allow(unused_variables))]
fn probe_for(
    group: &GroupId,
    url: Option<&str>,
    config: &EngineConfig,
) -> Result<Arc<dyn HealthProbe>> {
    match url {
        #[cfg(feature = "http-probe")]
        Some(url) => {
            let probe = conductor_infrastructure::HttpProbe::new(url, config.health.probe_timeout)
                .with_context(|| format!("Failed to build health probe for '{}'", group))?;
            Ok(Arc::new(probe))
        }
        #[cfg(not(feature = "http-probe"))]
        Some(url) => {
            warn!(
                "Ignoring probe_url {} for group '{}': built without the http-probe feature",
                url, group
            );
            Ok(Arc::new(StaticProbe::default()))
        }
        None => Ok(Arc::new(StaticProbe::default())),
    }
}

fn parse_params(raw: &str) -> Result<ToolParams> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--params is not valid JSON: {}", raw))?;
    params_from_value(value).ok_or_else(|| anyhow!("--params must be a JSON object"))
}

async fn dispatch(
    command: Command,
    format: OutputFormat,
    runtime: &ConductorRuntime,
    shutdown: &CancellationToken,
) -> Result<ExitCode> {
    match command {
        Command::Tools { category } => {
            let registry = runtime.catalog().registry();
            let tools: Vec<_> = registry
                .all()
                .filter(|tool| category.is_none_or(|c| tool.category == c))
                .collect();
            match format {
                OutputFormat::Full => print!("{}", ConsoleFormatter::format_tools(tools)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&tools)),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Run {
            tool,
            params,
            caller,
            repeat,
        } => {
            let params = parse_params(&params)?;
            let caller = caller.map(CallerIdentity::user).unwrap_or_default();
            let ctx = ExecutionContext::new(caller).with_cancellation(shutdown.child_token());

            let mut failures = 0;
            let mut results = Vec::with_capacity(repeat as usize);
            for _ in 0..repeat {
                let result = runtime.tools().execute(&tool, params.clone(), &ctx).await;
                match (&result, format) {
                    (Ok(output), OutputFormat::Full) => {
                        print!("{}", ConsoleFormatter::format_output(output))
                    }
                    (Err(error), OutputFormat::Full) => {
                        print!("{}", ConsoleFormatter::format_error(error))
                    }
                    (Ok(output), OutputFormat::Json) => results.push(json!(output)),
                    (Err(error), OutputFormat::Json) => {
                        results.push(ConsoleFormatter::error_json(error))
                    }
                }
                if result.is_err() {
                    failures += 1;
                }
                if shutdown.is_cancelled() {
                    break;
                }
            }

            if format == OutputFormat::Json {
                let body = if repeat == 1 {
                    results.pop().unwrap_or(Value::Null)
                } else {
                    Value::Array(results)
                };
                println!("{}", ConsoleFormatter::format_json(&body));
            }

            Ok(if failures > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }

        Command::Chain {
            tools,
            params,
            strict,
        } => {
            if tools.is_empty() {
                bail!("A chain needs at least one tool");
            }
            let params = parse_params(&params)?;
            let chain = tools.iter().fold(ChainDefinition::new(), |chain, id| {
                if strict {
                    chain.required_step(id.as_str())
                } else {
                    chain.step(id.as_str())
                }
            });
            let ctx = ExecutionContext::default().with_cancellation(shutdown.child_token());

            let outcome = runtime.chains().execute(&chain, params, &ctx).await;
            match format {
                OutputFormat::Full => print!("{}", ConsoleFormatter::format_chain(&outcome)),
                OutputFormat::Json => println!(
                    "{}",
                    ConsoleFormatter::format_json(&ConsoleFormatter::chain_json(&outcome))
                ),
            }

            Ok(if outcome.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Status => {
            let sweeps = runtime.monitor().sweep_once().await;
            let snapshot = runtime.snapshot();
            match format {
                OutputFormat::Full => print!(
                    "{}",
                    ConsoleFormatter::format_snapshot(
                        &snapshot,
                        &sweeps,
                        runtime.config().health.threshold
                    )
                ),
                OutputFormat::Json => println!(
                    "{}",
                    ConsoleFormatter::format_json(&json!({
                        "snapshot": snapshot,
                        "probes": sweeps,
                    }))
                ),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
