use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use testgen::cli::commands::{HistoryCommand, RunCommand, ScanCommand, ValidateConfigCommand};
use testgen::cli::output::*;
use testgen::cli::{Cli, Command};
use testgen::core::config::DEFAULT_INSTRUCTIONS_DIR;
use testgen::core::{
    GeneratorConfig, InstructionKind, InstructionSet, PipelineStep, Settings, SourceScanner,
};
use testgen::execution::{TestGenerator, REPORT_FILE};
use testgen::persistence::{create_summary, open_history};
use testgen::provider::{create_provider, OllamaProvider, ProviderKind};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let success = match &cli.command {
        Command::Run(cmd) => run_generator(cmd, cli.config.as_deref()).await?,
        Command::Scan(cmd) => scan_project(cmd)?,
        Command::ValidateConfig(cmd) => validate_config(cmd, cli.config.as_deref())?,
        Command::History(cmd) => show_history(cmd).await?,
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to set logging subscriber")
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path).context("Failed to load settings file"),
        None => Ok(Settings::default()),
    }
}

async fn run_generator(cmd: &RunCommand, settings_path: Option<&Path>) -> Result<bool> {
    let file_settings = load_settings(settings_path)?;
    let config = GeneratorConfig::resolve(file_settings, cmd.to_settings(), |key| {
        std::env::var(key).ok()
    })
    .context("Invalid configuration")?;
    config.validate().context("Invalid configuration")?;

    println!(
        "{} Project: {}",
        INFO,
        style(config.project_path.display()).bold()
    );
    println!(
        "{} Provider: {} ({})",
        INFO,
        style(config.provider.kind).cyan(),
        style(&config.provider.model).dim()
    );

    if config.provider.kind == ProviderKind::Ollama {
        let ollama = OllamaProvider::new(&config.provider)?;
        if !ollama.health_check().await {
            println!(
                "{} Ollama is not reachable at {}; is `ollama serve` running?",
                WARN,
                ollama.api_url()
            );
        }
    }

    let store = open_history(cmd.no_history).await?;
    let provider = create_provider(&config.provider).context("Failed to create provider")?;

    let step: PipelineStep = cmd.step.into();
    let generator = TestGenerator::new(config.clone(), provider);

    let printer = Arc::new(EventPrinter::new());
    generator
        .add_event_handler(move |event| printer.handle(event))
        .await;

    println!();
    let state = generator.run(step).await;
    println!("{}", format_run_state(&state));

    if !cmd.no_history {
        let summary = create_summary(&state, &config);
        match store.save_run(&summary).await {
            Ok(()) => println!(
                "\n{} Run saved to history (ID: {})",
                INFO,
                style(&summary.run_id.to_string()[..8]).dim()
            ),
            Err(e) => warn!("Failed to save run history: {:#}", e),
        }
    }

    if state.is_success() {
        if step == PipelineStep::Full {
            println!(
                "{} Report: {}",
                FILE,
                style(config.output_dir.join(REPORT_FILE).display()).bold()
            );
        }
        println!(
            "\n{} {} step completed {}",
            CHECK,
            style(step).bold(),
            style("successfully").green()
        );
        Ok(true)
    } else {
        println!(
            "\n{} {} step {}",
            CROSS,
            style(step).bold(),
            style("failed").red()
        );
        if let Some(err) = &state.error {
            error!("{}", err);
        }
        Ok(false)
    }
}

fn scan_project(cmd: &ScanCommand) -> Result<bool> {
    let sources = SourceScanner::new(&cmd.project_path)
        .scan()
        .context("Failed to scan project")?;

    if cmd.json {
        let data = serde_json::json!({ "files": sources });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(true);
    }

    if sources.is_empty() {
        println!("{} No C++ files found", WARN);
        return Ok(true);
    }

    println!(
        "{} {} C++ files in {}:",
        INFO,
        style(sources.len()).cyan(),
        style(cmd.project_path.display()).bold()
    );
    for source in &sources {
        println!("  {}", format_source_file(source));
    }

    Ok(true)
}

fn validate_config(cmd: &ValidateConfigCommand, settings_path: Option<&Path>) -> Result<bool> {
    println!("{} Validating configuration...", INFO);

    let mut valid = true;
    let settings = match load_settings(settings_path) {
        Ok(settings) => {
            if let Some(path) = settings_path {
                println!("{} {}", CHECK, path.display());
            }
            settings
        }
        Err(e) => {
            println!("{} {}", CROSS, style(format!("{:#}", e)).red());
            valid = false;
            Settings::default()
        }
    };

    let dir = cmd
        .instructions_dir
        .clone()
        .or(settings.instructions_dir)
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS_DIR.into());

    for kind in InstructionKind::ALL {
        let path = kind.path_in(&dir);
        match InstructionSet::load(&dir, kind) {
            Ok(_) => println!("{} {}", CHECK, path.display()),
            Err(e) => {
                println!("{} {}", CROSS, style(e).red());
                valid = false;
            }
        }
    }

    if valid {
        println!("{} Configuration is valid!", CHECK);
    } else {
        println!("{} Validation failed", CROSS);
    }
    Ok(valid)
}

async fn show_history(cmd: &HistoryCommand) -> Result<bool> {
    let store = open_history(false).await?;
    let runs = store.list_runs(cmd.project.as_deref(), cmd.limit).await?;

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(true);
    }

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(true);
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);
    for summary in &runs {
        println!("  {}", format_run_summary(summary));
    }

    Ok(true)
}
