use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;

use detsim::{ConfigError, ConfigManager, ModuleRegistry, PipelineExecutor, RunError, io, logging};

#[derive(Parser)]
#[command(name = "detsim")]
#[command(about = "Runs a detector simulation pipeline described by a TOML configuration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Overrides {
    /// Module setting override, `Module.key=value` (`key=value` targets the global section)
    #[arg(short = 'o', long = "option", value_name = "OPTION")]
    options: Vec<String>,
    /// Detector setting override, `detector.key=value`
    #[arg(short = 'g', long = "detector-option", value_name = "OPTION")]
    detector_options: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured module pipeline
    Run {
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        /// Write the run summary to this JSON file
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Validate a configuration without running it
    Check {
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// List the available modules
    Modules,
}

enum Failure {
    Config(ConfigError),
    Run(RunError),
    Io(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> ExitCode {
        let code = match self {
            Failure::Config(e) | Failure::Run(RunError::Config(e)) => match e {
                ConfigError::Read { .. } | ConfigError::Write { .. } => 3,
                _ => 1,
            },
            Failure::Run(_) => 2,
            Failure::Io(_) => 3,
        };
        ExitCode::from(code)
    }

    fn report(&self) {
        let err: &dyn Error = match self {
            Failure::Config(e) => e,
            Failure::Run(e) => e,
            Failure::Io(e) => &**e,
        };
        eprintln!("error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
    }
}

impl From<ConfigError> for Failure {
    fn from(e: ConfigError) -> Self {
        Failure::Config(e)
    }
}

impl From<RunError> for Failure {
    fn from(e: RunError) -> Self {
        Failure::Run(e)
    }
}

fn load(path: &Path, overrides: &Overrides) -> Result<ConfigManager, ConfigError> {
    let mut manager = io::read_config(path)?;
    for option in &overrides.options {
        manager.apply_module_option(option)?;
    }
    for option in &overrides.detector_options {
        manager.apply_detector_option(option)?;
    }
    Ok(manager)
}

fn init_logging(manager: &ConfigManager) -> Result<(), ConfigError> {
    match manager.global_config() {
        Some(global) => logging::init(global)?,
        None => logging::init(&detsim::ConfigEntry::new("Allpix"))?,
    }
    Ok(())
}

fn run(config: &Path, overrides: &Overrides, summary_path: Option<&Path>) -> Result<(), Failure> {
    let manager = load(config, overrides)?;
    init_logging(&manager)?;
    info!(config = %config.display(), "loaded configuration");

    let executor = PipelineExecutor::new(ModuleRegistry::with_builtins());
    let summary = executor.run(manager)?;

    println!(
        "run {} finished: {} module instances executed, {} failed, over {} events in {:.3}s",
        summary.run_id,
        summary.executed(),
        summary.failed,
        summary.events,
        summary.elapsed_s
    );
    if let Some(path) = summary_path {
        io::write_summary(path, &summary).map_err(Failure::Io)?;
    }
    Ok(())
}

fn check(config: &Path, overrides: &Overrides) -> Result<(), Failure> {
    let manager = load(config, overrides)?;
    let registry = ModuleRegistry::with_builtins();
    let planned = manager.plan(&registry)?;

    println!("{} is valid, {} module instances:", config.display(), planned.len());
    for instance in planned {
        println!("  #{} {}", instance.index, instance.id);
    }
    Ok(())
}

fn list_modules() {
    let registry = ModuleRegistry::with_builtins();
    for name in registry.names() {
        if let Ok(descriptor) = registry.resolve(name) {
            println!("{name} ({:?})", descriptor.kind());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            config,
            overrides,
            summary,
        } => run(config, overrides, summary.as_deref()),
        Commands::Check { config, overrides } => check(config, overrides),
        Commands::Modules => {
            list_modules();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            failure.report();
            failure.exit_code()
        }
    }
}
