use clap::{Parser, Subcommand};
use protoplane::config::{self, Settings};
use protoplane::dataplane::{assign_cores, Pipeline};
use protoplane::port::{AfPacketPort, Port};
use protoplane::telemetry::init_logging;
use protoplane::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "protoplane")]
#[command(about = "Content-sniffing packet pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline until interrupted
    Run {
        /// Path to the rule file
        #[arg(short, long)]
        config: PathBuf,

        /// Path to settings.toml
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Seconds between statistics blocks (0 disables)
        #[arg(long)]
        stats_interval: Option<u16>,

        /// Interface to open as an additional port (repeatable)
        #[arg(short, long = "interface")]
        interfaces: Vec<String>,
    },
    /// Check the rule file and settings without opening any port
    Validate {
        /// Path to the rule file
        #[arg(short, long)]
        config: PathBuf,

        /// Path to settings.toml
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            settings,
            stats_interval,
            interfaces,
        } => cmd_run(&config, settings.as_deref(), stats_interval, &interfaces),
        Commands::Validate { config, settings } => cmd_validate(&config, settings.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => config::load_settings(path),
        None => Ok(Settings::default()),
    }
}

fn cmd_run(
    rules_path: &Path,
    settings_path: Option<&Path>,
    stats_interval: Option<u16>,
    interfaces: &[String],
) -> Result<()> {
    let mut settings = load_settings(settings_path)?;
    settings.add_interfaces(interfaces)?;
    if let Some(interval) = stats_interval {
        settings.pipeline.stats_interval = interval;
    }

    init_logging(Some(&settings.logging));

    let validation = config::validate(&settings);
    validation.print_diagnostics();
    if validation.has_errors() {
        return Err(Error::Settings("validation failed".to_string()));
    }

    let rules = config::load_rules(rules_path)?;

    let requested: Vec<_> = settings.ports.iter().map(|p| (p.id, p.core)).collect();
    let core_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let cores = assign_cores(&requested, core_count)?;

    let mut ports: Vec<(Arc<dyn Port>, usize)> = Vec::with_capacity(settings.ports.len());
    for (port, core) in settings.ports.iter().zip(cores) {
        info!(port = port.id, interface = %port.interface, core, "opening port");
        let socket: Arc<dyn Port> = Arc::new(AfPacketPort::bind(port.id, &port.interface)?);
        ports.push((socket, core));
    }

    let pipeline = Pipeline::new(rules, ports, settings.pipeline.clone())?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let cancel = CancellationToken::new();
    let handle = pipeline.spawn(cancel.clone())?;
    rt.block_on(async {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => info!("interrupt received, stopping workers"),
                Err(e) => error!(error = %e, "cannot listen for interrupt, stopping workers"),
            },
            _ = cancel.cancelled() => {}
        }
    });

    cancel.cancel();
    let stats = handle.stats().clone();
    handle.join();

    if settings.pipeline.stats_interval > 0 {
        println!("{}", stats.render());
    }
    Ok(())
}

fn cmd_validate(rules_path: &Path, settings_path: Option<&Path>) -> Result<()> {
    init_logging(None);
    println!("[INFO] Validating {}...", rules_path.display());

    let rules = config::load_rules(rules_path)?;
    println!("[INFO] {} rules", rules.len());

    if let Some(path) = settings_path {
        let settings = load_settings(Some(path))?;
        let mut validation = config::validate(&settings);
        for port in rules.output_ports() {
            if !settings.ports.iter().any(|p| p.id == port) {
                validation.error(format!("rules: OUTPUT({}) names an unconfigured port", port));
            }
        }
        validation.print_diagnostics();
        if validation.has_errors() {
            return Err(Error::Settings("validation failed".to_string()));
        }
    }

    println!("[INFO] Configuration is valid");
    Ok(())
}
