//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use noterelay_core::note::compose_note;
use noterelay_shared::{AppConfig, Company, Person, init_config, load_config, load_config_from};
use tracing::info;

use crate::server::{self, ServeOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// noterelay: enrich new users and note the result on their profile.
#[derive(Parser)]
#[command(
    name = "noterelay",
    version,
    about = "Webhook relay that enriches new users and writes a summary note back.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.noterelay/noterelay.toml).
    #[arg(long, env = "NOTERELAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the webhook server.
    Serve {
        /// Address to bind.
        #[arg(long, env = "NOTERELAY_ADDRESS")]
        address: Option<String>,

        /// Port to bind.
        #[arg(short, long, env = "NOTERELAY_PORT")]
        port: Option<u16>,

        /// Number of HTTP workers.
        #[arg(long)]
        workers: Option<usize>,

        /// Answer failed relays with a matching HTTP status instead of 200.
        #[arg(long)]
        strict_status: bool,

        /// Log every inbound HTTP request.
        #[arg(long)]
        log_http: bool,
    },

    /// Compose a note from saved enrichment JSON without calling any service.
    Preview {
        /// Person record (JSON file).
        #[arg(long)]
        person: PathBuf,

        /// Company record (JSON file).
        #[arg(long)]
        company: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // actix_web carries the access log when --log-http is set.
    let filter = format!("noterelay={level},actix_web=info");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Serve {
            address,
            port,
            workers,
            strict_status,
            log_http,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(address) = address {
                config.server.address = address;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(workers) = workers {
                config.server.workers = workers;
            }
            if strict_status {
                config.server.strict_status = true;
            }
            config.validate()?;

            cmd_serve(config, ServeOptions { log_http }).await
        }
        Command::Preview { person, company } => cmd_preview(&person, company.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_serve(config: AppConfig, options: ServeOptions) -> Result<()> {
    info!(
        address = %config.server.address,
        port = config.server.port,
        workers = config.server.workers,
        strict_status = config.server.strict_status,
        "starting webhook server"
    );

    server::serve(config, options).await?;

    info!("webhook server stopped");
    Ok(())
}

fn cmd_preview(person_path: &Path, company_path: Option<&Path>) -> Result<()> {
    let person: Person = read_json(person_path)?;
    let company: Option<Company> = company_path.map(read_json).transpose()?;

    let note = compose_note(&person, company.as_ref())?;

    if note.is_empty() {
        println!("(empty note: no employment or company metrics)");
    } else {
        println!("{note}");
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| eyre!("invalid JSON in '{}': {e}", path.display()))
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
