use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxr::cli::prefs::{parse_rate_args, parse_source_list, parse_source_set};
use fxr::core::log::init_logging;
use fxr::core::prefs::PreferenceUpdate;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// User the request belongs to
    #[arg(short, long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Resolve the conversion rate for a currency pair
    Rate {
        /// Base currency code (converting from)
        base: String,
        /// Target currency code (converting to)
        target: String,
    },
    /// Convert an amount between currencies
    Convert {
        amount: f64,
        /// Base currency code (converting from)
        base: String,
        /// Target currency code (converting to)
        target: String,
    },
    /// Display or edit per-user resolution preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Display current preferences
    Show,
    /// Update preferences; omitted flags are left unchanged
    Set {
        /// Source consultation order, e.g. "api,llm"
        #[arg(long)]
        fallback_order: Option<String>,
        /// Enabled sources, e.g. "api,llm"
        #[arg(long)]
        enable: Option<String>,
        /// Custom override rate as CODE=RATE (repeatable)
        #[arg(long = "set-rate")]
        set_rates: Vec<String>,
        /// Remove the custom override for a currency (repeatable)
        #[arg(long = "clear-rate")]
        clear_rates: Vec<String>,
        /// Default (base) currency for overrides and triangulation
        #[arg(long)]
        default_currency: Option<String>,
    },
}

fn to_app_command(cmd: Commands) -> Result<fxr::AppCommand> {
    Ok(match cmd {
        Commands::Setup => unreachable!("Setup command should be handled separately"),
        Commands::Rate { base, target } => fxr::AppCommand::Rate { base, target },
        Commands::Convert {
            amount,
            base,
            target,
        } => fxr::AppCommand::Convert {
            amount,
            base,
            target,
        },
        Commands::Prefs { command } => match command {
            PrefsCommands::Show => fxr::AppCommand::PrefsShow,
            PrefsCommands::Set {
                fallback_order,
                enable,
                set_rates,
                clear_rates,
                default_currency,
            } => fxr::AppCommand::PrefsSet(PreferenceUpdate {
                fallback_order: fallback_order.as_deref().map(parse_source_list).transpose()?,
                enabled_sources: enable.as_deref().map(parse_source_set).transpose()?,
                set_rates: if set_rates.is_empty() {
                    None
                } else {
                    Some(parse_rate_args(&set_rates)?)
                },
                clear_rates: if clear_rates.is_empty() {
                    None
                } else {
                    Some(clear_rates)
                },
                default_currency,
            }),
        },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => {
            fxr::run_command(to_app_command(cmd)?, &cli.user, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fxr::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
base_currency: "USD"

providers:
  yahoo:
    base_url: "https://query1.finance.yahoo.com"
  # llm:
  #   base_url: "https://api.openai.com"
  #   model: "gpt-4o-mini"
  #   api_key_env: "FXR_LLM_API_KEY"

cache:
  api_ttl_hours: 24
  llm_ttl_hours: 6
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
