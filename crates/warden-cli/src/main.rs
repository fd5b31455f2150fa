//! agent-warden CLI - scan messages from the command line

use anyhow::Result;
use clap::Parser;

use warden_core::{QuickCheck, ScanContext, Source, Warden, WardenConfig};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "agent-warden - inline intrusion detection for AI agent traffic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Scan a message through the full pipeline
    Scan {
        /// The message text
        message: String,
        /// Source channel (internal, authenticated, known, public,
        /// untrusted, webhook, email, api, web)
        #[arg(short, long, default_value = "public")]
        source: String,
        /// Sender identifier
        #[arg(long, default_value = "cli")]
        sender: String,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Classify from heuristics only, without a language model
        #[arg(long)]
        offline: bool,
    },
    /// Fast check against high-risk patterns only
    Check {
        /// The message text
        message: String,
    },
    /// Show catalog and threshold summary
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            message,
            source,
            sender,
            json,
            offline,
        } => {
            let config = WardenConfig {
                semantic_enabled: !offline,
                // Interactive use should degrade, not fail, when no
                // local model is running.
                require_llm: false,
                ..WardenConfig::default()
            };
            let warden = Warden::new(config)?;
            let ctx = ScanContext::new()
                .with_source(Source::from_label(&source))
                .with_sender(sender);

            let alerted = warden.scan_with_alert(&message, &ctx).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alerted)?);
            } else {
                println!("{}", alerted.alert);
            }
            if alerted.report.action.is_blocking() {
                std::process::exit(2);
            }
        }
        Commands::Check { message } => {
            let warden = Warden::new(WardenConfig::default())?;
            match warden.quick_check(&message) {
                QuickCheck::Dangerous {
                    category,
                    description,
                } => {
                    println!("DANGEROUS [{category}] {description}");
                    std::process::exit(2);
                }
                QuickCheck::Clean => println!("clean"),
            }
        }
        Commands::Stats => {
            let warden = Warden::new(WardenConfig::default())?;
            println!("{}", serde_json::to_string_pretty(&warden.stats())?);
        }
    }

    Ok(())
}
