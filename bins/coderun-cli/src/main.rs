mod commands;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coderun_common::config::ClientConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "coderun")]
#[command(about = "Coderun CLI - Submit code to a remote judge and follow its results", long_about = None)]
struct Cli {
    /// Client config file (defaults to config/client.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend origin, overrides config and CODERUN_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run code against one or more stdins
    Run {
        /// Language name (e.g., python, cpp, java)
        #[arg(short, long)]
        lang: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Stdin for one case (repeatable)
        #[arg(short, long)]
        stdin: Vec<String>,

        /// File of stdins separated by blank lines
        #[arg(long)]
        stdins_file: Option<PathBuf>,

        /// Time limit in milliseconds
        #[arg(long)]
        time_limit: Option<u64>,

        /// Memory limit in MB
        #[arg(long)]
        memory_limit: Option<u64>,

        /// Bearer token
        #[arg(short, long)]
        token: Option<String>,

        /// Submission path (e.g., /execute_v2 for streamed runs)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Submit code for a problem and report the verdict
    Judge {
        /// Language name
        #[arg(short, long)]
        lang: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Problem id
        #[arg(short, long)]
        problem: String,

        /// Bearer token
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Resume a submission by request id
    Attach {
        /// Request id returned by the backend
        #[arg(short, long)]
        request_id: String,

        /// Read the progress stream instead of polling
        #[arg(long, default_value = "false")]
        stream: bool,

        /// Bearer token
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Print the display label for a status code
    Classify {
        /// Status code (e.g., success, wrong_output)
        code: String,
    },
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn load_config(path: Option<&PathBuf>, api_url: Option<String>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::load(path)?.with_env_overrides(),
        None => ClientConfig::load_default()?,
    };
    if let Some(api_url) = api_url {
        config.api_url = api_url;
    }
    config.validate().context("Invalid client configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    if let Commands::Classify { code } = &cli.command {
        commands::classify_code(code);
        return Ok(());
    }

    let mut config = load_config(cli.config.as_ref(), cli.api_url)?;
    info!(api_url = %config.api_url, "Coderun client starting");

    match cli.command {
        Commands::Run {
            lang,
            file,
            stdin,
            stdins_file,
            time_limit,
            memory_limit,
            token,
            endpoint,
        } => {
            if let Some(endpoint) = endpoint {
                config.endpoints.submit = endpoint;
            }
            commands::run_code(
                &config,
                commands::RunOptions {
                    language: &lang,
                    file: &file,
                    stdins: stdin,
                    stdins_file: stdins_file.as_deref(),
                    time_limit,
                    memory_limit,
                    token,
                },
            )
            .await?;
        }
        Commands::Judge {
            lang,
            file,
            problem,
            token,
        } => {
            commands::judge_code(&config, &lang, &file, &problem, token).await?;
        }
        Commands::Attach {
            request_id,
            stream,
            token,
        } => {
            commands::attach(&config, &request_id, stream, token).await?;
        }
        Commands::Classify { .. } => {}
    }

    Ok(())
}
