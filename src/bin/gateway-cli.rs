use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use ollama_gateway::admin::MaintenanceToggle;
use ollama_gateway::config::env::API_TOKEN;
use ollama_gateway::config::env_file::DEFAULT_BASE_FILE;
use ollama_gateway::config::{DotenvEnv, EnvFileStore, EnvironmentAccessor, ProcessEnv};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the Ollama gateway", long_about = None)]
struct Cli {
    /// Gateway base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key
    #[arg(short, long, default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flip MAINTENANCE_MODE in the local env files
    ToggleMaintenance {
        /// Directory holding the env files
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Base env file name
        #[arg(long, default_value = DEFAULT_BASE_FILE)]
        base_file: String,
    },
    /// Check gateway status through the admin API
    Status,
    /// List backend models through the gateway
    Models {
        /// API token sent in X-API-TOKEN; defaults to $API_TOKEN
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::ToggleMaintenance { root, base_file } => toggle_maintenance(root, base_file),
        Commands::Status => status(&cli.url, &cli.key).await,
        Commands::Models { token } => models(&cli.url, token).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Process error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn toggle_maintenance(root: PathBuf, base_file: String) -> Result<(), Box<dyn std::error::Error>> {
    let store = EnvFileStore::with_base_file(root, base_file);
    let scope_file = store.scope_path(&store.active_scope()?);
    let env = DotenvEnv::load(store.clone());

    let value = MaintenanceToggle::new(&env, &store).toggle()?;
    println!(
        "MAINTENANCE_MODE in {} has been set to: {}",
        scope_file.display(),
        value
    );
    Ok(())
}

async fn status(url: &str, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}/admin/status", url.trim_end_matches('/')))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn models(url: &str, token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let token = match token {
        Some(token) => token,
        None => ProcessEnv.get(API_TOKEN)?,
    };

    let res = reqwest::Client::new()
        .get(format!("{}/api/ollama/models", url.trim_end_matches('/')))
        .header("X-API-TOKEN", token.as_str())
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(format!("gateway returned status {}: {}", status, text).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
