use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Diagnostics CLI for ha-relay", long_about = None)]
struct Cli {
    #[arg(short, long, env = "HA_RELAY_URL", default_value = "http://localhost:5000")]
    url: String,

    /// Diagnostics API key, if the relay has one configured
    #[arg(short, long, env = "HA_RELAY_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the relay is up
    Health,
    /// Show upstream, routes, and counters
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let path = match cli.command {
        Commands::Health => "/_relay/health",
        Commands::Status => "/_relay/status",
    };

    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
