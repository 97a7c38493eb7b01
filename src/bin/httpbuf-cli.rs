use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "httpbuf-cli")]
#[command(about = "Query the admin API of a running httpbuf relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8101")]
    url: String,

    /// Admin API key, if the relay requires one.
    #[arg(short, long, env = "HTTPBUF_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full status as JSON
    Status,
    /// Number of queued requests only
    Depth,
    /// Exit non-zero unless the backend is up
    Up,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let res = client
        .get(format!("{}/admin/status", cli.url.trim_end_matches('/')))
        .headers(headers)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        return Ok(ExitCode::from(2));
    }

    let json: Value = res.json().await?;
    match cli.command {
        Commands::Status => println!("{}", serde_json::to_string_pretty(&json)?),
        Commands::Depth => println!("{}", json["queue_depth"]),
        Commands::Up => {
            println!("{}", backend_status(&json));
            if !backend_is_up(&json) {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn backend_status(json: &Value) -> &str {
    json["backend"].as_str().unwrap_or("unknown")
}

fn backend_is_up(json: &Value) -> bool {
    backend_status(json) == "up"
}
