use clap::{Parser, Subcommand};
use serde_json::Value;

use hls_relay::codec::{self, HeaderBag, ProxyEndpoint};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the HLS relay", long_about = None)]
struct Cli {
    /// Base URL of a running relay (scheme + host [+ port] + route prefix).
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay liveness
    Health,
    /// Show relay counters
    Status,
    /// Build a proxy URL for a target
    Encode {
        /// Absolute URL of the origin resource
        target: String,
        /// Auth code the relay expects
        #[arg(short, long, env = "PROXY_AUTH")]
        auth: String,
        /// Extra origin header, as `Name: value`; repeatable
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
    },
    /// Print the parts of a proxy URL
    Decode {
        proxy_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Health => {
            let res = reqwest::get(format!("{}/health", base)).await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = reqwest::get(format!("{}/status", base)).await?;
            print_response(res).await?;
        }
        Commands::Encode {
            target,
            auth,
            headers,
        } => {
            let bag = parse_headers(&headers)?;
            let endpoint = ProxyEndpoint::new(&base, "");
            println!("{}", codec::encode(&endpoint, &target, &auth, Some(&bag)));
        }
        Commands::Decode { proxy_url } => {
            let request = codec::decode(&proxy_url)?;
            let out = serde_json::json!({
                "url": request.target.as_str(),
                "auth": request.auth,
                "headers": request.headers,
                "type": request.kind.map(|k| format!("{:?}", k).to_lowercase()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<HeaderBag, String> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| format!("header '{}' must look like Name: value", entry))
        })
        .collect()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
