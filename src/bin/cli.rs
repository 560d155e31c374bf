//! APM Querier CLI
//!
//! Command-line companion for the APM querier function:
//! - Run a query against a deployed function
//! - Flatten a saved query result locally
//! - Check function health
//! - Generate a config file

use anyhow::{bail, Context};
use apm_querier::config::generate_default_config;
use apm_querier::model::QueryResult;
use apm_querier::transform::{render_json, transform_with, ResultShape};
use clap::{ArgGroup, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apm-querier-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query an APM domain through the APM querier function")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Function URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query through the function
    #[command(group(ArgGroup::new("source").required(true).args(["result_name", "tql", "config_name"])))]
    Query {
        /// Name of a saved query result
        #[arg(long)]
        result_name: Option<String>,
        /// Query text
        #[arg(long)]
        tql: Option<String>,
        /// Name of a configured query
        #[arg(long)]
        config_name: Option<String>,
    },

    /// Flatten a raw query result read from a file or stdin
    Transform {
        /// Path to a query result JSON file (default: stdin)
        path: Option<PathBuf>,
        /// Print the detected result shape to stderr
        #[arg(long)]
        show_shape: bool,
    },

    /// Show function health
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            result_name,
            tql,
            config_name,
        } => {
            let params = query_params(result_name, tql, config_name);

            let response = reqwest::Client::new()
                .get(format!("{}/", cli.api_url.trim_end_matches('/')))
                .query(&params)
                .send()
                .await
                .with_context(|| format!("Cannot connect to APM querier at {}", cli.api_url))?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                bail!("Query failed ({}): {}", status, text);
            }

            println!("{}", text);
        }

        Commands::Transform { path, show_shape } => {
            let input = match &path {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {:?}", path))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };

            let result: QueryResult =
                serde_json::from_str(&input).context("Input is not a query result")?;

            let shape = ResultShape::detect(&result.query_result_metadata_summary);
            if show_shape {
                eprintln!(
                    "Shape: {} ({} rows)",
                    shape.name(),
                    result.query_result_rows.len()
                );
            }

            let records = transform_with(&shape, &result)?;
            println!("{}", render_json(&records)?);
        }

        Commands::Status => {
            let response = reqwest::Client::new()
                .get(format!("{}/health", cli.api_url.trim_end_matches('/')))
                .send()
                .await
                .with_context(|| format!("Cannot connect to APM querier at {}", cli.api_url))?;

            if !response.status().is_success() {
                bail!("Function returned error: {}", response.status());
            }

            let health: serde_json::Value = response.json().await?;

            println!("APM querier {}", health["version"].as_str().unwrap_or("unknown"));
            println!();
            println!("Status: {}", health["status"].as_str().unwrap_or("unknown"));
            println!(
                "Domain configured: {}",
                health["domain_configured"].as_bool().unwrap_or(false)
            );
            if let Some(limit) = health["limit"].as_u64() {
                println!("Row limit: {}", limit);
            }
            if let Some(uptime) = health["uptime_seconds"].as_u64() {
                println!("Uptime: {}", format_duration(uptime));
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            if let Some(path) = output {
                std::fs::write(&path, &config)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            } else {
                print!("{}", config);
            }
        }
    }

    Ok(())
}

/// Query string pairs for the function
///
/// The function percent-decodes `query_tql` once more after the query string
/// itself is decoded, so the text is encoded here before reqwest encodes it
/// again.
fn query_params(
    result_name: Option<String>,
    tql: Option<String>,
    config_name: Option<String>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(name) = result_name {
        params.push(("query_result_name", name));
    }
    if let Some(tql) = tql {
        params.push(("query_tql", urlencoding::encode(&tql).into_owned()));
    }
    if let Some(name) = config_name {
        params.push(("configuration_name", name));
    }
    params
}

fn format_duration(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m {}s", mins, secs % 60)
    }
}
