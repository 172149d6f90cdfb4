//! ADDEVA CLI — call the site API with the locally stored credentials.
//!
//! Credentials live in a JSON file (default `<config dir>/addeva/storage.json`).
//! `--location` stands in for the page the call is made from: it decides
//! the login `next` target and whether `?debug=1` suppresses the redirect.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use addeva_sdk::Method;

#[derive(Parser, Debug)]
#[command(name = "addeva-cli")]
#[command(author, version, about = "ADDEVA API client", long_about = None)]
pub struct Cli {
    /// API origin (overrides ADDEVA_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Page the request is made from (e.g. /shop/cart.html?debug=1)
    #[arg(long, global = true, default_value = "/")]
    pub location: String,

    /// Credential storage file (default: <config dir>/addeva/storage.json)
    #[arg(long, global = true)]
    pub storage_file: Option<PathBuf>,

    /// Clock-skew allowance in seconds (overrides ADDEVA_JWT_SKEW_SECS)
    #[arg(long, global = true)]
    pub skew: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send an API request
    Request(RequestArgs),
    /// Manage the stored bearer token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Manage the stored API key
    ApiKey {
        #[command(subcommand)]
        action: ApiKeyAction,
    },
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// API path (e.g. /api/addeva/products)
    pub path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "POST", value_parser = commands::parse_method)]
    pub method: Method,

    /// JSON body
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,

    /// Raw body, sent unmodified
    #[arg(short, long)]
    pub data: Option<String>,

    /// Extra header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_parser = commands::parse_header)]
    pub headers: Vec<(String, String)>,
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Store a JWT obtained from the login flow
    Set {
        /// The token
        token: String,
    },
    /// Remove the stored token
    Clear,
    /// Decode the stored token and report its expiry
    Show,
}

#[derive(Subcommand, Debug)]
pub enum ApiKeyAction {
    /// Seed the API key from page metadata, if none is stored yet
    Seed {
        /// Value of the `x-api-key` meta element
        #[arg(long, conflicts_with = "html")]
        meta: Option<String>,
        /// HTML page to read the `x-api-key` meta element from
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Print the stored API key
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli).await
}
