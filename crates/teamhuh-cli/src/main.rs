mod cmd_get;
mod cmd_list;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teamhuh::config::{ENV_PASSWORD, ENV_TIMEOUT_SECS, ENV_URL, ENV_USERNAME};
use teamhuh::{Credentials, FixtureTransport, QueryNode, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "huh")]
#[command(about = "Browse a TeamCity-style XML REST API by name")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Emit JSON instead of XML
    #[arg(long, global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log fetches and resolution decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Server root, e.g. https://ci.example.com
    #[arg(long, global = true, env = ENV_URL)]
    url: Option<String>,

    #[arg(long, global = true, env = ENV_USERNAME)]
    username: Option<String>,

    #[arg(long, global = true, env = ENV_PASSWORD, hide_env_values = true)]
    password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = ENV_TIMEOUT_SECS)]
    timeout: Option<u64>,

    /// Serve responses from a directory of XML files instead of HTTP
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a chain of names and print the result
    Get {
        /// Names to resolve, left to right (e.g. builds first status)
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Resolve a chain of names and list the members of the collection reached
    List {
        /// Names to resolve, left to right (e.g. projects)
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// How results are rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xml,
    Json { pretty: bool },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = root_node(&cli.connection)?;
    tracing::debug!(base = root.base_address(), "entry point ready");
    let format = if cli.json {
        OutputFormat::Json { pretty: cli.pretty }
    } else {
        OutputFormat::Xml
    };

    match cli.command {
        Commands::Get { names } => cmd_get::run(&root, &names, format),
        Commands::List { names } => cmd_list::run(&root, &names, format),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn root_node(args: &ConnectionArgs) -> Result<QueryNode> {
    if let Some(dir) = &args.fixtures {
        let base = args.url.as_deref().unwrap_or("http://fixtures");
        let credentials = Credentials::new(
            args.username.clone().unwrap_or_default(),
            args.password.clone().unwrap_or_default(),
        );
        return Ok(QueryNode::new(
            base,
            credentials,
            Arc::new(FixtureTransport::new(base, dir)),
        ));
    }

    let url = args
        .url
        .as_deref()
        .with_context(|| format!("No server URL given (use --url or {})", ENV_URL))?;
    let username = args
        .username
        .as_deref()
        .with_context(|| format!("No username given (use --username or {})", ENV_USERNAME))?;
    let password = args
        .password
        .as_deref()
        .with_context(|| format!("No password given (use --password or {})", ENV_PASSWORD))?;

    let mut config = ServerConfig::new(url, username, password);
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    QueryNode::connect(&config).with_context(|| format!("Failed to set up client for {}", url))
}
