use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use typelens::config::{default_config_path, load_config, save_config, ServerConfig};
use typelens::errors::{Result, TypeLensError};
use typelens::logging::{self, LogBuffer};
use typelens::mcp::{get_tool_definitions, McpServer, ToolRegistry};
use typelens::metadata::{Catalog, MetadataProvider};
use typelens::resources::StaticResources;
use typelens::serve::{run_stdio, HttpServer};

/// Query reflected type metadata over JSON-RPC.
#[derive(Parser)]
#[command(name = "typelens", version, about = "Query reflected type metadata over JSON-RPC")]
struct Cli {
    /// Configuration file (default: <config dir>/typelens/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC over HTTP until interrupted
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (0 picks a free port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Metadata catalog (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Serve JSON-RPC over stdin/stdout, one message per line
    Stdio {
        /// Metadata catalog (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List the available tools
    Tools,
    /// Run a single tool and print its result
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Metadata catalog (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init {
        /// Where to write it (default: the default config path)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Serve {
            host,
            port,
            catalog,
        } => {
            let mut config = load_config(&config_path)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            let server = Arc::new(build_server(&config, catalog.as_deref())?);
            let http = HttpServer::new(server, config.bind_addr());
            http.run_until_ctrl_c().await?;
        }
        Commands::Stdio { catalog } => {
            let config = load_config(&config_path)?;
            let server = build_server(&config, catalog.as_deref())?;
            run_stdio(&server).await?;
        }
        Commands::Tools => {
            for tool in get_tool_definitions() {
                println!("{:<24} {}", tool.name, tool.description);
            }
        }
        Commands::Call {
            tool,
            args,
            catalog,
        } => {
            let config = load_config(&config_path)?;
            logging::initialize(&config.logging, None);
            let arguments: Value =
                serde_json::from_str(&args).map_err(|e| TypeLensError::InvalidArgument {
                    name: "args".to_string(),
                    message: format!("not valid JSON: {}", e),
                })?;
            let provider = open_catalog(&config, catalog.as_deref())?;
            let registry = ToolRegistry::new(provider, &config);
            let result = registry.execute(&tool, &arguments)?;
            println!("{}", result.first_text());
            if result.is_error {
                process::exit(2);
            }
        }
        Commands::Init { path } => {
            let target = path.unwrap_or(config_path);
            if target.exists() {
                println!("Config already exists at {}", target.display());
            } else {
                save_config(&target, &ServerConfig::default())?;
                println!("Wrote default config to {}", target.display());
            }
        }
    }
    Ok(())
}

/// Sets up logging with a recent-log buffer and assembles the dispatcher.
fn build_server(config: &ServerConfig, catalog: Option<&Path>) -> Result<McpServer> {
    let buffer = LogBuffer::default();
    logging::initialize(&config.logging, Some(&buffer));

    let provider = open_catalog(config, catalog)?;
    let resources = Arc::new(StaticResources::with_logs(buffer));
    Ok(McpServer::from_config(provider, resources, config))
}

/// Loads the catalog named on the command line, else the configured one,
/// else an empty catalog.
fn open_catalog(
    config: &ServerConfig,
    override_path: Option<&Path>,
) -> Result<Arc<dyn MetadataProvider>> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(|| config.catalog_path.as_ref().map(PathBuf::from));

    let catalog = match path {
        Some(path) => {
            let catalog = Catalog::load(&path)?;
            info!(path = %path.display(), "catalog loaded");
            catalog
        }
        None => {
            info!("no catalog configured, serving an empty one");
            Catalog::empty()
        }
    };
    Ok(Arc::new(catalog))
}
