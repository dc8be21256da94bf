//! `ucsb`: command-line client for the UCSB resource API.
//!
//! Manages contexts (backend + token) and runs list, create, update and
//! delete against the six record types through the same controllers,
//! validation and role checks a browser view would use.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::resource::ValidationFailed;

#[derive(Parser, Debug)]
#[command(name = "ucsb", about = "UCSB resource API client")]
struct Cli {
    /// Path to client config file (default: ~/.ucsb/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout", global = true, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts.
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// List records, or show one.
    Get {
        /// Resource type (e.g. helprequests, articles, orgs).
        resource: String,
        /// Record id (orgCode for organizations).
        key: Option<String>,
    },

    /// Create a record.
    Create {
        resource: String,
        /// Record fields as a JSON object.
        #[arg(long = "json")]
        json_body: Option<String>,
        /// Read the JSON object from a file.
        #[arg(short = 'f', long = "file")]
        file: Option<String>,
    },

    /// Update a record. Only the given fields change.
    Update {
        resource: String,
        key: String,
        #[arg(long = "json")]
        json_body: String,
    },

    /// Delete a record.
    Delete {
        resource: String,
        key: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Show the signed-in user and roles.
    Whoami,

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create a new context.
    Create {
        name: String,
        #[arg(long)]
        server: String,
        #[arg(long)]
        token: Option<String>,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        /// Bearer token; pass an empty string to clear it.
        #[arg(long)]
        token: Option<String>,
    },
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        match err.downcast_ref::<ValidationFailed>() {
            Some(failed) => eprintln!("{failed}"),
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::CliConfig::default_path);

    let output = match cli.command {
        Commands::Context { action } => {
            match action {
                ContextAction::Create { name, server, token } => {
                    commands::context::create(&name, &server, token.as_deref(), &config_path)?;
                }
                ContextAction::List => commands::context::list(&config_path)?,
                ContextAction::Set { name, server, token } => {
                    commands::context::set(&name, server.as_deref(), token.as_deref(), &config_path)?;
                }
                ContextAction::Delete { name } => commands::context::delete(&name, &config_path)?,
            }
            return Ok(());
        }

        Commands::Use { what } => {
            let UseWhat::Context { name } = what;
            commands::context::use_context(&name, &config_path)?;
            return Ok(());
        }

        Commands::Version => {
            println!("ucsb cli v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        Commands::Get { resource, key } => {
            let app = commands::resource::connect(&config_path, cli.timeout)?;
            commands::resource::get(&app, &resource, key.as_deref(), cli.output == "json").await?
        }

        Commands::Create { resource, json_body, file } => {
            let body = if let Some(path) = file {
                std::fs::read_to_string(&path)?
            } else if let Some(json) = json_body {
                json
            } else {
                anyhow::bail!("Provide --json or -f <file>.");
            };
            let app = commands::resource::connect(&config_path, cli.timeout)?;
            commands::resource::create(&app, &resource, &body).await?
        }

        Commands::Update { resource, key, json_body } => {
            let app = commands::resource::connect(&config_path, cli.timeout)?;
            commands::resource::update(&app, &resource, &key, &json_body).await?
        }

        Commands::Delete { resource, key, yes } => {
            if !yes {
                eprint!("Delete {resource} {key}? [y/N]: ");
                let mut s = String::new();
                std::io::stdin().read_line(&mut s)?;
                if !s.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            let app = commands::resource::connect(&config_path, cli.timeout)?;
            commands::resource::delete(&app, &resource, &key).await?
        }

        Commands::Whoami => {
            let app = commands::resource::connect(&config_path, cli.timeout)?;
            commands::resource::whoami(&app).await?
        }
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
