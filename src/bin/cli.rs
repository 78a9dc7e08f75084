//! Skyhash CLI Client
//!
//! Command-line interface for sending queries to a Skytable server.

use clap::{Parser, Subcommand};
use skyhash::{Config, Connection, Element, Query};
use tracing_subscriber::{fmt, EnvFilter};

/// Skyhash CLI
#[derive(Parser, Debug)]
#[command(name = "skyhash-cli")]
#[command(about = "CLI for Skytable over the Skyhash protocol")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = skyhash::config::DEFAULT_PORT)]
    port: u16,

    /// Entity to switch to before running the command (keyspace:table)
    #[arg(short, long)]
    entity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair (fails if the key exists)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Set or overwrite a key-value pair
    Update {
        key: String,
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Get and delete a key
    Pop {
        key: String,
    },

    /// Switch to an entity and report the server's answer
    Use {
        /// Target entity as keyspace:table
        entity: String,
    },

    /// Run an arbitrary query, one argument per word
    Query {
        #[arg(required = true)]
        args: Vec<String>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,skyhash=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder().host(&args.host).port(args.port).build();

    match run(&config, &args) {
        Ok(element) => println!("{}", element),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(config: &Config, args: &Args) -> skyhash::Result<Element> {
    tracing::debug!("Connecting to {}", config.addr());
    let mut conn = Connection::connect(config)?;

    if let Some(entity) = &args.entity {
        let (keyspace, table) = split_entity(entity)?;
        let response = conn.use_entity(keyspace, table)?;
        if !response.is_okay() {
            return Ok(response);
        }
    }

    let element = match &args.command {
        Commands::Get { key } => conn.get(key)?,
        Commands::Set { key, value } => conn.set(key, value.as_str())?,
        Commands::Update { key, value } => conn.update(key, value.as_str())?,
        Commands::Del { key } => conn.del(key)?,
        Commands::Pop { key } => conn.pop(key)?,
        Commands::Use { entity } => {
            let (keyspace, table) = split_entity(entity)?;
            conn.use_entity(keyspace, table)?
        }
        Commands::Query { args } => conn.run_query(&args.iter().collect::<Query>())?,
    };

    conn.close()?;
    Ok(element)
}

fn split_entity(entity: &str) -> skyhash::Result<(&str, &str)> {
    entity.split_once(':').ok_or_else(|| {
        skyhash::SkyError::Config(format!("entity must be keyspace:table, got {:?}", entity))
    })
}
