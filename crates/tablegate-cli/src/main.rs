use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tablegate_core::Transport;
use tracing_subscriber::EnvFilter;

mod commands;
mod connector;

use commands::Gateway;
use commands::query::QueryOptions;

#[derive(Parser, Debug)]
#[command(name = "tablegate", version, about = "Dual-path database gateway for AI agents")]
struct Cli {
    /// Configuration file (defaults to ./tablegate.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server
    Serve {
        /// stdio or http (overrides mcp.transport)
        #[arg(long)]
        transport: Option<Transport>,

        /// HTTP port (overrides mcp.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// List tables
    Tables,

    /// Describe one table
    Describe { table: String },

    /// Foreign key relationships of one table, or of every table
    Relationships {
        #[arg(long)]
        table: Option<String>,
    },

    /// Query rows through the managed client
    Query {
        table: String,

        /// Projection, e.g. "id, name"
        #[arg(long)]
        select: Option<String>,

        /// Equality filter column=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// column, column.asc or column.desc
        #[arg(long)]
        order: Option<String>,

        #[arg(long)]
        limit: Option<u64>,

        #[arg(long)]
        offset: Option<u64>,
    },

    /// Run a raw SQL statement on the direct connection
    Sql { statement: String },

    /// Print the schema summary injected into agent sessions
    Summary {
        /// Restrict to the agent's enabled tables
        #[arg(long)]
        agent: Option<String>,

        /// Table-count ceiling (overrides context.max_tables)
        #[arg(long)]
        max_tables: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // stdout carries the stdio MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let gateway = Gateway::connect(cli.config.as_deref()).await?;

    match cli.cmd {
        Command::Serve { transport, port } => {
            commands::serve::run(gateway, transport, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Tables => commands::inspect::tables(&gateway).await,
        Command::Describe { table } => commands::inspect::describe(&gateway, &table).await,
        Command::Relationships { table } => {
            commands::inspect::relationships(&gateway, table.as_deref()).await
        }
        Command::Query {
            table,
            select,
            filters,
            order,
            limit,
            offset,
        } => {
            let options = QueryOptions {
                select,
                filters,
                order,
                limit,
                offset,
            };
            commands::query::query(&gateway, &table, options).await
        }
        Command::Sql { statement } => commands::query::sql(&gateway, &statement).await,
        Command::Summary { agent, max_tables } => {
            commands::inspect::summary(&gateway, agent.as_deref(), max_tables).await
        }
    }
}
