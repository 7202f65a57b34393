pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "fdesk")]
#[command(about = "FleetDesk CLI - manage the logistics platform's collections from a terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Backend base URL (overrides FLEETDESK_BASE_URL)")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "List the collections this client knows about")]
    Resources,

    #[command(about = "List records of a collection with search, sort and paging")]
    List(commands::records::ListArgs),

    #[command(about = "Create a record from JSON on stdin or --file")]
    Create(commands::records::WriteArgs),

    #[command(about = "Update a record from JSON on stdin or --file")]
    Update {
        #[command(flatten)]
        args: commands::records::WriteArgs,
        #[arg(help = "Record id")]
        id: String,
    },

    #[command(about = "Delete a record after confirmation")]
    Delete {
        #[arg(help = "Collection name")]
        resource: String,
        #[arg(help = "Record id")]
        id: String,
        #[arg(long, short, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Browse the country, state and city tree")]
    Geo {
        #[command(subcommand)]
        cmd: commands::geo::GeoCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = config::CliContext::load(cli.base_url)?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx, output_format).await,
        Commands::Resources => commands::records::resources(output_format),
        Commands::List(args) => commands::records::list(args, &ctx, output_format).await,
        Commands::Create(args) => commands::records::create(args, &ctx, output_format).await,
        Commands::Update { args, id } => commands::records::update(&id, args, &ctx, output_format).await,
        Commands::Delete { resource, id, yes } => {
            commands::records::delete(&resource, &id, yes, &ctx, output_format).await
        }
        Commands::Geo { cmd } => commands::geo::handle(cmd, &ctx, output_format).await,
    }
}
