use clap::Subcommand;
use serde_json::json;

use crate::cli::config::CliContext;
use crate::cli::utils::{output_empty_collection, render_table};
use crate::cli::OutputFormat;
use crate::geo::{GeoEndpoints, GeoLevel, GeoOption, GeoSelector};

#[derive(Subcommand)]
pub enum GeoCommands {
    #[command(about = "List countries")]
    Countries,

    #[command(about = "List the states of a country")]
    States {
        #[arg(help = "Country id")]
        country: String,
    },

    #[command(about = "List the cities of a state; the state's country is selected first")]
    Cities {
        #[arg(help = "Country id (parent of the state)")]
        country: String,
        #[arg(help = "State id")]
        state: String,
    },
}

pub async fn handle(cmd: GeoCommands, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let selector = GeoSelector::new(ctx.client()?, GeoEndpoints::default())?;

    let level = match &cmd {
        GeoCommands::Countries => {
            selector.load_countries().await?;
            GeoLevel::Country
        }
        GeoCommands::States { country } => {
            selector.select_country(country).await?;
            GeoLevel::State
        }
        GeoCommands::Cities { country, state } => {
            selector.select_country(country).await?;
            selector.select_state(state).await?;
            GeoLevel::City
        }
    };

    let snapshot = selector.snapshot();
    let options = &snapshot.level(level).options;
    let label = match level {
        GeoLevel::Country => "countries",
        GeoLevel::State => "states",
        GeoLevel::City => "cities",
    };

    if options.is_empty() {
        return output_empty_collection(&output_format, label, &format!("No {} found", label));
    }

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "level": level, "options": options }))?);
        }
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = options
                .iter()
                .map(|GeoOption { id, name }| vec![id.clone(), name.clone()])
                .collect();
            println!("{}", render_table(&["id".to_string(), "name".to_string()], &rows, 48));
        }
    }
    Ok(())
}
