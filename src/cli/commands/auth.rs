use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{ping_server, CliContext};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::auth::TokenStore;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Store a bearer token for later commands")]
    SetToken {
        #[arg(help = "JWT issued by the platform (a leading 'Bearer ' is accepted)")]
        token: String,
    },

    #[command(about = "Forget every stored token")]
    Clear,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::SetToken { token } => {
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("token is empty");
            }
            ctx.store.set(ctx.token_key(), token)?;
            let session = ctx.session();
            output_success(
                &output_format,
                &match session.user_id() {
                    Some(id) => format!("Token stored for user {}", id),
                    None => "Token stored (no user id in its claims)".to_string(),
                },
                Some(json!({ "user_id": session.user_id() })),
            )
        }
        AuthCommands::Clear => {
            ctx.clear_tokens()?;
            output_success(&output_format, "Stored tokens removed", None)
        }
        AuthCommands::Status => {
            let session = ctx.session();
            let reachable = ping_server(&ctx.config.api.base_url).await;
            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "authenticated": session.is_authenticated(),
                            "user_id": session.user_id(),
                            "server": ctx.config.api.base_url,
                            "reachable": reachable,
                            "token_file": ctx.store.path(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    println!("Server: {} ({})", ctx.config.api.base_url, if reachable { "up" } else { "down" });
                    match (session.is_authenticated(), session.user_id()) {
                        (false, _) => println!("Not authenticated"),
                        (true, Some(id)) => println!("Authenticated as user {}", id),
                        (true, None) => println!("Authenticated (token carries no user id)"),
                    }
                }
            }
            Ok(())
        }
    }
}
