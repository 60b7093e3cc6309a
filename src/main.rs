use std::{env, sync::Arc};

use anyhow::Result;
use dotenv::dotenv;
use serenity::all::{
    ApplicationId, Command, CommandInteraction, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse, GatewayIntents, GuildId,
    Interaction,
};
use serenity::{async_trait, model::gateway::Ready, prelude::*, Client};
use tracing::{info, warn};

use stacks_earnings::config::Settings;
use stacks_earnings::service::command::chart as chart_cmd;
use stacks_earnings::service::command::earnings as earnings_cmd;
use stacks_earnings::service::earnings::EarningsReconciler;
use stacks_earnings::service::finance::finnhub::FinnhubClient;
use stacks_earnings::service::finance::FinanceService;

struct Handler {
    finance: Arc<FinanceService>,
    reconciler: Arc<EarningsReconciler>,
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        ping_command(),
        earnings_cmd::register_command(),
        chart_cmd::register_command(),
    ]
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        // Guild commands register instantly; global ones can take up to an hour.
        let guild_ids: Vec<GuildId> = env::var("GUILD_IDS")
            .unwrap_or_else(|_| env::var("GUILD_ID").unwrap_or_default())
            .split(',')
            .filter_map(|id| id.trim().parse::<u64>().ok())
            .map(GuildId::new)
            .collect();

        if guild_ids.is_empty() {
            for cmd in all_commands() {
                if let Err(e) = Command::create_global_command(&ctx.http, cmd).await {
                    warn!("failed to register global command: {e}");
                }
            }
            info!("{} is connected. Global commands registered.", ready.user.name);
            return;
        }

        for guild_id in guild_ids.iter() {
            for cmd in all_commands() {
                if let Err(e) = guild_id.create_command(&ctx.http, cmd).await {
                    warn!("failed to register command for guild {guild_id}: {e}");
                }
            }
            info!("Guild commands registered for guild ID: {}", guild_id);
        }
        info!(
            "{} is connected. Guild commands registered for {} server(s).",
            ready.user.name,
            guild_ids.len()
        );
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        match command.data.name.as_str() {
            "ping" => {
                let _ = command
                    .create_response(
                        &ctx.http,
                        CreateInteractionResponse::Message(
                            CreateInteractionResponseMessage::new().content("Pong!"),
                        ),
                    )
                    .await;
            }
            "earnings" => {
                defer(&ctx, &command).await;
                let content = match earnings_cmd::handle(&command, &self.reconciler).await {
                    Ok(msg) => msg,
                    Err(err) => format!("❌ {}", err),
                };
                respond(&ctx, &command, content).await;
            }
            "chart" => {
                defer(&ctx, &command).await;
                let content = match chart_cmd::handle(&command, &self.finance).await {
                    Ok(msg) => msg,
                    Err(err) => format!("❌ {}", err),
                };
                respond(&ctx, &command, content).await;
            }
            _ => {
                let _ = command
                    .create_response(
                        &ctx.http,
                        CreateInteractionResponse::Message(
                            CreateInteractionResponseMessage::new()
                                .content("Command not implemented."),
                        ),
                    )
                    .await;
            }
        }
    }
}

// Defer immediately to avoid the 3-second interaction timeout.
async fn defer(ctx: &Context, command: &CommandInteraction) {
    let _ = command
        .create_response(&ctx.http, CreateInteractionResponse::Defer(Default::default()))
        .await;
}

async fn respond(ctx: &Context, command: &CommandInteraction, content: String) {
    if let Err(e) = command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await
    {
        warn!("failed to edit interaction response: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env()?;
    let token = env::var("DISCORD_TOKEN")?;
    let app_id_raw: u64 = env::var("APPLICATION_ID")?.parse()?;
    let app_id: ApplicationId = app_id_raw.into();

    let intents = GatewayIntents::GUILDS;

    info!("Initializing FinanceService...");
    let finance = Arc::new(FinanceService::new(
        settings.proxy.clone(),
        settings.http_timeout,
    )?);

    info!("Initializing Finnhub client...");
    let finnhub = Arc::new(FinnhubClient::new(
        settings.finnhub_api_key.clone(),
        settings.finnhub_base_url.clone(),
        settings.http_timeout,
    )?);

    let reconciler = Arc::new(EarningsReconciler::new(
        finnhub,
        finance.clone(),
        settings.reconcile,
    ));

    info!("Starting Discord client...");
    let mut client = Client::builder(token, intents)
        .application_id(app_id)
        .event_handler(Handler {
            finance,
            reconciler,
        })
        .await?;

    if let Err(why) = client.start().await {
        eprintln!("Client error: {why}");
    }

    Ok(())
}

fn ping_command() -> CreateCommand {
    CreateCommand::new("ping").description("Simple ping command")
}
