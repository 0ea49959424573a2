use async_trait::async_trait;
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use slashlib::bot::discord::{HttpCommandService, SerenityDataSource, SerenityResponder, dispatch};
use slashlib::bot::{EventReceiver, PayloadPermissions, commands::default_commands};
use slashlib::config::{Settings, load_settings};
use slashlib::core::CommandRegister;
use slashlib::errors::{Error, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

struct Handler {
    register: CommandRegister,
    settings: Settings,
    receiver: OnceLock<EventReceiver>,
    reconciled: AtomicBool,
}

impl Handler {
    fn new(register: CommandRegister, settings: Settings) -> Self {
        Self {
            register,
            settings,
            receiver: OnceLock::new(),
            reconciled: AtomicBool::new(false),
        }
    }

    /// True only for the first caller; `ready` fires again after every reconnect.
    fn claim_reconcile(&self) -> bool {
        self.settings.reconcile_on_ready && !self.reconciled.swap(true, Ordering::SeqCst)
    }

    async fn reconcile(&self, http: Arc<serenity::Http>, application_id: serenity::ApplicationId) {
        let service = HttpCommandService::new(http);
        if let Err(e) = self.register.register_global_commands(&service, application_id).await {
            error!("Failed to register global commands: {}", e);
        }
        if let Err(e) = self
            .register
            .register_guild_commands(&service, application_id, self.settings.guild_ids())
            .await
        {
            error!("Failed to register guild commands: {}", e);
        }
    }
}

#[async_trait]
impl serenity::EventHandler for Handler {
    async fn ready(&self, ctx: serenity::Context, ready: serenity::Ready) {
        info!("Logged in as {}", ready.user.name);

        let receiver = EventReceiver::new(
            Arc::clone(self.register.structure()),
            Arc::new(PayloadPermissions),
            Arc::new(SerenityResponder::new(Arc::clone(&ctx.http))),
            Arc::new(SerenityDataSource::new(Arc::clone(&ctx.http))),
            ready.user.id,
        );
        if self.receiver.set(receiver).is_err() {
            debug!("Event receiver already initialised, keeping the existing one");
        }

        if self.claim_reconcile() {
            let application_id = self.settings.application_id.unwrap_or(ready.application.id);
            self.reconcile(Arc::clone(&ctx.http), application_id).await;
        }
    }

    async fn interaction_create(&self, _ctx: serenity::Context, interaction: serenity::Interaction) {
        let Some(receiver) = self.receiver.get() else {
            warn!("Interaction received before the gateway was ready, ignoring it");
            return;
        };
        match dispatch(receiver, &interaction).await {
            Ok(Some(outcome)) => debug!(?outcome, "Interaction handled"),
            Ok(None) => {}
            Err(e) => error!("Failed to handle interaction: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional, variables can be set externally
    let dotenv_loaded = dotenv().is_ok();

    let settings = load_settings()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();
    info!(dotenv_loaded, "Loaded settings");

    let register = CommandRegister::create(default_commands(), Arc::new(settings.entitlements.clone()))
        .inspect_err(|e| error!("Invalid command definitions: {}", e))?;

    // The token is read directly before use and never stored in settings
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    let handler = Handler::new(register, settings);

    info!("Starting bot client...");
    let mut client = serenity::Client::builder(&token, serenity::GatewayIntents::non_privileged())
        .event_handler(handler)
        .await?;
    client.start().await?;
    Ok(())
}
