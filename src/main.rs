//! PitchBuddy Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;

use futures::StreamExt;
use teloxide::dispatching::UpdateHandler;
use teloxide::{prelude::*, types::Update};
use tracing::{error, info, warn};

use PitchBuddy::{
    config::Settings,
    database::{connection::create_pool, BookingWatcher, DatabaseService},
    handlers::{
        callbacks::handle_callback_query,
        commands::{handle_command, Command},
        messages::handle_message,
    },
    services::ServiceFactory,
    state::{DialogueManager, StateStorage},
    utils::logging,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard keeps the file writer alive
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting PitchBuddy Telegram Bot...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database).await?;
    PitchBuddy::database::connection::health_check(&db_pool).await?;

    // Run database migrations
    PitchBuddy::database::connection::run_migrations(&db_pool).await?;

    // Initialize state storage in Redis
    info!("Connecting to Redis...");
    let state_storage = StateStorage::new(settings.redis.clone()).await?;

    // Initialize services
    info!("Initializing services...");
    let database_service = DatabaseService::new(db_pool.clone());
    let redis_client = ::redis::Client::open(settings.redis.url.clone())?;
    let services = ServiceFactory::new(database_service, settings.clone(), redis_client)?;

    let dialogue_manager = DialogueManager::new(settings.pitch.name.clone());

    // Watch the store's change feed and drop cached snapshots on any change,
    // so edits made outside this process are picked up too
    let watcher = BookingWatcher::connect(&db_pool).await?;
    let invalidation_service = services.booking_service.clone();
    tokio::spawn(async move {
        let mut changes = Box::pin(watcher.into_stream());
        while let Some(change) = changes.next().await {
            info!(payload = %change.payload, "Booking change notification");
            if let Err(e) = invalidation_service.invalidate_all().await {
                error!(error = %e, "Failed to invalidate availability cache");
            }
        }
        warn!("Booking change feed ended");
    });

    // Initialize bot
    let bot = Bot::new(&settings.bot.token);

    info!("Setting up bot handlers...");
    let handler = create_handler();

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            Arc::new(services),
            Arc::new(dialogue_manager),
            Arc::new(state_storage),
            Arc::new(settings)
        ])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("PitchBuddy bot is ready!");
    dispatcher.dispatch().await;

    info!("PitchBuddy bot has been shut down.");
    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use teloxide::dispatching::UpdateFilterExt;

    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_commands),
                )
                .branch(dptree::endpoint(handle_messages)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callbacks))
}

/// Handle bot commands
async fn handle_commands(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: Arc<ServiceFactory>,
    dialogue_manager: Arc<DialogueManager>,
    state_storage: Arc<StateStorage>,
    settings: Arc<Settings>,
) -> HandlerResult {
    if let Err(e) = handle_command(
        bot,
        msg,
        cmd,
        (*services).clone(),
        (*dialogue_manager).clone(),
        (*state_storage).clone(),
        (*settings).clone(),
    )
    .await
    {
        error!(error = %e, "Error handling command");
        return Err(e.into());
    }
    Ok(())
}

/// Handle regular messages
async fn handle_messages(
    bot: Bot,
    msg: Message,
    services: Arc<ServiceFactory>,
    dialogue_manager: Arc<DialogueManager>,
    state_storage: Arc<StateStorage>,
    settings: Arc<Settings>,
) -> HandlerResult {
    if let Err(e) = handle_message(
        bot,
        msg,
        (*services).clone(),
        (*dialogue_manager).clone(),
        (*state_storage).clone(),
        (*settings).clone(),
    )
    .await
    {
        error!(error = %e, "Error handling message");
        return Err(e.into());
    }
    Ok(())
}

/// Handle callback queries
async fn handle_callbacks(
    bot: Bot,
    query: teloxide::types::CallbackQuery,
    services: Arc<ServiceFactory>,
    dialogue_manager: Arc<DialogueManager>,
    state_storage: Arc<StateStorage>,
    settings: Arc<Settings>,
) -> HandlerResult {
    if let Err(e) = handle_callback_query(
        bot,
        query,
        (*services).clone(),
        (*dialogue_manager).clone(),
        (*state_storage).clone(),
        (*settings).clone(),
    )
    .await
    {
        error!(error = %e, "Error handling callback query");
        return Err(e.into());
    }
    Ok(())
}
