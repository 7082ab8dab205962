use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use courier_api::auth::{self, AppState, AppStateInner};
use courier_api::middleware::{require_admin, require_auth};
use courier_api::{admin, messages};
use courier_core::{DispatchEngine, MessageQueryService, MetricsService};
use courier_db::models::UserRow;
use courier_db::{Database, format_ts};
use courier_platforms::{DiscordAdapter, PlatformAdapter, PlatformRegistry, TelegramAdapter};
use courier_types::models::Platform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = env_or("COURIER_JWT_SECRET", "dev-secret-change-me");
    let db_path = env_or("COURIER_DB_PATH", "courier.db");
    let host = env_or("COURIER_HOST", "0.0.0.0");
    let port: u16 = env_or("COURIER_PORT", "3000").parse()?;
    let adapter_timeout =
        Duration::from_secs(env_or("COURIER_ADAPTER_TIMEOUT_SECS", "30").parse()?);
    let default_daily_limit: i64 = env_or("COURIER_DEFAULT_DAILY_LIMIT", "10").parse()?;
    let admin_password = env_or("COURIER_ADMIN_PASSWORD", "admin123");

    let telegram_token = env_or("TELEGRAM_BOT_TOKEN", "");
    let telegram_chat_id = env_or("TELEGRAM_DEFAULT_CHAT_ID", "");
    let discord_webhook = env_or("DISCORD_WEBHOOK_URL", "");

    // Init database
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    ensure_admin(&db, &admin_password)?;

    // One pooled HTTP client shared by every adapter; the request timeout
    // backs up the engine's own per-call deadline.
    let client = reqwest::Client::builder().timeout(adapter_timeout).build()?;

    let adapters: Vec<Arc<dyn PlatformAdapter>> = vec![
        Arc::new(TelegramAdapter::new(
            client.clone(),
            telegram_token,
            telegram_chat_id,
        )),
        Arc::new(DiscordAdapter::new(client, discord_webhook)),
    ];
    let registry = Arc::new(PlatformRegistry::new(adapters)?);

    for platform in [Platform::Telegram, Platform::Discord] {
        if !registry.is_available(platform) {
            warn!(platform = %platform, "platform not configured; sends to it will fail");
        }
    }

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        engine: DispatchEngine::new(db.clone(), registry, adapter_timeout),
        queries: MessageQueryService::new(db.clone()),
        metrics: MetricsService::new(db.clone()),
        db,
        jwt_secret,
        default_daily_limit,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let user_routes = Router::new()
        .route("/messages", post(messages::send_message))
        .route("/messages", get(messages::list_messages))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state.clone());

    let admin_routes = Router::new()
        .route("/admin/messages", get(admin::list_all_messages))
        .route("/admin/metrics", get(admin::user_metrics))
        .route("/admin/users/{user_id}/limit", put(admin::update_user_limit))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Courier listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

/// Seed the admin account on first start so limits can be managed before
/// any user exists.
fn ensure_admin(db: &Database, password: &str) -> anyhow::Result<()> {
    if db.get_user_by_username("admin")?.is_some() {
        return Ok(());
    }

    db.create_user(&UserRow {
        id: Uuid::new_v4().to_string(),
        username: "admin".to_string(),
        password: auth::hash_password(password)?,
        role: "admin".to_string(),
        daily_limit: 1000,
        created_at: format_ts(Utc::now()),
    })?;

    info!("Admin account created (username: admin); change the default password");
    Ok(())
}
