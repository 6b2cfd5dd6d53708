//! Orbitwell Gateway: companion chat, reminders, and journal over HTTP.
//! Binds to `host:port` from `CompanionConfig` (default 0.0.0.0:5000).

mod handlers;
mod journal_sqlite;
mod reminders;
mod stats;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use journal_sqlite::JournalSqlite;
use orbitwell_core::{CompanionConfig, ConversationOrchestrator, KnowledgeBase, SessionStore};
use reminders::ReminderBoard;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CompanionConfig>,
    pub(crate) orchestrator: Arc<ConversationOrchestrator>,
    pub(crate) knowledge: Arc<KnowledgeBase>,
    pub(crate) reminders: Arc<ReminderBoard>,
    pub(crate) journal: JournalSqlite,
}

impl AppState {
    fn from_config(config: CompanionConfig) -> Result<Self, String> {
        let knowledge = KnowledgeBase::builtin().map_err(|e| format!("knowledge base: {}", e))?;
        let orchestrator = ConversationOrchestrator::from_config(&config, &knowledge)
            .map_err(|e| format!("category table: {}", e))?;
        let journal = JournalSqlite::new(config.journal_db_path())
            .map_err(|e| format!("journal database {}: {}", config.journal_db_path().display(), e))?;
        Ok(Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            knowledge: Arc::new(knowledge),
            reminders: Arc::new(ReminderBoard::new()),
            journal,
        })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[orbitwell-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CompanionConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("[ORBITWELL] Config load failed: {}", e);
            std::process::exit(1);
        }
    };
    let state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("[ORBITWELL] Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ttl) = state.config.session_idle_ttl() {
        spawn_session_sweeper(Arc::clone(&state.orchestrator), ttl);
    }

    let addr = state.config.bind_addr();
    tracing::info!(
        "[ORBITWELL] {} v{} listening on {} ({} categories, journal at {})",
        state.config.app_name,
        orbitwell_core::version(),
        addr,
        state.orchestrator.table().len(),
        state.journal.path().display()
    );

    let app = build_app(state);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("[ORBITWELL] Bind {} failed: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("[ORBITWELL] Server error: {}", e);
        std::process::exit(1);
    }
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/ask", post(handlers::ask::ask))
        .route("/api/knowledge-base", get(handlers::ask::knowledge_base))
        .route(
            "/api/reminders",
            get(handlers::reminders::list).post(handlers::reminders::create),
        )
        .route(
            "/api/reminders/:id",
            put(handlers::reminders::update).delete(handlers::reminders::delete),
        )
        .route("/reminder-stats", get(handlers::reminders::reminder_stats))
        .route(
            "/api/journal",
            get(handlers::journal::list).post(handlers::journal::create),
        )
        .route("/api/journal/delete/:id", delete(handlers::journal::delete))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
        .layer(cors)
}

/// Periodic idle-session sweep; runs only when an idle TTL is configured.
fn spawn_session_sweeper(orchestrator: Arc<ConversationOrchestrator>, ttl: Duration) {
    let period = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = orchestrator.sessions().evict_idle();
            if evicted > 0 {
                tracing::info!("[ORBITWELL SESSIONS] Swept {} idle session(s)", evicted);
            }
        }
    });
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        "[ORBITWELL HTTP] {} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

async fn health() -> &'static str {
    "OK"
}
