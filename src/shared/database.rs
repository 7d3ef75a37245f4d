use crate::shared::config::ProjectMindConfig;
use crate::shared::models::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Connects the pool, runs migrations, and builds the shared HTTP client
/// used for AI provider calls.
pub async fn init_database(
    database_url: &str,
    config: ProjectMindConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    info!("Initializing database connection");

    let db = Arc::new(sqlx::MySqlPool::connect(database_url).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        e
    })?);

    info!("Database connected, running migrations");

    if std::env::var("SKIP_MIGRATIONS").is_ok() {
        info!("Skipping migrations (SKIP_MIGRATIONS set)");
    } else {
        match sqlx::migrate!("./db/migrations").run(&*db).await {
            Ok(_) => info!("Database migrations completed"),
            Err(e) => {
                error!("Migration failed: {}", e);
                if !(e.to_string().contains("applied before")
                    || e.to_string().contains("Dirty database"))
                {
                    return Err(Box::new(e));
                }
                warn!("Migration already applied or dirty state, checking schema...");

                let table_check = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM information_schema.tables
                     WHERE table_schema = DATABASE() AND table_name = 'projects'",
                )
                .fetch_one(&*db)
                .await
                .unwrap_or(0);

                if table_check == 0 {
                    error!("Database tables do not exist and migrations failed");
                    return Err(Box::new(e));
                }
                info!("Tables exist, continuing despite migration error");
            }
        }
    }

    let http = build_http_client(config.request_timeout_secs)?;

    Ok(AppState {
        db,
        config: Arc::new(config),
        http,
    })
}

pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
