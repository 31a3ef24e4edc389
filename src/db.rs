use crate::config::DatabaseConfig;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::user::UserRepository;
use rocket::fairing::AdHoc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Store handle shared by every request.
pub type SharedUserRepository = Arc<dyn UserRepository>;

pub(crate) async fn init_pool(db_config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout))
        .idle_timeout(Duration::from_secs(30))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_config.url)
        .await
}

async fn prepare_pool(db_config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = init_pool(db_config).await?;
    if db_config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    Ok(pool)
}

pub fn stage_db(db_config: DatabaseConfig) -> AdHoc {
    AdHoc::try_on_ignite("Postgres (sqlx)", |rocket| async move {
        match prepare_pool(&db_config).await {
            Ok(pool) => {
                tracing::info!("Database pool initialized successfully");
                let repository: SharedUserRepository = Arc::new(PostgresRepository::new(pool));
                Ok(rocket.manage(repository))
            }
            Err(e) => {
                tracing::error!("Failed to initialize database pool: {}", e);
                Err(rocket)
            }
        }
    })
}
