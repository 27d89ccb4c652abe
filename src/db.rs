use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError::DatabaseError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("delivery_db.max_connections", config.max_connections as f64);

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(?elapsed, "Database migrations completed"),
        Err(e) => error!(?elapsed, error = %e, "Database migrations failed"),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!(?elapsed, "Database connection check successful");
            gauge!("delivery_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(?elapsed, error = %e, "Database connection check failed");
            counter!("delivery_db.connection_failures", 1);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DbConfig {
        DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn migrations_apply_on_fresh_database() {
        let pool = establish_connection_with_config(&memory_config())
            .await
            .expect("sqlite pool");
        run_migrations(&pool).await.expect("migrations");
        assert!(check_connection(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn cart_uniqueness_is_enforced_by_storage() {
        use crate::entities::{cart, cart_item, dish, store};
        use assert_matches::assert_matches;
        use chrono::Utc;
        use rust_decimal_macros::dec;
        use sea_orm::{ActiveModelTrait, Set};
        use uuid::Uuid;

        let pool = establish_connection_with_config(&memory_config())
            .await
            .expect("sqlite pool");
        run_migrations(&pool).await.expect("migrations");
        let now = Utc::now();

        let shop = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Bun cha".to_string()),
            owner_id: Set(Uuid::new_v4()),
            status: Set(store::StoreStatus::Approved),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&pool)
        .await
        .expect("store");
        let noodles = dish::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(shop.id),
            name: Set("Bun cha Ha Noi".to_string()),
            price: Set(dec!(35000)),
            stock_status: Set(dish::StockStatus::Available),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&pool)
        .await
        .expect("dish");

        let user_id = Uuid::new_v4();
        let new_cart = || cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            store_id: Set(shop.id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let first = new_cart().insert(&pool).await.expect("first cart");
        let err = new_cart()
            .insert(&pool)
            .await
            .map_err(|e| ServiceError::from_insert(e, "duplicate cart"))
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(ref m) if m == "duplicate cart");
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        let new_line = || cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(first.id),
            dish_id: Set(noodles.id),
            dish_name: Set(noodles.name.clone()),
            price: Set(noodles.price),
            quantity: Set(1),
            note: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        new_line().insert(&pool).await.expect("first line");
        let err = new_line()
            .insert(&pool)
            .await
            .map_err(|e| ServiceError::from_insert(e, "duplicate line"))
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
    }
}
