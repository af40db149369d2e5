//! Shared helpers for integration tests.
//!
//! Tests that talk to PostgreSQL read `DB_HOST`, `DB_PORT`, `DB_USER`,
//! `DB_PASSWORD` and `DB_NAME`, defaulting to `postgres:postgres@localhost/test_db`.

#![allow(dead_code)]

use rolebase_postgres::{seed, DatabaseSettings, PoolConfig, PoolManager};
use std::time::Duration;
use tokio::sync::OnceCell;

static SEEDED: OnceCell<()> = OnceCell::const_new();

/// Settings from the environment with local defaults.
pub fn settings() -> DatabaseSettings {
    DatabaseSettings::from_lookup(|key| {
        std::env::var(key).ok().or_else(|| {
            match key {
                "DB_HOST" => Some("localhost"),
                "DB_USER" => Some("postgres"),
                "DB_PASSWORD" => Some("postgres"),
                "DB_NAME" => Some("test_db"),
                _ => None,
            }
            .map(str::to_string)
        })
    })
    .expect("test settings")
}

/// Connected manager with the schema applied once per test binary.
pub async fn connected() -> PoolManager {
    let manager = PoolManager::new(settings());
    manager.connect().await.expect("connect to test database");
    SEEDED
        .get_or_init(|| async {
            seed::run_seeder(&manager).await.expect("seed schema");
        })
        .await;
    manager
}

/// Connected manager with a single-connection pool.
pub async fn connected_single() -> PoolManager {
    let settings = settings();
    let config = PoolConfig {
        min_connections: 0,
        max_connections: 1,
        acquire_timeout: Duration::from_secs(2),
        ..settings.pool_config()
    };
    let manager = PoolManager::with_config(settings, config);
    manager.connect().await.expect("connect to test database");
    manager
}

/// Manager pointed at a port nothing listens on.
pub fn unreachable() -> PoolManager {
    let settings = DatabaseSettings::new("127.0.0.1", "nobody", "nothing", "missing")
        .with_port(1)
        .with_acquire_timeout(Duration::from_secs(1));
    PoolManager::new(settings)
}

/// A role name no other test uses.
pub fn unique_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &suffix[..12])
}

pub async fn role_exists(manager: &PoolManager, name: &str) -> bool {
    let pool = manager.pool().expect("pool");
    let row: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "user".roles WHERE name = $1"#)
        .bind(name)
        .fetch_one(&pool)
        .await
        .expect("count roles");
    row.0 > 0
}

pub async fn delete_roles(manager: &PoolManager, names: &[&str]) {
    let pool = manager.pool().expect("pool");
    for name in names {
        sqlx::query(r#"DELETE FROM "user".roles WHERE name = $1"#)
            .bind(*name)
            .execute(&pool)
            .await
            .expect("delete role");
    }
}
