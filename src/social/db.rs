//! SQLite 数据库工具：统一创建连接池并执行 sqlx 迁移
//!
//! 迁移 SQL 位于 crate 根目录的 `migrations/`，由 `sqlx::migrate!()` 嵌入。

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tracing::info;

/// 创建 SQLite 连接池并执行所有未执行的迁移
pub async fn create_sqlite_pool_with_migration(db_url: &str) -> Result<Pool<Sqlite>> {
    // 内存库每个连接各自独立，只能使用单个常驻连接
    let in_memory = db_url.contains(":memory:");
    let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
    if in_memory {
        options = options.idle_timeout(None).max_lifetime(None);
    }
    let pool = options
        .connect(db_url)
        .await
        .with_context(|| format!("连接SQLite数据库失败: {}", db_url))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("执行数据库迁移失败")?;
    info!("[DB] SQLite 就绪: {}", db_url);

    Ok(pool)
}
