//! 关系数据访问层（DAO）
//!
//! 好友列表与黑名单的本地 SQLite 缓存，表结构由 sqlx migration 管理。

use crate::social::relation::models::{LocalBlock, LocalFriend, PrivacyLevel};
use crate::social::UserId;
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

pub struct RelationDao {
    db: Pool<Sqlite>,
    user_id: UserId,
}

fn privacy_to_str(level: PrivacyLevel) -> &'static str {
    match level {
        PrivacyLevel::Public => "public",
        PrivacyLevel::Private => "private",
    }
}

fn privacy_from_str(s: &str) -> PrivacyLevel {
    match s {
        "private" => PrivacyLevel::Private,
        _ => PrivacyLevel::Public,
    }
}

fn friend_from_row(m: SqliteRow) -> LocalFriend {
    let privacy: String = m.get("privacy_level");
    LocalFriend {
        owner_user_id: m.get("owner_user_id"),
        friend_user_id: m.get("friend_user_id"),
        username: m.get("username"),
        display_name: m.get("display_name"),
        avatar_url: m.get("avatar_url"),
        privacy_level: privacy_from_str(&privacy),
        create_time: m.get("create_time"),
    }
}

fn block_from_row(m: SqliteRow) -> LocalBlock {
    LocalBlock {
        owner_user_id: m.get("owner_user_id"),
        blocked_user_id: m.get("blocked_user_id"),
        username: m.get("username"),
        display_name: m.get("display_name"),
        avatar_url: m.get("avatar_url"),
        reason: m.get("reason"),
        blocked_at: m.get("blocked_at"),
    }
}

impl RelationDao {
    pub fn new(db: Pool<Sqlite>, user_id: UserId) -> Self {
        Self { db, user_id }
    }

    pub async fn get_all_friends(&self) -> Result<Vec<LocalFriend>> {
        let rows = sqlx::query(
            r#"
            SELECT
                owner_user_id,
                friend_user_id,
                username,
                display_name,
                avatar_url,
                privacy_level,
                create_time
            FROM local_friends
            WHERE owner_user_id = ?
            ORDER BY friend_user_id
            "#,
        )
        .bind(self.user_id)
        .fetch_all(&self.db)
        .await
        .context("查询好友列表失败")?;

        let friends: Vec<LocalFriend> = rows.into_iter().map(friend_from_row).collect();
        debug!("[RelationDAO] 获取本地好友列表，共 {} 个好友", friends.len());
        Ok(friends)
    }

    pub async fn upsert_friend(&self, f: &LocalFriend) -> Result<()> {
        let sql = r#"
            INSERT INTO local_friends (
                owner_user_id,
                friend_user_id,
                username,
                display_name,
                avatar_url,
                privacy_level,
                create_time
            ) VALUES (?,?,?,?,?,?,?)
            ON CONFLICT(owner_user_id, friend_user_id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                privacy_level = excluded.privacy_level,
                create_time = excluded.create_time
        "#;

        sqlx::query(sql)
            .bind(f.owner_user_id)
            .bind(f.friend_user_id)
            .bind(&f.username)
            .bind(&f.display_name)
            .bind(&f.avatar_url)
            .bind(privacy_to_str(f.privacy_level))
            .bind(f.create_time)
            .execute(&self.db)
            .await
            .context("插入或更新好友失败")?;
        Ok(())
    }

    pub async fn delete_friend(&self, friend_user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM local_friends WHERE owner_user_id = ? AND friend_user_id = ?")
            .bind(self.user_id)
            .bind(friend_user_id)
            .execute(&self.db)
            .await
            .context("删除好友失败")?;
        Ok(())
    }

    pub async fn get_all_blocks(&self) -> Result<Vec<LocalBlock>> {
        let rows = sqlx::query(
            r#"
            SELECT
                owner_user_id,
                blocked_user_id,
                username,
                display_name,
                avatar_url,
                reason,
                blocked_at
            FROM local_blocks
            WHERE owner_user_id = ?
            ORDER BY blocked_user_id
            "#,
        )
        .bind(self.user_id)
        .fetch_all(&self.db)
        .await
        .context("查询黑名单失败")?;

        let blocks: Vec<LocalBlock> = rows.into_iter().map(block_from_row).collect();
        debug!("[RelationDAO] 获取本地黑名单，共 {} 条", blocks.len());
        Ok(blocks)
    }

    pub async fn upsert_block(&self, b: &LocalBlock) -> Result<()> {
        let sql = r#"
            INSERT INTO local_blocks (
                owner_user_id,
                blocked_user_id,
                username,
                display_name,
                avatar_url,
                reason,
                blocked_at
            ) VALUES (?,?,?,?,?,?,?)
            ON CONFLICT(owner_user_id, blocked_user_id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                reason = excluded.reason,
                blocked_at = excluded.blocked_at
        "#;

        sqlx::query(sql)
            .bind(b.owner_user_id)
            .bind(b.blocked_user_id)
            .bind(&b.username)
            .bind(&b.display_name)
            .bind(&b.avatar_url)
            .bind(&b.reason)
            .bind(b.blocked_at)
            .execute(&self.db)
            .await
            .context("插入或更新黑名单失败")?;
        Ok(())
    }

    pub async fn delete_block(&self, blocked_user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM local_blocks WHERE owner_user_id = ? AND blocked_user_id = ?")
            .bind(self.user_id)
            .bind(blocked_user_id)
            .execute(&self.db)
            .await
            .context("删除黑名单失败")?;
        Ok(())
    }

    /// 登出时清空当前用户的缓存
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM local_friends WHERE owner_user_id = ?")
            .bind(self.user_id)
            .execute(&self.db)
            .await
            .context("清空好友缓存失败")?;
        sqlx::query("DELETE FROM local_blocks WHERE owner_user_id = ?")
            .bind(self.user_id)
            .execute(&self.db)
            .await
            .context("清空黑名单缓存失败")?;
        Ok(())
    }
}
