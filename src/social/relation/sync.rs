//! 关系同步器
//!
//! 全量拉取好友列表与黑名单，与本地 SQLite 缓存做差异对齐；
//! 仅在确有新增、更新或删除时触发监听器回调。

use crate::social::db::create_sqlite_pool_with_migration;
use crate::social::relation::api::RelationRemote;
use crate::social::relation::dao::RelationDao;
use crate::social::relation::listener::{EmptyRelationListener, RelationListener};
use crate::social::relation::models::{LocalBlock, LocalFriend, RelationSyncerConfig};
use crate::social::UserId;
use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// 一次对齐的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }
}

/// 按主键对齐：返回需要写入的行与需要删除的键
fn diff<K, T>(local: Vec<T>, server: Vec<T>, key: impl Fn(&T) -> K) -> (Vec<T>, Vec<K>, SyncReport)
where
    K: std::hash::Hash + Eq + Copy,
    T: PartialEq,
{
    let local_map: HashMap<K, T> = local.into_iter().map(|t| (key(&t), t)).collect();
    let server_keys: HashSet<K> = server.iter().map(&key).collect();
    let mut report = SyncReport::default();
    let mut upserts = Vec::new();

    for row in server {
        match local_map.get(&key(&row)) {
            Some(existing) if *existing == row => {}
            Some(_) => {
                report.updated += 1;
                upserts.push(row);
            }
            None => {
                report.inserted += 1;
                upserts.push(row);
            }
        }
    }
    let deletes: Vec<K> = local_map
        .keys()
        .filter(|k| !server_keys.contains(k))
        .copied()
        .collect();
    report.deleted = deletes.len();
    (upserts, deletes, report)
}

pub struct RelationSyncer {
    user_id: UserId,
    api: Arc<dyn RelationRemote>,
    dao: RelationDao,
    listener: Arc<dyn RelationListener>,
}

impl RelationSyncer {
    /// 创建同步器（内部创建连接池并执行迁移）
    pub async fn new(config: RelationSyncerConfig, api: Arc<dyn RelationRemote>) -> Result<Self> {
        Self::with_listener(config, api, Arc::new(EmptyRelationListener)).await
    }

    pub async fn with_listener(
        config: RelationSyncerConfig,
        api: Arc<dyn RelationRemote>,
        listener: Arc<dyn RelationListener>,
    ) -> Result<Self> {
        info!(
            "[RelationSync] 创建关系同步器，用户ID: {}, SQLite数据库: {}",
            config.user_id, config.db_url
        );
        let db = create_sqlite_pool_with_migration(&config.db_url)
            .await
            .context("初始化关系缓存数据库失败")?;
        Ok(Self::with_db(config.user_id, api, listener, db))
    }

    /// 使用共享连接池
    pub fn with_db(
        user_id: UserId,
        api: Arc<dyn RelationRemote>,
        listener: Arc<dyn RelationListener>,
        db: Pool<Sqlite>,
    ) -> Self {
        Self {
            user_id,
            api,
            dao: RelationDao::new(db, user_id),
            listener,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub async fn local_friends(&self) -> Result<Vec<LocalFriend>> {
        self.dao.get_all_friends().await
    }

    pub async fn local_blocks(&self) -> Result<Vec<LocalBlock>> {
        self.dao.get_all_blocks().await
    }

    pub async fn sync_friends(&self) -> Result<SyncReport> {
        info!("[RelationSync] 🔄 开始同步好友...");
        let server: Vec<LocalFriend> = self
            .api
            .list_friends()
            .await
            .context("拉取好友列表失败")?
            .iter()
            .map(|p| LocalFriend::from_profile(self.user_id, p))
            .collect();
        let local = self.dao.get_all_friends().await?;
        debug!(
            "[RelationSync] 服务器好友数: {}, 本地好友数: {}",
            server.len(),
            local.len()
        );

        let (upserts, deletes, report) = diff(local, server, |f| f.friend_user_id);
        for f in &upserts {
            debug!("[RelationSync]   写入好友: {}", f.friend_user_id);
            self.dao.upsert_friend(f).await?;
        }
        for id in &deletes {
            info!("[RelationSync]   删除本地多余好友: {}", id);
            self.dao.delete_friend(*id).await?;
        }

        if report.changed() {
            let current = self.dao.get_all_friends().await?;
            if let Ok(json) = serde_json::to_string(&current) {
                self.listener.on_friend_list_changed(json).await;
            }
        }
        info!(
            "[RelationSync] 好友同步完成 - 新增: {}, 更新: {}, 删除: {}",
            report.inserted, report.updated, report.deleted
        );
        Ok(report)
    }

    pub async fn sync_blocks(&self) -> Result<SyncReport> {
        info!("[RelationSync] 🔄 开始同步黑名单...");
        let server: Vec<LocalBlock> = self
            .api
            .list_blocked()
            .await
            .context("拉取黑名单失败")?
            .iter()
            .map(|b| LocalBlock::from_blocked(self.user_id, b))
            .collect();
        let local = self.dao.get_all_blocks().await?;

        let (upserts, deletes, report) = diff(local, server, |b| b.blocked_user_id);
        for b in &upserts {
            self.dao.upsert_block(b).await?;
        }
        for id in &deletes {
            info!("[RelationSync]   删除本地多余黑名单: {}", id);
            self.dao.delete_block(*id).await?;
        }

        if report.changed() {
            let current = self.dao.get_all_blocks().await?;
            if let Ok(json) = serde_json::to_string(&current) {
                self.listener.on_black_list_changed(json).await;
            }
        }
        info!(
            "[RelationSync] 黑名单同步完成 - 新增: {}, 更新: {}, 删除: {}",
            report.inserted, report.updated, report.deleted
        );
        Ok(report)
    }

    pub async fn sync_all(&self) -> Result<()> {
        self.sync_friends().await?;
        self.sync_blocks().await?;
        info!("[RelationSync] ✅ 关系同步完成");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.dao.clear().await
    }
}
