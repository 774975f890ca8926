//! 社交客户端门面
//!
//! 把关系、帖子、评论与转移服务装配到同一个 [`SocialContext`] 上。
//! 远程接口可以是 HTTP 实现，也可以是进程内的 [`MemorySession`]。

use crate::social::db::create_sqlite_pool_with_migration;
use crate::social::memory::MemorySession;
use crate::social::post::{
    CommentService, EmptyPostListener, PostApi, PostListener, PostRemote, PostService,
};
use crate::social::relation::{
    EmptyRelationListener, RelationApi, RelationList, RelationListener, RelationRemote,
    RelationService, RelationSyncer, RequestDirection,
};
use crate::social::session::{Credentials, SocialContext};
use crate::social::transfer::{TransferApi, TransferRemote, TransferService};
use crate::social::UserId;
use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 关系缓存使用的本地 SQLite 数据库 URL，`None` 表示不启用本地缓存
    ///
    /// 例如：`sqlite://petsocial.db?mode=rwc`
    pub cache_db_url: Option<String>,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    /// 列表接口每页条目数
    pub page_size: u32,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            cache_db_url: Some("sqlite://petsocial.db?mode=rwc".to_string()),
            request_timeout_secs: 15,
            page_size: 50,
        }
    }
}

/// 三个远程接口的集合
#[derive(Clone)]
pub struct Remotes {
    pub relation: Arc<dyn RelationRemote>,
    pub post: Arc<dyn PostRemote>,
    pub transfer: Arc<dyn TransferRemote>,
}

impl Remotes {
    /// 同一个内存会话同时充当三个远程接口
    pub fn memory(session: MemorySession) -> Self {
        let session = Arc::new(session);
        Self {
            relation: session.clone(),
            post: session.clone(),
            transfer: session,
        }
    }
}

/// 社交客户端
pub struct SocialClient {
    config: ClientConfig,
    ctx: SocialContext,
    remotes: Remotes,
    relation_listener: Arc<dyn RelationListener>,
    post_listener: Arc<dyn PostListener>,
    // 登录后创建，登出时清空
    db: Option<Pool<Sqlite>>,
    relation_syncer: Option<Arc<RelationSyncer>>,
}

impl SocialClient {
    /// 使用 HTTP 远程接口创建客户端
    ///
    /// 凭证由外部认证模块提供，token 通过 default_headers 自动添加
    pub fn connect(config: ClientConfig, credentials: &Credentials) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!(
                        "Bearer {}",
                        credentials.access_token
                    ))
                    .context("无效的 token")?,
                );
                headers
            })
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("创建 HTTP 客户端失败")?;

        let base = config.api_base_url.trim_end_matches('/').to_string();
        let remotes = Remotes {
            relation: Arc::new(
                RelationApi::new(http_client.clone(), base.clone()).with_page_size(config.page_size),
            ),
            post: Arc::new(PostApi::new(http_client.clone(), base.clone())),
            transfer: Arc::new(TransferApi::new(http_client, base)),
        };
        Ok(Self::with_remotes(config, remotes))
    }

    pub fn with_remotes(config: ClientConfig, remotes: Remotes) -> Self {
        Self {
            config,
            ctx: SocialContext::new(),
            remotes,
            relation_listener: Arc::new(EmptyRelationListener),
            post_listener: Arc::new(EmptyPostListener),
            db: None,
            relation_syncer: None,
        }
    }

    /// 基于内存后端的客户端，不启用本地 SQLite 缓存
    pub fn in_memory(session: MemorySession) -> Self {
        let mut config = ClientConfig::new("memory://");
        config.cache_db_url = None;
        Self::with_remotes(config, Remotes::memory(session))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn context(&self) -> &SocialContext {
        &self.ctx
    }

    /// 注册关系监听器
    pub fn set_relation_listener(&mut self, listener: Arc<dyn RelationListener>) {
        self.relation_listener = listener;

        // 若同步器已存在，则用新的监听器重建，共用同一个连接池
        if let (Some(db), Some(old)) = (self.db.clone(), self.relation_syncer.as_ref()) {
            let syncer = RelationSyncer::with_db(
                old.user_id(),
                self.remotes.relation.clone(),
                self.relation_listener.clone(),
                db,
            );
            self.relation_syncer = Some(Arc::new(syncer));
        }
    }

    /// 注册帖子监听器
    pub fn set_post_listener(&mut self, listener: Arc<dyn PostListener>) {
        self.post_listener = listener;
    }

    pub fn relations(&self) -> RelationService {
        RelationService::with_listener(
            self.remotes.relation.clone(),
            self.ctx.clone(),
            self.relation_listener.clone(),
        )
    }

    pub fn posts(&self) -> PostService {
        PostService::with_listener(
            self.remotes.post.clone(),
            self.ctx.clone(),
            self.post_listener.clone(),
        )
    }

    pub fn comments(&self) -> CommentService {
        CommentService::with_listener(
            self.remotes.post.clone(),
            self.ctx.clone(),
            self.post_listener.clone(),
        )
    }

    pub fn transfers(&self) -> TransferService {
        TransferService::new(self.remotes.transfer.clone(), self.ctx.clone())
    }

    pub fn relation_syncer(&self) -> Option<Arc<RelationSyncer>> {
        self.relation_syncer.clone()
    }

    /// 登录：绑定 viewer，加载关系列表与待处理的转移申请，并同步本地缓存
    ///
    /// 本地缓存或列表加载失败只记录日志，不影响登录本身
    pub async fn sign_in(&mut self, viewer: UserId) -> Result<()> {
        info!("[Client] 🚀 登录，viewer: {}", viewer);
        self.ctx.sign_in(viewer);

        if let Some(db_url) = self.config.cache_db_url.clone() {
            info!("[Client] 🔗 创建关系缓存数据库连接: {}", db_url);
            self.open_relation_cache(viewer, &db_url).await;
        }

        let relations = self.relations();
        if let Err(e) = relations.load_friends().await {
            warn!("[Client] 加载好友列表失败: {}", e);
        }
        if let Err(e) = relations.load_blocked().await {
            warn!("[Client] 加载黑名单失败: {}", e);
        }
        let transfers = self.transfers();
        for direction in [RequestDirection::Received, RequestDirection::Sent] {
            if let Err(e) = relations.load_friend_requests(direction).await {
                warn!("[Client] 加载好友申请失败 ({:?}): {}", direction, e);
            }
            if let Err(e) = transfers.load_pending(direction).await {
                warn!("[Client] 加载转移申请失败 ({:?}): {}", direction, e);
            }
        }
        Ok(())
    }

    /// 打开关系缓存并做一次全量同步，失败时不启用本地缓存
    async fn open_relation_cache(&mut self, viewer: UserId, db_url: &str) {
        let db = match create_sqlite_pool_with_migration(db_url).await {
            Ok(db) => db,
            Err(e) => {
                error!("[Client] ❌ 关系缓存数据库初始化失败，本次登录不启用本地缓存: {e:#}");
                return;
            }
        };
        let syncer = Arc::new(RelationSyncer::with_db(
            viewer,
            self.remotes.relation.clone(),
            self.relation_listener.clone(),
            db.clone(),
        ));
        self.db = Some(db);
        self.relation_syncer = Some(syncer.clone());

        match syncer.sync_all().await {
            Ok(()) => info!("[Client] ✅ 关系缓存同步完成"),
            Err(e) => error!("[Client] ❌ 关系缓存同步失败: {e:#}"),
        }
    }

    /// 刷新失效的关系列表，好友或黑名单失效时同时同步本地缓存
    pub async fn refresh(&self) -> Result<()> {
        let relations = self.relations();
        let cache_stale = relations.is_stale(RelationList::Friends)
            || relations.is_stale(RelationList::Blocked);
        relations.refresh_stale().await?;
        if cache_stale {
            if let Some(syncer) = &self.relation_syncer {
                syncer.sync_all().await?;
            }
        }
        Ok(())
    }

    /// 登出：清空会话缓存和本地关系缓存
    pub async fn sign_out(&mut self) -> Result<()> {
        self.ctx.sign_out();
        if let Some(syncer) = self.relation_syncer.take() {
            syncer.clear().await?;
        }
        if let Some(db) = self.db.take() {
            db.close().await;
        }
        info!("[Client] 👋 已登出");
        Ok(())
    }
}
