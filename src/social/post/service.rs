//! 帖子互动服务层
//!
//! `PostService` 维护帖子的点赞状态与计数；`CommentService` 驱动评论树引擎。
//! 每个变更只发起一次远程调用，成功后才写回缓存，失败时缓存保持原样。

use crate::social::error::{SocialError, SocialResult};
use crate::social::post::api::PostRemote;
use crate::social::post::listener::{EmptyPostListener, PostListener};
use crate::social::post::models::{
    Comment, CommentSort, LikeState, NewComment, Post, MAX_COMMENT_CHARS,
};
use crate::social::post::thread::CommentThread;
use crate::social::session::{InFlightKey, SocialContext};
use crate::social::{CommentId, PostId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 帖子互动层
pub struct PostService {
    api: Arc<dyn PostRemote>,
    ctx: SocialContext,
    listener: Arc<dyn PostListener>,
}

impl PostService {
    pub fn new(api: Arc<dyn PostRemote>, ctx: SocialContext) -> Self {
        Self::with_listener(api, ctx, Arc::new(EmptyPostListener))
    }

    pub fn with_listener(
        api: Arc<dyn PostRemote>,
        ctx: SocialContext,
        listener: Arc<dyn PostListener>,
    ) -> Self {
        Self { api, ctx, listener }
    }

    pub fn cached_post(&self, post_id: PostId) -> Option<Post> {
        self.ctx.read(|s| s.posts.get(&post_id).cloned())
    }

    /// 拉取帖子并写入缓存；失败时保留旧快照
    pub async fn load_post(&self, post_id: PostId) -> SocialResult<Post> {
        self.ctx.viewer()?;
        let post = self.api.get_post(post_id).await.map_err(|e| {
            if e.is_transient() {
                warn!("[PostSvc] 获取帖子 {} 失败，保留本地快照: {}", post_id, e);
            } else {
                error!("[PostSvc] 获取帖子 {} 失败: {}", post_id, e);
            }
            e
        })?;
        self.ctx.write(|s| s.posts.insert(post_id, post.clone()));
        Ok(post)
    }

    async fn post_snapshot(&self, post_id: PostId) -> SocialResult<Post> {
        match self.cached_post(post_id) {
            Some(post) => Ok(post),
            None => self.load_post(post_id).await,
        }
    }

    /// 帖子作者开关评论
    pub async fn set_comments_enabled(&self, post_id: PostId, enabled: bool) -> SocialResult<Post> {
        let viewer = self.ctx.viewer()?;
        let post = self.post_snapshot(post_id).await?;
        if post.author.id != viewer {
            return Err(SocialError::Forbidden("只有帖子作者可以修改评论设置".into()));
        }
        let updated = self.api.set_comments_enabled(post_id, enabled).await?;
        info!(
            "[PostSvc] 帖子 {} 评论开关 -> {}",
            post_id, updated.comments_enabled
        );
        self.ctx.write(|s| s.posts.insert(post_id, updated.clone()));
        self.notify_post(&updated).await;
        Ok(updated)
    }

    /// 点赞/取消点赞，以服务器返回的计数为准
    pub async fn toggle_like(&self, post_id: PostId) -> SocialResult<LikeState> {
        self.ctx.viewer()?;
        let _guard = self.ctx.begin(InFlightKey::PostLike(post_id))?;
        let post = self.post_snapshot(post_id).await?;

        let state = if post.is_liked {
            self.api.unlike_post(post_id).await?
        } else {
            self.api.like_post(post_id).await?
        };
        debug!(
            "[PostSvc] 帖子 {} 点赞状态: {} -> {}, 计数: {}",
            post_id, post.is_liked, state.is_liked, state.like_count
        );

        let updated = self.ctx.write(|s| {
            s.posts.get_mut(&post_id).map(|p| {
                p.is_liked = state.is_liked;
                p.like_count = state.like_count;
                p.clone()
            })
        });
        if let Some(post) = updated {
            self.notify_post(&post).await;
        }
        Ok(state)
    }

    async fn notify_post(&self, post: &Post) {
        if let Ok(json) = serde_json::to_string(post) {
            self.listener.on_post_changed(json).await;
        }
    }
}

/// 评论树引擎
pub struct CommentService {
    api: Arc<dyn PostRemote>,
    ctx: SocialContext,
    listener: Arc<dyn PostListener>,
}

impl CommentService {
    pub fn new(api: Arc<dyn PostRemote>, ctx: SocialContext) -> Self {
        Self::with_listener(api, ctx, Arc::new(EmptyPostListener))
    }

    pub fn with_listener(
        api: Arc<dyn PostRemote>,
        ctx: SocialContext,
        listener: Arc<dyn PostListener>,
    ) -> Self {
        Self { api, ctx, listener }
    }

    pub fn thread(&self, post_id: PostId) -> Option<CommentThread> {
        self.ctx.read(|s| s.threads.get(&post_id).cloned())
    }

    /// 全量加载评论树，替换本地树；失败时保留旧树
    pub async fn load_thread(&self, post_id: PostId, sort: CommentSort) -> SocialResult<CommentThread> {
        self.ctx.viewer()?;
        info!(
            "[CommentTree] 🔄 加载评论树，帖子: {}, 排序: {}",
            post_id,
            sort.as_str()
        );
        let roots = self.api.list_comments(post_id, sort).await.map_err(|e| {
            error!("[CommentTree] 加载评论树失败，保留本地快照: {}", e);
            e
        })?;
        let thread = CommentThread::load(post_id, sort, roots);
        debug!("[CommentTree] 评论树节点数: {}", thread.len());
        self.ctx
            .write(|s| s.threads.insert(post_id, thread.clone()));
        self.notify_thread(&thread).await;
        Ok(thread)
    }

    /// 发表评论或回复
    pub async fn add_comment(
        &self,
        post_id: PostId,
        content: &str,
        parent_id: Option<CommentId>,
        quoted_comment_id: Option<CommentId>,
    ) -> SocialResult<Comment> {
        self.ctx.viewer()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(SocialError::Validation("评论内容不能为空".into()));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(SocialError::Validation(format!(
                "评论内容不能超过 {} 个字符",
                MAX_COMMENT_CHARS
            )));
        }

        self.ctx.read(|s| {
            if let Some(post) = s.posts.get(&post_id) {
                if !post.comments_enabled {
                    return Err(SocialError::Forbidden("该帖子已关闭评论".into()));
                }
            }
            if let Some(thread) = s.threads.get(&post_id) {
                for (label, id) in [("回复的评论", parent_id), ("引用的评论", quoted_comment_id)] {
                    if let Some(id) = id {
                        if thread.find(id).is_none() {
                            return Err(SocialError::NotFound(format!("{} {}", label, id)));
                        }
                    }
                }
            }
            Ok(())
        })?;

        let request = NewComment {
            content: content.to_string(),
            parent_id,
            quoted_comment_id,
        };
        let created = self.api.add_comment(post_id, &request).await?;
        info!(
            "[CommentTree] 新增评论 {}，帖子: {}, 父评论: {:?}",
            created.id, post_id, created.parent_id
        );

        let thread = self.ctx.write(|s| {
            if let Some(post) = s.posts.get_mut(&post_id) {
                post.comment_count += 1;
            }
            let thread = s.threads.get_mut(&post_id)?;
            if !thread.insert(created.clone()) {
                warn!(
                    "[CommentTree] 父评论 {:?} 不在本地树中，需重新加载",
                    created.parent_id
                );
            }
            Some(thread.clone())
        });
        if let Some(thread) = thread {
            self.notify_thread(&thread).await;
        }
        Ok(created)
    }

    fn locate(&self, comment_id: CommentId) -> SocialResult<(PostId, Comment)> {
        self.ctx.read(|s| {
            let post_id = s
                .thread_of_comment(comment_id)
                .ok_or_else(|| SocialError::NotFound(format!("评论 {}", comment_id)))?;
            let node = s
                .threads
                .get(&post_id)
                .and_then(|t| t.find(comment_id))
                .cloned()
                .ok_or_else(|| SocialError::NotFound(format!("评论 {}", comment_id)))?;
            Ok((post_id, node))
        })
    }

    /// 点赞/取消点赞评论（在整片森林中按 ID 定位）
    pub async fn toggle_like(&self, comment_id: CommentId) -> SocialResult<LikeState> {
        self.ctx.viewer()?;
        let _guard = self.ctx.begin(InFlightKey::CommentLike(comment_id))?;
        let (post_id, node) = self.locate(comment_id)?;

        let state = if node.is_liked {
            self.api.unlike_comment(comment_id).await?
        } else {
            self.api.like_comment(comment_id).await?
        };
        debug!(
            "[CommentTree] 评论 {} 点赞: {} -> {}, 计数: {}",
            comment_id, node.is_liked, state.is_liked, state.like_count
        );

        let thread = self.ctx.write(|s| {
            let thread = s.threads.get_mut(&post_id)?;
            thread.apply_like(comment_id, state);
            Some(thread.clone())
        });
        if let Some(thread) = thread {
            self.notify_thread(&thread).await;
        }
        Ok(state)
    }

    /// 软删除评论，仅作者本人可操作；子回复保持原位
    pub async fn delete_comment(
        &self,
        comment_id: CommentId,
        reason: Option<String>,
    ) -> SocialResult<Comment> {
        let viewer = self.ctx.viewer()?;
        let (post_id, node) = self.locate(comment_id)?;
        if node.author.id != viewer {
            return Err(SocialError::Forbidden("只能删除自己的评论".into()));
        }
        if node.is_deleted {
            debug!("[CommentTree] 评论 {} 已删除，跳过", comment_id);
            return Ok(node);
        }
        let _guard = self.ctx.begin(InFlightKey::CommentDelete(comment_id))?;

        let removed = self
            .api
            .delete_comment(comment_id, reason.as_deref())
            .await?;
        info!("[CommentTree] 🗑️ 评论 {} 已软删除", comment_id);

        let deleted_by = removed.deleted_by.unwrap_or(viewer);
        let deleted_at = removed.deleted_at.unwrap_or_else(Utc::now);
        let reason = removed.deletion_reason.clone().or(reason);
        let result = self.ctx.write(|s| {
            let thread = s.threads.get_mut(&post_id)?;
            thread.tombstone(comment_id, deleted_by, reason, deleted_at);
            let node = thread.find(comment_id).cloned()?;
            Some((node, thread.clone()))
        });
        match result {
            Some((node, thread)) => {
                self.notify_thread(&thread).await;
                Ok(node)
            }
            None => Ok(removed),
        }
    }

    async fn notify_thread(&self, thread: &CommentThread) {
        if let Ok(json) = serde_json::to_string(thread.roots()) {
            self.listener
                .on_comments_changed(thread.post_id(), json)
                .await;
        }
    }
}
