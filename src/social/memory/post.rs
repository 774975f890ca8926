use super::{CommentRecord, Deletion, MemorySession, PostRecord, World};
use crate::social::error::{SocialError, SocialResult};
use crate::social::post::api::PostRemote;
use crate::social::post::models::{
    Comment, CommentSort, LikeState, NewComment, Post, DELETED_COMMENT_PLACEHOLDER,
    MAX_COMMENT_CHARS,
};
use crate::social::post::thread::sort_forest;
use crate::social::privacy::can_view_post;
use crate::social::{CommentId, PostId, UserId};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

impl World {
    /// 帖子不存在或对当前用户不可见时统一返回 NotFound
    fn visible_post(&self, viewer: UserId, post_id: PostId) -> SocialResult<Post> {
        let record = self
            .posts
            .get(&post_id)
            .ok_or_else(|| SocialError::NotFound(format!("帖子 {}", post_id)))?;
        let post = self.post(viewer, post_id, record)?;
        if !can_view_post(viewer, &post, &self.facts(viewer, record.author)) {
            return Err(SocialError::NotFound(format!("帖子 {}", post_id)));
        }
        Ok(post)
    }

    fn post(&self, viewer: UserId, id: PostId, record: &PostRecord) -> SocialResult<Post> {
        Ok(Post {
            id,
            author: self.profile(record.author)?,
            content: record.content.clone(),
            visibility: record.visibility,
            comments_enabled: record.comments_enabled,
            like_count: record.likes.len() as u64,
            comment_count: self.comments.values().filter(|c| c.post_id == id).count() as u64,
            view_count: 0,
            is_liked: record.likes.contains(&viewer),
            created_at: record.created_at,
        })
    }

    /// 单个节点（不含子回复）
    fn comment_node(&self, viewer: UserId, c: &CommentRecord) -> SocialResult<Comment> {
        let quoted_comment = match c.quoted_comment_id.and_then(|id| self.comments.get(&id)) {
            Some(q) => Some(Box::new(self.comment_node(viewer, q)?.quote_snapshot())),
            None => None,
        };
        Ok(Comment {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            author: self.profile(c.author)?,
            content: if c.deleted.is_some() {
                DELETED_COMMENT_PLACEHOLDER.to_string()
            } else {
                c.content.clone()
            },
            created_at: c.created_at,
            updated_at: c.updated_at,
            like_count: c.likes.len() as u64,
            is_liked: c.likes.contains(&viewer),
            is_deleted: c.deleted.is_some(),
            deleted_by: c.deleted.as_ref().map(|d| d.by),
            deleted_at: c.deleted.as_ref().map(|d| d.at),
            deletion_reason: c.deleted.as_ref().and_then(|d| d.reason.clone()),
            quoted_comment_id: c.quoted_comment_id,
            quoted_comment,
            reply_count: self
                .comments
                .values()
                .filter(|r| r.parent_id == Some(c.id))
                .count() as u64,
            replies: Vec::new(),
        })
    }

    fn comment_subtree(&self, viewer: UserId, c: &CommentRecord) -> SocialResult<Comment> {
        let mut node = self.comment_node(viewer, c)?;
        node.replies = self
            .comments
            .values()
            .filter(|r| r.parent_id == Some(c.id))
            .map(|r| self.comment_subtree(viewer, r))
            .collect::<SocialResult<_>>()?;
        Ok(node)
    }

    fn comment_record(&self, id: CommentId) -> SocialResult<&CommentRecord> {
        self.comments
            .get(&id)
            .ok_or_else(|| SocialError::NotFound(format!("评论 {}", id)))
    }

    fn set_post_like(&mut self, viewer: UserId, post_id: PostId, liked: bool) -> SocialResult<LikeState> {
        self.visible_post(viewer, post_id)?;
        let record = self
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| SocialError::NotFound(format!("帖子 {}", post_id)))?;
        toggle_set(&mut record.likes, viewer, liked);
        Ok(LikeState {
            is_liked: liked,
            like_count: record.likes.len() as u64,
        })
    }

    fn set_comment_like(
        &mut self,
        viewer: UserId,
        comment_id: CommentId,
        liked: bool,
    ) -> SocialResult<LikeState> {
        let post_id = self.comment_record(comment_id)?.post_id;
        self.visible_post(viewer, post_id)?;
        let record = self
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| SocialError::NotFound(format!("评论 {}", comment_id)))?;
        toggle_set(&mut record.likes, viewer, liked);
        Ok(LikeState {
            is_liked: liked,
            like_count: record.likes.len() as u64,
        })
    }
}

/// 点赞集合天然幂等：重复点赞或重复取消不改变计数
fn toggle_set(likes: &mut HashSet<UserId>, viewer: UserId, liked: bool) {
    if liked {
        likes.insert(viewer);
    } else {
        likes.remove(&viewer);
    }
}

#[async_trait]
impl PostRemote for MemorySession {
    async fn get_post(&self, post_id: PostId) -> SocialResult<Post> {
        self.lock().visible_post(self.viewer, post_id)
    }

    async fn set_comments_enabled(&self, post_id: PostId, enabled: bool) -> SocialResult<Post> {
        let mut w = self.lock();
        let post = w.visible_post(self.viewer, post_id)?;
        if post.author.id != self.viewer {
            return Err(SocialError::Forbidden("只有帖子作者可以修改评论设置".into()));
        }
        if let Some(record) = w.posts.get_mut(&post_id) {
            record.comments_enabled = enabled;
        }
        w.visible_post(self.viewer, post_id)
    }

    async fn like_post(&self, post_id: PostId) -> SocialResult<LikeState> {
        self.lock().set_post_like(self.viewer, post_id, true)
    }

    async fn unlike_post(&self, post_id: PostId) -> SocialResult<LikeState> {
        self.lock().set_post_like(self.viewer, post_id, false)
    }

    async fn list_comments(
        &self,
        post_id: PostId,
        sort: CommentSort,
    ) -> SocialResult<Vec<Comment>> {
        let w = self.lock();
        w.visible_post(self.viewer, post_id)?;
        let mut roots = w
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .map(|c| w.comment_subtree(self.viewer, c))
            .collect::<SocialResult<Vec<_>>>()?;
        sort_forest(&mut roots, sort);
        debug!(
            "[MemoryBackend] 帖子 {} 评论树，顶层 {} 条，排序 {}",
            post_id,
            roots.len(),
            sort.as_str()
        );
        Ok(roots)
    }

    async fn add_comment(&self, post_id: PostId, comment: &NewComment) -> SocialResult<Comment> {
        let mut w = self.lock();
        let post = w.visible_post(self.viewer, post_id)?;
        if !post.comments_enabled {
            return Err(SocialError::Forbidden("该帖子已关闭评论".into()));
        }
        let content = comment.content.trim();
        if content.is_empty() || content.chars().count() > MAX_COMMENT_CHARS {
            return Err(SocialError::Validation("评论内容长度不合法".into()));
        }
        for id in [comment.parent_id, comment.quoted_comment_id].into_iter().flatten() {
            if w.comment_record(id)?.post_id != post_id {
                return Err(SocialError::NotFound(format!("评论 {}", id)));
            }
        }

        let id = w.next_id();
        let at = w.now();
        w.comments.insert(
            id,
            CommentRecord {
                id,
                post_id,
                parent_id: comment.parent_id,
                author: self.viewer,
                content: content.to_string(),
                created_at: at,
                updated_at: at,
                likes: HashSet::new(),
                deleted: None,
                quoted_comment_id: comment.quoted_comment_id,
            },
        );
        let record = w.comment_record(id)?;
        w.comment_node(self.viewer, record)
    }

    async fn like_comment(&self, comment_id: CommentId) -> SocialResult<LikeState> {
        self.lock().set_comment_like(self.viewer, comment_id, true)
    }

    async fn unlike_comment(&self, comment_id: CommentId) -> SocialResult<LikeState> {
        self.lock().set_comment_like(self.viewer, comment_id, false)
    }

    async fn delete_comment(
        &self,
        comment_id: CommentId,
        reason: Option<&str>,
    ) -> SocialResult<Comment> {
        let mut w = self.lock();
        let (author, already_deleted) = {
            let record = w.comment_record(comment_id)?;
            (record.author, record.deleted.is_some())
        };
        if author != self.viewer {
            return Err(SocialError::Forbidden("只能删除自己的评论".into()));
        }
        if !already_deleted {
            let at = w.now();
            if let Some(record) = w.comments.get_mut(&comment_id) {
                record.deleted = Some(Deletion {
                    by: self.viewer,
                    at,
                    reason: reason.map(str::to_string),
                });
            }
        }
        let record = w.comment_record(comment_id)?;
        w.comment_subtree(self.viewer, record)
    }
}
