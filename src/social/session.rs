//! 会话上下文
//!
//! 登录时创建并填充、登出时清空的共享缓存。各服务持有同一个 [`SocialContext`]
//! 的克隆，读写都通过闭包完成，锁不会跨越 await。

use crate::social::error::{SocialError, SocialResult};
use crate::social::post::models::Post;
use crate::social::post::thread::CommentThread;
use crate::social::relation::store::RelationStore;
use crate::social::transfer::models::TransferBook;
use crate::social::{CommentId, PostId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// 外部认证模块签发的凭证，对本模块而言是不透明的
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// 会话内的全部缓存
#[derive(Debug, Default)]
pub struct SessionState {
    pub viewer: Option<UserId>,
    pub relations: RelationStore,
    pub posts: HashMap<PostId, Post>,
    pub threads: HashMap<PostId, CommentThread>,
    pub transfers: TransferBook,
}

impl SessionState {
    /// 在所有已加载的评论树中查找评论所属的帖子
    pub fn thread_of_comment(&self, comment_id: CommentId) -> Option<PostId> {
        self.threads
            .iter()
            .find(|(_, thread)| thread.find(comment_id).is_some())
            .map(|(post_id, _)| *post_id)
    }
}

/// 正在进行中的变更操作的键，同一个键同时只允许一个请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InFlightKey {
    PostLike(PostId),
    CommentLike(CommentId),
    CommentDelete(CommentId),
    Relationship(UserId),
    FriendRequest(i64),
    Transfer(i64),
}

/// 在途操作守卫，drop 时释放
#[derive(Debug)]
pub struct InFlightGuard {
    key: InFlightKey,
    set: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SocialContext {
    state: Arc<RwLock<SessionState>>,
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl SocialContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登录：清空旧缓存并绑定新的 viewer
    pub fn sign_in(&self, viewer: UserId) {
        info!("[Session] 登录，viewer: {}", viewer);
        self.write(|s| {
            *s = SessionState::default();
            s.viewer = Some(viewer);
        });
    }

    /// 登出：清空所有缓存
    pub fn sign_out(&self) {
        info!("[Session] 登出，清空会话缓存");
        self.write(|s| *s = SessionState::default());
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn viewer(&self) -> SocialResult<UserId> {
        self.read(|s| s.viewer)
            .ok_or_else(|| SocialError::Forbidden("未登录".into()))
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// 登记在途操作；同一键已有请求在途时直接返回 Conflict，不发起远程调用
    pub fn begin(&self, key: InFlightKey) -> SocialResult<InFlightGuard> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key) {
            debug!("[Session] 操作进行中，忽略重复请求: {:?}", key);
            return Err(SocialError::Conflict("操作进行中，请稍候".into()));
        }
        Ok(InFlightGuard {
            key,
            set: self.in_flight.clone(),
        })
    }

    pub fn is_in_flight(&self, key: InFlightKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_requires_sign_in() {
        let ctx = SocialContext::new();
        assert!(matches!(ctx.viewer(), Err(SocialError::Forbidden(_))));
        ctx.sign_in(7);
        assert_eq!(ctx.viewer(), Ok(7));
        ctx.sign_out();
        assert!(ctx.viewer().is_err());
    }

    #[test]
    fn in_flight_guard_rejects_duplicates_until_dropped() {
        let ctx = SocialContext::new();
        let guard = ctx.begin(InFlightKey::PostLike(1)).unwrap();
        assert!(ctx.is_in_flight(InFlightKey::PostLike(1)));
        assert!(matches!(
            ctx.begin(InFlightKey::PostLike(1)),
            Err(SocialError::Conflict(_))
        ));
        // 不同实体互不影响
        let _other = ctx.begin(InFlightKey::PostLike(2)).unwrap();
        drop(guard);
        assert!(ctx.begin(InFlightKey::PostLike(1)).is_ok());
    }
}
