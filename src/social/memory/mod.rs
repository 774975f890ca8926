//! 进程内参考后端
//!
//! 一个共享的内存世界，按登录用户分出会话句柄（[`MemoryBackend::session`]）。
//! 会话实现全部远程接口，并执行服务器侧的所有前置条件，客户端引擎因此可以
//! 离线运行并做端到端测试。时间戳来自逻辑时钟，每个事件前进一秒。

mod post;
mod relation;
mod transfer;

use crate::social::error::{SocialError, SocialResult};
use crate::social::post::models::Visibility;
use crate::social::relation::models::{
    AccountProfile, FriendRequestStatus, PrivacyLevel, RelationshipFacts,
};
use crate::social::transfer::models::{Pet, Species, TransferStatus, TransferType};
use crate::social::{CommentId, PetId, PostId, UserId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const EPOCH_SECS: i64 = 1_700_000_000;

struct UserRecord {
    username: String,
    display_name: Option<String>,
    privacy_level: PrivacyLevel,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

struct FriendRequestRecord {
    id: i64,
    from: UserId,
    to: UserId,
    status: FriendRequestStatus,
    message: Option<String>,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

struct BlockRecord {
    at: DateTime<Utc>,
    reason: Option<String>,
}

struct PostRecord {
    author: UserId,
    content: String,
    visibility: Visibility,
    comments_enabled: bool,
    created_at: DateTime<Utc>,
    likes: HashSet<UserId>,
}

struct Deletion {
    by: UserId,
    at: DateTime<Utc>,
    reason: Option<String>,
}

struct CommentRecord {
    id: CommentId,
    post_id: PostId,
    parent_id: Option<CommentId>,
    author: UserId,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    likes: HashSet<UserId>,
    deleted: Option<Deletion>,
    quoted_comment_id: Option<CommentId>,
}

struct TransferRecord {
    id: i64,
    pet_id: PetId,
    from: UserId,
    to: UserId,
    status: TransferStatus,
    transfer_type: TransferType,
    reason: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

struct HistoryRecord {
    id: i64,
    pet_id: PetId,
    from: UserId,
    to: UserId,
    transfer_type: TransferType,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

#[derive(Default)]
struct World {
    ticks: i64,
    last_id: i64,
    users: BTreeMap<UserId, UserRecord>,
    /// 无序对，按 (小, 大) 存储
    friendships: HashSet<(UserId, UserId)>,
    /// (关注者, 被关注者)
    follows: HashSet<(UserId, UserId)>,
    /// (拉黑者, 被拉黑者)
    blocks: HashMap<(UserId, UserId), BlockRecord>,
    friend_requests: BTreeMap<i64, FriendRequestRecord>,
    posts: BTreeMap<PostId, PostRecord>,
    comments: BTreeMap<CommentId, CommentRecord>,
    pets: BTreeMap<PetId, Pet>,
    transfers: BTreeMap<i64, TransferRecord>,
    history: Vec<HistoryRecord>,
}

fn pair(a: UserId, b: UserId) -> (UserId, UserId) {
    (a.min(b), a.max(b))
}

impl World {
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        DateTime::<Utc>::default() + Duration::seconds(EPOCH_SECS + self.ticks)
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user(&self, id: UserId) -> SocialResult<&UserRecord> {
        self.users
            .get(&id)
            .ok_or_else(|| SocialError::NotFound(format!("用户 {}", id)))
    }

    fn profile(&self, id: UserId) -> SocialResult<AccountProfile> {
        let user = self.user(id)?;
        Ok(AccountProfile {
            id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: None,
            is_verified: false,
            bio: user.bio.clone(),
            privacy_level: user.privacy_level,
            total_posts: self.posts.values().filter(|p| p.author == id).count() as u64,
            total_following: self.follows.iter().filter(|(a, _)| *a == id).count() as u64,
            total_followers: self.follows.iter().filter(|(_, b)| *b == id).count() as u64,
            created_at: user.created_at,
        })
    }

    fn profiles(&self, ids: impl IntoIterator<Item = UserId>) -> SocialResult<Vec<AccountProfile>> {
        ids.into_iter().map(|id| self.profile(id)).collect()
    }

    fn are_friends(&self, a: UserId, b: UserId) -> bool {
        self.friendships.contains(&pair(a, b))
    }

    fn is_block_pair(&self, a: UserId, b: UserId) -> bool {
        self.blocks.contains_key(&(a, b)) || self.blocks.contains_key(&(b, a))
    }

    fn pending_request(&self, from: UserId, to: UserId) -> Option<&FriendRequestRecord> {
        self.friend_requests
            .values()
            .find(|r| r.from == from && r.to == to && r.status == FriendRequestStatus::Pending)
    }

    fn facts(&self, viewer: UserId, other: UserId) -> RelationshipFacts {
        RelationshipFacts {
            is_friend: self.are_friends(viewer, other),
            is_following: self.follows.contains(&(viewer, other)),
            is_followed_by: self.follows.contains(&(other, viewer)),
            is_blocked: self.blocks.contains_key(&(viewer, other)),
            is_blocked_by: self.blocks.contains_key(&(other, viewer)),
            has_pending_request: self.pending_request(viewer, other).is_some(),
        }
    }

    fn befriend(&mut self, a: UserId, b: UserId) {
        self.friendships.insert(pair(a, b));
    }

    /// 拉黑：清除双方的好友、关注与待处理申请
    fn block(&mut self, blocker: UserId, blocked: UserId, reason: Option<String>) {
        let at = self.now();
        self.blocks
            .entry((blocker, blocked))
            .or_insert(BlockRecord { at, reason });
        self.friendships.remove(&pair(blocker, blocked));
        self.follows.remove(&(blocker, blocked));
        self.follows.remove(&(blocked, blocker));
        for r in self.friend_requests.values_mut() {
            let between = (r.from == blocker && r.to == blocked) || (r.from == blocked && r.to == blocker);
            if between && r.status == FriendRequestStatus::Pending {
                r.status = FriendRequestStatus::Rejected;
                r.responded_at = Some(at);
            }
        }
    }
}

/// 共享的内存世界
#[derive(Clone, Default)]
pub struct MemoryBackend {
    world: Arc<Mutex<World>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 以某个用户身份访问后端
    pub fn session(&self, viewer: UserId) -> MemorySession {
        MemorySession {
            world: self.world.clone(),
            viewer,
        }
    }

    pub fn add_user(&self, username: &str, privacy_level: PrivacyLevel) -> UserId {
        let mut w = self.lock();
        let id = w.next_id();
        let created_at = w.now();
        w.users.insert(
            id,
            UserRecord {
                username: username.to_string(),
                display_name: None,
                privacy_level,
                bio: Some(format!("{} 的主页", username)),
                created_at,
            },
        );
        debug!("[MemoryBackend] 新用户 {} ({:?}): {}", id, privacy_level, username);
        id
    }

    pub fn add_post(
        &self,
        author: UserId,
        content: &str,
        visibility: Visibility,
        comments_enabled: bool,
    ) -> PostId {
        let mut w = self.lock();
        let id = w.next_id();
        let created_at = w.now();
        w.posts.insert(
            id,
            PostRecord {
                author,
                content: content.to_string(),
                visibility,
                comments_enabled,
                created_at,
                likes: HashSet::new(),
            },
        );
        id
    }

    pub fn remove_post(&self, post_id: PostId) {
        let mut w = self.lock();
        w.posts.remove(&post_id);
        w.comments.retain(|_, c| c.post_id != post_id);
    }

    /// 直接写入评论，不经过前置条件检查
    pub fn add_comment(
        &self,
        post_id: PostId,
        author: UserId,
        content: &str,
        parent_id: Option<CommentId>,
    ) -> CommentId {
        let mut w = self.lock();
        let id = w.next_id();
        let at = w.now();
        w.comments.insert(
            id,
            CommentRecord {
                id,
                post_id,
                parent_id,
                author,
                content: content.to_string(),
                created_at: at,
                updated_at: at,
                likes: HashSet::new(),
                deleted: None,
                quoted_comment_id: None,
            },
        );
        id
    }

    pub fn add_pet(&self, owner: UserId, name: &str, species: Species) -> PetId {
        let mut w = self.lock();
        let id = w.next_id();
        w.pets.insert(
            id,
            Pet {
                id,
                user_id: owner,
                name: name.to_string(),
                species,
            },
        );
        id
    }

    pub fn make_friends(&self, a: UserId, b: UserId) {
        self.lock().befriend(a, b);
    }

    pub fn add_block(&self, blocker: UserId, blocked: UserId, reason: Option<&str>) {
        self.lock().block(blocker, blocked, reason.map(str::to_string));
    }
}

/// 某个用户的会话句柄，实现全部远程接口
#[derive(Clone)]
pub struct MemorySession {
    world: Arc<Mutex<World>>,
    viewer: UserId,
}

impl MemorySession {
    pub fn viewer(&self) -> UserId {
        self.viewer
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|e| e.into_inner())
    }
}
