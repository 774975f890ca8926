//! 关系模块数据模型

use crate::social::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 账号隐私等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    Public,
    Private,
}

/// 账号公开资料（服务器的 UserPublicResponse）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub privacy_level: PrivacyLevel,
    #[serde(default)]
    pub total_posts: u64,
    #[serde(default)]
    pub total_following: u64,
    #[serde(default)]
    pub total_followers: u64,
    pub created_at: DateTime<Utc>,
}

impl AccountProfile {
    /// 展示名（未设置时回退到用户名）
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// 当前登录用户与另一账号之间的关系事实（viewer -> other）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationshipFacts {
    #[serde(default)]
    pub is_friend: bool,
    #[serde(default)]
    pub is_following: bool,
    #[serde(default)]
    pub is_followed_by: bool,
    /// 自己拉黑了对方
    #[serde(default)]
    pub is_blocked: bool,
    /// 对方拉黑了自己
    #[serde(default)]
    pub is_blocked_by: bool,
    /// 自己发出且尚未处理的好友申请
    #[serde(default)]
    pub has_pending_request: bool,
}

impl RelationshipFacts {
    /// 无任何关系
    pub fn none() -> Self {
        Self::default()
    }

    /// 任一方向存在拉黑
    pub fn is_block_pair(&self) -> bool {
        self.is_blocked || self.is_blocked_by
    }
}

/// 由关系事实推导出的单一摘要状态（用于渲染好友按钮）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipState {
    Blocking,
    BlockedBy,
    Friends,
    RequestSent,
    Stranger,
}

/// 好友申请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// 好友申请记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: i64,
    /// 发起申请的用户
    #[serde(rename = "user")]
    pub requester: AccountProfile,
    /// 接收方 ID
    #[serde(default)]
    pub recipient_id: UserId,
    pub status: FriendRequestStatus,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

/// 好友申请列表方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestDirection {
    Received,
    Sent,
}

impl RequestDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Sent => "sent",
        }
    }
}

/// 黑名单条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub blocked_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// 社交统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocialStats {
    pub total_friends: u64,
    pub pending_requests_sent: u64,
    pub pending_requests_received: u64,
    pub total_followers: u64,
    pub total_following: u64,
    pub blocked_users: u64,
    pub mutual_friends: u64,
}

/// 依赖关系集合的列表视图，变更后需要单独失效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationList {
    Friends,
    Followers,
    Following,
    Blocked,
    ReceivedRequests,
    SentRequests,
}

/// 本地缓存的好友行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFriend {
    pub owner_user_id: UserId,
    pub friend_user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub privacy_level: PrivacyLevel,
    /// 毫秒时间戳
    pub create_time: i64,
}

impl LocalFriend {
    pub fn from_profile(owner_user_id: UserId, p: &AccountProfile) -> Self {
        Self {
            owner_user_id,
            friend_user_id: p.id,
            username: p.username.clone(),
            display_name: p.display_name.clone(),
            avatar_url: p.avatar_url.clone(),
            privacy_level: p.privacy_level,
            create_time: p.created_at.timestamp_millis(),
        }
    }
}

/// 本地缓存的黑名单行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalBlock {
    pub owner_user_id: UserId,
    pub blocked_user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub reason: Option<String>,
    /// 毫秒时间戳
    pub blocked_at: i64,
}

impl LocalBlock {
    pub fn from_blocked(owner_user_id: UserId, b: &BlockedUser) -> Self {
        Self {
            owner_user_id,
            blocked_user_id: b.id,
            username: b.username.clone(),
            display_name: b.display_name.clone(),
            avatar_url: b.avatar_url.clone(),
            reason: b.reason.clone(),
            blocked_at: b.blocked_at.timestamp_millis(),
        }
    }
}

/// 关系同步器配置
pub struct RelationSyncerConfig {
    /// 当前用户 ID
    pub user_id: UserId,
    /// 本地缓存数据库 URL（SQLite）
    pub db_url: String,
}
