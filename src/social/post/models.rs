//! 帖子与评论数据模型

use crate::social::relation::models::AccountProfile;
use crate::social::{CommentId, PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 软删除后评论内容被替换成的占位文本
pub const DELETED_COMMENT_PLACEHOLDER: &str = "[此评论已删除]";

/// 评论内容最大字符数
pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: AccountProfile,
    pub content: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_true")]
    pub comments_enabled: bool,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub view_count: u64,
    /// 当前用户是否已点赞
    #[serde(default)]
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// 点赞/取消点赞后服务器返回的计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub like_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    /// None 表示顶层评论
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    #[serde(rename = "user")]
    pub author: AccountProfile,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_by: Option<UserId>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deletion_reason: Option<String>,
    /// 引用的评论 ID，只是引用，不构成所属关系
    #[serde(default)]
    pub quoted_comment_id: Option<CommentId>,
    /// 引用评论的快照（不含其回复）
    #[serde(default)]
    pub quoted_comment: Option<Box<Comment>>,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// 用于引用展示的浅拷贝（去掉子回复与嵌套引用）
    pub fn quote_snapshot(&self) -> Comment {
        Comment {
            replies: Vec::new(),
            quoted_comment: None,
            ..self.clone()
        }
    }

    /// 直接回复数（优先使用已加载的子节点数量）
    pub fn direct_replies(&self) -> u64 {
        self.reply_count.max(self.replies.len() as u64)
    }
}

/// 评论排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSort {
    #[default]
    Newest,
    Oldest,
    MostLikes,
    MostReplies,
    RecentActivity,
}

impl CommentSort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::MostLikes => "most_likes",
            Self::MostReplies => "most_replies",
            Self::RecentActivity => "recent_activity",
        }
    }

    /// 新的顶层评论是否应插入到最前面
    pub fn prepends_new(self) -> bool {
        matches!(self, Self::Newest | Self::RecentActivity)
    }
}

impl std::str::FromStr for CommentSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "most_likes" => Ok(Self::MostLikes),
            "most_replies" => Ok(Self::MostReplies),
            "recent_activity" => Ok(Self::RecentActivity),
            other => Err(format!("未知的排序方式: {}", other)),
        }
    }
}

/// 新增评论的请求体
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_comment_id: Option<CommentId>,
}
