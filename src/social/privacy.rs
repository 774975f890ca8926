//! 隐私可见性解析
//!
//! 纯函数，关系快照每次变化后重新求值：
//! - 公开账号对所有人完整可见；
//! - 私密账号只对本人和好友完整可见，其他人只能看到身份字段与计数；
//! - 对方拉黑了自己时资料整体不可达（与不存在无法区分）。

use crate::social::error::{SocialError, SocialResult};
use crate::social::post::models::{Post, Visibility};
use crate::social::relation::models::{AccountProfile, PrivacyLevel, RelationshipFacts};
use crate::social::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 始终可见的身份字段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileIdentity {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

/// 始终可见的聚合计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileCounters {
    pub posts: u64,
    pub following: u64,
    pub followers: u64,
}

/// 详情区域
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileDetails {
    Full {
        bio: Option<String>,
        created_at: DateTime<Utc>,
    },
    /// 渲染为锁定占位
    Locked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub identity: ProfileIdentity,
    pub counters: ProfileCounters,
    pub details: ProfileDetails,
}

impl ProfileView {
    pub fn is_full(&self) -> bool {
        matches!(self.details, ProfileDetails::Full { .. })
    }
}

/// 是否可查看完整资料
pub fn can_view_full_profile(
    viewer: UserId,
    profile: &AccountProfile,
    relationship: &RelationshipFacts,
) -> bool {
    if viewer == profile.id {
        return true;
    }
    if relationship.is_block_pair() {
        return false;
    }
    match profile.privacy_level {
        PrivacyLevel::Public => true,
        PrivacyLevel::Private => relationship.is_friend,
    }
}

/// 组装资料视图；被对方拉黑时返回 NotFound，不暴露拉黑状态
pub fn profile_view(
    viewer: UserId,
    profile: &AccountProfile,
    relationship: &RelationshipFacts,
) -> SocialResult<ProfileView> {
    if viewer != profile.id && relationship.is_blocked_by {
        return Err(SocialError::NotFound(format!("用户 {}", profile.id)));
    }
    let details = if can_view_full_profile(viewer, profile, relationship) {
        ProfileDetails::Full {
            bio: profile.bio.clone(),
            created_at: profile.created_at,
        }
    } else {
        ProfileDetails::Locked
    };
    Ok(ProfileView {
        identity: ProfileIdentity {
            id: profile.id,
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            is_verified: profile.is_verified,
        },
        counters: ProfileCounters {
            posts: profile.total_posts,
            following: profile.total_following,
            followers: profile.total_followers,
        },
        details,
    })
}

/// 帖子可见性：公开对非拉黑关系的所有人可见，好友可见仅作者与好友，私密仅作者
pub fn can_view_post(viewer: UserId, post: &Post, relationship: &RelationshipFacts) -> bool {
    if viewer == post.author.id {
        return true;
    }
    if relationship.is_block_pair() {
        return false;
    }
    match post.visibility {
        Visibility::Public => true,
        Visibility::Friends => relationship.is_friend,
        Visibility::Private => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::post::thread::tests::profile;

    fn private_profile(id: UserId) -> AccountProfile {
        AccountProfile {
            privacy_level: PrivacyLevel::Private,
            bio: Some("secret".into()),
            total_posts: 3,
            ..profile(id)
        }
    }

    #[test]
    fn public_profile_is_fully_visible() {
        let p = profile(2);
        assert!(can_view_full_profile(1, &p, &RelationshipFacts::none()));
        assert!(profile_view(1, &p, &RelationshipFacts::none())
            .unwrap()
            .is_full());
    }

    #[test]
    fn private_profile_requires_friendship_or_ownership() {
        let p = private_profile(2);
        let stranger = RelationshipFacts::none();
        assert!(!can_view_full_profile(1, &p, &stranger));
        let view = profile_view(1, &p, &stranger).unwrap();
        assert_eq!(view.details, ProfileDetails::Locked);
        assert_eq!(view.identity.username, "user2");
        assert_eq!(view.counters.posts, 3);

        let following_only = RelationshipFacts {
            is_following: true,
            ..Default::default()
        };
        assert!(!can_view_full_profile(1, &p, &following_only));

        let friends = RelationshipFacts {
            is_friend: true,
            ..Default::default()
        };
        assert!(can_view_full_profile(1, &p, &friends));
        assert!(can_view_full_profile(2, &p, &stranger));
    }

    #[test]
    fn blocked_by_is_indistinguishable_from_missing() {
        let p = profile(2);
        let blocked_by = RelationshipFacts {
            is_blocked_by: true,
            ..Default::default()
        };
        assert!(matches!(
            profile_view(1, &p, &blocked_by),
            Err(SocialError::NotFound(_))
        ));

        // 自己拉黑对方：只保留身份字段，便于解除拉黑
        let blocking = RelationshipFacts {
            is_blocked: true,
            ..Default::default()
        };
        let view = profile_view(1, &p, &blocking).unwrap();
        assert!(!view.is_full());
    }

    #[test]
    fn post_visibility_tiers() {
        let mut post = Post {
            id: 1,
            author: profile(2),
            content: "c".into(),
            visibility: Visibility::Friends,
            comments_enabled: true,
            like_count: 0,
            comment_count: 0,
            view_count: 0,
            is_liked: false,
            created_at: Utc::now(),
        };
        let friends = RelationshipFacts {
            is_friend: true,
            ..Default::default()
        };
        assert!(can_view_post(1, &post, &friends));
        assert!(!can_view_post(1, &post, &RelationshipFacts::none()));
        post.visibility = Visibility::Private;
        assert!(!can_view_post(1, &post, &friends));
        assert!(can_view_post(2, &post, &RelationshipFacts::none()));
        post.visibility = Visibility::Public;
        let blocked = RelationshipFacts {
            is_blocked: true,
            ..Default::default()
        };
        assert!(!can_view_post(1, &post, &blocked));
    }
}
