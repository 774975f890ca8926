//! 关系解析器
//!
//! 只处理服务器返回的最新关系快照，不在本地推导拉黑/好友的状态迁移。
//! 负责两件事：保证“拉黑压制其他一切关系”这一不变量，以及在发起变更前
//! 用快照做前置条件检查（服务器仍会做最终判定）。

use crate::social::error::{SocialError, SocialResult};
use crate::social::relation::models::{RelationshipFacts, RelationshipState};

/// 规范化关系快照：任一方向拉黑时清空好友/关注/申请事实
pub fn normalize(facts: RelationshipFacts) -> RelationshipFacts {
    if facts.is_block_pair() {
        RelationshipFacts {
            is_friend: false,
            is_following: false,
            is_followed_by: false,
            has_pending_request: false,
            ..facts
        }
    } else {
        facts
    }
}

/// 摘要状态，优先级：拉黑对方 > 被拉黑 > 好友 > 已发申请 > 陌生人
pub fn state_of(facts: &RelationshipFacts) -> RelationshipState {
    if facts.is_blocked {
        RelationshipState::Blocking
    } else if facts.is_blocked_by {
        RelationshipState::BlockedBy
    } else if facts.is_friend {
        RelationshipState::Friends
    } else if facts.has_pending_request {
        RelationshipState::RequestSent
    } else {
        RelationshipState::Stranger
    }
}

fn ensure_not_blocked(facts: &RelationshipFacts, action: &str) -> SocialResult<()> {
    if facts.is_block_pair() {
        return Err(SocialError::Forbidden(format!("存在拉黑关系，无法{}", action)));
    }
    Ok(())
}

pub fn check_send_friend_request(facts: &RelationshipFacts) -> SocialResult<()> {
    ensure_not_blocked(facts, "发送好友申请")?;
    if facts.is_friend {
        return Err(SocialError::Conflict("已经是好友".into()));
    }
    if facts.has_pending_request {
        return Err(SocialError::Conflict("好友申请已发送，等待对方处理".into()));
    }
    Ok(())
}

pub fn check_remove_friend(facts: &RelationshipFacts) -> SocialResult<()> {
    if !facts.is_friend {
        return Err(SocialError::Conflict("对方不是你的好友".into()));
    }
    Ok(())
}

pub fn check_follow(facts: &RelationshipFacts) -> SocialResult<()> {
    ensure_not_blocked(facts, "关注")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn everything() -> RelationshipFacts {
        RelationshipFacts {
            is_friend: true,
            is_following: true,
            is_followed_by: true,
            is_blocked: false,
            is_blocked_by: false,
            has_pending_request: true,
        }
    }

    #[test]
    fn block_in_either_direction_suppresses_other_facts() {
        for (blocked, blocked_by) in [(true, false), (false, true), (true, true)] {
            let facts = normalize(RelationshipFacts {
                is_blocked: blocked,
                is_blocked_by: blocked_by,
                ..everything()
            });
            assert!(!facts.is_friend);
            assert!(!facts.is_following);
            assert!(!facts.is_followed_by);
            assert!(!facts.has_pending_request);
            assert_eq!(facts.is_blocked, blocked);
            assert_eq!(facts.is_blocked_by, blocked_by);
        }
        assert_eq!(normalize(everything()), everything());
    }

    #[test]
    fn state_precedence() {
        let f = RelationshipFacts {
            is_blocked: true,
            is_blocked_by: true,
            ..Default::default()
        };
        assert_eq!(state_of(&f), RelationshipState::Blocking);
        assert_eq!(state_of(&everything()), RelationshipState::Friends);
        let pending = RelationshipFacts {
            has_pending_request: true,
            ..Default::default()
        };
        assert_eq!(state_of(&pending), RelationshipState::RequestSent);
        assert_eq!(state_of(&RelationshipFacts::none()), RelationshipState::Stranger);
    }

    #[test]
    fn friend_request_preconditions() {
        assert!(check_send_friend_request(&RelationshipFacts::none()).is_ok());
        assert!(matches!(
            check_send_friend_request(&RelationshipFacts {
                has_pending_request: true,
                ..Default::default()
            }),
            Err(SocialError::Conflict(_))
        ));
        assert!(matches!(
            check_send_friend_request(&RelationshipFacts {
                is_friend: true,
                ..Default::default()
            }),
            Err(SocialError::Conflict(_))
        ));
        assert!(matches!(
            check_send_friend_request(&RelationshipFacts {
                is_blocked_by: true,
                ..Default::default()
            }),
            Err(SocialError::Forbidden(_))
        ));
    }

    #[test]
    fn follow_is_preempted_by_block() {
        assert!(check_follow(&RelationshipFacts::none()).is_ok());
        assert!(matches!(
            check_follow(&RelationshipFacts {
                is_blocked: true,
                ..Default::default()
            }),
            Err(SocialError::Forbidden(_))
        ));
        assert!(check_remove_friend(&RelationshipFacts::none()).is_err());
    }
}
