use super::{FriendRequestRecord, MemorySession, World};
use crate::social::error::{SocialError, SocialResult};
use crate::social::relation::api::RelationRemote;
use crate::social::relation::models::{
    AccountProfile, BlockedUser, FriendRequest, FriendRequestStatus, RelationshipFacts,
    RequestDirection, SocialStats,
};
use crate::social::UserId;
use async_trait::async_trait;
use tracing::debug;

impl World {
    fn friend_request(&self, r: &FriendRequestRecord) -> SocialResult<FriendRequest> {
        Ok(FriendRequest {
            id: r.id,
            requester: self.profile(r.from)?,
            recipient_id: r.to,
            status: r.status,
            message: r.message.clone(),
            created_at: r.created_at,
            responded_at: r.responded_at,
        })
    }

    fn ensure_other(&self, viewer: UserId, other: UserId) -> SocialResult<()> {
        if viewer == other {
            return Err(SocialError::Validation("不能对自己执行该操作".into()));
        }
        self.user(other).map(|_| ())
    }

    /// 对方拉黑了自己时与不存在无法区分
    fn ensure_reachable(&self, viewer: UserId, other: UserId) -> SocialResult<()> {
        self.user(other)?;
        if viewer != other && self.blocks.contains_key(&(other, viewer)) {
            return Err(SocialError::NotFound(format!("用户 {}", other)));
        }
        Ok(())
    }

    fn respond_friend_request(
        &mut self,
        viewer: UserId,
        request_id: i64,
        status: FriendRequestStatus,
    ) -> SocialResult<FriendRequest> {
        let (from, to, current) = {
            let r = self
                .friend_requests
                .get(&request_id)
                .ok_or_else(|| SocialError::NotFound(format!("好友申请 {}", request_id)))?;
            (r.from, r.to, r.status)
        };
        if current.is_terminal() {
            return Err(SocialError::Conflict(format!("好友申请 {} 已处理", request_id)));
        }
        if to != viewer {
            return Err(SocialError::Forbidden("只有接收方可以处理好友申请".into()));
        }
        if status == FriendRequestStatus::Accepted && self.is_block_pair(from, to) {
            return Err(SocialError::Forbidden("存在拉黑关系".into()));
        }

        let at = self.now();
        if status == FriendRequestStatus::Accepted {
            self.befriend(from, to);
        }
        let record = self
            .friend_requests
            .get_mut(&request_id)
            .ok_or_else(|| SocialError::NotFound(format!("好友申请 {}", request_id)))?;
        record.status = status;
        record.responded_at = Some(at);
        let record = &self.friend_requests[&request_id];
        self.friend_request(record)
    }
}

#[async_trait]
impl RelationRemote for MemorySession {
    async fn get_relationship(&self, other: UserId) -> SocialResult<RelationshipFacts> {
        let w = self.lock();
        w.user(other)?;
        Ok(w.facts(self.viewer, other))
    }

    async fn get_profile(&self, user_id: UserId) -> SocialResult<AccountProfile> {
        let w = self.lock();
        w.ensure_reachable(self.viewer, user_id)?;
        w.profile(user_id)
    }

    async fn send_friend_request(
        &self,
        other: UserId,
        message: Option<&str>,
    ) -> SocialResult<FriendRequest> {
        let mut w = self.lock();
        w.ensure_other(self.viewer, other)?;
        if w.is_block_pair(self.viewer, other) {
            return Err(SocialError::Forbidden("存在拉黑关系，无法发送好友申请".into()));
        }
        if w.are_friends(self.viewer, other) {
            return Err(SocialError::Conflict("已经是好友".into()));
        }
        if w.pending_request(self.viewer, other).is_some() {
            return Err(SocialError::Conflict("好友申请已发送".into()));
        }
        if w.pending_request(other, self.viewer).is_some() {
            return Err(SocialError::Conflict("对方已向你发送好友申请".into()));
        }

        let id = w.next_id();
        let created_at = w.now();
        w.friend_requests.insert(
            id,
            FriendRequestRecord {
                id,
                from: self.viewer,
                to: other,
                status: FriendRequestStatus::Pending,
                message: message.map(str::to_string),
                created_at,
                responded_at: None,
            },
        );
        debug!("[MemoryBackend] 好友申请 {}: {} -> {}", id, self.viewer, other);
        let record = &w.friend_requests[&id];
        w.friend_request(record)
    }

    async fn accept_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
        self.lock()
            .respond_friend_request(self.viewer, request_id, FriendRequestStatus::Accepted)
    }

    async fn reject_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
        self.lock()
            .respond_friend_request(self.viewer, request_id, FriendRequestStatus::Rejected)
    }

    async fn list_friend_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<FriendRequest>> {
        let w = self.lock();
        w.friend_requests
            .values()
            .rev()
            .filter(|r| r.status == FriendRequestStatus::Pending)
            .filter(|r| match direction {
                RequestDirection::Received => r.to == self.viewer,
                RequestDirection::Sent => r.from == self.viewer,
            })
            .map(|r| w.friend_request(r))
            .collect()
    }

    async fn remove_friend(&self, other: UserId) -> SocialResult<()> {
        let mut w = self.lock();
        w.ensure_other(self.viewer, other)?;
        if !w.friendships.remove(&super::pair(self.viewer, other)) {
            return Err(SocialError::Conflict("对方不是你的好友".into()));
        }
        Ok(())
    }

    async fn follow(&self, other: UserId) -> SocialResult<()> {
        let mut w = self.lock();
        w.ensure_other(self.viewer, other)?;
        if w.is_block_pair(self.viewer, other) {
            return Err(SocialError::Forbidden("存在拉黑关系，无法关注".into()));
        }
        w.follows.insert((self.viewer, other));
        Ok(())
    }

    async fn unfollow(&self, other: UserId) -> SocialResult<()> {
        let mut w = self.lock();
        w.ensure_other(self.viewer, other)?;
        w.follows.remove(&(self.viewer, other));
        Ok(())
    }

    async fn block(&self, other: UserId, reason: Option<&str>) -> SocialResult<()> {
        let mut w = self.lock();
        w.ensure_other(self.viewer, other)?;
        w.block(self.viewer, other, reason.map(str::to_string));
        Ok(())
    }

    async fn unblock(&self, other: UserId) -> SocialResult<()> {
        let mut w = self.lock();
        w.ensure_other(self.viewer, other)?;
        w.blocks.remove(&(self.viewer, other));
        Ok(())
    }

    async fn list_friends(&self) -> SocialResult<Vec<AccountProfile>> {
        let w = self.lock();
        let mut ids: Vec<UserId> = w
            .friendships
            .iter()
            .filter_map(|&(a, b)| match self.viewer {
                v if v == a => Some(b),
                v if v == b => Some(a),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        w.profiles(ids)
    }

    async fn list_followers(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
        let w = self.lock();
        w.ensure_reachable(self.viewer, user_id)?;
        let mut ids: Vec<UserId> = w
            .follows
            .iter()
            .filter(|(_, b)| *b == user_id)
            .map(|(a, _)| *a)
            .collect();
        ids.sort_unstable();
        w.profiles(ids)
    }

    async fn list_following(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
        let w = self.lock();
        w.ensure_reachable(self.viewer, user_id)?;
        let mut ids: Vec<UserId> = w
            .follows
            .iter()
            .filter(|(a, _)| *a == user_id)
            .map(|(_, b)| *b)
            .collect();
        ids.sort_unstable();
        w.profiles(ids)
    }

    async fn list_blocked(&self) -> SocialResult<Vec<BlockedUser>> {
        let w = self.lock();
        let mut rows: Vec<(UserId, &super::BlockRecord)> = w
            .blocks
            .iter()
            .filter(|((blocker, _), _)| *blocker == self.viewer)
            .map(|((_, blocked), record)| (*blocked, record))
            .collect();
        rows.sort_unstable_by_key(|(id, _)| *id);
        rows.into_iter()
            .map(|(id, record)| {
                let user = w.user(id)?;
                Ok(BlockedUser {
                    id,
                    username: user.username.clone(),
                    display_name: user.display_name.clone(),
                    avatar_url: None,
                    blocked_at: record.at,
                    reason: record.reason.clone(),
                })
            })
            .collect()
    }

    async fn get_stats(&self) -> SocialResult<SocialStats> {
        let w = self.lock();
        let me = self.viewer;
        let pending = |pred: &dyn Fn(&FriendRequestRecord) -> bool| {
            w.friend_requests
                .values()
                .filter(|r| r.status == FriendRequestStatus::Pending && pred(r))
                .count() as u64
        };
        let mutual = w
            .follows
            .iter()
            .filter(|(a, b)| *a == me && w.follows.contains(&(*b, me)))
            .count() as u64;
        Ok(SocialStats {
            total_friends: w
                .friendships
                .iter()
                .filter(|(a, b)| *a == me || *b == me)
                .count() as u64,
            pending_requests_sent: pending(&|r: &FriendRequestRecord| r.from == me),
            pending_requests_received: pending(&|r: &FriendRequestRecord| r.to == me),
            total_followers: w.follows.iter().filter(|(_, b)| *b == me).count() as u64,
            total_following: w.follows.iter().filter(|(a, _)| *a == me).count() as u64,
            blocked_users: w.blocks.keys().filter(|(a, _)| *a == me).count() as u64,
            mutual_friends: mutual,
        })
    }
}
