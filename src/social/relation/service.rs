//! 关系服务层
//!
//! 每个变更只发起一次远程调用；成功后作废并重新拉取该关系对的快照，
//! 同时把依赖关系集合的列表标记为失效。本地不推导任何拉黑/好友状态迁移。

use crate::social::error::{SocialError, SocialResult};
use crate::social::privacy::{self, ProfileView};
use crate::social::relation::api::RelationRemote;
use crate::social::relation::listener::{EmptyRelationListener, RelationListener};
use crate::social::relation::models::{
    AccountProfile, BlockedUser, FriendRequest, RelationList, RelationshipFacts,
    RelationshipState, RequestDirection, SocialStats,
};
use crate::social::relation::resolver;
use crate::social::session::{InFlightKey, SocialContext};
use crate::social::UserId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const ALL_LISTS: [RelationList; 6] = [
    RelationList::Friends,
    RelationList::Followers,
    RelationList::Following,
    RelationList::Blocked,
    RelationList::ReceivedRequests,
    RelationList::SentRequests,
];

pub struct RelationService {
    api: Arc<dyn RelationRemote>,
    ctx: SocialContext,
    listener: Arc<dyn RelationListener>,
}

impl RelationService {
    pub fn new(api: Arc<dyn RelationRemote>, ctx: SocialContext) -> Self {
        Self::with_listener(api, ctx, Arc::new(EmptyRelationListener))
    }

    pub fn with_listener(
        api: Arc<dyn RelationRemote>,
        ctx: SocialContext,
        listener: Arc<dyn RelationListener>,
    ) -> Self {
        Self { api, ctx, listener }
    }

    /// 缓存中的关系快照（可能已被作废）
    pub fn cached(&self, other: UserId) -> Option<RelationshipFacts> {
        self.ctx.read(|s| s.relations.facts(other))
    }

    /// 从服务器重新拉取关系快照，规范化后写入缓存
    pub async fn resolve(&self, other: UserId) -> SocialResult<RelationshipFacts> {
        let viewer = self.ctx.viewer()?;
        if viewer == other {
            return Ok(RelationshipFacts::none());
        }
        let raw = self.api.get_relationship(other).await.map_err(|e| {
            error!("[RelationSvc] 获取与 {} 的关系失败: {}", other, e);
            e
        })?;
        let facts = resolver::normalize(raw);
        if facts != raw {
            warn!(
                "[RelationSvc] 服务器返回的关系快照含拉黑，已压制其他事实: {:?}",
                raw
            );
        }
        self.ctx.write(|s| s.relations.put_facts(other, facts));
        debug!("[RelationSvc] 关系 {} -> {}: {:?}", viewer, other, facts);
        if let Ok(json) = serde_json::to_string(&facts) {
            self.listener.on_relationship_changed(other, json).await;
        }
        Ok(facts)
    }

    /// 读取关系快照，缓存缺失或已作废时重新拉取
    pub async fn relationship(&self, other: UserId) -> SocialResult<RelationshipFacts> {
        match self.cached(other) {
            Some(facts) => Ok(facts),
            None => self.resolve(other).await,
        }
    }

    pub async fn state(&self, other: UserId) -> SocialResult<RelationshipState> {
        Ok(resolver::state_of(&self.relationship(other).await?))
    }

    /// 并发拉取资料与关系，再交给隐私解析器
    pub async fn view_profile(&self, other: UserId) -> SocialResult<ProfileView> {
        let viewer = self.ctx.viewer()?;
        if viewer == other {
            let profile = self.api.get_profile(other).await?;
            self.ctx.write(|s| s.relations.put_profile(profile.clone()));
            return privacy::profile_view(viewer, &profile, &RelationshipFacts::none());
        }

        let (profile, facts) = tokio::join!(self.api.get_profile(other), self.resolve(other));
        let facts = facts?;
        if facts.is_blocked_by {
            self.ctx.write(|s| s.relations.forget_profile(other));
            return Err(SocialError::NotFound(format!("用户 {}", other)));
        }
        let profile = profile?;
        self.ctx.write(|s| s.relations.put_profile(profile.clone()));
        privacy::profile_view(viewer, &profile, &facts)
    }

    /// 重新拉取关系后评估完整资料可见性
    pub async fn can_view_full_profile(&self, other: UserId) -> SocialResult<bool> {
        let viewer = self.ctx.viewer()?;
        let facts = self.resolve(other).await?;
        let cached = self.ctx.read(|s| s.relations.profile(other).cloned());
        let profile = match cached {
            Some(p) => p,
            None => {
                let p = self.api.get_profile(other).await?;
                self.ctx.write(|s| s.relations.put_profile(p.clone()));
                p
            }
        };
        Ok(privacy::can_view_full_profile(viewer, &profile, &facts))
    }

    fn ensure_other(&self, other: UserId) -> SocialResult<UserId> {
        let viewer = self.ctx.viewer()?;
        if viewer == other {
            return Err(SocialError::Validation("不能对自己执行该操作".into()));
        }
        Ok(viewer)
    }

    /// 变更成功后：作废快照、标记列表失效、重新解析
    ///
    /// 变更已在服务器生效，重新拉取失败不再报错；快照保持作废，
    /// 下一次 [`Self::relationship`] 会重新拉取，此时返回 `None`
    async fn after_mutation(
        &self,
        other: UserId,
        lists: &[RelationList],
    ) -> Option<RelationshipFacts> {
        self.ctx.write(|s| {
            s.relations.invalidate_pair(other);
            s.relations.mark_stale(lists);
        });
        if let Ok(json) = serde_json::to_string(lists) {
            self.listener.on_lists_invalidated(json).await;
        }
        match self.resolve(other).await {
            Ok(facts) => Some(facts),
            Err(e) => {
                warn!(
                    "[RelationSvc] ⚠️ 变更已生效，但重新获取与 {} 的关系失败: {}",
                    other, e
                );
                None
            }
        }
    }

    pub async fn send_friend_request(
        &self,
        other: UserId,
        message: Option<&str>,
    ) -> SocialResult<FriendRequest> {
        self.ensure_other(other)?;
        let _guard = self.ctx.begin(InFlightKey::Relationship(other))?;
        let facts = self.resolve(other).await?;
        resolver::check_send_friend_request(&facts)?;

        let request = self.api.send_friend_request(other, message).await?;
        info!("[RelationSvc] 📨 好友申请 {} 已发送给 {}", request.id, other);
        self.ctx.write(|s| {
            let mut sent = s.relations.sent_requests().to_vec();
            sent.retain(|r| r.id != request.id);
            sent.push(request.clone());
            s.relations.set_sent_requests(sent);
        });
        self.after_mutation(other, &[RelationList::SentRequests])
            .await;
        Ok(request)
    }

    fn check_pending(&self, request_id: i64) -> SocialResult<()> {
        self.ctx.read(|s| match s.relations.received_request(request_id) {
            Some(r) if r.status.is_terminal() => Err(SocialError::Conflict(format!(
                "好友申请 {} 已处理",
                request_id
            ))),
            _ => Ok(()),
        })
    }

    pub async fn accept_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
        self.ctx.viewer()?;
        let _guard = self.ctx.begin(InFlightKey::FriendRequest(request_id))?;
        self.check_pending(request_id)?;

        let request = self.api.accept_friend_request(request_id).await?;
        info!(
            "[RelationSvc] ✅ 已接受好友申请 {}，来自 {}",
            request_id, request.requester.id
        );
        self.finish_request(&request).await;
        self.after_mutation(
            request.requester.id,
            &[RelationList::Friends, RelationList::ReceivedRequests],
        )
        .await;
        Ok(request)
    }

    pub async fn reject_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
        self.ctx.viewer()?;
        let _guard = self.ctx.begin(InFlightKey::FriendRequest(request_id))?;
        self.check_pending(request_id)?;

        let request = self.api.reject_friend_request(request_id).await?;
        info!(
            "[RelationSvc] 已拒绝好友申请 {}，来自 {}",
            request_id, request.requester.id
        );
        self.finish_request(&request).await;
        self.after_mutation(request.requester.id, &[RelationList::ReceivedRequests])
            .await;
        Ok(request)
    }

    /// 终结的申请移出待处理集合
    async fn finish_request(&self, request: &FriendRequest) {
        let remaining = self.ctx.write(|s| {
            s.relations.drop_request(request.id);
            s.relations.received_requests().to_vec()
        });
        if let Ok(json) = serde_json::to_string(&remaining) {
            self.listener.on_friend_request_list_changed(json).await;
        }
    }

    pub async fn remove_friend(&self, other: UserId) -> SocialResult<Option<RelationshipFacts>> {
        self.ensure_other(other)?;
        let _guard = self.ctx.begin(InFlightKey::Relationship(other))?;
        let facts = self.resolve(other).await?;
        resolver::check_remove_friend(&facts)?;

        self.api.remove_friend(other).await?;
        info!("[RelationSvc] 已移除好友 {}", other);
        self.ctx.write(|s| {
            let mut friends = s.relations.friends().to_vec();
            friends.retain(|f| f.id != other);
            s.relations.set_friends(friends);
        });
        Ok(self.after_mutation(other, &[RelationList::Friends]).await)
    }

    pub async fn follow(&self, other: UserId) -> SocialResult<Option<RelationshipFacts>> {
        self.ensure_other(other)?;
        let _guard = self.ctx.begin(InFlightKey::Relationship(other))?;
        let facts = self.resolve(other).await?;
        resolver::check_follow(&facts)?;

        self.api.follow(other).await?;
        info!("[RelationSvc] 已关注 {}", other);
        Ok(self.after_mutation(other, &[RelationList::Following]).await)
    }

    pub async fn unfollow(&self, other: UserId) -> SocialResult<Option<RelationshipFacts>> {
        self.ensure_other(other)?;
        let _guard = self.ctx.begin(InFlightKey::Relationship(other))?;

        self.api.unfollow(other).await?;
        info!("[RelationSvc] 已取消关注 {}", other);
        Ok(self.after_mutation(other, &[RelationList::Following]).await)
    }

    /// 拉黑是单方面的，服务器同时清除双方的好友、关注与待处理申请
    pub async fn block(
        &self,
        other: UserId,
        reason: Option<&str>,
    ) -> SocialResult<Option<RelationshipFacts>> {
        self.ensure_other(other)?;
        let _guard = self.ctx.begin(InFlightKey::Relationship(other))?;

        self.api.block(other, reason).await?;
        info!("[RelationSvc] 🚫 已拉黑 {}", other);
        self.ctx.write(|s| {
            let mut friends = s.relations.friends().to_vec();
            friends.retain(|f| f.id != other);
            s.relations.set_friends(friends);
        });
        Ok(self.after_mutation(other, &ALL_LISTS).await)
    }

    /// 解除拉黑后关系回到“无”，不恢复拉黑前的状态
    pub async fn unblock(&self, other: UserId) -> SocialResult<Option<RelationshipFacts>> {
        self.ensure_other(other)?;
        let _guard = self.ctx.begin(InFlightKey::Relationship(other))?;

        self.api.unblock(other).await?;
        info!("[RelationSvc] 已解除拉黑 {}", other);
        Ok(self.after_mutation(other, &[RelationList::Blocked]).await)
    }

    pub fn friends(&self) -> Vec<AccountProfile> {
        self.ctx.read(|s| s.relations.friends().to_vec())
    }

    pub fn blocked(&self) -> Vec<BlockedUser> {
        self.ctx.read(|s| s.relations.blocked().to_vec())
    }

    pub fn pending_requests(&self, direction: RequestDirection) -> Vec<FriendRequest> {
        self.ctx.read(|s| match direction {
            RequestDirection::Received => s.relations.received_requests().to_vec(),
            RequestDirection::Sent => s.relations.sent_requests().to_vec(),
        })
    }

    pub fn is_stale(&self, list: RelationList) -> bool {
        self.ctx.read(|s| s.relations.is_stale(list))
    }

    pub async fn load_friends(&self) -> SocialResult<Vec<AccountProfile>> {
        self.ctx.viewer()?;
        let friends = self.api.list_friends().await?;
        self.ctx.write(|s| s.relations.set_friends(friends.clone()));
        if let Ok(json) = serde_json::to_string(&friends) {
            self.listener.on_friend_list_changed(json).await;
        }
        Ok(friends)
    }

    pub async fn load_friend_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<FriendRequest>> {
        self.ctx.viewer()?;
        let requests = self.api.list_friend_requests(direction).await?;
        self.ctx.write(|s| match direction {
            RequestDirection::Received => s.relations.set_received_requests(requests.clone()),
            RequestDirection::Sent => s.relations.set_sent_requests(requests.clone()),
        });
        if let Ok(json) = serde_json::to_string(&requests) {
            self.listener.on_friend_request_list_changed(json).await;
        }
        Ok(requests)
    }

    pub async fn load_blocked(&self) -> SocialResult<Vec<BlockedUser>> {
        self.ctx.viewer()?;
        let blocked = self.api.list_blocked().await?;
        self.ctx.write(|s| s.relations.set_blocked(blocked.clone()));
        if let Ok(json) = serde_json::to_string(&blocked) {
            self.listener.on_black_list_changed(json).await;
        }
        Ok(blocked)
    }

    pub async fn followers(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
        self.ctx.viewer()?;
        self.api.list_followers(user_id).await
    }

    pub async fn following(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
        self.ctx.viewer()?;
        self.api.list_following(user_id).await
    }

    pub async fn stats(&self) -> SocialResult<SocialStats> {
        self.ctx.viewer()?;
        self.api.get_stats().await
    }

    /// 重新加载所有已失效的列表
    pub async fn refresh_stale(&self) -> SocialResult<()> {
        if self.is_stale(RelationList::Friends) {
            self.load_friends().await?;
        }
        if self.is_stale(RelationList::Blocked) {
            self.load_blocked().await?;
        }
        if self.is_stale(RelationList::ReceivedRequests) {
            self.load_friend_requests(RequestDirection::Received).await?;
        }
        if self.is_stale(RelationList::SentRequests) {
            self.load_friend_requests(RequestDirection::Sent).await?;
        }
        // 粉丝/关注列表不缓存，只需清除标记
        self.ctx.write(|s| {
            s.relations.clear_stale(&[RelationList::Followers, RelationList::Following])
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::memory::{MemoryBackend, MemorySession};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use crate::social::privacy::ProfileDetails;
    use crate::social::relation::models::{FriendRequestStatus, PrivacyLevel};
    use crate::social::test_support::init_test_logger;

    struct Peer {
        id: UserId,
        svc: RelationService,
    }

    fn peer(backend: &MemoryBackend, name: &str, privacy: PrivacyLevel) -> Peer {
        let id = backend.add_user(name, privacy);
        let ctx = SocialContext::new();
        ctx.sign_in(id);
        Peer {
            id,
            svc: RelationService::new(Arc::new(backend.session(id)), ctx),
        }
    }

    fn pair() -> (MemoryBackend, Peer, Peer) {
        init_test_logger();
        let backend = MemoryBackend::new();
        let a = peer(&backend, "alice", PrivacyLevel::Public);
        let b = peer(&backend, "bob", PrivacyLevel::Public);
        (backend, a, b)
    }

    async fn befriend(a: &Peer, b: &Peer) {
        let req = a.svc.send_friend_request(b.id, Some("hi")).await.unwrap();
        b.svc.accept_friend_request(req.id).await.unwrap();
    }

    fn assert_suppressed(f: &RelationshipFacts) {
        assert!(!f.is_friend);
        assert!(!f.is_following);
        assert!(!f.is_followed_by);
        assert!(!f.has_pending_request);
    }

    #[tokio::test]
    async fn block_clears_everything_from_both_sides() {
        let (_backend, a, b) = pair();
        befriend(&a, &b).await;
        a.svc.follow(b.id).await.unwrap();
        b.svc.follow(a.id).await.unwrap();

        let from_a = a.svc.block(b.id, Some("spam")).await.unwrap().unwrap();
        assert_suppressed(&from_a);
        assert!(from_a.is_blocked);

        let from_b = b.svc.resolve(a.id).await.unwrap();
        assert_suppressed(&from_b);
        assert!(from_b.is_blocked_by);
        assert_eq!(b.svc.state(a.id).await.unwrap(), RelationshipState::BlockedBy);
        assert!(a.svc.friends().is_empty());
        assert!(a.svc.is_stale(RelationList::Followers));
    }

    #[tokio::test]
    async fn pending_requests_are_dropped_by_block() {
        let (_backend, a, b) = pair();
        a.svc.send_friend_request(b.id, None).await.unwrap();
        b.svc.block(a.id, None).await.unwrap();

        let from_a = a.svc.resolve(b.id).await.unwrap();
        assert_suppressed(&from_a);
        let err = a.svc.send_friend_request(b.id, None).await.unwrap_err();
        assert!(matches!(err, SocialError::Forbidden(_)));
    }

    #[tokio::test]
    async fn accept_makes_friends_both_ways() {
        let (_backend, a, b) = pair();
        let req = a.svc.send_friend_request(b.id, Some("hello")).await.unwrap();
        assert_eq!(req.status, FriendRequestStatus::Pending);
        assert!(a.svc.resolve(b.id).await.unwrap().has_pending_request);

        let received = b
            .svc
            .load_friend_requests(RequestDirection::Received)
            .await
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message.as_deref(), Some("hello"));

        let accepted = b.svc.accept_friend_request(req.id).await.unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
        assert!(b.svc.pending_requests(RequestDirection::Received).is_empty());

        let from_a = a.svc.resolve(b.id).await.unwrap();
        let from_b = b.svc.resolve(a.id).await.unwrap();
        assert!(from_a.is_friend && from_b.is_friend);
        assert!(!from_a.has_pending_request && !from_b.has_pending_request);

        // 终态不能再次处理
        let again = b.svc.accept_friend_request(req.id).await.unwrap_err();
        assert!(matches!(again, SocialError::Conflict(_)));
        let dup = a.svc.send_friend_request(b.id, None).await.unwrap_err();
        assert!(matches!(dup, SocialError::Conflict(_)));
    }

    #[tokio::test]
    async fn reject_leaves_no_relationship_and_allows_resend() {
        let (_backend, a, b) = pair();
        let req = a.svc.send_friend_request(b.id, None).await.unwrap();
        let dup = a.svc.send_friend_request(b.id, None).await.unwrap_err();
        assert!(matches!(dup, SocialError::Conflict(_)));

        b.svc.reject_friend_request(req.id).await.unwrap();
        let facts = a.svc.resolve(b.id).await.unwrap();
        assert_eq!(facts, RelationshipFacts::none());

        let again = a.svc.send_friend_request(b.id, None).await.unwrap();
        assert_ne!(again.id, req.id);
    }

    #[tokio::test]
    async fn private_profile_unlocks_after_friendship() {
        init_test_logger();
        let backend = MemoryBackend::new();
        let u = peer(&backend, "private_u", PrivacyLevel::Private);
        let v = peer(&backend, "viewer_v", PrivacyLevel::Public);

        let locked = v.svc.view_profile(u.id).await.unwrap();
        assert_eq!(locked.details, ProfileDetails::Locked);
        assert_eq!(locked.identity.username, "private_u");
        assert!(!v.svc.can_view_full_profile(u.id).await.unwrap());

        // 关注不解锁私密资料
        v.svc.follow(u.id).await.unwrap();
        assert!(!v.svc.can_view_full_profile(u.id).await.unwrap());

        befriend(&v, &u).await;
        assert!(v.svc.can_view_full_profile(u.id).await.unwrap());
        assert!(v.svc.view_profile(u.id).await.unwrap().is_full());
        assert!(u.svc.view_profile(u.id).await.unwrap().is_full());
    }

    #[tokio::test]
    async fn blocked_by_profile_reads_as_missing() {
        let (_backend, a, b) = pair();
        b.svc.block(a.id, None).await.unwrap();
        let err = a.svc.view_profile(b.id).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFound(_)));

        let own_view = b.svc.view_profile(a.id).await.unwrap();
        assert!(!own_view.is_full());
    }

    #[tokio::test]
    async fn unblock_returns_to_none() {
        let (_backend, a, b) = pair();
        befriend(&a, &b).await;
        a.svc.follow(b.id).await.unwrap();
        a.svc.block(b.id, None).await.unwrap();
        assert_eq!(a.svc.load_blocked().await.unwrap().len(), 1);

        let facts = a.svc.unblock(b.id).await.unwrap().unwrap();
        assert_eq!(facts, RelationshipFacts::none());
        assert!(a.svc.load_blocked().await.unwrap().is_empty());
        assert!(a.svc.load_friends().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_is_preempted_by_block_either_way() {
        let (_backend, a, b) = pair();
        a.svc.block(b.id, None).await.unwrap();
        assert!(matches!(
            a.svc.follow(b.id).await.unwrap_err(),
            SocialError::Forbidden(_)
        ));
        assert!(matches!(
            b.svc.follow(a.id).await.unwrap_err(),
            SocialError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn follow_is_independent_of_friendship() {
        let (_backend, a, b) = pair();
        let facts = a.svc.follow(b.id).await.unwrap().unwrap();
        assert!(facts.is_following && !facts.is_friend);
        assert!(b.svc.resolve(a.id).await.unwrap().is_followed_by);
        assert_eq!(a.svc.following(a.id).await.unwrap().len(), 1);
        assert_eq!(b.svc.followers(b.id).await.unwrap()[0].id, a.id);

        befriend(&a, &b).await;
        let facts = a.svc.remove_friend(b.id).await.unwrap().unwrap();
        assert!(!facts.is_friend);
        assert!(facts.is_following);
        assert!(matches!(
            a.svc.remove_friend(b.id).await.unwrap_err(),
            SocialError::Conflict(_)
        ));

        let facts = a.svc.unfollow(b.id).await.unwrap().unwrap();
        assert_eq!(facts, RelationshipFacts::none());
    }

    #[tokio::test]
    async fn stats_reflect_relationships() {
        let (backend, a, b) = pair();
        let c = peer(&backend, "carol", PrivacyLevel::Public);
        befriend(&a, &b).await;
        befriend(&c, &b).await;
        befriend(&a, &c).await;
        c.svc.follow(a.id).await.unwrap();

        let stats = a.svc.stats().await.unwrap();
        assert_eq!(stats.total_friends, 2);
        assert_eq!(stats.total_followers, 1);
        assert_eq!(stats.mutual_friends, 0);
        let b_stats = b.svc.stats().await.unwrap();
        assert_eq!(b_stats.total_friends, 2);
    }

    #[tokio::test]
    async fn self_mutations_are_rejected() {
        let (_backend, a, _b) = pair();
        assert!(matches!(
            a.svc.follow(a.id).await.unwrap_err(),
            SocialError::Validation(_)
        ));
        assert_eq!(a.svc.resolve(a.id).await.unwrap(), RelationshipFacts::none());
    }

    /// 变更落地后读接口开始失败的远程实现
    struct FlakyReads {
        inner: MemorySession,
        fail_reads: AtomicBool,
    }

    impl FlakyReads {
        fn check(&self) -> SocialResult<()> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(SocialError::Network("timeout".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RelationRemote for FlakyReads {
        async fn get_relationship(&self, other: UserId) -> SocialResult<RelationshipFacts> {
            self.check()?;
            self.inner.get_relationship(other).await
        }

        async fn get_profile(&self, user_id: UserId) -> SocialResult<AccountProfile> {
            self.check()?;
            self.inner.get_profile(user_id).await
        }

        async fn send_friend_request(
            &self,
            other: UserId,
            message: Option<&str>,
        ) -> SocialResult<FriendRequest> {
            let request = self.inner.send_friend_request(other, message).await?;
            self.fail_reads.store(true, Ordering::SeqCst);
            Ok(request)
        }

        async fn accept_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
            self.inner.accept_friend_request(request_id).await
        }

        async fn reject_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
            self.inner.reject_friend_request(request_id).await
        }

        async fn list_friend_requests(
            &self,
            direction: RequestDirection,
        ) -> SocialResult<Vec<FriendRequest>> {
            self.check()?;
            self.inner.list_friend_requests(direction).await
        }

        async fn remove_friend(&self, other: UserId) -> SocialResult<()> {
            self.inner.remove_friend(other).await
        }

        async fn follow(&self, other: UserId) -> SocialResult<()> {
            self.inner.follow(other).await
        }

        async fn unfollow(&self, other: UserId) -> SocialResult<()> {
            self.inner.unfollow(other).await
        }

        async fn block(&self, other: UserId, reason: Option<&str>) -> SocialResult<()> {
            self.inner.block(other, reason).await?;
            self.fail_reads.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn unblock(&self, other: UserId) -> SocialResult<()> {
            self.inner.unblock(other).await
        }

        async fn list_friends(&self) -> SocialResult<Vec<AccountProfile>> {
            self.check()?;
            self.inner.list_friends().await
        }

        async fn list_followers(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
            self.check()?;
            self.inner.list_followers(user_id).await
        }

        async fn list_following(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
            self.check()?;
            self.inner.list_following(user_id).await
        }

        async fn list_blocked(&self) -> SocialResult<Vec<BlockedUser>> {
            self.check()?;
            self.inner.list_blocked().await
        }

        async fn get_stats(&self) -> SocialResult<SocialStats> {
            self.check()?;
            self.inner.get_stats().await
        }
    }

    fn flaky_peer(
        backend: &MemoryBackend,
        name: &str,
    ) -> (UserId, Arc<FlakyReads>, RelationService) {
        let id = backend.add_user(name, PrivacyLevel::Public);
        let remote = Arc::new(FlakyReads {
            inner: backend.session(id),
            fail_reads: AtomicBool::new(false),
        });
        let ctx = SocialContext::new();
        ctx.sign_in(id);
        (id, remote.clone(), RelationService::new(remote, ctx))
    }

    #[tokio::test]
    async fn failed_refetch_after_block_still_reports_success() {
        init_test_logger();
        let backend = MemoryBackend::new();
        let (a, remote, svc) = flaky_peer(&backend, "alice");
        let b = peer(&backend, "bob", PrivacyLevel::Public);
        svc.follow(b.id).await.unwrap();
        assert!(svc.cached(b.id).is_some());

        let facts = svc.block(b.id, Some("spam")).await.unwrap();
        assert!(facts.is_none());
        // 快照保持作废，列表标记为失效
        assert!(svc.cached(b.id).is_none());
        assert!(svc.is_stale(RelationList::Blocked));
        assert_eq!(backend.session(a).list_blocked().await.unwrap().len(), 1);

        // 读接口恢复后按需重新拉取
        remote.fail_reads.store(false, Ordering::SeqCst);
        let facts = svc.relationship(b.id).await.unwrap();
        assert!(facts.is_blocked && !facts.is_following);
    }

    #[tokio::test]
    async fn failed_refetch_after_friend_request_keeps_request() {
        init_test_logger();
        let backend = MemoryBackend::new();
        let (_a, _remote, svc) = flaky_peer(&backend, "alice");
        let b = peer(&backend, "bob", PrivacyLevel::Public);

        let request = svc.send_friend_request(b.id, None).await.unwrap();
        assert_eq!(request.status, FriendRequestStatus::Pending);
        assert_eq!(svc.pending_requests(RequestDirection::Sent)[0].id, request.id);
        assert!(svc.cached(b.id).is_none());
        let received = b
            .svc
            .load_friend_requests(RequestDirection::Received)
            .await
            .unwrap();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn refresh_stale_reloads_invalidated_lists() {
        let (_backend, a, b) = pair();
        befriend(&a, &b).await;
        assert!(a.svc.is_stale(RelationList::SentRequests));
        a.svc.refresh_stale().await.unwrap();
        assert!(!a.svc.is_stale(RelationList::SentRequests));
        assert!(a.svc.pending_requests(RequestDirection::Sent).is_empty());
        assert!(a.svc.friends().is_empty());
        assert_eq!(a.svc.load_friends().await.unwrap()[0].id, b.id);
    }
}
