//! 关系存储：当前登录用户的关系快照与好友申请，纯数据容器，不含业务规则

use crate::social::relation::models::{
    AccountProfile, BlockedUser, FriendRequest, RelationList, RelationshipFacts,
};
use crate::social::UserId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct RelationStore {
    facts: HashMap<UserId, RelationshipFacts>,
    profiles: HashMap<UserId, AccountProfile>,
    friends: Vec<AccountProfile>,
    blocked: Vec<BlockedUser>,
    received_requests: Vec<FriendRequest>,
    sent_requests: Vec<FriendRequest>,
    stale: HashSet<RelationList>,
}

impl RelationStore {
    pub fn facts(&self, other: UserId) -> Option<RelationshipFacts> {
        self.facts.get(&other).copied()
    }

    pub fn put_facts(&mut self, other: UserId, facts: RelationshipFacts) {
        self.facts.insert(other, facts);
    }

    /// 作废某个关系对的快照，下次读取前必须重新拉取
    pub fn invalidate_pair(&mut self, other: UserId) {
        self.facts.remove(&other);
    }

    pub fn profile(&self, id: UserId) -> Option<&AccountProfile> {
        self.profiles.get(&id)
    }

    pub fn put_profile(&mut self, profile: AccountProfile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn forget_profile(&mut self, id: UserId) {
        self.profiles.remove(&id);
    }

    pub fn friends(&self) -> &[AccountProfile] {
        &self.friends
    }

    pub fn set_friends(&mut self, friends: Vec<AccountProfile>) {
        self.friends = friends;
        self.stale.remove(&RelationList::Friends);
    }

    pub fn blocked(&self) -> &[BlockedUser] {
        &self.blocked
    }

    pub fn set_blocked(&mut self, blocked: Vec<BlockedUser>) {
        self.blocked = blocked;
        self.stale.remove(&RelationList::Blocked);
    }

    pub fn received_requests(&self) -> &[FriendRequest] {
        &self.received_requests
    }

    pub fn set_received_requests(&mut self, requests: Vec<FriendRequest>) {
        self.received_requests = requests;
        self.stale.remove(&RelationList::ReceivedRequests);
    }

    pub fn sent_requests(&self) -> &[FriendRequest] {
        &self.sent_requests
    }

    pub fn set_sent_requests(&mut self, requests: Vec<FriendRequest>) {
        self.sent_requests = requests;
        self.stale.remove(&RelationList::SentRequests);
    }

    pub fn received_request(&self, request_id: i64) -> Option<&FriendRequest> {
        self.received_requests.iter().find(|r| r.id == request_id)
    }

    /// 从待处理集合中移除已终结的申请
    pub fn drop_request(&mut self, request_id: i64) -> Option<FriendRequest> {
        if let Some(pos) = self.received_requests.iter().position(|r| r.id == request_id) {
            return Some(self.received_requests.remove(pos));
        }
        self.sent_requests
            .iter()
            .position(|r| r.id == request_id)
            .map(|pos| self.sent_requests.remove(pos))
    }

    pub fn mark_stale(&mut self, lists: &[RelationList]) {
        self.stale.extend(lists.iter().copied());
    }

    pub fn clear_stale(&mut self, lists: &[RelationList]) {
        for list in lists {
            self.stale.remove(list);
        }
    }

    pub fn is_stale(&self, list: RelationList) -> bool {
        self.stale.contains(&list)
    }
}
