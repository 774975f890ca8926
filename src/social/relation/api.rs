//! 关系 HTTP API 客户端
//!
//! 负责所有好友/关注/拉黑相关的 HTTP 请求

use crate::social::error::SocialResult;
use crate::social::relation::models::{
    AccountProfile, BlockedUser, FriendRequest, RelationshipFacts, RequestDirection, SocialStats,
};
use crate::social::types::{handle_ack_response, handle_http_response, ItemsResp};
use crate::social::UserId;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

/// 关系相关的远程接口，viewer 由凭证隐式确定
#[async_trait]
pub trait RelationRemote: Send + Sync {
    async fn get_relationship(&self, other: UserId) -> SocialResult<RelationshipFacts>;

    async fn get_profile(&self, user_id: UserId) -> SocialResult<AccountProfile>;

    async fn send_friend_request(
        &self,
        other: UserId,
        message: Option<&str>,
    ) -> SocialResult<FriendRequest>;

    async fn accept_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest>;

    async fn reject_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest>;

    /// 待处理的好友申请
    async fn list_friend_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<FriendRequest>>;

    async fn remove_friend(&self, other: UserId) -> SocialResult<()>;

    async fn follow(&self, other: UserId) -> SocialResult<()>;

    async fn unfollow(&self, other: UserId) -> SocialResult<()>;

    async fn block(&self, other: UserId, reason: Option<&str>) -> SocialResult<()>;

    async fn unblock(&self, other: UserId) -> SocialResult<()>;

    async fn list_friends(&self) -> SocialResult<Vec<AccountProfile>>;

    async fn list_followers(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>>;

    async fn list_following(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>>;

    async fn list_blocked(&self) -> SocialResult<Vec<BlockedUser>>;

    async fn get_stats(&self) -> SocialResult<SocialStats>;
}

/// 关系相关的 HTTP API 客户端
pub struct RelationApi {
    client: reqwest::Client,
    api_base_url: String,
    page_size: Option<u32>,
}

impl RelationApi {
    /// 创建新的关系 API 客户端
    ///
    /// `client` 应该已经在外部配置好认证头
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
            page_size: None,
        }
    }

    /// 列表接口每页条目数，不设置时使用服务器默认值
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.api_base_url, path);
        debug!("[RelationAPI]   {} {}, 操作ID: {}", method, url, operation_id);
        self.client
            .request(method, url)
            .header("X-Request-ID", operation_id)
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        operation_name: &str,
    ) -> SocialResult<Vec<T>> {
        let response = self
            .request(reqwest::Method::GET, path)
            .query(query)
            .query(&[("limit", self.page_size)])
            .send()
            .await?;
        let resp: ItemsResp<T> = handle_http_response(response, operation_name).await?;
        info!(
            "[RelationAPI] ✅ {}，条目数: {}",
            operation_name,
            resp.items.len()
        );
        Ok(resp.items)
    }
}

#[async_trait]
impl RelationRemote for RelationApi {
    async fn get_relationship(&self, other: UserId) -> SocialResult<RelationshipFacts> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/social/relationship/{}", other),
            )
            .send()
            .await?;
        handle_http_response(response, "获取关系状态").await
    }

    async fn get_profile(&self, user_id: UserId) -> SocialResult<AccountProfile> {
        let response = self
            .request(reqwest::Method::GET, &format!("/users/{}", user_id))
            .send()
            .await?;
        handle_http_response(response, "获取用户资料").await
    }

    async fn send_friend_request(
        &self,
        other: UserId,
        message: Option<&str>,
    ) -> SocialResult<FriendRequest> {
        info!("[RelationAPI] 📡 发送好友申请 -> {}", other);
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/social/friends/request/{}", other),
            )
            .json(&json!({ "message": message }))
            .send()
            .await?;
        handle_http_response(response, "发送好友申请").await
    }

    async fn accept_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/social/friends/requests/{}/accept", request_id),
            )
            .send()
            .await?;
        handle_http_response(response, "接受好友申请").await
    }

    async fn reject_friend_request(&self, request_id: i64) -> SocialResult<FriendRequest> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/social/friends/requests/{}/reject", request_id),
            )
            .send()
            .await?;
        handle_http_response(response, "拒绝好友申请").await
    }

    async fn list_friend_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<FriendRequest>> {
        self.list(
            "/social/friends/requests",
            &[("type", direction.as_str()), ("status", "pending")],
            "获取好友申请列表",
        )
        .await
    }

    async fn remove_friend(&self, other: UserId) -> SocialResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/social/friends/{}", other))
            .send()
            .await?;
        handle_ack_response(response, "移除好友").await
    }

    async fn follow(&self, other: UserId) -> SocialResult<()> {
        let response = self
            .request(reqwest::Method::POST, &format!("/social/follow/{}", other))
            .send()
            .await?;
        handle_ack_response(response, "关注").await
    }

    async fn unfollow(&self, other: UserId) -> SocialResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/social/follow/{}", other))
            .send()
            .await?;
        handle_ack_response(response, "取消关注").await
    }

    async fn block(&self, other: UserId, reason: Option<&str>) -> SocialResult<()> {
        info!("[RelationAPI] 📡 拉黑用户 {}", other);
        let response = self
            .request(reqwest::Method::POST, &format!("/social/block/{}", other))
            .json(&json!({ "reason": reason }))
            .send()
            .await?;
        handle_ack_response(response, "拉黑").await
    }

    async fn unblock(&self, other: UserId) -> SocialResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/social/block/{}", other))
            .send()
            .await?;
        handle_ack_response(response, "解除拉黑").await
    }

    async fn list_friends(&self) -> SocialResult<Vec<AccountProfile>> {
        self.list("/social/friends", &[], "获取好友列表").await
    }

    async fn list_followers(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
        self.list(
            &format!("/social/users/{}/followers", user_id),
            &[],
            "获取粉丝列表",
        )
        .await
    }

    async fn list_following(&self, user_id: UserId) -> SocialResult<Vec<AccountProfile>> {
        self.list(
            &format!("/social/users/{}/following", user_id),
            &[],
            "获取关注列表",
        )
        .await
    }

    async fn list_blocked(&self) -> SocialResult<Vec<BlockedUser>> {
        self.list("/social/blocked", &[], "获取黑名单").await
    }

    async fn get_stats(&self) -> SocialResult<SocialStats> {
        let response = self
            .request(reqwest::Method::GET, "/social/statistics")
            .send()
            .await?;
        handle_http_response(response, "获取社交统计").await
    }
}
