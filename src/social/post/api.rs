//! 帖子/评论 HTTP API 客户端
//!
//! 负责所有帖子互动相关的 HTTP 请求

use crate::social::error::SocialResult;
use crate::social::post::models::{Comment, CommentSort, LikeState, NewComment, Post};
use crate::social::types::{handle_http_response, ItemsResp};
use crate::social::{CommentId, PostId};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

/// 帖子互动的远程接口
#[async_trait]
pub trait PostRemote: Send + Sync {
    async fn get_post(&self, post_id: PostId) -> SocialResult<Post>;

    /// 帖子作者开关评论
    async fn set_comments_enabled(&self, post_id: PostId, enabled: bool) -> SocialResult<Post>;

    async fn like_post(&self, post_id: PostId) -> SocialResult<LikeState>;

    async fn unlike_post(&self, post_id: PostId) -> SocialResult<LikeState>;

    /// 返回完整评论树
    async fn list_comments(&self, post_id: PostId, sort: CommentSort)
        -> SocialResult<Vec<Comment>>;

    async fn add_comment(&self, post_id: PostId, comment: &NewComment) -> SocialResult<Comment>;

    async fn like_comment(&self, comment_id: CommentId) -> SocialResult<LikeState>;

    async fn unlike_comment(&self, comment_id: CommentId) -> SocialResult<LikeState>;

    /// 返回软删除后的评论
    async fn delete_comment(
        &self,
        comment_id: CommentId,
        reason: Option<&str>,
    ) -> SocialResult<Comment>;
}

/// 帖子相关的 HTTP API 客户端
pub struct PostApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl PostApi {
    /// `client` 应该已经在外部配置好认证头
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url(path);
        debug!("[PostAPI]   {} {}, 操作ID: {}", method, url, operation_id);
        self.client
            .request(method, url)
            .header("X-Request-ID", operation_id)
    }
}

#[async_trait]
impl PostRemote for PostApi {
    async fn get_post(&self, post_id: PostId) -> SocialResult<Post> {
        let response = self
            .request(reqwest::Method::GET, &format!("/posts/{}", post_id))
            .send()
            .await?;
        handle_http_response(response, "获取帖子").await
    }

    async fn set_comments_enabled(&self, post_id: PostId, enabled: bool) -> SocialResult<Post> {
        info!("[PostAPI] 📡 设置帖子 {} 评论开关: {}", post_id, enabled);
        let response = self
            .request(reqwest::Method::PUT, &format!("/posts/{}", post_id))
            .json(&json!({ "comments_enabled": enabled }))
            .send()
            .await?;
        handle_http_response(response, "设置评论开关").await
    }

    async fn like_post(&self, post_id: PostId) -> SocialResult<LikeState> {
        let response = self
            .request(reqwest::Method::POST, &format!("/posts/{}/like", post_id))
            .send()
            .await?;
        handle_http_response(response, "点赞帖子").await
    }

    async fn unlike_post(&self, post_id: PostId) -> SocialResult<LikeState> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/posts/{}/like", post_id))
            .send()
            .await?;
        handle_http_response(response, "取消点赞帖子").await
    }

    async fn list_comments(
        &self,
        post_id: PostId,
        sort: CommentSort,
    ) -> SocialResult<Vec<Comment>> {
        info!(
            "[PostAPI] 📡 请求评论树，帖子: {}, 排序: {}",
            post_id,
            sort.as_str()
        );
        let response = self
            .request(reqwest::Method::GET, &format!("/posts/{}/comments", post_id))
            .query(&[("sort_by", sort.as_str())])
            .send()
            .await?;
        let resp: ItemsResp<Comment> = handle_http_response(response, "获取评论").await?;
        Ok(resp.items)
    }

    async fn add_comment(&self, post_id: PostId, comment: &NewComment) -> SocialResult<Comment> {
        let response = self
            .request(reqwest::Method::POST, &format!("/posts/{}/comments", post_id))
            .json(comment)
            .send()
            .await?;
        handle_http_response(response, "发表评论").await
    }

    async fn like_comment(&self, comment_id: CommentId) -> SocialResult<LikeState> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/posts/comments/{}/like", comment_id),
            )
            .send()
            .await?;
        handle_http_response(response, "点赞评论").await
    }

    async fn unlike_comment(&self, comment_id: CommentId) -> SocialResult<LikeState> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/posts/comments/{}/like", comment_id),
            )
            .send()
            .await?;
        handle_http_response(response, "取消点赞评论").await
    }

    async fn delete_comment(
        &self,
        comment_id: CommentId,
        reason: Option<&str>,
    ) -> SocialResult<Comment> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/posts/comments/{}", comment_id),
            )
            .json(&json!({ "reason": reason }))
            .send()
            .await?;
        handle_http_response(response, "删除评论").await
    }
}
