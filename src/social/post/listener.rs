//! 帖子监听器回调接口

use crate::social::PostId;
use async_trait::async_trait;

#[async_trait]
pub trait PostListener: Send + Sync {
    /// 帖子点赞数、评论数或评论开关变化，参数为帖子 JSON
    async fn on_post_changed(&self, post_json: String);

    /// 评论树发生变化（加载、新增、点赞、删除），参数为顶层评论 JSON 数组
    async fn on_comments_changed(&self, post_id: PostId, comments_json: String);
}

/// 默认空实现（无操作）
pub struct EmptyPostListener;

#[async_trait]
impl PostListener for EmptyPostListener {
    async fn on_post_changed(&self, _post_json: String) {}
    async fn on_comments_changed(&self, _post_id: PostId, _comments_json: String) {}
}
