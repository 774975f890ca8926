//! 关系监听器回调接口

use crate::social::UserId;
use async_trait::async_trait;

/// 关系监听器回调接口
#[async_trait]
pub trait RelationListener: Send + Sync {
    /// 与某个用户的关系快照已重新解析，参数为 RelationshipFacts JSON
    async fn on_relationship_changed(&self, user_id: UserId, relationship_json: String);

    /// 好友列表发生变更（新增或更新），参数为 JSON 数组字符串
    async fn on_friend_list_changed(&self, friends_json: String);

    /// 黑名单列表发生变更，参数为 JSON 数组字符串
    async fn on_black_list_changed(&self, blacks_json: String);

    /// 好友申请列表发生变更，参数为 JSON 数组字符串
    async fn on_friend_request_list_changed(&self, requests_json: String);

    /// 依赖关系集合的列表视图已失效，参数为列表名 JSON 数组
    async fn on_lists_invalidated(&self, lists_json: String);
}

/// 默认空实现（无操作）
pub struct EmptyRelationListener;

#[async_trait]
impl RelationListener for EmptyRelationListener {
    async fn on_relationship_changed(&self, _user_id: UserId, _relationship_json: String) {
        // 默认不做任何处理
    }

    async fn on_friend_list_changed(&self, _friends_json: String) {
        // 默认不做任何处理
    }

    async fn on_black_list_changed(&self, _blacks_json: String) {
        // 默认不做任何处理
    }

    async fn on_friend_request_list_changed(&self, _requests_json: String) {
        // 默认不做任何处理
    }

    async fn on_lists_invalidated(&self, _lists_json: String) {
        // 默认不做任何处理
    }
}
