//! 宠物社交平台的关系与内容互动引擎
//!
//! - [`relation`]：好友、关注、拉黑及好友申请，关系快照的解析与缓存
//! - [`privacy`]：资料与帖子的可见性判定
//! - [`post`]：帖子点赞与评论树
//! - [`transfer`]：宠物转移申请的状态机
//! - [`memory`]：进程内参考后端，执行全部服务器侧规则
//! - [`client`]：把以上服务装配在同一个会话上下文里的门面

pub mod client;
pub mod db;
pub mod error;
pub mod memory;
pub mod post;
pub mod privacy;
pub mod relation;
pub mod session;
pub mod transfer;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub type UserId = i64;
pub type PostId = i64;
pub type CommentId = i64;
pub type PetId = i64;
