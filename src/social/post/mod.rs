//! 帖子互动模块：点赞、评论树

pub mod api;
pub mod listener;
pub mod models;
pub mod service;
pub mod thread;

pub use api::{PostApi, PostRemote};
pub use listener::{EmptyPostListener, PostListener};
pub use models::{Comment, CommentSort, LikeState, Post, Visibility};
pub use service::{CommentService, PostService};
pub use thread::CommentThread;
