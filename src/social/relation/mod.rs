//! 关系模块：好友、关注、拉黑与好友申请

pub mod api;
pub mod dao;
pub mod listener;
pub mod models;
pub mod resolver;
pub mod service;
pub mod store;
pub mod sync;

pub use api::{RelationApi, RelationRemote};
pub use dao::RelationDao;
pub use listener::{EmptyRelationListener, RelationListener};
pub use models::{
    AccountProfile, BlockedUser, FriendRequest, FriendRequestStatus, PrivacyLevel, RelationList,
    RelationSyncerConfig, RelationshipFacts, RelationshipState, RequestDirection, SocialStats,
};
pub use service::RelationService;
pub use store::RelationStore;
pub use sync::{RelationSyncer, SyncReport};
