pub mod social;

// 重新导出常用类型，方便外部使用
pub use social::{
    client::{ClientConfig, Remotes, SocialClient},
    error::{SocialError, SocialResult},
    memory::{MemoryBackend, MemorySession},
    session::{Credentials, SocialContext},
    CommentId, PetId, PostId, UserId,
};
