//! 社交引擎错误类型
//!
//! 所有对外操作统一返回 [`SocialResult`]，调用方根据错误种类决定提示文案，
//! 失败的变更不会修改任何本地缓存。

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocialError {
    /// 重复请求、已是好友、状态已终结等
    #[error("冲突: {0}")]
    Conflict(String),

    /// 拉黑关系、评论已关闭、操作者身份不符
    #[error("无权操作: {0}")]
    Forbidden(String),

    /// 资源不存在（对方拉黑自己时也返回此错误，避免泄露拉黑状态）
    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("网络错误: {0}")]
    Network(String),
}

pub type SocialResult<T> = Result<T, SocialError>;

impl SocialError {
    /// 根据 HTTP 状态码与服务器返回的 detail 映射错误种类
    pub fn from_status(status: StatusCode, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            StatusCode::CONFLICT => Self::Conflict(detail),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Forbidden(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(detail),
            other => Self::Network(format!("HTTP {}: {}", other, detail)),
        }
    }

    /// 是否为读取类可容忍的错误（保留旧快照）
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for SocialError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for SocialError {
    fn from(e: serde_json::Error) -> Self {
        Self::Network(format!("响应解析失败: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            SocialError::from_status(StatusCode::CONFLICT, "dup"),
            SocialError::Conflict("dup".into())
        );
        assert!(matches!(
            SocialError::from_status(StatusCode::FORBIDDEN, "x"),
            SocialError::Forbidden(_)
        ));
        assert!(matches!(
            SocialError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "x"),
            SocialError::Validation(_)
        ));
        assert!(SocialError::from_status(StatusCode::BAD_GATEWAY, "x").is_transient());
    }
}
