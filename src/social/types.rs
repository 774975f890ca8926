//! HTTP 层公共结构与响应处理

use crate::social::error::{SocialError, SocialResult};
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, info};

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 列表接口统一的分页包装（`{"items": [...], "total": n}`）
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ItemsResp<T> {
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<i64>,
}

/// 服务器错误响应体
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn message(&self, fallback: &str) -> String {
        match &self.detail {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => fallback.to_string(),
        }
    }
}

/// 通用 HTTP 响应处理函数：检查状态码并反序列化 body
///
/// 非 2xx 响应按状态码映射为 [`SocialError`]，所有 API 都共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> SocialResult<T> {
    let status = response.status();

    // body 只能读取一次
    let body_bytes = response.bytes().await?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        let detail = serde_json::from_slice::<ErrorBody>(&body_bytes)
            .map(|b| b.message(&body_str))
            .unwrap_or_else(|_| body_str.to_string());
        return Err(SocialError::from_status(status, detail));
    }
    info!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        SocialError::from(e)
    })
}

/// 只关心成功与否的响应（ack）
pub async fn handle_ack_response(
    response: reqwest::Response,
    operation_name: &str,
) -> SocialResult<()> {
    let status = response.status();
    if status.is_success() {
        debug!("[HTTP] {}确认成功，HTTP状态: {}", operation_name, status);
        return Ok(());
    }
    handle_http_response::<serde_json::Value>(response, operation_name)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Item {
        id: i64,
    }

    #[test]
    fn items_resp_treats_null_as_empty() {
        let resp: ItemsResp<Item> = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(resp.items.is_empty());
        assert_eq!(resp.total, None);

        let resp: ItemsResp<Item> =
            serde_json::from_str(r#"{"items": [{"id": 3}], "total": 1}"#).unwrap();
        assert_eq!(resp.items[0].id, 3);
    }

    #[test]
    fn error_body_prefers_detail_string() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "已经是好友"}"#).unwrap();
        assert_eq!(body.message("raw"), "已经是好友");
        let body: ErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.message("raw"), "raw");
    }
}
