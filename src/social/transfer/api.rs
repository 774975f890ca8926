//! 宠物转移 HTTP API 客户端

use crate::social::error::SocialResult;
use crate::social::relation::models::RequestDirection;
use crate::social::transfer::models::{
    NewTransfer, Pet, PetTransferHistory, PetTransferRequest, TransferAction,
};
use crate::social::types::{handle_http_response, ItemsResp};
use crate::social::PetId;
use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

#[async_trait]
pub trait TransferRemote: Send + Sync {
    async fn get_pet(&self, pet_id: PetId) -> SocialResult<Pet>;

    /// 当前用户名下的宠物
    async fn list_my_pets(&self) -> SocialResult<Vec<Pet>>;

    async fn request_transfer(
        &self,
        pet_id: PetId,
        transfer: &NewTransfer,
    ) -> SocialResult<PetTransferRequest>;

    /// 接受/拒绝/取消，返回处于终态的申请
    async fn respond_transfer(
        &self,
        request_id: i64,
        action: TransferAction,
    ) -> SocialResult<PetTransferRequest>;

    /// 待处理的转移申请
    async fn list_transfer_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<PetTransferRequest>>;

    async fn pet_history(&self, pet_id: PetId) -> SocialResult<Vec<PetTransferHistory>>;
}

pub struct TransferApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl TransferApi {
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.api_base_url, path);
        debug!("[TransferAPI]   {} {}, 操作ID: {}", method, url, operation_id);
        self.client
            .request(method, url)
            .header("X-Request-ID", operation_id)
    }
}

#[async_trait]
impl TransferRemote for TransferApi {
    async fn get_pet(&self, pet_id: PetId) -> SocialResult<Pet> {
        let response = self
            .request(reqwest::Method::GET, &format!("/pets/{}", pet_id))
            .send()
            .await?;
        handle_http_response(response, "获取宠物").await
    }

    async fn list_my_pets(&self) -> SocialResult<Vec<Pet>> {
        let response = self.request(reqwest::Method::GET, "/pets").send().await?;
        let resp: ItemsResp<Pet> = handle_http_response(response, "获取宠物列表").await?;
        Ok(resp.items)
    }

    async fn request_transfer(
        &self,
        pet_id: PetId,
        transfer: &NewTransfer,
    ) -> SocialResult<PetTransferRequest> {
        info!(
            "[TransferAPI] 📡 发起宠物转移，宠物: {}, 接收方: {}",
            pet_id, transfer.to_user_id
        );
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/pet-transfer/pets/{}/transfer/request", pet_id),
            )
            .json(transfer)
            .send()
            .await?;
        handle_http_response(response, "发起宠物转移").await
    }

    async fn respond_transfer(
        &self,
        request_id: i64,
        action: TransferAction,
    ) -> SocialResult<PetTransferRequest> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/pet-transfer/transfer/{}/{}", request_id, action.as_str()),
            )
            .send()
            .await?;
        handle_http_response(response, "处理宠物转移").await
    }

    async fn list_transfer_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<PetTransferRequest>> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/pet-transfer/transfer/requests/{}", direction.as_str()),
            )
            .query(&[("status", "pending")])
            .send()
            .await?;
        let resp: ItemsResp<PetTransferRequest> =
            handle_http_response(response, "获取转移申请列表").await?;
        Ok(resp.items)
    }

    async fn pet_history(&self, pet_id: PetId) -> SocialResult<Vec<PetTransferHistory>> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/pet-transfer/pets/{}/transfer/history", pet_id),
            )
            .send()
            .await?;
        // 该接口直接返回数组
        handle_http_response(response, "获取宠物转移历史").await
    }
}
