//! 宠物转移服务层
//!
//! 与好友申请相同的申请生命周期：发起、接受/拒绝/取消，终态申请移出待处理集合。
//! 接受后宠物归属变更，并从服务器拉取新的历史记录追加到本地日志。

use crate::social::error::{SocialError, SocialResult};
use crate::social::relation::models::RequestDirection;
use crate::social::session::{InFlightKey, SocialContext};
use crate::social::transfer::api::TransferRemote;
use crate::social::transfer::models::{
    NewTransfer, Pet, PetTransferHistory, PetTransferRequest, TransferAction, TransferStatus,
    TransferType,
};
use crate::social::transfer::workflow;
use crate::social::{PetId, UserId};
use std::sync::Arc;
use tracing::{info, warn};

pub struct TransferService {
    api: Arc<dyn TransferRemote>,
    ctx: SocialContext,
}

impl TransferService {
    pub fn new(api: Arc<dyn TransferRemote>, ctx: SocialContext) -> Self {
        Self { api, ctx }
    }

    pub fn pending(&self, direction: RequestDirection) -> Vec<PetTransferRequest> {
        self.ctx.read(|s| match direction {
            RequestDirection::Received => s.transfers.received().to_vec(),
            RequestDirection::Sent => s.transfers.sent().to_vec(),
        })
    }

    pub fn history(&self, pet_id: PetId) -> Vec<PetTransferHistory> {
        self.ctx.read(|s| s.transfers.history(pet_id).to_vec())
    }

    pub async fn load_pet(&self, pet_id: PetId) -> SocialResult<Pet> {
        self.ctx.viewer()?;
        let pet = self.api.get_pet(pet_id).await?;
        self.ctx.write(|s| s.transfers.put_pet(pet.clone()));
        Ok(pet)
    }

    pub async fn load_my_pets(&self) -> SocialResult<Vec<Pet>> {
        self.ctx.viewer()?;
        let pets = self.api.list_my_pets().await?;
        self.ctx.write(|s| {
            for pet in &pets {
                s.transfers.put_pet(pet.clone());
            }
        });
        Ok(pets)
    }

    pub async fn load_pending(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<PetTransferRequest>> {
        self.ctx.viewer()?;
        let requests = self.api.list_transfer_requests(direction).await?;
        self.ctx.write(|s| match direction {
            RequestDirection::Received => s.transfers.set_received(requests.clone()),
            RequestDirection::Sent => s.transfers.set_sent(requests.clone()),
        });
        Ok(requests)
    }

    /// 拉取历史并按 id 追加，已写入的记录不会被改写
    pub async fn load_history(&self, pet_id: PetId) -> SocialResult<Vec<PetTransferHistory>> {
        self.ctx.viewer()?;
        let entries = self.api.pet_history(pet_id).await?;
        let (added, log) = self.ctx.write(|s| {
            let added = s.transfers.append_history(pet_id, entries);
            (added, s.transfers.history(pet_id).to_vec())
        });
        info!(
            "[TransferSvc] 宠物 {} 转移历史新增 {} 条，共 {} 条",
            pet_id,
            added,
            log.len()
        );
        Ok(log)
    }

    pub async fn request_transfer(
        &self,
        pet_id: PetId,
        to_user_id: UserId,
        transfer_type: TransferType,
        reason: Option<String>,
        notes: Option<String>,
    ) -> SocialResult<PetTransferRequest> {
        let viewer = self.ctx.viewer()?;
        let pet = match self.ctx.read(|s| s.transfers.pet(pet_id).cloned()) {
            Some(pet) => pet,
            None => self.load_pet(pet_id).await?,
        };
        workflow::check_new_request(&pet, viewer, to_user_id)?;
        let duplicate = self.ctx.read(|s| {
            s.transfers
                .sent()
                .iter()
                .any(|r| r.pet_id == pet_id && r.status == TransferStatus::Pending)
        });
        if duplicate {
            return Err(SocialError::Conflict(format!(
                "宠物 {} 已有待处理的转移申请",
                pet_id
            )));
        }

        let body = NewTransfer {
            to_user_id,
            transfer_type,
            transfer_reason: reason,
            notes,
        };
        let request = self.api.request_transfer(pet_id, &body).await?;
        info!(
            "[TransferSvc] 📦 转移申请 {} 已发起，宠物: {} -> 用户 {}",
            request.id, pet_id, to_user_id
        );
        self.ctx.write(|s| s.transfers.push_sent(request.clone()));
        Ok(request)
    }

    pub async fn accept(&self, request_id: i64) -> SocialResult<PetTransferRequest> {
        self.respond(request_id, TransferAction::Accept).await
    }

    pub async fn reject(&self, request_id: i64) -> SocialResult<PetTransferRequest> {
        self.respond(request_id, TransferAction::Reject).await
    }

    pub async fn cancel(&self, request_id: i64) -> SocialResult<PetTransferRequest> {
        self.respond(request_id, TransferAction::Cancel).await
    }

    async fn respond(
        &self,
        request_id: i64,
        action: TransferAction,
    ) -> SocialResult<PetTransferRequest> {
        let viewer = self.ctx.viewer()?;
        let _guard = self.ctx.begin(InFlightKey::Transfer(request_id))?;
        // 本地有快照时先校验角色与状态，服务器仍做最终判定
        if let Some(cached) = self.ctx.read(|s| s.transfers.request(request_id).cloned()) {
            workflow::transition(&cached, viewer, action)?;
        }

        let done = self.api.respond_transfer(request_id, action).await?;
        info!(
            "[TransferSvc] 转移申请 {} -> {:?}",
            request_id, done.status
        );
        self.ctx.write(|s| {
            s.transfers.remove_request(request_id);
            if done.status == TransferStatus::Accepted {
                let mut pet = done.pet.clone();
                pet.user_id = done.to_user_id;
                s.transfers.put_pet(pet);
            }
        });

        if done.status == TransferStatus::Accepted {
            if let Err(e) = self.load_history(done.pet_id).await {
                warn!(
                    "[TransferSvc] 转移已完成，但刷新宠物 {} 历史失败: {}",
                    done.pet_id, e
                );
            }
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::memory::MemoryBackend;
    use crate::social::relation::models::PrivacyLevel;
    use crate::social::test_support::init_test_logger;
    use crate::social::transfer::models::Species;

    struct Party {
        id: UserId,
        svc: TransferService,
    }

    fn party(backend: &MemoryBackend, name: &str) -> Party {
        let id = backend.add_user(name, PrivacyLevel::Public);
        let ctx = SocialContext::new();
        ctx.sign_in(id);
        Party {
            id,
            svc: TransferService::new(Arc::new(backend.session(id)), ctx),
        }
    }

    fn setup() -> (MemoryBackend, Party, Party, PetId) {
        init_test_logger();
        let backend = MemoryBackend::new();
        let owner = party(&backend, "owner");
        let adopter = party(&backend, "adopter");
        let pet = backend.add_pet(owner.id, "Mochi", Species::Cat);
        (backend, owner, adopter, pet)
    }

    #[tokio::test]
    async fn accept_moves_ownership_and_appends_history() {
        let (_backend, owner, adopter, pet) = setup();
        let req = owner
            .svc
            .request_transfer(pet, adopter.id, TransferType::Gift, Some("moving".into()), None)
            .await
            .unwrap();
        assert_eq!(req.status, TransferStatus::Pending);
        assert_eq!(owner.svc.pending(RequestDirection::Sent).len(), 1);

        let received = adopter
            .svc
            .load_pending(RequestDirection::Received)
            .await
            .unwrap();
        assert_eq!(received[0].id, req.id);

        let done = adopter.svc.accept(req.id).await.unwrap();
        assert_eq!(done.status, TransferStatus::Accepted);
        assert!(adopter.svc.pending(RequestDirection::Received).is_empty());

        let pet_now = adopter.svc.load_pet(pet).await.unwrap();
        assert_eq!(pet_now.user_id, adopter.id);
        let log = adopter.svc.history(pet);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].from_user_id, owner.id);
        assert_eq!(log[0].to_user_id, adopter.id);

        // 旧主人不能再转移
        owner.svc.load_pet(pet).await.unwrap();
        let err = owner
            .svc
            .request_transfer(pet, adopter.id, TransferType::Gift, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::Forbidden(_)));
    }

    #[tokio::test]
    async fn only_requester_cancels_and_only_recipient_accepts() {
        let (_backend, owner, adopter, pet) = setup();
        let req = owner
            .svc
            .request_transfer(pet, adopter.id, TransferType::Sale, None, None)
            .await
            .unwrap();

        // 发起方本地快照中有申请，本地即拒绝
        assert!(matches!(
            owner.svc.accept(req.id).await.unwrap_err(),
            SocialError::Forbidden(_)
        ));
        // 接收方未加载列表，交由服务器判定
        assert!(matches!(
            adopter.svc.cancel(req.id).await.unwrap_err(),
            SocialError::Forbidden(_)
        ));

        let cancelled = owner.svc.cancel(req.id).await.unwrap();
        assert_eq!(cancelled.status, TransferStatus::Cancelled);
        assert!(owner.svc.pending(RequestDirection::Sent).is_empty());
        assert!(matches!(
            adopter.svc.accept(req.id).await.unwrap_err(),
            SocialError::Conflict(_)
        ));
        assert!(adopter.svc.history(pet).is_empty());
    }

    #[tokio::test]
    async fn reject_keeps_owner_and_writes_no_history() {
        let (_backend, owner, adopter, pet) = setup();
        let req = owner
            .svc
            .request_transfer(pet, adopter.id, TransferType::Gift, None, None)
            .await
            .unwrap();
        adopter.svc.load_pending(RequestDirection::Received).await.unwrap();
        adopter.svc.reject(req.id).await.unwrap();

        assert_eq!(owner.svc.load_pet(pet).await.unwrap().user_id, owner.id);
        assert!(owner.svc.load_history(pet).await.unwrap().is_empty());
        assert!(owner
            .svc
            .load_pending(RequestDirection::Sent)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let (_backend, owner, adopter, pet) = setup();
        assert!(matches!(
            owner
                .svc
                .request_transfer(pet, owner.id, TransferType::Gift, None, None)
                .await
                .unwrap_err(),
            SocialError::Validation(_)
        ));
        assert!(matches!(
            adopter
                .svc
                .request_transfer(pet, owner.id, TransferType::Gift, None, None)
                .await
                .unwrap_err(),
            SocialError::Forbidden(_)
        ));

        owner
            .svc
            .request_transfer(pet, adopter.id, TransferType::Gift, None, None)
            .await
            .unwrap();
        assert!(matches!(
            owner
                .svc
                .request_transfer(pet, adopter.id, TransferType::Gift, None, None)
                .await
                .unwrap_err(),
            SocialError::Conflict(_)
        ));
    }
}
