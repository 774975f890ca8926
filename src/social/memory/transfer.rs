use super::{HistoryRecord, MemorySession, TransferRecord, World};
use crate::social::error::{SocialError, SocialResult};
use crate::social::relation::models::RequestDirection;
use crate::social::transfer::api::TransferRemote;
use crate::social::transfer::models::{
    NewTransfer, Pet, PetTransferHistory, PetTransferRequest, TransferAction, TransferStatus,
};
use crate::social::transfer::workflow;
use crate::social::PetId;
use async_trait::async_trait;
use tracing::debug;

impl World {
    fn pet(&self, pet_id: PetId) -> SocialResult<&Pet> {
        self.pets
            .get(&pet_id)
            .ok_or_else(|| SocialError::NotFound(format!("宠物 {}", pet_id)))
    }

    fn transfer_request(&self, t: &TransferRecord) -> SocialResult<PetTransferRequest> {
        Ok(PetTransferRequest {
            id: t.id,
            pet_id: t.pet_id,
            from_user_id: t.from,
            to_user_id: t.to,
            status: t.status,
            transfer_type: t.transfer_type,
            transfer_reason: t.reason.clone(),
            notes: t.notes.clone(),
            created_at: t.created_at,
            pet: self.pet(t.pet_id)?.clone(),
            from_user: self.profile(t.from)?,
            to_user: self.profile(t.to)?,
        })
    }

    fn history_entry(&self, h: &HistoryRecord) -> SocialResult<PetTransferHistory> {
        Ok(PetTransferHistory {
            id: h.id,
            pet_id: h.pet_id,
            from_user_id: h.from,
            to_user_id: h.to,
            completed_at: h.completed_at,
            created_at: h.created_at,
            transfer_type: h.transfer_type,
            notes: h.notes.clone(),
            from_user: self.profile(h.from)?,
            to_user: self.profile(h.to)?,
        })
    }
}

#[async_trait]
impl TransferRemote for MemorySession {
    async fn get_pet(&self, pet_id: PetId) -> SocialResult<Pet> {
        self.lock().pet(pet_id).cloned()
    }

    async fn list_my_pets(&self) -> SocialResult<Vec<Pet>> {
        let w = self.lock();
        Ok(w.pets
            .values()
            .filter(|p| p.user_id == self.viewer)
            .cloned()
            .collect())
    }

    async fn request_transfer(
        &self,
        pet_id: PetId,
        transfer: &NewTransfer,
    ) -> SocialResult<PetTransferRequest> {
        let mut w = self.lock();
        let pet = w.pet(pet_id)?.clone();
        workflow::check_new_request(&pet, self.viewer, transfer.to_user_id)?;
        w.user(transfer.to_user_id)?;
        let pending = w
            .transfers
            .values()
            .any(|t| t.pet_id == pet_id && t.status == TransferStatus::Pending);
        if pending {
            return Err(SocialError::Conflict(format!(
                "宠物 {} 已有待处理的转移申请",
                pet_id
            )));
        }

        let id = w.next_id();
        let created_at = w.now();
        w.transfers.insert(
            id,
            TransferRecord {
                id,
                pet_id,
                from: self.viewer,
                to: transfer.to_user_id,
                status: TransferStatus::Pending,
                transfer_type: transfer.transfer_type,
                reason: transfer.transfer_reason.clone(),
                notes: transfer.notes.clone(),
                created_at,
            },
        );
        debug!(
            "[MemoryBackend] 转移申请 {}: 宠物 {} {} -> {}",
            id, pet_id, self.viewer, transfer.to_user_id
        );
        let record = &w.transfers[&id];
        w.transfer_request(record)
    }

    async fn respond_transfer(
        &self,
        request_id: i64,
        action: TransferAction,
    ) -> SocialResult<PetTransferRequest> {
        let mut w = self.lock();
        let current = {
            let record = w
                .transfers
                .get(&request_id)
                .ok_or_else(|| SocialError::NotFound(format!("转移申请 {}", request_id)))?;
            w.transfer_request(record)?
        };
        let status = workflow::transition(&current, self.viewer, action)?;

        let at = w.now();
        if status == TransferStatus::Accepted {
            if w.pet(current.pet_id)?.user_id != current.from_user_id {
                return Err(SocialError::Conflict("宠物已不属于发起方".into()));
            }
            if let Some(pet) = w.pets.get_mut(&current.pet_id) {
                pet.user_id = current.to_user_id;
            }
            let history_id = w.next_id();
            w.history.push(HistoryRecord {
                id: history_id,
                pet_id: current.pet_id,
                from: current.from_user_id,
                to: current.to_user_id,
                transfer_type: current.transfer_type,
                notes: current.notes.clone(),
                created_at: current.created_at,
                completed_at: at,
            });
        }
        if let Some(record) = w.transfers.get_mut(&request_id) {
            record.status = status;
        }
        let record = &w.transfers[&request_id];
        w.transfer_request(record)
    }

    async fn list_transfer_requests(
        &self,
        direction: RequestDirection,
    ) -> SocialResult<Vec<PetTransferRequest>> {
        let w = self.lock();
        w.transfers
            .values()
            .rev()
            .filter(|t| t.status == TransferStatus::Pending)
            .filter(|t| match direction {
                RequestDirection::Received => t.to == self.viewer,
                RequestDirection::Sent => t.from == self.viewer,
            })
            .map(|t| w.transfer_request(t))
            .collect()
    }

    async fn pet_history(&self, pet_id: PetId) -> SocialResult<Vec<PetTransferHistory>> {
        let w = self.lock();
        w.pet(pet_id)?;
        w.history
            .iter()
            .filter(|h| h.pet_id == pet_id)
            .map(|h| w.history_entry(h))
            .collect()
    }
}
