//! 宠物转移数据模型

use crate::social::relation::models::AccountProfile;
use crate::social::{PetId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    #[default]
    Gift,
    Sale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Hamster,
    Fish,
    #[default]
    Other,
}

/// 宠物档案（仅保留转移流程关心的字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    /// 当前主人
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub species: Species,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetTransferRequest {
    pub id: i64,
    pub pet_id: PetId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub status: TransferStatus,
    #[serde(default)]
    pub transfer_type: TransferType,
    #[serde(default)]
    pub transfer_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub pet: Pet,
    pub from_user: AccountProfile,
    pub to_user: AccountProfile,
}

/// 已完成转移的历史记录，写入后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetTransferHistory {
    pub id: i64,
    pub pet_id: PetId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub transfer_type: TransferType,
    #[serde(default)]
    pub notes: Option<String>,
    pub from_user: AccountProfile,
    pub to_user: AccountProfile,
}

/// 发起转移的请求体
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTransfer {
    pub to_user_id: UserId,
    pub transfer_type: TransferType,
    pub transfer_reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Accept,
    Reject,
    Cancel,
}

impl TransferAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }

    pub fn outcome(self) -> TransferStatus {
        match self {
            Self::Accept => TransferStatus::Accepted,
            Self::Reject => TransferStatus::Rejected,
            Self::Cancel => TransferStatus::Cancelled,
        }
    }
}

/// 会话内的转移工作集：待处理的收到/发出申请、宠物档案、按宠物分组的历史
#[derive(Debug, Default)]
pub struct TransferBook {
    received: Vec<PetTransferRequest>,
    sent: Vec<PetTransferRequest>,
    pets: HashMap<PetId, Pet>,
    history: HashMap<PetId, Vec<PetTransferHistory>>,
}

impl TransferBook {
    pub fn received(&self) -> &[PetTransferRequest] {
        &self.received
    }

    pub fn sent(&self) -> &[PetTransferRequest] {
        &self.sent
    }

    pub fn set_received(&mut self, requests: Vec<PetTransferRequest>) {
        self.received = requests;
    }

    pub fn set_sent(&mut self, requests: Vec<PetTransferRequest>) {
        self.sent = requests;
    }

    pub fn push_sent(&mut self, request: PetTransferRequest) {
        self.sent.retain(|r| r.id != request.id);
        self.sent.push(request);
    }

    pub fn request(&self, id: i64) -> Option<&PetTransferRequest> {
        self.received
            .iter()
            .chain(self.sent.iter())
            .find(|r| r.id == id)
    }

    /// 从两个待处理集合中移除
    pub fn remove_request(&mut self, id: i64) {
        self.received.retain(|r| r.id != id);
        self.sent.retain(|r| r.id != id);
    }

    pub fn pet(&self, id: PetId) -> Option<&Pet> {
        self.pets.get(&id)
    }

    pub fn put_pet(&mut self, pet: Pet) {
        self.pets.insert(pet.id, pet);
    }

    pub fn history(&self, pet_id: PetId) -> &[PetTransferHistory] {
        self.history.get(&pet_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 追加历史，已存在的 id 保持原样，返回新增条数
    pub fn append_history(&mut self, pet_id: PetId, entries: Vec<PetTransferHistory>) -> usize {
        let log = self.history.entry(pet_id).or_default();
        let before = log.len();
        for entry in entries {
            if !log.iter().any(|h| h.id == entry.id) {
                log.push(entry);
            }
        }
        log.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::post::thread::tests::profile;

    fn history(id: i64, notes: &str) -> PetTransferHistory {
        PetTransferHistory {
            id,
            pet_id: 1,
            from_user_id: 1,
            to_user_id: 2,
            completed_at: Utc::now(),
            created_at: Utc::now(),
            transfer_type: TransferType::Gift,
            notes: Some(notes.into()),
            from_user: profile(1),
            to_user: profile(2),
        }
    }

    #[test]
    fn history_is_append_only() {
        let mut book = TransferBook::default();
        assert_eq!(book.append_history(1, vec![history(1, "first")]), 1);
        // 同 id 的新版本不会覆盖已写入的记录
        assert_eq!(
            book.append_history(1, vec![history(1, "rewritten"), history(2, "second")]),
            1
        );
        let log = book.history(1);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].notes.as_deref(), Some("first"));
        assert_eq!(log[1].id, 2);
        assert!(book.history(9).is_empty());
    }
}
