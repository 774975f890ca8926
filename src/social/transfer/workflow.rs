//! 转移状态机：pending -> {accepted, rejected, cancelled}，终态不可再迁移

use crate::social::error::{SocialError, SocialResult};
use crate::social::transfer::models::{Pet, PetTransferRequest, TransferAction, TransferStatus};
use crate::social::UserId;

/// 发起转移前的检查
pub fn check_new_request(pet: &Pet, requester: UserId, to_user_id: UserId) -> SocialResult<()> {
    if to_user_id == requester {
        return Err(SocialError::Validation("不能把宠物转移给自己".into()));
    }
    if pet.user_id != requester {
        return Err(SocialError::Forbidden(format!("宠物 {} 不属于你", pet.id)));
    }
    Ok(())
}

/// 校验操作者身份与当前状态，返回迁移后的状态
///
/// 取消只能由发起方操作，接受/拒绝只能由接收方操作。
pub fn transition(
    request: &PetTransferRequest,
    actor: UserId,
    action: TransferAction,
) -> SocialResult<TransferStatus> {
    if request.status.is_terminal() {
        return Err(SocialError::Conflict(format!(
            "转移申请 {} 已处于终态 {:?}",
            request.id, request.status
        )));
    }
    let allowed = match action {
        TransferAction::Cancel => actor == request.from_user_id,
        TransferAction::Accept | TransferAction::Reject => actor == request.to_user_id,
    };
    if !allowed {
        return Err(SocialError::Forbidden(format!(
            "无权对转移申请 {} 执行 {}",
            request.id,
            action.as_str()
        )));
    }
    Ok(action.outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::post::thread::tests::profile;
    use crate::social::transfer::models::{Species, TransferType};
    use chrono::Utc;

    fn pet() -> Pet {
        Pet {
            id: 3,
            user_id: 1,
            name: "Mochi".into(),
            species: Species::Cat,
        }
    }

    fn request(status: TransferStatus) -> PetTransferRequest {
        PetTransferRequest {
            id: 9,
            pet_id: 3,
            from_user_id: 1,
            to_user_id: 2,
            status,
            transfer_type: TransferType::Gift,
            transfer_reason: None,
            notes: None,
            created_at: Utc::now(),
            pet: pet(),
            from_user: profile(1),
            to_user: profile(2),
        }
    }

    #[test]
    fn roles_gate_each_transition() {
        let pending = request(TransferStatus::Pending);
        assert_eq!(
            transition(&pending, 2, TransferAction::Accept),
            Ok(TransferStatus::Accepted)
        );
        assert_eq!(
            transition(&pending, 2, TransferAction::Reject),
            Ok(TransferStatus::Rejected)
        );
        assert_eq!(
            transition(&pending, 1, TransferAction::Cancel),
            Ok(TransferStatus::Cancelled)
        );
        assert!(matches!(
            transition(&pending, 1, TransferAction::Accept),
            Err(SocialError::Forbidden(_))
        ));
        assert!(matches!(
            transition(&pending, 2, TransferAction::Cancel),
            Err(SocialError::Forbidden(_))
        ));
        assert!(matches!(
            transition(&pending, 7, TransferAction::Reject),
            Err(SocialError::Forbidden(_))
        ));
    }

    #[test]
    fn terminal_states_are_final() {
        for status in [
            TransferStatus::Accepted,
            TransferStatus::Rejected,
            TransferStatus::Cancelled,
        ] {
            let req = request(status);
            for (actor, action) in [
                (2, TransferAction::Accept),
                (2, TransferAction::Reject),
                (1, TransferAction::Cancel),
            ] {
                assert!(matches!(
                    transition(&req, actor, action),
                    Err(SocialError::Conflict(_))
                ));
            }
        }
    }

    #[test]
    fn new_request_checks_ownership_and_target() {
        assert!(check_new_request(&pet(), 1, 2).is_ok());
        assert!(matches!(
            check_new_request(&pet(), 1, 1),
            Err(SocialError::Validation(_))
        ));
        assert!(matches!(
            check_new_request(&pet(), 5, 2),
            Err(SocialError::Forbidden(_))
        ));
    }
}
