//! 宠物转移模块

pub mod api;
pub mod models;
pub mod service;
pub mod workflow;

pub use api::{TransferApi, TransferRemote};
pub use models::{
    NewTransfer, Pet, PetTransferHistory, PetTransferRequest, Species, TransferAction,
    TransferBook, TransferStatus, TransferType,
};
pub use service::TransferService;
