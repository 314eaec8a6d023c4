//! Transfers
//!
//! # State Machine
//!
//! ```text
//! PENDING → IN_PROGRESS → COMPLETED
//!    ↓           ↓
//!  FAILED      FAILED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Debit after confirmation**: an external transfer debits the source
//!    only once the partner bank has accepted the claim
//! 2. **No blind retry**: a claim that may have reached the partner is never re-sent
//! 3. **Verify before write**: inbound claims mutate nothing until the signature checks out
//! 4. **CAS transitions**: status writes land only on the status they were computed from

pub mod claim;
pub mod db;
pub mod error;
pub mod inbound;
pub mod internal;
pub mod machine;
pub mod outbound;
pub mod postgres;
pub mod service;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use claim::{TransferClaim, UnverifiedClaim};
pub use db::{MemoryTransferRepository, TransferRepository};
pub use error::TransferError;
pub use inbound::{InboundReceipt, InboundTransferProcessor, serve_key_set};
pub use internal::InternalTransferProcessor;
pub use machine::TransferStateMachine;
pub use outbound::{
    ClaimTransport, DeliveryAttempt, HttpClaimTransport, OutboundTransferProcessor,
    PartnerReceipt, RetryPolicy,
};
pub use postgres::PgTransferRepository;
pub use service::TransferService;
pub use state::TransferStatus;
pub use types::{NewTransfer, StatusEntry, Transfer, TransferId, TransferKind, TransferRequest};
