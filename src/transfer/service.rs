//! Entry point for everything transfer-related the gateway exposes.

use super::error::TransferError;
use super::inbound::{InboundReceipt, InboundTransferProcessor};
use super::internal::InternalTransferProcessor;
use super::machine::TransferStateMachine;
use super::outbound::OutboundTransferProcessor;
use super::types::{Transfer, TransferId, TransferKind, TransferRequest};
use crate::account::AccountLedger;

#[derive(Clone)]
pub struct TransferService {
    ledger: AccountLedger,
    machine: TransferStateMachine,
    internal: InternalTransferProcessor,
    outbound: OutboundTransferProcessor,
    inbound: InboundTransferProcessor,
}

impl TransferService {
    pub fn new(
        ledger: AccountLedger,
        machine: TransferStateMachine,
        internal: InternalTransferProcessor,
        outbound: OutboundTransferProcessor,
        inbound: InboundTransferProcessor,
    ) -> Self {
        Self {
            ledger,
            machine,
            internal,
            outbound,
            inbound,
        }
    }

    /// Route by destination prefix: our own prefix is internal, anything else external.
    pub async fn submit(
        &self,
        req: &TransferRequest,
        user_id: i64,
    ) -> Result<Transfer, TransferError> {
        match TransferKind::classify(&req.to_account, self.ledger.bank_prefix())? {
            TransferKind::Internal => self.internal.process(req, user_id).await,
            TransferKind::External { .. } => self.outbound.process(req, user_id).await,
        }
    }

    pub async fn internal(
        &self,
        req: &TransferRequest,
        user_id: i64,
    ) -> Result<Transfer, TransferError> {
        self.internal.process(req, user_id).await
    }

    pub async fn external(
        &self,
        req: &TransferRequest,
        user_id: i64,
    ) -> Result<Transfer, TransferError> {
        self.outbound.process(req, user_id).await
    }

    pub async fn receive_claim(&self, token: &str) -> Result<InboundReceipt, TransferError> {
        self.inbound.receive_claim(token).await
    }

    /// Transfers touching any of the user's accounts, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Transfer>, TransferError> {
        let accounts = self.owned_account_numbers(user_id).await?;
        self.machine.repository().list_by_accounts(&accounts).await
    }

    /// `NotFound` unless one of the user's accounts is a party to the transfer.
    pub async fn get_for_user(
        &self,
        id: TransferId,
        user_id: i64,
    ) -> Result<Transfer, TransferError> {
        let transfer = self.machine.get(id).await?;
        let accounts = self.owned_account_numbers(user_id).await?;
        if !transfer.involves_any(&accounts) {
            return Err(TransferError::NotFound(format!("Transfer {}", id)));
        }
        Ok(transfer)
    }

    async fn owned_account_numbers(&self, user_id: i64) -> Result<Vec<String>, TransferError> {
        Ok(self
            .ledger
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|a| a.account_number)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CurrencyConverter;
    use crate::transfer::outbound::RetryPolicy;
    use crate::transfer::state::TransferStatus;
    use crate::transfer::testing::{Fixture, MockTransport};
    use std::sync::Arc;

    fn service(f: &Fixture) -> TransferService {
        let internal = InternalTransferProcessor::new(
            f.ledger.clone(),
            f.machine.clone(),
            Arc::new(CurrencyConverter::default()),
        );
        TransferService::new(
            f.ledger.clone(),
            f.machine.clone(),
            internal,
            f.outbound.clone(),
            f.inbound.clone(),
        )
    }

    #[tokio::test]
    async fn test_submit_routes_by_prefix() {
        let transport = Arc::new(MockTransport::accepting("Bob"));
        let f = Fixture::new(transport.clone(), RetryPolicy::default());
        let svc = service(&f);
        let a = f.open(1, 500).await;
        let b = f.open(2, 0).await;

        let internal = svc.submit(&f.request(&a, &b, 100), 1).await.unwrap();
        assert!(!internal.is_external);
        assert_eq!(transport.calls(), 0);

        let external = svc.submit(&f.request(&a, "TST000111", 100), 1).await.unwrap();
        assert!(external.is_external);
        assert_eq!(external.status, TransferStatus::Completed);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_queries_are_scoped_to_parties() {
        let f = Fixture::new(Arc::new(MockTransport::accepting("Bob")), RetryPolicy::default());
        let svc = service(&f);
        let a = f.open(1, 500).await;
        let b = f.open(2, 0).await;
        let _c = f.open(3, 0).await;

        let t = svc.internal(&f.request(&a, &b, 50), 1).await.unwrap();

        assert_eq!(svc.list_for_user(1).await.unwrap().len(), 1);
        assert_eq!(svc.list_for_user(2).await.unwrap().len(), 1);
        assert!(svc.list_for_user(3).await.unwrap().is_empty());

        assert_eq!(svc.get_for_user(t.id, 2).await.unwrap().id, t.id);
        assert_eq!(
            svc.get_for_user(t.id, 3).await.unwrap_err().code(),
            "NotFound"
        );
    }

    #[tokio::test]
    async fn test_external_endpoint_refuses_local_destination() {
        let f = Fixture::new(Arc::new(MockTransport::accepting("Bob")), RetryPolicy::default());
        let svc = service(&f);
        let a = f.open(1, 500).await;
        let b = f.open(2, 0).await;

        assert_eq!(
            svc.external(&f.request(&a, &b, 10), 1).await.unwrap_err(),
            TransferError::UseInternalEndpoint
        );
    }
}
