//! Serialized access to one ledger for concurrent callers
//!
//! Writes hold the write lock for the whole operation, so every transaction is
//! observed either completely or not at all; reads share the read lock.

use crate::token::rpc::{self, RpcResult, TokenRequest};
use crate::token::{CappedToken, EventRecord, Role, TokenResult, TokenTransaction};
use primitive_types::{H160, U256};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct LedgerService {
    ledger: Arc<RwLock<CappedToken>>,
    events_tx: broadcast::Sender<EventRecord>,
}

impl LedgerService {
    pub fn new(token: CappedToken) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ledger: Arc::new(RwLock::new(token)),
            events_tx,
        }
    }

    /// Receive every event committed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events_tx.subscribe()
    }

    /// Apply one transaction under the write lock
    pub async fn execute(&self, caller: H160, tx: TokenTransaction) -> TokenResult<Option<EventRecord>> {
        let mut ledger = self.ledger.write().await;
        let record = ledger.execute_transaction(caller, tx)?;
        if let Some(record) = &record {
            self.publish(record);
        }
        Ok(record)
    }

    /// Decode and run a JSON request, routing reads through the read lock
    pub async fn call(&self, caller: H160, method: &str, params: &Value) -> RpcResult<Value> {
        match rpc::decode_request(method, params)? {
            TokenRequest::Query(query) => {
                let ledger = self.ledger.read().await;
                Ok(rpc::answer_query(&ledger, &query))
            }
            TokenRequest::Transaction(tx) => {
                let record = self.execute(caller, tx).await?;
                Ok(rpc::encode_receipt(record.as_ref()))
            }
        }
    }

    /// Run a closure against a consistent view of the ledger
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CappedToken) -> R,
    {
        let ledger = self.ledger.read().await;
        f(&ledger)
    }

    pub async fn balance_of(&self, account: H160) -> U256 {
        self.read(|ledger| ledger.balance_of(account)).await
    }

    pub async fn total_supply(&self) -> U256 {
        self.read(|ledger| ledger.total_supply()).await
    }

    pub async fn is_blocked(&self, account: H160) -> bool {
        self.read(|ledger| ledger.is_blocked(account)).await
    }

    pub async fn has_role(&self, role: Role, account: H160) -> bool {
        self.read(|ledger| ledger.has_role(role, account)).await
    }

    /// Copy of the current state, e.g. for persistence
    pub async fn snapshot(&self) -> CappedToken {
        self.ledger.read().await.clone()
    }

    fn publish(&self, record: &EventRecord) {
        // no subscribers is fine
        if self.events_tx.send(record.clone()).is_err() {
            tracing::trace!("No subscribers for event #{}", record.sequence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenError, TokenEvent};
    use serde_json::json;

    fn owner() -> H160 {
        H160::from_low_u64_be(1)
    }

    fn service() -> LedgerService {
        let mut token =
            CappedToken::new("Hypmydata".to_string(), "HYP".to_string(), U256::from(100_000_000), owner())
                .unwrap();
        token.mint(owner(), owner(), U256::from(50_000_000)).unwrap();
        LedgerService::new(token)
    }

    #[tokio::test]
    async fn test_execute_publishes_committed_events() {
        let service = service();
        let mut events = service.subscribe();
        let other = H160::from_low_u64_be(2);

        service
            .execute(owner(), TokenTransaction::Transfer { to: other, amount: U256::from(1000) })
            .await
            .unwrap();
        let rejected = service.execute(other, TokenTransaction::Pause).await;
        assert!(matches!(rejected, Err(TokenError::Unauthorized { .. })));
        service.execute(owner(), TokenTransaction::Pause).await.unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(
            first.event,
            TokenEvent::Transfer { from: owner(), to: other, amount: U256::from(1000) }
        );
        let second = events.recv().await.unwrap();
        assert_eq!(second.event, TokenEvent::Paused { account: owner() });
        assert_eq!(second.sequence, first.sequence + 1);

        assert_eq!(service.balance_of(other).await, U256::from(1000));
    }

    #[tokio::test]
    async fn test_concurrent_transfers_are_serialized() {
        let service = service();
        let mut handles = Vec::new();

        for i in 0..50u64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let to = H160::from_low_u64_be(100 + i);
                service
                    .execute(owner(), TokenTransaction::Transfer { to, amount: U256::from(1000) })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(service.balance_of(owner()).await, U256::from(50_000_000 - 50 * 1000));
        assert_eq!(service.total_supply().await, U256::from(50_000_000));
        let snapshot = service.snapshot().await;
        assert!(snapshot.verify_invariants().is_ok());
        assert_eq!(snapshot.events().len(), 4 + 1 + 50);
    }

    #[tokio::test]
    async fn test_call_routes_queries_and_transactions() {
        let service = service();
        let target = format!("0x{:x}", H160::from_low_u64_be(7));

        let receipt = service
            .call(owner(), "blockAccount", &json!({ "account": target }))
            .await
            .unwrap();
        assert_eq!(receipt["event"]["kind"], "Blocked");

        let answer = service
            .call(owner(), "isBlocked", &json!({ "account": target }))
            .await
            .unwrap();
        assert_eq!(answer["blocked"], true);
        assert!(service.is_blocked(H160::from_low_u64_be(7)).await);
        assert!(service.has_role(Role::Blocker, owner()).await);
    }
}
