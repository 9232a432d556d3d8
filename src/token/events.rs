use serde::{Deserialize, Serialize};
use primitive_types::{H160, U256};
use super::TokenEvent;

/// Immutable record of one committed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at zero
    pub sequence: u64,

    /// Account that issued the operation
    pub actor: H160,

    pub event: TokenEvent,

    /// Unix timestamp (seconds)
    pub recorded_at: i64,
}

impl EventRecord {
    pub fn kind(&self) -> &'static str {
        self.event.kind()
    }

    pub fn subjects(&self) -> Vec<H160> {
        self.event.subjects()
    }

    pub fn amount(&self) -> Option<U256> {
        self.event.amount()
    }

    pub fn involves(&self, account: H160) -> bool {
        self.actor == account || self.subjects().contains(&account)
    }
}

/// Append-only event log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning the next sequence number
    pub fn append(&mut self, actor: H160, event: TokenEvent) -> EventRecord {
        let record = EventRecord {
            sequence: self.records.len() as u64,
            actor,
            event,
            recorded_at: chrono::Utc::now().timestamp(),
        };
        self.records.push(record.clone());
        record
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Records with sequence >= `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Records in which `account` acted or was a subject
    pub fn for_account(&self, account: H160) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|record| record.involves(account))
            .collect()
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.records.iter().filter(move |record| record.kind() == kind)
    }

    /// Sequence numbers must be dense and ordered
    pub fn is_consistent(&self) -> bool {
        self.records
            .iter()
            .enumerate()
            .all(|(index, record)| record.sequence == index as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_are_dense() {
        let actor = H160::from_low_u64_be(1);
        let mut log = EventLog::new();

        let first = log.append(actor, TokenEvent::Paused { account: actor });
        let second = log.append(actor, TokenEvent::Unpaused { account: actor });

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(log.len(), 2);
        assert!(log.is_consistent());
        assert_eq!(log.last(), Some(&second));
    }

    #[test]
    fn test_filters() {
        let minter = H160::from_low_u64_be(1);
        let holder = H160::from_low_u64_be(2);
        let stranger = H160::from_low_u64_be(3);
        let mut log = EventLog::new();

        log.append(minter, TokenEvent::Minted { to: holder, amount: U256::from(10) });
        log.append(minter, TokenEvent::Blocked { account: stranger });
        log.append(holder, TokenEvent::Burned { from: holder, amount: U256::from(4) });

        assert_eq!(log.for_account(holder).len(), 2);
        assert_eq!(log.for_account(stranger).len(), 1);
        assert_eq!(log.of_kind("Blocked").count(), 1);
        assert_eq!(log.since(1).len(), 2);
        assert!(log.since(10).is_empty());
        assert!(log.since(u64::MAX).is_empty());

        let minted = &log.records()[0];
        assert_eq!(minted.kind(), "Minted");
        assert_eq!(minted.subjects(), vec![holder]);
        assert_eq!(minted.amount(), Some(U256::from(10)));
    }
}
