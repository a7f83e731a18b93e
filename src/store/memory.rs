//! In-memory directory and log.
//!
//! Useful for tests and single-process development runs.
//! Data is lost on restart.

use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MessageLog, ParticipantDirectory, StoreError};
use crate::models::{Message, Participant};

/// In-memory implementation of both storage traits
#[derive(Default)]
pub struct MemoryStore {
    participants: RwLock<HashMap<String, Participant>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantDirectory for MemoryStore {
    async fn upsert_if_absent(&self, name: &str, now_ms: i64) -> Result<Participant, StoreError> {
        let mut participants = self.participants.write().await;

        match participants.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(name.to_string())),
            Entry::Vacant(slot) => Ok(slot.insert(Participant::new(name, now_ms)).clone()),
        }
    }

    async fn heartbeat(&self, name: &str, now_ms: i64) -> Result<i64, StoreError> {
        let mut participants = self.participants.write().await;

        let participant = participants
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        participant.last_status = now_ms.max(participant.last_status + 1);

        Ok(participant.last_status)
    }

    async fn find(&self, name: &str) -> Result<Option<Participant>, StoreError> {
        Ok(self.participants.read().await.get(name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.participants.read().await.values().cloned().collect())
    }

    async fn find_expired(&self, threshold: i64) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .participants
            .read()
            .await
            .values()
            .filter(|p| p.is_expired(threshold))
            .cloned()
            .collect())
    }

    async fn delete_expired(&self, threshold: i64) -> Result<u64, StoreError> {
        let mut participants = self.participants.write().await;
        let before = participants.len();

        participants.retain(|_, p| !p.is_expired(threshold));

        Ok((before - participants.len()) as u64)
    }
}

#[async_trait]
impl MessageLog for MemoryStore {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn query(&self, participant: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.is_visible_to(participant))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageKind;

    fn chat(from: &str, to: &str, text: &str) -> Message {
        Message {
            from: from.to_string(),
            to: to.to_string(),
            text: text.to_string(),
            kind: MessageKind::Message,
            time: "12:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_conflicts_on_second_insert() {
        let store = MemoryStore::new();

        let created = store.upsert_if_absent("alice", 1_000).await.unwrap();
        assert_eq!(created.last_status, 1_000);

        let second = store.upsert_if_absent("alice", 2_000).await;
        assert!(matches!(second, Err(StoreError::Conflict(name)) if name == "alice"));

        // The original record is untouched
        let stored = store.find("alice").await.unwrap().unwrap();
        assert_eq!(stored.last_status, 1_000);
    }

    #[tokio::test]
    async fn test_heartbeat() {
        let store = MemoryStore::new();

        let missing = store.heartbeat("ghost", 1_000).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        store.upsert_if_absent("alice", 1_000).await.unwrap();
        assert_eq!(store.heartbeat("alice", 5_000).await.unwrap(), 5_000);

        // Same or older clock still moves forward
        assert_eq!(store.heartbeat("alice", 5_000).await.unwrap(), 5_001);
        assert_eq!(store.heartbeat("alice", 10).await.unwrap(), 5_002);
    }

    #[tokio::test]
    async fn test_expiry() {
        let store = MemoryStore::new();
        store.upsert_if_absent("old", 1_000).await.unwrap();
        store.upsert_if_absent("edge", 2_000).await.unwrap();
        store.upsert_if_absent("fresh", 3_000).await.unwrap();

        let expired = store.find_expired(2_000).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].name, "old");

        assert_eq!(store.delete_expired(2_000).await.unwrap(), 1);
        assert_eq!(store.delete_expired(2_000).await.unwrap(), 0);

        let mut names: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        names.sort();
        assert_eq!(names, ["edge", "fresh"]);
    }

    #[tokio::test]
    async fn test_query_filters_by_participant() {
        let store = MemoryStore::new();
        store.append(&chat("alice", "Todos", "hello all")).await.unwrap();
        store.append(&chat("bob", "carol", "psst")).await.unwrap();
        store.append(&chat("carol", "alice", "hi alice")).await.unwrap();
        store.append(&chat("alice", "bob", "hi bob")).await.unwrap();

        let texts: Vec<String> = store
            .query("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();

        assert_eq!(texts, ["hello all", "hi alice", "hi bob"]);
    }
}
