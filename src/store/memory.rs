#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use chrono::{ DateTime, Utc };
use log::{ debug, info };
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{ Mutex, MutexGuard };

use super::{ ConversationStore, StoreLimits };
use crate::error::GatewayError;
use crate::models::conversation::{ conversation_set, ConversationSet, UserId, SYNC_PAYLOAD_REQUIRED };

struct StoredSet {
    conversations: ConversationSet,
    synced_at: DateTime<Utc>,
}

/// Process-lifetime store. The map sits behind a single mutex, each
/// operation takes it once and never awaits while holding it.
pub struct MemoryConversationStore {
    entries: Mutex<HashMap<UserId, StoredSet>>,
    limits: StoreLimits,
}

impl MemoryConversationStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            limits,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, StoredSet>>, GatewayError> {
        self.entries
            .lock()
            .map_err(|_| GatewayError::Internal("conversation store lock poisoned".to_string()))
    }

    fn is_expired(&self, entry: &StoredSet, now: DateTime<Utc>) -> bool {
        match self.limits.ttl {
            Some(ttl) => now - entry.synced_at > ttl,
            None => false,
        }
    }

    fn purge_expired(&self, entries: &mut HashMap<UserId, StoredSet>, now: DateTime<Utc>) {
        if self.limits.ttl.is_none() {
            return;
        }
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired conversation set(s)", purged);
        }
    }

    /// Makes room for one more user by dropping the least recently synced one.
    fn evict_for(&self, entries: &mut HashMap<UserId, StoredSet>, incoming: &UserId) {
        let Some(max_users) = self.limits.max_users else {
            return;
        };
        if entries.contains_key(incoming) {
            return;
        }
        while entries.len() >= max_users {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.synced_at)
                .map(|(user, _)| user.clone());
            match oldest {
                Some(user) => {
                    entries.remove(&user);
                    info!("Store at capacity ({} users), evicted {}", max_users, user);
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryConversationStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl ConversationStore for MemoryConversationStore {
    fn get(&self, user_id: &str) -> Result<ConversationSet, GatewayError> {
        let user = UserId::parse(user_id)?;
        let entries = self.lock()?;
        let now = Utc::now();

        Ok(match entries.get(&user) {
            Some(entry) if !self.is_expired(entry, now) => entry.conversations.clone(),
            _ => Vec::new(),
        })
    }

    fn sync(&self, user_id: &str, conversations: Value) -> Result<ConversationSet, GatewayError> {
        let user = UserId::parse(user_id)
            .map_err(|_| GatewayError::invalid(SYNC_PAYLOAD_REQUIRED))?;
        let conversations = conversation_set(conversations)?;

        let mut entries = self.lock()?;
        let now = Utc::now();
        self.purge_expired(&mut entries, now);
        self.evict_for(&mut entries, &user);

        debug!("Synced {} conversation(s) for {}", conversations.len(), user);
        entries.insert(user, StoredSet {
            conversations: conversations.clone(),
            synced_at: now,
        });

        Ok(conversations)
    }

    fn delete(&self, user_id: &str) -> Result<(), GatewayError> {
        let user = UserId::parse(user_id)?;
        let mut entries = self.lock()?;
        self.purge_expired(&mut entries, Utc::now());

        if entries.remove(&user).is_some() {
            debug!("Deleted conversations for {}", user);
        }
        Ok(())
    }
}
