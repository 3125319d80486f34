mod memory;

pub use memory::MemoryConversationStore;

use chrono::Duration;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::error::GatewayError;
use crate::models::conversation::ConversationSet;

/// Cross-device sync cache: the latest conversation set per user.
///
/// Every operation validates its input before touching state, so a rejected
/// call never mutates the store. Writes are last-writer-wins.
pub trait ConversationStore: Send + Sync {
    /// The stored set for `user_id`, or an empty one if nothing was synced.
    fn get(&self, user_id: &str) -> Result<ConversationSet, GatewayError>;

    /// Replaces the whole set for `user_id` and returns what was stored.
    fn sync(&self, user_id: &str, conversations: Value) -> Result<ConversationSet, GatewayError>;

    /// Forgets `user_id`. Deleting an unknown user is a no-op.
    fn delete(&self, user_id: &str) -> Result<(), GatewayError>;
}

/// Growth bounds for a store. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StoreLimits {
    pub max_users: Option<usize>,
    pub ttl: Option<Duration>,
}

impl StoreLimits {
    pub fn from_args(args: &Args) -> Self {
        Self {
            max_users: Some(args.store_max_users).filter(|n| *n > 0),
            ttl: Some(args.store_ttl_secs)
                .filter(|secs| *secs > 0)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(Duration::try_seconds),
        }
    }
}

pub fn create_conversation_store(
    args: &Args
) -> Result<Arc<dyn ConversationStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "memory" => {
            let limits = StoreLimits::from_args(args);
            info!(
                "Conversations will be kept in memory (max users: {}, ttl: {})",
                limits.max_users.map_or("unbounded".to_string(), |n| n.to_string()),
                limits.ttl.map_or("none".to_string(), |t| format!("{}s", t.num_seconds()))
            );
            Ok(Arc::new(MemoryConversationStore::new(limits)))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported conversation store type: {}", args.store_type)
                    )
                )
            ),
    }
}
