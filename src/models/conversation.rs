use serde_json::Value;
use std::fmt;

use crate::error::GatewayError;

/// A client-defined conversation document, stored and returned verbatim.
pub type Conversation = Value;

/// Everything one user has synced, in client order.
pub type ConversationSet = Vec<Conversation>;

pub const USER_ID_REQUIRED: &str = "userId query param is required";
pub const SYNC_PAYLOAD_REQUIRED: &str = "Invalid payload: { userId, conversations[] } required";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Opaque key; the only check is that it is not empty.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if raw.is_empty() {
            return Err(GatewayError::invalid(USER_ID_REQUIRED));
        }
        Ok(Self(raw.to_string()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts only a JSON array; objects, scalars and null are rejected.
pub fn conversation_set(value: Value) -> Result<ConversationSet, GatewayError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(GatewayError::invalid(SYNC_PAYLOAD_REQUIRED)),
    }
}
