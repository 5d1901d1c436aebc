pub mod context;
pub mod message;
pub mod session;
pub mod user;

pub use context::{ContextSnapshot, ConversationSummary, RelevantFact};
pub use message::{Message, MessageInput, Role};
pub use session::{SessionSearchResult, SessionSummary};
pub use user::{NewUser, User};

/// Free-form metadata attached to users, sessions and messages.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
