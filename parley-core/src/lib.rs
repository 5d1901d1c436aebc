pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;

pub use client::{ConversationClient, DEFAULT_LAST_N};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LoggingConfig, ParleyConfig, ServiceConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, ParleyError};
pub use models::{
    ContextSnapshot, ConversationSummary, Message, MessageInput, NewUser, RelevantFact, Role,
    SessionSearchResult, SessionSummary, User,
};
