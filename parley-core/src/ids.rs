use uuid::Uuid;

/// Number of hex characters in a generated id suffix.
pub const SHORT_ID_LEN: usize = 8;

/// `"{prefix}-"` followed by 8 random hex characters, e.g. `conv-1a2b3c4d`.
pub fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &hex[..SHORT_ID_LEN])
}

pub fn session_id() -> String {
    short_id("conv")
}
