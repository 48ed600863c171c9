//! Unique ID generator.

use uuid::Uuid;

/// Generates unique identifiers for sessions and requests.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates a unique session ID for an accepted TCP connection.
    pub fn session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generates a unique request ID.
    pub fn request_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_unique() {
        assert_ne!(IdGenerator::session_id(), IdGenerator::session_id());
    }
}
