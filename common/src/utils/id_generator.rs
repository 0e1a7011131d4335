//! Unique ID generator.

use uuid::Uuid;

/// Generates unique identifiers.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates a unique request ID.
    pub fn request_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_unique() {
        let id1 = IdGenerator::request_id();
        let id2 = IdGenerator::request_id();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
    }
}
