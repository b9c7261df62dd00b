pub mod comment;
pub mod post;

use uuid::Uuid;

/// Parse a caller-supplied identifier in the store's identifier format.
///
/// Returns `None` for anything that is not a UUID. Callers treat that as
/// "no such record" rather than as an error.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::now_v7();
        assert_eq!(parse_id(&id.to_string()), Some(id));
        assert_eq!(parse_id(&format!(" {id} ")), Some(id));
        assert_eq!(parse_id("650f0b7f1a2d3a1c12345678"), None);
        assert_eq!(parse_id(""), None);
    }
}
