//! Input validation for API requests.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Canonical hyphenated UUID, as generated for every row id
    static ref ID_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();

    /// Deliberately loose: one `@`, no whitespace, a dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();
}

/// Validate a row id taken from a path or query parameter
pub fn validate_id(id: &str, field: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field));
    }
    if !ID_REGEX.is_match(id) {
        return Err(format!("{} must be a valid id", field));
    }
    Ok(())
}

/// Validate and normalise an email address (trimmed, lowercased)
pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(&email) {
        return Err("Invalid email format".to_string());
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("8f14e45f-ceea-4e7a-9f3b-2a1c5d6e7f80", "id").is_ok());
        assert!(validate_id("8F14E45F-CEEA-4E7A-9F3B-2A1C5D6E7F80", "id").is_ok());
        assert_eq!(validate_id("", "userId").unwrap_err(), "userId is required");
        assert!(validate_id("42", "id").is_err());
        assert!(validate_id("8f14e45f-ceea-4e7a-9f3b-2a1c5d6e7f80; DROP", "id").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ada.Lovelace@School.Test ").unwrap(),
            "ada.lovelace@school.test"
        );
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("two@@school.test").is_err());
        assert!(normalize_email("spaces in@school.test").is_err());
        assert!(normalize_email(&format!("{}@school.test", "a".repeat(260))).is_err());
    }
}
