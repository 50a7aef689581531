//! Input validation and output escaping. Everything here runs before the
//! store is touched.

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
// Bounds argon2 work per request.
const MAX_PASSWORD_LEN: usize = 1024;
const MAX_USERNAME_LEN: usize = 64;
const MAX_FIELD_LEN: usize = 255;
const MAX_AGE: i64 = 200;
pub const MAX_MESSAGE_LEN: usize = 10_000;

/// Parse a person id: 1 to 10 ASCII digits, at most 2^31 - 1.
pub fn person_id(raw: &str) -> Result<i64, ApiError> {
    const INVALID: ApiError = ApiError::BadRequest("invalid id");

    if raw.is_empty() || raw.len() > 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(INVALID);
    }
    let id: i64 = raw.parse().map_err(|_| INVALID)?;
    if id > i64::from(i32::MAX) {
        return Err(INVALID);
    }
    Ok(id)
}

/// Empty means unknown; otherwise a whole number of years.
pub fn age(raw: &str) -> Result<Option<i64>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<i64>() {
        Ok(age) if (0..=MAX_AGE).contains(&age) => Ok(Some(age)),
        _ => Err(ApiError::BadRequest("invalid age")),
    }
}

/// `[A-Za-z0-9_.-]{1,64}`. Usernames are echoed into forum listings, so
/// nothing with markup meaning gets in.
pub fn username(raw: &str) -> Result<&str, ApiError> {
    let allowed = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-');
    if raw.is_empty() || raw.len() > MAX_USERNAME_LEN || !raw.bytes().all(allowed) {
        return Err(ApiError::BadRequest("invalid username"));
    }
    Ok(raw)
}

pub fn password(password: &str, repeat: &str) -> Result<(), ApiError> {
    if password != repeat {
        return Err(ApiError::BadRequest("password does not match"));
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN || len > MAX_PASSWORD_LEN {
        return Err(ApiError::BadRequest("password must be at least 8 characters"));
    }
    Ok(())
}

/// Free-text person fields (name, mail).
pub fn field(raw: &str) -> Result<&str, ApiError> {
    if raw.chars().count() > MAX_FIELD_LEN {
        return Err(ApiError::BadRequest("field too long"));
    }
    Ok(raw)
}

/// Validate a forum message and escape it for storage.
pub fn message(raw: &str) -> Result<String, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("empty message"));
    }
    if raw.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::BadRequest("message too long"));
    }
    Ok(escape_html(raw))
}

/// Escape text for HTML content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    html_escape::encode_safe(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_id_grammar() {
        assert_eq!(person_id("0").unwrap(), 0);
        assert_eq!(person_id("42").unwrap(), 42);
        assert_eq!(person_id("2147483647").unwrap(), 2_147_483_647);

        for bad in ["", "-1", "1.5", "abc", "1 OR 1=1", "2147483648", "99999999999", "+1"] {
            assert!(person_id(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn age_is_optional() {
        assert_eq!(age("").unwrap(), None);
        assert_eq!(age(" 31 ").unwrap(), Some(31));
        assert!(age("-3").is_err());
        assert!(age("old").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(password("longenough", "longenough").is_ok());
        assert!(password("longenough", "different!").is_err());
        assert!(password("short", "short").is_err());
    }

    #[test]
    fn username_rules() {
        assert!(username("alice").is_ok());
        assert!(username("").is_err());
        assert!(username(&"x".repeat(65)).is_err());
        assert!(username("a.b-c_9").is_ok());
        assert!(username("bad\nname").is_err());
        assert!(username("<script>x</script>").is_err());
        assert!(username("two words").is_err());
        assert!(username("ümlaut").is_err());
    }

    #[test]
    fn escape_html_neutralises_markup() {
        let escaped = escape_html("<script>alert('x & \"y\"')</script>");

        assert!(escaped.starts_with("&lt;script&gt;"));
        assert!(escaped.contains("&amp;"));
        assert!(!escaped.contains(['<', '>', '"', '\'']));
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn message_rejects_blank() {
        assert!(message("").is_err());
        assert!(message("   ").is_err());
        assert_eq!(message("<b>hi").unwrap(), "&lt;b&gt;hi");
    }
}
