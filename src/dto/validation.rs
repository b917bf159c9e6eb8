//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted, counted in characters after trimming.
pub const MAX_DISPLAY_NAME_CHARS: usize = 40;

/// Validates that a display name is non-blank once trimmed and not overly long.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Alice")    // Ok
/// validate_display_name("  Bob  ")  // Ok, trimmed by the service
/// validate_display_name("   ")      // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name cannot be empty".into());
        return Err(err);
    }

    let chars = trimmed.chars().count();
    if chars > MAX_DISPLAY_NAME_CHARS {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!("Display name must be at most {MAX_DISPLAY_NAME_CHARS} characters (got {chars})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("display_name_format");
        err.message = Some("Display name cannot contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Alice").is_ok());
        assert!(validate_display_name("  Bob  ").is_ok());
        assert!(validate_display_name("Zoë Müller").is_ok());
    }

    #[test]
    fn test_validate_display_name_blank() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("\t\n").is_err());
    }

    #[test]
    fn test_validate_display_name_invalid_format() {
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME_CHARS + 1)).is_err());
        assert!(validate_display_name("bad\u{7}name").is_err());
    }
}
