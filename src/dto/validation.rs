//! Validation helpers for DTOs.

use validator::ValidationError;

const PLAYER_KEY_LENGTH: usize = 10;
const ROOM_CODE_MAX_LENGTH: usize = 16;

/// Validates that a player key is a 10-digit phone number that does not start with `0`.
///
/// # Examples
///
/// ```ignore
/// validate_player_key("9876543210") // Ok
/// validate_player_key("0876543210") // Err - leading zero
/// validate_player_key("987654321")  // Err - too short
/// ```
pub fn validate_player_key(key: &str) -> Result<(), ValidationError> {
    if key.len() != PLAYER_KEY_LENGTH {
        let mut err = ValidationError::new("player_key_length");
        err.message = Some(
            format!(
                "Player key must be exactly {PLAYER_KEY_LENGTH} digits (got {})",
                key.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !key.chars().all(|c| c.is_ascii_digit()) || key.starts_with('0') {
        let mut err = ValidationError::new("player_key_format");
        err.message = Some("Player key must be a phone number without a leading zero".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code is between 1 and 16 ASCII alphanumeric characters.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty()
        || code.len() > ROOM_CODE_MAX_LENGTH
        || !code.chars().all(|c| c.is_ascii_alphanumeric())
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some(
            format!("Room code must be 1 to {ROOM_CODE_MAX_LENGTH} alphanumeric characters").into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates that a session identifier is a positive decimal number.
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    match id.parse::<u64>() {
        Ok(value) if value > 0 => Ok(()),
        _ => {
            let mut err = ValidationError::new("session_id_format");
            err.message = Some("Session ID must be a positive integer".into());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_key_valid() {
        assert!(validate_player_key("9876543210").is_ok());
        assert!(validate_player_key("1000000000").is_ok());
    }

    #[test]
    fn test_validate_player_key_invalid_length() {
        assert!(validate_player_key("987654321").is_err()); // too short
        assert!(validate_player_key("98765432100").is_err()); // too long
        assert!(validate_player_key("").is_err()); // empty
    }

    #[test]
    fn test_validate_player_key_invalid_format() {
        assert!(validate_player_key("0876543210").is_err()); // leading zero
        assert!(validate_player_key("98765x3210").is_err()); // letter
        assert!(validate_player_key("+987654321").is_err()); // sign
    }

    #[test]
    fn test_validate_room_code() {
        assert!(validate_room_code("42").is_ok());
        assert!(validate_room_code("friends2024").is_ok());
        assert!(validate_room_code("").is_err());
        assert!(validate_room_code("with space").is_err());
        assert!(validate_room_code("abcdefghijklmnopq").is_err()); // 17 chars
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("1").is_ok());
        assert!(validate_session_id("1024").is_ok());
        assert!(validate_session_id("0").is_err());
        assert!(validate_session_id("-3").is_err());
        assert!(validate_session_id("abc").is_err());
    }
}
