use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::Rng;
use unicode_segmentation::UnicodeSegmentation;

use super::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_NAME_GRAPHEMES: usize = 100;
pub const OTP_TTL_SECS: i64 = 10 * 60;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::internal_error("Failed to hash password"))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::internal_error("Invalid password hash"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(100000..=999999))
}

/// Rejects blank names, overly long names and names carrying markup characters.
pub fn validate_display_name(name: &str) -> Result<(), validator::ValidationError> {
    let is_empty_or_whitespace = name.trim().is_empty();
    let is_too_long = name.graphemes(true).count() > MAX_NAME_GRAPHEMES;
    let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
    let contains_forbidden_characters = name.chars().any(|g| forbidden_characters.contains(&g));

    if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
        let mut error = validator::ValidationError::new("invalid_name");
        error.message = Some("Name must be 1-100 characters without markup".into());
        return Err(error);
    }
    Ok(())
}
