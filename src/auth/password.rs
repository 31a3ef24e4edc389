use crate::error::app_error::AppError;
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` means the password does not match; `Err` means the stored digest is unusable.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(digest).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::password_hash("Password verification failed", e)),
    }
}

/// Runs [`hash_password`] on the blocking pool; Argon2 is deliberately expensive.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::PasswordHash {
            message: format!("Hashing task failed: {}", e),
        })?
}

pub async fn verify_password_blocking(password: String, digest: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &digest))
        .await
        .map_err(|e| AppError::PasswordHash {
            message: format!("Verification task failed: {}", e),
        })?
}
