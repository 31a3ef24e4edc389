//! The access gate run in front of every user-management route.
//!
//! Checks happen in a fixed order and the first failure ends the request:
//! bearer token present, token signature and expiry valid, subject still exists,
//! subject not blocked. The status check reads the store on every request, so blocking an
//! account locks out tokens that were issued before the block.

use rocket::http::Status;
use tracing::{debug, error, warn};

use crate::auth::CurrentUser;
use crate::auth::token::TokenSigner;
use crate::database::user::UserRepository;

/// Terminal outcome of a failed gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    MissingToken,
    InvalidToken,
    UserNotFound,
    Blocked,
    StoreUnavailable,
}

impl GateRejection {
    pub fn status(&self) -> Status {
        match self {
            GateRejection::MissingToken => Status::Forbidden,
            GateRejection::InvalidToken => Status::Forbidden,
            GateRejection::UserNotFound => Status::NotFound,
            GateRejection::Blocked => Status::Forbidden,
            GateRejection::StoreUnavailable => Status::InternalServerError,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GateRejection::MissingToken => "Access denied. No token provided.",
            GateRejection::InvalidToken => "Invalid token.",
            GateRejection::UserNotFound => "User not found",
            GateRejection::Blocked => "User is blocked",
            GateRejection::StoreUnavailable => "Database error",
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

pub async fn authorize(authorization: Option<&str>, signer: &TokenSigner, users: &dyn UserRepository) -> Result<CurrentUser, GateRejection> {
    let token = bearer_token(authorization).ok_or(GateRejection::MissingToken)?;

    let user_id = signer.verify(token).map_err(|reason| {
        debug!(reason = %reason, "token rejected");
        GateRejection::InvalidToken
    })?;

    let user = users
        .get_user_by_id(user_id)
        .await
        .map_err(|e| {
            error!(error = ?e, user_id, "failed to load token subject");
            GateRejection::StoreUnavailable
        })?
        .ok_or_else(|| {
            warn!(user_id, "token subject no longer exists");
            GateRejection::UserNotFound
        })?;

    if user.is_blocked() {
        warn!(user_id, "blocked user attempted access");
        return Err(GateRejection::Blocked);
    }

    debug!(user_id, "authenticated request");
    Ok(CurrentUser {
        id: user.id,
        email: user.email,
    })
}
