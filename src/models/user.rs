use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use serde_json::Value;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(UserStatus::Active),
            "blocked" => Some(UserStatus::Blocked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

/// Public view of a user. Never carries the password digest.
#[derive(Serialize, Debug, JsonSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            status: user.status,
            last_login: user.last_login,
        }
    }
}

#[derive(Deserialize, Debug, Default, Validate, JsonSchema)]
pub struct RegisterRequest {
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    #[validate(required, length(min = 1))]
    pub email: Option<String>,
    #[validate(required, length(min = 1))]
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default, Validate, JsonSchema)]
pub struct LoginRequest {
    #[validate(required, length(min = 1))]
    pub email: Option<String>,
    #[validate(required, length(min = 1))]
    pub password: Option<String>,
}

/// Reads one entry of a `userIds` selection. Integers and numeric strings are accepted, since
/// browsers post checkbox values as strings; fractions, booleans and the like are not.
pub fn user_id_from_json(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|id| i32::try_from(id).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Selection body shared by block, unblock and delete. `userIds` is kept as raw JSON so that a
/// selection of the wrong shape is reported by the operation itself rather than by the body parser.
#[derive(Deserialize, Debug, Default, JsonSchema)]
pub struct UserIdsRequest {
    #[serde(rename = "userIds")]
    pub user_ids: Option<Value>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct BlockResponse {
    pub message: String,
    /// Present and `true` when the caller blocked their own account and must drop its token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout: Option<bool>,
}
