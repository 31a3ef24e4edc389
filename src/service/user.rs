use crate::auth::CurrentUser;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{BlockResponse, MessageResponse, UserIdsRequest, UserResponse, UserStatus, user_id_from_json};
use serde_json::Value;
use tracing::info;

pub const NO_USERS_TO_BLOCK: &str = "No users selected";
pub const NO_USERS_TO_UNBLOCK: &str = "No valid user IDs provided for unblocking";
pub const NO_USERS_TO_DELETE: &str = "No users selected for deletion";

pub struct UserService<'a> {
    users: &'a dyn UserRepository,
}

impl<'a> UserService<'a> {
    pub fn new(users: &'a dyn UserRepository) -> Self {
        UserService { users }
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>, AppError> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }

    /// Blocks every listed user. When the caller is among them the response tells the client
    /// to drop its token, since the gate rejects it from the next request on.
    pub async fn block(&self, actor: &CurrentUser, request: &UserIdsRequest) -> Result<BlockResponse, AppError> {
        let ids = selected_ids(request, NO_USERS_TO_BLOCK)?;
        let affected = self.users.set_status(&ids, UserStatus::Blocked).await?;
        info!(actor = actor.id, actor_email = %actor.email, requested = ids.len(), affected, "users blocked");

        if ids.contains(&actor.id) {
            return Ok(BlockResponse {
                message: "You have been blocked and logged out".to_string(),
                logout: Some(true),
            });
        }

        Ok(BlockResponse {
            message: "Users blocked successfully".to_string(),
            logout: None,
        })
    }

    pub async fn unblock(&self, actor: &CurrentUser, request: &UserIdsRequest) -> Result<MessageResponse, AppError> {
        let ids = selected_ids(request, NO_USERS_TO_UNBLOCK)?;
        let affected = self.users.set_status(&ids, UserStatus::Active).await?;
        info!(actor = actor.id, actor_email = %actor.email, requested = ids.len(), affected, "users unblocked");

        Ok(MessageResponse::new("Users unblocked successfully"))
    }

    pub async fn delete(&self, actor: &CurrentUser, request: &UserIdsRequest) -> Result<MessageResponse, AppError> {
        let ids = selected_ids(request, NO_USERS_TO_DELETE)?;
        let affected = self.users.delete_users(&ids).await?;
        info!(actor = actor.id, actor_email = %actor.email, requested = ids.len(), affected, "users deleted");

        Ok(MessageResponse::new("Users deleted successfully"))
    }
}

/// Validates the id selection before any storage access. Absent, empty or non-array selections
/// get the operation specific message.
fn selected_ids(request: &UserIdsRequest, empty_message: &str) -> Result<Vec<i32>, AppError> {
    let values = match request.user_ids.as_ref() {
        Some(Value::Array(values)) if !values.is_empty() => values,
        _ => return Err(AppError::bad_request(empty_message)),
    };

    values
        .iter()
        .map(|value| user_id_from_json(value).ok_or_else(|| AppError::bad_request(format!("Invalid user id: {}", value))))
        .collect()
}
