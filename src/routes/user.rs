use crate::auth::CurrentUser;
use crate::db::SharedUserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{BlockResponse, MessageResponse, UserIdsRequest, UserResponse};
use crate::service::user::UserService;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;

/// List every account, most recent login first
#[openapi(tag = "Users")]
#[get("/")]
pub async fn list_users(users: &State<SharedUserRepository>, _current_user: CurrentUser) -> Result<Json<Vec<UserResponse>>, AppError> {
    let service = UserService::new(users.inner().as_ref());
    Ok(Json(service.list_users().await?))
}

/// Block the selected accounts
///
/// When the caller blocks themselves the response carries `logout: true` and their token
/// stops working on the next request.
#[openapi(tag = "Users")]
#[post("/block", data = "<payload>")]
pub async fn block_users(
    users: &State<SharedUserRepository>,
    current_user: CurrentUser,
    payload: Json<UserIdsRequest>,
) -> Result<Json<BlockResponse>, AppError> {
    let service = UserService::new(users.inner().as_ref());
    Ok(Json(service.block(&current_user, &payload).await?))
}

/// Unblock the selected accounts
#[openapi(tag = "Users")]
#[post("/unblock", data = "<payload>")]
pub async fn unblock_users(
    users: &State<SharedUserRepository>,
    current_user: CurrentUser,
    payload: Json<UserIdsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let service = UserService::new(users.inner().as_ref());
    Ok(Json(service.unblock(&current_user, &payload).await?))
}

/// Permanently delete the selected accounts
#[openapi(tag = "Users")]
#[post("/delete", data = "<payload>")]
pub async fn delete_users(
    users: &State<SharedUserRepository>,
    current_user: CurrentUser,
    payload: Json<UserIdsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let service = UserService::new(users.inner().as_ref());
    Ok(Json(service.delete(&current_user, &payload).await?))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_users, block_users, unblock_users, delete_users]
}
