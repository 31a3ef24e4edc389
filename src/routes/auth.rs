use crate::auth::token::TokenSigner;
use crate::db::SharedUserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use crate::service::auth::AuthService;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;

/// Register a new account
///
/// The account starts out active. Emails are unique.
#[openapi(tag = "Authentication")]
#[post("/register", data = "<payload>")]
pub async fn register(
    users: &State<SharedUserRepository>,
    signer: &State<TokenSigner>,
    payload: Json<RegisterRequest>,
) -> Result<Custom<Json<MessageResponse>>, AppError> {
    let service = AuthService::new(users.inner().as_ref(), signer.inner());
    service.register(&payload).await?;
    Ok(Custom(Status::Created, Json(MessageResponse::new("User registered successfully"))))
}

/// Log in and obtain a bearer token
///
/// The token is valid for one hour. Blocked accounts cannot log in.
#[openapi(tag = "Authentication")]
#[post("/login", data = "<payload>")]
pub async fn login(users: &State<SharedUserRepository>, signer: &State<TokenSigner>, payload: Json<LoginRequest>) -> Result<Json<LoginResponse>, AppError> {
    let service = AuthService::new(users.inner().as_ref(), signer.inner());
    let token = service.login(&payload).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
    }))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![register, login]
}
