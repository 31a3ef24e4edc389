use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::token::TokenSigner;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{LoginRequest, RegisterRequest};
use tracing::{error, info, warn};
use validator::Validate;

pub const MISSING_REGISTRATION_FIELDS: &str = "Please provide all required fields";
pub const MISSING_LOGIN_FIELDS: &str = "Please provide both email and password";

pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
    signer: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    pub fn new(users: &'a dyn UserRepository, signer: &'a TokenSigner) -> Self {
        AuthService { users, signer }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), AppError> {
        request.validate().map_err(|_| AppError::bad_request(MISSING_REGISTRATION_FIELDS))?;
        let (Some(name), Some(email), Some(password)) = (request.name.as_deref(), request.email.as_deref(), request.password.as_deref()) else {
            return Err(AppError::bad_request(MISSING_REGISTRATION_FIELDS));
        };

        if self.users.get_user_by_email(email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let digest = hash_password_blocking(password.to_string()).await?;
        let user = self.users.create_user(name, email, &digest).await?;

        info!(user_id = user.id, "user registered");
        Ok(())
    }

    /// Checks run in a fixed order: unknown email, blocked account, wrong password.
    /// Only a fully successful login touches `last_login`. Returns the signed token.
    pub async fn login(&self, request: &LoginRequest) -> Result<String, AppError> {
        request.validate().map_err(|_| AppError::bad_request(MISSING_LOGIN_FIELDS))?;
        let (Some(email), Some(password)) = (request.email.as_deref(), request.password.as_deref()) else {
            return Err(AppError::bad_request(MISSING_LOGIN_FIELDS));
        };

        let user = self.users.get_user_by_email(email).await?.ok_or(AppError::UserNotFound)?;

        if user.is_blocked() {
            return Err(AppError::AccountBlocked);
        }

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login with incorrect password");
            return Err(AppError::IncorrectPassword);
        }

        let token = self.signer.issue(user.id)?;

        if let Err(e) = self.users.record_login(user.id).await {
            error!(error = ?e, user_id = user.id, "failed to update last login");
        }

        info!(user_id = user.id, "user logged in");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryUserRepository, test_signer};

    fn register_request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn registered_user_can_log_in() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);

        service.register(&register_request("Ann", "a@x.com", "p1")).await.unwrap();
        let token = service.login(&login_request("a@x.com", "p1")).await.unwrap();

        let registered = users.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(signer.verify(&token), Ok(registered.id));
        let stored = users.get_user_by_id(registered.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
        assert_ne!(stored.password_hash, "p1");
    }

    #[tokio::test]
    async fn duplicate_email_adds_no_row() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);

        service.register(&register_request("Ann", "a@x.com", "p1")).await.unwrap();
        let err = service.register(&register_request("Other", "a@x.com", "p2")).await.unwrap_err();

        assert!(matches!(err, AppError::EmailAlreadyExists));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn missing_registration_fields_are_rejected() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);

        let request = RegisterRequest {
            name: Some("Ann".to_string()),
            email: None,
            password: Some("p1".to_string()),
        };
        let err = service.register(&request).await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_REGISTRATION_FIELDS);

        let err = service.register(&register_request("", "a@x.com", "p1")).await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_REGISTRATION_FIELDS);
        assert_eq!(users.len(), 0);
    }

    #[tokio::test]
    async fn wrong_password_leaves_last_login_untouched() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);
        service.register(&register_request("Ann", "a@x.com", "p1")).await.unwrap();

        let err = service.login(&login_request("a@x.com", "nope")).await.unwrap_err();
        assert!(matches!(err, AppError::IncorrectPassword));

        let stored = users.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert!(stored.last_login.is_none());
    }

    #[tokio::test]
    async fn unknown_email_and_blank_fields() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);

        let err = service.login(&login_request("ghost@x.com", "p1")).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));

        let err = service.login(&login_request("a@x.com", "")).await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_LOGIN_FIELDS);
    }

    #[tokio::test]
    async fn blocked_user_cannot_log_in() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);
        service.register(&register_request("Ann", "a@x.com", "p1")).await.unwrap();
        let ann = users.get_user_by_email("a@x.com").await.unwrap().unwrap();
        users.set_status(&[ann.id], crate::models::user::UserStatus::Blocked).await.unwrap();

        let err = service.login(&login_request("a@x.com", "p1")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountBlocked));
        assert!(users.get_user_by_id(ann.id).await.unwrap().unwrap().last_login.is_none());
    }

    #[tokio::test]
    async fn last_login_failure_does_not_fail_login() {
        let users = InMemoryUserRepository::default();
        let signer = test_signer();
        let service = AuthService::new(&users, &signer);
        service.register(&register_request("Ann", "a@x.com", "p1")).await.unwrap();

        users.fail_writes(true);
        let token = service.login(&login_request("a@x.com", "p1")).await.unwrap();
        assert!(!token.is_empty());
    }
}
