use crate::auth::token::TokenSigner;
use crate::config::Config;
use crate::database::user::UserRepository;
use crate::db::SharedUserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{User, UserStatus};
use chrono::{DateTime, Duration, Utc};
use rocket::local::asynchronous::Client;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_SECRET: &str = "test-secret";

pub fn test_signer() -> TokenSigner {
    TokenSigner::new(TEST_SECRET, Duration::hours(1))
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.api.enable_swagger = false;
    config
}

/// A rocket client backed by a fresh in-memory store. The store is returned so tests can
/// inspect or tamper with it directly.
pub async fn test_client() -> (Client, Arc<InMemoryUserRepository>) {
    test_client_with_config(test_config()).await
}

pub async fn test_client_with_config(config: Config) -> (Client, Arc<InMemoryUserRepository>) {
    let users = Arc::new(InMemoryUserRepository::default());
    let shared: SharedUserRepository = users.clone();
    let client = Client::tracked(crate::build_rocket_with_repository(config, shared))
        .await
        .expect("valid rocket instance");
    (client, users)
}

#[derive(Default)]
struct Store {
    next_id: i32,
    users: Vec<User>,
}

/// `UserRepository` kept in a `Vec`, with switches to simulate store outages.
#[derive(Default)]
pub struct InMemoryUserRepository {
    store: Mutex<Store>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn insert(&self, name: &str, email: &str, password_hash: &str) -> User {
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        let user = User {
            id: store.next_id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            status: UserStatus::Active,
            last_login: None,
        };
        store.users.push(user.clone());
        user
    }

    pub fn set_last_login(&self, id: i32, at: DateTime<Utc>) {
        let mut store = self.store.lock().unwrap();
        if let Some(user) = store.users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(at);
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().users.len()
    }

    /// Number of mutations that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::db("Database error", sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_write(&self, message: &str) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::db(message, sqlx::Error::PoolTimedOut));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, AppError> {
        self.check_write("Error creating user")?;
        if self.store.lock().unwrap().users.iter().any(|u| u.email == email) {
            return Err(AppError::EmailAlreadyExists);
        }
        Ok(self.insert(name, email, password_hash))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.check_read()?;
        Ok(self.store.lock().unwrap().users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        self.check_read()?;
        Ok(self.store.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.check_read()?;
        let mut users = self.store.lock().unwrap().users.clone();
        // Same order as the SQL: newest login first, never-logged-in last, then by id.
        users.sort_by(|a, b| b.last_login.cmp(&a.last_login).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn record_login(&self, id: i32) -> Result<(), AppError> {
        self.check_write("Failed to update last login")?;
        let now = Utc::now();
        let mut store = self.store.lock().unwrap();
        if let Some(user) = store.users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(user.last_login.map_or(now, |previous| previous.max(now)));
        }
        Ok(())
    }

    async fn set_status(&self, ids: &[i32], status: UserStatus) -> Result<u64, AppError> {
        self.check_write("Failed to update users")?;
        let mut store = self.store.lock().unwrap();
        let mut affected = 0;
        for user in store.users.iter_mut().filter(|u| ids.contains(&u.id)) {
            user.status = status;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete_users(&self, ids: &[i32]) -> Result<u64, AppError> {
        self.check_write("Error deleting users")?;
        let mut store = self.store.lock().unwrap();
        let before = store.users.len();
        store.users.retain(|u| !ids.contains(&u.id));
        Ok((before - store.users.len()) as u64)
    }
}
