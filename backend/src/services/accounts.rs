//! Account service for signup, login and token management

use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{
    normalize_email, validate_login_form, validate_signup_form, LoginForm, SignupForm,
    UserAccount, UserProfile,
};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::external::{RegistrationHook, RegistrationPayload};

// ============================================================================
// User store
// ============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up an account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>>;

    /// Insert a new account; fails with `DuplicateEntry` if the email exists
    async fn add_user(&self, account: UserAccount) -> AppResult<()>;
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

/// User row from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    location: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        UserAccount {
            profile: UserProfile {
                id: row.id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                location: row.location,
            },
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, phone, location, password_hash, created_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(UserAccount::from))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, phone, location, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(UserAccount::from))
    }

    async fn add_user(&self, account: UserAccount) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, location, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.profile.id)
        .bind(&account.profile.name)
        .bind(&account.profile.email)
        .bind(&account.profile.phone)
        .bind(&account.profile.location)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateEntry("email".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process user store, used when no database is configured
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        Ok(self.users.read().await.get(&normalize_email(email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|account| account.id() == id)
            .cloned())
    }

    async fn add_user(&self, account: UserAccount) -> AppResult<()> {
        let key = normalize_email(account.email());
        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }
        users.insert(key, account);
        Ok(())
    }
}

// ============================================================================
// Account service
// ============================================================================

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: i64,
    pub iat: i64,
}

/// Response after signup or login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    webhook: Arc<dyn RegistrationHook>,
    jwt_secret: String,
    access_token_expiry: i64,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        webhook: Arc<dyn RegistrationHook>,
        jwt: &JwtConfig,
    ) -> Self {
        Self {
            store,
            webhook,
            jwt_secret: jwt.secret.clone(),
            access_token_expiry: jwt.access_token_expiry,
        }
    }

    /// Register a new account and sign it in
    pub async fn signup(&self, form: SignupForm) -> AppResult<AuthResponse> {
        validate_signup_form(&form).map_err(AppError::FormValidation)?;

        if self.store.find_by_email(&form.email).await?.is_some() {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&form.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let profile = UserProfile {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            location: form.location.trim().to_string(),
        };

        // Forward before persisting; a rejected webhook aborts the signup
        self.webhook
            .notify(&RegistrationPayload::from(&profile))
            .await?;

        self.store
            .add_user(UserAccount {
                profile: profile.clone(),
                password_hash,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(user_id = %profile.id, "New account registered");

        self.issue(profile)
    }

    /// Authenticate with email and password
    pub async fn login(&self, form: LoginForm) -> AppResult<AuthResponse> {
        validate_login_form(&form).map_err(AppError::FormValidation)?;

        let profile = self
            .authenticate(&form.email, &form.password)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        tracing::info!(user_id = %profile.id, "User logged in");

        self.issue(profile)
    }

    /// Password-free profile when the credentials match
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<Option<UserProfile>> {
        let Some(account) = self.store.find_by_email(email).await? else {
            return Ok(None);
        };

        let valid = verify(password, &account.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        Ok(valid.then_some(account.profile))
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(|account| account.profile)
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode_token(token, &self.jwt_secret)
    }

    fn issue(&self, user: UserProfile) -> AppResult<AuthResponse> {
        let access_token = self.generate_token(user.id)?;

        Ok(AuthResponse {
            user,
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    fn generate_token(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}

/// Decode and verify an HS256 access token
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::InvalidToken
    })?;

    Ok(token_data.claims)
}
