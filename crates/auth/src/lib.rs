//! Admin authentication.
//!
//! A single admin identity is configured by email and argon2 hash. Logins
//! are rate limited per email and per client address, produce an HS256 JWT
//! backed by an `admin_sessions` row, and can be revoked by blacklisting the
//! exact token string. State-changing admin requests additionally spend a
//! one-time CSRF token bound to the session.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use pharmacy_config::AuthConfig;
use pharmacy_database::format_timestamp;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

pub mod jwt;

pub use jwt::{AdminClaims, JwtManager};

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

const CSRF_TOKEN_LENGTH: usize = 32;
const LOGIN_ATTEMPT_RETENTION_HOURS: i64 = 24;
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;
const RATE_LIMITED_REASON: &str = "rate_limited";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("admin login is not configured")]
    AdminNotConfigured,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("too many login attempts, retry in {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: i64 },
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("token has been revoked")]
    TokenRevoked,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid csrf token")]
    InvalidCsrfToken,
    #[error("token signing failed: {0}")]
    Token(jsonwebtoken::errors::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
}

/// Where a request came from. Both fields are best effort.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminSession {
    pub token: String,
    pub session_id: String,
    pub email: String,
    pub expires_at: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifiedAdmin {
    pub email: String,
    pub session_id: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CsrfToken {
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CleanupReport {
    pub blacklisted_tokens: u64,
    pub csrf_tokens: u64,
    pub login_attempts: u64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LoginAttempt {
    pub email: String,
    pub ip_address: Option<String>,
    pub success: bool,
    pub reason: Option<String>,
    pub attempted_at: String,
}

#[derive(Clone)]
struct AdminCredential {
    email: String,
    password_hash: String,
}

#[derive(Clone)]
pub struct AdminAuthenticator {
    pool: SqlitePool,
    admin: Option<AdminCredential>,
    jwt: Arc<JwtManager>,
    token_ttl: Duration,
    csrf_ttl: Duration,
    login_window: Duration,
    max_login_attempts: i64,
}

impl AdminAuthenticator {
    /// Build the authenticator. Without `jwt_secret` a random per-process
    /// secret is used, so tokens do not survive a restart.
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let secret = match config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                warn!("auth.jwt_secret is not set, generating an ephemeral signing key");
                random_alphanumeric(64).into_bytes()
            }
        };

        let admin = match (&config.admin_email, &config.admin_password_hash) {
            (Some(email), Some(hash)) => Some(AdminCredential {
                email: email.trim().to_lowercase(),
                password_hash: hash.clone(),
            }),
            _ => None,
        };

        Self {
            pool,
            admin,
            jwt: Arc::new(JwtManager::new(&secret, config.jwt_issuer.clone())),
            token_ttl: seconds(config.token_ttl_seconds),
            csrf_ttl: seconds(config.csrf_ttl_seconds),
            login_window: seconds(config.login_window_seconds),
            max_login_attempts: i64::from(config.max_login_attempts.max(1)),
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn is_configured(&self) -> bool {
        self.admin.is_some()
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AdminSession, AuthError> {
        let admin = self.admin.as_ref().ok_or(AuthError::AdminNotConfigured)?;
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        let window_start = now - self.login_window;
        let (failures, oldest): (i64, Option<String>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), MIN(attempted_at) FROM login_attempts
            WHERE success = false
              AND (reason IS NULL OR reason != ?)
              AND attempted_at >= ?
              AND (email = ? OR (? IS NOT NULL AND ip_address = ?))
            "#,
        )
        .bind(RATE_LIMITED_REASON)
        .bind(format_timestamp(window_start))
        .bind(&email)
        .bind(&client.ip)
        .bind(&client.ip)
        .fetch_one(&self.pool)
        .await?;

        if failures >= self.max_login_attempts {
            let retry_after_seconds = oldest
                .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
                .map(|oldest| (oldest.with_timezone(&Utc) + self.login_window - now).num_seconds())
                .unwrap_or_else(|| self.login_window.num_seconds())
                .max(1);
            self.record_attempt(&email, client, false, Some(RATE_LIMITED_REASON))
                .await?;
            warn!(email = %email, ip = ?client.ip, failures, "admin login rate limited");
            return Err(AuthError::RateLimited { retry_after_seconds });
        }

        if email != admin.email || !verify_password(password, &admin.password_hash)? {
            self.record_attempt(&email, client, false, Some("invalid_credentials"))
                .await?;
            warn!(email = %email, ip = ?client.ip, "admin login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let session_id = CUID.create_id();
        let expires_at = now + self.token_ttl;
        let token = self.jwt.issue(&admin.email, &session_id, now, expires_at)?;
        let created_at = format_timestamp(now);

        sqlx::query(
            r#"
            INSERT INTO admin_sessions (public_id, token, admin_email, ip_address, user_agent, created_at, expires_at, last_seen_at, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, true)
            "#,
        )
        .bind(&session_id)
        .bind(&token)
        .bind(&admin.email)
        .bind(&client.ip)
        .bind(&client.user_agent)
        .bind(&created_at)
        .bind(format_timestamp(expires_at))
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.record_attempt(&email, client, true, None).await?;
        let csrf = self.issue_csrf_token(&session_id).await?;
        info!(session = %session_id, ip = ?client.ip, "admin logged in");

        Ok(AdminSession {
            token,
            session_id,
            email: admin.email.clone(),
            expires_at: format_timestamp(expires_at),
            csrf_token: csrf.token,
        })
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedAdmin, AuthError> {
        let claims = self.jwt.validate(token)?;

        if self.is_blacklisted(token).await? {
            return Err(AuthError::TokenRevoked);
        }

        let session: Option<(String, String, String)> = sqlx::query_as(
            "SELECT public_id, admin_email, expires_at FROM admin_sessions WHERE token = ? AND is_active = true",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((session_id, email, expires_at)) = session else {
            return Err(AuthError::SessionNotFound);
        };
        if session_id != claims.sid {
            return Err(AuthError::InvalidToken);
        }

        let now = format_timestamp(Utc::now());
        if expires_at <= now {
            return Err(AuthError::SessionExpired);
        }

        sqlx::query("UPDATE admin_sessions SET last_seen_at = ? WHERE public_id = ?")
            .bind(&now)
            .bind(&session_id)
            .execute(&self.pool)
            .await?;

        Ok(VerifiedAdmin {
            email,
            session_id,
            expires_at,
        })
    }

    /// Revoke `token`. Logging out twice with the same token succeeds.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.is_blacklisted(token).await? {
            return Ok(());
        }

        let admin = self.verify(token).await?;

        sqlx::query(
            "INSERT OR IGNORE INTO blacklisted_tokens (token, expires_at, blacklisted_at) VALUES (?, ?, ?)",
        )
        .bind(token)
        .bind(&admin.expires_at)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE admin_sessions SET is_active = false WHERE public_id = ?")
            .bind(&admin.session_id)
            .execute(&self.pool)
            .await?;

        info!(session = %admin.session_id, "admin logged out");
        Ok(())
    }

    pub async fn issue_csrf_token(&self, session_id: &str) -> Result<CsrfToken, AuthError> {
        let token = random_alphanumeric(CSRF_TOKEN_LENGTH);
        let now = Utc::now();
        let expires_at = format_timestamp(now + self.csrf_ttl);

        sqlx::query(
            "INSERT INTO csrf_tokens (token, session_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(session_id)
        .bind(&expires_at)
        .bind(format_timestamp(now))
        .execute(&self.pool)
        .await?;

        Ok(CsrfToken { token, expires_at })
    }

    /// Spend a CSRF token. It must belong to `session_id`, be unused and unexpired.
    pub async fn consume_csrf_token(&self, session_id: &str, token: &str) -> Result<(), AuthError> {
        let now = format_timestamp(Utc::now());
        let result = sqlx::query(
            r#"
            UPDATE csrf_tokens SET used_at = ?
            WHERE token = ? AND session_id = ? AND used_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(&now)
        .bind(token)
        .bind(session_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            warn!(session = %session_id, "rejected csrf token");
            Err(AuthError::InvalidCsrfToken)
        }
    }

    pub async fn cleanup_expired(&self) -> Result<CleanupReport, AuthError> {
        let now = Utc::now();
        let now_text = format_timestamp(now);
        let attempts_cutoff = format_timestamp(
            now - Duration::hours(LOGIN_ATTEMPT_RETENTION_HOURS).max(self.login_window),
        );

        let blacklisted_tokens = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at <= ?")
            .bind(&now_text)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let csrf_tokens = sqlx::query("DELETE FROM csrf_tokens WHERE expires_at <= ? OR used_at IS NOT NULL")
            .bind(&now_text)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let login_attempts = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < ?")
            .bind(&attempts_cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let sessions = sqlx::query(
            "UPDATE admin_sessions SET is_active = false WHERE is_active = true AND expires_at <= ?",
        )
        .bind(&now_text)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let report = CleanupReport {
            blacklisted_tokens,
            csrf_tokens,
            login_attempts,
            sessions,
        };
        if report != CleanupReport::default() {
            info!(?report, "expired auth records cleaned up");
        }
        Ok(report)
    }

    pub async fn recent_attempts(&self, limit: i64) -> Result<Vec<LoginAttempt>, AuthError> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            r#"
            SELECT email, ip_address, success, reason, attempted_at
            FROM login_attempts
            ORDER BY attempted_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, AuthError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM blacklisted_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn record_attempt(
        &self,
        email: &str,
        client: &ClientInfo,
        success: bool,
        reason: Option<&str>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO login_attempts (email, ip_address, success, reason, attempted_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(email)
        .bind(&client.ip)
        .bind(success)
        .bind(reason)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Hash a password into an argon2 PHC string suitable for `auth.admin_password_hash`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn random_alphanumeric(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn seconds(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_TTL_SECONDS) as i64)
}
