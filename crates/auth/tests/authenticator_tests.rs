use std::str::FromStr;

use chrono::{Duration, Utc};
use pharmacy_auth::{hash_password, AdminAuthenticator, AuthError, ClientInfo};
use pharmacy_config::AuthConfig;
use pharmacy_database::format_timestamp;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;

type TestResult<T = ()> = anyhow::Result<T>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

const ADMIN_EMAIL: &str = "admin@pharmacy.test";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

fn auth_config() -> AuthConfig {
    AuthConfig {
        admin_email: Some(ADMIN_EMAIL.into()),
        admin_password_hash: Some(hash_password(ADMIN_PASSWORD).expect("hash admin password")),
        jwt_secret: Some("integration-test-secret-with-enough-entropy".into()),
        max_login_attempts: 3,
        ..AuthConfig::default()
    }
}

fn client(ip: &str) -> ClientInfo {
    ClientInfo {
        ip: Some(ip.into()),
        user_agent: Some("integration-test".into()),
    }
}

struct TestContext {
    pool: SqlitePool,
    authenticator: AdminAuthenticator,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new(config: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let authenticator = AdminAuthenticator::new(pool.clone(), &config);

        Ok(Self {
            pool,
            authenticator,
            _temp_dir: temp_dir,
        })
    }

    async fn new_default() -> TestResult<Self> {
        Self::new(auth_config()).await
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &AdminAuthenticator {
        &self.authenticator
    }
}

#[tokio::test]
async fn login_issues_token_session_and_csrf() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let session = ctx
        .authenticator()
        .login("  Admin@Pharmacy.TEST ", ADMIN_PASSWORD, &client("10.0.0.1"))
        .await?;

    assert_eq!(session.email, ADMIN_EMAIL);
    assert_eq!(session.csrf_token.len(), 32);
    assert_eq!(session.token.split('.').count(), 3, "token should be a JWT");

    let (ip, user_agent, active): (Option<String>, Option<String>, bool) = sqlx::query_as(
        "SELECT ip_address, user_agent, is_active FROM admin_sessions WHERE public_id = ?",
    )
    .bind(&session.session_id)
    .fetch_one(ctx.pool())
    .await?;
    assert_eq!(ip.as_deref(), Some("10.0.0.1"));
    assert_eq!(user_agent.as_deref(), Some("integration-test"));
    assert!(active);

    let verified = ctx.authenticator().verify(&session.token).await?;
    assert_eq!(verified.email, ADMIN_EMAIL);
    assert_eq!(verified.session_id, session.session_id);

    let attempts = ctx.authenticator().recent_attempts(10).await?;
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].success);

    Ok(())
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let wrong_password = ctx
        .authenticator()
        .login(ADMIN_EMAIL, "nope", &client("10.0.0.2"))
        .await
        .expect_err("wrong password must fail");
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));

    let wrong_email = ctx
        .authenticator()
        .login("someone@else.test", ADMIN_PASSWORD, &client("10.0.0.3"))
        .await
        .expect_err("unknown email must fail");
    assert!(matches!(wrong_email, AuthError::InvalidCredentials));

    let failures: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts WHERE success = false")
            .fetch_one(ctx.pool())
            .await?;
    assert_eq!(failures, 2);

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_sessions")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(sessions, 0);

    Ok(())
}

#[tokio::test]
async fn login_without_configured_admin_is_refused() -> TestResult {
    let ctx = TestContext::new(AuthConfig::default()).await?;
    assert!(!ctx.authenticator().is_configured());

    let err = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &ClientInfo::default())
        .await
        .expect_err("login must fail without credentials");
    assert!(matches!(err, AuthError::AdminNotConfigured));

    Ok(())
}

#[tokio::test]
async fn repeated_failures_trigger_rate_limit_even_with_correct_password() -> TestResult {
    let ctx = TestContext::new_default().await?;

    for _ in 0..3 {
        let _ = ctx
            .authenticator()
            .login(ADMIN_EMAIL, "bad", &client("10.0.0.4"))
            .await;
    }

    let err = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.4"))
        .await
        .expect_err("fourth attempt must be rate limited");

    match err {
        AuthError::RateLimited { retry_after_seconds } => {
            assert!(retry_after_seconds > 0);
            assert!(retry_after_seconds <= 15 * 60);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let blocked: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts WHERE reason = 'rate_limited'")
            .fetch_one(ctx.pool())
            .await?;
    assert_eq!(blocked, 1);

    Ok(())
}

#[tokio::test]
async fn rate_limit_applies_per_ip_across_emails() -> TestResult {
    let ctx = TestContext::new_default().await?;

    for email in ["a@x.test", "b@x.test", "c@x.test"] {
        let _ = ctx
            .authenticator()
            .login(email, "bad", &client("192.168.1.9"))
            .await;
    }

    let err = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("192.168.1.9"))
        .await
        .expect_err("same ip must be limited");
    assert!(matches!(err, AuthError::RateLimited { .. }));

    let session = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("192.168.1.10"))
        .await?;
    assert_eq!(session.email, ADMIN_EMAIL);

    Ok(())
}

#[tokio::test]
async fn failures_outside_the_window_do_not_count() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let old = format_timestamp(Utc::now() - Duration::minutes(30));

    for _ in 0..5 {
        sqlx::query(
            "INSERT INTO login_attempts (email, ip_address, success, reason, attempted_at) VALUES (?, ?, false, 'invalid_credentials', ?)",
        )
        .bind(ADMIN_EMAIL)
        .bind("10.0.0.5")
        .bind(&old)
        .execute(ctx.pool())
        .await?;
    }

    ctx.authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.5"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn logout_blacklists_token_and_is_idempotent() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.6"))
        .await?;

    ctx.authenticator().logout(&session.token).await?;
    ctx.authenticator().logout(&session.token).await?;

    let err = ctx
        .authenticator()
        .verify(&session.token)
        .await
        .expect_err("revoked token must not verify");
    assert!(matches!(err, AuthError::TokenRevoked));

    let blacklisted: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blacklisted_tokens WHERE token = ?")
        .bind(&session.token)
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(blacklisted, 1);

    let active: bool = sqlx::query_scalar("SELECT is_active FROM admin_sessions WHERE public_id = ?")
        .bind(&session.session_id)
        .fetch_one(ctx.pool())
        .await?;
    assert!(!active);

    Ok(())
}

#[tokio::test]
async fn verify_rejects_garbage_and_expired_sessions() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let garbage = ctx.authenticator().verify("garbage").await.expect_err("garbage token");
    assert!(matches!(garbage, AuthError::InvalidToken));

    let session = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.7"))
        .await?;

    sqlx::query("UPDATE admin_sessions SET expires_at = ? WHERE public_id = ?")
        .bind(format_timestamp(Utc::now() - Duration::seconds(1)))
        .bind(&session.session_id)
        .execute(ctx.pool())
        .await?;

    let expired = ctx
        .authenticator()
        .verify(&session.token)
        .await
        .expect_err("expired session");
    assert!(matches!(expired, AuthError::SessionExpired));

    sqlx::query("DELETE FROM admin_sessions")
        .execute(ctx.pool())
        .await?;
    let missing = ctx
        .authenticator()
        .verify(&session.token)
        .await
        .expect_err("missing session");
    assert!(matches!(missing, AuthError::SessionNotFound));

    Ok(())
}

#[tokio::test]
async fn tokens_from_another_secret_are_invalid() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.8"))
        .await?;

    let other = AdminAuthenticator::new(
        ctx.pool().clone(),
        &AuthConfig {
            jwt_secret: Some("a-completely-different-signing-secret".into()),
            ..auth_config()
        },
    );
    let err = other.verify(&session.token).await.expect_err("foreign signature");
    assert!(matches!(err, AuthError::InvalidToken));

    Ok(())
}

#[tokio::test]
async fn csrf_tokens_are_single_use_and_session_bound() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.9"))
        .await?;

    let wrong_session = ctx
        .authenticator()
        .consume_csrf_token("other-session", &session.csrf_token)
        .await
        .expect_err("token belongs to another session");
    assert!(matches!(wrong_session, AuthError::InvalidCsrfToken));

    ctx.authenticator()
        .consume_csrf_token(&session.session_id, &session.csrf_token)
        .await?;

    let reused = ctx
        .authenticator()
        .consume_csrf_token(&session.session_id, &session.csrf_token)
        .await
        .expect_err("token is one-time");
    assert!(matches!(reused, AuthError::InvalidCsrfToken));

    let fresh = ctx.authenticator().issue_csrf_token(&session.session_id).await?;
    sqlx::query("UPDATE csrf_tokens SET expires_at = ? WHERE token = ?")
        .bind(format_timestamp(Utc::now() - Duration::seconds(1)))
        .bind(&fresh.token)
        .execute(ctx.pool())
        .await?;
    let expired = ctx
        .authenticator()
        .consume_csrf_token(&session.session_id, &fresh.token)
        .await
        .expect_err("expired token");
    assert!(matches!(expired, AuthError::InvalidCsrfToken));

    Ok(())
}

#[tokio::test]
async fn cleanup_removes_expired_records() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, &client("10.0.0.10"))
        .await?;

    let past = format_timestamp(Utc::now() - Duration::hours(1));
    let long_ago = format_timestamp(Utc::now() - Duration::hours(48));

    sqlx::query("INSERT INTO blacklisted_tokens (token, expires_at, blacklisted_at) VALUES ('old', ?, ?)")
        .bind(&past)
        .bind(&past)
        .execute(ctx.pool())
        .await?;
    sqlx::query("INSERT INTO login_attempts (email, ip_address, success, reason, attempted_at) VALUES ('x@y.test', NULL, false, NULL, ?)")
        .bind(&long_ago)
        .execute(ctx.pool())
        .await?;
    sqlx::query("UPDATE admin_sessions SET expires_at = ? WHERE public_id = ?")
        .bind(&past)
        .bind(&session.session_id)
        .execute(ctx.pool())
        .await?;
    ctx.authenticator()
        .consume_csrf_token(&session.session_id, &session.csrf_token)
        .await?;

    let report = ctx.authenticator().cleanup_expired().await?;
    assert_eq!(report.blacklisted_tokens, 1);
    assert_eq!(report.csrf_tokens, 1);
    assert_eq!(report.login_attempts, 1);
    assert_eq!(report.sessions, 1);

    let second = ctx.authenticator().cleanup_expired().await?;
    assert_eq!(second.sessions, 0);
    assert_eq!(second.blacklisted_tokens, 0);

    Ok(())
}
