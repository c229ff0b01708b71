//! Session handling against a Supabase (GoTrue) auth endpoint.
//!
//! The rest of the crate only asks whether a session is present; the session
//! contents are kept for display and persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::{Result, ScribeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<i64>,
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|at| at <= now.timestamp())
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;
    async fn sign_out(&self) -> Result<()>;
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SessionUser>,
}

#[derive(Deserialize, Default)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    state: watch::Sender<Option<Session>>,
}

impl SupabaseAuth {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let (state, _) = watch::channel(None);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            state,
        })
    }

    /// Receives the session on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Seeds the provider with a previously persisted session.
    pub fn restore(&self, session: Session) {
        if session.is_expired(Utc::now()) {
            warn!("Stored session has expired, ignoring it");
            return;
        }
        self.state.send_replace(Some(session));
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(|e| ScribeError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ScribeError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(auth_error(status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ScribeError::MalformedResponse(format!("auth token response: {}", e)))?;

        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs));

        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        };

        info!(
            "Signed in as {}",
            session
                .user
                .as_ref()
                .and_then(|u| u.email.as_deref())
                .unwrap_or("unknown user")
        );
        self.state.send_replace(Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl SessionProvider for SupabaseAuth {
    fn current_session(&self) -> Option<Session> {
        self.state
            .borrow()
            .clone()
            .filter(|s| !s.is_expired(Utc::now()))
    }

    /// Drops the local session (notifying subscribers) and revokes it remotely.
    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.state.send_replace(None) else {
            return Ok(());
        };

        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| ScribeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(status, &body));
        }

        info!("Signed out");
        Ok(())
    }
}

fn auth_error(status: StatusCode, body: &str) -> ScribeError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ScribeError::AuthInvalid(message)
        }
        StatusCode::TOO_MANY_REQUESTS => ScribeError::RateLimited(message),
        _ => ScribeError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at,
            user: None,
        }
    }

    #[test]
    fn expiry_is_checked_against_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(session(Some(now.timestamp() - 1)).is_expired(now));
        assert!(!session(Some(now.timestamp() + 60)).is_expired(now));
        assert!(!session(None).is_expired(now));
    }

    #[test]
    fn user_metadata_maps_to_metadata() {
        let user: SessionUser = serde_json::from_str(
            r#"{"id":"u1","email":"a@b.c","last_sign_in_at":"2026-01-01T00:00:00Z",
                "user_metadata":{"full_name":"Ko Aung"}}"#,
        )
        .unwrap();
        assert_eq!(user.metadata["full_name"], "Ko Aung");
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn auth_errors_prefer_the_description() {
        let err = auth_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err, ScribeError::AuthInvalid("Invalid login credentials".to_string()));
        assert!(matches!(
            auth_error(StatusCode::BAD_GATEWAY, ""),
            ScribeError::ApiError { status: 502, .. }
        ));
    }

    #[tokio::test]
    async fn restore_and_sign_out_notify_subscribers() {
        let auth = SupabaseAuth::new("http://127.0.0.1:9", "anon").unwrap();
        let mut rx = auth.subscribe();
        assert!(auth.current_session().is_none());

        auth.restore(session(None));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_some());
        assert!(auth.current_session().is_some());

        // Remote revoke fails against the closed port, the local session is gone regardless
        let result = auth.sign_out().await;
        assert!(result.is_err());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(auth.current_session().is_none());
    }

    #[test]
    fn expired_sessions_are_not_restored() {
        let auth = SupabaseAuth::new("http://127.0.0.1:9", "anon").unwrap();
        auth.restore(session(Some(1)));
        assert!(auth.current_session().is_none());
    }
}
