//! Session lookup and the explicit session context.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use voiceup_common::VoiceUpError;

/// An authenticated session as reported by the auth service.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
}

/// Client for the backend's auth endpoints.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, VoiceUpError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| VoiceUpError::Config(format!("invalid backend URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn headers(&self, access_token: &str) -> Result<HeaderMap, VoiceUpError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| VoiceUpError::Auth(format!("invalid API key: {e}")))?;
        headers.insert("apikey", key);
        let bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| VoiceUpError::Auth(format!("invalid access token: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Look up the session behind an access token. An expired or invalid
    /// token is not an error; it reads as signed out.
    pub async fn current_session(&self, access_token: &str) -> Result<Option<Session>, VoiceUpError> {
        let url = self
            .base_url
            .join("auth/v1/user")
            .map_err(|e| VoiceUpError::Auth(e.to_string()))?;
        let response = self
            .http
            .get(url)
            .headers(self.headers(access_token)?)
            .send()
            .await
            .map_err(|e| VoiceUpError::Auth(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| VoiceUpError::Auth(e.to_string()))?;
            return Err(VoiceUpError::Auth(format!(
                "session lookup failed ({status}): {text}"
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| VoiceUpError::Auth(format!("malformed user response: {e}")))?;
        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
        }))
    }

    /// Invalidate the access token server-side.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), VoiceUpError> {
        let url = self
            .base_url
            .join("auth/v1/logout")
            .map_err(|e| VoiceUpError::Auth(e.to_string()))?;
        let response = self
            .http
            .post(url)
            .headers(self.headers(access_token)?)
            .send()
            .await
            .map_err(|e| VoiceUpError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(VoiceUpError::Auth(format!("sign-out failed ({status})")));
        }
        Ok(())
    }
}

/// Shared session state for the components that need viewer identity.
/// Established at authentication, cleared at sign-out. Nothing else reads
/// ambient global state to find the viewer.
pub struct SessionContext {
    current: ArcSwapOption<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::from(None),
        }
    }

    pub fn establish(&self, session: Session) {
        self.current.store(Some(Arc::new(session)));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    /// The signed-in viewer's id, if any.
    pub fn viewer(&self) -> Option<Uuid> {
        self.current.load().as_ref().map(|session| session.user_id)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
