//! Identity API client
//!
//! Talks to the remote service that owns credentials, OTP delivery and token
//! issuance. The session manager only needs token validation, which is the
//! [`IdentityApi`] seam; the rest of the client backs the login flow.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};
use crate::models::{AuthResponse, Credentials, OtpPending, OtpRequest, OtpVerification};

/// Token validation as seen by the session manager
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Confirm that `token` is valid for `user_id`.
    ///
    /// Returns `PortalError::Api` when the service rejects the token and
    /// `PortalError::Http` when it could not be reached.
    async fn validate_token(&self, user_id: &str, token: &str) -> PortalResult<()>;
}

/// HTTP client for the Identity API
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
}

impl IdentityClient {
    /// Create a new Identity API client
    pub fn new(base_url: &str, timeout: Duration) -> PortalResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the portal configuration
    pub fn from_config(config: &PortalConfig) -> PortalResult<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a password sign-in. On success an OTP code has been sent.
    pub async fn login(&self, credentials: &Credentials) -> PortalResult<OtpPending> {
        info!("Requesting sign-in code for {}", credentials.email);
        self.post_json("/auth/login", credentials, "Invalid credentials")
            .await
    }

    /// Register a new account. On success an OTP code has been sent.
    pub async fn register(&self, credentials: &Credentials) -> PortalResult<OtpPending> {
        info!("Registering account for {}", credentials.email);
        self.post_json("/auth/register", credentials, "Registration failed")
            .await
    }

    /// Exchange an OTP code for the user record and a bearer token
    pub async fn verify_otp(&self, verification: &OtpVerification) -> PortalResult<AuthResponse> {
        info!("Verifying sign-in code for {}", verification.email);
        let response = self
            .send_post("/auth/verify-otp", verification, "Invalid OTP code")
            .await?;

        let auth: AuthResponse = response.json().await?;
        info!("Sign-in code accepted for user {}", auth.user.id);
        Ok(auth)
    }

    /// Ask for a new OTP code
    pub async fn request_otp(&self, email: &str) -> PortalResult<()> {
        info!("Requesting a new code for {}", email);
        let body = OtpRequest {
            email: email.to_string(),
        };
        self.send_post("/auth/request-otp", &body, "Could not resend the code")
            .await?;
        Ok(())
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        default_error: &str,
    ) -> PortalResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response, default_error).await);
        }

        Ok(response)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        path: &str,
        body: &B,
        default_error: &str,
    ) -> PortalResult<T> {
        let response = self.send_post(path, body, default_error).await?;
        let text = response.text().await?;

        // Acknowledgements carry no required fields; tolerate empty bodies
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                if !text.trim().is_empty() {
                    warn!("Ignoring unreadable response body from {}: {}", path, e);
                }
                Ok(T::default())
            }
        }
    }

    /// `{base_url}/users/{user_id}` with `user_id` escaped as one path segment
    fn user_url(&self, user_id: &str) -> PortalResult<Url> {
        let invalid = || PortalError::Validation(format!("Invalid API URL: {}", self.base_url));

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("users")
            .push(user_id);
        Ok(url)
    }
}

#[async_trait]
impl IdentityApi for IdentityClient {
    async fn validate_token(&self, user_id: &str, token: &str) -> PortalResult<()> {
        let url = self.user_url(user_id)?;
        debug!("Validating session token for user {}", user_id);

        let response = self.client.get(url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response, "Session token rejected").await);
        }

        Ok(())
    }
}

/// Build an API error from a non-success response.
///
/// Uses the `message` field of a JSON body when present, otherwise
/// `default_message`.
pub(crate) async fn api_error(response: Response, default_message: &str) -> PortalError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| default_message.to_string());

    error!("API request failed: {} - {}", status, message);
    PortalError::Api { status, message }
}
