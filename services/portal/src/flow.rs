//! Password + OTP sign-in flow
//!
//! Sign-in is two steps: credentials are checked and a one-time code is
//! emailed, then the code is exchanged for a token. Only the second step
//! touches the session.

use tracing::info;

use crate::error::{PortalError, PortalResult};
use crate::identity::IdentityClient;
use crate::models::{Credentials, OtpPending, OtpVerification, User};
use crate::session::SessionManager;
use crate::validation::{
    suggested_username, validate_email, validate_otp_code, validate_password, validate_username,
};

/// Drives sign-in and registration against the Identity API
#[derive(Clone)]
pub struct AuthFlow {
    identity: IdentityClient,
    session: SessionManager,
}

impl AuthFlow {
    pub fn new(identity: IdentityClient, session: SessionManager) -> Self {
        Self { identity, session }
    }

    /// Check credentials and have a sign-in code sent
    pub async fn request_login(&self, email: &str, password: &str) -> PortalResult<OtpPending> {
        let credentials = credentials(email, password)?;
        self.identity.login(&credentials).await
    }

    /// Create an account and have a confirmation code sent
    pub async fn register(&self, email: &str, password: &str) -> PortalResult<OtpPending> {
        let credentials = credentials(email, password)?;
        self.identity.register(&credentials).await
    }

    /// Exchange a code for a token and start the session
    pub async fn verify_otp(&self, email: &str, code: &str) -> PortalResult<User> {
        let code = code.trim();
        validate_otp_code(code).map_err(PortalError::Validation)?;

        let auth = self
            .identity
            .verify_otp(&OtpVerification {
                email: email.trim().to_string(),
                code: code.to_string(),
            })
            .await?;

        let mut user = auth.user;
        if user.username.is_none() {
            user.username = user
                .email
                .as_deref()
                .and_then(suggested_username)
                .filter(|name| validate_username(name).is_ok());
        }

        self.session.login(user.clone(), Some(auth.token)).await?;
        info!("Sign-in completed for user {}", user.id);
        Ok(user)
    }

    /// Send a new code to `email`
    pub async fn resend_otp(&self, email: &str) -> PortalResult<()> {
        let email = email.trim();
        validate_email(email).map_err(PortalError::Validation)?;
        self.identity.request_otp(email).await
    }
}

fn credentials(email: &str, password: &str) -> PortalResult<Credentials> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(PortalError::Validation(
            "Please enter your email and password".to_string(),
        ));
    }
    validate_email(email).map_err(PortalError::Validation)?;
    validate_password(password).map_err(PortalError::Validation)?;

    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_fields() {
        assert!(matches!(
            credentials("", "secret"),
            Err(PortalError::Validation(msg)) if msg == "Please enter your email and password"
        ));
        assert!(credentials("ana@example.com", "").is_err());
        assert!(credentials("not-an-email", "secret").is_err());

        let ok = credentials("  ana@example.com ", "secret").unwrap();
        assert_eq!(ok.email, "ana@example.com");
    }
}
