//! Authentication request and response payloads

use serde::{Deserialize, Serialize};

use super::User;

/// Email and password, used for both sign-in and registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// OTP code submitted for verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub email: String,
    pub code: String,
}

/// Request to (re)send an OTP code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

/// Acknowledgement that an OTP code was sent; no token yet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtpPending {
    #[serde(default)]
    pub message: Option<String>,
}

/// Successful OTP verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}
