//! Portal client models

pub mod auth;
pub mod chat;
pub mod user;

// Re-export for convenience
pub use auth::{AuthResponse, Credentials, OtpPending, OtpRequest, OtpVerification};
pub use chat::{
    ChatContext, ChatEntry, ChatMeta, ChatReply, ChatRequest, ComplianceAnalysis, ComplianceLevel,
    GeneratedPolicy, Law1581Report, Law1581Request,
};
pub use user::User;
