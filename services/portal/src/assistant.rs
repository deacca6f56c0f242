//! Compliance assistant client
//!
//! Chat and document analysis calls made on behalf of the signed-in user.
//! Every request carries the session's bearer token; nothing is sent without
//! an authenticated session.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};
use crate::identity::api_error;
use crate::models::{ChatContext, ChatEntry, ChatReply, ChatRequest, Law1581Report, Law1581Request};
use crate::session::SessionManager;

/// HTTP client for the assistant endpoints
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    base_url: String,
    session: SessionManager,
}

impl AssistantClient {
    /// Create a new assistant client bound to `session`
    pub fn new(base_url: &str, timeout: Duration, session: SessionManager) -> PortalResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Create a client from the portal configuration
    pub fn from_config(config: &PortalConfig, session: SessionManager) -> PortalResult<Self> {
        Self::new(&config.api_url, config.request_timeout(), session)
    }

    /// Absolute URL for a server-relative path such as a report download link
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Stored conversation of the current user
    pub async fn history(&self) -> PortalResult<Vec<ChatEntry>> {
        let (user_id, token) = self.credentials()?;
        let url = format!("{}/ai/chat/history/{}", self.base_url, user_id);

        let entries: Vec<ChatEntry> = self
            .send(self.client.get(&url).bearer_auth(token), "Could not load chat history")
            .await?;
        debug!("Loaded {} history entries", entries.len());
        Ok(entries)
    }

    /// Ask the assistant a question
    pub async fn send_message(&self, message: &str, context: ChatContext) -> PortalResult<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PortalError::Validation(
                "Message must not be empty".to_string(),
            ));
        }

        let (user_id, token) = self.credentials()?;
        let body = ChatRequest {
            message: message.to_string(),
            user_id,
            context,
        };
        let url = format!("{}/ai/chat", self.base_url);

        info!("Sending chat message ({})", context.as_str());
        let mut reply: ChatReply = self
            .send(
                self.client.post(&url).bearer_auth(token).json(&body),
                "The assistant could not answer",
            )
            .await?;

        if reply.id.is_none() {
            reply.id = Some(uuid::Uuid::new_v4().to_string());
        }
        Ok(reply)
    }

    /// Review a company's personal data protection policy under Law 1581
    pub async fn analyze_law_1581(
        &self,
        nit: &str,
        company_name: &str,
        website_url: &str,
        generate_pdf: bool,
    ) -> PortalResult<Law1581Report> {
        if nit.trim().is_empty() || company_name.trim().is_empty() {
            return Err(PortalError::Validation(
                "Please provide at least the NIT and the company name".to_string(),
            ));
        }

        let (user_id, token) = self.credentials()?;
        let body = Law1581Request {
            user_id,
            nit: nit.trim().to_string(),
            company_name: company_name.trim().to_string(),
            website_url: website_url.trim().to_string(),
            generate_pdf,
        };
        let url = format!("{}/ai/law-1581/analyze", self.base_url);

        info!("Requesting Law 1581 analysis for {}", body.company_name);
        self.send(
            self.client.post(&url).bearer_auth(token).json(&body),
            "The analysis could not be completed",
        )
        .await
    }

    fn credentials(&self) -> PortalResult<(String, String)> {
        let user = self.session.user().ok_or(PortalError::NotAuthenticated)?;
        let token = self.session.token().ok_or(PortalError::NotAuthenticated)?;
        Ok((user.id, token))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        default_error: &str,
    ) -> PortalResult<T> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(api_error(response, default_error).await);
        }

        Ok(response.json().await?)
    }
}
