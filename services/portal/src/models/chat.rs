//! Compliance assistant payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic a chat message is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatContext {
    #[default]
    General,
    Iso27001,
    Law1581,
    Documents,
}

impl ChatContext {
    /// Get the context name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatContext::General => "general",
            ChatContext::Iso27001 => "iso27001",
            ChatContext::Law1581 => "law1581",
            ChatContext::Documents => "documents",
        }
    }
}

/// Assistant's assessment attached to a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Compliant,
    NonCompliant,
    NeedsReview,
}

/// Extra data stored with a history entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMeta {
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub compliance_level: Option<ComplianceLevel>,
    #[serde(default)]
    pub related_documents: Vec<String>,
}

/// One message of the stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: String,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: Option<ChatMeta>,
}

/// Message sent to the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub context: ChatContext,
}

/// Assistant answer to a [`ChatRequest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    #[serde(default)]
    pub id: Option<String>,
    pub response: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub compliance_level: Option<ComplianceLevel>,
    #[serde(default)]
    pub related_documents: Vec<String>,
}

/// Request for a Colombian Law 1581 (personal data protection) review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Law1581Request {
    pub user_id: String,
    pub nit: String,
    pub company_name: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub generate_pdf: bool,
}

/// Findings about an existing privacy policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceAnalysis {
    #[serde(default)]
    pub has_privacy_policy: bool,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub deficiencies: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, rename = "meetsLaw1581Requirements")]
    pub meets_requirements: bool,
}

/// Policy drafted when the company has none
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPolicy {
    #[serde(default)]
    pub suggested: bool,
    #[serde(default)]
    pub pdf_generated: bool,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub implementation_steps: Vec<String>,
}

/// Result of a Law 1581 analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Law1581Report {
    #[serde(default)]
    pub compliance_analysis: Option<ComplianceAnalysis>,
    #[serde(default)]
    pub generated_policy: Option<GeneratedPolicy>,
}

impl Law1581Report {
    /// Overall verdict: compliant only when the analysis says so
    pub fn compliance_level(&self) -> ComplianceLevel {
        match &self.compliance_analysis {
            Some(analysis) if analysis.meets_requirements => ComplianceLevel::Compliant,
            _ => ComplianceLevel::NeedsReview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_format() {
        let request = ChatRequest {
            message: "hola".to_string(),
            user_id: "u1".to_string(),
            context: ChatContext::Iso27001,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"message": "hola", "userId": "u1", "context": "iso27001"})
        );
    }

    #[test]
    fn test_history_entry_with_meta() {
        let entry: ChatEntry = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "role": "bot",
            "content": "Revisa tu política",
            "createdAt": "2024-05-01T10:00:00Z",
            "meta": {"complianceLevel": "non_compliant", "suggestedActions": ["Publicar aviso"]}
        }))
        .unwrap();

        let meta = entry.meta.unwrap();
        assert_eq!(meta.compliance_level, Some(ComplianceLevel::NonCompliant));
        assert_eq!(meta.suggested_actions, vec!["Publicar aviso".to_string()]);
        assert!(meta.related_documents.is_empty());
        assert!(entry.created_at.is_some());
    }

    #[test]
    fn test_report_compliance_level() {
        let report: Law1581Report = serde_json::from_value(serde_json::json!({
            "complianceAnalysis": {"hasPrivacyPolicy": true, "meetsLaw1581Requirements": true}
        }))
        .unwrap();
        assert_eq!(report.compliance_level(), ComplianceLevel::Compliant);

        assert_eq!(
            Law1581Report::default().compliance_level(),
            ComplianceLevel::NeedsReview
        );
    }
}
