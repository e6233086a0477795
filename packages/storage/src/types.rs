// ABOUTME: Record and input type definitions for the storage package
// ABOUTME: Documents, sections, implementation plans, accounts, and section content digests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
pub use sqlx::types::Json;

/// Local mirror of an identity issued by the external identity provider
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or refreshing an account from an identity event
#[derive(Debug, Clone, Deserialize)]
pub struct AccountUpsert {
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// A Project Requirement Document and its generated introduction
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub account_id: String,
    pub app_name: String,
    pub app_description: String,
    pub prog_language: String,
    pub framework: String,
    pub styling: String,
    pub backend: String,
    pub auth: String,
    pub payments: String,
    pub other_packages: String,
    pub processed: bool,
    pub llm_response: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn response(&self) -> Option<&Value> {
        self.llm_response.as_ref().map(|json| &json.0)
    }

    /// The generated introduction, if one has been stored.
    ///
    /// Manual edits may store the introduction as a bare string instead of the
    /// `{ "intro": ... }` object the intro stage writes; both shapes are accepted.
    pub fn intro(&self) -> Option<&str> {
        let intro = match self.response()? {
            Value::String(text) => text.as_str(),
            Value::Object(map) => map.get("intro")?.as_str()?,
            _ => return None,
        };

        if intro.trim().is_empty() {
            None
        } else {
            Some(intro)
        }
    }
}

/// Input for creating a document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentInput {
    pub app_name: String,
    pub app_description: String,
    #[serde(default)]
    pub prog_language: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub styling: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub payments: String,
    #[serde(default)]
    pub other_packages: String,
}

/// Partial document update; a supplied `llm_response` is a manual edit
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentInput {
    pub app_name: Option<String>,
    pub app_description: Option<String>,
    pub prog_language: Option<String>,
    pub framework: Option<String>,
    pub styling: Option<String>,
    pub backend: Option<String>,
    pub auth: Option<String>,
    pub payments: Option<String>,
    pub other_packages: Option<String>,
    pub llm_response: Option<Value>,
}

impl UpdateDocumentInput {
    pub fn is_empty(&self) -> bool {
        self.app_name.is_none()
            && self.app_description.is_none()
            && self.prog_language.is_none()
            && self.framework.is_none()
            && self.styling.is_none()
            && self.backend.is_none()
            && self.auth.is_none()
            && self.payments.is_none()
            && self.other_packages.is_none()
            && self.llm_response.is_none()
    }
}

/// One page/screen of a document, generated independently of its siblings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub document_id: String,
    pub name: String,
    pub description: String,
    pub position: i64,
    pub status: String,
    pub processed: bool,
    pub llm_response: Option<Json<Value>>,
    pub processed_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_processed: Option<DateTime<Utc>>,
}

impl Section {
    pub fn response(&self) -> Option<&Value> {
        self.llm_response.as_ref().map(|json| &json.0)
    }

    /// Digest of the section's current user-authored content
    pub fn content_digest(&self) -> String {
        content_digest(&self.name, &self.description)
    }

    /// True when the section was never processed or its content changed since.
    pub fn needs_generation(&self) -> bool {
        if !self.processed {
            return true;
        }
        self.processed_digest.as_deref() != Some(self.content_digest().as_str())
    }
}

/// One entry of a section save request: with `id` it updates, without it creates
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub llm_response: Option<Value>,
    pub position: Option<i64>,
}

/// The generated setup/build guidance for a document
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPlan {
    pub id: String,
    pub document_id: String,
    pub processed: bool,
    pub llm_response: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_processed: Option<DateTime<Utc>>,
}

impl ImplementationPlan {
    pub fn response(&self) -> Option<&Value> {
        self.llm_response.as_ref().map(|json| &json.0)
    }
}

/// A document together with its ordered sections and optional plan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub sections: Vec<Section>,
    pub implementation: Option<ImplementationPlan>,
}

/// SHA-256 (hex) over a section's name and description.
pub fn content_digest(name: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document_with(response: Option<Value>) -> Document {
        let now = Utc::now();
        Document {
            id: "doc-00001".to_string(),
            account_id: "acct-0001".to_string(),
            app_name: "Acme".to_string(),
            app_description: "Raw description".to_string(),
            prog_language: "TypeScript".to_string(),
            framework: "Next".to_string(),
            styling: "Tailwind".to_string(),
            backend: "Postgres".to_string(),
            auth: "Clerk".to_string(),
            payments: String::new(),
            other_packages: String::new(),
            processed: response.is_some(),
            llm_response: response.map(Json),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_intro_reads_object_and_string_shapes() {
        let doc = document_with(Some(json!({ "intro": "Intro text" })));
        assert_eq!(doc.intro(), Some("Intro text"));

        let doc = document_with(Some(json!("Edited intro")));
        assert_eq!(doc.intro(), Some("Edited intro"));
    }

    #[test]
    fn test_intro_absent_or_blank() {
        assert_eq!(document_with(None).intro(), None);
        assert_eq!(document_with(Some(json!({ "intro": "   " }))).intro(), None);
        assert_eq!(document_with(Some(json!({ "other": 1 }))).intro(), None);
    }

    #[test]
    fn test_content_digest_separates_fields() {
        assert_ne!(content_digest("ab", "c"), content_digest("a", "bc"));
        assert_eq!(content_digest("Home", "Landing"), content_digest("Home", "Landing"));
        assert_eq!(content_digest("Home", "Landing").len(), 64);
    }
}
