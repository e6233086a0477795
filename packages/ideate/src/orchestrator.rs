// ABOUTME: Generation orchestrator running the intro, section, and implementation stages
// ABOUTME: Checks ownership, fills templates, calls the completion service with retry, and persists results

use std::sync::Arc;

use chrono::Utc;
use prdsmith_ai::{with_retry, AIServiceError, Completion, CompletionService};
use prdsmith_prompts::PromptManager;
use prdsmith_storage::{CreateDocumentInput, Database, Document, DocumentDetail};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::batch::{BatchItem, BatchReport};
use crate::context;
use crate::error::Result;
use crate::locks::GenerationLocks;
use crate::parser::ImplementationSections;
use crate::stage::{GenerationConfig, Stage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroOutcome {
    pub content: String,
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRequirements {
    pub text: String,
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationOutcome {
    /// Raw completion text
    pub content: String,
    pub sections: ImplementationSections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Succeeded,
    Failed,
}

/// Whether content generation after a successful save worked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub document: DocumentDetail,
    pub generation: GenerationSummary,
}

pub struct GenerationOrchestrator {
    db: Database,
    completion: Arc<dyn CompletionService>,
    prompts: Arc<PromptManager>,
    config: GenerationConfig,
    locks: GenerationLocks,
}

impl GenerationOrchestrator {
    pub fn new(
        db: Database,
        completion: Arc<dyn CompletionService>,
        prompts: Arc<PromptManager>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            db,
            completion,
            prompts,
            config,
            locks: GenerationLocks::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate and store the introduction of a document
    pub async fn generate_intro(&self, account_id: &str, document_id: &str) -> Result<IntroOutcome> {
        let _guard = self.locks.acquire(format!("intro:{}", document_id)).await;
        let document = self.db.documents.get(account_id, document_id).await?;
        info!(document_id = %document_id, stage = %Stage::Intro, "Generating introduction");

        let prompt = self.prompts.get_prompt(
            Stage::Intro.prompt_id(),
            &context::intro_parameters(&document),
        )?;
        let completion = self.complete(Stage::Intro, prompt).await?;

        let response = json!({
            "intro": completion.text,
            "finishReason": completion.finish_reason,
            "generatedAt": Utc::now().to_rfc3339(),
            "metadata": completion.metadata(),
        });
        self.db
            .documents
            .record_generation(account_id, document_id, &response)
            .await?;

        info!(document_id = %document_id, "Stored generated introduction");
        Ok(IntroOutcome {
            content: completion.text,
            finish_reason: completion.finish_reason,
        })
    }

    /// Generate and store the requirements of one section
    pub async fn generate_section_requirements(
        &self,
        account_id: &str,
        document_id: &str,
        section_id: &str,
    ) -> Result<SectionRequirements> {
        let document = self.db.documents.get(account_id, document_id).await?;
        self.generate_section(account_id, &document, section_id).await
    }

    /// Generate requirements for every section that is new or changed.
    ///
    /// Sections run one after another in position order. A failing section is
    /// reported in its item and does not stop the rest.
    pub async fn generate_sections_batch(&self, account_id: &str, document_id: &str) -> Result<BatchReport> {
        let document = self.db.documents.get(account_id, document_id).await?;
        let sections = self.db.sections.list_for_document(document_id).await?;
        info!(document_id = %document_id, sections = sections.len(), "Starting batch section generation");

        let mut report = BatchReport::default();
        for section in &sections {
            if !section.needs_generation() {
                debug!(section_id = %section.id, "Section unchanged since last generation, skipping");
                report.record(BatchItem::skipped(section));
                continue;
            }

            match self.generate_section(account_id, &document, &section.id).await {
                Ok(_) => report.record(BatchItem::succeeded(section)),
                Err(err) => {
                    warn!(section_id = %section.id, "Section generation failed: {}", err);
                    report.record(BatchItem::failed(section, err.user_message()));
                }
            }
        }

        info!(
            document_id = %document_id,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Batch section generation finished"
        );
        Ok(report)
    }

    /// Generate and store the implementation plan of a document
    pub async fn generate_implementation_plan(
        &self,
        account_id: &str,
        document_id: &str,
    ) -> Result<ImplementationOutcome> {
        let _guard = self
            .locks
            .acquire(format!("implementation:{}", document_id))
            .await;
        let document = self.db.documents.get(account_id, document_id).await?;
        let sections = self.db.sections.list_for_document(document_id).await?;
        info!(
            document_id = %document_id,
            stage = %Stage::ImplementationPlan,
            sections = sections.len(),
            "Generating implementation plan"
        );

        let body = context::prd_body(&document, &sections);
        let prompt = self.prompts.get_prompt(
            Stage::ImplementationPlan.prompt_id(),
            &[("PRD_BODY", body.as_str())],
        )?;
        let completion = self.complete(Stage::ImplementationPlan, prompt).await?;
        let parsed = ImplementationSections::parse(&completion.text);
        debug!(kind = ?parsed.kind, "Parsed implementation response");

        let response = json!({
            "analysis": parsed.analysis,
            "plan": parsed.plan,
            "kind": parsed.kind,
            "finishReason": completion.finish_reason,
            "generatedAt": Utc::now().to_rfc3339(),
            "metadata": completion.metadata(),
        });
        self.db
            .implementation_plans
            .upsert_generation(account_id, document_id, &response)
            .await?;

        info!(document_id = %document_id, "Stored implementation plan");
        Ok(ImplementationOutcome {
            content: completion.text,
            sections: parsed,
        })
    }

    /// Save a new document, then run the intro and implementation stages.
    ///
    /// A failed save is an error. A failed generation after the save is
    /// reported in the outcome next to the saved document.
    pub async fn submit_document(&self, account_id: &str, input: &CreateDocumentInput) -> Result<SubmitOutcome> {
        let document = self.db.documents.create(account_id, input).await?;
        info!(document_id = %document.id, "Document saved, starting initial generation");

        let generation = match self.run_initial_stages(account_id, &document.id).await {
            Ok(()) => GenerationSummary {
                status: GenerationStatus::Succeeded,
                error: None,
            },
            Err(err) => {
                warn!(document_id = %document.id, "Initial generation failed: {}", err);
                GenerationSummary {
                    status: GenerationStatus::Failed,
                    error: Some(err.user_message()),
                }
            }
        };

        let document = self.db.document_detail(account_id, &document.id).await?;
        Ok(SubmitOutcome {
            document,
            generation,
        })
    }

    async fn run_initial_stages(&self, account_id: &str, document_id: &str) -> Result<()> {
        self.generate_intro(account_id, document_id).await?;
        self.generate_implementation_plan(account_id, document_id).await?;
        Ok(())
    }

    async fn generate_section(
        &self,
        account_id: &str,
        document: &Document,
        section_id: &str,
    ) -> Result<SectionRequirements> {
        let _guard = self.locks.acquire(format!("section:{}", section_id)).await;
        // Read under the lock so the stored digest matches the prompt's content
        let section = self.db.sections.get(&document.id, section_id).await?;
        info!(
            document_id = %document.id,
            section_id = %section_id,
            stage = %Stage::SectionRequirements,
            "Generating section requirements"
        );

        let background = context::app_background(document);
        let prompt = self.prompts.get_prompt(
            Stage::SectionRequirements.prompt_id(),
            &[
                ("APP_BACKGROUND", background.as_str()),
                ("PAGE_NAME", section.name.as_str()),
                ("PAGE_DESCRIPTION", section.description.as_str()),
            ],
        )?;
        let completion = self.complete(Stage::SectionRequirements, prompt).await?;

        let response = json!({
            "text": completion.text,
            "finishReason": completion.finish_reason,
            "generatedAt": Utc::now().to_rfc3339(),
            "metadata": completion.metadata(),
        });
        self.db
            .sections
            .record_generation(
                account_id,
                &document.id,
                section_id,
                &response,
                &section.content_digest(),
            )
            .await?;

        Ok(SectionRequirements {
            text: completion.text,
            finish_reason: completion.finish_reason,
        })
    }

    async fn complete(&self, stage: Stage, prompt: String) -> Result<Completion> {
        let request = self.config.request(stage, prompt);
        let service = &self.completion;
        let request_ref = &request;

        let completion = with_retry(&self.config.retry, AIServiceError::is_overloaded, move |attempt| {
            debug!(stage = %stage, attempt, "Issuing completion call");
            service.complete(request_ref)
        })
        .await?;

        debug!(
            stage = %stage,
            finish_reason = %completion.finish_reason,
            output_tokens = completion.usage.output_tokens,
            "Completion received"
        );
        Ok(completion)
    }
}
