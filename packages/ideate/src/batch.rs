// ABOUTME: Per-item outcome reporting for batch section generation
// ABOUTME: Counts successes, failures, and skips without aborting on the first error

use prdsmith_storage::Section;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Succeeded,
    Failed,
    /// Already processed and unchanged since
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub page_id: String,
    pub page_name: String,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn new(section: &Section, status: BatchItemStatus, error: Option<String>) -> Self {
        Self {
            page_id: section.id.clone(),
            page_name: section.name.clone(),
            status,
            error,
        }
    }

    pub fn succeeded(section: &Section) -> Self {
        Self::new(section, BatchItemStatus::Succeeded, None)
    }

    pub fn failed(section: &Section, error: impl Into<String>) -> Self {
        Self::new(section, BatchItemStatus::Failed, Some(error.into()))
    }

    pub fn skipped(section: &Section) -> Self {
        Self::new(section, BatchItemStatus::Skipped, None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn record(&mut self, item: BatchItem) {
        self.total += 1;
        match item.status {
            BatchItemStatus::Succeeded => self.succeeded += 1,
            BatchItemStatus::Failed => self.failed += 1,
            BatchItemStatus::Skipped => self.skipped += 1,
        }
        self.items.push(item);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
