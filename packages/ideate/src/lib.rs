// ABOUTME: Prdsmith ideate library - staged PRD generation
// ABOUTME: Turns stored documents and sections into prompts, completions, and persisted results

pub mod batch;
pub mod context;
pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod parser;
pub mod stage;

pub use batch::{BatchItem, BatchItemStatus, BatchReport};
pub use error::{IdeateError, Result};
pub use locks::GenerationLocks;
pub use orchestrator::{
    GenerationOrchestrator, GenerationStatus, GenerationSummary, ImplementationOutcome,
    IntroOutcome, SectionRequirements, SubmitOutcome,
};
pub use parser::{ImplementationSections, SectionsKind, ANALYSIS_HEADER, PLAN_HEADER};
pub use stage::{GenerationConfig, Stage, StageSettings};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{IdeateError, Result};
    pub use crate::orchestrator::{GenerationOrchestrator, SubmitOutcome};
    pub use crate::stage::{GenerationConfig, Stage};
}
