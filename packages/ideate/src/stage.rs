// ABOUTME: Generation stages and their completion parameters
// ABOUTME: Each stage pairs a prompt template with token, temperature, and caching settings

use std::fmt;

use prdsmith_ai::{CompletionRequest, RetryPolicy, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Intro,
    SectionRequirements,
    ImplementationPlan,
}

impl Stage {
    pub fn prompt_id(&self) -> &'static str {
        match self {
            Stage::Intro => prdsmith_prompts::PRD_INTRO,
            Stage::SectionRequirements => prdsmith_prompts::PAGE_REQUIREMENTS,
            Stage::ImplementationPlan => prdsmith_prompts::IMPLEMENTATION_PLAN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::SectionRequirements => "section-requirements",
            Stage::ImplementationPlan => "implementation-plan",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion parameters for one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub cache_prompt: bool,
}

/// Everything the orchestrator needs to turn a prompt into a completion call
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub retry: RetryPolicy,
    pub intro: StageSettings,
    pub section_requirements: StageSettings,
    pub implementation_plan: StageSettings,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
            intro: StageSettings {
                max_tokens: 1000,
                temperature: 0.2,
                cache_prompt: true,
            },
            section_requirements: StageSettings {
                max_tokens: 4000,
                temperature: 0.7,
                cache_prompt: false,
            },
            implementation_plan: StageSettings {
                max_tokens: 4000,
                temperature: 0.2,
                cache_prompt: true,
            },
        }
    }
}

impl GenerationConfig {
    pub fn settings(&self, stage: Stage) -> &StageSettings {
        match stage {
            Stage::Intro => &self.intro,
            Stage::SectionRequirements => &self.section_requirements,
            Stage::ImplementationPlan => &self.implementation_plan,
        }
    }

    pub fn request(&self, stage: Stage, prompt: String) -> CompletionRequest {
        let settings = self.settings(stage);
        CompletionRequest::user_prompt(&self.model, prompt)
            .with_max_tokens(settings.max_tokens)
            .with_temperature(settings.temperature)
            .with_prompt_caching(settings.cache_prompt)
    }
}
