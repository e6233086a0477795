// ABOUTME: Stage-addressed prompt templates for PRD generation
// ABOUTME: Loads built-in or overridden templates and performs exact-token parameter substitution

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Prompt id of the introduction stage
pub const PRD_INTRO: &str = "prd-intro";
/// Prompt id of the per-page requirements stage
pub const PAGE_REQUIREMENTS: &str = "page-requirements";
/// Prompt id of the implementation plan stage
pub const IMPLEMENTATION_PLAN: &str = "implementation-plan";

const BUILTIN_PROMPTS: [(&str, &str); 3] = [
    (PRD_INTRO, include_str!("../prd/prd-intro.json")),
    (PAGE_REQUIREMENTS, include_str!("../prd/page-requirements.json")),
    (IMPLEMENTATION_PLAN, include_str!("../prd/implementation-plan.json")),
];

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt not found: {0}")]
    NotFound(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Failed to read prompt file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse prompt JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid prompt format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub version: String,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub category: String,
    pub template: String,
    pub parameters: Vec<String>,
    /// Substituted when a parameter is supplied but blank
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fallbacks: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PromptMetadata>,
}

/// Read-only store of the stage templates.
///
/// Built-in templates are compiled into the binary. A prompts directory may
/// override any of them with `<id>.json` (a full prompt definition) or
/// `<id>.txt` (template text only, keeping the built-in parameters and
/// fallbacks).
#[derive(Debug, Clone)]
pub struct PromptManager {
    prompts: HashMap<String, Prompt>,
}

impl PromptManager {
    pub fn new(prompts_dir: Option<PathBuf>) -> Result<Self, PromptError> {
        let mut prompts = HashMap::new();
        for (id, source) in BUILTIN_PROMPTS {
            let prompt: Prompt = serde_json::from_str(source)?;
            validate(&prompt, id)?;
            prompts.insert(id.to_string(), prompt);
        }

        if let Some(dir) = prompts_dir {
            if !dir.is_dir() {
                return Err(PromptError::InvalidFormat(format!(
                    "Prompts directory does not exist: {}",
                    dir.display()
                )));
            }

            for prompt in prompts.values_mut() {
                if let Some(overridden) = load_override(&dir, prompt)? {
                    info!("Using prompt override for '{}' from {}", prompt.id, dir.display());
                    *prompt = overridden;
                }
            }
        }

        Ok(Self { prompts })
    }

    /// Get a prompt by id with parameter substitution
    pub fn get_prompt(&self, prompt_id: &str, parameters: &[(&str, &str)]) -> Result<String, PromptError> {
        let prompt = self.get_prompt_metadata(prompt_id)?;
        let param_map: HashMap<&str, &str> = parameters.iter().copied().collect();

        let mut values: HashMap<&str, &str> = HashMap::with_capacity(prompt.parameters.len());
        for required in &prompt.parameters {
            let value = param_map
                .get(required.as_str())
                .copied()
                .ok_or_else(|| PromptError::MissingParameter(required.clone()))?;

            let value = match prompt.fallbacks.get(required) {
                Some(fallback) if value.trim().is_empty() => fallback.as_str(),
                _ => value,
            };
            values.insert(required.as_str(), value);
        }

        let filled = fill_template(&prompt.template, &values);
        debug!("Filled prompt '{}' ({} chars)", prompt_id, filled.len());
        Ok(filled)
    }

    /// Get prompt metadata without substitution
    pub fn get_prompt_metadata(&self, prompt_id: &str) -> Result<&Prompt, PromptError> {
        self.prompts
            .get(prompt_id)
            .ok_or_else(|| PromptError::NotFound(prompt_id.to_string()))
    }

    /// Ids of every available prompt, sorted
    pub fn list_prompts(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.prompts.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Replace each `{{NAME}}` token whose name is in `values`, in one pass.
///
/// Substituted text is never scanned again, so values containing `{{...}}`
/// are inserted verbatim. Tokens with unknown names are left as they are.
pub fn fill_template(template: &str, values: &HashMap<&str, &str>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        match after_open.find("}}") {
            Some(end) => {
                let name = &after_open[..end];
                match values.get(name) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("{{");
                        result.push_str(name);
                        result.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// Names of all `{{NAME}}` tokens in a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        names.push(&after_open[..end]);
        rest = &after_open[end + 2..];
    }

    names
}

fn validate(prompt: &Prompt, expected_id: &str) -> Result<(), PromptError> {
    if prompt.id != expected_id || prompt.template.is_empty() || prompt.category.is_empty() {
        return Err(PromptError::InvalidFormat(format!(
            "Invalid prompt format for '{}'",
            expected_id
        )));
    }

    // Every token in the template must be declared, otherwise it would reach the model unfilled
    if let Some(undeclared) = placeholders(&prompt.template)
        .into_iter()
        .find(|name| !prompt.parameters.iter().any(|p| p == name))
    {
        return Err(PromptError::InvalidFormat(format!(
            "Prompt '{}' uses undeclared placeholder '{}'",
            expected_id, undeclared
        )));
    }

    Ok(())
}

fn load_override(dir: &Path, builtin: &Prompt) -> Result<Option<Prompt>, PromptError> {
    let json_path = dir.join(format!("{}.json", builtin.id));
    if json_path.is_file() {
        debug!("Loading prompt from {}", json_path.display());
        let content = fs::read_to_string(&json_path)?;
        let prompt: Prompt = serde_json::from_str(&content)?;
        validate(&prompt, &builtin.id)?;
        return Ok(Some(prompt));
    }

    let text_path = dir.join(format!("{}.txt", builtin.id));
    if text_path.is_file() {
        debug!("Loading prompt template from {}", text_path.display());
        let prompt = Prompt {
            template: fs::read_to_string(&text_path)?,
            ..builtin.clone()
        };
        validate(&prompt, &builtin.id)?;
        return Ok(Some(prompt));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn intro_params<'a>(other_packages: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("APPLICATION_NAME", "Acme"),
            ("APPLICATION_DESCRIPTION", "Inventory tracking for small shops"),
            ("PROGRAMMING_LANGUAGE", "TypeScript"),
            ("framework", "Next"),
            ("styling", "Tailwind"),
            ("backend", "Postgres"),
            ("auth", "Clerk"),
            ("payments", "Stripe"),
            ("otherPackages", other_packages),
        ]
    }

    #[test]
    fn test_builtin_prompts_load() {
        let manager = PromptManager::new(None).unwrap();
        assert_eq!(
            manager.list_prompts(),
            vec![IMPLEMENTATION_PLAN, PAGE_REQUIREMENTS, PRD_INTRO]
        );
    }

    #[test]
    fn test_intro_prompt_fills_every_placeholder() {
        let manager = PromptManager::new(None).unwrap();
        let prompt = manager.get_prompt(PRD_INTRO, &intro_params("zod")).unwrap();

        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("Next"));
        assert!(prompt.contains("zod"));
        assert!(placeholders(&prompt).is_empty());
    }

    #[test]
    fn test_blank_optional_field_uses_fallback() {
        let manager = PromptManager::new(None).unwrap();
        let prompt = manager.get_prompt(PRD_INTRO, &intro_params("  ")).unwrap();

        assert!(prompt.contains("No additional packages specified"));
        assert!(!prompt.contains("{{otherPackages}}"));
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let manager = PromptManager::new(None).unwrap();
        let first = manager.get_prompt(PRD_INTRO, &intro_params("")).unwrap();
        let second = manager.get_prompt(PRD_INTRO, &intro_params("")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_parameter_error() {
        let manager = PromptManager::new(None).unwrap();
        let result = manager.get_prompt(PAGE_REQUIREMENTS, &[("PAGE_NAME", "Home")]);
        assert!(matches!(result, Err(PromptError::MissingParameter(_))));
    }

    #[test]
    fn test_prompt_not_found() {
        let manager = PromptManager::new(None).unwrap();
        let result = manager.get_prompt("nonexistent", &[]);
        assert!(matches!(result, Err(PromptError::NotFound(_))));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let values: HashMap<&str, &str> = [("A", "{{B}}"), ("B", "b")].into_iter().collect();
        assert_eq!(fill_template("{{A}} and {{B}}", &values), "{{B}} and b");
    }

    #[test]
    fn test_repeated_and_unknown_tokens() {
        let values: HashMap<&str, &str> = [("NAME", "Acme")].into_iter().collect();
        assert_eq!(
            fill_template("{{NAME}}/{{NAME}} {{OTHER}} {{open", &values),
            "Acme/Acme {{OTHER}} {{open"
        );
    }

    #[test]
    fn test_special_characters_are_literal() {
        let values: HashMap<&str, &str> = [("DESC", "$1 (a|b)* \\n")].into_iter().collect();
        assert_eq!(fill_template("<{{DESC}}>", &values), "<$1 (a|b)* \\n>");
    }

    #[test]
    fn test_text_override_keeps_builtin_parameters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("page-requirements.txt"),
            "Page {{PAGE_NAME}}: {{PAGE_DESCRIPTION}} in {{APP_BACKGROUND}}",
        )
        .unwrap();

        let manager = PromptManager::new(Some(dir.path().to_path_buf())).unwrap();
        let prompt = manager
            .get_prompt(
                PAGE_REQUIREMENTS,
                &[
                    ("APP_BACKGROUND", "Acme"),
                    ("PAGE_NAME", "Home"),
                    ("PAGE_DESCRIPTION", ""),
                ],
            )
            .unwrap();

        assert_eq!(prompt, "Page Home: No description provided in Acme");
    }

    #[test]
    fn test_override_with_undeclared_placeholder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prd-intro.txt"), "{{UNKNOWN}}").unwrap();

        let result = PromptManager::new(Some(dir.path().to_path_buf()));
        assert!(matches!(result, Err(PromptError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_prompts_dir_is_rejected() {
        let result = PromptManager::new(Some(PathBuf::from("/nonexistent/prompts")));
        assert!(matches!(result, Err(PromptError::InvalidFormat(_))));
    }
}
