// ABOUTME: Prompt context assembly from stored documents and sections
// ABOUTME: Builds intro parameters, page background, and the full PRD body for planning

use std::fmt::Write;

use prdsmith_storage::{Document, Section};
use serde_json::Value;

const NO_ADDITIONAL_PACKAGES: &str = "No additional packages specified";

/// Template parameters of the intro stage
pub fn intro_parameters(document: &Document) -> [(&'static str, &str); 9] {
    [
        ("APPLICATION_NAME", document.app_name.as_str()),
        ("APPLICATION_DESCRIPTION", document.app_description.as_str()),
        ("PROGRAMMING_LANGUAGE", document.prog_language.as_str()),
        ("framework", document.framework.as_str()),
        ("styling", document.styling.as_str()),
        ("backend", document.backend.as_str()),
        ("auth", document.auth.as_str()),
        ("payments", document.payments.as_str()),
        ("otherPackages", document.other_packages.as_str()),
    ]
}

/// The generated introduction, or the user's own description when there is none
pub fn overview(document: &Document) -> &str {
    document.intro().unwrap_or(&document.app_description)
}

/// Background for the page requirements stage
pub fn app_background(document: &Document) -> String {
    let mut background = format!(
        "Application Name: {}\nOverview:\n{}\nTech Stack:\n",
        document.app_name,
        overview(document).trim()
    );
    push_stack_line(&mut background, "Programming Language", &document.prog_language);
    push_stack_line(&mut background, "Framework", &document.framework);
    push_stack_line(&mut background, "Styling", &document.styling);
    push_stack_line(&mut background, "Backend", &document.backend);
    push_stack_line(&mut background, "Authentication", &document.auth);
    if !document.payments.trim().is_empty() {
        push_stack_line(&mut background, "Payments", &document.payments);
    }
    if !document.other_packages.trim().is_empty() {
        push_stack_line(&mut background, "Other Packages", &document.other_packages);
    }

    background.trim_end().to_string()
}

/// Composite document body for the implementation plan stage.
///
/// Sections are rendered by position regardless of the order given.
pub fn prd_body(document: &Document, sections: &[Section]) -> String {
    let mut body = format!(
        "# {}\n\n## Overview\n{}\n\n## Technical Stack\n",
        document.app_name,
        overview(document).trim()
    );
    push_stack_line(&mut body, "Programming Language", &document.prog_language);
    push_stack_line(&mut body, "Framework", &document.framework);
    push_stack_line(&mut body, "Styling", &document.styling);
    push_stack_line(&mut body, "Backend", &document.backend);
    push_stack_line(&mut body, "Authentication", &document.auth);
    push_stack_line(&mut body, "Payments", &document.payments);
    let packages = if document.other_packages.trim().is_empty() {
        NO_ADDITIONAL_PACKAGES
    } else {
        document.other_packages.as_str()
    };
    push_stack_line(&mut body, "Additional Packages", packages);

    let mut ordered: Vec<&Section> = sections.iter().collect();
    ordered.sort_by_key(|section| section.position);

    body.push_str("\n## Pages\n");
    for (index, section) in ordered.into_iter().enumerate() {
        let _ = write!(body, "\n### {}. {}\n{}\n", index + 1, section.name, section.description);
        if let Some(details) = section.response().map(flatten_response) {
            if !details.trim().is_empty() {
                let _ = write!(body, "\nDetails:\n{}\n", details.trim());
            }
        }
    }

    body
}

/// Render a stored response blob as plain text.
///
/// Generated section responses are `{ "text": ... }` objects; older rows may
/// hold that object serialized into a JSON string.
pub fn flatten_response(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(inner @ Value::Object(_)) => flatten_response(&inner),
            _ => text.clone(),
        },
        Value::Object(map) => match map.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

fn push_stack_line(out: &mut String, label: &str, value: &str) {
    let value = if value.trim().is_empty() {
        "Not specified"
    } else {
        value.trim()
    };
    let _ = writeln!(out, "- {}: {}", label, value);
}
