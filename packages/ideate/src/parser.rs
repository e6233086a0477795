// ABOUTME: Splits implementation plan responses into analysis and plan parts
// ABOUTME: Total over any input; the result kind records which headers were usable

use serde::{Deserialize, Serialize};

pub const ANALYSIS_HEADER: &str = "## Implementation Analysis";
pub const PLAN_HEADER: &str = "## Staged Implementation Plan";

/// Which of the two headers the response provided, in usable order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionsKind {
    /// Analysis header followed by plan header
    Both,
    /// Analysis header without a following plan header
    AnalysisOnly,
    /// Plan header without a preceding analysis header
    PlanOnly,
    Neither,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationSections {
    pub kind: SectionsKind,
    pub analysis: String,
    pub plan: String,
}

impl ImplementationSections {
    /// Split a raw response.
    ///
    /// The analysis is the text between the analysis header and the first
    /// plan header after it, and is empty unless both are present in that
    /// order. The plan is the text after the first plan header, or the whole
    /// response when there is no plan header or nothing follows it.
    pub fn parse(raw: &str) -> Self {
        let analysis_start = raw.find(ANALYSIS_HEADER);
        let plan_start = raw.find(PLAN_HEADER);

        let plan = plan_start
            .map(|start| raw[start + PLAN_HEADER.len()..].trim())
            .filter(|plan| !plan.is_empty())
            .unwrap_or_else(|| raw.trim())
            .to_string();

        let Some(analysis_start) = analysis_start else {
            let kind = if plan_start.is_some() {
                SectionsKind::PlanOnly
            } else {
                SectionsKind::Neither
            };
            return Self {
                kind,
                analysis: String::new(),
                plan,
            };
        };

        let analysis_body = &raw[analysis_start + ANALYSIS_HEADER.len()..];
        match analysis_body.find(PLAN_HEADER) {
            Some(end) => Self {
                kind: SectionsKind::Both,
                analysis: analysis_body[..end].trim().to_string(),
                plan,
            },
            // Plan header only before the analysis header: the analysis is part of the plan text
            None if plan_start.is_some() => Self {
                kind: SectionsKind::PlanOnly,
                analysis: String::new(),
                plan,
            },
            None => Self {
                kind: SectionsKind::AnalysisOnly,
                analysis: String::new(),
                plan,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::both(
        "## Implementation Analysis\nUse Next.\n## Staged Implementation Plan\n1. Setup",
        SectionsKind::Both,
        "Use Next.",
        "1. Setup"
    )]
    #[case::preamble_before_headers(
        "Here you go.\n\n## Implementation Analysis\n  A  \n\n## Staged Implementation Plan\n  P  \n",
        SectionsKind::Both,
        "A",
        "P"
    )]
    #[case::plan_only(
        "Intro\n## Staged Implementation Plan\nStage 1",
        SectionsKind::PlanOnly,
        "",
        "Stage 1"
    )]
    #[case::analysis_only(
        "## Implementation Analysis\nJust analysis",
        SectionsKind::AnalysisOnly,
        "",
        "## Implementation Analysis\nJust analysis"
    )]
    #[case::neither("  free-form answer  ", SectionsKind::Neither, "", "free-form answer")]
    #[case::empty("", SectionsKind::Neither, "", "")]
    #[case::reversed(
        "## Staged Implementation Plan\nP\n## Implementation Analysis\nA",
        SectionsKind::PlanOnly,
        "",
        "P\n## Implementation Analysis\nA"
    )]
    #[case::plan_header_repeated(
        "## Implementation Analysis\nA\n## Staged Implementation Plan\nP1\n## Staged Implementation Plan\nP2",
        SectionsKind::Both,
        "A",
        "P1\n## Staged Implementation Plan\nP2"
    )]
    #[case::empty_plan_body_keeps_whole_response(
        "## Implementation Analysis\nA\n## Staged Implementation Plan\n   ",
        SectionsKind::Both,
        "A",
        "## Implementation Analysis\nA\n## Staged Implementation Plan"
    )]
    #[case::bare_plan_header(
        "## Staged Implementation Plan",
        SectionsKind::PlanOnly,
        "",
        "## Staged Implementation Plan"
    )]
    fn test_parse(
        #[case] raw: &str,
        #[case] kind: SectionsKind,
        #[case] analysis: &str,
        #[case] plan: &str,
    ) {
        let parsed = ImplementationSections::parse(raw);
        assert_eq!(parsed.kind, kind);
        assert_eq!(parsed.analysis, analysis);
        assert_eq!(parsed.plan, plan);
    }

    #[test]
    fn test_multibyte_text_around_headers() {
        let raw = "é## Implementation Analysis→ ü\n## Staged Implementation Plan日本";
        let parsed = ImplementationSections::parse(raw);
        assert_eq!(parsed.analysis, "→ ü");
        assert_eq!(parsed.plan, "日本");
    }

    #[test]
    fn test_serializes_kind_in_kebab_case() {
        let parsed = ImplementationSections::parse("## Staged Implementation Plan\nP");
        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["kind"], "plan-only");
    }
}
