use dossier_common::SourceId;
use thiserror::Error;

/// Degradations recovered inside a profiling run.
///
/// None of these fail a request. Each is logged where it happens and its
/// `Display` text lands in `debug.issues` of the response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfilerIssue {
    #[error("{source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },

    #[error("{source_id} returned no usable content")]
    SourceEmpty { source_id: SourceId },

    #[error("{capability}: model output did not match schema: {detail}")]
    ExtractionSchemaInvalid {
        capability: &'static str,
        detail: String,
    },

    #[error("{capability}: model unavailable: {detail}")]
    ModelUnavailable {
        capability: &'static str,
        detail: String,
    },
}

impl ProfilerIssue {
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            ProfilerIssue::SourceUnavailable { source_id, .. }
            | ProfilerIssue::SourceEmpty { source_id } => Some(*source_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_source() {
        let issue = ProfilerIssue::SourceUnavailable {
            source_id: SourceId::News,
            reason: "HTTP 503".into(),
        };
        assert_eq!(issue.to_string(), "news unavailable: HTTP 503");
        assert_eq!(issue.source_id(), Some(SourceId::News));
    }

    #[test]
    fn model_issues_carry_no_source() {
        let issue = ProfilerIssue::ModelUnavailable {
            capability: "synthesize",
            detail: "timeout".into(),
        };
        assert_eq!(issue.source_id(), None);
        assert!(issue.to_string().starts_with("synthesize:"));
    }
}
