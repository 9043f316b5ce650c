use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use ai_client::{outer_json_object, strip_code_blocks, truncate_to_char_boundary, AiError};
use dossier_common::{
    Confidence, Education, Experience, ModelSettings, ProfileRequest, RawPost, ReliabilityResult,
    Reputation, SourceId, StructuredProfile,
};

use crate::error::ProfilerIssue;
use crate::traits::{CompletionRequest, LanguageModel};

const STRUCTURE_TEMPERATURE: f32 = 0.2;
const POSTS_TEMPERATURE: f32 = 0.4;
const SYNTHESIS_TEMPERATURE: f32 = 0.5;
const JUSTIFY_TEMPERATURE: f32 = 0.6;
const KNOWLEDGE_TEMPERATURE: f32 = 0.2;

// =============================================================================
// Model output contracts
// =============================================================================

/// What the model returns when structuring one source's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedFields {
    /// One-line professional headline, exactly as the source states it
    pub headline: Option<String>,
    /// Short professional summary or bio
    pub summary: Option<String>,
    /// Current job title
    pub current_role: Option<String>,
    /// What the person's current company does
    pub company_description: Option<String>,
    #[serde(default)]
    pub experiences: Vec<ExtractedExperience>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<ExtractedEducation>,
    /// Articles, papers or books authored by the person
    #[serde(default)]
    pub publications: Vec<String>,
    /// Talks, keynotes, panels or webinars given by the person
    #[serde(default)]
    pub speaking_engagements: Vec<String>,
    /// Public contact channels (email, website, twitter, github, ...)
    #[serde(default)]
    pub contacts: Vec<ExtractedContact>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedExperience {
    pub title: Option<String>,
    pub company: Option<String>,
    /// As written in the source, e.g. "2014" or "Feb 2014"
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: Option<bool>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedEducation {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedContact {
    /// Lowercase channel name, e.g. "email", "website", "twitter"
    pub channel: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PostAnalysis {
    #[serde(default)]
    pub posts: Vec<AnalyzedPost>,
    #[serde(default)]
    pub recurring_themes: Vec<String>,
    /// e.g. "inspirational", "technical", "promotional"
    pub overall_tone: Option<String>,
    /// e.g. "weekly", "monthly", "occasional"
    pub posting_frequency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzedPost {
    /// Index of the post as numbered in the prompt
    pub index: u32,
    pub summary: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReputationAssessment {
    /// Three to five sentence narrative of the person's professional standing
    pub summary: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Gaps, inconsistencies or thin evidence worth flagging
    #[serde(default)]
    pub weak_signals: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeRecall {
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub current_role: Option<String>,
    pub company_description: Option<String>,
    #[serde(default)]
    pub experiences: Vec<ExtractedExperience>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<ExtractedEducation>,
    #[serde(default)]
    pub publications: Vec<String>,
    #[serde(default)]
    pub notable_achievements: Vec<String>,
    /// "high", "medium", "low" or "none"
    pub confidence: Option<String>,
}

// =============================================================================
// Validated results
// =============================================================================

/// Validated partial profile from one source: blanks removed, incomplete
/// entries dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub current_role: Option<String>,
    pub company_description: Option<String>,
    pub experiences: Vec<Experience>,
    pub skills: BTreeSet<String>,
    pub education: Vec<Education>,
    pub publications: Vec<String>,
    pub speaking_engagements: Vec<String>,
    pub contact_info: BTreeMap<String, String>,
}

impl ProfileFields {
    pub fn is_empty(&self) -> bool {
        self == &ProfileFields::default()
    }
}

impl From<ExtractedFields> for ProfileFields {
    fn from(raw: ExtractedFields) -> Self {
        let mut contact_info = BTreeMap::new();
        for contact in raw.contacts {
            if let (Some(channel), Some(value)) = (clean(contact.channel), clean(contact.value)) {
                contact_info.entry(channel.to_lowercase()).or_insert(value);
            }
        }
        Self {
            headline: clean(raw.headline),
            summary: clean(raw.summary),
            current_role: clean(raw.current_role),
            company_description: clean(raw.company_description),
            experiences: experiences(raw.experiences),
            skills: raw.skills.into_iter().filter_map(|s| clean(Some(s))).collect(),
            education: education(raw.education),
            publications: clean_list(raw.publications),
            speaking_engagements: clean_list(raw.speaking_engagements),
            contact_info,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSummary {
    pub summary: Option<String>,
    pub themes: Vec<String>,
}

/// Post analysis aligned with the input posts: `summaries[i]` describes post `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDigest {
    pub summaries: Vec<PostSummary>,
    pub recurring_themes: Vec<String>,
    pub overall_tone: Option<String>,
    pub posting_frequency: Option<String>,
}

/// Profile fields recalled from model knowledge.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeProfile {
    pub fields: ProfileFields,
    pub notable_achievements: Vec<String>,
    pub confidence: Confidence,
}

// =============================================================================
// Extractor
// =============================================================================

pub struct Extractor {
    model: Arc<dyn LanguageModel>,
    settings: ModelSettings,
}

impl Extractor {
    pub fn new(model: Arc<dyn LanguageModel>, settings: ModelSettings) -> Self {
        Self { model, settings }
    }

    /// Structure one source's raw text into profile fields.
    pub async fn structure(
        &self,
        source: SourceId,
        request: &ProfileRequest,
        raw_text: &str,
    ) -> Result<ProfileFields, ProfilerIssue> {
        let content = truncate_to_char_boundary(raw_text, self.settings.max_content_chars);
        let user = format!(
            "Person: {}\nCompany: {}\nSource: {source}\n\nContent:\n{content}",
            request.full_name(),
            request.company.as_deref().unwrap_or("unknown"),
        );
        let completion =
            CompletionRequest::structured::<ExtractedFields>(STRUCTURE_SYSTEM, user, STRUCTURE_TEMPERATURE);

        let text = self.call("structure", &completion).await?;
        let raw: ExtractedFields = parse("structure", &text)?;
        let fields = ProfileFields::from(raw);
        debug!(source = %source, empty = fields.is_empty(), "Structured source content");
        Ok(fields)
    }

    /// Summarize professional-network posts. Empty input never reaches the model.
    pub async fn summarize_posts(&self, posts: &[RawPost]) -> Result<PostDigest, ProfilerIssue> {
        if posts.is_empty() {
            return Ok(PostDigest::default());
        }

        let numbered = posts
            .iter()
            .enumerate()
            .map(|(i, post)| format!("[{i}] {}", post.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let user = format!("Posts to analyze:\n\n{numbered}");
        let completion =
            CompletionRequest::structured::<PostAnalysis>(POSTS_SYSTEM, user, POSTS_TEMPERATURE);

        let text = self.call("summarize_posts", &completion).await?;
        let analysis: PostAnalysis = parse("summarize_posts", &text)?;

        let mut summaries = vec![PostSummary::default(); posts.len()];
        for post in analysis.posts {
            if let Some(slot) = summaries.get_mut(post.index as usize) {
                slot.summary = clean(post.summary);
                slot.themes = clean_list(post.themes);
            }
        }
        Ok(PostDigest {
            summaries,
            recurring_themes: clean_list(analysis.recurring_themes),
            overall_tone: clean(analysis.overall_tone),
            posting_frequency: clean(analysis.posting_frequency),
        })
    }

    /// Narrative reputation assessment of the merged profile.
    pub async fn synthesize(&self, profile: &StructuredProfile) -> Result<Reputation, ProfilerIssue> {
        let user = format!("Profile to assess:\n\n{}", profile_digest(profile));
        let completion = CompletionRequest::structured::<ReputationAssessment>(
            SYNTHESIS_SYSTEM,
            user,
            SYNTHESIS_TEMPERATURE,
        );

        let text = self.call("synthesize", &completion).await?;
        let assessment: ReputationAssessment = parse("synthesize", &text)?;
        let summary = clean(assessment.summary).ok_or_else(|| ProfilerIssue::ExtractionSchemaInvalid {
            capability: "synthesize",
            detail: "summary missing".to_string(),
        })?;
        Ok(Reputation {
            summary,
            strengths: clean_list(assessment.strengths),
            weak_signals: clean_list(assessment.weak_signals),
        })
    }

    /// Human-readable explanation of a computed score.
    pub async fn justify_score(
        &self,
        result: &ReliabilityResult,
        sources_used: &BTreeSet<SourceId>,
    ) -> Result<String, ProfilerIssue> {
        let factors = result
            .factors
            .iter()
            .map(|f| format!("- {}: {}", f.label, f.points))
            .collect::<Vec<_>>()
            .join("\n");
        let sources = if sources_used.is_empty() {
            "none".to_string()
        } else {
            sources_used.iter().map(SourceId::as_str).collect::<Vec<_>>().join(", ")
        };
        let user = format!(
            "Score: {}/100\nSources used: {sources}\nFactors:\n{factors}",
            result.score
        );
        let completion = CompletionRequest::text(JUSTIFY_SYSTEM, user, JUSTIFY_TEMPERATURE);

        let text = self.call("justify_score", &completion).await?;
        unwrap_justification(&text).ok_or_else(|| ProfilerIssue::ExtractionSchemaInvalid {
            capability: "justify_score",
            detail: "empty justification".to_string(),
        })
    }

    /// Recall what the model knows about a person when no live source answered.
    pub async fn enrich_from_knowledge(
        &self,
        request: &ProfileRequest,
    ) -> Result<KnowledgeProfile, ProfilerIssue> {
        let user = format!(
            "Person: {}\nCompany: {}",
            request.full_name(),
            request.company.as_deref().unwrap_or("unknown"),
        );
        let completion =
            CompletionRequest::structured::<KnowledgeRecall>(KNOWLEDGE_SYSTEM, user, KNOWLEDGE_TEMPERATURE);

        let text = self.call("enrich_from_knowledge", &completion).await?;
        let recall: KnowledgeRecall = parse("enrich_from_knowledge", &text)?;

        let confidence = parse_confidence(recall.confidence.as_deref());
        let fields = ProfileFields::from(ExtractedFields {
            headline: recall.headline,
            summary: recall.summary,
            current_role: recall.current_role,
            company_description: recall.company_description,
            experiences: recall.experiences,
            skills: recall.skills,
            education: recall.education,
            publications: recall.publications,
            speaking_engagements: Vec::new(),
            contacts: Vec::new(),
        });
        Ok(KnowledgeProfile {
            fields,
            notable_achievements: clean_list(recall.notable_achievements),
            confidence,
        })
    }

    /// One model call under the per-call timeout, retrying transient failures.
    async fn call(
        &self,
        capability: &'static str,
        request: &CompletionRequest,
    ) -> Result<String, ProfilerIssue> {
        let max_attempts = self.settings.max_retries + 1;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.settings.timeout, self.model.complete(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AiError::Timeout(format!(
                    "no response within {:.1}s",
                    self.settings.timeout.as_secs_f64()
                ))),
            };

            match outcome {
                Ok(text) => {
                    debug!(capability, attempt, "Model call succeeded");
                    return Ok(text);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(capability, attempt, error = %err, "Model call failed, retrying");
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(err) => {
                    return Err(ProfilerIssue::ModelUnavailable {
                        capability,
                        detail: format!("{err} (after {attempt} attempts)"),
                    });
                }
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse<T: DeserializeOwned>(capability: &'static str, text: &str) -> Result<T, ProfilerIssue> {
    let body = strip_code_blocks(text);
    serde_json::from_str(body)
        .or_else(|first| match outer_json_object(body) {
            Some(inner) => serde_json::from_str(inner),
            None => Err(first),
        })
        .map_err(|e| ProfilerIssue::ExtractionSchemaInvalid {
            capability,
            detail: e.to_string(),
        })
}

/// Plain text, or the `justification` field when the model answered in JSON.
fn unwrap_justification(text: &str) -> Option<String> {
    let body = strip_code_blocks(text).trim();
    if let Some(object) = outer_json_object(body) {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(object) {
            if let Some(inner) = map.get("justification").and_then(|v| v.as_str()) {
                return clean(Some(inner.to_string()));
            }
        }
    }
    clean(Some(body.to_string()))
}

fn parse_confidence(raw: Option<&str>) -> Confidence {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("high") => Confidence::High,
        Some("medium") => Confidence::Medium,
        Some("none") => Confidence::None,
        _ => Confidence::Low,
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null") && !v.eq_ignore_ascii_case("n/a"))
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter_map(|v| clean(Some(v)))
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

fn experiences(raw: Vec<ExtractedExperience>) -> Vec<Experience> {
    raw.into_iter()
        .filter_map(|e| {
            let title = clean(e.title)?;
            let end_date = clean(e.end_date);
            Some(Experience {
                title,
                company: clean(e.company),
                start_date: clean(e.start_date),
                is_current: e.is_current.unwrap_or(false),
                end_date,
                description: clean(e.description),
                location: clean(e.location),
            })
        })
        .collect()
}

fn education(raw: Vec<ExtractedEducation>) -> Vec<Education> {
    raw.into_iter()
        .filter_map(|e| {
            Some(Education {
                institution: clean(e.institution)?,
                degree: clean(e.degree),
                year: clean(e.year),
            })
        })
        .collect()
}

/// Compact JSON view of a merged profile for the synthesis prompt.
fn profile_digest(profile: &StructuredProfile) -> String {
    let view = json!({
        "name": format!("{} {}", profile.first_name, profile.last_name),
        "company": profile.company,
        "headline": profile.headline,
        "current_role": profile.current_role,
        "summary": profile.summary,
        "company_description": profile.company_description,
        "experiences": profile.experiences,
        "skills": profile.skills,
        "education": profile.education,
        "publications": profile.publications,
        "speaking_engagements": profile.speaking_engagements,
        "recurring_post_themes": profile.linkedin_analysis.recurring_themes,
        "post_count": profile.linkedin_analysis.posts.len(),
        "sources_used": profile.sources_used,
        "from_model_knowledge": profile.knowledge_fallback.is_some(),
    });
    serde_json::to_string_pretty(&view).unwrap_or_else(|_| view.to_string())
}

// =============================================================================
// Prompts
// =============================================================================

const STRUCTURE_SYSTEM: &str = "You extract professional information about one named person \
from scraped web content. Report only what the content states about that person. \
Use null or an empty list for anything not present. Never guess or fill in from general knowledge.";

const POSTS_SYSTEM: &str = "You analyze a professional's social media posts. For each numbered \
post give a one-sentence summary and its themes, keyed by the post's index. Then give the \
recurring themes across posts, the overall tone and the apparent posting frequency.";

const SYNTHESIS_SYSTEM: &str = "You assess professional reputation. Given a merged profile, write \
a short factual narrative of the person's standing, list concrete strengths supported by the \
profile, and list weak signals such as gaps, inconsistencies or thin evidence.";

const JUSTIFY_SYSTEM: &str = "You explain reliability scores for compiled professional profiles. \
In two or three sentences of plain text, explain the given score using only the listed sources \
and factors. Do not suggest a different score.";

const KNOWLEDGE_SYSTEM: &str = "No live web source could be reached for this person. Report only \
widely published facts you are confident about from your training data. Leave fields null or \
empty when unsure. Set confidence to \"none\" if you do not know this person.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_drops_blanks_and_titleless_experiences() {
        let raw = ExtractedFields {
            headline: Some("  ".into()),
            summary: Some("Builds cloud platforms.".into()),
            experiences: vec![
                ExtractedExperience {
                    title: Some("CEO".into()),
                    company: Some("Microsoft".into()),
                    start_date: Some("2014".into()),
                    is_current: Some(true),
                    ..Default::default()
                },
                ExtractedExperience {
                    title: None,
                    company: Some("Ghost Corp".into()),
                    ..Default::default()
                },
            ],
            skills: vec!["Cloud".into(), " ".into()],
            education: vec![ExtractedEducation {
                institution: Some("".into()),
                degree: Some("MBA".into()),
                year: None,
            }],
            contacts: vec![
                ExtractedContact {
                    channel: Some("Email".into()),
                    value: Some("satya@example.com".into()),
                },
                ExtractedContact {
                    channel: Some("email".into()),
                    value: Some("other@example.com".into()),
                },
            ],
            ..Default::default()
        };
        let fields = ProfileFields::from(raw);
        assert_eq!(fields.headline, None);
        assert_eq!(fields.experiences.len(), 1);
        assert!(fields.experiences[0].is_current);
        assert_eq!(fields.skills.len(), 1);
        assert!(fields.education.is_empty());
        assert_eq!(fields.contact_info["email"], "satya@example.com");
    }

    #[test]
    fn default_fields_are_empty() {
        assert!(ProfileFields::from(ExtractedFields::default()).is_empty());
    }

    #[test]
    fn parse_tolerates_fenced_and_wrapped_json() {
        let fenced = "```json\n{\"headline\": \"CEO\"}\n```";
        let fields: ExtractedFields = parse("structure", fenced).unwrap();
        assert_eq!(fields.headline.as_deref(), Some("CEO"));

        let chatty = "Here you go: {\"headline\": \"CTO\"} hope it helps";
        let fields: ExtractedFields = parse("structure", chatty).unwrap();
        assert_eq!(fields.headline.as_deref(), Some("CTO"));
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let err = parse::<ExtractedFields>("structure", "{\"skills\": \"not a list\"}").unwrap_err();
        assert!(matches!(err, ProfilerIssue::ExtractionSchemaInvalid { capability: "structure", .. }));
    }

    #[test]
    fn justification_json_is_unwrapped() {
        assert_eq!(
            unwrap_justification("{\"justification\": \"Two sources agree.\"}").as_deref(),
            Some("Two sources agree.")
        );
        assert_eq!(
            unwrap_justification("  Plain text answer. ").as_deref(),
            Some("Plain text answer.")
        );
        assert_eq!(unwrap_justification("   "), None);
    }

    #[test]
    fn confidence_defaults_to_low() {
        assert_eq!(parse_confidence(Some("HIGH")), Confidence::High);
        assert_eq!(parse_confidence(Some("none")), Confidence::None);
        assert_eq!(parse_confidence(Some("maybe")), Confidence::Low);
        assert_eq!(parse_confidence(None), Confidence::Low);
    }

    #[test]
    fn clean_list_dedups_case_insensitively() {
        let out = clean_list(vec!["AI".into(), "ai".into(), "Cloud".into(), "".into()]);
        assert_eq!(out, vec!["AI".to_string(), "Cloud".to_string()]);
    }

    #[test]
    fn schemas_are_strict_objects() {
        use ai_client::StructuredOutput;
        let schema = ExtractedFields::openai_schema();
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "contacts"));
        assert_eq!(<ExtractedFields as StructuredOutput>::schema_name(), "ExtractedFields");
    }
}
