use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DossierError;

// --- Request ---

/// Who to profile. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
}

impl ProfileRequest {
    pub fn new(first_name: &str, last_name: &str, company: Option<&str>) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            company: company.map(str::to_string),
        }
    }

    /// Trim all fields, reject blank names, drop a blank company.
    pub fn validate(self) -> Result<Self, DossierError> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        if first_name.is_empty() {
            return Err(DossierError::Validation("first_name must not be empty".into()));
        }
        if last_name.is_empty() {
            return Err(DossierError::Validation("last_name must not be empty".into()));
        }
        let company = self
            .company
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(Self {
            first_name,
            last_name,
            company,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// --- Sources ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Linkedin,
    Company,
    News,
    Social,
}

impl SourceId {
    /// Canonical order, also the order adapters are reported in.
    pub const ALL: [SourceId; 4] = [
        SourceId::Linkedin,
        SourceId::Company,
        SourceId::News,
        SourceId::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Linkedin => "linkedin",
            SourceId::Company => "company",
            SourceId::News => "news",
            SourceId::Social => "social",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Empty,
    Failed,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Empty => "empty",
            SourceStatus::Failed => "failed",
        })
    }
}

/// A post pulled off the professional-network activity feed, before analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPost {
    pub content: String,
    pub date: Option<String>,
    pub url: Option<String>,
}

/// Outcome of one Source Adapter for one request. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceResult {
    pub source_id: SourceId,
    pub status: SourceStatus,
    pub content: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub posts: Vec<RawPost>,
}

impl RawSourceResult {
    pub fn is_ok(&self) -> bool {
        self.status == SourceStatus::Ok
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub title: String,
    pub company: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: bool,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub content: String,
    pub date: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub themes: Vec<String>,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Self {
            content: raw.content,
            date: raw.date,
            url: raw.url,
            summary: None,
            themes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInAnalysis {
    pub posts: Vec<Post>,
    pub recurring_themes: Vec<String>,
    pub overall_tone: Option<String>,
    pub posting_frequency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub label: String,
    pub points: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliabilityResult {
    pub score: u8,
    pub justification: String,
    pub factors: Vec<ScoreFactor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weak_signals: Vec<String>,
}

/// Where a profile field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum FieldOrigin {
    Scraped(SourceId),
    KnowledgeBase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

/// Marks a profile whose content came from model knowledge rather than live sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeFallback {
    pub confidence: Confidence,
    pub notable_achievements: Vec<String>,
    pub warning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredProfile {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub current_role: Option<String>,
    pub company_description: Option<String>,
    pub experiences: Vec<Experience>,
    pub skills: BTreeSet<String>,
    pub education: Vec<Education>,
    pub publications: Vec<String>,
    pub speaking_engagements: Vec<String>,
    pub linkedin_analysis: LinkedInAnalysis,
    pub contact_info: BTreeMap<String, String>,
    pub reliability: ReliabilityResult,
    pub reputation: Option<Reputation>,
    pub sources_used: BTreeSet<SourceId>,
    /// Field name → origin of its value.
    pub provenance: BTreeMap<String, FieldOrigin>,
    pub knowledge_fallback: Option<KnowledgeFallback>,
}

impl StructuredProfile {
    /// A profile carrying only the request identity.
    pub fn skeleton(request: &ProfileRequest) -> Self {
        Self {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            company: request.company.clone(),
            ..Default::default()
        }
    }
}

// --- Response ---

/// Orchestrator stages, in the order a run moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Scraping,
    Extracting,
    Fallback,
    Scoring,
    Synthesizing,
    Assembled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub sources_used: BTreeSet<SourceId>,
    /// Human-readable wall time, e.g. `"3.42s"`.
    pub processing_time: String,
    pub processing_ms: u64,
    pub source_status: BTreeMap<SourceId, SourceStatus>,
    pub stages: Vec<Stage>,
    pub issues: Vec<String>,
    pub knowledge_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: StructuredProfile,
    pub debug: DebugInfo,
}
