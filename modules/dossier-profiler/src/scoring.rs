//! Reliability score: a pure function of live sources and field presence.

use std::collections::BTreeSet;

use dossier_common::{ReliabilityResult, ScoreFactor, SourceId, StructuredProfile};

/// Point table. Only presence counts, never content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringTable {
    pub per_source: u8,
    pub source_cap: u8,
    pub headline: u8,
    pub summary: u8,
    pub experiences: u8,
    pub publications: u8,
    pub linkedin_posts: u8,
    pub education: u8,
    pub skills: u8,
    pub contact: u8,
    pub completeness_cap: u8,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            per_source: 10,
            source_cap: 40,
            headline: 8,
            summary: 10,
            experiences: 12,
            publications: 8,
            linkedin_posts: 8,
            education: 6,
            skills: 4,
            contact: 4,
            completeness_cap: 60,
        }
    }
}

impl ScoringTable {
    pub fn score(&self, sources_used: &BTreeSet<SourceId>, profile: &StructuredProfile) -> ReliabilityResult {
        let source_points = (sources_used.len() as u32 * self.per_source as u32)
            .min(self.source_cap as u32) as u8;

        let items = [
            ("headline", profile.headline.is_some(), self.headline),
            ("summary", profile.summary.is_some(), self.summary),
            ("experiences", !profile.experiences.is_empty(), self.experiences),
            ("publications", !profile.publications.is_empty(), self.publications),
            ("linkedin_posts", !profile.linkedin_analysis.posts.is_empty(), self.linkedin_posts),
            ("education", !profile.education.is_empty(), self.education),
            ("skills", !profile.skills.is_empty(), self.skills),
            ("contact", !profile.contact_info.is_empty(), self.contact),
        ];

        let mut factors = Vec::with_capacity(items.len() + 1);
        factors.push(ScoreFactor {
            label: "sources".to_string(),
            points: source_points,
        });

        // Items are awarded in table order until the completeness cap is spent.
        let mut remaining = self.completeness_cap;
        for (label, present, points) in items {
            let awarded = if present { points.min(remaining) } else { 0 };
            remaining -= awarded;
            factors.push(ScoreFactor {
                label: label.to_string(),
                points: awarded,
            });
        }

        let completeness = self.completeness_cap - remaining;
        let score = (source_points as u32 + completeness as u32).min(100) as u8;

        ReliabilityResult {
            score,
            justification: String::new(),
            factors,
        }
    }
}

/// Score with the default table.
pub fn score(sources_used: &BTreeSet<SourceId>, profile: &StructuredProfile) -> ReliabilityResult {
    ScoringTable::default().score(sources_used, profile)
}

/// Fixed sentence for a score band.
pub fn reliability_level(score: u8) -> &'static str {
    match score {
        85.. => "Excellent reliability: the profile is corroborated by several live sources and is nearly complete.",
        70..=84 => "Good reliability: most profile sections are backed by live sources.",
        50..=69 => "Moderate reliability: the profile is partially corroborated and some sections are missing.",
        30..=49 => "Weak reliability: few live sources answered and much of the profile is missing.",
        _ => "Very weak reliability: little or no live evidence supports this profile.",
    }
}

/// Justification used when the model cannot provide one.
pub fn default_justification(result: &ReliabilityResult, sources_used: &BTreeSet<SourceId>) -> String {
    let n = sources_used.len();
    let plural = if n == 1 { "" } else { "s" };
    format!(
        "Score {}/100 from {n} live source{plural}. {}",
        result.score,
        reliability_level(result.score)
    )
}
