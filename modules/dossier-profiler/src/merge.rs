//! Field merge across sources with fixed precedence.
//!
//! | field                          | winner                                        |
//! |--------------------------------|-----------------------------------------------|
//! | headline                       | linkedin, company, news, social               |
//! | current_role                   | linkedin, company, news, social, then company leadership page |
//! | summary                        | company, linkedin, news, social, then company leadership page |
//! | company_description            | company, linkedin, news, social               |
//! | experiences, education, skills | union in linkedin, company, news, social order |
//! | publications                   | news articles, business outlet mentions, then news, linkedin, company, social |
//! | speaking_engagements           | company page mentions, then company, linkedin, news, social |
//! | contact_info                   | adapter-discovered channels, then linkedin, company, news, social |
//!
//! Unions are deduplicated case-insensitively; the first spelling seen is kept.

use std::collections::{BTreeMap, BTreeSet};

use dossier_common::{
    Education, Experience, FieldOrigin, KnowledgeFallback, LinkedInAnalysis, Post, RawPost,
    RawSourceResult, SourceId, StructuredProfile,
};

use crate::extraction::{KnowledgeProfile, PostDigest, ProfileFields};
use crate::sources;

use SourceId::{Company, Linkedin, News, Social};

const ROLE_ORDER: [SourceId; 4] = [Linkedin, Company, News, Social];
const NARRATIVE_ORDER: [SourceId; 4] = [Company, Linkedin, News, Social];
const PUBLICATION_ORDER: [SourceId; 4] = [News, Linkedin, Company, Social];
const SPEAKING_ORDER: [SourceId; 4] = [Company, Linkedin, News, Social];

pub const KNOWLEDGE_WARNING: &str = "No live source could be reached. Fields with knowledge_base \
provenance come from the language model's training data and are unverified.";

/// Merge per-source extractions and adapter metadata into `profile`.
pub fn merge_sources(
    profile: &mut StructuredProfile,
    raw: &[RawSourceResult],
    extracted: &BTreeMap<SourceId, ProfileFields>,
) {
    let ok: BTreeMap<SourceId, &RawSourceResult> = raw
        .iter()
        .filter(|r| r.is_ok())
        .map(|r| (r.source_id, r))
        .collect();

    profile.sources_used = ok.keys().copied().collect();

    set_scalar(profile, "headline", extracted, &ROLE_ORDER, |f| &f.headline, |p| &mut p.headline);
    set_scalar(profile, "current_role", extracted, &ROLE_ORDER, |f| &f.current_role, |p| {
        &mut p.current_role
    });
    set_scalar(profile, "summary", extracted, &NARRATIVE_ORDER, |f| &f.summary, |p| &mut p.summary);
    set_scalar(
        profile,
        "company_description",
        extracted,
        &NARRATIVE_ORDER,
        |f| &f.company_description,
        |p| &mut p.company_description,
    );

    if let Some(company) = ok.get(&Company) {
        fill_from_leadership(profile, company);
    }

    let mut experiences = Union::new(|e: &Experience| {
        format!(
            "{}|{}",
            e.title.to_lowercase(),
            e.company.as_deref().unwrap_or_default().to_lowercase()
        )
    });
    let mut education = Union::new(|e: &Education| {
        format!(
            "{}|{}",
            e.institution.to_lowercase(),
            e.degree.as_deref().unwrap_or_default().to_lowercase()
        )
    });
    let mut skills = Union::new(|s: &String| s.to_lowercase());
    for id in ROLE_ORDER {
        let Some(fields) = extracted.get(&id) else { continue };
        experiences.extend(id, &fields.experiences);
        education.extend(id, &fields.education);
        skills.extend(id, fields.skills.iter());
    }
    experiences.store(profile, "experiences", |p, v| p.experiences = v);
    education.store(profile, "education", |p, v| p.education = v);
    skills.store(profile, "skills", |p, v: Vec<String>| {
        p.skills = v.into_iter().collect::<BTreeSet<_>>()
    });

    let mut publications = Union::new(|s: &String| s.to_lowercase());
    if let Some(news) = ok.get(&News) {
        let citations: Vec<String> = sources::news_articles(news)
            .iter()
            .map(|a| a.citation())
            .collect();
        publications.extend(News, &citations);
        let mentions: Vec<String> = sources::media_mentions(news)
            .iter()
            .map(|m| m.citation())
            .collect();
        publications.extend(News, &mentions);
    }
    for id in PUBLICATION_ORDER {
        if let Some(fields) = extracted.get(&id) {
            publications.extend(id, &fields.publications);
        }
    }
    publications.store(profile, "publications", |p, v| p.publications = v);

    let mut speaking = Union::new(|s: &String| s.to_lowercase());
    if let Some(company) = ok.get(&Company) {
        speaking.extend(Company, &sources::speaking_mentions(company));
    }
    for id in SPEAKING_ORDER {
        if let Some(fields) = extracted.get(&id) {
            speaking.extend(id, &fields.speaking_engagements);
        }
    }
    speaking.store(profile, "speaking_engagements", |p, v| p.speaking_engagements = v);

    merge_contacts(profile, &ok, extracted);
}

fn set_scalar<G, S>(
    profile: &mut StructuredProfile,
    field: &str,
    extracted: &BTreeMap<SourceId, ProfileFields>,
    order: &[SourceId],
    get: G,
    slot: S,
) where
    G: Fn(&ProfileFields) -> &Option<String>,
    S: FnOnce(&mut StructuredProfile) -> &mut Option<String>,
{
    let winner = order
        .iter()
        .find_map(|id| extracted.get(id).and_then(|f| get(f).clone()).map(|v| (*id, v)));
    let Some((id, value)) = winner else { return };

    *slot(profile) = Some(value);
    profile
        .provenance
        .insert(field.to_string(), FieldOrigin::Scraped(id));
}

/// Role and bio read off the company's own pages, for fields nothing else filled.
fn fill_from_leadership(profile: &mut StructuredProfile, company: &RawSourceResult) {
    let entries = sources::leadership_entries(company);
    if profile.current_role.is_none() {
        if let Some(role) = entries.iter().find_map(|e| e.role.clone()) {
            profile.current_role = Some(role);
            profile
                .provenance
                .insert("current_role".to_string(), FieldOrigin::Scraped(Company));
        }
    }
    if profile.summary.is_none() {
        if let Some(bio) = entries.iter().find_map(|e| e.bio.clone()) {
            profile.summary = Some(bio);
            profile
                .provenance
                .insert("summary".to_string(), FieldOrigin::Scraped(Company));
        }
    }
}

fn merge_contacts(
    profile: &mut StructuredProfile,
    ok: &BTreeMap<SourceId, &RawSourceResult>,
    extracted: &BTreeMap<SourceId, ProfileFields>,
) {
    let mut first_source = None;
    let mut add = |profile: &mut StructuredProfile, id: SourceId, channel: &str, value: &str| {
        if !profile.contact_info.contains_key(channel) {
            profile.contact_info.insert(channel.to_string(), value.to_string());
            first_source.get_or_insert(id);
        }
    };

    if let Some(url) = ok.get(&Linkedin).and_then(|r| r.meta_str("profile_url")) {
        add(profile, Linkedin, "linkedin", url);
    }
    if let Some(url) = ok.get(&Company).and_then(|r| r.meta_str("website")) {
        add(profile, Company, "website", url);
    }
    if let Some(social) = ok.get(&Social) {
        for (platform, url) in sources::social_profiles(social) {
            add(profile, Social, &platform, &url);
        }
    }
    for id in ROLE_ORDER {
        let Some(fields) = extracted.get(&id) else { continue };
        for (channel, value) in &fields.contact_info {
            add(profile, id, channel, value);
        }
    }

    if let Some(id) = first_source {
        profile
            .provenance
            .insert("contact_info".to_string(), FieldOrigin::Scraped(id));
    }
}

/// Attach per-post summaries and the overall analysis to the scraped posts.
pub fn linkedin_analysis(posts: &[RawPost], digest: PostDigest) -> LinkedInAnalysis {
    let mut summaries = digest.summaries.into_iter();
    let posts = posts
        .iter()
        .cloned()
        .map(|raw| {
            let mut post = Post::from(raw);
            if let Some(summary) = summaries.next() {
                post.summary = summary.summary;
                post.themes = summary.themes;
            }
            post
        })
        .collect();
    LinkedInAnalysis {
        posts,
        recurring_themes: digest.recurring_themes,
        overall_tone: digest.overall_tone,
        posting_frequency: digest.posting_frequency,
    }
}

/// Fill only absent fields from model knowledge and mark the profile as such.
/// `sources_used` is left untouched.
pub fn apply_knowledge(profile: &mut StructuredProfile, knowledge: KnowledgeProfile) {
    let fields = knowledge.fields;
    let mut filled = Vec::new();

    macro_rules! fill_scalar {
        ($name:ident) => {
            if profile.$name.is_none() && fields.$name.is_some() {
                profile.$name = fields.$name;
                filled.push(stringify!($name));
            }
        };
    }
    macro_rules! fill_list {
        ($name:ident) => {
            if profile.$name.is_empty() && !fields.$name.is_empty() {
                profile.$name = fields.$name;
                filled.push(stringify!($name));
            }
        };
    }

    fill_scalar!(headline);
    fill_scalar!(summary);
    fill_scalar!(current_role);
    fill_scalar!(company_description);
    fill_list!(experiences);
    fill_list!(skills);
    fill_list!(education);
    fill_list!(publications);

    for field in filled {
        profile
            .provenance
            .insert(field.to_string(), FieldOrigin::KnowledgeBase);
    }
    profile.knowledge_fallback = Some(KnowledgeFallback {
        confidence: knowledge.confidence,
        notable_achievements: knowledge.notable_achievements,
        warning: KNOWLEDGE_WARNING.to_string(),
    });
}

/// Ordered, case-insensitively deduplicated union that remembers which
/// source contributed first.
struct Union<T, K> {
    items: Vec<T>,
    seen: BTreeSet<String>,
    key: K,
    first: Option<SourceId>,
}

impl<T: Clone, K: Fn(&T) -> String> Union<T, K> {
    fn new(key: K) -> Self {
        Self {
            items: Vec::new(),
            seen: BTreeSet::new(),
            key,
            first: None,
        }
    }

    fn extend<'a, I>(&mut self, id: SourceId, items: I)
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        for item in items {
            if self.seen.insert((self.key)(item)) {
                self.items.push(item.clone());
                self.first.get_or_insert(id);
            }
        }
    }

    fn store(self, profile: &mut StructuredProfile, field: &str, set: impl FnOnce(&mut StructuredProfile, Vec<T>)) {
        if let Some(id) = self.first {
            profile
                .provenance
                .insert(field.to_string(), FieldOrigin::Scraped(id));
        }
        set(profile, self.items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_common::{Confidence, SourceStatus};
    use serde_json::json;

    fn ok(id: SourceId) -> RawSourceResult {
        RawSourceResult {
            source_id: id,
            status: SourceStatus::Ok,
            content: Some("content".into()),
            metadata: BTreeMap::new(),
            posts: Vec::new(),
        }
    }

    fn experience(title: &str, company: &str) -> Experience {
        Experience {
            title: title.into(),
            company: Some(company.into()),
            start_date: None,
            end_date: None,
            is_current: false,
            description: None,
            location: None,
        }
    }

    #[test]
    fn linkedin_wins_role_and_company_wins_narrative() {
        let raw = vec![ok(Linkedin), ok(Company)];
        let mut extracted = BTreeMap::new();
        extracted.insert(
            Linkedin,
            ProfileFields {
                headline: Some("Chairman and CEO at Microsoft".into()),
                current_role: Some("CEO".into()),
                summary: Some("LinkedIn summary".into()),
                ..Default::default()
            },
        );
        extracted.insert(
            Company,
            ProfileFields {
                headline: Some("Our leader".into()),
                current_role: Some("Chief Executive".into()),
                summary: Some("Company bio".into()),
                company_description: Some("Software company".into()),
                ..Default::default()
            },
        );

        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &raw, &extracted);

        assert_eq!(profile.headline.as_deref(), Some("Chairman and CEO at Microsoft"));
        assert_eq!(profile.current_role.as_deref(), Some("CEO"));
        assert_eq!(profile.summary.as_deref(), Some("Company bio"));
        assert_eq!(profile.provenance["headline"], FieldOrigin::Scraped(Linkedin));
        assert_eq!(profile.provenance["summary"], FieldOrigin::Scraped(Company));
        assert_eq!(profile.sources_used, BTreeSet::from([Linkedin, Company]));
    }

    #[test]
    fn lower_precedence_fills_gaps() {
        let raw = vec![ok(Linkedin), ok(News)];
        let mut extracted = BTreeMap::new();
        extracted.insert(Linkedin, ProfileFields::default());
        extracted.insert(
            News,
            ProfileFields {
                headline: Some("Microsoft chief".into()),
                ..Default::default()
            },
        );
        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &raw, &extracted);
        assert_eq!(profile.headline.as_deref(), Some("Microsoft chief"));
        assert_eq!(profile.provenance["headline"], FieldOrigin::Scraped(News));
    }

    #[test]
    fn experiences_union_dedups_case_insensitively() {
        let raw = vec![ok(Linkedin), ok(Company)];
        let mut extracted = BTreeMap::new();
        extracted.insert(
            Linkedin,
            ProfileFields {
                experiences: vec![experience("CEO", "Microsoft")],
                ..Default::default()
            },
        );
        extracted.insert(
            Company,
            ProfileFields {
                experiences: vec![experience("ceo", "MICROSOFT"), experience("EVP", "Microsoft")],
                ..Default::default()
            },
        );
        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &raw, &extracted);
        let titles: Vec<_> = profile.experiences.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["CEO", "EVP"]);
    }

    #[test]
    fn news_articles_lead_publications() {
        let mut news = ok(News);
        news.metadata.insert(
            "articles".into(),
            json!([{"title": "Nadella on AI", "url": "https://n.example/1", "snippet": null}]),
        );
        let raw = vec![news];
        let mut extracted = BTreeMap::new();
        extracted.insert(
            News,
            ProfileFields {
                publications: vec!["Hit Refresh".into()],
                ..Default::default()
            },
        );
        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &raw, &extracted);
        assert_eq!(
            profile.publications,
            vec!["Nadella on AI - https://n.example/1".to_string(), "Hit Refresh".to_string()]
        );
    }

    #[test]
    fn outlet_mentions_follow_news_articles() {
        let mut news = ok(News);
        news.metadata.insert(
            "articles".into(),
            json!([{"title": "Nadella on AI", "url": "https://n.example/1", "snippet": null}]),
        );
        news.metadata.insert(
            "media_mentions".into(),
            json!([{"outlet": "lesechos.fr", "url": "https://www.lesechos.fr/nadella", "snippet": "Satya Nadella"}]),
        );
        let mut extracted = BTreeMap::new();
        extracted.insert(
            News,
            ProfileFields {
                publications: vec!["Hit Refresh".into()],
                ..Default::default()
            },
        );
        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &[news], &extracted);
        assert_eq!(
            profile.publications,
            vec![
                "Nadella on AI - https://n.example/1".to_string(),
                "lesechos.fr - https://www.lesechos.fr/nadella".to_string(),
                "Hit Refresh".to_string(),
            ]
        );
    }

    #[test]
    fn leadership_page_fills_role_and_summary_gaps() {
        let mut company = ok(Company);
        company.metadata.insert(
            "leadership".into(),
            json!([{"url": "https://www.microsoft.com/leadership", "role": "Chairman and CEO", "bio": "Satya Nadella leads Microsoft."}]),
        );
        let mut extracted = BTreeMap::new();
        extracted.insert(
            Linkedin,
            ProfileFields {
                current_role: Some("CEO".into()),
                ..Default::default()
            },
        );
        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &[ok(Linkedin), company], &extracted);

        assert_eq!(profile.current_role.as_deref(), Some("CEO"));
        assert_eq!(profile.provenance["current_role"], FieldOrigin::Scraped(Linkedin));
        assert_eq!(profile.summary.as_deref(), Some("Satya Nadella leads Microsoft."));
        assert_eq!(profile.provenance["summary"], FieldOrigin::Scraped(Company));
    }

    #[test]
    fn discovered_channels_beat_structured_contacts() {
        let mut linkedin = ok(Linkedin);
        linkedin
            .metadata
            .insert("profile_url".into(), json!("https://www.linkedin.com/in/satya-nadella/"));
        let mut social = ok(Social);
        social
            .metadata
            .insert("profiles".into(), json!({"github": "https://github.com/satya"}));
        let raw = vec![linkedin, social];

        let mut extracted = BTreeMap::new();
        let mut contacts = BTreeMap::new();
        contacts.insert("github".to_string(), "https://github.com/someone-else".to_string());
        contacts.insert("email".to_string(), "satya@example.com".to_string());
        extracted.insert(
            Linkedin,
            ProfileFields {
                contact_info: contacts,
                ..Default::default()
            },
        );

        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &raw, &extracted);
        assert_eq!(profile.contact_info["linkedin"], "https://www.linkedin.com/in/satya-nadella/");
        assert_eq!(profile.contact_info["github"], "https://github.com/satya");
        assert_eq!(profile.contact_info["email"], "satya@example.com");
    }

    #[test]
    fn failed_sources_are_not_used() {
        let mut failed = ok(Company);
        failed.status = SourceStatus::Failed;
        failed.metadata.insert("website".into(), json!("https://www.microsoft.com/"));
        let mut profile = StructuredProfile::default();
        merge_sources(&mut profile, &[failed], &BTreeMap::new());
        assert!(profile.sources_used.is_empty());
        assert!(profile.contact_info.is_empty());
    }

    #[test]
    fn knowledge_fills_only_gaps() {
        let mut profile = StructuredProfile::default();
        profile.headline = Some("Scraped headline".into());
        let knowledge = KnowledgeProfile {
            fields: ProfileFields {
                headline: Some("Recalled headline".into()),
                summary: Some("Recalled summary".into()),
                ..Default::default()
            },
            notable_achievements: vec!["Led cloud pivot".into()],
            confidence: Confidence::Medium,
        };
        apply_knowledge(&mut profile, knowledge);
        assert_eq!(profile.headline.as_deref(), Some("Scraped headline"));
        assert_eq!(profile.summary.as_deref(), Some("Recalled summary"));
        assert_eq!(profile.provenance["summary"], FieldOrigin::KnowledgeBase);
        assert!(!profile.provenance.contains_key("headline"));
        assert!(profile.sources_used.is_empty());
        let marker = profile.knowledge_fallback.unwrap();
        assert_eq!(marker.confidence, Confidence::Medium);
    }

    #[test]
    fn post_summaries_align_by_index() {
        let posts = vec![
            RawPost {
                content: "first".into(),
                date: None,
                url: None,
            },
            RawPost {
                content: "second".into(),
                date: None,
                url: None,
            },
        ];
        let digest = PostDigest {
            summaries: vec![crate::extraction::PostSummary {
                summary: Some("About AI".into()),
                themes: vec!["ai".into()],
            }],
            recurring_themes: vec!["ai".into()],
            ..Default::default()
        };
        let analysis = linkedin_analysis(&posts, digest);
        assert_eq!(analysis.posts.len(), 2);
        assert_eq!(analysis.posts[0].summary.as_deref(), Some("About AI"));
        assert_eq!(analysis.posts[1].summary, None);
        assert_eq!(analysis.recurring_themes, vec!["ai".to_string()]);
    }
}
