//! Source Adapters.
//!
//! One generic [`SourceAdapter`] drives every source. What differs per source
//! lives in a [`SourceSpec`]: a target builder (an ordered list of candidate
//! pages), a mapper (how the rendered page becomes a [`RawSourceResult`]) and
//! an optional set of supplementary pages fetched once a candidate answers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

use dossier_common::{
    ProfileRequest, RawPost, RawSourceResult, ScrapeSettings, SourceId, SourceStatus,
};

use crate::traits::{FetchError, FetchedPage, PageFetcher, PageRequest};

const POST_MAX_CHARS: usize = 500;
const POST_MIN_CHARS: usize = 50;
const MAX_SPEAKING_MENTIONS: usize = 10;
const SOCIAL_SITES: [&str; 4] = ["twitter.com", "x.com", "github.com", "medium.com"];
const MAX_RELATED_PAGES: usize = 5;
const RELATED_PAGE_HINTS: [&str; 5] = ["about", "leadership", "team", "press", "media"];
const BIO_MAX_CHARS: usize = 1000;
const SNIPPET_MAX_CHARS: usize = 200;

/// Business outlets searched for mentions alongside the news search.
pub const PRO_MEDIA: [&str; 3] = ["lesechos.fr", "challenges.fr", "usinenouvelle.com"];

/// Hosts that are never a company's own website.
const NON_COMPANY_HOSTS: &[&str] = &[
    "google", "gstatic", "googleusercontent", "bing", "yahoo", "duckduckgo", "linkedin",
    "facebook", "twitter", "instagram", "youtube", "wikipedia", "reddit",
];

static RE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)\]>"']+"#).expect("valid regex"));
static RE_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?([a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,})").expect("valid regex")
});
static RE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"'#]+)["']"#).expect("valid regex"));
static RE_LINKEDIN_PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:[a-z]{2,3}\.)?linkedin\.com/in/([A-Za-z0-9_%-]+)").expect("valid regex")
});
static RE_POST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+\s*(?:h|d|w|mo|yr|hours?|days?|weeks?|months?|years?)\s+ago\b")
        .expect("valid regex")
});
static RE_SPEAKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:keynotes?|talks?|conferences?|speech(?:es)?|webinars?)\b")
        .expect("valid regex")
});
static RE_TWITTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?(?:twitter|x)\.com/([A-Za-z0-9_]{1,15})\b")
        .expect("valid regex")
});
static RE_GITHUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?github\.com/([A-Za-z0-9-]+)").expect("valid regex")
});
static RE_MEDIUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?medium\.com/(@?[A-Za-z0-9_.-]+)").expect("valid regex")
});

/// Path segments on social platforms that are never a person's handle.
const RESERVED_HANDLES: &[&str] = &[
    "search", "login", "signin", "signup", "i", "intent", "home", "share", "hashtag", "explore",
    "settings", "about", "topics", "features", "orgs", "marketplace", "sponsors", "tag", "m",
    "pricing", "enterprise",
];

// ---------------------------------------------------------------------------
// SourceSpec
// ---------------------------------------------------------------------------

/// Follow-up page chosen from a rendered search page.
pub type PickFn = fn(&ProfileRequest, &FetchedPage, &ScrapeSettings) -> Option<PageRequest>;

/// One place an adapter may find the source.
#[derive(Clone)]
pub enum Candidate {
    Page(PageRequest),
    /// Render `search`, then fetch whatever `pick` finds on it.
    Search { search: PageRequest, pick: PickFn },
}

impl Candidate {
    pub fn url(&self) -> &str {
        match self {
            Candidate::Page(page) => &page.url,
            Candidate::Search { search, .. } => &search.url,
        }
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Candidate::Page(page) => f.debug_tuple("Page").field(&page.url).finish(),
            Candidate::Search { search, .. } => f.debug_tuple("Search").field(&search.url).finish(),
        }
    }
}

/// Where an adapter should look for a given request.
#[derive(Debug, Clone)]
pub enum Target {
    /// Tried in order until one renders text.
    Fetch(Vec<Candidate>),
    /// Nothing to fetch; the adapter reports `empty` with this reason.
    Skip(String),
}

/// A mapper's output. Status is derived by the adapter from `content`.
#[derive(Debug, Default)]
pub struct Mapped {
    pub content: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub posts: Vec<RawPost>,
}

/// What a supplementary page contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    /// Appended to `metadata[key]`.
    pub metadata: Value,
    /// Appended to the source content.
    pub text: Option<String>,
}

pub type FindFn = fn(&ProfileRequest, &Supplement, &FetchedPage) -> Option<Found>;

/// An extra page fetched after a candidate answered with text.
#[derive(Clone)]
pub struct Supplement {
    pub key: &'static str,
    pub label: String,
    pub request: PageRequest,
    pub find: FindFn,
}

pub type TargetFn = fn(&ProfileRequest, &ScrapeSettings) -> Target;
pub type MapFn = fn(&PageRequest, &FetchedPage, &ScrapeSettings) -> Mapped;
pub type SupplementFn = fn(&ProfileRequest, &PageRequest, &FetchedPage, &ScrapeSettings) -> Vec<Supplement>;

#[derive(Clone, Copy)]
pub struct SourceSpec {
    pub id: SourceId,
    pub target: TargetFn,
    pub map: MapFn,
    pub supplements: SupplementFn,
}

impl SourceSpec {
    pub fn for_source(id: SourceId) -> Self {
        match id {
            SourceId::Linkedin => LINKEDIN,
            SourceId::Company => COMPANY,
            SourceId::News => NEWS,
            SourceId::Social => SOCIAL,
        }
    }
}

pub const LINKEDIN: SourceSpec = SourceSpec {
    id: SourceId::Linkedin,
    target: linkedin_target,
    map: map_linkedin,
    supplements: no_supplements,
};

pub const COMPANY: SourceSpec = SourceSpec {
    id: SourceId::Company,
    target: company_target,
    map: map_company,
    supplements: company_related_pages,
};

pub const NEWS: SourceSpec = SourceSpec {
    id: SourceId::News,
    target: news_target,
    map: map_news,
    supplements: pro_media_searches,
};

pub const SOCIAL: SourceSpec = SourceSpec {
    id: SourceId::Social,
    target: social_target,
    map: map_social,
    supplements: no_supplements,
};

// ---------------------------------------------------------------------------
// SourceAdapter
// ---------------------------------------------------------------------------

pub struct SourceAdapter {
    spec: SourceSpec,
    fetcher: Arc<dyn PageFetcher>,
    settings: ScrapeSettings,
}

/// Bookkeeping across the candidates of one fetch.
#[derive(Default)]
struct Trail {
    visited: Vec<String>,
    attempts: u32,
    /// Last URL that rendered but had no usable text.
    blank: Option<String>,
    last_error: Option<(String, FetchError)>,
}

impl Trail {
    /// False when `url` was already tried.
    fn visit(&mut self, url: &str) -> bool {
        if self.visited.iter().any(|seen| seen == url) {
            return false;
        }
        self.visited.push(url.to_string());
        true
    }

    /// Record a failure. Returns true when the remaining candidates should be abandoned.
    fn fail(&mut self, url: &str, err: FetchError) -> bool {
        let abandon = err.is_transient();
        self.last_error = Some((url.to_string(), err));
        abandon
    }
}

impl SourceAdapter {
    pub fn new(spec: SourceSpec, fetcher: Arc<dyn PageFetcher>, settings: ScrapeSettings) -> Self {
        Self {
            spec,
            fetcher,
            settings,
        }
    }

    /// One adapter per source, in canonical order.
    pub fn all(fetcher: Arc<dyn PageFetcher>, settings: &ScrapeSettings) -> Vec<Self> {
        SourceId::ALL
            .iter()
            .map(|id| Self::new(SourceSpec::for_source(*id), fetcher.clone(), settings.clone()))
            .collect()
    }

    pub fn id(&self) -> SourceId {
        self.spec.id
    }

    /// Fetch this source for `request`. Every failure is folded into the result.
    ///
    /// Candidates are tried in order. A candidate that renders blank or fails
    /// permanently passes to the next one. A candidate still failing
    /// transiently after its retries ends the fetch.
    pub async fn fetch(&self, request: &ProfileRequest) -> RawSourceResult {
        let candidates = match (self.spec.target)(request, &self.settings) {
            Target::Fetch(candidates) => candidates,
            Target::Skip(reason) => return self.skipped(reason),
        };

        let mut trail = Trail::default();
        for candidate in candidates {
            let page_request = match candidate {
                Candidate::Page(page_request) => page_request,
                Candidate::Search { search, pick } => {
                    if !trail.visit(&search.url) {
                        continue;
                    }
                    match self.attempt(&search, &mut trail.attempts).await {
                        Ok(page) => match pick(request, &page, &self.settings) {
                            Some(found) => found,
                            None => {
                                debug!(source = %self.spec.id, url = %search.url, "Search found nothing to follow");
                                continue;
                            }
                        },
                        Err(err) => {
                            if trail.fail(&search.url, err) {
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            if !trail.visit(&page_request.url) {
                continue;
            }
            match self.attempt(&page_request, &mut trail.attempts).await {
                Ok(page) => {
                    let mapped = self.map(&page_request, &page);
                    if mapped.content.is_some() {
                        return self.finish(request, &page_request, &page, mapped, trail).await;
                    }
                    trail.blank = Some(page_request.url.clone());
                }
                Err(err) => {
                    if trail.fail(&page_request.url, err) {
                        break;
                    }
                }
            }
        }

        self.exhausted(trail)
    }

    /// One page under the retry policy. Counts every attempt into `attempts`.
    async fn attempt(&self, page_request: &PageRequest, attempts: &mut u32) -> Result<FetchedPage, FetchError> {
        let id = self.spec.id;
        let max_attempts = self.settings.max_retries + 1;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            *attempts += 1;
            let outcome = match tokio::time::timeout(
                self.settings.timeout,
                self.fetcher.fetch(page_request),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(format!(
                    "no response within {:.1}s",
                    self.settings.timeout.as_secs_f64()
                ))),
            };

            match outcome {
                Ok(page) => {
                    info!(source = %id, attempt, outcome = "fetched", url = %page_request.url, "Source attempt finished");
                    return Ok(page);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        source = %id,
                        attempt,
                        outcome = "retry",
                        url = %page_request.url,
                        error = %err,
                        "Source attempt failed, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(err) => {
                    warn!(
                        source = %id,
                        attempt,
                        outcome = "failed",
                        url = %page_request.url,
                        error = %err,
                        "Source attempt failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Mapper output with blank content normalised to `None`.
    fn map(&self, page_request: &PageRequest, page: &FetchedPage) -> Mapped {
        if !page.has_text() {
            return Mapped::default();
        }
        let mut mapped = (self.spec.map)(page_request, page, &self.settings);
        mapped.content = mapped.content.filter(|c| !c.trim().is_empty());
        mapped
    }

    async fn finish(
        &self,
        request: &ProfileRequest,
        page_request: &PageRequest,
        page: &FetchedPage,
        mapped: Mapped,
        trail: Trail,
    ) -> RawSourceResult {
        let mut content = mapped.content.unwrap_or_default();
        let mut metadata = mapped.metadata;

        let supplements = (self.spec.supplements)(request, page_request, page, &self.settings);
        let found = join_all(supplements.iter().map(|s| self.supplement(request, s))).await;
        let mut extra: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
        for (key, found) in found.into_iter().flatten() {
            if let Some(text) = found.text.filter(|t| !t.trim().is_empty()) {
                content.push_str("\n\n");
                content.push_str(text.trim());
            }
            extra.entry(key).or_default().push(found.metadata);
        }
        for (key, values) in extra {
            metadata.insert(key.to_string(), json!(values));
        }

        metadata.insert("target".to_string(), json!(page_request.url));
        metadata.insert("attempts".to_string(), json!(trail.attempts));
        metadata.insert("candidates".to_string(), json!(trail.visited));
        if let Some(title) = &page.title {
            metadata.entry("title".to_string()).or_insert_with(|| json!(title));
        }

        info!(source = %self.spec.id, attempts = trail.attempts, outcome = "ok", url = %page_request.url, "Source finished");
        RawSourceResult {
            source_id: self.spec.id,
            status: SourceStatus::Ok,
            content: Some(content),
            metadata,
            posts: mapped.posts,
        }
    }

    async fn supplement(&self, request: &ProfileRequest, supplement: &Supplement) -> Option<(&'static str, Found)> {
        let mut attempts = 0;
        match self.attempt(&supplement.request, &mut attempts).await {
            Ok(page) if page.has_text() => {
                (supplement.find)(request, supplement, &page).map(|found| (supplement.key, found))
            }
            Ok(_) => None,
            Err(err) => {
                debug!(source = %self.spec.id, label = %supplement.label, error = %err, "Supplementary page unavailable");
                None
            }
        }
    }

    /// No candidate rendered text: `empty` if any page answered, `failed` otherwise.
    fn exhausted(&self, trail: Trail) -> RawSourceResult {
        let mut metadata = BTreeMap::new();
        metadata.insert("attempts".to_string(), json!(trail.attempts));
        metadata.insert("candidates".to_string(), json!(trail.visited));

        let status = match (trail.blank, trail.last_error) {
            (Some(url), _) => {
                metadata.insert("target".to_string(), json!(url));
                SourceStatus::Empty
            }
            (None, Some((url, err))) => {
                metadata.insert("target".to_string(), json!(url));
                metadata.insert("error".to_string(), json!(err.to_string()));
                if let Some(status) = err.status_code() {
                    metadata.insert("status_code".to_string(), json!(status));
                }
                SourceStatus::Failed
            }
            (None, None) => {
                metadata.insert("reason".to_string(), json!("no candidate page to fetch"));
                SourceStatus::Empty
            }
        };

        info!(source = %self.spec.id, attempts = trail.attempts, outcome = %status, "Source finished");
        RawSourceResult {
            source_id: self.spec.id,
            status,
            content: None,
            metadata,
            posts: Vec::new(),
        }
    }

    fn skipped(&self, reason: String) -> RawSourceResult {
        info!(source = %self.spec.id, attempt = 0, outcome = "empty", reason = %reason, "Source skipped");
        let mut metadata = BTreeMap::new();
        metadata.insert("reason".to_string(), json!(reason));
        metadata.insert("attempts".to_string(), json!(0));
        RawSourceResult {
            source_id: self.spec.id,
            status: SourceStatus::Empty,
            content: None,
            metadata,
            posts: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

fn page(url: impl Into<String>, settings: &ScrapeSettings) -> PageRequest {
    PageRequest::new(url)
        .wait_for(settings.wait_for_ms)
        .render_timeout(settings.timeout)
}

fn web_search(query: &str, extra: &[(&str, &str)], settings: &ScrapeSettings) -> PageRequest {
    let mut params = form_urlencoded::Serializer::new(String::new());
    params.append_pair("q", query);
    for (key, value) in extra {
        params.append_pair(key, value);
    }
    page(format!("https://www.google.com/search?{}", params.finish()), settings).full_page()
}

/// Profile handles to try, most common form first, without repeats.
pub fn linkedin_handles(request: &ProfileRequest) -> Vec<String> {
    let first = slugify(&request.first_name);
    let last = slugify(&request.last_name);
    if first.is_empty() || last.is_empty() {
        return Vec::new();
    }

    let mut handles = vec![
        format!("{first}-{last}"),
        format!("{first}.{last}"),
        format!("{}{}", first.replace('-', ""), last.replace('-', "")),
    ];
    if let Some(company) = request.company.as_deref().map(slugify).filter(|c| !c.is_empty()) {
        handles.push(format!("{first}-{last}-{company}"));
        handles.push(format!("{first}.{last}.{company}"));
    }

    let mut seen = BTreeSet::new();
    handles.retain(|h| seen.insert(h.clone()));
    handles
}

fn linkedin_target(request: &ProfileRequest, settings: &ScrapeSettings) -> Target {
    let handles = linkedin_handles(request);
    if handles.is_empty() {
        return Target::Skip(format!(
            "name {:?} has no usable characters for a profile URL",
            request.full_name()
        ));
    }

    let mut candidates: Vec<Candidate> = handles
        .iter()
        .map(|handle| Candidate::Page(page(format!("https://www.linkedin.com/in/{handle}/"), settings).full_page()))
        .collect();

    let mut query = format!("site:linkedin.com/in \"{}\"", request.full_name());
    if let Some(company) = &request.company {
        query.push(' ');
        query.push_str(company);
    }
    candidates.push(Candidate::Search {
        search: web_search(&query, &[], settings),
        pick: pick_linkedin_profile,
    });
    Target::Fetch(candidates)
}

fn company_target(request: &ProfileRequest, settings: &ScrapeSettings) -> Target {
    let Some(company) = request.company.as_deref() else {
        return Target::Skip("no company given".to_string());
    };
    let slug = slugify(company);
    if slug.is_empty() {
        return Target::Skip(format!("company name {company:?} has no usable characters"));
    }
    Target::Fetch(vec![
        Candidate::Search {
            search: web_search(&format!("{company} official site"), &[], settings),
            pick: pick_company_website,
        },
        Candidate::Page(page(format!("https://www.{slug}.com/"), settings)),
    ])
}

fn news_target(request: &ProfileRequest, settings: &ScrapeSettings) -> Target {
    let mut query = request.full_name();
    if let Some(company) = &request.company {
        query.push(' ');
        query.push_str(company);
    }
    Target::Fetch(vec![Candidate::Page(web_search(&query, &[("tbm", "nws")], settings))])
}

fn social_target(request: &ProfileRequest, settings: &ScrapeSettings) -> Target {
    let sites = SOCIAL_SITES
        .iter()
        .map(|site| format!("site:{site}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let query = format!("{} ({sites})", request.full_name());
    Target::Fetch(vec![Candidate::Page(web_search(&query, &[], settings))])
}

// ---------------------------------------------------------------------------
// Search picks
// ---------------------------------------------------------------------------

fn page_text(page: &FetchedPage) -> String {
    let mut text = page.markdown.clone();
    for link in &page.links {
        text.push('\n');
        text.push_str(link);
    }
    text
}

/// First profile URL on a search page, preferring handles that carry the last name.
fn pick_linkedin_profile(request: &ProfileRequest, page: &FetchedPage, settings: &ScrapeSettings) -> Option<PageRequest> {
    let text = page_text(page);
    let handles: Vec<String> = RE_LINKEDIN_PROFILE
        .captures_iter(&text)
        .map(|caps| caps[1].to_lowercase())
        .collect();
    let last = slugify(&request.last_name);
    let handle = handles
        .iter()
        .find(|h| !last.is_empty() && h.contains(&last))
        .or_else(|| handles.first())?;
    Some(self::page(format!("https://www.linkedin.com/in/{handle}/"), settings).full_page())
}

fn pick_company_website(request: &ProfileRequest, page: &FetchedPage, settings: &ScrapeSettings) -> Option<PageRequest> {
    let key = slugify(request.company.as_deref()?).replace('-', "");
    let host = rank_company_domains(&page_text(page), &key).into_iter().next()?;
    Some(self::page(format!("https://{host}/"), settings))
}

/// Hosts on a search page that could be the company's own site, best first.
///
/// +3 when the host contains the company key, +2 for an apex domain, +1 for a
/// generic TLD. Search engines, social networks and encyclopedias are dropped,
/// as is anything scoring zero.
pub fn rank_company_domains(text: &str, company_key: &str) -> Vec<String> {
    let mut scored: Vec<(u32, String)> = Vec::new();
    for caps in RE_HOST.captures_iter(text) {
        let host = caps[1].to_lowercase();
        if scored.iter().any(|(_, seen)| *seen == host) {
            continue;
        }
        let labels: Vec<&str> = host.split('.').collect();
        if host == "x.com" || labels.iter().any(|l| NON_COMPANY_HOSTS.contains(l)) {
            continue;
        }

        let mut score = 0;
        if !company_key.is_empty() && host.replace(['.', '-'], "").contains(company_key) {
            score += 3;
        }
        if labels.len() == 2 {
            score += 2;
        }
        if labels.last().is_some_and(|tld| ["com", "fr", "net", "org"].contains(tld)) {
            score += 1;
        }
        if score > 0 {
            scored.push((score, host));
        }
    }
    // Stable: ties keep search order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, host)| host).collect()
}

// ---------------------------------------------------------------------------
// Supplements
// ---------------------------------------------------------------------------

fn no_supplements(
    _request: &ProfileRequest,
    _page_request: &PageRequest,
    _page: &FetchedPage,
    _settings: &ScrapeSettings,
) -> Vec<Supplement> {
    Vec::new()
}

/// About, leadership, team and press pages linked from the company homepage.
fn company_related_pages(
    _request: &ProfileRequest,
    page_request: &PageRequest,
    page: &FetchedPage,
    settings: &ScrapeSettings,
) -> Vec<Supplement> {
    related_page_urls(&page_request.url, page)
        .into_iter()
        .map(|url| Supplement {
            key: "leadership",
            label: url.clone(),
            request: self::page(url, settings),
            find: find_person_on_page,
        })
        .collect()
}

/// Same-site links whose path hints at people or press, at most [`MAX_RELATED_PAGES`].
pub fn related_page_urls(base: &str, page: &FetchedPage) -> Vec<String> {
    let Ok(base) = Url::parse(base) else {
        return Vec::new();
    };
    let hrefs = page
        .html
        .as_deref()
        .map(|html| {
            RE_HREF
                .captures_iter(html)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut urls: Vec<String> = Vec::new();
    for href in page.links.iter().cloned().chain(hrefs) {
        let Ok(url) = base.join(href.trim()) else { continue };
        if url.host_str() != base.host_str() || !url.scheme().starts_with("http") {
            continue;
        }
        let path = url.path().to_lowercase();
        if !RELATED_PAGE_HINTS.iter().any(|hint| path.contains(hint)) {
            continue;
        }
        let url = url.to_string();
        if url != base.as_str() && !urls.contains(&url) {
            urls.push(url);
        }
        if urls.len() == MAX_RELATED_PAGES {
            break;
        }
    }
    urls
}

/// A person's entry on a company page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadershipEntry {
    pub url: String,
    pub role: Option<String>,
    pub bio: Option<String>,
}

fn find_person_on_page(request: &ProfileRequest, supplement: &Supplement, page: &FetchedPage) -> Option<Found> {
    let full = request.full_name();
    let full_lower = full.to_lowercase();
    if !page.markdown.to_lowercase().contains(&full_lower) {
        return None;
    }

    let bio = page
        .markdown
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.starts_with('#') && p.chars().count() > 50 && p.to_lowercase().contains(&full_lower))
        .map(|p| clip(p, BIO_MAX_CHARS));
    let role = person_role(&page.markdown, &full);
    if bio.is_none() && role.is_none() {
        return None;
    }

    let text = match (&role, &bio) {
        (Some(role), Some(bio)) => format!("{full}, {role}\n{bio}"),
        (Some(role), None) => format!("{full}, {role}"),
        (None, Some(bio)) => bio.clone(),
        (None, None) => String::new(),
    };
    let entry = LeadershipEntry {
        url: supplement.request.url.clone(),
        role,
        bio,
    };
    Some(Found {
        metadata: serde_json::to_value(&entry).ok()?,
        text: Some(text),
    })
}

/// The title printed with a name: after it on the same line, or on the next line.
pub fn person_role(markdown: &str, full_name: &str) -> Option<String> {
    let name = full_name.to_lowercase();
    let lines: Vec<&str> = markdown.lines().map(str::trim).collect();
    let is_role = |s: &str| (3..=80).contains(&s.chars().count()) && !s.ends_with('.');
    let clean = |s: &str| {
        s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '#' | '*' | '_' | ',' | '-' | '|' | ':'))
            .to_string()
    };

    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        let Some(at) = lower.find(&name) else { continue };
        // The lowercase offset is only valid when lowercasing kept byte lengths.
        if let Some(rest) = line.get(at + name.len()..).filter(|_| lower.len() == line.len()) {
            let rest = clean(rest);
            if is_role(&rest) {
                return Some(rest);
            }
        }
        if let Some(next) = lines[i + 1..].iter().find(|l| !l.is_empty()) {
            let next = clean(next);
            if is_role(&next) && !next.to_lowercase().contains(&name) {
                return Some(next);
            }
        }
    }
    None
}

/// Searches restricted to each business outlet.
fn pro_media_searches(
    request: &ProfileRequest,
    _page_request: &PageRequest,
    _page: &FetchedPage,
    settings: &ScrapeSettings,
) -> Vec<Supplement> {
    PRO_MEDIA
        .iter()
        .map(|outlet| Supplement {
            key: "media_mentions",
            label: outlet.to_string(),
            request: web_search(&format!("site:{outlet} {}", request.full_name()), &[], settings),
            find: find_media_mention,
        })
        .collect()
}

/// A hit on a business outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMention {
    pub outlet: String,
    pub url: String,
    pub snippet: Option<String>,
}

impl MediaMention {
    pub fn citation(&self) -> String {
        format!("{} - {}", self.outlet, self.url)
    }
}

/// A mention needs a result on the outlet's own host and the last name in the text.
fn find_media_mention(request: &ProfileRequest, supplement: &Supplement, page: &FetchedPage) -> Option<Found> {
    let outlet = supplement.label.as_str();
    let last = request.last_name.to_lowercase();
    let text = page_text(page);
    if !text.to_lowercase().contains(&last) {
        return None;
    }

    let url = RE_URL.find_iter(&text).map(|m| m.as_str()).find(|candidate| {
        Url::parse(candidate)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .is_some_and(|host| host == outlet || host.ends_with(&format!(".{outlet}")))
    })?;
    let snippet = page
        .markdown
        .lines()
        .map(str::trim)
        .find(|line| line.to_lowercase().contains(&last) && !line.contains("site:"))
        .map(|line| clip(line, SNIPPET_MAX_CHARS));

    let mention = MediaMention {
        outlet: outlet.to_string(),
        url: url.to_string(),
        snippet,
    };
    let text = match &mention.snippet {
        Some(snippet) => format!("{outlet}: {snippet}"),
        None => format!("{outlet}: {}", mention.url),
    };
    Some(Found {
        metadata: serde_json::to_value(&mention).ok()?,
        text: Some(text),
    })
}

// ---------------------------------------------------------------------------
// Mappers
// ---------------------------------------------------------------------------

fn map_linkedin(page_request: &PageRequest, page: &FetchedPage, settings: &ScrapeSettings) -> Mapped {
    let mut metadata = BTreeMap::new();
    metadata.insert("profile_url".to_string(), json!(page_request.url));
    let posts = split_posts(&page.markdown, settings.max_posts);
    metadata.insert("post_count".to_string(), json!(posts.len()));
    Mapped {
        content: Some(page.markdown.trim().to_string()),
        metadata,
        posts,
    }
}

fn map_company(page_request: &PageRequest, page: &FetchedPage, _settings: &ScrapeSettings) -> Mapped {
    let mut metadata = BTreeMap::new();
    metadata.insert("website".to_string(), json!(page_request.url));
    let mentions = find_speaking_mentions(&page.markdown);
    if !mentions.is_empty() {
        metadata.insert("speaking".to_string(), json!(mentions));
    }
    Mapped {
        content: Some(page.markdown.trim().to_string()),
        metadata,
        posts: Vec::new(),
    }
}

fn map_news(_page_request: &PageRequest, page: &FetchedPage, settings: &ScrapeSettings) -> Mapped {
    let articles = parse_articles(&page.markdown, settings.max_articles);
    let mut metadata = BTreeMap::new();
    metadata.insert("article_count".to_string(), json!(articles.len()));
    metadata.insert("articles".to_string(), json!(articles));
    Mapped {
        content: Some(page.markdown.trim().to_string()),
        metadata,
        posts: Vec::new(),
    }
}

fn map_social(_page_request: &PageRequest, page: &FetchedPage, _settings: &ScrapeSettings) -> Mapped {
    let profiles = find_social_profiles(&page_text(page));
    if profiles.is_empty() {
        return Mapped::default();
    }

    let content = profiles
        .iter()
        .map(|(platform, url)| format!("{platform}: {url}"))
        .collect::<Vec<_>>()
        .join("\n");
    let mut metadata = BTreeMap::new();
    metadata.insert("profiles".to_string(), json!(profiles));
    Mapped {
        content: Some(content),
        metadata,
        posts: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// A search hit on the news source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

impl NewsArticle {
    /// `"title - url"`, or the bare title when no link was found.
    pub fn citation(&self) -> String {
        match &self.url {
            Some(url) => format!("{} - {url}", self.title),
            None => self.title.clone(),
        }
    }
}

/// Lowercase ASCII slug: accents folded, runs of anything else collapsed to `-`.
pub fn slugify(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        push_folded(c, &mut folded);
    }

    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn push_folded(c: char, out: &mut String) {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'ł' | 'ľ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'æ' => "ae",
        'œ' => "oe",
        _ => {
            out.push(c);
            return;
        }
    };
    out.push_str(folded);
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Posts from the activity section of a profile page: blank-line separated
/// blocks after the first heading mentioning activity or posts.
pub fn split_posts(markdown: &str, max_posts: usize) -> Vec<RawPost> {
    let mut offset = None;
    let mut cursor = 0;
    for line in markdown.split_inclusive('\n') {
        cursor += line.len();
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            let heading = trimmed.trim_start_matches('#').trim().to_lowercase();
            if heading.contains("activity") || heading.contains("posts") {
                offset = Some(cursor);
                break;
            }
        }
    }
    let Some(offset) = offset else {
        return Vec::new();
    };

    markdown[offset..]
        .split("\n\n")
        .map(str::trim)
        .filter(|block| block.chars().count() > POST_MIN_CHARS && !block.starts_with('#'))
        .take(max_posts)
        .map(|block| RawPost {
            content: clip(block, POST_MAX_CHARS),
            date: RE_POST_DATE.find(block).map(|m| m.as_str().to_string()),
            url: RE_URL
                .find_iter(block)
                .map(|m| m.as_str())
                .find(|u| u.contains("linkedin.com/posts") || u.contains("linkedin.com/feed"))
                .map(str::to_string),
        })
        .collect()
}

/// Lines that read like a talk, keynote or webinar appearance.
pub fn find_speaking_mentions(markdown: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    markdown
        .lines()
        .map(|line| line.trim().trim_start_matches(['#', '-', '*', '>', ' ']).trim())
        .filter(|line| (15..=300).contains(&line.chars().count()))
        .filter(|line| RE_SPEAKING.is_match(line))
        .filter(|line| seen.insert(line.to_lowercase()))
        .take(MAX_SPEAKING_MENTIONS)
        .map(str::to_string)
        .collect()
}

/// Articles from a news search page: a `#` heading opens an article, the
/// first URL after it is its link, the first long line its snippet.
pub fn parse_articles(markdown: &str, max_articles: usize) -> Vec<NewsArticle> {
    let mut articles: Vec<NewsArticle> = Vec::new();
    for line in markdown.lines().map(str::trim) {
        if line.starts_with('#') && line.chars().count() > 10 {
            if articles.len() == max_articles {
                break;
            }
            articles.push(NewsArticle {
                title: line.trim_start_matches('#').trim().to_string(),
                url: None,
                snippet: None,
            });
            continue;
        }
        let Some(current) = articles.last_mut() else {
            continue;
        };
        if current.url.is_none() {
            if let Some(found) = RE_URL.find(line) {
                current.url = Some(found.as_str().to_string());
                continue;
            }
        }
        if current.snippet.is_none() && line.chars().count() > 50 && !line.contains("http") {
            current.snippet = Some(line.to_string());
        }
    }
    articles
}

/// First profile URL per platform, keyed `twitter`, `github`, `medium`.
pub fn find_social_profiles(text: &str) -> BTreeMap<String, String> {
    let platforms: [(&str, &Regex); 3] = [
        ("twitter", &RE_TWITTER),
        ("github", &RE_GITHUB),
        ("medium", &RE_MEDIUM),
    ];

    let mut found = BTreeMap::new();
    for (platform, re) in platforms {
        let hit = re.captures_iter(text).find(|caps| {
            let handle = caps[1].trim_start_matches('@').to_lowercase();
            !handle.is_empty() && !RESERVED_HANDLES.contains(&handle.as_str())
        });
        if let Some(caps) = hit {
            found.insert(platform.to_string(), caps[0].to_string());
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Metadata accessors
// ---------------------------------------------------------------------------

pub fn news_articles(result: &RawSourceResult) -> Vec<NewsArticle> {
    result
        .metadata
        .get("articles")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn social_profiles(result: &RawSourceResult) -> BTreeMap<String, String> {
    result
        .metadata
        .get("profiles")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn media_mentions(result: &RawSourceResult) -> Vec<MediaMention> {
    result
        .metadata
        .get("media_mentions")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn leadership_entries(result: &RawSourceResult) -> Vec<LeadershipEntry> {
    result
        .metadata
        .get("leadership")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn speaking_mentions(result: &RawSourceResult) -> Vec<String> {
    result
        .metadata
        .get("speaking")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ScrapeSettings {
        ScrapeSettings::default()
    }

    fn urls_of(target: Target) -> Vec<String> {
        match target {
            Target::Fetch(candidates) => candidates.iter().map(|c| c.url().to_string()).collect(),
            Target::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    fn url_of(target: Target) -> String {
        urls_of(target).remove(0)
    }

    #[test]
    fn slugify_folds_accents_and_punctuation() {
        assert_eq!(slugify("Jean-François"), "jean-francois");
        assert_eq!(slugify("  Zoë   O'Brien "), "zoe-o-brien");
        assert_eq!(slugify("Müller & Söhne GmbH"), "muller-sohne-gmbh");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn linkedin_target_uses_slugged_names() {
        let req = ProfileRequest::new("Satya", "Nadella", None);
        assert_eq!(
            url_of(linkedin_target(&req, &settings())),
            "https://www.linkedin.com/in/satya-nadella/"
        );
    }

    #[test]
    fn linkedin_candidates_cover_common_handle_forms() {
        let req = ProfileRequest::new("Satya", "Nadella", Some("Microsoft"));
        let urls = urls_of(linkedin_target(&req, &settings()));
        assert_eq!(
            &urls[..5],
            &[
                "https://www.linkedin.com/in/satya-nadella/",
                "https://www.linkedin.com/in/satya.nadella/",
                "https://www.linkedin.com/in/satyanadella/",
                "https://www.linkedin.com/in/satya-nadella-microsoft/",
                "https://www.linkedin.com/in/satya.nadella.microsoft/",
            ]
        );
        assert_eq!(urls.len(), 6);
        assert!(urls[5].starts_with("https://www.google.com/search?q=site%3Alinkedin.com%2Fin"));
    }

    #[test]
    fn linkedin_handles_ignore_unusable_company() {
        let req = ProfileRequest::new("Ada", "Lovelace", Some("???"));
        assert_eq!(
            linkedin_handles(&req),
            vec!["ada-lovelace", "ada.lovelace", "adalovelace"]
        );
    }

    #[test]
    fn linkedin_target_skips_names_without_latin_letters() {
        let req = ProfileRequest::new("Сергей", "Брин", None);
        assert!(matches!(linkedin_target(&req, &settings()), Target::Skip(_)));

        let req = ProfileRequest::new("Satya", "李", None);
        assert!(matches!(linkedin_target(&req, &settings()), Target::Skip(_)));
    }

    #[test]
    fn company_target_skips_without_company() {
        let req = ProfileRequest::new("Satya", "Nadella", None);
        assert!(matches!(company_target(&req, &settings()), Target::Skip(_)));
    }

    #[test]
    fn company_target_searches_then_guesses() {
        let req = ProfileRequest::new("Satya", "Nadella", Some("Microsoft"));
        let urls = urls_of(company_target(&req, &settings()));
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("q=Microsoft+official+site"), "{}", urls[0]);
        assert_eq!(urls[1], "https://www.microsoft.com/");
    }

    #[test]
    fn pages_carry_the_render_budget() {
        let req = ProfileRequest::new("Satya", "Nadella", None);
        let Target::Fetch(candidates) = news_target(&req, &settings()) else {
            panic!("news always fetches");
        };
        let Candidate::Page(page) = &candidates[0] else {
            panic!("news is a plain page");
        };
        assert_eq!(page.timeout_ms, Some(30_000));
        assert_eq!(page.wait_for_ms, 2000);
    }

    #[test]
    fn company_domains_rank_own_site_first() {
        let text = "https://en.wikipedia.org/wiki/Microsoft\n\
            https://www.linkedin.com/company/microsoft\n\
            https://blogs.example.net/microsoft-review\n\
            https://news.microsoft.com/source\n\
            https://www.microsoft.com/en-us\n\
            https://x.com/microsoft";
        assert_eq!(
            rank_company_domains(text, "microsoft"),
            vec!["microsoft.com", "news.microsoft.com", "blogs.example.net"]
        );
    }

    #[test]
    fn company_website_pick_follows_best_host() {
        let req = ProfileRequest::new("Satya", "Nadella", Some("Microsoft"));
        let page = FetchedPage {
            markdown: "Microsoft - Official Home Page".into(),
            links: vec!["https://www.google.com/preferences".into(), "https://www.microsoft.com/en-us".into()],
            ..Default::default()
        };
        let picked = pick_company_website(&req, &page, &settings()).unwrap();
        assert_eq!(picked.url, "https://microsoft.com/");

        assert!(pick_company_website(&req, &FetchedPage::markdown("no results"), &settings()).is_none());
    }

    #[test]
    fn linkedin_pick_prefers_the_matching_surname() {
        let req = ProfileRequest::new("Satya", "Nadella", None);
        let page = FetchedPage::markdown(
            "https://www.linkedin.com/in/someone-else\n\
             https://fr.linkedin.com/in/Satya-Nadella-12345?trk=x",
        );
        let picked = pick_linkedin_profile(&req, &page, &settings()).unwrap();
        assert_eq!(picked.url, "https://www.linkedin.com/in/satya-nadella-12345/");
        assert!(!picked.only_main_content);
    }

    #[test]
    fn related_pages_stay_on_site_and_match_hints() {
        let page = FetchedPage {
            html: Some(
                r#"<a href="/about-us">About</a> <a href="/products">Products</a>
                <a href="https://other.example.org/about">Elsewhere</a>
                <a href="/company/leadership#ceo">Leaders</a> <a href="/about-us">Again</a>"#
                    .into(),
            ),
            links: vec!["https://www.microsoft.com/en-us/press".into()],
            ..Default::default()
        };
        assert_eq!(
            related_page_urls("https://www.microsoft.com/", &page),
            vec![
                "https://www.microsoft.com/en-us/press",
                "https://www.microsoft.com/about-us",
                "https://www.microsoft.com/company/leadership",
            ]
        );
    }

    #[test]
    fn person_role_reads_same_or_next_line() {
        assert_eq!(
            person_role("## Satya Nadella, Chairman and CEO\n", "Satya Nadella").as_deref(),
            Some("Chairman and CEO")
        );
        assert_eq!(
            person_role("### Satya Nadella\n\n**Chief Executive Officer**\n", "Satya Nadella").as_deref(),
            Some("Chief Executive Officer")
        );
        assert_eq!(person_role("Nobody relevant here", "Satya Nadella"), None);
    }

    #[test]
    fn leadership_page_yields_role_and_bio() {
        let req = ProfileRequest::new("Satya", "Nadella", Some("Microsoft"));
        let supplement = Supplement {
            key: "leadership",
            label: "leadership".into(),
            request: PageRequest::new("https://www.microsoft.com/leadership"),
            find: find_person_on_page,
        };
        let page = FetchedPage::markdown(
            "# Senior leadership\n\n## Satya Nadella\nChairman and Chief Executive Officer\n\n\
             Satya Nadella is Chairman and Chief Executive Officer of Microsoft. He joined in 1992.",
        );
        let found = find_person_on_page(&req, &supplement, &page).unwrap();
        assert_eq!(found.metadata["role"], "Chairman and Chief Executive Officer");
        assert!(found.metadata["bio"].as_str().unwrap().starts_with("Satya Nadella is Chairman"));
        assert!(found.text.unwrap().contains("joined in 1992"));

        let elsewhere = FetchedPage::markdown("# Our board\n\nJohn Thompson, Chair");
        assert!(find_person_on_page(&req, &supplement, &elsewhere).is_none());
    }

    #[test]
    fn media_mention_needs_an_outlet_result() {
        let req = ProfileRequest::new("Satya", "Nadella", None);
        let supplement = Supplement {
            key: "media_mentions",
            label: "lesechos.fr".into(),
            request: PageRequest::new("https://www.google.com/search?q=site%3Alesechos.fr+Satya+Nadella"),
            find: find_media_mention,
        };

        let hit = FetchedPage {
            markdown: "Results for site:lesechos.fr Satya Nadella\n\
                Satya Nadella veut faire de Microsoft le leader de l'IA"
                .into(),
            links: vec!["https://www.lesechos.fr/tech-medias/nadella-ia-2024".into()],
            ..Default::default()
        };
        let found = find_media_mention(&req, &supplement, &hit).unwrap();
        assert_eq!(found.metadata["url"], "https://www.lesechos.fr/tech-medias/nadella-ia-2024");
        assert_eq!(
            found.metadata["snippet"],
            "Satya Nadella veut faire de Microsoft le leader de l'IA"
        );

        let echo_only = FetchedPage::markdown("Aucun résultat pour site:lesechos.fr Satya Nadella");
        assert!(find_media_mention(&req, &supplement, &echo_only).is_none());
    }

    #[test]
    fn news_target_is_a_news_search() {
        let req = ProfileRequest::new("Satya", "Nadella", Some("Microsoft"));
        let url = url_of(news_target(&req, &settings()));
        assert!(url.starts_with("https://www.google.com/search?q=Satya+Nadella+Microsoft"));
        assert!(url.ends_with("&tbm=nws"));
    }

    #[test]
    fn social_target_restricts_sites() {
        let req = ProfileRequest::new("Ada", "Lovelace", None);
        let url = url_of(social_target(&req, &settings()));
        for site in SOCIAL_SITES {
            assert!(url.contains(&format!("site%3A{site}")), "{url} missing {site}");
        }
    }

    #[test]
    fn posts_come_from_activity_section() {
        let markdown = "# Satya Nadella\nChairman and CEO at Microsoft and a long enough line.\n\n\
            ## Activity\n\n\
            Thrilled to share what our teams shipped this week at Build, a huge milestone for AI. 2 days ago\n\n\
            short\n\n\
            Reflecting on culture: a learn-it-all mindset beats a know-it-all mindset every single time.";
        let posts = split_posts(markdown, 10);
        assert_eq!(posts.len(), 2);
        assert!(posts[0].content.starts_with("Thrilled"));
        assert_eq!(posts[0].date.as_deref(), Some("2 days ago"));
        assert!(posts[1].date.is_none());
    }

    #[test]
    fn posts_are_capped_and_clipped() {
        let long = "x".repeat(900);
        let mut markdown = String::from("## Posts\n\n");
        for _ in 0..15 {
            markdown.push_str(&long);
            markdown.push_str("\n\n");
        }
        let posts = split_posts(&markdown, 10);
        assert_eq!(posts.len(), 10);
        assert!(posts.iter().all(|p| p.content.chars().count() == POST_MAX_CHARS));
    }

    #[test]
    fn no_activity_heading_means_no_posts() {
        assert!(split_posts("# About\n\nA paragraph that is certainly longer than fifty characters.", 10).is_empty());
    }

    #[test]
    fn speaking_mentions_match_whole_words() {
        let markdown = "- Keynote at Microsoft Ignite 2023 on AI platforms\n\
            Our talented team builds things\n\
            - Webinar: the future of cloud computing\n\
            - Keynote at Microsoft Ignite 2023 on AI platforms";
        let mentions = find_speaking_mentions(markdown);
        assert_eq!(
            mentions,
            vec![
                "Keynote at Microsoft Ignite 2023 on AI platforms".to_string(),
                "Webinar: the future of cloud computing".to_string(),
            ]
        );
    }

    #[test]
    fn articles_take_title_link_and_snippet() {
        let markdown = "# Microsoft CEO outlines AI strategy\n\
            https://news.example.com/ms-ai?ref=1\n\
            Satya Nadella told investors the company will keep investing heavily in AI.\n\
            # Nadella named CEO of the year\n\
            A second article body that is comfortably longer than fifty characters.";
        let articles = parse_articles(markdown, 5);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url.as_deref(), Some("https://news.example.com/ms-ai?ref=1"));
        assert!(articles[0].snippet.as_deref().unwrap().starts_with("Satya"));
        assert_eq!(articles[1].url, None);
        assert_eq!(
            articles[0].citation(),
            "Microsoft CEO outlines AI strategy - https://news.example.com/ms-ai?ref=1"
        );
        assert_eq!(articles[1].citation(), "Nadella named CEO of the year");
    }

    #[test]
    fn articles_are_capped() {
        let markdown = (0..8)
            .map(|i| format!("# Headline number {i} here\n"))
            .collect::<String>();
        assert_eq!(parse_articles(&markdown, 5).len(), 5);
    }

    #[test]
    fn social_profiles_skip_reserved_paths() {
        let text = "https://twitter.com/search?q=x https://x.com/satyanadella \
            https://github.com/login https://github.com/satya \
            https://medium.com/@satya";
        let profiles = find_social_profiles(text);
        assert_eq!(profiles["twitter"], "https://x.com/satyanadella");
        assert_eq!(profiles["github"], "https://github.com/satya");
        assert_eq!(profiles["medium"], "https://medium.com/@satya");
    }

    #[test]
    fn social_without_profiles_maps_to_nothing() {
        let page = FetchedPage::markdown("No relevant results found for this query.");
        let mapped = map_social(&PageRequest::new("https://www.google.com/search"), &page, &settings());
        assert!(mapped.content.is_none());
    }
}
