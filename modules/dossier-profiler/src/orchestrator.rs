use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use ai_client::OpenAi;
use dossier_common::{
    Config, DebugInfo, DossierError, ModelSettings, ProfileRequest, ProfileResponse, RawPost,
    RawSourceResult, ScrapeSettings, SourceId, SourceStatus, Stage, StructuredProfile,
};
use firecrawl_client::FirecrawlClient;

use crate::error::ProfilerIssue;
use crate::extraction::{Extractor, ProfileFields};
use crate::merge;
use crate::scoring::{default_justification, ScoringTable};
use crate::sources::SourceAdapter;
use crate::traits::{LanguageModel, PageFetcher};

/// Working state of one profiling request.
pub struct ProfileRun {
    request: ProfileRequest,
    stage: Stage,
    stages: Vec<Stage>,
    raw: Vec<RawSourceResult>,
    profile: StructuredProfile,
    issues: Vec<ProfilerIssue>,
    started: Instant,
}

impl ProfileRun {
    pub fn new(request: ProfileRequest) -> Self {
        let profile = StructuredProfile::skeleton(&request);
        Self {
            request,
            stage: Stage::Init,
            stages: vec![Stage::Init],
            raw: Vec::new(),
            profile,
            issues: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn request(&self) -> &ProfileRequest {
        &self.request
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn profile(&self) -> &StructuredProfile {
        &self.profile
    }

    /// Fallback iff no source produced usable content.
    pub fn next_after_extracting(&self) -> Stage {
        if self.profile.sources_used.is_empty() {
            Stage::Fallback
        } else {
            Stage::Scoring
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "Profile run stage");
        self.stage = stage;
        self.stages.push(stage);
    }

    fn record(&mut self, issue: ProfilerIssue) {
        warn!(stage = ?self.stage, issue = %issue, "Profiling degraded");
        self.issues.push(issue);
    }

    fn finish(mut self) -> ProfileResponse {
        self.enter(Stage::Assembled);
        let elapsed = self.started.elapsed();
        let source_status: BTreeMap<SourceId, SourceStatus> =
            self.raw.iter().map(|r| (r.source_id, r.status)).collect();
        let debug = DebugInfo {
            sources_used: self.profile.sources_used.clone(),
            processing_time: format!("{:.2}s", elapsed.as_secs_f64()),
            processing_ms: elapsed.as_millis() as u64,
            source_status,
            knowledge_fallback: self.stages.contains(&Stage::Fallback),
            stages: self.stages,
            issues: self.issues.iter().map(ToString::to_string).collect(),
        };
        ProfileResponse {
            profile: self.profile,
            debug,
        }
    }
}

/// Drives a request through scraping, extraction, fallback, scoring and synthesis.
pub struct Orchestrator {
    adapters: Vec<SourceAdapter>,
    extractor: Extractor,
    scoring: ScoringTable,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        model: Arc<dyn LanguageModel>,
        scrape: &ScrapeSettings,
        model_settings: ModelSettings,
    ) -> Self {
        Self {
            adapters: SourceAdapter::all(fetcher, scrape),
            extractor: Extractor::new(model, model_settings),
            scoring: ScoringTable::default(),
        }
    }

    /// Production wiring: Firecrawl for pages, OpenAI for the model.
    pub fn from_config(config: &Config) -> Result<Self, DossierError> {
        // Looser than the per-attempt bound the adapters enforce.
        let http_timeout = config.scrape.timeout + config.scrape.timeout;
        let mut firecrawl = FirecrawlClient::new(&config.firecrawl_api_key, http_timeout)
            .map_err(|e| DossierError::Config(format!("scraping client: {e}")))?;
        if let Some(base_url) = &config.firecrawl_base_url {
            firecrawl = firecrawl.with_base_url(base_url);
        }

        let mut openai = OpenAi::new(&config.openai_api_key, &config.openai_model)
            .with_timeout(config.model.timeout)
            .with_max_tokens(config.model.max_tokens);
        if let Some(base_url) = &config.openai_base_url {
            openai = openai.with_base_url(base_url);
        }
        debug!(model = openai.model(), max_tokens = config.model.max_tokens, "Language model configured");

        Ok(Self::new(
            Arc::new(firecrawl),
            Arc::new(openai),
            &config.scrape,
            config.model.clone(),
        ))
    }

    pub fn with_scoring_table(mut self, table: ScoringTable) -> Self {
        self.scoring = table;
        self
    }

    /// Build a profile. Fails only for invalid input.
    pub async fn create_profile(&self, request: ProfileRequest) -> Result<ProfileResponse, DossierError> {
        let request = request.validate()?;
        let mut run = ProfileRun::new(request.clone());
        info!(
            person = %request.full_name(),
            company = request.company.as_deref().unwrap_or("-"),
            "Profiling started"
        );

        self.scrape(&mut run, &request).await;
        self.extract(&mut run, &request).await;

        if run.next_after_extracting() == Stage::Fallback {
            self.fallback(&mut run, &request).await;
        }

        run.enter(Stage::Scoring);
        let mut reliability = self.scoring.score(&run.profile.sources_used, &run.profile);

        run.enter(Stage::Synthesizing);
        let (reputation, justification) = tokio::join!(
            self.extractor.synthesize(&run.profile),
            self.extractor
                .justify_score(&reliability, &run.profile.sources_used),
        );
        match reputation {
            Ok(reputation) => run.profile.reputation = Some(reputation),
            Err(issue) => run.record(issue),
        }
        reliability.justification = match justification {
            Ok(text) => text,
            Err(issue) => {
                run.record(issue);
                default_justification(&reliability, &run.profile.sources_used)
            }
        };
        run.profile.reliability = reliability;

        let response = run.finish();
        info!(
            person = %request.full_name(),
            score = response.profile.reliability.score,
            sources = response.debug.sources_used.len(),
            fallback = response.debug.knowledge_fallback,
            issues = response.debug.issues.len(),
            elapsed = %response.debug.processing_time,
            "Profiling complete"
        );
        Ok(response)
    }

    async fn scrape(&self, run: &mut ProfileRun, request: &ProfileRequest) {
        run.enter(Stage::Scraping);
        let results = join_all(self.adapters.iter().map(|adapter| adapter.fetch(request))).await;

        for result in &results {
            match result.status {
                SourceStatus::Ok => {}
                SourceStatus::Empty => run.record(ProfilerIssue::SourceEmpty {
                    source_id: result.source_id,
                }),
                SourceStatus::Failed => run.record(ProfilerIssue::SourceUnavailable {
                    source_id: result.source_id,
                    reason: result
                        .meta_str("error")
                        .unwrap_or("unknown failure")
                        .to_string(),
                }),
            }
        }
        run.raw = results;
    }

    async fn extract(&self, run: &mut ProfileRun, request: &ProfileRequest) {
        run.enter(Stage::Extracting);

        let ok_sources: Vec<&RawSourceResult> = run.raw.iter().filter(|r| r.is_ok()).collect();
        let posts: Vec<RawPost> = ok_sources
            .iter()
            .find(|r| r.source_id == SourceId::Linkedin)
            .map(|r| r.posts.clone())
            .unwrap_or_default();

        let structure_all = join_all(ok_sources.iter().map(|raw| async move {
            let text = raw.content.as_deref().unwrap_or_default();
            (
                raw.source_id,
                self.extractor.structure(raw.source_id, request, text).await,
            )
        }));
        let (structured, digest) = tokio::join!(structure_all, self.extractor.summarize_posts(&posts));

        let mut extracted: BTreeMap<SourceId, ProfileFields> = BTreeMap::new();
        let mut issues = Vec::new();
        for (source_id, outcome) in structured {
            match outcome {
                Ok(fields) => {
                    extracted.insert(source_id, fields);
                }
                Err(issue) => issues.push(issue),
            }
        }
        let digest = digest.unwrap_or_else(|issue| {
            issues.push(issue);
            Default::default()
        });
        for issue in issues {
            run.record(issue);
        }

        merge::merge_sources(&mut run.profile, &run.raw, &extracted);
        run.profile.linkedin_analysis = merge::linkedin_analysis(&posts, digest);
    }

    async fn fallback(&self, run: &mut ProfileRun, request: &ProfileRequest) {
        run.enter(Stage::Fallback);
        info!(person = %request.full_name(), "No live source answered, recalling from model knowledge");
        match self.extractor.enrich_from_knowledge(request).await {
            Ok(knowledge) => merge::apply_knowledge(&mut run.profile, knowledge),
            Err(issue) => run.record(issue),
        }
    }
}
