use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::{Config, SiteConfig};
use crate::db::Repository;
use crate::error::Result;
use crate::models::NewArticle;

use super::classifier::RuleSet;
use super::extractor::extract_candidates;
use super::fetcher::PageFetcher;

/// Scrape-log rows kept after each pass.
const LOG_RING_SIZE: u32 = 50;

/// Guard flag and timestamps owned by the orchestrator instance, not
/// process-wide state. Multiple orchestrators stay independent.
struct ScrapeState {
    /// Single-flight guard: a contended pass is skipped, never queued.
    guard: Mutex<()>,
    last_completed: StdMutex<Option<Instant>>,
    last_visit: StdMutex<Option<Instant>>,
}

impl ScrapeState {
    fn new() -> Self {
        Self {
            guard: Mutex::new(()),
            last_completed: StdMutex::new(None),
            last_visit: StdMutex::new(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRunning,
    Cooldown,
    Idle,
}

#[derive(Debug, Clone)]
pub struct PassSummary {
    /// Per-site genuinely-new row counts, in site order.
    pub new_by_site: Vec<(String, usize)>,
    pub total_new: usize,
    pub pruned: usize,
}

#[derive(Debug, Clone)]
pub enum PassOutcome {
    Completed(PassSummary),
    Skipped(SkipReason),
}

pub struct Orchestrator {
    config: Config,
    repository: Arc<Repository>,
    fetcher: PageFetcher,
    state: ScrapeState,
}

impl Orchestrator {
    pub fn new(config: Config, repository: Arc<Repository>) -> Self {
        Self {
            config,
            repository,
            fetcher: PageFetcher::new(),
            state: ScrapeState::new(),
        }
    }

    /// Record read-side activity. Non-forced passes are skipped when the
    /// feed has had no visitors for a while.
    pub fn touch_visitor(&self) {
        *self.state.last_visit.lock().unwrap() = Some(Instant::now());
    }

    /// Run one scrape pass across all configured sites.
    ///
    /// Forced passes (timer tick, admin trigger) bypass the cooldown and
    /// idle checks but still honor the single-flight guard.
    pub async fn run_pass(&self, forced: bool) -> Result<PassOutcome> {
        let Ok(_guard) = self.state.guard.try_lock() else {
            tracing::debug!("scrape pass already running, skipping");
            return Ok(PassOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        if !forced {
            if let Some(last) = *self.state.last_completed.lock().unwrap() {
                let cooldown = Duration::from_secs(self.config.cooldown_secs);
                if last.elapsed() < cooldown {
                    tracing::debug!("within cooldown window, skipping");
                    return Ok(PassOutcome::Skipped(SkipReason::Cooldown));
                }
            }
            let idle_window = Duration::from_secs(self.config.idle_skip_secs);
            let active = self
                .state
                .last_visit
                .lock()
                .unwrap()
                .map(|t| t.elapsed() < idle_window)
                .unwrap_or(false);
            if !active {
                tracing::debug!("no recent visitors, skipping");
                return Ok(PassOutcome::Skipped(SkipReason::Idle));
            }
        }

        let rules = RuleSet::new(&self.repository.list_rules().await?);

        // Titles accepted so far this pass; identical cross-posted deals
        // on a second site are suppressed by exact title equality.
        let mut seen_titles: HashSet<String> = HashSet::new();
        let mut new_by_site = Vec::with_capacity(self.config.sites.len());

        for site in &self.config.sites {
            let inserted = match self.scrape_site(site, &rules, &mut seen_titles).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("site {} failed: {}", site.name, e);
                    0
                }
            };
            new_by_site.push((site.name.clone(), inserted));
        }

        let total_new: usize = new_by_site.iter().map(|(_, n)| n).sum();

        let detail: serde_json::Map<String, serde_json::Value> = new_by_site
            .iter()
            .map(|(name, n)| (name.clone(), serde_json::Value::from(*n)))
            .collect();
        let per_site = new_by_site
            .iter()
            .map(|(name, n)| format!("{}: {}", name, n))
            .collect::<Vec<_>>()
            .join(", ");
        let summary_line = format!("scraped {} new articles ({})", total_new, per_site);

        self.repository
            .append_scrape_log(summary_line.clone(), serde_json::to_string(&detail)?)
            .await?;

        let pruned = self
            .repository
            .prune_articles(self.config.retention_days)
            .await?;
        self.repository.trim_scrape_log(LOG_RING_SIZE).await?;

        *self.state.last_completed.lock().unwrap() = Some(Instant::now());
        tracing::info!("{} ({} pruned)", summary_line, pruned);

        Ok(PassOutcome::Completed(PassSummary {
            new_by_site,
            total_new,
            pruned,
        }))
    }

    async fn scrape_site(
        &self,
        site: &SiteConfig,
        rules: &RuleSet,
        seen_titles: &mut HashSet<String>,
    ) -> Result<usize> {
        let html = self.fetcher.get(&site.list_url, Some(&site.domain)).await?;
        let candidates = extract_candidates(&html, site);
        tracing::debug!("{}: {} candidates", site.name, candidates.len());

        let mut accepted = Vec::new();
        for candidate in candidates {
            let Some(tag) = rules.classify(&candidate.title, &candidate.url) else {
                continue;
            };
            if !seen_titles.insert(candidate.title.clone()) {
                continue;
            }
            accepted.push(NewArticle {
                title: candidate.title,
                url: candidate.url,
                site_source: site.name.clone(),
                tag,
                original_time: candidate.original_time,
            });
        }

        self.repository.insert_candidates(accepted).await
    }

    /// Fixed-cadence scrape loop. The first tick fires immediately, so a
    /// fresh store gets populated at startup.
    pub async fn run_timer(&self) -> Result<()> {
        let period = Duration::from_secs(u64::from(self.config.scrape_interval_minutes) * 60);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.run_pass(true).await {
                Ok(PassOutcome::Completed(_)) => {}
                Ok(PassOutcome::Skipped(reason)) => {
                    tracing::debug!("timer pass skipped: {:?}", reason);
                }
                Err(e) => {
                    tracing::error!("scrape pass failed: {}", e);
                }
            }
        }
    }
}
