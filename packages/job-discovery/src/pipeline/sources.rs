//! Discovery across several sites.
//!
//! Each site gets its own pipeline and session. Sites run one after the
//! other against the same input; a site that aborts is reported and the
//! remaining sites still run.

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn, Instrument};

use crate::pipeline::orchestrator::Pipeline;
use crate::traits::session::PageSession;
use crate::types::config::PipelineInput;
use crate::types::result::PipelineResult;

/// Outcome of one site.
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: String,
    pub outcome: Result<PipelineResult, String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SiteReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Reports for every site, in registration order.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub sites: Vec<SiteReport>,
}

impl DiscoveryReport {
    /// Concatenate the results of every site that completed.
    pub fn merged(&self) -> PipelineResult {
        let mut merged = PipelineResult::empty();
        for report in &self.sites {
            if let Ok(result) = &report.outcome {
                merged.extend(result.clone());
            }
        }
        merged
    }

    /// Sites whose run aborted, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sites.iter().filter_map(|report| match &report.outcome {
            Ok(_) => None,
            Err(reason) => Some((report.site.as_str(), reason.as_str())),
        })
    }
}

/// Runs one pipeline per site.
#[derive(Default)]
pub struct MultiSiteDiscovery {
    sites: Vec<(String, Pipeline<Box<dyn PageSession>>)>,
}

impl MultiSiteDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a site.
    pub fn with_site<S: PageSession + 'static>(mut self, name: impl Into<String>, pipeline: Pipeline<S>) -> Self {
        self.sites.push((name.into(), pipeline.boxed()));
        self
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Run every site in order.
    pub async fn run(&self, input: &PipelineInput) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for (site, pipeline) in &self.sites {
            let started_at = Utc::now();
            let outcome = pipeline
                .try_run(input)
                .instrument(info_span!("site", site = %site))
                .await;

            match &outcome {
                Ok(result) => info!(
                    site = %site,
                    validated = result.validated.len(),
                    rejected = result.rejected.len(),
                    "Site finished"
                ),
                Err(e) => warn!(site = %site, error = %e, "Site aborted"),
            }

            report.sites.push(SiteReport {
                site: site.clone(),
                outcome: outcome.map_err(|e| e.to_string()),
                started_at,
                finished_at: Utc::now(),
            });
        }

        report
    }
}
