use chrono::{DateTime, Utc};

use crate::document::ActivityDocument;
use crate::fetch::{ActivityFetcher, FetchOptions};
use crate::table::{aggregate, Table};

/// A successfully fetched document for one identifier.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub username: String,
    pub document: ActivityDocument,
    pub credits_used: String,
    pub fetched_at: DateTime<Utc>,
}

/// What happened to one identifier of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Fetched { username: String, credits_used: String },
    Failed { username: String, error: String },
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
    pub results: Vec<ExtractionResult>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Failed { .. }))
            .count()
    }

    pub fn table(&self) -> Table {
        results_table(&self.results)
    }
}

pub fn results_table(results: &[ExtractionResult]) -> Table {
    aggregate(
        results
            .iter()
            .map(|result| (result.username.as_str(), &result.document)),
    )
}

/// Fetch every identifier in order, one request at a time.
///
/// A failed fetch is recorded and the batch moves on to the next identifier.
pub async fn run_batch(
    fetcher: &dyn ActivityFetcher,
    usernames: &[String],
    options: FetchOptions,
) -> BatchReport {
    let mut report = BatchReport::default();

    for username in usernames {
        match fetcher.fetch(username, options).await {
            Ok(document) => {
                let credits_used = document.credits_display();
                tracing::info!(%username, %credits_used, "Fetched activity document");
                report.outcomes.push(Outcome::Fetched {
                    username: username.clone(),
                    credits_used: credits_used.clone(),
                });
                report.results.push(ExtractionResult {
                    username: username.clone(),
                    document,
                    credits_used,
                    fetched_at: Utc::now(),
                });
            }
            Err(e) => {
                tracing::warn!(%username, "Fetch failed: {}", e);
                report.outcomes.push(Outcome::Failed {
                    username: username.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        requested = usernames.len(),
        fetched = report.results.len(),
        failed = report.failed(),
        "Batch complete"
    );
    report
}
