use askama::Template;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};

use crate::batch::{BatchReport, ExtractionResult, Outcome};
use crate::error::{AppError, AppResult};
use crate::extractors::SessionToken;
use crate::routes::home::{respond_in_session, Html};
use crate::session::Accumulator;
use crate::state::AppState;
use crate::table::Table;

pub const BATCH_EXPORT_FILENAME: &str = "linkedin_full_extracted_data.csv";
pub const SESSION_EXPORT_FILENAME: &str = "linkedin_full_session_data.csv";

// --- View structs ---

pub struct Banner {
    pub level: &'static str,
    pub message: String,
}

impl Banner {
    fn success(message: String) -> Self {
        Self {
            level: "success",
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: "error",
            message,
        }
    }

    fn info(message: &str) -> Self {
        Self {
            level: "info",
            message: message.to_string(),
        }
    }
}

pub struct ResultSummary {
    pub username: String,
    pub credits_used: String,
    pub rows: usize,
    pub fetched: String,
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/results.html")]
pub struct ResultsTemplate {
    pub heading: String,
    pub banners: Vec<Banner>,
    pub summaries: Vec<ResultSummary>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Empty when there is nothing to export.
    pub download_url: String,
    pub download_label: String,
}

impl ResultsTemplate {
    /// Report for the batch that just ran.
    pub fn for_batch(report: &BatchReport) -> Self {
        let mut banners: Vec<Banner> = report
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                Outcome::Fetched {
                    username,
                    credits_used,
                } => Banner::success(format!(
                    "Fetched for: {} (Credits Used: {})",
                    username, credits_used
                )),
                Outcome::Failed { username, error } => {
                    Banner::error(format!("Failed for {}: {}", username, error))
                }
            })
            .collect();

        let table = report.table();
        if report.outcomes.is_empty() {
            banners.push(Banner::info("The uploaded file contains no usernames."));
        } else if table.is_empty() {
            banners.push(Banner::info(
                "No activity rows were extracted, so there is nothing to download.",
            ));
        }

        Self::build(
            "Extracted Data Summary",
            banners,
            &report.results,
            &table,
            "/results/batch.csv",
            "Download Flattened CSV",
        )
    }

    /// Everything accumulated in the session so far.
    pub fn for_session(accumulated: &Accumulator) -> Self {
        let table = accumulated.table();
        let mut banners = Vec::new();
        if accumulated.is_empty() {
            banners.push(Banner::info("No results yet in session."));
        } else if table.is_empty() {
            banners.push(Banner::info(
                "Stored results contain no activity rows, so there is nothing to download.",
            ));
        }

        Self::build(
            "All Session Extracted Data Summary",
            banners,
            accumulated.results(),
            &table,
            "/results/session.csv",
            "Download Full Session CSV",
        )
    }

    fn build(
        heading: &str,
        banners: Vec<Banner>,
        results: &[ExtractionResult],
        table: &Table,
        download_url: &str,
        download_label: &str,
    ) -> Self {
        let download_url = if table.is_empty() {
            String::new()
        } else {
            download_url.to_string()
        };

        Self {
            heading: heading.to_string(),
            banners,
            summaries: results.iter().map(summarize).collect(),
            columns: table.columns().to_vec(),
            rows: table.rendered_rows(),
            download_url,
            download_label: download_label.to_string(),
        }
    }
}

fn summarize(result: &ExtractionResult) -> ResultSummary {
    ResultSummary {
        username: result.username.clone(),
        credits_used: result.credits_used.clone(),
        rows: result.document.activity_count(),
        fetched: format_relative_time(&result.fetched_at),
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/results", get(session_results))
        .route("/results/batch.csv", get(download_batch))
        .route("/results/session.csv", get(download_session))
        .route("/results/clear", post(clear_results))
}

// --- Handlers ---

/// GET /results — all results accumulated in this session
async fn session_results(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Response {
    let (token, created, page) = {
        let mut sessions = state.sessions.lock().await;
        let (token, created) = sessions.touch(token.as_deref());
        let page = match sessions.get(&token) {
            Some(session) => ResultsTemplate::for_session(&session.accumulated),
            None => ResultsTemplate::for_session(&Accumulator::new()),
        };
        (token, created, page)
    };

    respond_in_session(Html(page).into_response(), &state, &token, created)
}

async fn download_batch(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Response> {
    let table = session_table(&state, token.as_deref(), |session| {
        session.last_batch.table()
    })
    .await;
    csv_download(&table, BATCH_EXPORT_FILENAME)
}

async fn download_session(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Response> {
    let table = session_table(&state, token.as_deref(), |session| {
        session.accumulated.table()
    })
    .await;
    csv_download(&table, SESSION_EXPORT_FILENAME)
}

/// POST /results/clear — forget the session's results
async fn clear_results(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Redirect {
    if let Some(token) = token {
        state.sessions.lock().await.clear(&token);
        tracing::info!("Cleared session results");
    }
    Redirect::to("/")
}

async fn session_table<F>(state: &AppState, token: Option<&str>, select: F) -> Table
where
    F: FnOnce(&crate::session::Session) -> Table,
{
    let sessions = state.sessions.lock().await;
    token
        .and_then(|token| sessions.get(token))
        .map(select)
        .unwrap_or_default()
}

fn csv_download(table: &Table, filename: &str) -> AppResult<Response> {
    if table.is_empty() {
        return Err(AppError::NotFound);
    }

    let body = table.to_csv()?;
    tracing::info!(
        rows = table.len(),
        columns = table.columns().len(),
        "Exporting {}",
        filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

// --- Time formatting ---

pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    dt.format("%b %-d, %Y %H:%M").to_string()
}

// --- Tests ---
