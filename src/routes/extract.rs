use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::batch::run_batch;
use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::extractors::SessionToken;
use crate::fetch::{parse_toggle, FetchOptions, MAX_COMMENT_COUNT};
use crate::input;
use crate::routes::home::{respond_in_session, Html, HomeTemplate};
use crate::routes::results::ResultsTemplate;
use crate::state::AppState;

/// Parsed upload form.
struct ExtractForm {
    file: Vec<u8>,
    options: FetchOptions,
}

/// POST /extract — load usernames from the uploaded CSV and run one batch
pub async fn extract(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let form = read_form(&mut multipart, &state.config.api).await?;
    let (token, created) = state.sessions.lock().await.touch(token.as_deref());

    let usernames = match input::load_usernames(&form.file) {
        Ok(usernames) => usernames,
        Err(e) => {
            tracing::warn!("Rejected upload: {}", e);
            let stored = {
                let sessions = state.sessions.lock().await;
                sessions
                    .get(&token)
                    .map(|session| session.accumulated.len())
                    .unwrap_or(0)
            };
            let page = Html(HomeTemplate::new(&state.config, stored, e.to_string()));
            let response = (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
            return Ok(respond_in_session(response, &state, &token, created));
        }
    };

    tracing::info!(
        usernames = usernames.len(),
        extract_comments = form.options.extract_comments,
        count = form.options.count(),
        "Starting batch"
    );

    // Runs on its own task so a dropped connection does not cut the batch short.
    let batch = {
        let fetcher = state.fetcher.clone();
        let sessions = state.sessions.clone();
        let token = token.clone();
        let options = form.options;
        tokio::spawn(async move {
            let report = run_batch(fetcher.as_ref(), &usernames, options).await;
            sessions
                .lock()
                .await
                .record_batch(&token, report.results.clone());
            report
        })
    };
    let report = batch
        .await
        .map_err(|e| AppError::Internal(format!("Batch task failed: {}", e)))?;

    let page = Html(ResultsTemplate::for_batch(&report));
    Ok(respond_in_session(
        page.into_response(),
        &state,
        &token,
        created,
    ))
}

async fn read_form(multipart: &mut Multipart, defaults: &ApiConfig) -> AppResult<ExtractForm> {
    let mut file = None;
    let mut extract_comments = defaults.default_extract_comments;
    let mut count = defaults.default_count;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                // An empty part is still an upload; the loader reports it.
                file = Some(field.bytes().await?.to_vec());
            }
            "extract_comments" => {
                let text = field.text().await?;
                extract_comments = parse_toggle(&text).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "extract_comments must be 'yes' or 'no', got '{}'",
                        text.trim()
                    ))
                })?;
            }
            "count" => {
                let text = field.text().await?;
                count = parse_count(&text).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "count must be a whole number between 0 and {}",
                        MAX_COMMENT_COUNT
                    ))
                })?;
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("Upload a CSV file".into()))?;
    let options = FetchOptions::new(extract_comments, count)
        .ok_or_else(|| AppError::BadRequest("count is out of range".into()))?;

    Ok(ExtractForm { file, options })
}

fn parse_count(text: &str) -> Option<u8> {
    text.trim()
        .parse::<u8>()
        .ok()
        .filter(|count| *count <= MAX_COMMENT_COUNT)
}
