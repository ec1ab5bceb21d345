pub mod assets;
pub mod extract;
pub mod home;
pub mod results;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/extract", post(extract::extract))
        .route("/assets/{*path}", get(assets::serve))
        .merge(results::router())
        .with_state(state)
}
