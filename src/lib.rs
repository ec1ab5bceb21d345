// Library exports for the bulk extractor
// Integration tests drive the router and the fetcher through these modules

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod flatten;
pub mod input;
pub mod routes;
pub mod session;
pub mod state;
pub mod table;
