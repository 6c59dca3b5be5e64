#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the issue scraper API server.

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    issue_scraper_server::run_server().await
}
