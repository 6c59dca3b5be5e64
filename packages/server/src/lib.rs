#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the issue scraper.
//!
//! A thin adapter over [`IngestService`]: `POST /scrape` starts a run on a
//! background task, and the status, stats, reset and transform routes stay
//! answerable while it runs.

mod handlers;

use actix_web::{App, HttpServer, middleware, web};
use issue_scraper_ingest::config::load_config;
use issue_scraper_ingest::service::IngestService;
use issue_scraper_source::transport::{HttpTransport, ReqwestTransport};

/// Registers every route for a service using transport `T`.
pub fn routes<T: HttpTransport + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::home::<T>))
        .route("/health", web::get().to(handlers::health))
        .route("/scrape", web::post().to(handlers::scrape::<T>))
        .route("/status", web::get().to(handlers::status::<T>))
        .route("/stats", web::get().to(handlers::stats::<T>))
        .route("/reset", web::delete().to(handlers::reset::<T>))
        .route("/transform", web::get().to(handlers::transform::<T>));
}

/// Starts the issue scraper API server.
///
/// Loads the layered configuration, builds the ingestion service, and
/// serves it on `BIND_ADDR:PORT` (default `127.0.0.1:8000`). The caller
/// provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the HTTP client cannot
/// be built, or the server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = load_config(None)?;
    log::info!("Serving projects: {}", config.partitions.join(", "));

    let service = web::Data::new(IngestService::from_config(config)?);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .configure(routes::<ReqwestTransport>)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use actix_web::http::StatusCode;
    use actix_web::test;
    use async_trait::async_trait;
    use issue_scraper_ingest_models::{IngestConfig, StatusReport};
    use issue_scraper_source::transport::FetchOutcome;
    use serde_json::{Value, json};

    use super::*;

    /// Serves one issue per project and no comments.
    struct SingleIssueTracker;

    #[async_trait]
    impl HttpTransport for SingleIssueTracker {
        async fn get_json(&self, url: &str) -> FetchOutcome {
            if url.contains("/comment") {
                return FetchOutcome::Absent;
            }
            FetchOutcome::Success(json!({
                "total": 1,
                "issues": [{"key": "X-1", "fields": {"project": {"key": "X"}}}]
            }))
        }
    }

    fn service(dir: &Path) -> web::Data<IngestService<SingleIssueTracker>> {
        let config = IngestConfig {
            api_url: "http://tracker".to_owned(),
            partitions: vec!["X".to_owned()],
            // Keeps the background run parked after its first page.
            inter_page_delay: std::time::Duration::from_secs(3600),
            sink_path: dir.join("output.jsonl"),
            checkpoint_path: dir.join("checkpoint.json"),
            status_path: dir.join("status.json"),
            transformed_path: dir.join("transformed.jsonl"),
            ..IngestConfig::default()
        };
        web::Data::new(IngestService::new(config, SingleIssueTracker))
    }

    #[actix_web::test]
    async fn health_and_home() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(dir.path()))
                .configure(routes::<SingleIssueTracker>),
        )
        .await;

        let health: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(health["status"], "healthy");

        let home: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;
        assert_eq!(home["projects"], json!(["X"]));
    }

    #[actix_web::test]
    async fn stats_and_transform_are_not_found_without_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(dir.path()))
                .configure(routes::<SingleIssueTracker>),
        )
        .await;

        for uri in ["/stats", "/transform"] {
            let resp =
                test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn scrape_conflicts_while_running() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(dir.path()))
                .configure(routes::<SingleIssueTracker>),
        )
        .await;

        let first =
            test::call_service(&app, test::TestRequest::post().uri("/scrape").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second =
            test::call_service(&app, test::TestRequest::post().uri("/scrape").to_request()).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let reset =
            test::call_service(&app, test::TestRequest::delete().uri("/reset").to_request()).await;
        assert_eq!(reset.status(), StatusCode::CONFLICT);

        let status: StatusReport =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/status").to_request())
                .await;
        assert!(status.is_running);
    }

    #[actix_web::test]
    async fn reset_when_idle_succeeds() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(dir.path()))
                .configure(routes::<SingleIssueTracker>),
        )
        .await;

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::delete().uri("/reset").to_request(),
        )
        .await;
        assert_eq!(body["status"], "reset_complete");
        assert_eq!(body["message"], "All checkpoints and data cleared");
        assert_eq!(body["files_deleted"], json!([]));
    }
}
