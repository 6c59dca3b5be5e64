//! HTTP handler functions for the ingestion API.
//!
//! Each handler is generic over the tracker transport so the routes can be
//! exercised against an in-memory tracker.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use issue_scraper_ingest::IngestError;
use issue_scraper_ingest::service::IngestService;
use issue_scraper_server_models::{ApiError, ApiHealth, ApiHome, ApiReset, ApiStarted, ApiStats};
use issue_scraper_source::transport::HttpTransport;

type Service<T> = web::Data<IngestService<T>>;

fn error_response(action: &str, e: &IngestError) -> HttpResponse {
    match e {
        IngestError::AlreadyRunning => {
            HttpResponse::Conflict().json(ApiError::new("Scraping is already in progress"))
        }
        IngestError::NoData { .. } => HttpResponse::NotFound().json(ApiError::new(
            "No data found. Please run scraping first.",
        )),
        _ => {
            log::error!("Failed to {action}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to {action}")))
        }
    }
}

/// `GET /`
pub async fn home<T: HttpTransport + 'static>(service: Service<T>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHome {
        message: "Issue tracker scraper API".to_owned(),
        projects: service.config().partitions.clone(),
    })
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "healthy".to_owned(),
        timestamp: Utc::now(),
        service: env!("CARGO_PKG_NAME").to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// `POST /scrape`
///
/// Starts a run in the background and returns immediately.
pub async fn scrape<T: HttpTransport + 'static>(service: Service<T>) -> HttpResponse {
    match service.start_ingestion() {
        Ok(_handle) => HttpResponse::Ok().json(ApiStarted {
            status: "started".to_owned(),
            message: "Scraping started in background".to_owned(),
            projects: service.config().partitions.clone(),
            timestamp: Utc::now(),
        }),
        Err(e) => error_response("start scraping", &e),
    }
}

/// `GET /status`
pub async fn status<T: HttpTransport + 'static>(service: Service<T>) -> HttpResponse {
    match service.status() {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => error_response("read status", &e),
    }
}

/// `GET /stats`
pub async fn stats<T: HttpTransport + 'static>(service: Service<T>) -> HttpResponse {
    match service.stats() {
        Ok(statistics) => HttpResponse::Ok().json(ApiStats {
            statistics,
            generated_at: Utc::now(),
        }),
        Err(e) => error_response("calculate statistics", &e),
    }
}

/// `DELETE /reset`
pub async fn reset<T: HttpTransport + 'static>(service: Service<T>) -> HttpResponse {
    match service.reset() {
        Ok(report) => HttpResponse::Ok().json(ApiReset {
            status: "reset_complete".to_owned(),
            message: "All checkpoints and data cleared".to_owned(),
            files_deleted: report.files_deleted,
            timestamp: Utc::now(),
        }),
        Err(e) => error_response("reset data", &e),
    }
}

/// `GET /transform`
pub async fn transform<T: HttpTransport + 'static>(service: Service<T>) -> HttpResponse {
    match service.transform() {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => error_response("transform data", &e),
    }
}
