#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{get, web, App, HttpResponse, HttpServer, ResponseError};
use tracing::{error, info};

use crate::domain::{AppState, HandlerKind};
use crate::service::{HandlerError, LoadRunner};

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(format!("{self}\n"))
    }
}

async fn handle(kind: HandlerKind, data: &AppState) -> Result<HttpResponse, HandlerError> {
    let body = LoadRunner::new(data.clone()).run(kind).await?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(body))
}

#[get("/slow")]
pub async fn slow(data: web::Data<AppState>) -> Result<HttpResponse, HandlerError> {
    handle(HandlerKind::Slow, &data).await
}

#[get("/fast")]
pub async fn fast(data: web::Data<AppState>) -> Result<HttpResponse, HandlerError> {
    handle(HandlerKind::Fast, &data).await
}

#[get("/memory")]
pub async fn memory(data: web::Data<AppState>) -> Result<HttpResponse, HandlerError> {
    handle(HandlerKind::Memory, &data).await
}

#[get("/disk")]
pub async fn disk(data: web::Data<AppState>) -> Result<HttpResponse, HandlerError> {
    handle(HandlerKind::Disk, &data).await
}

#[get("/network")]
pub async fn network(data: web::Data<AppState>) -> Result<HttpResponse, HandlerError> {
    handle(HandlerKind::Network, &data).await
}

#[get("/healthz")]
pub async fn healthz(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(LoadRunner::new(data.get_ref().clone()).health())
}

#[get("/metrics")]
pub async fn scrape_metrics(data: web::Data<AppState>) -> HttpResponse {
    match LoadRunner::new(data.get_ref().clone()).encode_metrics() {
        Ok(buf) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buf),
        Err(e) => {
            error!(error=%format!("{e:#}"), "encode metrics failed");
            HttpResponse::InternalServerError().body("encode metrics failed")
        }
    }
}

/// Registers every route on an actix `App`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(slow)
        .service(fast)
        .service(memory)
        .service(disk)
        .service(network)
        .service(healthz)
        .service(scrape_metrics);
}

pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    info!(bind, "listening");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes)
    })
    .bind(bind)?
    .run()
    .await
}
