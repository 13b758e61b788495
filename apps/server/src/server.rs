//! Inbound webhook endpoint.
//!
//! `POST /{enrichment_key}+{app_id}:{writeback_key}` with the event as JSON
//! body. The credentials only ever live in the request that carried them.

use actix_web::http::StatusCode;
use actix_web::middleware::{self, Condition, NormalizePath};
use actix_web::{App, HttpResponse, HttpServer, post, web};
use noterelay_core::http::build_client;
use noterelay_core::pipeline::relay_event;
use noterelay_enrichment::EnrichmentClient;
use noterelay_shared::{AppConfig, Credentials, RelayError, RelayResponse};
use noterelay_writeback::NotesClient;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{instrument, warn};
use uuid::Uuid;

/// Access log format. The request path is left out: it carries credentials.
const ACCESS_LOG_FORMAT: &str = "%a %s %b %Dms";

/// Immutable state shared by all workers.
pub(crate) struct RelayState {
    http: Client,
    config: AppConfig,
}

impl RelayState {
    pub(crate) fn new(config: AppConfig) -> noterelay_shared::Result<Self> {
        Ok(Self {
            http: build_client(&config.http)?,
            config,
        })
    }
}

/// Switches that only affect how the server runs, not what it answers.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ServeOptions {
    pub log_http: bool,
}

/// Bind and run the server until shutdown.
pub(crate) async fn serve(config: AppConfig, options: ServeOptions) -> std::io::Result<()> {
    let bind = (config.server.address.clone(), config.server.port);
    let workers = config.server.workers;

    let state = web::Data::new(RelayState::new(config).map_err(std::io::Error::other)?);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes)
            .wrap(NormalizePath::trim())
            .wrap(Condition::new(
                options.log_http,
                middleware::Logger::new(ACCESS_LOG_FORMAT),
            ))
    })
    .workers(workers)
    .bind(bind)?
    .run()
    .await
}

pub(crate) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(webhook);
}

/// Webhook endpoint, triggered once per event.
#[post("/{credentials}")]
async fn webhook(
    state: web::Data<RelayState>,
    credentials: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    relay(&state, &credentials, &body).await
}

#[instrument(skip_all, fields(request_id = %Uuid::now_v7()))]
async fn relay(state: &RelayState, segment: &str, body: &[u8]) -> HttpResponse {
    let credentials = match Credentials::from_path_segment(segment) {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(error = %e, "rejecting request with malformed credentials");
            return HttpResponse::NotFound().json(json!({ "error": e.to_string() }));
        }
    };

    let event: Value = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "request body is not JSON");
            let err = RelayError::UnexpectedFormat;
            return respond(state, err.status_code(), RelayResponse::error(Value::Null, &err));
        }
    };

    let enrichment = EnrichmentClient::new(
        state.http.clone(),
        &state.config.enrichment,
        credentials.enrichment_key,
    );
    let notes = NotesClient::new(
        state.http.clone(),
        &state.config.writeback,
        credentials.writeback_app_id,
        credentials.writeback_key,
    );

    let relayed = relay_event(event, &enrichment, &notes).await;
    respond(state, relayed.status, relayed.response)
}

/// Failures are reported as 200 unless strict status codes are configured.
fn respond(state: &RelayState, status: u16, body: RelayResponse) -> HttpResponse {
    let status = if state.config.server.strict_status {
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    } else {
        StatusCode::OK
    };

    HttpResponse::build(status).json(body)
}
