use std::sync::Arc;

use actix_web::http::{Method, StatusCode};
use actix_web::middleware::DefaultHeaders;
use actix_web::{error, guard, web, App, HttpRequest, HttpResponse, HttpServer, Responder, Route};
use serde::Deserialize;
use serde_json::json;

use crate::config::ServerConfig;
use crate::domain::account::{ErrorKind, RegistrationError, RegistrationService};
use crate::metrics::Metrics;

// ============================================================================
// HTTP Boundary
// ============================================================================
//
// Thin transport over RegistrationService:
// - POST /register  -> register(email, password)
// - GET  /health    -> liveness
// - GET  /metrics   -> Prometheus exposition
//
// Mapping error kinds to status codes is decided here, not in the core.
//
// ============================================================================

pub struct AppState {
    pub registration: Arc<RegistrationService>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Start the HTTP server and run until shutdown.
pub async fn serve(state: AppState, server: &ServerConfig) -> std::io::Result<()> {
    tracing::info!("🌐 Starting HTTP server on http://{}:{}", server.host, server.port);

    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_headers())
            .configure(routes)
    })
    .bind((server.host.as_str(), server.port))?
    .run()
    .await
}

/// Permissive CORS, same policy for every response.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "POST, GET, OPTIONS, PUT, DELETE"))
        .add(("Access-Control-Allow-Headers", "Content-Type, Authorization"))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = failure_body(
            ErrorKind::ValidationError,
            &format!("Malformed request body: {}", err),
        );
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(json_config)
        .service(
            web::resource("/register")
                .route(web::post().to(register_handler))
                .route(preflight()),
        )
        .service(
            web::resource("/health")
                .route(web::get().to(health_handler))
                .route(preflight()),
        )
        .service(
            web::resource("/metrics")
                .route(web::get().to(metrics_handler))
                .route(preflight()),
        )
        .default_service(web::to(fallback_handler));
}

/// OPTIONS is answered with 204 on every path; the CORS headers come from
/// `cors_headers`.
fn preflight() -> Route {
    web::route().guard(guard::Options()).to(preflight_handler)
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::DuplicateEmail => StatusCode::CONFLICT,
        ErrorKind::HashError | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::ConnectionError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn failure_body(kind: ErrorKind, details: &str) -> serde_json::Value {
    json!({
        "status": "failed",
        "error": kind,
        "details": details,
    })
}

fn error_response(err: &RegistrationError) -> HttpResponse {
    let kind = err.kind();
    HttpResponse::build(status_for(kind)).json(failure_body(kind, &err.detail()))
}

async fn register_handler(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> HttpResponse {
    let RegisterRequest { email, password } = body.into_inner();

    match state.registration.register(&email, &password).await {
        Ok(summary) => HttpResponse::Created().json(json!({
            "status": "success",
            "message": "User created successfully",
            "data": {
                "userId": summary.id,
                "email": summary.email,
            },
        })),
        Err(err) => error_response(&err),
    }
}

async fn preflight_handler() -> impl Responder {
    HttpResponse::NoContent().finish()
}

async fn fallback_handler(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().finish()
    }
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "account-registry"
    }))
}

async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.encode() {
        Ok(buffer) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;

    use crate::config::{HashingConfig, RegistrationPolicy};
    use crate::db::MemoryAccountStore;
    use crate::domain::account::PasswordHasher;

    fn state() -> web::Data<AppState> {
        let hasher = PasswordHasher::new(&HashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let metrics = Arc::new(Metrics::new().unwrap());
        let registration = RegistrationService::new(
            Arc::new(MemoryAccountStore::new()),
            hasher,
            RegistrationPolicy::default(),
        )
        .with_metrics(metrics.clone());

        web::Data::new(AppState {
            registration: Arc::new(registration),
            metrics,
        })
    }

    #[actix_web::test]
    async fn test_register_created_then_conflict() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state())
                .wrap(cors_headers())
                .configure(routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "email": "a@x.com", "password": "secret1" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers().get("Access-Control-Allow-Origin").unwrap(), "*");

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["email"], "a@x.com");
        assert!(body["data"]["userId"].as_i64().unwrap() > 0);
        assert!(body["data"].get("password").is_none());

        let req = actix_test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "email": "a@x.com", "password": "other" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"], "DuplicateEmail");
    }

    #[actix_web::test]
    async fn test_invalid_email_is_bad_request() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "email": "nope", "password": "secret1" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "ValidationError");
    }

    #[actix_web::test]
    async fn test_malformed_body_is_bad_request() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/register")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"email\": ")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"], "ValidationError");
    }

    #[actix_web::test]
    async fn test_preflight_and_health() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state())
                .wrap(cors_headers())
                .configure(routes),
        )
        .await;

        let req = actix_test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/register")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.headers().contains_key("Access-Control-Allow-Methods"));

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn test_metrics_endpoint_reports_registrations() {
        let app = actix_test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "email": "a@x.com", "password": "secret1" }))
            .to_request();
        actix_test::call_service(&app, req).await;

        let req = actix_test::TestRequest::get().uri("/metrics").to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("registrations_total{outcome=\"success\"} 1"));
    }

    #[actix_web::test]
    async fn test_preflight_answered_on_every_path() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state())
                .wrap(cors_headers())
                .configure(routes),
        )
        .await;

        for path in ["/register", "/health", "/metrics", "/unknown"] {
            let req = actix_test::TestRequest::default()
                .method(Method::OPTIONS)
                .uri(path)
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT, "{}", path);
            assert_eq!(resp.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
        }

        let req = actix_test::TestRequest::get().uri("/unknown").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::ValidationError), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::DuplicateEmail), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::HashError), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::Unknown), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::ConnectionError), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
    }
}
