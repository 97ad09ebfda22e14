use actix_web::{HttpResponse, web};
use chrono::{SecondsFormat, Utc};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use shared::{AnalyzeRequest, HealthStatus, NewCatch};

use crate::catches::store::{CatchStore, StoreError};
use crate::vision::service::{AnalysisError, VisionService};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/analyze")
            .route(web::post().to(analyze))
            .route(web::get().to(analyze_status)),
    )
    .service(
        web::resource("/api/catches")
            .route(web::get().to(list_catches))
            .route(web::post().to(create_catch)),
    )
    .service(web::resource("/api/catches/{id}").route(web::delete().to(delete_catch)));
}

async fn analyze(
    vision: web::Data<VisionService>,
    payload: web::Json<AnalyzeRequest>,
) -> HttpResponse {
    let base64_image = payload.into_inner().base64_image.unwrap_or_default();

    match vision.identify(&base64_image).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(err) => analysis_error_response(err),
    }
}

fn analysis_error_response(err: AnalysisError) -> HttpResponse {
    match &err {
        err if err.is_validation() => HttpResponse::BadRequest().json(ErrorResponse {
            error: err.to_string(),
        }),
        AnalysisError::MissingCredential => {
            // Operator problem. The caller only learns that configuration
            // is broken, the specifics stay in the server log.
            error!("OpenAI API key is not set");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Server configuration error".to_string(),
            })
        }
        _ => {
            error!("Error processing request: {}", err);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to analyze image",
                "details": err.to_string(),
            }))
        }
    }
}

async fn analyze_status(vision: web::Data<VisionService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthStatus {
        status: "API is running".to_string(),
        openai_key_set: vision.credential_set(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn list_catches(store: web::Data<CatchStore>) -> HttpResponse {
    HttpResponse::Ok().json(store.list())
}

async fn create_catch(store: web::Data<CatchStore>, payload: web::Json<NewCatch>) -> HttpResponse {
    match store.add(payload.into_inner()) {
        Ok(record) => {
            info!("Saved catch {} ({})", record.id, record.species);
            HttpResponse::Created().json(record)
        }
        Err(err) => store_error_response(err),
    }
}

async fn delete_catch(store: web::Data<CatchStore>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match store.remove(&id) {
        Ok(record) => {
            info!("Deleted catch {}", record.id);
            HttpResponse::Ok().json(record)
        }
        Err(err) => store_error_response(err),
    }
}

fn store_error_response(err: StoreError) -> HttpResponse {
    match &err {
        StoreError::Invalid(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: err.to_string(),
        }),
        StoreError::NotFound(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Catch not found".to_string(),
        }),
        StoreError::Duplicate(_) => HttpResponse::Conflict().json(ErrorResponse {
            error: err.to_string(),
        }),
        _ => {
            error!("Catch store failure: {}", err);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to update catches".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use actix_web::{App, test};
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::Value;
    use shared::CatchRecord;
    use std::time::Duration;

    fn test_config(api_key: Option<&str>) -> Config {
        Config {
            openai_api_key: api_key.map(str::to_string),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            vision_model: "gpt-4o".to_string(),
            upstream_timeout: Duration::from_secs(10),
            upstream_retries: 3,
            upstream_retry_delay: Duration::from_millis(1000),
            port: 8081,
            catches_path: "catches.json".into(),
        }
    }

    fn test_services(
        api_key: Option<&str>,
        dir: &tempfile::TempDir,
    ) -> (web::Data<VisionService>, web::Data<CatchStore>) {
        let vision = VisionService::new(&test_config(api_key)).unwrap();
        let store = CatchStore::load(dir.path().join("catches.json")).unwrap();
        (web::Data::new(vision), web::Data::new(store))
    }

    #[actix_web::test]
    async fn analyze_without_image_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let (vision, store) = test_services(Some("sk-test"), &dir);
        let app = test::init_service(
            App::new()
                .app_data(vision)
                .app_data(store)
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(json!({ "base64Image": "" }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), 400);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Image data is required");
    }

    #[actix_web::test]
    async fn analyze_with_absent_field_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let (vision, store) = test_services(Some("sk-test"), &dir);
        let app = test::init_service(
            App::new()
                .app_data(vision)
                .app_data(store)
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(json!({}))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), 400);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Image data is required");
    }

    #[actix_web::test]
    async fn analyze_without_credential_returns_500_generic() {
        let dir = tempfile::tempdir().unwrap();
        let (vision, store) = test_services(None, &dir);
        let app = test::init_service(
            App::new()
                .app_data(vision)
                .app_data(store)
                .configure(configure_routes),
        )
        .await;

        let encoded = BASE64.encode(b"\xff\xd8\xff\xe0 jpeg-ish bytes");
        let request = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(json!({ "base64Image": encoded }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), 500);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Server configuration error");
        assert!(body.get("details").is_none());
    }

    #[actix_web::test]
    async fn status_reports_missing_credential() {
        let dir = tempfile::tempdir().unwrap();
        let (vision, store) = test_services(None, &dir);
        let app = test::init_service(
            App::new()
                .app_data(vision)
                .app_data(store)
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::get().uri("/api/analyze").to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), 200);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["status"], "API is running");
        assert_eq!(body["openaiKeySet"], false);
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn catch_lifecycle_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let (vision, store) = test_services(Some("sk-test"), &dir);
        let app = test::init_service(
            App::new()
                .app_data(vision)
                .app_data(store)
                .configure(configure_routes),
        )
        .await;

        let create = test::TestRequest::post()
            .uri("/api/catches")
            .set_json(json!({
                "image": "file:///photos/catch-1.jpg",
                "species": "Largemouth Bass",
                "facts": ["Freshwater", "Can grow to 29 inches"],
                "location": { "latitude": 44.97, "longitude": -93.26 }
            }))
            .to_request();
        let response = test::call_service(&app, create).await;
        assert_eq!(response.status(), 201);
        let created: CatchRecord = test::read_body_json(response).await;
        assert_eq!(created.species, "Largemouth Bass");

        let list = test::TestRequest::get().uri("/api/catches").to_request();
        let response = test::call_service(&app, list).await;
        assert_eq!(response.status(), 200);
        let listed: Vec<CatchRecord> = test::read_body_json(response).await;
        assert_eq!(listed, vec![created.clone()]);

        let delete = test::TestRequest::delete()
            .uri(&format!("/api/catches/{}", created.id))
            .to_request();
        let response = test::call_service(&app, delete).await;
        assert_eq!(response.status(), 200);

        let delete_again = test::TestRequest::delete()
            .uri(&format!("/api/catches/{}", created.id))
            .to_request();
        let response = test::call_service(&app, delete_again).await;
        assert_eq!(response.status(), 404);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Catch not found");
    }

    #[actix_web::test]
    async fn catch_without_species_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let (vision, store) = test_services(Some("sk-test"), &dir);
        let app = test::init_service(
            App::new()
                .app_data(vision)
                .app_data(store)
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/catches")
            .set_json(json!({
                "image": "file:///photos/catch-2.jpg",
                "species": "",
                "facts": ["a fact"],
                "location": { "latitude": 0.0, "longitude": 0.0 }
            }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 400);
    }
}
