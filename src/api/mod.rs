//! HTTP interface - axum router, shared state and JSON envelopes.
//!
//! Every route lives under `/api`; uploaded files are served from `/storage`.

pub mod extract;
pub mod multipart;
pub mod response;

mod accounts;
mod orders;
mod packs;
mod products;
mod site;

use crate::{
    config::AppConfig,
    core::{dashboard::DashboardCache, upload::ImageStore},
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Largest accepted request body, uploads included.
const BODY_LIMIT: usize = 20 * 1024 * 1024;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Upload storage
    pub images: ImageStore,
    /// Memoized dashboard overview
    pub dashboard: DashboardCache,
}

impl AppState {
    /// Builds the state from a connection and configuration.
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let images = ImageStore::new(config.storage.public_dir.clone());
        Self {
            db,
            config: Arc::new(config),
            images,
            dashboard: DashboardCache::default(),
        }
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|_| tracing::warn!("Ignoring invalid CORS origin {origin}"))
                .ok()
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(accounts::routes())
        .merge(products::routes())
        .merge(packs::routes())
        .merge(orders::routes())
        .merge(site::routes());

    Router::new()
        .nest("/api", routes)
        .nest_service("/storage", ServeDir::new(state.images.public_dir()))
        .fallback(handler_404)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{entities::UserRole, errors::Result, test_utils::*};
    use axum::{
        body::Body,
        http::{Method, Request, header},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn test_app() -> Result<(Router, DatabaseConnection)> {
        let db = setup_test_db().await?;
        let mut config = AppConfig::default();
        config.storage.public_dir = std::env::temp_dir().join(format!("linen-shop-{}", uuid::Uuid::new_v4()));
        Ok((router(AppState::new(db.clone(), config)), db))
    }

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn token_for(app: &Router, db: &DatabaseConnection, email: &str, role: UserRole) -> String {
        create_test_user(db, email, role).await.unwrap();
        let (status, body) = send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_place_order_over_http() -> Result<()> {
        let (app, db) = test_app().await?;
        let product = create_test_product(&db, "Drap", 100.0, Some(20.0)).await?;

        let order = json!({
            "full_name": "Amina Benali",
            "phone": "0555123456",
            "address": "12 rue des Oliviers",
            "products": [{ "product_id": product.id, "quantity": 2, "color": "Blanc" }],
            "total": 160.0,
        });
        let (status, body) = send(&app, Method::POST, "/api/orders", None, Some(order.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["total"], 160.0);
        assert_eq!(body["data"]["products"][0]["color"], "Blanc");

        let mut wrong = order;
        wrong["total"] = json!(150.0);
        let (status, body) = send(&app, Method::POST, "/api/orders", None, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Unable to place order");
        assert!(body["error"].as_str().unwrap().contains("Totals mismatch"));
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_errors_are_field_level() -> Result<()> {
        let (app, _db) = test_app().await?;
        let order = json!({
            "full_name": "",
            "phone": "0555123456",
            "address": "Alger",
            "products": [{ "product_id": 1, "quantity": 1 }],
            "total": 10.0,
        });
        let (status, body) = send(&app, Method::POST, "/api/orders", None, Some(order)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["full_name"][0], "is required");
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_field_level() -> Result<()> {
        let (app, db) = test_app().await?;
        let order = json!({
            "full_name": "Amina Benali",
            "phone": "0555123456",
            "address": "Alger",
            "products": [{ "product_id": 1, "quantity": 1 }],
            "total": 10.0,
        });

        for missing in ["total", "full_name"] {
            let mut partial = order.clone();
            partial.as_object_mut().unwrap().remove(missing);
            let (status, body) = send(&app, Method::POST, "/api/orders", None, Some(partial)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["errors"][missing][0], "is required");
        }

        let mut wrong_type = order;
        wrong_type["products"][0]["quantity"] = json!("two");
        let (status, body) = send(&app, Method::POST, "/api/orders", None, Some(wrong_type)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["products.0.quantity"].is_array());

        let token = token_for(&app, &db, "admin@shop.test", UserRole::Admin).await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/orders/1/status",
            Some(&token),
            Some(json!({ "status": "shipped" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["status"].is_array());

        let (status, body) = send(&app, Method::GET, "/api/products?page=first", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["query"].is_array());
        Ok(())
    }

    #[tokio::test]
    async fn test_public_catalog_and_pagination_meta() -> Result<()> {
        let (app, db) = test_app().await?;
        for i in 0..3 {
            create_test_product(&db, &format!("Drap {i}"), 10.0, Some(50.0)).await?;
        }

        let (status, body) = send(&app, Method::GET, "/api/products?per_page=2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["final_price"], 5.0);
        assert_eq!(body["meta"]["total"], 3);
        assert_eq!(body["meta"]["per_page"], 2);

        let (status, body) = send(&app, Method::GET, "/api/categories", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!(["Linge de lit"]));

        let (status, _) = send(&app, Method::GET, "/api/products/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_writes_require_authentication() -> Result<()> {
        let (app, db) = test_app().await?;
        let product = json!({ "title": "Drap", "category": "Linge de lit", "price": 10.0, "status": true });

        let (status, _) = send(&app, Method::POST, "/api/products", None, Some(product.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::POST, "/api/products", Some("bogus"), Some(product.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = token_for(&app, &db, "admin@shop.test", UserRole::Admin).await;
        let (status, body) = send(&app, Method::POST, "/api/products", Some(&token), Some(product)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["slug"], "drap");

        let (status, _) = send(&app, Method::GET, "/api/dashboard/overview", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = send(&app, Method::GET, "/api/dashboard/overview", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["catalog"]["products"]["available"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_management_is_superadmin_only() -> Result<()> {
        let (app, db) = test_app().await?;
        let admin = token_for(&app, &db, "admin@shop.test", UserRole::Admin).await;
        let root = token_for(&app, &db, "root@shop.test", UserRole::Superadmin).await;

        let (status, _) = send(&app, Method::GET, "/api/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, Method::GET, "/api/users", Some(&root), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 2);
        assert!(body["data"][0].get("password_hash").is_none());

        let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&root), None).await;
        assert_eq!(status, StatusCode::OK);
        let root_id = me["data"]["id"].as_i64().unwrap();

        let (status, body) = send(&app, Method::DELETE, &format!("/api/users/{root_id}"), Some(&root), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "At least one superadmin must remain");
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_revokes_token() -> Result<()> {
        let (app, db) = test_app().await?;
        let token = token_for(&app, &db, "admin@shop.test", UserRole::Admin).await;

        let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() -> Result<()> {
        let (app, _db) = test_app().await?;
        let (status, body) = send(&app, Method::GET, "/api/nothing-here", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not found");
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_product_images() -> Result<()> {
        let (app, db) = test_app().await?;
        let product = create_test_product(&db, "Drap", 10.0, None).await?;
        let token = token_for(&app, &db, "admin@shop.test", UserRole::Admin).await;

        let boundary = "linen-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"images[]\"; filename=\"drap.png\"\r\nContent-Type: image/png\r\n\r\npng-bytes\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/products/{}/images", product.id))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let url = body["data"]["images"][0].as_str().unwrap().to_string();
        assert!(url.starts_with("/storage/products/"));

        // The stored file is served back
        let (status, _) = send(&app, Method::GET, &url, None, None).await;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }
}
