//! Product and category routes.

use super::{
    AppState,
    extract::{ApiJson, ApiQuery, AuthUser},
    multipart::Form,
    response::{ApiResponse, message},
};
use crate::{
    core::{
        pagination::PageQuery,
        product::{self, DEFAULT_PER_PAGE, MAX_PER_PAGE, NewProduct, ProductChanges, ProductView, TopSales},
    },
    entities::product as product_entity,
    errors::Result,
};
use axum::{
    Router,
    extract::{Multipart, Path, State},
    routing::{get, post},
};
use chrono::Utc;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/top-sales", get(top_sales))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/related", get(related_products))
        .route("/products/{id}/images", post(upload_images))
        .route("/categories", get(categories))
}

async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Vec<ProductView>>> {
    let page = product::list_products(&state.db, query.to_request(DEFAULT_PER_PAGE, MAX_PER_PAGE)).await?;
    Ok(ApiResponse::page(page))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<ProductView>> {
    Ok(ApiResponse::ok(product::get_product(&state.db, id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<ApiResponse<ProductView>> {
    let product = product::create_product(&state.db, input).await?;
    Ok(ApiResponse::created(ProductView::from(product)).with_message("Product created"))
}

async fn update_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> Result<ApiResponse<ProductView>> {
    let product = product::update_product(&state.db, id, changes).await?;
    Ok(ApiResponse::ok(ProductView::from(product)).with_message("Product updated"))
}

async fn delete_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Option<()>>> {
    product::delete_product(&state.db, id).await?;
    Ok(message("Product deleted"))
}

async fn upload_images(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<ApiResponse<product_entity::Model>> {
    product::require_product(&state.db, id).await?;
    let form = Form::read(multipart).await?;
    let urls = form.store_files(&state.images, "images", "products").await?;
    let product = product::set_product_images(&state.db, id, urls).await?;
    Ok(ApiResponse::ok(product).with_message("Images uploaded"))
}

async fn related_products(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Vec<ProductView>>> {
    Ok(ApiResponse::ok(product::related_products(&state.db, id).await?))
}

async fn top_sales(State(state): State<AppState>) -> Result<ApiResponse<TopSales>> {
    Ok(ApiResponse::ok(product::top_sales(&state.db, Utc::now()).await?))
}

async fn categories(State(state): State<AppState>) -> Result<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::ok(product::list_categories(&state.db).await?))
}
