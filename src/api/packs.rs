//! Pack routes.

use super::{
    AppState,
    extract::{ApiJson, ApiQuery, AuthUser},
    multipart::Form,
    response::{ApiResponse, message},
};
use crate::{
    core::{
        pack::{self, DEFAULT_PER_PAGE, MAX_PER_PAGE, NewPack, PackChanges, PackItemInput, PackView},
        pagination::PageQuery,
    },
    errors::Result,
};
use axum::{
    Router,
    extract::{Multipart, Path, State},
    routing::{delete, get, post},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/packs", get(list_packs).post(create_pack))
        .route("/packs/{id}", get(get_pack).put(update_pack).delete(delete_pack))
        .route("/packs/{id}/products", post(add_product))
        .route("/packs/{id}/products/{product_id}", delete(remove_product))
        .route("/packs/{id}/images", post(upload_images))
}

async fn list_packs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Vec<PackView>>> {
    let page = pack::list_packs(&state.db, query.to_request(DEFAULT_PER_PAGE, MAX_PER_PAGE)).await?;
    Ok(ApiResponse::page(page))
}

async fn get_pack(State(state): State<AppState>, Path(id): Path<i64>) -> Result<ApiResponse<PackView>> {
    Ok(ApiResponse::ok(pack::get_pack(&state.db, id).await?))
}

async fn create_pack(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<NewPack>,
) -> Result<ApiResponse<PackView>> {
    let view = pack::create_pack(&state.db, input).await?;
    Ok(ApiResponse::created(view).with_message("Pack created"))
}

async fn update_pack(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(changes): ApiJson<PackChanges>,
) -> Result<ApiResponse<PackView>> {
    let view = pack::update_pack(&state.db, id, changes).await?;
    Ok(ApiResponse::ok(view).with_message("Pack updated"))
}

async fn delete_pack(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Option<()>>> {
    pack::delete_pack(&state.db, id).await?;
    Ok(message("Pack deleted"))
}

async fn add_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(item): ApiJson<PackItemInput>,
) -> Result<ApiResponse<PackView>> {
    let view = pack::add_product_to_pack(&state.db, id, item).await?;
    Ok(ApiResponse::ok(view).with_message("Product added to pack"))
}

async fn remove_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((id, product_id)): Path<(i64, i64)>,
) -> Result<ApiResponse<PackView>> {
    let view = pack::remove_product_from_pack(&state.db, id, product_id).await?;
    Ok(ApiResponse::ok(view).with_message("Product removed from pack"))
}

async fn upload_images(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<ApiResponse<PackView>> {
    pack::require_pack(&state.db, id).await?;
    let form = Form::read(multipart).await?;
    let urls = form.store_files(&state.images, "images", "packs").await?;
    let view = pack::set_pack_images(&state.db, id, urls).await?;
    Ok(ApiResponse::ok(view).with_message("Images uploaded"))
}
