//! Order routes: public checkout and back-office management.

use super::{
    AppState,
    extract::{ApiJson, ApiQuery, AuthUser},
    response::{ApiResponse, message},
};
use crate::{
    core::{
        order::{self, DEFAULT_PER_PAGE, MAX_PER_PAGE, NewOrder, OrderChanges},
        pagination::PageQuery,
    },
    entities::{OrderStatus, order as order_entity},
    errors::Result,
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/{id}", get(get_order).put(update_order).delete(delete_order))
        .route("/orders/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: OrderStatus,
}

async fn place_order(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewOrder>,
) -> Result<ApiResponse<order_entity::Model>> {
    let order = order::place_order(&state.db, input).await?;
    state.dashboard.invalidate().await;
    Ok(ApiResponse::created(order).with_message("Order placed"))
}

async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Vec<order_entity::Model>>> {
    let page = order::list_orders(&state.db, query.to_request(DEFAULT_PER_PAGE, MAX_PER_PAGE)).await?;
    Ok(ApiResponse::page(page))
}

async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<order_entity::Model>> {
    Ok(ApiResponse::ok(order::get_order(&state.db, id).await?))
}

async fn update_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(changes): ApiJson<OrderChanges>,
) -> Result<ApiResponse<order_entity::Model>> {
    let order = order::update_order(&state.db, id, changes).await?;
    state.dashboard.invalidate().await;
    Ok(ApiResponse::ok(order).with_message("Order updated"))
}

async fn update_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<ApiResponse<order_entity::Model>> {
    let order = order::update_status(&state.db, id, change.status).await?;
    state.dashboard.invalidate().await;
    Ok(ApiResponse::ok(order).with_message("Status updated"))
}

async fn delete_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Option<()>>> {
    order::delete_order(&state.db, id).await?;
    state.dashboard.invalidate().await;
    Ok(message("Order deleted"))
}
