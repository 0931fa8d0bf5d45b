//! Site settings and dashboard routes.

use super::{
    AppState,
    extract::{AuthUser, SuperAdmin},
    multipart::Form,
    response::ApiResponse,
};
use crate::{
    core::{
        dashboard::Overview,
        settings::{self, SettingsUpdate, SiteSettings},
    },
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::{Multipart, State},
    routing::get,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).post(update_settings))
        .route("/dashboard/overview", get(overview))
}

async fn get_settings(State(state): State<AppState>) -> Result<ApiResponse<SiteSettings>> {
    Ok(ApiResponse::ok(settings::get_settings(&state.db).await?))
}

/// Multipart body: a JSON `data` part plus optional `logo` and `carousel`
/// files.
async fn update_settings(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    multipart: Multipart,
) -> Result<ApiResponse<SiteSettings>> {
    let form = Form::read(multipart).await?;
    let data = form
        .fields
        .get("data")
        .ok_or_else(|| Error::validation("data", "is required"))?;
    let update: SettingsUpdate =
        serde_json::from_str(data).map_err(|e| Error::validation("data", e.to_string()))?;
    settings::validate(&update)?;

    let logo = form
        .store_files(&state.images, "logo", "branding")
        .await?
        .into_iter()
        .next();
    let carousel = form.store_files(&state.images, "carousel", "carousel").await?;

    let saved = settings::update_settings(&state.db, update, logo, carousel).await?;
    Ok(ApiResponse::ok(saved).with_message("Settings updated"))
}

async fn overview(State(state): State<AppState>, _user: AuthUser) -> Result<ApiResponse<Overview>> {
    Ok(ApiResponse::ok(state.dashboard.overview(&state.db).await?))
}
