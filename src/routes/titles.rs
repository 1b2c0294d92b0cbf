use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Title, TitleId},
    routes::AppState,
};

/// Looks up one catalog title by id
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Title>> {
    let id: TitleId = raw_id.parse()?;

    state
        .catalog
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Title {} is not in the catalog", id)))
}
