use axum::extract::{Path, State};
use axum::{routing::get, routing::delete, Json, Router};
use serde::Serialize;

use fluxgen_core::error::CoreError;

use crate::error::AppResult;
use crate::gallery::GalleryEntry;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct GalleryListing {
    pub images: Vec<GalleryEntry>,
}

/// GET /gallery -- saved images, newest first.
async fn list_gallery(State(state): State<AppState>) -> AppResult<Json<DataResponse<GalleryListing>>> {
    let images = state.gallery.list().await?;
    Ok(Json(DataResponse {
        data: GalleryListing { images },
    }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// DELETE /gallery/{filename} -- remove one saved image and its
/// metadata sidecar.
async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    if !state.gallery.delete(&filename).await? {
        return Err(CoreError::NotFound {
            entity: "image",
            name: filename,
        }
        .into());
    }
    Ok(Json(DeleteResponse { success: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gallery", get(list_gallery))
        .route("/gallery/{filename}", delete(delete_image))
}
