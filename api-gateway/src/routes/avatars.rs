//! `GET /avatars/<user>` — avatar replay queries.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use chain::{Avatar, ChainStore};

use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AtQuery {
    pub at: Option<u64>,
}

#[derive(Serialize)]
pub struct AvatarEnvelope {
    pub avatar: Option<Avatar>,
}

/// `GET /avatars/<user>?at=<block_id>`
///
/// Replays `user`'s move history up to `at` (defaulting to the current
/// tip) and returns the reconstructed avatar, or `null` if the user has
/// never submitted a creation move at or before that height.
pub async fn by_user(
    State(state): State<SharedState>,
    Path(user): Path<String>,
    Query(q): Query<AtQuery>,
) -> Result<Json<AvatarEnvelope>, (StatusCode, String)> {
    let store = state.store.lock().await;
    let ceiling = match q.at {
        Some(id) => id,
        None => store.tip_id().unwrap_or(0),
    };

    let avatar = state.reconstructor.get_or_reconstruct(&*store, &user, ceiling);
    Ok(Json(AvatarEnvelope { avatar }))
}
