// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ApiError, AppState};
use crate::catalog::build_filter;
use crate::episode::{Episode, EpisodeStatus, Projection};
use crate::ingest::{ImportOutcome, ImportRequest};
use crate::media::{ContentKind, MediaVariant};

#[derive(Debug, Deserialize)]
pub struct PlayQuery {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    status: String,
}

#[derive(Serialize)]
struct MessageBody {
    message: &'static str,
}

#[derive(Serialize)]
struct ImportedBody {
    episodes: Vec<Episode>,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn list_episodes(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Episode>>, ApiError> {
    let predicate = build_filter(&params)?;
    let episodes: Vec<Episode> = state
        .reader
        .list_projected(predicate, Projection::List)
        .try_collect()
        .await?;

    debug!(count = episodes.len(), "Listed episodes");
    Ok(Json(episodes))
}

pub async fn get_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Episode>, ApiError> {
    let episode = state.reader.get_by_id(&id, Projection::Describe).await?;
    Ok(Json(episode))
}

pub async fn play_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PlayQuery>,
) -> Result<Redirect, ApiError> {
    let kind = ContentKind::resolve(query.content.as_deref())?;
    let variant = MediaVariant::new(kind, &id, &state.key_prefix);

    let access = state.locator.locate(&variant.storage_key).await?;
    debug!(episode_id = %id, %kind, expires_at = %access.expires_at, "Redirecting to media");

    Ok(Redirect::temporary(&access.url))
}

pub async fn ingest_episode(
    State(state): State<AppState>,
    payload: Result<Json<Episode>, JsonRejection>,
) -> Result<Json<Episode>, ApiError> {
    let episode = json_body(payload)?;

    let ingested = state.pipeline.ingest(episode).await?;

    let merged = match state.catalog.get_item(&ingested.id, Projection::Full).await? {
        Some(mut stored) => {
            stored.overlay(&ingested);
            stored
        }
        None => ingested,
    };
    state.catalog.put_item(&merged).await?;
    info!(episode_id = %merged.id, "Stored ingested episode");

    Ok(Json(merged))
}

pub async fn import_episodes(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(payload)?;

    let response = match state.importer.import(request).await? {
        ImportOutcome::Empty => (
            StatusCode::BAD_REQUEST,
            Json(MessageBody {
                message: "Request did not contain any episodes to import",
            }),
        )
            .into_response(),
        ImportOutcome::AlreadyImported => Json(MessageBody {
            message: "All requested episodes are already imported",
        })
        .into_response(),
        ImportOutcome::Imported(episodes) => Json(ImportedBody { episodes }).into_response(),
    };
    Ok(response)
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let update = json_body(payload)?;

    let status = EpisodeStatus::from(update.status.as_str());
    if status == EpisodeStatus::Unknown {
        return Err(ApiError::bad_request(format!(
            "Unknown episode status '{}'",
            update.status
        )));
    }

    state.catalog.update_status(&id, status).await?;
    info!(episode_id = %id, %status, "Updated episode status");

    Ok(StatusCode::NO_CONTENT)
}
