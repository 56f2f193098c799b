use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State as AxumState,
    },
    http::StatusCode,
    Json,
};
use feelsy_core::{CheckIn, FeelStats, FriendFeel, GoodVibe, HistoryPage, NewCheckIn, ReceivedVibe};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::CurrentUser, error::AppError, state::State};

type AppState = AxumState<Arc<State>>;

#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Deserialize)]
pub struct VibesParams {
    limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct VibeRequest {
    receiver_id: Uuid,
    #[serde(default)]
    message: Option<String>,
    vibe_type: String,
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub async fn create_feel_handler(
    AxumState(state): AppState,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<NewCheckIn>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckIn>), AppError> {
    let Json(input) = payload?;
    let check = state
        .run(move |service| service.create_check_in(user_id, input))
        .await?;

    state.worker_wake.notify_one();
    Ok((StatusCode::CREATED, Json(check)))
}

pub async fn today_handler(
    AxumState(state): AppState,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CheckIn>, AppError> {
    let check = state
        .run(move |service| service.today_check_in(user_id))
        .await?;
    Ok(Json(check))
}

pub async fn history_handler(
    AxumState(state): AppState,
    CurrentUser(user_id): CurrentUser,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryPage>, AppError> {
    let Query(params) = params?;
    let page = state
        .run(move |service| service.feel_history(user_id, params.limit, params.offset))
        .await?;
    Ok(Json(page))
}

pub async fn stats_handler(
    AxumState(state): AppState,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<FeelStats>, AppError> {
    let stats = state
        .run(move |service| service.feel_stats(user_id))
        .await?;
    Ok(Json(stats))
}

pub async fn send_vibe_handler(
    AxumState(state): AppState,
    CurrentUser(sender_id): CurrentUser,
    payload: Result<Json<VibeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GoodVibe>), AppError> {
    let Json(req) = payload?;
    let vibe = state
        .run(move |service| {
            service.send_good_vibe(sender_id, req.receiver_id, req.message, &req.vibe_type)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(vibe)))
}

pub async fn vibes_handler(
    AxumState(state): AppState,
    CurrentUser(user_id): CurrentUser,
    params: Result<Query<VibesParams>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<ReceivedVibe>>>, AppError> {
    let Query(params) = params?;
    let data = state
        .run(move |service| service.received_vibes(user_id, params.limit))
        .await?;
    Ok(Json(DataResponse { data }))
}

pub async fn friends_handler(
    AxumState(state): AppState,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<DataResponse<Vec<FriendFeel>>>, AppError> {
    let data = state
        .run(move |service| service.friend_feels(user_id))
        .await?;
    Ok(Json(DataResponse { data }))
}
