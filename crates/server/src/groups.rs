//! Group API endpoints

use api_types::group::{GroupCreated, GroupNew, GroupUpdate, GroupView, GroupsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use crate::{ServerError, server::ServerState, user};

fn view(summary: engine::GroupSummary) -> GroupView {
    GroupView {
        id: summary.group.id,
        name: summary.group.name,
        description: summary.group.description,
        created_at: summary.group.created_at.fixed_offset(),
        member_count: summary.member_count,
        expense_count: summary.expense_count,
        total_spent_minor: summary.total_spent_minor,
    }
}

/// Handle requests for creating a new group
pub async fn create(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<Json<GroupCreated>, ServerError> {
    let id = state
        .engine
        .new_group(&payload.name, payload.description.as_deref())
        .await?;
    Ok(Json(GroupCreated { id }))
}

/// Handle requests for listing groups with their aggregates
pub async fn list(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GroupsResponse>, ServerError> {
    let summaries = state.engine.groups().await?;
    Ok(Json(GroupsResponse {
        groups: summaries.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupView>, ServerError> {
    let summary = state.engine.group_summary(&group_id).await?;
    Ok(Json(view(summary)))
}

pub async fn update(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<GroupUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_group(
            &group_id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(&group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
