//! Member API endpoints

use api_types::member::{MemberCreated, MemberNew, MemberUpdate, MemberView, MembersResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn view(member: engine::Member) -> MemberView {
    MemberView {
        id: member.id,
        name: member.name,
        email: member.email,
        phone: member.phone,
        total_owed_minor: member.total_owed_minor,
        total_owing_minor: member.total_owing_minor,
        balance_minor: member.balance_minor,
    }
}

pub async fn create(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<MemberNew>,
) -> Result<Json<MemberCreated>, ServerError> {
    let id = state
        .engine
        .new_member(
            &group_id,
            &payload.name,
            payload.email.as_deref(),
            payload.phone.as_deref(),
        )
        .await?;
    Ok(Json(MemberCreated { id }))
}

pub async fn list(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<MembersResponse>, ServerError> {
    let members = state.engine.members(&group_id).await?;
    Ok(Json(MembersResponse {
        members: members.into_iter().map(view).collect(),
    }))
}

pub async fn update(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, member_id)): Path<(String, Uuid)>,
    Json(payload): Json<MemberUpdate>,
) -> Result<Json<MemberView>, ServerError> {
    let member = state
        .engine
        .update_member(
            &group_id,
            member_id,
            payload.name.as_deref(),
            payload.email.as_deref(),
            payload.phone.as_deref(),
        )
        .await?;
    Ok(Json(view(member)))
}

pub async fn remove(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, member_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state.engine.remove_member(&group_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
