//! Expense API endpoints

use api_types::expense::{
    ExpenseCreated, ExpenseList, ExpenseListResponse, ExpenseNew, ExpenseUpdate, ExpenseView,
    ShareView, Split,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_split(split: Split) -> engine::SplitSpec {
    match split {
        Split::Equal { participants } => engine::SplitSpec::Equal { participants },
        Split::Custom { shares } => engine::SplitSpec::Custom {
            shares: shares
                .into_iter()
                .map(|s| engine::Share::new(s.member_id, s.amount_minor))
                .collect(),
        },
    }
}

fn view(expense: engine::Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        name: expense.name,
        amount_minor: expense.amount_minor,
        payer_id: expense.payer_id,
        occurred_at: expense.occurred_at.fixed_offset(),
        category: expense.category,
        note: expense.note,
        shares: expense
            .shares
            .into_iter()
            .map(|s| ShareView {
                member_id: s.member_id,
                amount_minor: s.amount_minor,
            })
            .collect(),
    }
}

pub async fn create(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseCreated>, ServerError> {
    let mut cmd = engine::NewExpenseCmd::new(
        group_id,
        payload.name,
        payload.amount_minor,
        payload.payer_id,
        map_split(payload.split),
        payload.occurred_at.with_timezone(&Utc),
    );
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }

    let id = state.engine.new_expense(cmd).await?;
    Ok(Json(ExpenseCreated { id }))
}

pub async fn list(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Query(payload): Query<ExpenseList>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(50);
    let page = state
        .engine
        .expenses_page(&group_id, limit, payload.cursor.as_deref())
        .await?;

    Ok(Json(ExpenseListResponse {
        expenses: page.items.into_iter().map(view).collect(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn get(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, expense_id)): Path<(String, Uuid)>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(&group_id, expense_id).await?;
    Ok(Json(view(expense)))
}

pub async fn update(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, expense_id)): Path<(String, Uuid)>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    let mut cmd = engine::UpdateExpenseCmd::new();
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(amount_minor) = payload.amount_minor {
        cmd = cmd.amount_minor(amount_minor);
    }
    if let Some(payer_id) = payload.payer_id {
        cmd = cmd.payer_id(payer_id);
    }
    if let Some(split) = payload.split {
        cmd = cmd.split(map_split(split));
    }
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }
    if let Some(occurred_at) = payload.occurred_at {
        cmd = cmd.occurred_at(occurred_at.with_timezone(&Utc));
    }

    let expense = state.engine.update_expense(&group_id, expense_id, cmd).await?;
    Ok(Json(view(expense)))
}

pub async fn remove(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, expense_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(&group_id, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
