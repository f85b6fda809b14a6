//! Balance and settlement API endpoints

use api_types::balance::{BalanceView, BalancesResponse};
use api_types::settlement::{
    IssueView, ReconcileResponse, SettlementStatus, SettlementView, SettlementsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn balance_view(balance: engine::MemberBalance) -> BalanceView {
    BalanceView {
        member_id: balance.member_id,
        total_owed_minor: balance.owed_minor,
        total_owing_minor: balance.owing_minor,
        balance_minor: balance.balance_minor(),
    }
}

fn settlement_view(settlement: engine::Settlement) -> SettlementView {
    SettlementView {
        id: settlement.id,
        from_member_id: settlement.from_member_id,
        to_member_id: settlement.to_member_id,
        amount_minor: settlement.amount_minor,
        status: match settlement.status {
            engine::SettlementStatus::Pending => SettlementStatus::Pending,
            engine::SettlementStatus::Settled => SettlementStatus::Settled,
        },
        created_at: settlement.created_at.fixed_offset(),
        settled_at: settlement.settled_at.map(|dt| dt.fixed_offset()),
    }
}

fn issue_view(issue: engine::LedgerIssue) -> IssueView {
    match issue {
        engine::LedgerIssue::EmptyExpense { expense_id } => IssueView::EmptyExpense { expense_id },
        engine::LedgerIssue::UnknownPayer {
            expense_id,
            payer_id,
        } => IssueView::UnknownPayer {
            expense_id,
            payer_id,
        },
        engine::LedgerIssue::UnknownParticipant {
            expense_id,
            member_id,
        } => IssueView::UnknownParticipant {
            expense_id,
            member_id,
        },
        engine::LedgerIssue::UnknownSettlementMember {
            settlement_id,
            member_id,
        } => IssueView::UnknownSettlementMember {
            settlement_id,
            member_id,
        },
    }
}

fn reconcile_response(outcome: engine::ReconcileOutcome) -> ReconcileResponse {
    ReconcileResponse {
        balances: outcome.balances.into_iter().map(balance_view).collect(),
        settlements: outcome
            .settlements
            .into_iter()
            .map(settlement_view)
            .collect(),
        issues: outcome.issues.into_iter().map(issue_view).collect(),
    }
}

/// Cached balances as of the last reconcile.
pub async fn balances(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state.engine.balances(&group_id).await?;
    Ok(Json(BalancesResponse {
        balances: balances.into_iter().map(balance_view).collect(),
    }))
}

/// Settlement list, reconciled against the current expense log.
pub async fn list(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<SettlementsResponse>, ServerError> {
    let settlements = state.engine.settlements(&group_id).await?;
    Ok(Json(SettlementsResponse {
        settlements: settlements.into_iter().map(settlement_view).collect(),
    }))
}

/// Explicit full recompute.
pub async fn reconcile(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    let outcome = state.engine.reconcile(&group_id).await?;
    Ok(Json(reconcile_response(outcome)))
}

/// Mark a pending settlement as paid.
pub async fn settle(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, settlement_id)): Path<(String, Uuid)>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    let outcome = state.engine.mark_settled(&group_id, settlement_id).await?;
    Ok(Json(reconcile_response(outcome)))
}
