use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    LedgerIssue, Member, MemberBalance, ResultEngine, Settlement, SettlementStatus, balance,
    members, planner, settlements,
};

use super::{Engine, with_tx};

/// Everything a reconcile produced: fresh balances, the full settlement list
/// (settled history first, then the regenerated pending set), and any line
/// items the recompute had to skip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub balances: Vec<MemberBalance>,
    pub settlements: Vec<Settlement>,
    pub issues: Vec<LedgerIssue>,
}

impl Engine {
    /// Recompute balances from the full expense log and regenerate the
    /// pending settlement set.
    ///
    /// Serialized per group: concurrent reconciles for the same group queue
    /// behind one lock, so the read-then-replace of the pending set cannot
    /// race. Different groups reconcile independently.
    pub async fn reconcile(&self, group_id: &str) -> ResultEngine<ReconcileOutcome> {
        let lock = self.group_lock(group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| self.reconcile_in_tx(&db_tx, group_id).await)
    }

    /// Cached balance snapshot from the member rows, as of the last
    /// reconcile. Cheap read; call [`Engine::reconcile`] for fresh numbers.
    pub async fn balances(&self, group_id: &str) -> ResultEngine<Vec<MemberBalance>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let models = members::Entity::find()
                .filter(members::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(members::Column::Name)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(|model| {
                    let member = Member::try_from(model)?;
                    Ok(MemberBalance {
                        member_id: member.id,
                        owed_minor: member.total_owed_minor,
                        owing_minor: member.total_owing_minor,
                    })
                })
                .collect()
        })
    }

    /// The reconcile body, reused by every ledger-affecting write so the
    /// cache refresh and pending replacement commit atomically with the
    /// triggering change.
    ///
    /// Steps: full recompute from expenses, fold settled history in as
    /// realized payments, drop the old pending set, plan a fresh one from the
    /// net balances, refresh the member cache columns.
    pub(super) async fn reconcile_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<ReconcileOutcome> {
        self.require_group(db_tx, group_id).await?;

        let group_members = self.load_members(db_tx, group_id).await?;
        let expenses = self.load_expenses(db_tx, group_id).await?;
        let mut sheet = balance::compute_balances(&group_members, &expenses);

        let history = self.load_settlements(db_tx, group_id).await?;
        let (settled, mut reusable): (Vec<Settlement>, Vec<Settlement>) = history
            .into_iter()
            .partition(|s| s.status == SettlementStatus::Settled);
        balance::fold_settled(&mut sheet, &settled);

        // The pending set is derived: keep rows whose (from, to, amount)
        // still matches the plan so their ids stay stable across reads,
        // drop the rest, insert what is new. Settled rows are never touched.
        let now = Utc::now();
        let mut pending = Vec::new();
        for transfer in planner::plan(&sheet.balances) {
            let matched = reusable.iter().position(|s| {
                s.from_member_id == transfer.from_member_id
                    && s.to_member_id == transfer.to_member_id
                    && s.amount_minor == transfer.amount_minor
            });
            let settlement = match matched {
                Some(idx) => reusable.swap_remove(idx),
                None => {
                    let settlement = Settlement::new_pending(
                        group_id.to_string(),
                        transfer.from_member_id,
                        transfer.to_member_id,
                        transfer.amount_minor,
                        now,
                    );
                    let entry: settlements::ActiveModel = (&settlement).into();
                    entry.insert(db_tx).await?;
                    settlement
                }
            };
            pending.push(settlement);
        }
        for stale in reusable {
            settlements::Entity::delete_by_id(stale.id.to_string())
                .exec(db_tx)
                .await?;
        }

        for snapshot in &sheet.balances {
            let entry = members::ActiveModel {
                id: ActiveValue::Set(snapshot.member_id.to_string()),
                total_owed_minor: ActiveValue::Set(snapshot.owed_minor),
                total_owing_minor: ActiveValue::Set(snapshot.owing_minor),
                balance_minor: ActiveValue::Set(snapshot.balance_minor()),
                ..Default::default()
            };
            entry.update(db_tx).await?;
        }

        if !sheet.issues.is_empty() {
            warn!(
                group_id,
                skipped = sheet.issues.len(),
                "reconcile skipped line items"
            );
        }

        let mut all = settled;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all.extend(pending);

        Ok(ReconcileOutcome {
            balances: sheet.balances,
            settlements: all,
            issues: sheet.issues,
        })
    }

    pub(super) async fn load_members(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<Member>> {
        let models = members::Entity::find()
            .filter(members::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(members::Column::Name)
            .all(db_tx)
            .await?;
        models.into_iter().map(Member::try_from).collect()
    }

    pub(super) async fn load_settlements(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<Settlement>> {
        let models = settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(settlements::Column::CreatedAt)
            .all(db_tx)
            .await?;
        models.into_iter().map(Settlement::try_from).collect()
    }
}
