use chrono::Utc;
use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Settlement, SettlementStatus, settlements};

use super::{Engine, ReconcileOutcome, with_tx};

impl Engine {
    /// Current settlement list for a group: settled history first, then the
    /// pending set regenerated against the current expense log.
    ///
    /// Reads reconcile first, so a stale pending set (e.g. after a crash
    /// between write and reconcile) can never be served.
    pub async fn settlements(&self, group_id: &str) -> ResultEngine<Vec<Settlement>> {
        let outcome = self.reconcile(group_id).await?;
        Ok(outcome.settlements)
    }

    /// Mark a pending settlement as paid.
    ///
    /// Settling twice is a `Conflict`, surfaced to the caller instead of
    /// silently overwritten. The status flip and the follow-up reconcile
    /// commit in one transaction under the group lock, so it can never
    /// interleave with a concurrent reconcile.
    pub async fn mark_settled(
        &self,
        group_id: &str,
        settlement_id: Uuid,
    ) -> ResultEngine<ReconcileOutcome> {
        let lock = self.group_lock(group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| {
            self.require_settlement_in_group(&db_tx, group_id, settlement_id)
                .await?;
            let model = settlements::Entity::find_by_id(settlement_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
            let mut settlement = Settlement::try_from(model)?;

            if settlement.status == SettlementStatus::Settled {
                return Err(EngineError::Conflict(
                    "settlement already settled".to_string(),
                ));
            }
            settlement.status = SettlementStatus::Settled;
            settlement.settled_at = Some(Utc::now());

            let entry: settlements::ActiveModel = (&settlement).into();
            entry.update(&db_tx).await?;

            // Balances are always derived; settling only appends to history
            // and lets the reconcile fold it in.
            self.reconcile_in_tx(&db_tx, group_id).await
        })
    }
}
