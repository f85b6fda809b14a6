use std::collections::{HashMap, HashSet};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Expense, NewExpenseCmd, ResultEngine, Share, UpdateExpenseCmd, expense_shares,
    expenses, util::apply_optional_text_patch,
};

use super::{Engine, normalize_required_name, with_tx};

/// One page of a group's expense log, newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseListPage {
    pub items: Vec<Expense>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExpensesCursor {
    occurred_at: DateTime<Utc>,
    expense_id: String,
}

impl ExpensesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))
    }
}

impl Engine {
    /// Record a shared expense and reconcile the group in the same
    /// transaction.
    pub async fn new_expense(&self, cmd: NewExpenseCmd) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "expense")?;

        let lock = self.group_lock(&cmd.group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &cmd.group_id).await?;
            let shares = cmd.split.resolve(cmd.amount_minor)?;
            self.require_split_members(&db_tx, &cmd.group_id, cmd.payer_id, &shares)
                .await?;

            let expense = Expense::new(
                cmd.group_id.clone(),
                name,
                cmd.amount_minor,
                cmd.payer_id,
                cmd.occurred_at,
                cmd.category.clone(),
                cmd.note.clone(),
                shares,
            )?;
            let expense_id = expense.id;

            let entry: expenses::ActiveModel = (&expense).into();
            entry.insert(&db_tx).await?;
            self.insert_shares(&db_tx, &expense).await?;

            self.reconcile_in_tx(&db_tx, &cmd.group_id).await?;
            Ok(expense_id)
        })
    }

    /// Patch an expense. Changing the amount requires a new split, so the
    /// share-sum invariant can never be broken by a partial edit.
    pub async fn update_expense(
        &self,
        group_id: &str,
        expense_id: Uuid,
        cmd: UpdateExpenseCmd,
    ) -> ResultEngine<Expense> {
        let lock = self.group_lock(group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| {
            self.require_expense_in_group(&db_tx, group_id, expense_id)
                .await?;
            let mut expense = self.load_expense(&db_tx, expense_id).await?;

            if cmd.amount_minor.is_some() && cmd.split.is_none() {
                return Err(EngineError::InvalidSplit(
                    "changing the amount requires a new split".to_string(),
                ));
            }

            if let Some(name) = &cmd.name {
                expense.name = normalize_required_name(name, "expense")?;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                if amount_minor <= 0 {
                    return Err(EngineError::Validation(
                        "amount_minor must be > 0".to_string(),
                    ));
                }
                expense.amount_minor = amount_minor;
            }
            if let Some(payer_id) = cmd.payer_id {
                expense.payer_id = payer_id;
            }
            if let Some(occurred_at) = cmd.occurred_at {
                expense.occurred_at = occurred_at;
            }
            expense.category =
                apply_optional_text_patch(expense.category.take(), cmd.category.as_deref());
            expense.note = apply_optional_text_patch(expense.note.take(), cmd.note.as_deref());

            let shares_changed = if let Some(split) = &cmd.split {
                expense.shares = split.resolve(expense.amount_minor)?;
                true
            } else {
                false
            };
            expenses::validate_shares(expense.amount_minor, &expense.shares)?;
            self.require_split_members(&db_tx, group_id, expense.payer_id, &expense.shares)
                .await?;

            let entry: expenses::ActiveModel = (&expense).into();
            entry.update(&db_tx).await?;
            if shares_changed {
                expense_shares::Entity::delete_many()
                    .filter(expense_shares::Column::ExpenseId.eq(expense_id.to_string()))
                    .exec(&db_tx)
                    .await?;
                self.insert_shares(&db_tx, &expense).await?;
            }

            self.reconcile_in_tx(&db_tx, group_id).await?;
            Ok(expense)
        })
    }

    /// Delete an expense and reconcile.
    pub async fn delete_expense(&self, group_id: &str, expense_id: Uuid) -> ResultEngine<()> {
        let lock = self.group_lock(group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| {
            self.require_expense_in_group(&db_tx, group_id, expense_id)
                .await?;
            expense_shares::Entity::delete_many()
                .filter(expense_shares::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            self.reconcile_in_tx(&db_tx, group_id).await?;
            Ok(())
        })
    }

    pub async fn expense(&self, group_id: &str, expense_id: Uuid) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            self.require_expense_in_group(&db_tx, group_id, expense_id)
                .await?;
            self.load_expense(&db_tx, expense_id).await
        })
    }

    /// Lists a group's expenses with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, expense_id DESC)`.
    pub async fn expenses_page(
        &self,
        group_id: &str,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<ExpenseListPage> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(expenses::Column::OccurredAt)
                .order_by_desc(expenses::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = ExpensesCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(expenses::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(expenses::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(expenses::Column::Id.lt(cursor.expense_id)),
                        ),
                );
            }

            let rows: Vec<expenses::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut items: Vec<Expense> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                items.push(Expense::try_from(model)?);
            }
            self.attach_shares(&db_tx, &mut items).await?;

            let next_cursor = items.last().map(|expense| ExpensesCursor {
                occurred_at: expense.occurred_at,
                expense_id: expense.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok(ExpenseListPage { items, next_cursor })
        })
    }

    /// Full expense log for one group, shares attached, oldest first.
    pub(super) async fn load_expenses(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::Id)
            .all(db_tx)
            .await?;
        let mut out: Vec<Expense> = models
            .into_iter()
            .map(Expense::try_from)
            .collect::<ResultEngine<_>>()?;
        self.attach_shares(db_tx, &mut out).await?;
        Ok(out)
    }

    async fn load_expense(
        &self,
        db_tx: &DatabaseTransaction,
        expense_id: Uuid,
    ) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        let mut out = vec![Expense::try_from(model)?];
        self.attach_shares(db_tx, &mut out).await?;
        out.pop()
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    async fn attach_shares(
        &self,
        db_tx: &DatabaseTransaction,
        expenses_out: &mut [Expense],
    ) -> ResultEngine<()> {
        if expenses_out.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = expenses_out.iter().map(|e| e.id.to_string()).collect();
        let share_models = expense_shares::Entity::find()
            .filter(expense_shares::Column::ExpenseId.is_in(ids))
            .order_by_asc(expense_shares::Column::ExpenseId)
            .order_by_asc(expense_shares::Column::Position)
            .all(db_tx)
            .await?;

        let mut by_expense: HashMap<String, Vec<Share>> = HashMap::new();
        for model in share_models {
            let expense_id = model.expense_id.clone();
            by_expense
                .entry(expense_id)
                .or_default()
                .push(Share::try_from(model)?);
        }
        for expense in expenses_out {
            expense.shares = by_expense
                .remove(&expense.id.to_string())
                .unwrap_or_default();
        }
        Ok(())
    }

    async fn insert_shares(
        &self,
        db_tx: &DatabaseTransaction,
        expense: &Expense,
    ) -> ResultEngine<()> {
        for (position, share) in expense.shares.iter().enumerate() {
            let entry = share.to_active_model(expense.id, position as i32);
            entry.insert(db_tx).await?;
        }
        Ok(())
    }

    /// Ensure the payer and every split participant belong to the group.
    async fn require_split_members(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        payer_id: Uuid,
        shares: &[Share],
    ) -> ResultEngine<()> {
        let members = self.load_members(db_tx, group_id).await?;
        let known: HashSet<Uuid> = members.iter().map(|m| m.id).collect();
        if !known.contains(&payer_id) {
            return Err(EngineError::KeyNotFound("member not exists".to_string()));
        }
        for share in shares {
            if !known.contains(&share.member_id) {
                return Err(EngineError::KeyNotFound("member not exists".to_string()));
            }
        }
        Ok(())
    }
}
