use chrono::Utc;
use sea_orm::{QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Group, ResultEngine, groups, util::apply_optional_text_patch};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

/// A group together with a few cheap aggregates for list views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: Group,
    pub member_count: i64,
    pub expense_count: i64,
    pub total_spent_minor: i64,
}

impl Engine {
    /// Add a new group
    pub async fn new_group(&self, name: &str, description: Option<&str>) -> ResultEngine<String> {
        let name = normalize_required_name(name, "group")?;
        let description = normalize_optional_text(description);

        let new_group = Group::new(name.clone(), description, Utc::now());
        let new_group_id = new_group.id.clone();
        let group_entry: groups::ActiveModel = (&new_group).into();
        with_tx!(self, |db_tx| {
            // Enforce unique group names (case-insensitive) to avoid ambiguous
            // name lookups.
            let exists = groups::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            group_entry.insert(&db_tx).await?;
            Ok(new_group_id)
        })
    }

    pub async fn group(&self, group_id: &str) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let model = self.require_group(&db_tx, group_id).await?;
            Ok(model.into())
        })
    }

    /// List every group, newest first, with member/expense aggregates.
    pub async fn groups(&self) -> ResultEngine<Vec<GroupSummary>> {
        with_tx!(self, |db_tx| {
            let models = groups::Entity::find()
                .order_by_desc(groups::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let mut summaries = Vec::with_capacity(models.len());
            for model in models {
                summaries.push(self.summarize(&db_tx, model.into()).await?);
            }
            Ok(summaries)
        })
    }

    /// One group with its aggregates.
    pub async fn group_summary(&self, group_id: &str) -> ResultEngine<GroupSummary> {
        with_tx!(self, |db_tx| {
            let model = self.require_group(&db_tx, group_id).await?;
            self.summarize(&db_tx, model.into()).await
        })
    }

    async fn summarize(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        group: Group,
    ) -> ResultEngine<GroupSummary> {
        let backend = self.database.get_database_backend();

        let member_count: i64 = {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(*) AS sum FROM members WHERE group_id = ?;".to_string(),
                vec![group.id.clone().into()],
            );
            let row = db_tx.query_one(stmt).await?;
            row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0)
        };

        let expense_count: i64 = {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(*) AS sum FROM expenses WHERE group_id = ?;".to_string(),
                vec![group.id.clone().into()],
            );
            let row = db_tx.query_one(stmt).await?;
            row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0)
        };

        let total_spent_minor: i64 = {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                 FROM expenses WHERE group_id = ?;"
                    .to_string(),
                vec![group.id.clone().into()],
            );
            let row = db_tx.query_one(stmt).await?;
            row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0)
        };

        Ok(GroupSummary {
            group,
            member_count,
            expense_count,
            total_spent_minor,
        })
    }

    /// Rename a group or patch its description.
    pub async fn update_group(
        &self,
        group_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let model = self.require_group(&db_tx, group_id).await?;
            let mut group: Group = model.into();

            if let Some(name) = name {
                group.name = normalize_required_name(name, "group")?;
            }
            group.description =
                apply_optional_text_patch(group.description.take(), description);

            let entry: groups::ActiveModel = (&group).into();
            entry.update(&db_tx).await?;
            Ok(group)
        })
    }

    /// Delete a group and everything it owns.
    pub async fn delete_group(&self, group_id: &str) -> ResultEngine<()> {
        let lock = self.group_lock(group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;

            // Explicit cascade within one DB transaction; child tables first.
            let backend = self.database.get_database_backend();
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expense_shares WHERE expense_id IN \
                     (SELECT id FROM expenses WHERE group_id = ?);",
                    vec![group_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expenses WHERE group_id = ?;",
                    vec![group_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM settlements WHERE group_id = ?;",
                    vec![group_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM members WHERE group_id = ?;",
                    vec![group_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM groups WHERE id = ?;",
                    vec![group_id.into()],
                ))
                .await?;
            Ok(())
        })
    }

    /// Wipe every table except users. Intended for tests and explicit resets.
    pub async fn clear_all_data(&self) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let backend = self.database.get_database_backend();
            for table in [
                "expense_shares",
                "expenses",
                "settlements",
                "members",
                "groups",
            ] {
                db_tx
                    .execute(Statement::from_string(
                        backend,
                        format!("DELETE FROM {table};"),
                    ))
                    .await?;
            }
            Ok(())
        })
    }
}
