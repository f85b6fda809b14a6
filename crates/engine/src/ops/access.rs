use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, expenses, groups, members, settlements};

use super::Engine;

/// Generates `_exists_in_group` and `require_in_group` methods for a target
/// entity.
macro_rules! impl_target_in_group {
    ($exists_fn:ident, $require_fn:ident, $entity:path, $group_col:expr, $err_msg:literal) => {
        async fn $exists_fn(
            &self,
            db: &DatabaseTransaction,
            group_id: &str,
            target_id: Uuid,
        ) -> ResultEngine<bool> {
            <$entity>::find_by_id(target_id.to_string())
                .filter($group_col.eq(group_id.to_string()))
                .one(db)
                .await
                .map(|model| model.is_some())
                .map_err(Into::into)
        }

        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            group_id: &str,
            target_id: Uuid,
        ) -> ResultEngine<()> {
            if !self.$exists_fn(db, group_id, target_id).await? {
                return Err(EngineError::KeyNotFound($err_msg.to_string()));
            }
            Ok(())
        }
    };
}

impl Engine {
    impl_target_in_group!(
        member_exists_in_group,
        require_member_in_group,
        members::Entity,
        members::Column::GroupId,
        "member not exists"
    );

    impl_target_in_group!(
        expense_exists_in_group,
        require_expense_in_group,
        expenses::Entity,
        expenses::Column::GroupId,
        "expense not exists"
    );

    impl_target_in_group!(
        settlement_exists_in_group,
        require_settlement_in_group,
        settlements::Entity,
        settlements::Column::GroupId,
        "settlement not exists"
    );

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }
}
