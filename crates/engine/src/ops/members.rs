use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, Member, ResultEngine, members, util::apply_optional_text_patch};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

impl Engine {
    /// Add a member to a group. Names are unique within a group
    /// (case-insensitive); balances start at zero.
    pub async fn new_member(
        &self,
        group_id: &str,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "member")?;
        let email = normalize_optional_text(email);
        let phone = normalize_optional_text(phone);

        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;

            let exists = members::Entity::find()
                .filter(members::Column::GroupId.eq(group_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let member = Member::new(group_id.to_string(), name, email, phone);
            let member_id = member.id;
            let entry: members::ActiveModel = (&member).into();
            entry.insert(&db_tx).await?;
            Ok(member_id)
        })
    }

    /// List a group's members by name, with their cached balance columns as
    /// of the last reconcile.
    pub async fn members(&self, group_id: &str) -> ResultEngine<Vec<Member>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let models = members::Entity::find()
                .filter(members::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(members::Column::Name)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Member::try_from).collect()
        })
    }

    pub async fn update_member(
        &self,
        group_id: &str,
        member_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| {
            self.require_member_in_group(&db_tx, group_id, member_id)
                .await?;
            let model = members::Entity::find_by_id(member_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
            let mut member = Member::try_from(model)?;

            if let Some(name) = name {
                let name = normalize_required_name(name, "member")?;
                let taken = members::Entity::find()
                    .filter(members::Column::GroupId.eq(group_id.to_string()))
                    .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                    .filter(members::Column::Id.ne(member_id.to_string()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::ExistingKey(name));
                }
                member.name = name;
            }
            member.email = apply_optional_text_patch(member.email.take(), email);
            member.phone = apply_optional_text_patch(member.phone.take(), phone);

            let entry: members::ActiveModel = (&member).into();
            entry.update(&db_tx).await?;
            Ok(member)
        })
    }

    /// Remove a member. Expenses that reference the member stay in the log;
    /// the follow-up reconcile reports them as integrity issues and skips
    /// their contributions.
    pub async fn remove_member(&self, group_id: &str, member_id: Uuid) -> ResultEngine<()> {
        let lock = self.group_lock(group_id).await;
        let _guard = lock.lock().await;

        with_tx!(self, |db_tx| {
            self.require_member_in_group(&db_tx, group_id, member_id)
                .await?;
            members::Entity::delete_by_id(member_id.to_string())
                .exec(&db_tx)
                .await?;
            self.reconcile_in_tx(&db_tx, group_id).await?;
            Ok(())
        })
    }
}
