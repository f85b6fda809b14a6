//! Expense share rows.
//!
//! One row per `(expense, participant)`: the portion of the expense amount
//! attributed to that participant, stored as a typed ordered list instead of
//! delimiter-joined strings. `position` preserves the original share order
//! (equal splits assign remainder cents by position).

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// The portion of an expense attributed to one participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub member_id: Uuid,
    pub amount_minor: i64,
}

impl Share {
    pub fn new(member_id: Uuid, amount_minor: i64) -> Self {
        Self {
            member_id,
            amount_minor,
        }
    }

    pub(crate) fn to_active_model(self, expense_id: Uuid, position: i32) -> ActiveModel {
        ActiveModel {
            expense_id: ActiveValue::Set(expense_id.to_string()),
            position: ActiveValue::Set(position),
            member_id: ActiveValue::Set(self.member_id.to_string()),
            amount_minor: ActiveValue::Set(self.amount_minor),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub position: i32,
    pub member_id: String,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Share {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            member_id: parse_uuid(&model.member_id, "share member")?,
            amount_minor: model.amount_minor,
        })
    }
}
