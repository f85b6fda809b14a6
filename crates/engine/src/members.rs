//! Member primitives.
//!
//! A `Member` belongs to one group. The `total_owed_minor` /
//! `total_owing_minor` / `balance_minor` columns are a **derived cache**
//! refreshed on every reconcile; they are never authoritative and never
//! directly editable. `balance_minor > 0` means the member is a net debtor,
//! `< 0` a net creditor.
//!
//! The display name is just that: a display projection. Every association
//! (expense shares, settlements) references members by id.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub group_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_owed_minor: i64,
    pub total_owing_minor: i64,
    pub balance_minor: i64,
}

impl Member {
    pub fn new(
        group_id: String,
        name: String,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            name,
            email,
            phone,
            total_owed_minor: 0,
            total_owing_minor: 0,
            balance_minor: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_owed_minor: i64,
    pub total_owing_minor: i64,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Member> for ActiveModel {
    fn from(member: &Member) -> Self {
        Self {
            id: ActiveValue::Set(member.id.to_string()),
            group_id: ActiveValue::Set(member.group_id.clone()),
            name: ActiveValue::Set(member.name.clone()),
            email: ActiveValue::Set(member.email.clone()),
            phone: ActiveValue::Set(member.phone.clone()),
            total_owed_minor: ActiveValue::Set(member.total_owed_minor),
            total_owing_minor: ActiveValue::Set(member.total_owing_minor),
            balance_minor: ActiveValue::Set(member.balance_minor),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "member")?,
            group_id: model.group_id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            total_owed_minor: model.total_owed_minor,
            total_owing_minor: model.total_owing_minor,
            balance_minor: model.balance_minor,
        })
    }
}
