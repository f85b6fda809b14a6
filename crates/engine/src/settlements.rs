//! Settlement primitives.
//!
//! A `Settlement` is a suggested repayment between two members. Pending rows
//! are owned by the reconcile pass and may be replaced wholesale; settled rows
//! are permanent history.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Settled,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
        }
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "settled" => Ok(Self::Settled),
            other => Err(EngineError::Validation(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: String,
    pub from_member_id: Uuid,
    pub to_member_id: Uuid,
    pub amount_minor: i64,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Settlement {
    pub fn new_pending(
        group_id: String,
        from_member_id: Uuid,
        to_member_id: Uuid,
        amount_minor: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            from_member_id,
            to_member_id,
            amount_minor,
            status: SettlementStatus::Pending,
            created_at,
            settled_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_member_id: String,
    pub to_member_id: String,
    pub amount_minor: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub settled_at: Option<DateTimeUtc>,
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

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            group_id: ActiveValue::Set(settlement.group_id.clone()),
            from_member_id: ActiveValue::Set(settlement.from_member_id.to_string()),
            to_member_id: ActiveValue::Set(settlement.to_member_id.to_string()),
            amount_minor: ActiveValue::Set(settlement.amount_minor),
            status: ActiveValue::Set(settlement.status.as_str().to_string()),
            created_at: ActiveValue::Set(settlement.created_at),
            settled_at: ActiveValue::Set(settlement.settled_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            group_id: model.group_id,
            from_member_id: parse_uuid(&model.from_member_id, "member")?,
            to_member_id: parse_uuid(&model.to_member_id, "member")?,
            amount_minor: model.amount_minor,
            status: SettlementStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            settled_at: model.settled_at,
        })
    }
}
