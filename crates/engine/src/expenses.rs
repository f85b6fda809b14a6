//! Expense primitives.
//!
//! An `Expense` is an immutable description of one shared cost and how it is
//! split: who paid, and an ordered list of `(participant, share)` pairs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EPSILON_MINOR, EngineError, ResultEngine, Share, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub payer_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub shares: Vec<Share>,
}

impl Expense {
    /// Builds a validated expense.
    ///
    /// Rejected (and thus never persisted) when the amount is not positive or
    /// the shares violate the split invariant; see [`validate_shares`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        group_id: String,
        name: String,
        amount_minor: i64,
        payer_id: Uuid,
        occurred_at: DateTime<Utc>,
        category: Option<String>,
        note: Option<String>,
        shares: Vec<Share>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        validate_shares(amount_minor, &shares)?;

        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            name,
            amount_minor,
            payer_id,
            occurred_at,
            category,
            note,
            shares,
        })
    }
}

/// Enforces the split invariant: shares are non-empty, non-negative, name
/// each participant at most once, and sum to the expense amount within
/// [`EPSILON_MINOR`].
///
/// A violating record is rejected here, at creation/update time; it is never
/// silently corrected during recompute.
pub(crate) fn validate_shares(amount_minor: i64, shares: &[Share]) -> ResultEngine<()> {
    if shares.is_empty() {
        return Err(EngineError::InvalidSplit(
            "expense must have at least one share".to_string(),
        ));
    }

    let mut seen: HashSet<Uuid> = HashSet::with_capacity(shares.len());
    let mut total: i64 = 0;
    for share in shares {
        if share.amount_minor < 0 {
            return Err(EngineError::InvalidSplit(
                "share amounts must be >= 0".to_string(),
            ));
        }
        if !seen.insert(share.member_id) {
            return Err(EngineError::InvalidSplit(format!(
                "duplicate participant {} in split",
                share.member_id
            )));
        }
        total += share.amount_minor;
    }

    if (total - amount_minor).abs() > EPSILON_MINOR {
        return Err(EngineError::InvalidSplit(format!(
            "shares sum to {total} but expense amount is {amount_minor}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub payer_id: String,
    pub occurred_at: DateTimeUtc,
    pub category: Option<String>,
    pub note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Groups,
    #[sea_orm(has_many = "super::expense_shares::Entity")]
    Shares,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            name: ActiveValue::Set(expense.name.clone()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            payer_id: ActiveValue::Set(expense.payer_id.to_string()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            category: ActiveValue::Set(expense.category.clone()),
            note: ActiveValue::Set(expense.note.clone()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            group_id: model.group_id,
            name: model.name,
            amount_minor: model.amount_minor,
            payer_id: parse_uuid(&model.payer_id, "payer")?,
            occurred_at: model.occurred_at,
            category: model.category,
            note: model.note,
            shares: Vec::new(),
        })
    }
}
