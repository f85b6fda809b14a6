//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense create/update),
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, Share};

/// How an expense amount is divided among participants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitSpec {
    /// Split evenly; remainder cents go to the earliest participants.
    Equal { participants: Vec<Uuid> },
    /// Explicit per-participant shares; must sum to the expense amount.
    Custom { shares: Vec<Share> },
}

impl SplitSpec {
    /// Resolves the spec into concrete shares for `amount_minor`.
    pub fn resolve(&self, amount_minor: i64) -> ResultEngine<Vec<Share>> {
        match self {
            Self::Equal { participants } => {
                if participants.is_empty() {
                    return Err(EngineError::InvalidSplit(
                        "equal split needs at least one participant".to_string(),
                    ));
                }
                let pieces = MoneyCents::new(amount_minor).split_even(participants.len());
                Ok(participants
                    .iter()
                    .zip(pieces)
                    .map(|(member_id, piece)| Share::new(*member_id, piece.cents()))
                    .collect())
            }
            Self::Custom { shares } => Ok(shares.clone()),
        }
    }
}

/// Create an expense.
#[derive(Clone, Debug)]
pub struct NewExpenseCmd {
    pub group_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub payer_id: Uuid,
    pub split: SplitSpec,
    pub occurred_at: DateTime<Utc>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl NewExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        name: impl Into<String>,
        amount_minor: i64,
        payer_id: Uuid,
        split: SplitSpec,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            amount_minor,
            payer_id,
            split,
            occurred_at,
            category: None,
            note: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Patch an existing expense. `None` keeps the stored value; text patches use
/// `Some("")` to clear. Changing the amount requires supplying a new split.
#[derive(Clone, Debug, Default)]
pub struct UpdateExpenseCmd {
    pub name: Option<String>,
    pub amount_minor: Option<i64>,
    pub payer_id: Option<Uuid>,
    pub split: Option<SplitSpec>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn payer_id(mut self, payer_id: Uuid) -> Self {
        self.payer_id = Some(payer_id);
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitSpec) -> Self {
        self.split = Some(split);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
