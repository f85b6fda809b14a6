use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub name: Option<String>,
        /// `""` clears the description; absent keeps it.
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: String,
        pub name: String,
        pub description: Option<String>,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
        pub member_count: i64,
        pub expense_count: i64,
        pub total_spent_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupsResponse {
        pub groups: Vec<GroupView>,
    }
}

pub mod member {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberUpdate {
        pub name: Option<String>,
        /// `""` clears the field; absent keeps it.
        pub email: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberCreated {
        pub id: Uuid,
    }

    /// A member with the balance cache as of the last reconcile.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: Uuid,
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub total_owed_minor: i64,
        pub total_owing_minor: i64,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }
}

pub mod expense {
    use super::*;

    /// How to divide an expense among participants.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case", tag = "mode")]
    pub enum Split {
        /// Even split; remainder cents go to the earliest participants.
        Equal { participants: Vec<Uuid> },
        /// Explicit shares; must sum to the expense amount.
        Custom { shares: Vec<ShareView> },
    }

    #[derive(Clone, Copy, Debug, Serialize, Deserialize)]
    pub struct ShareView {
        pub member_id: Uuid,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub name: String,
        /// Must be > 0, in minor units (cents).
        pub amount_minor: i64,
        pub payer_id: Uuid,
        pub split: Split,
        pub category: Option<String>,
        pub note: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    /// Absent fields keep their stored value. Changing `amount_minor`
    /// requires a new `split`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub name: Option<String>,
        pub amount_minor: Option<i64>,
        pub payer_id: Option<Uuid>,
        pub split: Option<Split>,
        pub category: Option<String>,
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub payer_id: Uuid,
        /// RFC3339 timestamp, including timezone offset.
        pub occurred_at: DateTime<FixedOffset>,
        pub category: Option<String>,
        pub note: Option<String>,
        pub shares: Vec<ShareView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseList {
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub member_id: Uuid,
        pub total_owed_minor: i64,
        pub total_owing_minor: i64,
        /// `total_owed_minor - total_owing_minor`; positive means the member
        /// still owes the group.
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<BalanceView>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementStatus {
        Pending,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub id: Uuid,
        pub from_member_id: Uuid,
        pub to_member_id: Uuid,
        pub amount_minor: i64,
        pub status: SettlementStatus,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
        pub settled_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementsResponse {
        pub settlements: Vec<SettlementView>,
    }

    /// A line item the recompute skipped, mirrored for diagnostics.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case", tag = "kind")]
    pub enum IssueView {
        EmptyExpense {
            expense_id: Uuid,
        },
        UnknownPayer {
            expense_id: Uuid,
            payer_id: Uuid,
        },
        UnknownParticipant {
            expense_id: Uuid,
            member_id: Uuid,
        },
        UnknownSettlementMember {
            settlement_id: Uuid,
            member_id: Uuid,
        },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileResponse {
        pub balances: Vec<super::balance::BalanceView>,
        pub settlements: Vec<SettlementView>,
        /// Skipped line items; non-empty means the totals exclude the listed
        /// contributions.
        pub issues: Vec<IssueView>,
    }
}
