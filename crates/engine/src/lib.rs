pub use balance::{BalanceSheet, LedgerIssue, MemberBalance, compute_balances, fold_settled};
pub use commands::{NewExpenseCmd, SplitSpec, UpdateExpenseCmd};
pub use error::EngineError;
pub use expense_shares::Share;
pub use expenses::Expense;
pub use groups::Group;
pub use members::Member;
pub use money::{EPSILON_MINOR, MoneyCents};
pub use ops::{Engine, EngineBuilder, ExpenseListPage, GroupSummary, ReconcileOutcome};
pub use planner::{Transfer, plan};
pub use settlements::{Settlement, SettlementStatus};

mod balance;
mod commands;
mod error;
mod expense_shares;
mod expenses;
mod groups;
mod members;
mod money;
mod ops;
mod planner;
mod settlements;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
