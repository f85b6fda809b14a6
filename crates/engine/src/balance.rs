//! Pure balance computation.
//!
//! Balances are always a full recompute over the expense log; nothing here is
//! incremental and nothing here touches the database. Sign convention follows
//! the member cache columns: `owed_minor` is what the member must pay,
//! `owing_minor` is what the member should get back, and
//! `balance = owed - owing`, so a positive balance marks a net debtor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Expense, Member, Settlement, SettlementStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: Uuid,
    pub owed_minor: i64,
    pub owing_minor: i64,
}

impl MemberBalance {
    fn zero(member_id: Uuid) -> Self {
        Self {
            member_id,
            owed_minor: 0,
            owing_minor: 0,
        }
    }

    pub fn balance_minor(&self) -> i64 {
        self.owed_minor - self.owing_minor
    }
}

/// A line item the recompute had to skip. Issues are reported, never fatal:
/// the sheet stays accurate for everything that was processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LedgerIssue {
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

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// One entry per group member, in the order the members were given.
    pub balances: Vec<MemberBalance>,
    pub issues: Vec<LedgerIssue>,
}

impl BalanceSheet {
    fn index_of(&self, member_id: Uuid) -> Option<usize> {
        self.balances.iter().position(|b| b.member_id == member_id)
    }
}

/// Computes the balance sheet for one group from scratch.
///
/// For each expense, every participant other than the payer accrues
/// `owed += share`, and the payer accrues `owing += processed - own_share`
/// where `processed` sums the shares that named a known member. Shares naming
/// an unknown member are skipped (with an issue) on both sides of that
/// equation, which keeps the processed ledger zero-sum even when the member
/// list and the expense log disagree.
pub fn compute_balances(members: &[Member], expenses: &[Expense]) -> BalanceSheet {
    let mut sheet = BalanceSheet {
        balances: members.iter().map(|m| MemberBalance::zero(m.id)).collect(),
        issues: Vec::new(),
    };

    for expense in expenses {
        if expense.shares.is_empty() {
            sheet.issues.push(LedgerIssue::EmptyExpense {
                expense_id: expense.id,
            });
            continue;
        }
        let Some(payer_idx) = sheet.index_of(expense.payer_id) else {
            sheet.issues.push(LedgerIssue::UnknownPayer {
                expense_id: expense.id,
                payer_id: expense.payer_id,
            });
            continue;
        };

        let mut processed: i64 = 0;
        let mut payer_share: i64 = 0;
        for share in &expense.shares {
            if share.member_id == expense.payer_id {
                processed += share.amount_minor;
                payer_share += share.amount_minor;
                continue;
            }
            match sheet.index_of(share.member_id) {
                Some(idx) => {
                    sheet.balances[idx].owed_minor += share.amount_minor;
                    processed += share.amount_minor;
                }
                None => sheet.issues.push(LedgerIssue::UnknownParticipant {
                    expense_id: expense.id,
                    member_id: share.member_id,
                }),
            }
        }

        sheet.balances[payer_idx].owing_minor += processed - payer_share;
    }

    sheet
}

/// Folds settled history into the sheet as realized payments: the debtor's
/// `owed` and the creditor's `owing` each drop by the settled amount. A
/// settlement naming a member no longer in the group is skipped whole, so a
/// half-applied payment can never skew the sum.
pub fn fold_settled(sheet: &mut BalanceSheet, settlements: &[Settlement]) {
    for settlement in settlements {
        if settlement.status != SettlementStatus::Settled {
            continue;
        }
        let from_idx = sheet.index_of(settlement.from_member_id);
        let to_idx = sheet.index_of(settlement.to_member_id);
        if from_idx.is_none() {
            sheet.issues.push(LedgerIssue::UnknownSettlementMember {
                settlement_id: settlement.id,
                member_id: settlement.from_member_id,
            });
        }
        if to_idx.is_none() {
            sheet.issues.push(LedgerIssue::UnknownSettlementMember {
                settlement_id: settlement.id,
                member_id: settlement.to_member_id,
            });
        }
        let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
            continue;
        };
        sheet.balances[from_idx].owed_minor -= settlement.amount_minor;
        sheet.balances[to_idx].owing_minor -= settlement.amount_minor;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::Share;

    fn member(name: &str) -> Member {
        Member::new("g".to_string(), name.to_string(), None, None)
    }

    fn expense(payer: Uuid, amount: i64, shares: Vec<Share>) -> Expense {
        Expense::new(
            "g".to_string(),
            "dinner".to_string(),
            amount,
            payer,
            Utc::now(),
            None,
            None,
            shares,
        )
        .unwrap()
    }

    fn settled(from: Uuid, to: Uuid, amount: i64) -> Settlement {
        let mut s = Settlement::new_pending("g".to_string(), from, to, amount, Utc::now());
        s.status = SettlementStatus::Settled;
        s.settled_at = Some(Utc::now());
        s
    }

    #[test]
    fn equal_split_with_payer_participating() {
        let (a, b, c) = (member("a"), member("b"), member("c"));
        let e = expense(
            a.id,
            9000,
            vec![
                Share::new(a.id, 3000),
                Share::new(b.id, 3000),
                Share::new(c.id, 3000),
            ],
        );
        let sheet = compute_balances(&[a.clone(), b.clone(), c.clone()], &[e]);

        assert!(sheet.issues.is_empty());
        let get = |id| {
            sheet
                .balances
                .iter()
                .find(|m| m.member_id == id)
                .copied()
                .unwrap()
        };
        assert_eq!(get(a.id).owing_minor, 6000);
        assert_eq!(get(a.id).balance_minor(), -6000);
        assert_eq!(get(b.id).owed_minor, 3000);
        assert_eq!(get(b.id).balance_minor(), 3000);
        assert_eq!(get(c.id).balance_minor(), 3000);
        assert_eq!(
            sheet.balances.iter().map(|m| m.balance_minor()).sum::<i64>(),
            0
        );
    }

    #[test]
    fn payer_outside_split_is_owed_everything() {
        let (a, b) = (member("a"), member("b"));
        let e = expense(a.id, 1000, vec![Share::new(b.id, 1000)]);
        let sheet = compute_balances(&[a.clone(), b.clone()], &[e]);

        assert!(sheet.issues.is_empty());
        assert_eq!(sheet.balances[0].owing_minor, 1000);
        assert_eq!(sheet.balances[1].owed_minor, 1000);
    }

    #[test]
    fn unknown_participant_is_skipped_and_sum_stays_zero() {
        let (a, b) = (member("a"), member("b"));
        let ghost = Uuid::new_v4();
        let e = expense(
            a.id,
            3000,
            vec![
                Share::new(a.id, 1000),
                Share::new(b.id, 1000),
                Share::new(ghost, 1000),
            ],
        );
        let sheet = compute_balances(&[a.clone(), b.clone()], &[e]);

        assert!(matches!(
            sheet.issues.as_slice(),
            [LedgerIssue::UnknownParticipant { member_id, .. }] if *member_id == ghost
        ));
        // The ghost's share is excluded from the payer's credit too.
        assert_eq!(sheet.balances[0].owing_minor, 1000);
        assert_eq!(sheet.balances[1].owed_minor, 1000);
        assert_eq!(
            sheet.balances.iter().map(|m| m.balance_minor()).sum::<i64>(),
            0
        );
    }

    #[test]
    fn unknown_payer_skips_the_whole_expense() {
        let a = member("a");
        let ghost = Uuid::new_v4();
        let e = expense(ghost, 1000, vec![Share::new(a.id, 1000)]);
        let sheet = compute_balances(&[a.clone()], &[e]);

        assert_eq!(sheet.balances[0].owed_minor, 0);
        assert_eq!(sheet.issues.len(), 1);
    }

    #[test]
    fn folding_settled_payments_clears_the_debt() {
        let (a, b) = (member("a"), member("b"));
        let e = expense(a.id, 3000, vec![Share::new(a.id, 1500), Share::new(b.id, 1500)]);
        let mut sheet = compute_balances(&[a.clone(), b.clone()], &[e]);
        assert_eq!(sheet.balances[1].balance_minor(), 1500);

        fold_settled(&mut sheet, &[settled(b.id, a.id, 1500)]);

        assert!(sheet.issues.is_empty());
        assert_eq!(sheet.balances[0].balance_minor(), 0);
        assert_eq!(sheet.balances[1].balance_minor(), 0);
    }

    #[test]
    fn settlement_with_departed_member_is_reported_not_applied() {
        let a = member("a");
        let ghost = Uuid::new_v4();
        let mut sheet = compute_balances(&[a.clone()], &[]);

        fold_settled(&mut sheet, &[settled(a.id, ghost, 500)]);

        assert_eq!(sheet.balances[0].balance_minor(), 0);
        assert!(matches!(
            sheet.issues.as_slice(),
            [LedgerIssue::UnknownSettlementMember { member_id, .. }] if *member_id == ghost
        ));
    }

    #[test]
    fn empty_group_yields_empty_sheet() {
        let sheet = compute_balances(&[], &[]);
        assert!(sheet.balances.is_empty());
        assert!(sheet.issues.is_empty());
    }
}
