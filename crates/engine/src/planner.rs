//! Debt simplification.
//!
//! Turns a balance sheet into the smallest workable set of transfers. Pure:
//! it never looks at settlement history, only at the balances it is given.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EPSILON_MINOR, MemberBalance};

/// A suggested repayment: `from` pays `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_member_id: Uuid,
    pub to_member_id: Uuid,
    pub amount_minor: i64,
}

/// Greedy two-pointer matching of debtors against creditors.
///
/// Debtors (balance above epsilon) are walked largest debt first, creditors
/// (balance below minus epsilon) largest credit first, ties broken by member
/// id for determinism. Each step transfers `min(debt, credit)` and advances
/// whichever side is exhausted, so the result has at most
/// `debtors + creditors - 1` entries and zeroes every balance if all are paid.
pub fn plan(balances: &[MemberBalance]) -> Vec<Transfer> {
    let mut debtors: Vec<(Uuid, i64)> = balances
        .iter()
        .filter(|b| b.balance_minor() > EPSILON_MINOR)
        .map(|b| (b.member_id, b.balance_minor()))
        .collect();
    let mut creditors: Vec<(Uuid, i64)> = balances
        .iter()
        .filter(|b| b.balance_minor() < -EPSILON_MINOR)
        .map(|b| (b.member_id, -b.balance_minor()))
        .collect();

    debtors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut transfers = Vec::new();
    let (mut d, mut c) = (0, 0);
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].1.min(creditors[c].1);
        transfers.push(Transfer {
            from_member_id: debtors[d].0,
            to_member_id: creditors[c].0,
            amount_minor: amount,
        });
        debtors[d].1 -= amount;
        creditors[c].1 -= amount;
        if debtors[d].1 <= EPSILON_MINOR {
            d += 1;
        }
        if creditors[c].1 <= EPSILON_MINOR {
            c += 1;
        }
    }
    transfers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(member_id: Uuid, net: i64) -> MemberBalance {
        MemberBalance {
            member_id,
            owed_minor: net.max(0),
            owing_minor: (-net).max(0),
        }
    }

    #[test]
    fn two_debtors_one_creditor() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let transfers = plan(&[balance(a, 3000), balance(b, 2000), balance(c, -5000)]);

        assert_eq!(
            transfers,
            vec![
                Transfer {
                    from_member_id: a,
                    to_member_id: c,
                    amount_minor: 3000,
                },
                Transfer {
                    from_member_id: b,
                    to_member_id: c,
                    amount_minor: 2000,
                },
            ]
        );
    }

    #[test]
    fn transfer_count_is_bounded() {
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let balances = vec![
            balance(ids[0], 1000),
            balance(ids[1], 2000),
            balance(ids[2], 3000),
            balance(ids[3], -1500),
            balance(ids[4], -1500),
            balance(ids[5], -3000),
        ];
        let transfers = plan(&balances);

        assert!(transfers.len() <= 5);
        assert_eq!(transfers.iter().map(|t| t.amount_minor).sum::<i64>(), 6000);
    }

    #[test]
    fn paid_transfers_zero_every_balance() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut balances = vec![
            balance(ids[0], 1234),
            balance(ids[1], 4321),
            balance(ids[2], -2000),
            balance(ids[3], -3555),
        ];
        for t in plan(&balances) {
            for b in &mut balances {
                if b.member_id == t.from_member_id {
                    b.owed_minor -= t.amount_minor;
                }
                if b.member_id == t.to_member_id {
                    b.owing_minor -= t.amount_minor;
                }
            }
        }
        for b in &balances {
            assert!(b.balance_minor().abs() <= EPSILON_MINOR);
        }
    }

    #[test]
    fn near_zero_balances_are_excluded() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(plan(&[balance(a, 1), balance(b, -1)]).is_empty());
    }

    #[test]
    fn deterministic_order_on_ties() {
        let mut ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        let creditor = Uuid::new_v4();
        let transfers = plan(&[
            balance(ids[1], 1000),
            balance(ids[0], 1000),
            balance(creditor, -2000),
        ]);

        assert_eq!(transfers[0].from_member_id, ids[0]);
        assert_eq!(transfers[1].from_member_id, ids[1]);
    }
}
