use chrono::Utc;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Engine, EngineError, LedgerIssue, NewExpenseCmd, SettlementStatus, Share, SplitSpec,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn group_with_members(engine: &Engine, names: &[&str]) -> (String, Vec<Uuid>) {
    let group_id = engine.new_group("Trip", None).await.unwrap();
    let mut members = Vec::new();
    for name in names {
        members.push(
            engine
                .new_member(&group_id, name, None, None)
                .await
                .unwrap(),
        );
    }
    (group_id, members)
}

fn equal_expense(group_id: &str, name: &str, amount: i64, payer: Uuid, participants: Vec<Uuid>) -> NewExpenseCmd {
    NewExpenseCmd::new(
        group_id,
        name,
        amount,
        payer,
        SplitSpec::Equal { participants },
        Utc::now(),
    )
}

#[tokio::test]
async fn equal_split_produces_expected_balances_and_pending() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    engine
        .new_expense(equal_expense(&group_id, "dinner", 9000, m[0], m.clone()))
        .await
        .unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    assert!(outcome.issues.is_empty());

    let balance = |id: Uuid| {
        outcome
            .balances
            .iter()
            .find(|b| b.member_id == id)
            .unwrap()
            .balance_minor()
    };
    assert_eq!(balance(m[0]), -6000);
    assert_eq!(balance(m[1]), 3000);
    assert_eq!(balance(m[2]), 3000);
    assert_eq!(
        outcome.balances.iter().map(|b| b.balance_minor()).sum::<i64>(),
        0
    );

    let pending: Vec<_> = outcome
        .settlements
        .iter()
        .filter(|s| s.status == SettlementStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 2);
    for settlement in pending {
        assert_eq!(settlement.to_member_id, m[0]);
        assert_eq!(settlement.amount_minor, 3000);
    }
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    engine
        .new_expense(equal_expense(&group_id, "hotel", 12000, m[1], m.clone()))
        .await
        .unwrap();

    let first = engine.reconcile(&group_id).await.unwrap();
    let second = engine.reconcile(&group_id).await.unwrap();

    assert_eq!(first.balances, second.balances);
    assert_eq!(first.issues, second.issues);
    // Unchanged pending proposals keep their ids across reconciles.
    assert_eq!(first.settlements, second.settlements);
}

#[tokio::test]
async fn settlement_reads_keep_proposal_ids_stable() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    engine
        .new_expense(equal_expense(&group_id, "dinner", 9000, m[0], m.clone()))
        .await
        .unwrap();

    let first = engine.settlements(&group_id).await.unwrap();
    let second = engine.settlements(&group_id).await.unwrap();
    assert_eq!(first, second);

    // A ledger change replaces the stale proposals.
    engine
        .new_expense(equal_expense(&group_id, "taxi", 3000, m[1], m.clone()))
        .await
        .unwrap();
    let third = engine.settlements(&group_id).await.unwrap();
    assert_ne!(first, third);
}

#[tokio::test]
async fn custom_split_must_sum_to_amount() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    let bad = NewExpenseCmd::new(
        &group_id,
        "groceries",
        10000,
        m[0],
        SplitSpec::Custom {
            shares: vec![
                Share::new(m[0], 4000),
                Share::new(m[1], 4000),
                Share::new(m[2], 1000),
            ],
        },
        Utc::now(),
    );
    assert!(matches!(
        engine.new_expense(bad).await,
        Err(EngineError::InvalidSplit(_))
    ));

    let good = NewExpenseCmd::new(
        &group_id,
        "groceries",
        10000,
        m[0],
        SplitSpec::Custom {
            shares: vec![
                Share::new(m[0], 4000),
                Share::new(m[1], 4000),
                Share::new(m[2], 2000),
            ],
        },
        Utc::now(),
    );
    engine.new_expense(good).await.unwrap();
}

#[tokio::test]
async fn planner_minimality_and_settling_clears_pending() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    // c fronts 3000 for a and 2000 for b: balances a:+3000, b:+2000, c:-5000.
    engine
        .new_expense(NewExpenseCmd::new(
            &group_id,
            "tickets",
            3000,
            m[2],
            SplitSpec::Custom {
                shares: vec![Share::new(m[0], 3000)],
            },
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .new_expense(NewExpenseCmd::new(
            &group_id,
            "taxi",
            2000,
            m[2],
            SplitSpec::Custom {
                shares: vec![Share::new(m[1], 2000)],
            },
            Utc::now(),
        ))
        .await
        .unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    let pending: Vec<_> = outcome
        .settlements
        .iter()
        .filter(|s| s.status == SettlementStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 2);
    assert_eq!(
        (pending[0].from_member_id, pending[0].to_member_id, pending[0].amount_minor),
        (m[0], m[2], 3000)
    );
    assert_eq!(
        (pending[1].from_member_id, pending[1].to_member_id, pending[1].amount_minor),
        (m[1], m[2], 2000)
    );

    // The embedded reconcile keeps the untouched proposal's id, so both can
    // be settled by the ids from the first read.
    let ids: Vec<Uuid> = pending.iter().map(|s| s.id).collect();
    for id in ids {
        engine.mark_settled(&group_id, id).await.unwrap();
    }

    let settlements = engine.settlements(&group_id).await.unwrap();
    assert!(settlements.iter().all(|s| s.status == SettlementStatus::Settled));
    assert_eq!(settlements.len(), 2);

    let balances = engine.balances(&group_id).await.unwrap();
    assert!(balances.iter().all(|b| b.balance_minor() == 0));
}

#[tokio::test]
async fn settled_history_survives_new_expenses() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    engine
        .new_expense(equal_expense(
            &group_id,
            "lunch",
            3000,
            m[1],
            vec![m[0], m[1]],
        ))
        .await
        .unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    let pending_id = outcome
        .settlements
        .iter()
        .find(|s| s.status == SettlementStatus::Pending)
        .unwrap()
        .id;
    engine.mark_settled(&group_id, pending_id).await.unwrap();

    engine
        .new_expense(equal_expense(
            &group_id,
            "museum",
            2000,
            m[2],
            vec![m[1], m[2]],
        ))
        .await
        .unwrap();

    let settlements = engine.settlements(&group_id).await.unwrap();
    let settled: Vec<_> = settlements
        .iter()
        .filter(|s| s.status == SettlementStatus::Settled)
        .collect();
    let pending: Vec<_> = settlements
        .iter()
        .filter(|s| s.status == SettlementStatus::Pending)
        .collect();

    assert_eq!(settled.len(), 1);
    assert_eq!(
        (settled[0].from_member_id, settled[0].to_member_id, settled[0].amount_minor),
        (m[0], m[1], 1500)
    );
    assert_eq!(pending.len(), 1);
    assert_eq!(
        (pending[0].from_member_id, pending[0].to_member_id, pending[0].amount_minor),
        (m[1], m[2], 1000)
    );
}

#[tokio::test]
async fn settling_twice_is_a_conflict() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    engine
        .new_expense(equal_expense(&group_id, "lunch", 3000, m[0], m.clone()))
        .await
        .unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    let pending_id = outcome
        .settlements
        .iter()
        .find(|s| s.status == SettlementStatus::Pending)
        .unwrap()
        .id;

    engine.mark_settled(&group_id, pending_id).await.unwrap();
    assert!(matches!(
        engine.mark_settled(&group_id, pending_id).await,
        Err(EngineError::Conflict(_))
    ));
}

#[tokio::test]
async fn removed_member_degrades_to_issues_not_errors() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    engine
        .new_expense(equal_expense(&group_id, "lunch", 1000, m[0], m.clone()))
        .await
        .unwrap();
    engine.remove_member(&group_id, m[1]).await.unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    assert!(matches!(
        outcome.issues.as_slice(),
        [LedgerIssue::UnknownParticipant { member_id, .. }] if *member_id == m[1]
    ));
    assert_eq!(outcome.balances.len(), 1);
    assert_eq!(outcome.balances[0].balance_minor(), 0);
    assert!(
        outcome
            .settlements
            .iter()
            .all(|s| s.status != SettlementStatus::Pending)
    );
}

#[tokio::test]
async fn empty_group_reconciles_clean() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Empty", None).await.unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    assert!(outcome.balances.is_empty());
    assert!(outcome.settlements.is_empty());
    assert!(outcome.issues.is_empty());
}

#[tokio::test]
async fn cached_balances_match_last_reconcile() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    engine
        .new_expense(equal_expense(&group_id, "lunch", 5000, m[0], m.clone()))
        .await
        .unwrap();

    let outcome = engine.reconcile(&group_id).await.unwrap();
    let cached = engine.balances(&group_id).await.unwrap();
    assert_eq!(outcome.balances, cached);
}
