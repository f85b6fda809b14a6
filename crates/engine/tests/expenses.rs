use chrono::{Duration, Utc};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{Engine, EngineError, NewExpenseCmd, Share, SplitSpec, UpdateExpenseCmd};
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
    let group_id = engine.new_group("Flat", None).await.unwrap();
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

#[tokio::test]
async fn expense_roundtrip_keeps_shares_in_order() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b", "c"]).await;

    let expense_id = engine
        .new_expense(
            NewExpenseCmd::new(
                &group_id,
                "rent",
                10000,
                m[0],
                SplitSpec::Equal {
                    participants: m.clone(),
                },
                Utc::now(),
            )
            .category("housing")
            .note("march"),
        )
        .await
        .unwrap();

    let expense = engine.expense(&group_id, expense_id).await.unwrap();
    assert_eq!(expense.name, "rent");
    assert_eq!(expense.category.as_deref(), Some("housing"));
    assert_eq!(expense.note.as_deref(), Some("march"));
    // Remainder cent goes to the first participant.
    assert_eq!(
        expense.shares,
        vec![
            Share::new(m[0], 3334),
            Share::new(m[1], 3333),
            Share::new(m[2], 3333),
        ]
    );
}

#[tokio::test]
async fn amount_change_requires_a_new_split() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    let expense_id = engine
        .new_expense(NewExpenseCmd::new(
            &group_id,
            "wifi",
            4000,
            m[0],
            SplitSpec::Equal {
                participants: m.clone(),
            },
            Utc::now(),
        ))
        .await
        .unwrap();

    let result = engine
        .update_expense(
            &group_id,
            expense_id,
            UpdateExpenseCmd::new().amount_minor(6000),
        )
        .await;
    assert!(matches!(result, Err(EngineError::InvalidSplit(_))));

    let updated = engine
        .update_expense(
            &group_id,
            expense_id,
            UpdateExpenseCmd::new().amount_minor(6000).split(SplitSpec::Equal {
                participants: m.clone(),
            }),
        )
        .await
        .unwrap();
    assert_eq!(updated.amount_minor, 6000);
    assert_eq!(
        updated.shares,
        vec![Share::new(m[0], 3000), Share::new(m[1], 3000)]
    );
}

#[tokio::test]
async fn deleting_an_expense_reconciles_the_group() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    let expense_id = engine
        .new_expense(NewExpenseCmd::new(
            &group_id,
            "cinema",
            2000,
            m[0],
            SplitSpec::Equal {
                participants: m.clone(),
            },
            Utc::now(),
        ))
        .await
        .unwrap();

    engine.delete_expense(&group_id, expense_id).await.unwrap();

    assert!(matches!(
        engine.expense(&group_id, expense_id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    let balances = engine.balances(&group_id).await.unwrap();
    assert!(balances.iter().all(|b| b.balance_minor() == 0));
}

#[tokio::test]
async fn unknown_payer_or_participant_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a"]).await;

    let stranger = Uuid::new_v4();
    let by_stranger = NewExpenseCmd::new(
        &group_id,
        "lunch",
        1000,
        stranger,
        SplitSpec::Custom {
            shares: vec![Share::new(m[0], 1000)],
        },
        Utc::now(),
    );
    assert!(matches!(
        engine.new_expense(by_stranger).await,
        Err(EngineError::KeyNotFound(_))
    ));

    let for_stranger = NewExpenseCmd::new(
        &group_id,
        "lunch",
        1000,
        m[0],
        SplitSpec::Custom {
            shares: vec![Share::new(stranger, 1000)],
        },
        Utc::now(),
    );
    assert!(matches!(
        engine.new_expense(for_stranger).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn pagination_walks_newest_to_oldest_without_duplicates() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    let base = Utc::now();
    for i in 0..5 {
        engine
            .new_expense(NewExpenseCmd::new(
                &group_id,
                format!("day {i}"),
                1000,
                m[0],
                SplitSpec::Equal {
                    participants: m.clone(),
                },
                base + Duration::days(i),
            ))
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = engine
            .expenses_page(&group_id, 2, cursor.as_deref())
            .await
            .unwrap();
        seen.extend(page.items.iter().map(|e| e.name.clone()));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen, vec!["day 4", "day 3", "day 2", "day 1", "day 0"]);
}

#[tokio::test]
async fn bad_cursor_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, _m) = group_with_members(&engine, &["a"]).await;

    assert!(matches!(
        engine.expenses_page(&group_id, 10, Some("not-a-cursor")).await,
        Err(EngineError::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn duplicate_member_names_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, _m) = group_with_members(&engine, &["a"]).await;

    assert!(matches!(
        engine.new_member(&group_id, "A", None, None).await,
        Err(EngineError::ExistingKey(_))
    ));
}

#[tokio::test]
async fn group_summaries_carry_aggregates() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, m) = group_with_members(&engine, &["a", "b"]).await;

    engine
        .new_expense(NewExpenseCmd::new(
            &group_id,
            "lunch",
            1500,
            m[0],
            SplitSpec::Equal {
                participants: m.clone(),
            },
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .new_expense(NewExpenseCmd::new(
            &group_id,
            "dinner",
            2500,
            m[1],
            SplitSpec::Equal {
                participants: m.clone(),
            },
            Utc::now(),
        ))
        .await
        .unwrap();

    let summaries = engine.groups().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].member_count, 2);
    assert_eq!(summaries[0].expense_count, 2);
    assert_eq!(summaries[0].total_spent_minor, 4000);
}

#[tokio::test]
async fn clear_all_data_wipes_groups() {
    let (engine, _db) = engine_with_db().await;
    let (group_id, _m) = group_with_members(&engine, &["a"]).await;

    engine.clear_all_data().await.unwrap();

    assert!(matches!(
        engine.group(&group_id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(engine.groups().await.unwrap().is_empty());
}
