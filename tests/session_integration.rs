//! Session-level integration tests: cancellation, timeouts, transaction
//! scopes, result caching, configuration and the blocking twin.


use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tabula::driver::{DriverErrorKind, ResultSet, Response};
use tabula::result_cache::MemoryCache;
use tabula::{
    BlockingSession, DbError, DbSetting, OperationKind, OperationOptions, OrderField, QueryField,
    Record, SessionBuilder, TracingTrace, Value,
};

use session_test_support::{Person, connection, identity_handler, people, session};

#[tokio::test]
async fn test_cancelled_token_stops_before_any_command() {
    let conn = connection("memory://pre-cancel").with_handler(identity_handler(1));
    let log = conn.log();
    let mut session = session(conn, DbSetting::default());
    let token = CancellationToken::new();
    token.cancel();

    let err = session
        .insert_all(
            "people",
            &mut people(3),
            &OperationOptions::new().cancellation(token),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DbError::Cancelled {
            kind: OperationKind::InsertAll,
            table: "people".to_string(),
        }
    );
    assert!(err.is_cancelled());
    assert_eq!(log.command_count(), 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_batch() {
    let conn = connection("memory://in-flight")
        .with_handler(identity_handler(1))
        .with_delay(Duration::from_secs(30));
    let log = conn.log();
    let mut session = session(conn, DbSetting::default());
    let token = CancellationToken::new();
    let options = OperationOptions::new().cancellation(token.clone());
    let mut people = people(4);

    let (result, ()) = tokio::join!(session.insert_all("people", &mut people, &options), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!((log.begins(), log.commits(), log.rollbacks()), (1, 0, 1));
    assert_eq!(log.committed_rows(), 0);
    assert!(people.iter().all(|p| p.id == 0));
}

#[tokio::test]
async fn test_command_timeout_surfaces_as_driver_error() {
    let conn = connection("memory://timeout")
        .with_handler(|_| Ok(Response::Scalar(Value::Int64(1))))
        .with_delay(Duration::from_secs(30));
    let mut session = session(conn, DbSetting::default());

    let err = session
        .count_all(
            "people",
            &OperationOptions::new().timeout(Duration::from_millis(10)),
        )
        .await
        .unwrap_err();
    match err {
        DbError::Driver(e) => assert_eq!(e.kind(), DriverErrorKind::Timeout),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batches_join_the_callers_transaction() {
    let conn = connection("memory://joined").with_handler(identity_handler(1));
    let log = conn.log();
    let mut session = session(conn, DbSetting::default());

    session.begin().await.unwrap();
    session
        .insert_all("people", &mut people(5), &OperationOptions::new().batch_size(2))
        .await
        .unwrap();
    assert_eq!(log.commits(), 0);
    assert_eq!(log.committed_rows(), 0);
    assert_eq!(log.pending_rows(), 5);

    session.commit().await.unwrap();
    assert_eq!((log.begins(), log.commits()), (1, 1));
    assert_eq!(log.committed_rows(), 5);
}

#[tokio::test]
async fn test_table_mapped_entities_round_trip() {
    let conn = connection("memory://mapped").with_handler(|command| {
        if command.text.starts_with("SELECT") {
            Ok(Response::Rows(vec![
                ResultSet::new(["Id", "Name", "Age"])
                    .with_row(vec![Value::Int64(9), Value::Text("Ada".into()), Value::Null]),
            ]))
        } else {
            Ok(Response::Scalar(Value::Int64(9)))
        }
    });
    let mut session = SessionBuilder::new()
        .caches(Arc::new(tabula::Caches::new()))
        .trace(Arc::new(TracingTrace))
        .build(conn);

    let mut ada = Person {
        name: "Ada".to_string(),
        ..Person::default()
    };
    session
        .insert_mapped(&mut ada, &OperationOptions::new())
        .await
        .unwrap();
    assert_eq!(ada.id, 9);

    let found: Vec<Person> = session
        .query_mapped(
            QueryField::equal("Name", "ada").ignore_case(),
            &OperationOptions::new().order_by(vec![OrderField::ascending("Id")]),
        )
        .await
        .unwrap();
    assert_eq!(
        found,
        vec![Person {
            id: 9,
            name: "Ada".to_string(),
            age: None,
        }]
    );
    let text = &session.connection().log().commands()[1].text;
    assert_eq!(
        text,
        r#"SELECT "Id", "Name", "Age" FROM "people" WHERE LOWER("Name") = LOWER(@_Name) ORDER BY "Id" ASC;"#
    );
}

#[tokio::test]
async fn test_result_cache_expires() {
    let conn = connection("memory://cache").with_handler(|_| {
        Ok(Response::Rows(vec![
            ResultSet::new(["Id"]).with_row(vec![Value::Int64(1)]),
        ]))
    });
    let log = conn.log();
    let cache = Arc::new(MemoryCache::new());
    let mut session = SessionBuilder::new()
        .caches(Arc::new(tabula::Caches::new()))
        .result_cache(cache.clone())
        .build(conn);
    let options = OperationOptions::new()
        .cache_key("people:1")
        .cache_expiration(Duration::from_millis(30));

    let first: Vec<Record> = session.query("people", ("Id", 1), &options).await.unwrap();
    let cached: Vec<Record> = session.query("people", ("Id", 1), &options).await.unwrap();
    assert_eq!(first, cached);
    assert_eq!(log.command_count(), 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let _: Vec<Record> = session.query("people", ("Id", 1), &options).await.unwrap();
    assert_eq!(log.command_count(), 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_setting_from_json_drives_the_builder() {
    let setting: DbSetting = serde_json::from_str(
        r#"{ "parameter_prefix": ":", "opening_quote": "`", "closing_quote": "`" }"#,
    )
    .unwrap();
    assert_eq!(setting.default_batch_size, 10);

    let conn = connection("memory://json").with_handler(|_| Ok(Response::Affected(1)));
    let log = conn.log();
    let mut db = BlockingSession::from_session(session(conn, setting)).unwrap();
    db.delete("people", ("Name", "ada"), &OperationOptions::new())
        .unwrap();
    assert_eq!(
        log.commands()[0].text,
        "DELETE FROM `people` WHERE `Name` = :_Name;"
    );
}

#[test]
fn test_blocking_batch_and_aggregates() {
    let conn = connection("memory://blocking").with_handler(identity_handler(1));
    let log = conn.log();
    let mut db = BlockingSession::from_session(session(conn, DbSetting::default())).unwrap();
    let mut people = people(5);

    let inserted = db
        .insert_all("people", &mut people, &OperationOptions::new().batch_size(2))
        .unwrap();
    assert_eq!(inserted, 5);
    assert_eq!(people[4].id, 5);
    assert_eq!(log.commits(), 1);

    let err = db
        .max("people", "Salary", (), &OperationOptions::new())
        .unwrap_err();
    assert!(matches!(err, DbError::UnqualifiedField { .. }));
}
