//! Monitoring controller end-to-end with scripted transport and snapshot source

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use std::str::FromStr;
use tokio::sync::broadcast;

use deposit_watch::error::AppError;
use deposit_watch::models::{DepositStatus, EventKind};
use deposit_watch::monitoring::{ConnectionState, MonitoringController};
use deposit_watch::notifications::{NotificationEvent, Notifier};

use crate::support::{
    advance, deposit, network, session_config, settle, wait_until, Outcome, ScriptedConnector,
    ScriptedSource, WALLET,
};

fn controller(connector: Arc<ScriptedConnector>, source: Arc<ScriptedSource>) -> MonitoringController {
    let controller =
        MonitoringController::new(session_config(), 10, connector, source, Notifier::default());
    controller.set_default_network(Some(network()));
    controller
}

fn drain(rx: &mut broadcast::Receiver<NotificationEvent>) -> Vec<NotificationEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

async fn start_connected(controller: &MonitoringController, address: &str) {
    controller.start(address).await.unwrap();
    assert!(
        wait_until(|| controller.connection_state() == ConnectionState::Connected).await,
        "session never connected"
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_with_no_deposits() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    let mut states = controller.subscribe_state();
    assert_eq!(*states.borrow_and_update(), ConnectionState::Disconnected);

    controller.start(WALLET).await.unwrap();

    assert_eq!(source.addresses(), vec![WALLET.to_string()]);
    assert_eq!(controller.render_deposits(), vec!["No deposits found".to_string()]);
    assert_eq!(controller.render_feed(), vec!["Waiting for updates...".to_string()]);
    assert_eq!(*states.borrow_and_update(), ConnectionState::Connecting);

    assert!(wait_until(|| controller.connection_state() == ConnectionState::Connected).await);
    assert_eq!(*states.borrow_and_update(), ConnectionState::Connected);
    assert_eq!(connector.attempts(), vec![WALLET.to_string()]);
    assert_eq!(controller.monitored_address().as_deref(), Some(WALLET));
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_address() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    let mut notices = controller.subscribe_notifications();

    let err = controller.start("  ").await.unwrap_err();
    assert!(err.is_precondition());

    settle().await;
    assert_eq!(source.calls(), 0);
    assert_eq!(connector.attempt_count(), 0);
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
    assert!(matches!(
        drain(&mut notices).as_slice(),
        [NotificationEvent::PreconditionFailed { .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_default_network() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    controller.set_default_network(None);

    let err = controller.start(WALLET).await.unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));

    settle().await;
    assert_eq!(source.calls(), 0);
    assert_eq!(connector.attempt_count(), 0);
    assert!(!controller.is_monitoring());
}

#[tokio::test(start_paused = true)]
async fn test_deposit_detected_appends_entry_and_refreshes() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let mut notices = controller.subscribe_notifications();

    connector
        .latest_server()
        .push(r#"{"type":"deposit_detected","data":{"amount":"0.500000","tx_hash":"0xdead00000000000000000000000000beef"}}"#);
    assert!(wait_until(|| source.calls() == 2).await);

    let entries = controller.feed_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EventKind::DepositDetected);
    assert_eq!(
        entries[0].payload.amount,
        Some(Decimal::from_str("0.5").unwrap())
    );
    assert_eq!(
        source.addresses(),
        vec![WALLET.to_string(), WALLET.to_string()]
    );

    settle().await;
    assert!(drain(&mut notices).contains(&NotificationEvent::DepositDetected {
        amount: Decimal::from_str("0.500000").unwrap()
    }));
}

#[tokio::test(start_paused = true)]
async fn test_each_state_changing_event_refreshes_exactly_once() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let server = connector.latest_server();

    for frame in [
        "pong",
        r#"{"type":"connected"}"#,
        r#"{"type":"deposit_detected","data":{"amount":"1"}}"#,
        r#"{"type":"deposit_update","data":{"status":"confirming"}}"#,
        "not json at all",
        r#"{"type":"confirmation_update","confirmations":3,"status":"confirming"}"#,
        r#"{"type":"deposit_completed","data":{"tx_hash":"0x01"}}"#,
        r#"{"type":"price_tick","data":{}}"#,
        r#"{"type":"deposit_orphaned","data":{"tx_hash":"0x02"}}"#,
    ] {
        server.push(frame);
    }
    assert!(wait_until(|| controller.feed_entries().len() == 6).await);
    settle().await;

    // One initial fetch plus one per state-changing event
    assert_eq!(source.calls(), 1 + 5);

    let kinds: Vec<EventKind> = controller.feed_entries().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::DepositOrphaned,
            EventKind::Unknown,
            EventKind::DepositCompleted,
            EventKind::ConfirmationUpdate,
            EventKind::DepositUpdated,
            EventKind::DepositDetected,
        ]
    );
    assert_eq!(controller.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_flat_confirmation_update_classified() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;

    connector
        .latest_server()
        .push(r#"{"type":"confirmation_update","confirmations":3,"status":"confirming"}"#);
    assert!(wait_until(|| source.calls() == 2).await);

    let entry = &controller.feed_entries()[0];
    assert_eq!(entry.kind, EventKind::ConfirmationUpdate);
    assert_eq!(entry.payload.confirmations(), 3);
    assert_eq!(entry.payload.status(), "confirming");
}

#[tokio::test(start_paused = true)]
async fn test_feed_bounded_most_recent_first() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let server = connector.latest_server();

    for n in 0..15 {
        server.push(&format!(
            r#"{{"type":"confirmation_update","data":{{"confirmations":{}}}}}"#,
            n
        ));
    }
    assert!(wait_until(|| source.calls() == 16).await);

    let entries = controller.feed_entries();
    assert_eq!(entries.len(), 10);
    let confirmations: Vec<u64> = entries.iter().map(|e| e.payload.confirmations()).collect();
    assert_eq!(confirmations, (5..15).rev().collect::<Vec<u64>>());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_failure_on_start_is_not_fatal() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    source.push_response(Err(AppError::Backend {
        status: 500,
        body: "Internal Server Error".to_string(),
    }));
    let controller = controller(connector.clone(), source.clone());
    let mut notices = controller.subscribe_notifications();

    start_connected(&controller, WALLET).await;
    settle().await;

    let notices = drain(&mut notices);
    assert!(notices
        .iter()
        .any(|n| matches!(n, NotificationEvent::SnapshotFailed { .. })));
    assert!(notices.contains(&NotificationEvent::Connected));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_wallet_notice() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    source.push_response(Err(AppError::NotFound(format!("Wallet {}", WALLET))));
    let controller = controller(connector.clone(), source.clone());
    let mut notices = controller.subscribe_notifications();

    controller.start(WALLET).await.unwrap();

    assert!(drain(&mut notices).contains(&NotificationEvent::WalletNotFound {
        wallet_address: WALLET.to_string()
    }));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    source.push_response(Ok(vec![deposit("0x01", "1.5", DepositStatus::Confirming)]));
    source.push_response(Err(AppError::Backend {
        status: 502,
        body: "Bad Gateway".to_string(),
    }));
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;

    connector
        .latest_server()
        .push(r#"{"type":"deposit_update","data":{"tx_hash":"0x01"}}"#);
    assert!(wait_until(|| source.calls() == 2).await);
    settle().await;

    let deposits = controller.deposits();
    assert_eq!(deposits.len(), 1);
    assert_eq!(deposits[0].tx_hash, "0x01");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_replaces_snapshot_wholesale() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    source.push_response(Ok(vec![
        deposit("0x01", "1", DepositStatus::Pending),
        deposit("0x02", "2", DepositStatus::Pending),
    ]));
    source.push_response(Ok(vec![deposit("0x03", "3", DepositStatus::Completed)]));
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    assert_eq!(controller.deposits().len(), 2);

    let count = controller.refresh().await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(controller.deposits()[0].tx_hash, "0x03");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_without_address_is_precondition() {
    let controller = controller(ScriptedConnector::new(), ScriptedSource::new());
    assert!(controller.refresh().await.unwrap_err().is_precondition());
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_close_surfaces_reconnect() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let mut notices = controller.subscribe_notifications();

    connector.latest_server().close();
    settle().await;
    assert_eq!(controller.connection_state(), ConnectionState::Reconnecting);

    let seen = drain(&mut notices);
    assert!(seen
        .iter()
        .any(|n| matches!(n, NotificationEvent::ConnectionError { .. })));
    assert!(seen.contains(&NotificationEvent::Reconnecting { delay_secs: 5 }));

    advance(Duration::from_secs(5)).await;
    assert_eq!(controller.connection_state(), ConnectionState::Connected);
    assert_eq!(
        connector.attempts(),
        vec![WALLET.to_string(), WALLET.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_initial_handshake_returns_to_idle() {
    let connector =
        ScriptedConnector::with_outcomes(vec![Outcome::Refuse("connection refused".to_string())]);
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    let mut notices = controller.subscribe_notifications();

    controller.start(WALLET).await.unwrap();
    assert!(wait_until(|| !controller.is_monitoring()).await);
    advance(Duration::from_secs(60)).await;

    assert!(!controller.is_monitoring());
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(controller.monitored_address().as_deref(), Some(WALLET));

    // Nothing left to stop
    controller.stop();
    let seen = drain(&mut notices);
    assert!(seen
        .iter()
        .any(|n| matches!(n, NotificationEvent::HandshakeFailed { .. })));
    assert!(!seen.contains(&NotificationEvent::MonitoringStopped));
}

#[tokio::test(start_paused = true)]
async fn test_failed_handshake_does_not_retire_newer_session() {
    let connector = ScriptedConnector::with_outcomes(vec![
        Outcome::Refuse("connection refused".to_string()),
        Outcome::Accept,
    ]);
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());

    controller.start(WALLET).await.unwrap();
    assert!(wait_until(|| connector.attempt_count() == 1).await);
    start_connected(&controller, WALLET).await;
    settle().await;

    assert!(controller.is_monitoring());
    assert_eq!(controller.connection_state(), ConnectionState::Connected);
    assert_eq!(connector.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_keeps_feed_and_snapshot() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    source.push_response(Ok(vec![deposit("0x01", "1", DepositStatus::Pending)]));
    source.push_response(Ok(vec![deposit("0x01", "1", DepositStatus::Completed)]));
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;

    connector
        .latest_server()
        .push(r#"{"type":"deposit_completed","data":{"tx_hash":"0x01"}}"#);
    assert!(wait_until(|| source.calls() == 2).await);
    settle().await;

    controller.stop();
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
    assert!(!controller.is_monitoring());
    assert_eq!(controller.feed_entries().len(), 1);
    assert_eq!(controller.deposits()[0].status, DepositStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_stop_twice_is_safe() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let mut notices = controller.subscribe_notifications();

    controller.stop();
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
    controller.stop();
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);

    let stopped = drain(&mut notices)
        .into_iter()
        .filter(|n| *n == NotificationEvent::MonitoringStopped)
        .count();
    assert_eq!(stopped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_effects_after_stop() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let server = connector.latest_server();

    controller.stop();
    server.push(r#"{"type":"deposit_detected","data":{"amount":"9"}}"#);
    server.close();
    advance(Duration::from_secs(120)).await;

    assert!(server.sent().is_empty());
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(source.calls(), 1);
    assert!(controller.feed_entries().is_empty());
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_start_replaces_active_session() {
    const OTHER: &str = "0xdef0000000000000000000000000000000000456";

    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let controller = controller(connector.clone(), source.clone());
    start_connected(&controller, WALLET).await;
    let first = connector.latest_server();
    first.push(r#"{"type":"deposit_update","data":{}}"#);
    assert!(wait_until(|| controller.feed_entries().len() == 1).await);

    start_connected(&controller, OTHER).await;
    settle().await;

    assert!(first.closed_by_client());
    assert!(controller.feed_entries().is_empty());
    assert_eq!(controller.monitored_address().as_deref(), Some(OTHER));

    advance(Duration::from_secs(60)).await;
    assert_eq!(
        connector.attempts(),
        vec![WALLET.to_string(), OTHER.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_initial_fetch_never_connects() {
    let connector = ScriptedConnector::new();
    let source = ScriptedSource::new();
    let gate = source.gate();
    let controller = Arc::new(controller(connector.clone(), source.clone()));

    let starting = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start(WALLET).await }
    });
    assert!(wait_until(|| source.calls() == 1).await);

    controller.stop();
    gate.notify_one();
    starting.await.unwrap().unwrap();
    settle().await;

    assert_eq!(connector.attempt_count(), 0);
    assert!(!controller.is_monitoring());
    assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
}
