use super::*;
use crate::domain::models::TimerSession;
use crate::domain::session::MockSessionProvider;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};

fn settings(poll_secs: u64) -> SyncSettings {
    SyncSettings {
        poll_interval: Duration::from_secs(poll_secs),
        tick_rate: Duration::from_secs(1),
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_poll_publishes_countdown() {
    let mut mock = MockSessionProvider::new();
    mock.expect_fetch()
        .returning(|| Ok(TimerSession::running(5.0)));
    mock.expect_events().returning(|| stream::pending().boxed());

    let mut handle = spawn_sync(Arc::new(mock), settings(30));
    let state = *handle.countdown.wait_for(|c| c.is_active).await.unwrap();
    assert_eq!(
        state,
        CountdownState {
            time_left_seconds: 300,
            is_active: true
        }
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_push_events_apply_without_waiting_for_poll() {
    let (event_tx, event_rx) = futures::channel::mpsc::unbounded();
    let mut mock = MockSessionProvider::new();
    mock.expect_fetch()
        .times(1)
        .returning(|| Ok(TimerSession::stopped()));
    mock.expect_events().return_once(move || event_rx.boxed());

    let mut handle = spawn_sync(Arc::new(mock), settings(3600));

    event_tx
        .unbounded_send(SessionEvent::Started(TimerSession::running(2.0)))
        .unwrap();
    let state = *handle.countdown.wait_for(|c| c.is_active).await.unwrap();
    assert!(state.time_left_seconds <= 120 && state.time_left_seconds >= 119);

    event_tx.unbounded_send(SessionEvent::Stopped).unwrap();
    let state = *handle.countdown.wait_for(|c| !c.is_active).await.unwrap();
    assert_eq!(state, CountdownState::default());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_local_expiry_is_signalled_once() {
    let mut mock = MockSessionProvider::new();
    mock.expect_fetch()
        .returning(|| Ok(TimerSession::running(1.0)));
    mock.expect_events().returning(|| stream::pending().boxed());

    let handle = spawn_sync(Arc::new(mock), settings(3600));
    let mut expired = handle.subscribe_expired();
    let mut second_fragment = handle.subscribe_expired();

    tokio::time::timeout(Duration::from_secs(120), expired.recv())
        .await
        .expect("expiry should fire within the countdown")
        .unwrap();
    second_fragment.recv().await.unwrap();
    assert_eq!(handle.current(), CountdownState::default());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert!(expired.try_recv().is_err());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reported_expiry_stops_countdown_without_rebroadcast() {
    let mut mock = MockSessionProvider::new();
    mock.expect_fetch()
        .returning(|| Ok(TimerSession::running(5.0)));
    mock.expect_events().returning(|| stream::pending().boxed());

    let mut handle = spawn_sync(Arc::new(mock), settings(3600));
    let mut expired = handle.subscribe_expired();
    handle.countdown.wait_for(|c| c.is_active).await.unwrap();

    handle.report_expired().await.unwrap();
    let state = *handle.countdown.wait_for(|c| !c.is_active).await.unwrap();
    assert_eq!(state, CountdownState::default());

    // A second report on an inactive countdown changes nothing.
    handle.report_expired().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.current(), CountdownState::default());
    assert!(matches!(
        expired.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_keeps_local_countdown() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let mut mock = MockSessionProvider::new();
    mock.expect_fetch().returning(move || {
        if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(TimerSession::running(5.0))
        } else {
            Err(anyhow::anyhow!("session store offline"))
        }
    });
    mock.expect_events().returning(|| stream::empty().boxed());

    let mut handle = spawn_sync(Arc::new(mock), settings(30));
    handle.countdown.wait_for(|c| c.is_active).await.unwrap();

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(calls.load(Ordering::SeqCst) >= 2);
    let state = handle.current();
    assert!(state.is_active);
    assert!(state.time_left_seconds < 300 && state.time_left_seconds > 240);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dropped_shutdown_sender_ends_loop() {
    let mut mock = MockSessionProvider::new();
    mock.expect_fetch()
        .returning(|| Ok(TimerSession::stopped()));
    mock.expect_events().returning(|| stream::empty().boxed());

    let (countdown, _countdown_rx) = watch::channel(CountdownState::default());
    let (expired, _) = broadcast::channel(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (_reports_tx, reports_rx) = mpsc::channel(1);
    drop(shutdown_tx);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        run_sync_loop(
            Arc::new(mock),
            settings(30),
            SyncInputs {
                shutdown: shutdown_rx,
                expired_reports: reports_rx,
            },
            SyncOutputs { countdown, expired },
        ),
    )
    .await;
    assert!(matches!(result, Ok(Ok(()))));
}
