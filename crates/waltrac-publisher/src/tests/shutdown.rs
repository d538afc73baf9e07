//! Start/stop lifecycle.

use super::harness::{publisher, wait_for_state, FakeBroker};
use crate::{LinkState, PublishError, STOP_GRACE};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

#[tokio::test(start_paused = true)]
async fn stop_closes_session_and_rejects_publish() {
    let broker = FakeBroker::new();
    let publisher = publisher(&broker);
    publisher.start();
    wait_for_state(&publisher, LinkState::Connected).await;

    publisher.stop().await;

    assert_eq!(publisher.state(), LinkState::Stopped);
    assert_eq!(broker.disconnects(), 1);
    assert_eq!(
        publisher.publish("position/a1b2c3d4e5f6", vec![1]).await,
        Err(PublishError::Stopped)
    );
    assert_eq!(broker.delivered_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_before_start() {
    let broker = FakeBroker::new();
    let publisher = publisher(&broker);

    publisher.stop().await;
    publisher.start();

    assert_eq!(publisher.state(), LinkState::Stopped);
    assert_eq!(broker.connect_attempts(), 0);
    assert_eq!(
        publisher.publish("position/a1b2c3d4e5f6", vec![1]).await,
        Err(PublishError::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn stop_wakes_waiting_publishers() {
    let broker = FakeBroker::new();
    broker.refuse_connects(usize::MAX);
    let publisher = publisher(&broker);
    publisher.start();

    let waiting = {
        let publisher = publisher.clone();
        tokio::spawn(async move { publisher.publish("position/a1b2c3d4e5f6", vec![1]).await })
    };

    sleep(Duration::from_secs(7)).await;
    assert!(!waiting.is_finished());

    publisher.stop().await;

    assert_eq!(waiting.await.unwrap(), Err(PublishError::Stopped));
    assert_eq!(publisher.state(), LinkState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_during_pending_connect() {
    let broker = FakeBroker::gated();
    let publisher = publisher(&broker);
    publisher.start();

    sleep(Duration::from_secs(1)).await;
    publisher.stop().await;

    assert_eq!(publisher.state(), LinkState::Stopped);
    assert_eq!(broker.connect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_twice_spawns_one_worker() {
    let broker = FakeBroker::new();
    let publisher = publisher(&broker);
    publisher.start();
    publisher.start();

    wait_for_state(&publisher, LinkState::Connected).await;
    sleep(Duration::from_secs(1)).await;

    assert_eq!(broker.connect_attempts(), 1);
    publisher.stop().await;
    publisher.stop().await;
    assert_eq!(publisher.state(), LinkState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_returns_while_send_in_flight() {
    let broker = FakeBroker::new();
    let publisher = publisher(&broker);
    publisher.start();
    wait_for_state(&publisher, LinkState::Connected).await;

    broker.stall_publishes();
    let in_flight = {
        let publisher = publisher.clone();
        tokio::spawn(async move { publisher.publish("position/a1b2c3d4e5f6", vec![1]).await })
    };

    sleep(Duration::from_secs(1)).await;
    assert!(!in_flight.is_finished());

    timeout(Duration::from_secs(60), publisher.stop())
        .await
        .expect("stop did not return while a send was held");

    let result = in_flight.await.unwrap();
    assert!(matches!(result, Ok(()) | Err(PublishError::Stopped)), "{:?}", result);
    assert_eq!(publisher.state(), LinkState::Stopped);
    assert_eq!(broker.disconnects(), 1);
    assert_eq!(broker.delivered_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_aborts_worker_stuck_in_disconnect() {
    let broker = FakeBroker::new();
    let publisher = publisher(&broker);
    publisher.start();
    wait_for_state(&publisher, LinkState::Connected).await;

    broker.stall_disconnects();
    let started = Instant::now();
    timeout(Duration::from_secs(60), publisher.stop())
        .await
        .expect("stop did not return while DISCONNECT hung");

    assert!(started.elapsed() >= STOP_GRACE);
    assert_eq!(broker.disconnects(), 1);
    assert_eq!(publisher.state(), LinkState::Stopped);
    assert_eq!(
        publisher.publish("position/a1b2c3d4e5f6", vec![1]).await,
        Err(PublishError::Stopped)
    );
}
