// SPDX-License-Identifier: MIT

use serial_test::serial;

use super::*;

#[tokio::test]
#[serial]
async fn disabled_supervisor_returns_immediately_without_cancelling() {
    std::env::remove_var("GENESIS_SOFT_RESTART_TICK_THRESHOLD");
    std::env::remove_var("GENESIS_SOFT_RESTART_MUTATION_THRESHOLD");
    let shutdown = CancellationToken::new();
    let supervisor = Supervisor::new(Arc::new(AtomicU64::new(0)), Arc::new(AtomicU64::new(0)), shutdown.clone());
    supervisor.run().await;
    assert!(!shutdown.is_cancelled());
}

#[tokio::test]
#[serial]
async fn supervisor_cancels_shutdown_once_the_tick_threshold_is_reached() {
    std::env::set_var("GENESIS_SOFT_RESTART_TICK_THRESHOLD", "100");
    std::env::remove_var("GENESIS_SOFT_RESTART_MUTATION_THRESHOLD");
    std::env::set_var("GENESIS_SOFT_RESTART_CHECK_MS", "10");
    tokio::time::pause();

    let tick_counter = Arc::new(AtomicU64::new(0));
    let mutation_counter = Arc::new(AtomicU64::new(0));
    let shutdown = CancellationToken::new();
    let supervisor = Supervisor::new(tick_counter.clone(), mutation_counter, shutdown.clone());
    let handle = tokio::spawn(supervisor.run());

    tick_counter.store(150, Ordering::Relaxed);
    tokio::time::advance(std::time::Duration::from_millis(20)).await;
    handle.await.unwrap();

    assert!(shutdown.is_cancelled());
    std::env::remove_var("GENESIS_SOFT_RESTART_TICK_THRESHOLD");
    std::env::remove_var("GENESIS_SOFT_RESTART_CHECK_MS");
}

#[tokio::test]
#[serial]
async fn supervisor_cancels_shutdown_once_the_mutation_threshold_is_reached() {
    std::env::remove_var("GENESIS_SOFT_RESTART_TICK_THRESHOLD");
    std::env::set_var("GENESIS_SOFT_RESTART_MUTATION_THRESHOLD", "10");
    std::env::set_var("GENESIS_SOFT_RESTART_CHECK_MS", "10");
    tokio::time::pause();

    let tick_counter = Arc::new(AtomicU64::new(0));
    let mutation_counter = Arc::new(AtomicU64::new(0));
    let shutdown = CancellationToken::new();
    let supervisor = Supervisor::new(tick_counter, mutation_counter.clone(), shutdown.clone());
    let handle = tokio::spawn(supervisor.run());

    mutation_counter.store(12, Ordering::Relaxed);
    tokio::time::advance(std::time::Duration::from_millis(20)).await;
    handle.await.unwrap();

    assert!(shutdown.is_cancelled());
    std::env::remove_var("GENESIS_SOFT_RESTART_MUTATION_THRESHOLD");
    std::env::remove_var("GENESIS_SOFT_RESTART_CHECK_MS");
}
