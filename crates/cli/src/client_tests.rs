// SPDX-License-Identifier: MIT

use mp_daemon::protocol::{read_message, write_message};
use serial_test::serial;
use tempfile::tempdir;
use tokio::net::UnixListener;

use super::*;

#[tokio::test]
#[serial]
async fn connect_reports_not_running_when_the_socket_is_absent() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("nonexistent.sock");
    std::env::set_var("GENESIS_SOCKET_PATH", &socket_path);

    let err = DaemonClient::connect().await.unwrap_err();
    assert!(err.is_not_running());

    std::env::remove_var("GENESIS_SOCKET_PATH");
}

#[tokio::test]
#[serial]
async fn hello_round_trips_against_a_stub_daemon() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("morphicd.sock");
    std::env::set_var("GENESIS_SOCKET_PATH", &socket_path);

    let listener = UnixListener::bind(&socket_path).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request: Request = read_message(&mut stream).await.unwrap();
        assert_eq!(request, Request::Hello);
        write_message(&mut stream, &Response::Hello { version: "9.9.9".to_string() }).await.unwrap();
    });

    let mut client = DaemonClient::connect().await.unwrap();
    let version = client.hello().await.unwrap();
    assert_eq!(version, "9.9.9");

    server.await.unwrap();
    std::env::remove_var("GENESIS_SOCKET_PATH");
}

#[tokio::test]
#[serial]
async fn shutdown_reports_rejection_message_on_error_response() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("morphicd.sock");
    std::env::set_var("GENESIS_SOCKET_PATH", &socket_path);

    let listener = UnixListener::bind(&socket_path).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request: Request = read_message(&mut stream).await.unwrap();
        assert_eq!(request, Request::Shutdown);
        write_message(&mut stream, &Response::Error { message: "already shutting down".to_string() }).await.unwrap();
    });

    let mut client = DaemonClient::connect().await.unwrap();
    let err = client.shutdown().await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref message) if message == "already shutting down"));

    server.await.unwrap();
    std::env::remove_var("GENESIS_SOCKET_PATH");
}

#[tokio::test]
#[serial]
async fn stats_round_trips_against_a_stub_daemon() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("morphicd.sock");
    std::env::set_var("GENESIS_SOCKET_PATH", &socket_path);

    let snapshot = mp_daemon::stats::StatsSnapshot {
        tick: 7,
        predator_kills: 2,
        virus_kills: 0,
        predator_deaths: 1,
        mutations_applied: 4,
        soft_restart_tick_threshold: Some(1000),
        soft_restart_mutation_threshold: None,
    };
    let expected = snapshot;
    let listener = UnixListener::bind(&socket_path).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request: Request = read_message(&mut stream).await.unwrap();
        assert_eq!(request, Request::Stats);
        write_message(&mut stream, &Response::Stats { snapshot }).await.unwrap();
    });

    let mut client = DaemonClient::connect().await.unwrap();
    let got = client.stats().await.unwrap();
    assert_eq!(got, expected);

    server.await.unwrap();
    std::env::remove_var("GENESIS_SOCKET_PATH");
}
