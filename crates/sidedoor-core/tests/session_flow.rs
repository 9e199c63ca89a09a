//! Full session flow without a real relay: parse inputs, resolve and persist
//! the tunnel config, spawn a stand-in tunnel client, tail its log from the
//! keep-alive loop, then shut it down.

use std::path::Path;
use std::time::Duration;

use sidedoor_core::config::resolve_config;
use sidedoor_core::inputs::ActionInputs;
use sidedoor_core::launcher::spawn_tunnel;
use sidedoor_core::logtail::{LogFileTail, StatusSource};
use sidedoor_core::session::{KeepAliveState, SessionState, run_keep_alive};

fn inputs() -> ActionInputs {
    ActionInputs {
        frp_server: "frp.example.com".into(),
        frp_server_port: "7000".into(),
        frp_token: "secret".into(),
        local_port: Some("22".into()),
        remote_port: Some("10022".into()),
        local_address: String::new(),
        protocol: String::new(),
        frp_client_config: None,
        frp_version: String::new(),
        timeout_minutes: "0".into(),
        ssh_user: None,
        run_id: "98765".into(),
        teardown: "true".into(),
    }
}

#[tokio::test]
async fn resolve_launch_keepalive_and_teardown() {
    let dir = tempfile::tempdir().unwrap();

    let request = inputs().into_request().unwrap();
    assert_eq!(
        request.public_endpoint().as_deref(),
        Some("frp.example.com:10022")
    );

    let resolved = resolve_config(&request).unwrap();
    assert!(resolved.text().contains("serverAddr = \"frp.example.com\""));
    assert!(resolved.text().contains("serverPort = 7000"));
    assert!(resolved.text().contains("localPort = 22"));
    assert!(resolved.text().contains("remotePort = 10022"));

    let config_path = dir.path().join("frpc.toml");
    resolved.persist(&config_path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&config_path).unwrap(),
        resolved.text()
    );

    // Stand-in for frpc: logs a startup line, then lingers like the real
    // client would.
    let log_path = dir.path().join("frpc.log");
    let mut tunnel = spawn_tunnel(
        Path::new("/bin/sh"),
        Path::new("echo start proxy success; sleep 600"),
        &log_path,
    )
    .unwrap();
    assert!(tunnel.id().is_some());

    let mut state = SessionState::new(request.public_endpoint());
    let mut tail = LogFileTail::new(&log_path);
    let mut seen: Vec<String> = Vec::new();

    // Zero-minute budget: the loop ticks once and expires immediately.
    let outcome = run_keep_alive(
        &mut state,
        Duration::from_secs(request.timeout_minutes * 60),
        |_| {
            seen.extend(tail.poll()?);
            Ok(())
        },
    )
    .await
    .unwrap();
    assert_eq!(outcome, KeepAliveState::Expired);

    // The child may not have flushed by the first tick; keep polling.
    for _ in 0..50 {
        if seen.iter().any(|l| l.contains("start proxy success")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        seen.extend(tail.poll().unwrap());
    }
    assert!(
        seen.iter().any(|l| l.contains("start proxy success")),
        "tunnel log never surfaced: {seen:?}"
    );

    assert!(request.teardown);
    tunnel.shutdown().await.unwrap();
}
