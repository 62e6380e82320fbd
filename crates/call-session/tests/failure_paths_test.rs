//! Failure handling: rejected start/stop, SDK error events, teardown

mod common;

use common::*;
use talkline_call_session::events::SdkEvent;
use talkline_call_session::{CallSessionController, CallStatus, ClientError, SessionConfig, SessionError};

#[tokio::test]
async fn test_start_rejection_lands_in_error() {
    let (controller, client) = controller_with(test_config());
    client.fail_next_start(ClientError::rejected("network down"));

    controller.start().await;

    assert_eq!(
        controller.status(),
        CallStatus::Error { message: "network down".to_string() }
    );
}

#[tokio::test]
async fn test_start_rejection_without_message_uses_default() {
    let (controller, client) = controller_with(test_config());
    client.fail_next_start(ClientError::Silent);

    controller.start().await;
    assert_eq!(
        controller.status(),
        CallStatus::Error { message: "Failed to start call".to_string() }
    );

    client.fail_next_start(ClientError::rejected(""));
    controller.start().await;
    assert_eq!(controller.status().error_message(), Some("Failed to start call"));
}

#[tokio::test]
async fn test_retry_after_start_failure() {
    let (controller, client) = controller_with(test_config());
    client.fail_next_start(ClientError::rejected("busy"));
    controller.start().await;

    controller.start().await;
    client.emit(SdkEvent::CallConnect);

    assert_eq!(controller.status(), CallStatus::Connected { duration: 0 });
    assert_eq!(client.start_calls().len(), 2);
}

#[tokio::test]
async fn test_start_rejection_after_call_end_keeps_ended() {
    let (controller, client) = controller_with(test_config());
    let gate = client.hold_start();

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start().await })
    };
    while client.start_calls().is_empty() {
        tokio::task::yield_now().await;
    }

    client.emit(SdkEvent::CallEnd);
    assert_eq!(controller.status(), CallStatus::Ended);
    let ended_at = controller.snapshot().ended_at;

    client.fail_next_start(ClientError::rejected("cancelled"));
    gate.notify_one();
    task.await.unwrap();

    assert_eq!(controller.status(), CallStatus::Ended);
    assert_eq!(controller.snapshot().ended_at, ended_at);
}

#[tokio::test]
async fn test_sdk_failure_report_leaves_active_call_alone() {
    let (controller, _client) = connected_controller().await;

    controller.report_sdk_failure("Failed to load voice SDK");

    assert_eq!(controller.status(), CallStatus::Connected { duration: 0 });
}

#[tokio::test(start_paused = true)]
async fn test_error_event_while_connected() {
    let (controller, client) = connected_controller().await;
    client.emit(SdkEvent::SpeechStart);
    controller.toggle_mute();
    run_for_secs(2).await;

    client.emit(SdkEvent::error("assistant crashed"));
    run_for_secs(2).await;

    let snapshot = controller.snapshot();
    assert_eq!(
        snapshot.status,
        CallStatus::Error { message: "assistant crashed".to_string() }
    );
    assert!(!snapshot.listening);
    assert!(!snapshot.muted);
}

#[tokio::test]
async fn test_error_event_without_message_uses_default() {
    let (controller, client) = controller_with(test_config());
    controller.start().await;

    client.emit(SdkEvent::Error { message: Some("  ".to_string()) });

    assert_eq!(
        controller.status(),
        CallStatus::Error { message: "Call failed".to_string() }
    );
}

#[tokio::test]
async fn test_stop_rejection_forces_ended() {
    let (controller, client) = connected_controller().await;
    controller.toggle_mute();
    client.fail_next_stop(ClientError::rejected("socket closed"));

    controller.end().await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, CallStatus::Ended);
    assert!(!snapshot.muted);
    assert!(!snapshot.listening);
    assert_eq!(client.stop_count(), 1);

    // The SDK's late call-end changes nothing
    client.emit(SdkEvent::CallEnd);
    assert_eq!(controller.status(), CallStatus::Ended);
}

#[tokio::test]
async fn test_successful_stop_waits_for_call_end() {
    let (controller, client) = connected_controller().await;

    controller.end().await;
    assert_eq!(controller.status(), CallStatus::Connected { duration: 0 });
    assert_eq!(client.stop_count(), 1);

    client.emit(SdkEvent::CallEnd);
    assert_eq!(controller.status(), CallStatus::Ended);
}

#[tokio::test]
async fn test_end_without_active_call_is_noop() {
    let (controller, client) = controller_with(test_config());

    controller.end().await;

    assert_eq!(client.stop_count(), 0);
    assert_eq!(controller.status(), CallStatus::Idle);
}

#[tokio::test]
async fn test_end_while_connecting_falls_back_to_ended() {
    let (controller, client) = controller_with(test_config());
    controller.start().await;
    client.fail_next_stop(ClientError::Silent);

    controller.end().await;

    assert_eq!(controller.status(), CallStatus::Ended);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_mutation() {
    let (controller, client) = connected_controller().await;
    run_for_secs(1).await;
    assert_eq!(controller.status(), CallStatus::Connected { duration: 1 });

    controller.shutdown();
    assert!(controller.is_shut_down());
    assert_eq!(client.handler_count(), 0);

    run_for_secs(3).await;
    assert_eq!(client.emit(SdkEvent::CallEnd), 0);
    controller.start().await;

    assert_eq!(controller.status(), CallStatus::Connected { duration: 1 });
    assert_eq!(client.start_calls().len(), 1);

    // Idempotent
    controller.shutdown();
}

#[tokio::test]
async fn test_dropping_controller_disposes_subscriptions() {
    let (controller, client) = controller_with(test_config());
    assert_eq!(client.handler_count(), 6);

    let second_handle = controller.clone();
    drop(controller);
    assert_eq!(client.handler_count(), 6);

    drop(second_handle);
    assert_eq!(client.handler_count(), 0);
}

#[tokio::test]
async fn test_attach_twice_is_rejected() {
    let (controller, _client) = controller_with(test_config());

    let result = controller.attach(FakeVoiceClient::new());

    assert!(matches!(result, Err(SessionError::InvalidState { .. })));
}

#[tokio::test]
async fn test_attach_after_shutdown_is_rejected() {
    let controller = CallSessionController::new(test_config()).unwrap();
    controller.shutdown();

    assert!(controller.attach(FakeVoiceClient::new()).is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = SessionConfig::new("key", "assistant").with_connect_signals(vec![]);

    let result = CallSessionController::new(config);

    assert!(matches!(result, Err(SessionError::Configuration { .. })));
}

#[test]
fn test_new_requires_a_runtime() {
    let result = CallSessionController::new(test_config());

    assert!(matches!(result, Err(SessionError::NoRuntime { .. })));
}
