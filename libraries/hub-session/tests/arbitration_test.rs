//! Arbitration engine tests
//!
//! Covers the single-active-session rule, the interruption/resume paths and
//! the deferred disconnect.

mod common;

use common::{broker, session_with_tracks, wait_for_status, FakeEngine};
use hub_core::{AudioStreamRole, ErrorKind, Lifetime, PlaybackStatus, SessionKey};
use hub_session::{
    AudioOutput, BatteryLevel, CallState, DeviceSignal, InterruptionSource, MediaBroker,
    RecordingState, SessionError,
};
use std::time::Duration;

/// Start playback without going through arbitration
async fn force_play(broker: &MediaBroker, key: SessionKey) {
    broker
        .registry()
        .with_session(key, |s| s.play())
        .await
        .unwrap()
        .unwrap();
}

async fn status(broker: &MediaBroker, key: SessionKey) -> PlaybackStatus {
    broker.status(key).await.unwrap()
}

#[tokio::test]
async fn test_pause_other_sessions_spares_other_roles() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (b, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (c, _) = session_with_tracks(&broker, AudioStreamRole::Other, Lifetime::Normal, FakeEngine::audio(), 1).await;

    broker.play(b).await.unwrap();
    broker.play(c).await.unwrap();
    broker.play(a).await.unwrap();

    assert_eq!(status(&broker, a).await, PlaybackStatus::Playing);
    assert_eq!(status(&broker, b).await, PlaybackStatus::Paused);
    assert_eq!(status(&broker, c).await, PlaybackStatus::Playing);
    assert_eq!(broker.current_player().await, Some(a));
}

#[tokio::test]
async fn test_other_role_never_becomes_current_player() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (c, _) = session_with_tracks(&broker, AudioStreamRole::Other, Lifetime::Normal, FakeEngine::audio(), 1).await;

    broker.play(a).await.unwrap();
    broker.play(c).await.unwrap();

    assert_eq!(broker.current_player().await, Some(a));
    assert_eq!(status(&broker, a).await, PlaybackStatus::Playing);
}

#[tokio::test]
async fn test_engine_reported_playing_triggers_arbitration() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (b, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;

    broker.play(a).await.unwrap();
    broker
        .report_engine_state(b, hub_core::EngineState::Playing)
        .await
        .unwrap();

    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(broker.current_player().await, Some(b));
}

#[tokio::test]
async fn test_low_battery_pauses_without_ledger_resume() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (b, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    force_play(&broker, a).await;
    force_play(&broker, b).await;

    broker
        .signal(DeviceSignal::BatteryLevel(BatteryLevel::Low))
        .await
        .unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(status(&broker, b).await, PlaybackStatus::Paused);
    assert_eq!(snapshot.ledger.len(), 2);
    assert!(snapshot
        .ledger
        .iter()
        .all(|e| !e.resume_after_interruption && e.source == InterruptionSource::Battery));
    // No current player, so the last session paused is remembered
    assert_eq!(snapshot.resume_key, Some(b));

    // Dismissing the warning resumes only the remembered session
    broker.signal(DeviceSignal::BatteryWarning(true)).await.unwrap();
    broker.signal(DeviceSignal::BatteryWarning(false)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(status(&broker, b).await, PlaybackStatus::Playing);
    assert_eq!(snapshot.resume_key, None);
    assert!(snapshot.ledger.is_empty());
}

#[tokio::test]
async fn test_battery_resume_prefers_current_player() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (b, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    force_play(&broker, b).await;
    broker.play(a).await.unwrap();
    // b was paused by arbitration, bring it back without arbitration
    force_play(&broker, b).await;

    broker
        .signal(DeviceSignal::BatteryLevel(BatteryLevel::VeryLow))
        .await
        .unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(snapshot.resume_key, Some(a));
}

#[tokio::test]
async fn test_battery_warning_leaves_running_session_alone() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    force_play(&broker, a).await;

    broker
        .signal(DeviceSignal::BatteryLevel(BatteryLevel::Low))
        .await
        .unwrap();
    broker.stop(a).await.unwrap();
    broker.signal(DeviceSignal::BatteryWarning(false)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    assert_eq!(status(&broker, a).await, PlaybackStatus::Stopped);
    assert_eq!(snapshot.resume_key, None);
}

#[tokio::test]
async fn test_call_resumes_audio_only_session() {
    let (broker, _device) = broker();
    let audio = FakeEngine::audio();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, audio.clone(), 1).await;
    broker.play(a).await.unwrap();

    broker.signal(DeviceSignal::Call(CallState::OffHook)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(snapshot.ledger.len(), 1);
    assert!(snapshot.ledger[0].resume_after_interruption);
    assert_eq!(snapshot.ledger[0].source, InterruptionSource::Call);

    broker.signal(DeviceSignal::Call(CallState::OnHook)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Playing);
    assert!(snapshot.ledger.is_empty());
    assert_eq!(audio.count("play"), 2);
    assert_eq!(audio.count("pause"), 1);
}

#[tokio::test]
async fn test_call_does_not_resume_video_session() {
    let (broker, _device) = broker();
    let (v, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::video(), 1).await;
    broker.play(v).await.unwrap();

    broker.signal(DeviceSignal::Call(CallState::OffHook)).await.unwrap();
    broker.signal(DeviceSignal::Call(CallState::OnHook)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    assert_eq!(status(&broker, v).await, PlaybackStatus::Paused);
    assert!(snapshot.ledger.is_empty());
}

#[tokio::test]
async fn test_explicit_resume_may_include_video() {
    let (broker, _device) = broker();
    let (v, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::video(), 1).await;
    broker.play(v).await.unwrap();

    let paused = broker.pause_all_multimedia_sessions(true).await.unwrap();
    assert_eq!(paused, vec![v]);

    let resumed = broker.resume_paused_multimedia_sessions(true).await.unwrap();
    assert_eq!(resumed, vec![v]);
    assert_eq!(status(&broker, v).await, PlaybackStatus::Playing);
}

#[tokio::test]
async fn test_resume_skips_entries_without_flag() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();

    broker.pause_all_multimedia_sessions(false).await.unwrap();
    let resumed = broker.resume_paused_multimedia_sessions(true).await.unwrap();

    assert!(resumed.is_empty());
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert!(broker.arbitration().snapshot().await.unwrap().ledger.is_empty());
}

#[tokio::test]
async fn test_route_switch_to_speaker_pauses() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    let (c, _) = session_with_tracks(&broker, AudioStreamRole::Other, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();
    broker.play(c).await.unwrap();

    broker
        .signal(DeviceSignal::AudioRoute(AudioOutput::Earpiece))
        .await
        .unwrap();
    broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Playing);

    broker
        .signal(DeviceSignal::AudioRoute(AudioOutput::Speaker))
        .await
        .unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(status(&broker, c).await, PlaybackStatus::Playing);
    assert_eq!(snapshot.ledger[0].source, InterruptionSource::Route);
    assert!(!snapshot.ledger[0].resume_after_interruption);

    // Leaving the speaker discards the route entries without resuming
    broker
        .signal(DeviceSignal::AudioRoute(AudioOutput::Earpiece))
        .await
        .unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert!(snapshot.ledger.is_empty());
}

#[tokio::test]
async fn test_recording_pauses_and_stop_drains_ledger() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();

    broker
        .signal(DeviceSignal::Recording(RecordingState::Started))
        .await
        .unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);

    broker
        .signal(DeviceSignal::Recording(RecordingState::Stopped))
        .await
        .unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert!(snapshot.ledger.is_empty());
}

#[tokio::test]
async fn test_recording_stop_keeps_call_interruption() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();

    broker.signal(DeviceSignal::Call(CallState::OffHook)).await.unwrap();
    broker
        .signal(DeviceSignal::Recording(RecordingState::Started))
        .await
        .unwrap();
    broker
        .signal(DeviceSignal::Recording(RecordingState::Stopped))
        .await
        .unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    // Still on the call
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(snapshot.ledger.len(), 1);
    assert_eq!(snapshot.ledger[0].source, InterruptionSource::Call);

    broker.signal(DeviceSignal::Call(CallState::OnHook)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert_eq!(status(&broker, a).await, PlaybackStatus::Playing);
    assert!(snapshot.ledger.is_empty());
}

#[tokio::test]
async fn test_call_end_leaves_session_held_by_recording() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();

    broker.signal(DeviceSignal::Call(CallState::OffHook)).await.unwrap();
    broker.arbitration().snapshot().await.unwrap();
    force_play(&broker, a).await;
    broker
        .signal(DeviceSignal::Recording(RecordingState::Started))
        .await
        .unwrap();
    broker.signal(DeviceSignal::Call(CallState::OnHook)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(snapshot.ledger.len(), 1);
    assert_eq!(snapshot.ledger[0].source, InterruptionSource::Recording);
}

#[tokio::test]
async fn test_explicit_resume_leaves_call_interruption() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();

    broker.signal(DeviceSignal::Call(CallState::OffHook)).await.unwrap();
    let resumed = broker.resume_paused_multimedia_sessions(true).await.unwrap();

    assert!(resumed.is_empty());
    assert_eq!(status(&broker, a).await, PlaybackStatus::Paused);
    assert_eq!(broker.arbitration().snapshot().await.unwrap().ledger.len(), 1);
}

#[tokio::test]
async fn test_resume_skips_session_removed_before_drain() {
    let (broker, _device) = broker();
    let engine = FakeEngine::audio();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, engine.clone(), 1).await;
    broker.play(a).await.unwrap();

    broker.signal(DeviceSignal::Call(CallState::OffHook)).await.unwrap();
    broker.client_disconnected(a).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();
    assert!(!broker.registry().contains(a).await);
    assert_eq!(snapshot.ledger.len(), 1);

    broker.signal(DeviceSignal::Call(CallState::OnHook)).await.unwrap();
    let snapshot = broker.arbitration().snapshot().await.unwrap();

    assert!(snapshot.ledger.is_empty());
    assert_eq!(engine.count("play"), 1);
    assert_eq!(broker.current_player().await, None);
}

#[tokio::test]
async fn test_device_properties_drive_arbitration() {
    let (broker, device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, FakeEngine::audio(), 1).await;
    broker.play(a).await.unwrap();

    device.apply(DeviceSignal::Call(CallState::OffHook));
    wait_for_status(&broker, a, PlaybackStatus::Paused).await;

    device.apply(DeviceSignal::Call(CallState::OnHook));
    wait_for_status(&broker, a, PlaybackStatus::Playing).await;
}

#[tokio::test]
async fn test_disconnect_removes_normal_session_later() {
    let (broker, _device) = broker();
    let engine = FakeEngine::audio();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Normal, engine.clone(), 1).await;
    broker.play(a).await.unwrap();

    broker.client_disconnected(a).await.unwrap();
    // Round trip through the engine loop
    broker.arbitration().snapshot().await.unwrap();

    assert!(!broker.registry().contains(a).await);
    assert_eq!(broker.current_player().await, None);
    assert_eq!(engine.count("stop"), 1);
    assert!(matches!(
        broker.status(a).await,
        Err(SessionError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_disconnect_keeps_resumable_session() {
    let (broker, _device) = broker();
    let (a, _) = session_with_tracks(&broker, AudioStreamRole::Multimedia, Lifetime::Resumable, FakeEngine::audio(), 1).await;

    broker.client_disconnected(a).await.unwrap();
    broker.client_disconnected(SessionKey::new(999)).await.unwrap();
    broker.arbitration().snapshot().await.unwrap();

    assert!(broker.registry().contains(a).await);
}

#[tokio::test]
async fn test_unknown_key_is_reported_not_fatal() {
    let (broker, _device) = broker();
    let missing = SessionKey::new(77);

    let err = broker.play(missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = broker.pause_other_sessions(missing).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionNotFound(k) if k == missing));

    assert!(broker.arbitration().snapshot().await.is_ok());
    assert!(broker.registry().is_empty().await);
}

#[tokio::test]
async fn test_shutdown_stops_engine() {
    let (broker, _device) = broker();
    let handle = broker.arbitration().clone();

    broker.shutdown().await.unwrap();

    let err = tokio::time::timeout(Duration::from_secs(1), handle.snapshot())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SessionError::EngineStopped));
}
