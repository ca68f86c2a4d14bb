//! Timing behavior of timed pin operations against the real tokio timer.
//!
//! Runs with `start_paused` so the timer auto-advances: elapsed virtual
//! time is measured exactly, without wall-clock flakiness. A small grace
//! window is still allowed above the expected hold for scheduler overhead.

mod common;

use common::mock_connection;
use serial_link::{
    ConnectionInfo, ControlPin, ControlPinManager, MockSerialTransport, PinSignalSender, PinState,
    SerialControlPinManager, SerialTransport, TokioDelay, MINIMUM_SIGNAL_SWITCH_TIME,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const GRACE: Duration = Duration::from_millis(10);

fn timed_manager(pin: ControlPin) -> (SerialControlPinManager, MockSerialTransport) {
    let mock = MockSerialTransport::new("MOCK0");
    let transport: Arc<dyn SerialTransport> = Arc::new(mock.clone());
    let manager = SerialControlPinManager::new(pin, transport, Arc::new(TokioDelay));
    (manager, mock)
}

/// Durations exercising both sides of the clamp floor.
fn hold_durations() -> [Duration; 4] {
    [
        Duration::ZERO,
        Duration::from_millis(100),
        MINIMUM_SIGNAL_SWITCH_TIME,
        MINIMUM_SIGNAL_SWITCH_TIME + Duration::from_millis(200),
    ]
}

fn expected_hold(requested: Duration) -> Duration {
    requested.max(MINIMUM_SIGNAL_SWITCH_TIME)
}

#[tokio::test(start_paused = true)]
async fn enable_for_holds_at_least_the_minimum() {
    for pin in [ControlPin::Dtr, ControlPin::Rts] {
        for requested in hold_durations() {
            let (manager, _) = timed_manager(pin);

            let start = Instant::now();
            manager.enable_pin_for(requested).await.unwrap();
            let elapsed = start.elapsed();

            assert!(
                elapsed >= MINIMUM_SIGNAL_SWITCH_TIME,
                "{pin} held {elapsed:?} for requested {requested:?}"
            );
            assert!(elapsed <= expected_hold(requested) + GRACE);
            assert_eq!(manager.state(), PinState::Disabled);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn disable_for_holds_at_least_the_minimum() {
    for pin in [ControlPin::Dtr, ControlPin::Rts] {
        for requested in hold_durations() {
            let (manager, _) = timed_manager(pin);

            let start = Instant::now();
            manager.disable_pin_for(requested).await.unwrap();
            let elapsed = start.elapsed();

            assert!(elapsed >= MINIMUM_SIGNAL_SWITCH_TIME);
            assert!(elapsed <= expected_hold(requested) + GRACE);
            assert_eq!(manager.state(), PinState::Enabled);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn toggle_for_holds_at_least_the_minimum() {
    for pin in [ControlPin::Dtr, ControlPin::Rts] {
        for requested in hold_durations() {
            let (manager, _) = timed_manager(pin);

            let start = Instant::now();
            manager.toggle_pin_for(requested).await.unwrap();
            let elapsed = start.elapsed();

            assert!(elapsed >= MINIMUM_SIGNAL_SWITCH_TIME);
            assert!(elapsed <= expected_hold(requested) + GRACE);
            // Timed toggle ends where it started.
            assert_eq!(manager.state(), PinState::Disabled);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn long_holds_are_not_shortened_to_the_floor() {
    let requested = MINIMUM_SIGNAL_SWITCH_TIME + Duration::from_millis(300);
    let (manager, _) = timed_manager(ControlPin::Dtr);

    let start = Instant::now();
    manager.enable_pin_for(requested).await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= requested);
    assert!(elapsed <= requested + GRACE);
}

#[tokio::test(start_paused = true)]
async fn flag_is_held_high_for_the_whole_window() {
    let (manager, mock) = timed_manager(ControlPin::Dtr);

    let start = Instant::now();
    manager
        .enable_pin_for(Duration::from_millis(50))
        .await
        .unwrap();

    // Flag writes happened exactly at the edges of the hold window.
    assert_eq!(
        mock.flag_writes(),
        vec![(ControlPin::Dtr, true), (ControlPin::Dtr, false)]
    );
    assert!(!mock.dtr());
    assert!(start.elapsed() >= MINIMUM_SIGNAL_SWITCH_TIME);
}

#[tokio::test(start_paused = true)]
async fn signals_hold_and_revert_through_the_connection_surface() {
    let info = ConnectionInfo::new("MOCK0", 9600);
    let (connection, mock) = mock_connection(&info);
    let sender = connection.rts_signal_sender().unwrap();

    let start = Instant::now();
    sender.send_signal().await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= MINIMUM_SIGNAL_SWITCH_TIME);
    assert!(elapsed <= MINIMUM_SIGNAL_SWITCH_TIME + GRACE);
    // A signal is transient: RTS is back where it started.
    assert!(!mock.rts());
    assert_eq!(connection.rts_pin_manager().state(), PinState::Disabled);
}
