mod common;

use common::{LoopbackOpener, TEST_READ_TIMEOUT};
use filterctl::core::ports::probe_ports;
use filterctl::{Band, Command, Controller, FilterCtlError, PortOpener, Response, SessionEvent, SessionState};
use std::io;
use std::sync::Arc;
use std::time::Duration;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

fn controller() -> (Controller, Arc<LoopbackOpener>) {
    let opener = Arc::new(LoopbackOpener::new());
    let shared: Arc<dyn PortOpener> = opener.clone();
    (Controller::new(shared, TEST_READ_TIMEOUT), opener)
}

#[tokio::test]
async fn test_request_acknowledged() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();

    opener.link.push_line(":ACK: 1550.123");
    let response = controller
        .request(&Command::GetWavelength(Band::C), RESPONSE_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response, Response::Ack(":ACK: 1550.123".to_string()));
    assert_eq!(response.payload(), "1550.123");
    assert_eq!(opener.link.written_text(), ":get-wl?C\n");

    controller.close().await;
    assert!(!controller.is_connected());
}

#[tokio::test]
async fn test_request_rejected() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();

    opener.link.push_line(":NACK: ESP_ERR_INVALID_ARG");
    let command = Command::set_wavelength(Band::L, 1590.0).unwrap();
    let response = controller.request(&command, RESPONSE_TIMEOUT).await.unwrap();

    assert!(!response.is_ack());
    assert_eq!(response.status_text(), "Error: ESP_ERR_INVALID_ARG");
    assert_eq!(opener.link.written_text(), ":set-wl:L:1590.0\n");
    controller.close().await;
}

#[tokio::test]
async fn test_request_times_out_without_response() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();

    opener.link.push_line("I (812) app: tuning");
    let result = controller
        .request(&Command::Identify, Duration::from_millis(100))
        .await;

    assert!(matches!(result, Err(FilterCtlError::Timeout(t)) if t == Duration::from_millis(100)));
    // The session survives a missed response
    assert!(controller.is_connected());
    controller.close().await;
}

#[tokio::test]
async fn test_read_fault_ends_session() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();

    opener.link.push_fault(io::ErrorKind::BrokenPipe);
    match controller.next_event().await {
        Some(SessionEvent::Fault(FilterCtlError::ReadFailed { port, .. })) => assert_eq!(port, "COM3"),
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(matches!(controller.next_event().await, Some(SessionEvent::Closed)));
    assert!(!controller.is_connected());
    assert!(controller.next_event().await.is_none());
    assert!(matches!(controller.send(&Command::GetPower), Err(FilterCtlError::NotConnected)));
}

#[tokio::test]
async fn test_send_while_disconnected() {
    let (mut controller, opener) = controller();

    let result = controller.send(&Command::Identify);
    assert!(matches!(result, Err(FilterCtlError::NotConnected)));
    assert!(opener.link.written().is_empty());
    assert!(controller.next_event().await.is_none());
}

#[tokio::test]
async fn test_second_connect_rejected() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();

    let result = controller.connect("COM4", 115_200);
    assert!(matches!(result, Err(FilterCtlError::AlreadyConnected(port)) if port == "COM3"));
    assert_eq!(opener.opened().len(), 1);
    controller.close().await;
}

#[tokio::test]
async fn test_connect_requires_port() {
    let (mut controller, _opener) = controller();
    assert!(matches!(controller.connect("  ", 115_200), Err(FilterCtlError::InvalidInput(_))));
    assert!(!controller.is_connected());
}

#[tokio::test]
async fn test_connect_failure_leaves_controller_idle() {
    let opener: Arc<dyn PortOpener> = Arc::new(LoopbackOpener::refusing(&["COM7"]));
    let mut controller = Controller::new(opener, TEST_READ_TIMEOUT);

    let result = controller.connect("COM7", 115_200);
    assert!(matches!(result, Err(FilterCtlError::ConnectionFailed { .. })));
    assert!(!controller.is_connected());

    // A later attempt on another port starts a fresh session
    controller.connect("COM8", 115_200).unwrap();
    assert_eq!(controller.port(), Some("COM8"));
    controller.close().await;
}

#[tokio::test]
async fn test_toggle_connects_then_disconnects() {
    let (mut controller, opener) = controller();

    assert!(matches!(controller.toggle(None, 115_200), Err(FilterCtlError::InvalidInput(_))));

    assert!(controller.toggle(Some("/dev/ttyUSB0"), 9600).unwrap());
    assert_eq!(controller.session_state(), Some(SessionState::Open));
    assert_eq!(opener.opened(), vec![("/dev/ttyUSB0".to_string(), 9600)]);

    assert!(!controller.toggle(None, 9600).unwrap());
    assert!(matches!(controller.next_event().await, Some(SessionEvent::Closed)));
    assert!(!controller.is_connected());
}

#[tokio::test]
async fn test_close_releases_session() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();
    controller.send(&Command::PowerUp).unwrap();

    controller.close().await;
    assert!(!controller.is_connected());
    assert!(controller.session_state().is_none());
    assert!(matches!(controller.send(&Command::Identify), Err(FilterCtlError::NotConnected)));
    assert_eq!(opener.link.written_text(), ":powerup\n");

    // Closing twice is a no-op
    controller.close().await;
}

#[tokio::test]
async fn test_reconnect_after_close() {
    let (mut controller, opener) = controller();
    controller.connect("COM3", 115_200).unwrap();
    controller.close().await;

    controller.connect("COM3", 115_200).unwrap();
    opener.link.push_line(":ACK");
    let response = controller.request(&Command::PowerUp, RESPONSE_TIMEOUT).await.unwrap();
    assert_eq!(response.status_text(), "OK");
    controller.close().await;
}

#[test]
fn test_probe_skips_ports_that_fail_to_open() {
    let opener = LoopbackOpener::refusing(&["/dev/ttyS0", "/dev/ttyUSB1"]);
    let candidates = ["/dev/ttyS0", "/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyACM0"]
        .iter()
        .map(|p| p.to_string());

    let ports = probe_ports(&opener, candidates);
    assert_eq!(ports, vec!["/dev/ttyUSB0".to_string(), "/dev/ttyACM0".to_string()]);
}

#[test]
fn test_probe_with_no_candidates() {
    let opener = LoopbackOpener::new();
    assert!(probe_ports(&opener, Vec::new()).is_empty());
    assert!(opener.opened().is_empty());
}
