extern crate dynamixel_bus;

use std::sync::atomic::{AtomicUsize, Ordering};

use dynamixel_bus::motors::{Register, XL_320};
use dynamixel_bus::protocol::{v1, v2};
use dynamixel_bus::transport::mock::MockTransport;
use dynamixel_bus::{
    models, Bus, DeviceError, Event, ReturnLevel, Servo, TransportFlags, V1Error, V2Error,
    BROADCAST_ID,
};

fn v1_frame(id: u8, content: u8, parameters: &[u8]) -> Vec<u8> {
    v1::Packet::new(id, content, parameters)
        .unwrap()
        .encode()
        .unwrap()
        .to_vec()
}

fn v2_frame(id: u8, instruction: u8, parameters: &[u8]) -> Vec<u8> {
    v2::Packet::new(id, instruction, parameters)
        .unwrap()
        .encode()
        .unwrap()
        .to_vec()
}

fn v2_status(id: u8, parameters: &[u8]) -> Vec<u8> {
    v2_frame(id, 0x55, parameters)
}

fn v1_bus() -> (Bus<MockTransport>, Servo) {
    let bus = dynamixel_bus::with_protocol_v1(0, MockTransport::new());
    let servo = bus.attach_by_name("AX-12", 1).unwrap();
    (bus, servo)
}

fn v2_bus() -> (Bus<MockTransport>, Servo) {
    let bus = dynamixel_bus::with_protocol_v2(1, MockTransport::new());
    let servo = bus.attach_by_name("XL320", 1).unwrap();
    (bus, servo)
}

#[test]
fn v1_ping() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[])).unwrap();

    let info = bus.ping(&servo).unwrap();
    assert_eq!(info.model_number, None);
    assert_eq!(bus.transport().sent(), &[0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
    assert_eq!(bus.transport().last_bus(), Some(0));

    let stats = bus.statistics();
    assert_eq!((stats.packets_sent, stats.packets_received, stats.errors), (1, 1, 0));
    assert!(bus.status().is_ok());
}

#[test]
fn v2_ping_reports_model() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut()
        .stage_reply(&[
            0xFF, 0xFF, 0xFD, 0x00, 0x01, 0x07, 0x00, 0x55, 0x00, 0x06, 0x04, 0x26, 0x65, 0x5D,
        ])
        .unwrap();

    let info = bus.ping(&servo).unwrap();
    assert_eq!(info.model_number, Some(1030));
    assert_eq!(info.firmware, Some(0x26));
    assert_eq!(
        bus.transport().sent(),
        &[0xFF, 0xFF, 0xFD, 0x00, 0x01, 0x03, 0x00, 0x01, 0x19, 0x4E]
    );
}

#[test]
fn v2_read() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut()
        .stage_reply(&v2_status(1, &[0x00, 0x01, 0x02, 0x03, 0x04]))
        .unwrap();

    let data = bus.read(&servo, 0x84, 4).unwrap();
    assert_eq!(&data[..], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(
        bus.transport().sent(),
        &[0xFF, 0xFF, 0xFD, 0x00, 0x01, 0x07, 0x00, 0x02, 0x84, 0x00, 0x04, 0x00, 0x1D, 0x15]
    );
}

#[test]
fn v1_read_temperature() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[0x20])).unwrap();

    assert_eq!(bus.read_int(&servo, 0x2B, 1), Ok(0x20));
    assert_eq!(
        bus.transport().sent(),
        &[0xFF, 0xFF, 0x01, 0x04, 0x02, 0x2B, 0x01, 0xCC]
    );
}

#[test]
fn read_int_is_little_endian() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut()
        .stage_reply(&v2_status(1, &[0x00, 0x78, 0x56, 0x34, 0x12]))
        .unwrap();
    assert_eq!(bus.read_int(&servo, 0x40, 4), Ok(0x1234_5678));
}

#[test]
fn broadcast_ping_does_not_wait() {
    let (mut bus, _) = v1_bus();
    let all = bus.attach(models::find_by_id(12).unwrap(), BROADCAST_ID).unwrap();
    let reply = v1_frame(1, 0, &[]);
    bus.transport_mut().stage_reply(&reply).unwrap();

    assert!(bus.ping(&all).is_ok());
    assert_eq!(bus.transport().flushes(), 0);
    assert_eq!(bus.transport().pending_replies(), 1);
    assert_eq!(bus.statistics().packets_received, 0);
}

#[test]
fn broadcast_write_does_not_wait() {
    let (mut bus, _) = v2_bus();
    let all = bus.attach_by_name("XL320", BROADCAST_ID).unwrap();
    let reply = v2_status(1, &[0]);
    bus.transport_mut().stage_reply(&reply).unwrap();

    assert!(bus.set_torque_enable(&all, true).is_ok());
    assert_eq!(bus.transport().pending_replies(), 1);
    assert_eq!(
        bus.transport().sent(),
        &v2_frame(BROADCAST_ID, 0x03, &[24, 0, 1])[..]
    );
}

#[test]
fn broadcast_read_has_no_data() {
    let (mut bus, _) = v1_bus();
    let all = bus.attach_by_name("AX-12", BROADCAST_ID).unwrap();

    let err = bus.read(&all, 36, 2).unwrap_err();
    assert!(err.has(TransportFlags::NO_REPLY));
    assert!(!bus.transport().sent().is_empty());
}

#[test]
fn no_answer_read_does_not_block() {
    let (mut bus, servo) = v1_bus();
    bus.set_return_level(ReturnLevel::NoAnswer);
    let reply = v1_frame(1, 0, &[0x00, 0x02]);
    bus.transport_mut().stage_reply(&reply).unwrap();

    let err = bus.read(&servo, 36, 2).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::NO_REPLY);
    assert_eq!(bus.transport().pending_replies(), 1);
    assert_eq!(bus.statistics().errors, 1);
    assert_eq!(bus.statistics().packets_sent, 1);
}

#[test]
fn read_only_level() {
    let (mut bus, servo) = v1_bus();
    bus.set_return_level(ReturnLevel::ReadOnly);
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[0x01])).unwrap();

    assert!(bus.set_led(&servo, 1u8).is_ok());
    assert_eq!(bus.transport().flushes(), 0);
    assert_eq!(bus.read_int(&servo, 25, 1), Ok(1));
    assert_eq!(bus.transport().flushes(), 1);
}

#[test]
fn timeout() {
    let (mut bus, servo) = v1_bus();

    let err = bus.ping(&servo).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::TIMEOUT);
    assert_eq!(err.device(), DeviceError::None);
    assert_eq!(err.to_string(), "Timeout");
    assert_eq!(bus.status(), err);

    let stats = bus.statistics();
    assert_eq!((stats.packets_sent, stats.packets_received, stats.errors), (1, 0, 1));
}

#[test]
fn stale_bytes_are_flushed() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().inject(&[0x00, 0xFF, 0x12]).unwrap();
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[])).unwrap();

    assert!(bus.ping(&servo).is_ok());
    assert_eq!(bus.transport().flushes(), 1);
}

#[test]
fn echo_is_dropped_before_the_reply() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().set_echo(true);
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[0x20])).unwrap();

    assert_eq!(bus.read_int(&servo, 0x2B, 1), Ok(0x20));
    assert_eq!(bus.transport().unread(), 0);
    assert_eq!(bus.statistics().packets_received, 1);
}

#[test]
fn transmit_failure() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().set_send_failure(true);

    let err = bus.ping(&servo).unwrap_err();
    assert!(err.has(TransportFlags::TRANSMIT));
    assert_eq!(bus.statistics().packets_sent, 0);
    assert_eq!(bus.statistics().errors, 1);
}

#[test]
fn v2_id_mismatch_keeps_device_error() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_status(2, &[0x04])).unwrap();

    let err = bus.write(&servo, 30, &[0x00, 0x02], false).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::ID);
    assert_eq!(
        err.device(),
        DeviceError::V2 {
            error: Some(V2Error::DataRange),
            alert: false
        }
    );
    assert_eq!(err.to_string(), "ID V2: Data range");
    assert_eq!(bus.statistics().errors, 1);
    assert_eq!(bus.statistics().packets_received, 1);
}

#[test]
fn v2_reply_must_be_a_status() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_frame(1, 0x03, &[0])).unwrap();

    let err = bus.ping(&servo).unwrap_err();
    assert!(err.has(TransportFlags::INSTRUCTION));
}

#[test]
fn v2_hardware_alert() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_status(1, &[0x80])).unwrap();

    let err = bus.set_torque_enable(&servo, false).unwrap_err();
    assert!(err.transport().is_empty());
    assert_eq!(err.to_string(), "V2: Hardware alert");
}

#[test]
fn v1_alarms_and_length() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0x04, &[])).unwrap();

    let err = bus.read(&servo, 43, 1).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::LENGTH);
    assert_eq!(err.device(), DeviceError::V1(V1Error::OVERHEATING));
    assert_eq!(err.to_string(), "Data length V1: Overheating");
}

#[test]
fn v1_device_error_only() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0x0A, &[])).unwrap();

    let err = bus.write(&servo, 30, &[0xFF, 0x0F], false).unwrap_err();
    assert!(err.transport().is_empty());
    assert_eq!(
        err.device(),
        DeviceError::V1(V1Error::ANGLE_LIMIT | V1Error::RANGE)
    );
}

#[test]
fn v1_bad_checksum() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut()
        .stage_reply(&[0xFF, 0xFF, 0x01, 0x02, 0x00, 0x00])
        .unwrap();

    let err = bus.ping(&servo).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::CHECKSUM);
    assert_eq!(bus.statistics().packets_received, 0);
}

#[test]
fn reboot_is_v2_only() {
    let (mut bus, servo) = v1_bus();
    let err = bus.reboot(&servo).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::PROTOCOL);
    assert!(bus.transport().sent().is_empty());
    assert_eq!(bus.transport().flushes(), 0);
    assert_eq!(bus.statistics().errors, 1);

    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_status(1, &[0])).unwrap();
    assert!(bus.reboot(&servo).is_ok());
    assert_eq!(bus.transport().sent(), &v2_frame(1, 0x08, &[])[..]);
}

#[test]
fn v1_reset_is_never_answered() {
    let (mut bus, servo) = v1_bus();
    let reply = v1_frame(1, 0, &[]);
    bus.transport_mut().stage_reply(&reply).unwrap();

    assert!(bus.reset(&servo).is_ok());
    assert_eq!(bus.transport().pending_replies(), 1);
    assert_eq!(bus.transport().sent(), &v1_frame(1, 0x06, &[])[..]);
}

#[test]
fn v2_reset_is_answered() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_status(1, &[0])).unwrap();

    assert!(bus.reset(&servo).is_ok());
    assert_eq!(bus.transport().unread(), 0);
    assert_eq!(bus.statistics().packets_received, 1);
}

#[test]
fn registered_write_then_action() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[])).unwrap();

    bus.write_int(&servo, 30, 512, 2, true).unwrap();
    assert_eq!(bus.transport().sent(), &v1_frame(1, 0x04, &[30, 0x00, 0x02])[..]);
    bus.transport_mut().clear_sent();

    bus.action(&servo).unwrap();
    assert_eq!(bus.transport().sent(), &[0xFF, 0xFF, 0xFE, 0x02, 0x05, 0xFA]);
}

#[test]
fn v2_action_is_addressed() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_status(1, &[0])).unwrap();

    bus.action(&servo).unwrap();
    assert_eq!(bus.transport().sent(), &v2_frame(1, 0x05, &[])[..]);
    assert_eq!(bus.statistics().packets_received, 1);
}

#[test]
fn request_bounds() {
    let (mut bus, servo) = v1_bus();
    let err = bus.write(&servo, 0x100, &[1], false).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::PROTOCOL);
    let err = bus.write(&servo, 30, &[0; 8], false).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::OVERFLOW);
    let err = bus.write_int(&servo, 30, 1, 3, false).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::LENGTH);
    assert!(bus.transport().sent().is_empty());
    assert_eq!(bus.statistics().errors, 3);

    let (mut bus, servo) = v2_bus();
    let err = bus.read(&servo, 0, 8).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::OVERFLOW);
}

#[test]
fn goal_position_is_clamped() {
    let (mut bus, servo) = v1_bus();
    let servo = servo.with_bounds(100, 800);
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[])).unwrap();

    bus.set_goal_position(&servo, 2000).unwrap();
    assert_eq!(bus.transport().sent(), &v1_frame(1, 0x03, &[30, 0x20, 0x03])[..]);
}

#[test]
fn goal_position_is_not_limited_by_default() {
    let mut bus = dynamixel_bus::with_protocol_v1(0, MockTransport::new());
    let servo = bus.attach_by_name("MX-28", 1).unwrap();
    assert_eq!(servo.bounds(), None);
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[])).unwrap();

    bus.set_goal_position(&servo, 2048).unwrap();
    assert_eq!(bus.transport().sent(), &v1_frame(1, 0x03, &[30, 0x00, 0x08])[..]);
}

#[test]
fn setters_follow_the_control_table() {
    let (mut bus, servo) = v1_bus();
    bus.set_return_level(ReturnLevel::ReadOnly);
    bus.set_goal_torque(&servo, 0x3FF).unwrap();
    assert_eq!(bus.transport().sent(), &v1_frame(1, 0x03, &[34, 0xFF, 0x03])[..]);

    let (mut bus, servo) = v2_bus();
    bus.set_return_level(ReturnLevel::ReadOnly);
    bus.set_goal_torque(&servo, 0x3FF).unwrap();
    bus.set_goal_velocity(&servo, 0x200).unwrap();
    bus.set_led(&servo, XL_320::Color::Cyan).unwrap();
    let mut expected = v2_frame(1, 0x03, &[35, 0, 0xFF, 0x03]);
    expected.extend(v2_frame(1, 0x03, &[32, 0, 0x00, 0x02]));
    expected.extend(v2_frame(1, 0x03, &[25, 0, 6]));
    assert_eq!(bus.transport().sent(), &expected[..]);
}

#[test]
fn newest_table_is_not_described() {
    let mut bus = dynamixel_bus::with_protocol_v2(0, MockTransport::new());
    let servo = bus.attach_by_name("XM430-W350", 1).unwrap();

    let err = bus.set_led(&servo, 1u8).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::UNSUPPORTED);
    assert!(bus.transport().sent().is_empty());
    assert_eq!(bus.statistics().errors, 1);
}

#[test]
fn present_position_is_cached() {
    let (mut bus, mut servo) = v2_bus();
    bus.transport_mut()
        .stage_reply(&v2_status(1, &[0, 0x00, 0x02]))
        .unwrap();

    assert_eq!(bus.present_position(&mut servo), Ok(512));
    assert_eq!(servo.position(), 512);
    assert_eq!(bus.transport().sent(), &v2_frame(1, 0x02, &[37, 0, 2, 0])[..]);
}

#[test]
fn model_number() {
    let (mut bus, servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[12, 0])).unwrap();
    assert_eq!(bus.model_number(&servo), Ok(12));
}

#[test]
fn change_id() {
    let (mut bus, mut servo) = v1_bus();
    bus.transport_mut().stage_reply(&v1_frame(1, 0, &[])).unwrap();

    bus.change_id(&mut servo, 5).unwrap();
    assert_eq!(servo.id(), 5);
    assert_eq!(bus.transport().sent(), &v1_frame(1, 0x03, &[3, 5])[..]);

    let err = bus.change_id(&mut servo, 6).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::TIMEOUT);
    assert_eq!(servo.id(), 5);
}

#[test]
fn typed_registers() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut()
        .stage_reply(&v2_status(1, &[0, 0x10, 0x02]))
        .unwrap();
    bus.transport_mut().stage_reply(&v2_status(1, &[0])).unwrap();

    assert_eq!(bus.read_register(&servo, XL_320::PresentPosition), Ok(0x0210));
    bus.transport_mut().clear_sent();
    bus.write_register(&servo, XL_320::Punch, 0x20).unwrap();
    assert_eq!(bus.transport().sent(), &v2_frame(1, 0x03, &[51, 0, 0x20, 0])[..]);
}

struct PresentVelocity;

impl Register for PresentVelocity {
    fn address(&self) -> u16 {
        128
    }
    fn length(&self) -> u16 {
        4
    }
}

#[test]
fn register_width() {
    let (mut bus, servo) = v2_bus();
    bus.transport_mut().stage_reply(&v2_status(1, &[0, 0x21])).unwrap();

    assert_eq!(bus.read_register(&servo, XL_320::PresentTemperature), Ok(0x21));
    bus.transport_mut().clear_sent();

    let err = bus.read_register(&servo, PresentVelocity).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::UNSUPPORTED);
    assert!(bus.transport().sent().is_empty());
}

#[test]
fn scan_skips_silent_ids() {
    let (mut bus, _) = v1_bus();
    {
        let t = bus.transport_mut();
        t.stage_reply(&[]).unwrap();
        t.stage_reply(&v1_frame(2, 0, &[])).unwrap();
        t.stage_reply(&[]).unwrap();
        t.stage_reply(&v1_frame(4, 0, &[])).unwrap();
    }

    let found = bus.scan(1..=4).unwrap();
    assert_eq!(&found[..], &[2, 4]);
    assert_eq!(bus.statistics().errors, 2);
    assert_eq!(bus.statistics().packets_sent, 4);
}

#[test]
fn scan_stops_on_corrupt_reply() {
    let (mut bus, _) = v1_bus();
    bus.transport_mut()
        .stage_reply(&[0xFF, 0xFF, 0x01, 0x02, 0x00, 0x00])
        .unwrap();

    let err = bus.scan(1..=10).unwrap_err();
    assert_eq!(err.transport(), TransportFlags::CHECKSUM);
    assert_eq!(bus.statistics().packets_sent, 1);
}

#[test]
fn statistics_reset() {
    let (mut bus, servo) = v1_bus();
    bus.ping(&servo).unwrap_err();
    bus.reset_statistics();
    assert_eq!(bus.statistics().errors, 0);
    assert_eq!(bus.statistics().packets_sent, 0);
}

static SENT: AtomicUsize = AtomicUsize::new(0);
static RECEIVED: AtomicUsize = AtomicUsize::new(0);
static FAILED: AtomicUsize = AtomicUsize::new(0);

fn count(event: &Event<'_>) {
    match event {
        Event::Sent { .. } => SENT.fetch_add(1, Ordering::SeqCst),
        Event::Received { .. } => RECEIVED.fetch_add(1, Ordering::SeqCst),
        Event::Failed { .. } => FAILED.fetch_add(1, Ordering::SeqCst),
    };
}

#[test]
fn observer_sees_every_packet() {
    let (mut bus, servo) = v2_bus();
    bus.set_observer(Some(count));
    bus.transport_mut().stage_reply(&v2_status(1, &[0, 0x06, 0x04, 0x26])).unwrap();

    bus.ping(&servo).unwrap();
    bus.ping(&servo).unwrap_err();

    assert_eq!(SENT.load(Ordering::SeqCst), 2);
    assert_eq!(RECEIVED.load(Ordering::SeqCst), 1);
    assert_eq!(FAILED.load(Ordering::SeqCst), 1);
}
