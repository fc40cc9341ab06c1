use nango_core::demo::{DeviceProbe, ScriptedDevice, DEMO_I2C_ADDRESSES};
use nango_core::prelude::*;
use nango_core::protocol::codec::decode_request;
use pretty_assertions::assert_eq;

fn demo_client() -> (Client, DeviceProbe) {
    let (device, probe) = ScriptedDevice::demo_board();
    let mut config = ConnectionConfig::new("demo", 115200);
    config.read_timeout_ms = 100;
    let client = Client::with_config(config);
    client.open_with(Box::new(device)).unwrap();
    (client, probe)
}

fn last_request_args(probe: &DeviceProbe) -> Vec<String> {
    let runs = probe.runs();
    let last = runs.last().expect("at least one request");
    decode_request(last).expect("well-formed request").args
}

#[test]
fn test_digital_round_trip() {
    let (client, probe) = demo_client();
    let arduino = ArduinoApi::new(client);

    arduino.pin_mode("13", PinMode::Output).unwrap();
    assert_eq!(last_request_args(&probe), vec!["pm", "13", "1"]);

    arduino.digital_write("13", PinLevel::High).unwrap();
    assert_eq!(
        probe.runs().last().unwrap().clone(),
        b"A\x000\x002\x00dw\x0013\x001\x00".to_vec()
    );
    assert_eq!(arduino.digital_read("13").unwrap(), PinLevel::High);

    arduino.digital_write("13", PinLevel::Low).unwrap();
    assert_eq!(arduino.digital_read("13").unwrap(), PinLevel::Low);
}

#[test]
fn test_analog_write_sends_value() {
    let (client, probe) = demo_client();
    let arduino = ArduinoApi::new(client);

    arduino.analog_write("9", 128).unwrap();
    assert_eq!(last_request_args(&probe), vec!["aw", "9", "128"]);
    assert_eq!(arduino.analog_read("9").unwrap(), 128);
    assert_eq!(arduino.analog_read("A0").unwrap(), 512);
}

#[test]
fn test_millis_and_pulse() {
    let (client, probe) = demo_client();
    let arduino = ArduinoApi::new(client);

    assert!(arduino.millis().unwrap() >= 0);
    assert_eq!(
        probe.runs().last().unwrap().clone(),
        b"A\x000\x000\x00m\x00".to_vec()
    );

    arduino.digital_write("7", PinLevel::High).unwrap();
    assert_eq!(arduino.pulse_in("7", PinLevel::High).unwrap(), 1500);
    assert_eq!(arduino.pulse_in("7", PinLevel::Low).unwrap(), 0);
}

#[test]
fn test_shift_out_argument_order() {
    let (client, probe) = demo_client();
    let arduino = ArduinoApi::new(client);

    arduino
        .shift_out("11", "12", BitOrder::MsbFirst, 0xA5)
        .unwrap();
    assert_eq!(last_request_args(&probe), vec!["s", "11", "12", "1", "165"]);
}

#[test]
fn test_wire_begin_as_master_drops_address() {
    let (client, probe) = demo_client();
    let wire = Wire::new(client);

    wire.begin(None).unwrap();
    assert_eq!(
        probe.runs().last().unwrap().clone(),
        b"Wire\x000\x000\x00begin\x00".to_vec()
    );

    wire.begin(Some(I2cAddress(8))).unwrap();
    assert_eq!(last_request_args(&probe), vec!["begin", "8"]);
}

#[test]
fn test_master_send_and_request() {
    let (client, probe) = demo_client();
    let master = I2cMaster::new(Wire::new(client));

    master.send(I2cAddress(0x3C), b"hi").unwrap();
    let data = master.request(I2cAddress(0x3C), 4).unwrap();
    assert_eq!(data, b"hihi".to_vec());

    // the bus is joined only once
    let begins = probe
        .runs()
        .iter()
        .filter_map(|run| decode_request(run))
        .filter(|r| r.args[0] == "begin")
        .count();
    assert_eq!(begins, 1);
}

#[test]
fn test_master_send_to_missing_device() {
    let (client, _probe) = demo_client();
    let master = I2cMaster::new(Wire::new(client));

    match master.send(I2cAddress(0x10), &[1, 2]) {
        Err(ProtocolError::Communication(status)) => {
            assert_eq!(status, I2cStatus::AddressNack)
        }
        other => panic!("expected NACK, got {:?}", other),
    }
}

#[test]
fn test_master_request_short_read() {
    let (client, _probe) = demo_client();
    let master = I2cMaster::new(Wire::new(client));

    assert!(master.request(I2cAddress(0x11), 3).unwrap().is_empty());
}

#[test]
fn test_scan_finds_demo_peripherals() {
    let (client, _probe) = demo_client();
    let master = I2cMaster::new(Wire::new(client));

    let found = master.scan().unwrap();
    let expected: Vec<I2cAddress> = DEMO_I2C_ADDRESSES.iter().map(|&a| I2cAddress(a)).collect();
    assert_eq!(found, expected);
}

#[test]
fn test_scan_aborts_on_transport_failure() {
    let (device, _probe) = ScriptedDevice::silent();
    let mut config = ConnectionConfig::new("dead", 115200);
    config.read_timeout_ms = 20;
    let client = Client::with_config(config);
    client.open_with(Box::new(device)).unwrap();

    let master = I2cMaster::new(Wire::new(client.clone()));
    assert!(master.scan().unwrap_err().is_timeout());
    assert_eq!(client.state(), ConnectionState::Suspect);
}

#[test]
fn test_slave_receive_and_write() {
    let (client, probe) = demo_client();
    let slave = I2cSlave::new(Wire::new(client), I2cAddress(0x68));

    let received = slave.receive().unwrap();
    assert!(received.is_empty());
    assert_eq!(slave.write(b"ab").unwrap(), 2);
    assert_eq!(last_request_args(&probe), vec!["write", "98"]);
    assert_eq!(slave.address(), Some(I2cAddress(0x68)));
}

#[test]
fn test_slave_receive_available_bytes() {
    let (client, _probe) = demo_client();
    let wire = Wire::new(client.clone());
    let slave = I2cSlave::new(Wire::new(client), I2cAddress(0x68));

    // leave bytes pending without reading them
    assert_eq!(wire.request_from(I2cAddress(0x68), 3, true).unwrap(), 3);
    assert_eq!(slave.receive().unwrap(), b"nan".to_vec());
}

#[test]
fn test_remote_object_custom_namespace() {
    let (device, probe) = ScriptedDevice::replying("3.25");
    let client = Client::with_config(ConnectionConfig::new("test", 115200));
    client.open_with(Box::new(device)).unwrap();

    let servo = RemoteObject::new(client, "Servo", 2);
    assert_eq!(servo.call_float("read", params![]).unwrap(), 3.25);
    assert_eq!(
        probe.written(),
        b"Servo\x002\x000\x00read\x00".to_vec()
    );
}
