//! Demo Mode - in-memory devices and a simulated board
//!
//! [`ScriptedDevice`] stands in for a serial port: it records every byte
//! flushed to it and answers each flushed request through a responder
//! closure. [`DemoBoard`] is a responder that behaves like a board running
//! the nango firmware, with a few digital/analog pins and two I2C
//! peripherals, so the facades can be exercised without hardware.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::protocol::codec::{decode_request, Request};
use crate::protocol::Device;

/// Reply the demo board gives to calls without a return value
pub const ACK: &str = "ok";

/// I2C addresses the demo board has peripherals on
pub const DEMO_I2C_ADDRESSES: [u8; 2] = [0x3C, 0x68];

/// Bytes a demo peripheral returns before anything was written to it
const DEMO_PERIPHERAL_DATA: &[u8] = b"nango";

type Responder = Box<dyn FnMut(&[u8]) -> Option<String> + Send>;

#[derive(Debug, Default)]
struct ProbeState {
    input: VecDeque<u8>,
    pending: Vec<u8>,
    written: Vec<u8>,
    runs: Vec<Vec<u8>>,
    flushes: usize,
    input_clears: usize,
    output_clears: usize,
    /// Failures to return from the next read, write or flush
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    flush_error: Option<io::ErrorKind>,
}

fn scripted_failure(kind: io::ErrorKind) -> io::Error {
    io::Error::new(kind, "scripted device failure")
}

/// Inspection handle for a [`ScriptedDevice`] after it was handed to a connection
#[derive(Debug, Clone, Default)]
pub struct DeviceProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl DeviceProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every byte flushed so far
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Bytes of each non-empty flush, in order
    pub fn runs(&self) -> Vec<Vec<u8>> {
        self.lock().runs.clone()
    }

    /// Number of `flush` calls
    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }

    /// Number of times pending input was discarded
    pub fn input_clears(&self) -> usize {
        self.lock().input_clears
    }

    /// Number of times unsent output was discarded
    pub fn output_clears(&self) -> usize {
        self.lock().output_clears
    }

    /// Make the next read fail with `kind`
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.lock().read_error = Some(kind);
    }

    /// Make the next write fail with `kind`; nothing of it is accepted
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.lock().write_error = Some(kind);
    }

    /// Make the next flush fail with `kind`; written bytes stay pending
    pub fn fail_next_flush(&self, kind: io::ErrorKind) {
        self.lock().flush_error = Some(kind);
    }

    /// Make bytes available to the next read, as if the firmware sent them
    pub fn push_input(&self, bytes: &[u8]) {
        self.lock().input.extend(bytes.iter().copied());
    }
}

/// In-memory device answering each flushed request with a scripted reply line
pub struct ScriptedDevice {
    state: Arc<Mutex<ProbeState>>,
    responder: Responder,
    read_timeout: Duration,
}

impl ScriptedDevice {
    /// Device whose replies come from `responder`.
    ///
    /// The responder gets the bytes of each flush and returns the reply line
    /// (without newline), or `None` to stay silent.
    pub fn new<F>(responder: F) -> (Self, DeviceProbe)
    where
        F: FnMut(&[u8]) -> Option<String> + Send + 'static,
    {
        let probe = DeviceProbe::default();
        let device = Self {
            state: Arc::clone(&probe.state),
            responder: Box::new(responder),
            read_timeout: Duration::from_millis(1),
        };
        (device, probe)
    }

    /// Device that answers every request with `reply`
    pub fn replying(reply: &str) -> (Self, DeviceProbe) {
        let reply = reply.to_string();
        Self::new(move |_| Some(reply.clone()))
    }

    /// Device that never answers
    pub fn silent() -> (Self, DeviceProbe) {
        Self::new(|_| None)
    }

    /// Device backed by a [`DemoBoard`]
    pub fn demo_board() -> (Self, DeviceProbe) {
        let mut board = DemoBoard::new();
        Self::new(move |request| board.respond(request))
    }

    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for ScriptedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if let Some(kind) = state.read_error.take() {
            return Err(scripted_failure(kind));
        }
        if state.input.is_empty() {
            drop(state);
            std::thread::sleep(self.read_timeout);
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(state.input.len());
        for (slot, byte) in buf.iter_mut().zip(state.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if let Some(kind) = state.write_error.take() {
            return Err(scripted_failure(kind));
        }
        state.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let run = {
            let mut state = self.lock();
            state.flushes += 1;
            if let Some(kind) = state.flush_error.take() {
                return Err(scripted_failure(kind));
            }
            let run = std::mem::take(&mut state.pending);
            if run.is_empty() {
                return Ok(());
            }
            state.written.extend_from_slice(&run);
            state.runs.push(run.clone());
            run
        };

        if let Some(reply) = (self.responder)(&run) {
            let mut state = self.lock();
            state.input.extend(reply.bytes());
            state.input.push_back(b'\n');
        }
        Ok(())
    }
}

impl Device for ScriptedDevice {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        state.input.clear();
        state.input_clears += 1;
        Ok(())
    }

    fn clear_output_buffer(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        state.pending.clear();
        state.output_clears += 1;
        Ok(())
    }
}

/// Simulated I2C bus state
#[derive(Debug, Default)]
struct WireState {
    /// Last bytes written to each peripheral
    peripherals: HashMap<u8, Vec<u8>>,
    /// Target of the open transmission
    tx_target: Option<u8>,
    tx_buf: Vec<u8>,
    /// Bytes received by the last requestFrom
    rx: VecDeque<u8>,
}

/// Simulated board running the nango firmware
#[derive(Debug)]
pub struct DemoBoard {
    started: Instant,
    digital: HashMap<String, i64>,
    analog: HashMap<String, i64>,
    modes: HashMap<String, i64>,
    wire: WireState,
}

impl Default for DemoBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBoard {
    /// Board with every pin low and the demo peripherals attached
    pub fn new() -> Self {
        let mut wire = WireState::default();
        for addr in DEMO_I2C_ADDRESSES {
            wire.peripherals.insert(addr, DEMO_PERIPHERAL_DATA.to_vec());
        }
        Self {
            started: Instant::now(),
            digital: HashMap::new(),
            analog: HashMap::new(),
            modes: HashMap::new(),
            wire,
        }
    }

    /// Answer one request; `None` for anything the firmware would not answer
    pub fn respond(&mut self, bytes: &[u8]) -> Option<String> {
        let request = decode_request(bytes)?;
        match request.namespace.as_str() {
            "A" => self.arduino(&request),
            "Wire" => self.wire(&request),
            _ => None,
        }
    }

    /// Mode last set for a pin
    pub fn pin_mode(&self, pin: &str) -> Option<i64> {
        self.modes.get(pin).copied()
    }

    fn arduino(&mut self, request: &Request) -> Option<String> {
        let (method, args) = request.args.split_first()?;
        match (method.as_str(), args) {
            ("dw", [pin, level]) => {
                self.digital.insert(pin.clone(), level.parse().ok()?);
                Some(ACK.to_string())
            }
            ("r", [pin]) => Some(self.digital.get(pin).copied().unwrap_or(0).to_string()),
            ("aw", [pin, value]) => {
                self.analog.insert(pin.clone(), value.parse().ok()?);
                Some(ACK.to_string())
            }
            ("a", [pin]) => Some(self.analog.get(pin).copied().unwrap_or(512).to_string()),
            ("pm", [pin, mode]) => {
                self.modes.insert(pin.clone(), mode.parse().ok()?);
                Some(ACK.to_string())
            }
            ("m", []) => Some(self.started.elapsed().as_millis().to_string()),
            // Simulated 1.5ms servo pulse, 0 when waiting for a level the pin never takes
            ("pi", [pin, level]) => {
                let current = self.digital.get(pin).copied().unwrap_or(0);
                let width = if current.to_string() == *level { 1500 } else { 0 };
                Some(width.to_string())
            }
            ("s", [_data, _clock, _order, value]) => {
                value.parse::<u8>().ok()?;
                Some("0".to_string())
            }
            _ => None,
        }
    }

    fn wire(&mut self, request: &Request) -> Option<String> {
        let (method, args) = request.args.split_first()?;
        let wire = &mut self.wire;
        match (method.as_str(), args) {
            ("begin", []) | ("begin", [_]) => Some(ACK.to_string()),
            ("requestFrom", [addr, quantity, _stop]) => {
                let addr: u8 = addr.parse().ok()?;
                let quantity: usize = quantity.parse().ok()?;
                wire.rx.clear();
                let Some(data) = wire.peripherals.get(&addr) else {
                    return Some("0".to_string());
                };
                wire.rx.extend(data.iter().copied().cycle().take(quantity));
                Some(wire.rx.len().to_string())
            }
            ("beginTransmission", [addr]) => {
                wire.tx_target = Some(addr.parse().ok()?);
                wire.tx_buf.clear();
                Some(ACK.to_string())
            }
            ("write", [value]) => {
                wire.tx_buf.push(value.parse().ok()?);
                Some(ACK.to_string())
            }
            ("endTransmission", [_stop]) => {
                let target = wire.tx_target.take();
                let data = std::mem::take(&mut wire.tx_buf);
                match target.and_then(|addr| wire.peripherals.get_mut(&addr)) {
                    Some(stored) => {
                        if !data.is_empty() {
                            *stored = data;
                        }
                        Some("0".to_string())
                    }
                    // NACK on transmit of address
                    None => Some("2".to_string()),
                }
            }
            ("available", []) => Some(wire.rx.len().to_string()),
            ("read", []) => match wire.rx.pop_front() {
                Some(byte) => Some((byte as char).to_string()),
                None => Some("-1".to_string()),
            },
            _ => None,
        }
    }
}
