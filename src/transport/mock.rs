//! In-memory transport.
//!
//! Replies are staged in advance and become readable at the next flush, which
//! is how a servo answers: the engine sends its instruction, clears the line
//! and only then the status packet comes in. Bytes injected with
//! [`MockTransport::inject`] are readable right away and model stale data left
//! on the line. With [`MockTransport::set_echo`] every byte sent is also
//! received, as on a half-duplex line.
use heapless::{Deque, Vec};

use super::{LinkError, Transport};

const RX_CAPACITY: usize = 64;
const SENT_CAPACITY: usize = 512;
const REPLY_CAPACITY: usize = 32;
const MAX_STAGED: usize = 16;

/// Transport double recording what is sent and replaying canned replies.
#[derive(Default)]
pub struct MockTransport {
    rx: Deque<u8, RX_CAPACITY>,
    replies: Deque<Vec<u8, REPLY_CAPACITY>, MAX_STAGED>,
    sent: Vec<u8, SENT_CAPACITY>,
    flushes: usize,
    fail_send: bool,
    echo: bool,
    last_bus: Option<u8>,
}

impl MockTransport {
    /// Empty transport, nothing staged.
    pub fn new() -> MockTransport {
        MockTransport::default()
    }
    /// Queues `reply` to be delivered after the next flush. An empty reply
    /// stands for a device that stays silent.
    pub fn stage_reply(&mut self, reply: &[u8]) -> Result<(), LinkError> {
        let frame = Vec::from_slice(reply).map_err(|_| LinkError::Fault)?;
        self.replies.push_back(frame).map_err(|_| LinkError::Fault)
    }
    /// Makes `bytes` readable immediately.
    pub fn inject(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        for &b in bytes {
            self.rx.push_back(b).map_err(|_| LinkError::Fault)?;
        }
        Ok(())
    }
    /// Every byte sent so far.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }
    /// Forgets the sent bytes.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
    /// Number of flushes performed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
    /// Number of staged replies not yet delivered.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
    /// Number of bytes waiting to be received.
    pub fn unread(&self) -> usize {
        self.rx.len()
    }
    /// Bus index of the last call.
    pub fn last_bus(&self) -> Option<u8> {
        self.last_bus
    }
    /// When set, every send fails.
    pub fn set_send_failure(&mut self, fail: bool) {
        self.fail_send = fail;
    }
    /// When set, every byte sent is also received.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }
}

impl Transport for MockTransport {
    fn send_byte(&mut self, bus: u8, byte: u8) -> Result<(), LinkError> {
        self.last_bus = Some(bus);
        if self.fail_send {
            return Err(LinkError::Fault);
        }
        if self.echo {
            self.rx.push_back(byte).map_err(|_| LinkError::Fault)?;
        }
        self.sent.push(byte).map_err(|_| LinkError::Fault)
    }
    fn receive_byte(&mut self, bus: u8, _timeout_ms: u32) -> Result<u8, LinkError> {
        self.last_bus = Some(bus);
        self.rx.pop_front().ok_or(LinkError::Timeout)
    }
    fn flush(&mut self, bus: u8) -> Result<(), LinkError> {
        self.last_bus = Some(bus);
        self.flushes += 1;
        self.rx.clear();
        if let Some(reply) = self.replies.pop_front() {
            for b in reply {
                self.rx.push_back(b).map_err(|_| LinkError::Fault)?;
            }
        }
        Ok(())
    }
}
