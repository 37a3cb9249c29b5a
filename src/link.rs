use anyhow::{Context, Result};
use std::io::{self, Read, Write};

use crate::packet::{Command, TELEMETRY_LEN};

/// Exclusive owner of the serial byte stream. The link is half-duplex: one
/// framed write, then at most one bounded read, and nothing may interleave.
/// Callers that share a `Link` across threads must wrap it in a mutex.
pub struct Link<S> {
    stream: S,
}

impl<S: Read + Write> Link<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// One write-then-optional-read exchange. SetSpeed gets no reply; a
    /// telemetry request is answered by up to 8 bytes within the port
    /// timeout. Short and empty reads are passed through untouched — the
    /// codec's `Incomplete` outcome is how callers see a quiet cycle.
    pub fn exchange(&mut self, cmd: Command) -> Result<Vec<u8>> {
        let frame = cmd.encode();
        self.stream.write_all(&frame).context("serial write")?;
        self.stream.flush().context("serial flush")?;

        if !cmd.expects_reply() {
            return Ok(Vec::new());
        }

        let mut buf = [0u8; TELEMETRY_LEN];
        let mut got = 0;
        while got < TELEMETRY_LEN {
            match self.stream.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("serial read"),
            }
        }
        Ok(buf[..got].to_vec())
    }

    pub fn set_speed(&mut self, rpm: u16) -> Result<()> {
        self.exchange(Command::SetSpeed { rpm })?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn stream(&self) -> &S {
        &self.stream
    }

    #[cfg(test)]
    pub(crate) fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::FakePort;
    use super::*;
    use crate::crc::crc8;

    fn telemetry_frame() -> [u8; TELEMETRY_LEN] {
        let mut buf = [0x00, 0x02, 0x70, 0x17, 0x64, 0x17, 0x06, 0x00];
        buf[7] = crc8(&buf[..7]);
        buf
    }

    #[test]
    fn set_speed_writes_frame_and_reads_nothing() {
        let mut link = Link::new(FakePort::new(&telemetry_frame()));
        link.set_speed(0x1234).unwrap();
        assert_eq!(link.stream().tx, vec![0x01, 0x34, 0x12, crc8(&[0x01, 0x34, 0x12])]);
        // reply queue untouched: no read was issued
        assert_eq!(link.stream().rx.len(), TELEMETRY_LEN);
    }

    #[test]
    fn telemetry_exchange_returns_full_reply() {
        let frame = telemetry_frame();
        let mut link = Link::new(FakePort::new(&frame));
        let reply = link.exchange(Command::TelemetryRequest).unwrap();
        assert_eq!(reply, frame.to_vec());
        assert_eq!(link.stream().tx, vec![0x02, 0x00, 0x00, 0xD6]);
    }

    #[test]
    fn timeout_yields_empty_reply_not_error() {
        let mut link = Link::new(FakePort::new(&[]));
        let reply = link.exchange(Command::TelemetryRequest).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn partial_reply_passed_through_as_is() {
        let mut link = Link::new(FakePort::new(&[0xAA, 0xBB, 0xCC]));
        let reply = link.exchange(Command::TelemetryRequest).unwrap();
        assert_eq!(reply, vec![0xAA, 0xBB, 0xCC]);
    }
}
