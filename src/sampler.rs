use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};

use crate::history::{Oscillation, SpeedHistory};
use crate::link::Link;
use crate::packet::{Command, DecodeError, Telemetry, decode_telemetry};

/// Telemetry poll cadence. A dropped cycle costs one interval, nothing more.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One validated telemetry frame plus the window statistics, if the history
/// has enough samples to compute them.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryEvent {
    /// Seconds since the Unix epoch at decode time.
    pub timestamp: f64,
    pub frame: Telemetry,
    pub oscillation: Option<Oscillation>,
}

/// Periodic telemetry poller. Owns the link behind a mutex so the poll
/// thread and foreground `set_speed` calls can never interleave frames on
/// the half-duplex line. Stopped until `start`, stopped again for good after
/// `stop`.
pub struct Sampler<S> {
    link: Arc<Mutex<Link<S>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<()>>>,
    interval: Duration,
    debug: bool,
}

impl<S: Read + Write + Send + 'static> Sampler<S> {
    pub fn new(link: Link<S>, debug: bool) -> Self {
        Self {
            link: Arc::new(Mutex::new(link)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            interval: POLL_INTERVAL,
            debug,
        }
    }

    #[cfg(test)]
    fn with_interval(link: Link<S>, interval: Duration) -> Self {
        let mut s = Self::new(link, false);
        s.interval = interval;
        s
    }

    /// Spawn the poll loop, delivering one event per validated frame to
    /// `on_sample`. No-op if already running.
    pub fn start<F>(&mut self, on_sample: F)
    where
        F: FnMut(TelemetryEvent) + Send + 'static,
    {
        if self.worker.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        let link = Arc::clone(&self.link);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let debug = self.debug;
        self.worker = Some(thread::spawn(move || {
            poll_loop(&link, &running, interval, debug, on_sample)
        }));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Issue a speed setpoint. Blocks while a poll exchange is in flight;
    /// frames must not interleave on the half-duplex line.
    pub fn set_speed(&self, rpm: u16) -> Result<()> {
        lock_link(&self.link)?.set_speed(rpm)
    }

    /// Clear the run flag and join the poll thread. The loop finishes its
    /// current cycle first. Surfaces the loop's fatal link error, if any.
    pub fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| anyhow!("sampler thread panicked"))??;
        }
        Ok(())
    }
}

fn lock_link<S>(link: &Mutex<Link<S>>) -> Result<MutexGuard<'_, Link<S>>> {
    link.lock().map_err(|_| anyhow!("link lock poisoned"))
}

fn poll_loop<S, F>(
    link: &Mutex<Link<S>>,
    running: &AtomicBool,
    interval: Duration,
    debug: bool,
    mut on_sample: F,
) -> Result<()>
where
    S: Read + Write,
    F: FnMut(TelemetryEvent),
{
    let mut history = SpeedHistory::new();
    while running.load(Ordering::SeqCst) {
        if let Err(e) = poll_cycle(link, &mut history, debug, &mut on_sample) {
            // fatal link failure: report, halt, no reconnect
            running.store(false, Ordering::SeqCst);
            eprintln!("[sampler] link failure, stopping: {e:#}");
            return Err(e);
        }
        thread::sleep(interval);
    }
    Ok(())
}

/// One request/decode/emit cycle. Decode failures skip the cycle (the next
/// tick self-corrects); only transport I/O errors propagate.
fn poll_cycle<S, F>(
    link: &Mutex<Link<S>>,
    history: &mut SpeedHistory,
    debug: bool,
    on_sample: &mut F,
) -> Result<()>
where
    S: Read + Write,
    F: FnMut(TelemetryEvent),
{
    let reply = lock_link(link)?.exchange(Command::TelemetryRequest)?;
    match decode_telemetry(&reply) {
        Ok(frame) => {
            history.push(frame.average_speed);
            on_sample(TelemetryEvent {
                timestamp: unix_now(),
                frame,
                oscillation: history.oscillation(frame.reference_speed),
            });
        }
        Err(err @ DecodeError::ChecksumMismatch { .. }) => {
            eprintln!("[sampler] dropped frame: {err}");
        }
        Err(DecodeError::Incomplete(n)) => {
            if debug {
                eprintln!("[sampler] no telemetry this cycle ({n} bytes)");
            }
        }
    }
    Ok(())
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc8;
    use crate::link::testutil::FakePort;
    use crate::packet::TELEMETRY_LEN;
    use std::sync::mpsc;

    fn frame(reference: u16, average: u16) -> [u8; TELEMETRY_LEN] {
        let [r_lo, r_hi] = reference.to_le_bytes();
        let [a_lo, a_hi] = average.to_le_bytes();
        let mut buf = [0x10, 0x00, r_lo, r_hi, a_lo, a_hi, 0x06, 0x00];
        buf[7] = crc8(&buf[..7]);
        buf
    }

    fn collect_cycle(canned: &[u8]) -> (Vec<TelemetryEvent>, SpeedHistory) {
        let link = Mutex::new(Link::new(FakePort::new(canned)));
        let mut history = SpeedHistory::new();
        let mut events = Vec::new();
        poll_cycle(&link, &mut history, false, &mut |ev| events.push(ev)).unwrap();
        (events, history)
    }

    #[test]
    fn valid_frame_emits_event() {
        let (events, _) = collect_cycle(&frame(6000, 5990));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].frame.reference_speed, 6000);
        assert_eq!(events[0].frame.average_speed, 5990);
        // single sample: below the oscillation minimum
        assert!(events[0].oscillation.is_none());
        assert!(events[0].timestamp > 0.0);
    }

    #[test]
    fn corrupt_frame_emits_nothing() {
        let mut bad = frame(6000, 5990);
        bad[4] ^= 0xFF;
        let (events, _) = collect_cycle(&bad);
        assert!(events.is_empty());
    }

    #[test]
    fn quiet_line_emits_nothing() {
        let (events, _) = collect_cycle(&[]);
        assert!(events.is_empty());
    }

    #[test]
    fn oscillation_appears_after_ten_samples() {
        let link = Mutex::new(Link::new(FakePort::new(&[])));
        let mut history = SpeedHistory::new();
        let mut last = None;
        for i in 0..10u16 {
            let mut guard = link.lock().unwrap();
            guard.stream_mut().rx.extend(frame(100, 100 + i));
            drop(guard);
            poll_cycle(&link, &mut history, false, &mut |ev| last = Some(ev)).unwrap();
        }
        let osc = last.unwrap().oscillation.expect("ten samples in history");
        assert!(osc.pct_dev_mean > 0.0);
    }

    #[test]
    fn start_stop_delivers_all_frames_and_joins() {
        let mut canned = Vec::new();
        for avg in [5000u16, 5010, 4990] {
            canned.extend_from_slice(&frame(5000, avg));
        }
        let link = Link::new(FakePort::new(&canned));
        let mut sampler = Sampler::with_interval(link, Duration::from_millis(1));

        let (tx, rx) = mpsc::channel();
        sampler.start(move |ev| {
            let _ = tx.send(ev);
        });
        assert!(sampler.is_running());

        let mut got = Vec::new();
        for _ in 0..3 {
            got.push(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        sampler.stop().unwrap();
        assert!(!sampler.is_running());
        assert_eq!(
            got.iter().map(|ev| ev.frame.average_speed).collect::<Vec<_>>(),
            vec![5000, 5010, 4990]
        );
    }

    #[test]
    fn set_speed_goes_out_while_stopped() {
        let link = Link::new(FakePort::new(&[]));
        let sampler = Sampler::with_interval(link, Duration::from_millis(1));
        sampler.set_speed(4500).unwrap();
    }
}
