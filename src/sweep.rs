use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use crate::cli::SweepOpts;
use crate::link::Link;
use crate::logfile::LogFiles;
use crate::port::open_port;
use crate::sampler::{Sampler, TelemetryEvent};

/// Target-speed test sequence: 4000 → 8000 rpm in 1000 rpm steps.
pub const SWEEP_START: u16 = 4000;
pub const SWEEP_END: u16 = 8000;
pub const SWEEP_STEP: u16 = 1000;
/// Dwell at each setpoint long enough for the control loop to settle.
pub const HOLD: Duration = Duration::from_secs(5);

pub fn run(opts: SweepOpts) -> Result<()> {
    let port = open_port(&opts.ser)?;
    let mut logs = LogFiles::create(Path::new(&opts.log_dir))?;
    let mut sampler = Sampler::new(Link::new(port), opts.debug);

    let (events_tx, events_rx) = mpsc::channel::<TelemetryEvent>();
    sampler.start(move |ev| {
        let _ = events_tx.send(ev);
    });

    for target in steps() {
        sampler.set_speed(target)?;
        eprintln!("[sweep] target {target} rpm, holding {}s", HOLD.as_secs());
        let hold_until = Instant::now() + HOLD;
        loop {
            let now = Instant::now();
            if now >= hold_until {
                break;
            }
            match events_rx.recv_timeout(hold_until - now) {
                Ok(ev) => {
                    if opts.debug {
                        eprintln!(
                            "[sweep] avg={} ref={}",
                            ev.frame.average_speed, ev.frame.reference_speed
                        );
                    }
                    logs.append(&ev)?;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {}
            }
            if !sampler.is_running() {
                sampler.stop().context("link failed mid-sweep")?;
                bail!("sampler stopped unexpectedly mid-sweep");
            }
        }
    }

    sampler.set_speed(0)?;
    eprintln!("[sweep] done, target back to 0 rpm");
    sampler.stop().context("telemetry sampler")
}

fn steps() -> impl Iterator<Item = u16> {
    (SWEEP_START..=SWEEP_END).step_by(SWEEP_STEP as usize)
}
