use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::cli::MonitorOpts;
use crate::link::Link;
use crate::logfile::LogFiles;
use crate::packet::MotorState;
use crate::port::open_port;
use crate::sampler::{Sampler, TelemetryEvent};

pub fn run(opts: MonitorOpts) -> Result<()> {
    let port = open_port(&opts.ser)?;
    let mut logs = LogFiles::create(Path::new(&opts.log_dir))?;
    let mut sampler = Sampler::new(Link::new(port), opts.debug);

    let (events_tx, events_rx) = mpsc::channel::<TelemetryEvent>();
    sampler.start(move |ev| {
        let _ = events_tx.send(ev);
    });
    eprintln!("[monitor] polling {} at {} baud", opts.ser.dev, opts.ser.baud);

    let deadline = opts.secs.map(|s| Instant::now() + Duration::from_secs_f64(s));
    loop {
        if let Some(d) = deadline
            && Instant::now() >= d
        {
            break;
        }
        match events_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(ev) => {
                print_event(&ev);
                logs.append(&ev)?;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if !sampler.is_running() {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    sampler.stop().context("telemetry sampler")
}

fn print_event(ev: &TelemetryEvent) {
    let state = MotorState::from_code(ev.frame.motor_state);
    eprintln!(
        "[monitor] duty={} ref={} avg={} state={}",
        ev.frame.duty_cycle, ev.frame.reference_speed, ev.frame.average_speed, state
    );
    if let Some(osc) = ev.oscillation {
        eprintln!(
            "[monitor] oscillation avg={:.2}% ref={:.2}%",
            osc.pct_dev_mean, osc.pct_dev_ref
        );
    }
    if state.is_fault() {
        eprintln!("[monitor] controller reports fault: {state}");
    }
}
