use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::packet::MotorState;
use crate::sampler::TelemetryEvent;

/// CSV sinks for telemetry rows and oscillation rows. Layout matches what
/// the analysis scripts already consume; every row is flushed as written.
pub struct LogFiles {
    telemetry: BufWriter<File>,
    oscillation: BufWriter<File>,
}

impl LogFiles {
    pub fn create(dir: &Path) -> Result<Self> {
        let mut telemetry = BufWriter::new(create_file(&dir.join("telemetry_log.csv"))?);
        let mut oscillation = BufWriter::new(create_file(&dir.join("oscillation_log.csv"))?);
        writeln!(telemetry, "Time,DutyCycle,ReferenceSpeed,AverageSpeed,MotorState")?;
        writeln!(oscillation, "Time,Oscillation (%) (avg),Oscillation (%) (ref)")?;
        telemetry.flush()?;
        oscillation.flush()?;
        Ok(Self {
            telemetry,
            oscillation,
        })
    }

    pub fn append(&mut self, ev: &TelemetryEvent) -> Result<()> {
        let f = &ev.frame;
        writeln!(
            self.telemetry,
            "{:.3},{},{},{},{}",
            ev.timestamp,
            f.duty_cycle,
            f.reference_speed,
            f.average_speed,
            MotorState::from_code(f.motor_state)
        )?;
        self.telemetry.flush()?;
        if let Some(osc) = ev.oscillation {
            writeln!(
                self.oscillation,
                "{:.3},{:.2},{:.2}",
                ev.timestamp, osc.pct_dev_mean, osc.pct_dev_ref
            )?;
            self.oscillation.flush()?;
        }
        Ok(())
    }
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("create {}", path.display()))
}
