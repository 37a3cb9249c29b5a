use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "esc-pilot", about = "BLDC ESC speed control & telemetry monitor over UART")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Poll telemetry every 500 ms, print it and log it to CSV
    Monitor(MonitorOpts),
    /// Send a single speed setpoint and exit
    SetSpeed(SetSpeedOpts),
    /// Step the target speed through the test sequence while logging telemetry
    Sweep(SweepOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = 230_400)]
    pub baud: u32,
}

#[derive(Args, Debug, Clone)]
pub struct MonitorOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Directory for telemetry_log.csv / oscillation_log.csv
    #[arg(long, default_value = ".")]
    pub log_dir: String,
    /// Stop after this many seconds (default: run until killed)
    #[arg(long)]
    pub secs: Option<f64>,
    /// Print skipped poll cycles
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SetSpeedOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Target speed in rpm
    #[arg(long)]
    pub rpm: u16,
}

#[derive(Args, Debug, Clone)]
pub struct SweepOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Directory for telemetry_log.csv / oscillation_log.csv
    #[arg(long, default_value = ".")]
    pub log_dir: String,
    /// Print each sample as it arrives
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}
