use anyhow::Result;

use crate::cli::SetSpeedOpts;
use crate::link::Link;
use crate::port::open_port;

pub fn run(opts: SetSpeedOpts) -> Result<()> {
    let port = open_port(&opts.ser)?;
    let mut link = Link::new(port);
    link.set_speed(opts.rpm)?;
    eprintln!("[set-speed] sent {} rpm to {}", opts.rpm, opts.ser.dev);
    Ok(())
}
