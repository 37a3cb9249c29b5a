use anyhow::Result;
use clap::Parser;

mod cli;
mod crc;
mod history;
mod link;
mod logfile;
mod monitor;
mod packet;
mod port;
mod sampler;
mod setspeed;
mod sweep;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    match args.cmd {
        cli::Cmd::Monitor(opts) => monitor::run(opts),
        cli::Cmd::SetSpeed(opts) => setspeed::run(opts),
        cli::Cmd::Sweep(opts) => sweep::run(opts),
    }
}
