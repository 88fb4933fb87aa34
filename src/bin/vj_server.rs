use clap::Parser;
use vjserver_rust::{common::box_error::BoxError, vj::client};

/// Live visual performance server: OSC control listener plus the
/// transform-feedback particle pipeline.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// settings file (defaults to settings.json)
    #[arg(short, long)]
    config: Option<String>,

    /// control listener port, overrides the settings file
    #[arg(short, long)]
    port: Option<u16>,

    /// use the connection-oriented control transport
    #[arg(long)]
    tcp: bool,
}

fn main() -> Result<(), BoxError> {
    env_logger::init();
    let args = Args::parse();
    client::run(args.config.as_deref(), args.port, args.tcp)?;
    Ok(())
}
