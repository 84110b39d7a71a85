use anyhow::Context;
use armctl::{console, init_logging, list_ports, ArmController, Config, BUILD_DATE, VERSION};
use clap::Parser;
use std::path::PathBuf;

/// Terminal console for the six-joint serial arm
#[derive(Debug, Parser)]
#[command(name = "armctl", version, about)]
struct Args {
    /// Config file (.toml or .json); defaults to the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// List candidate serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Serial port or host:port, overriding the configured one
    port: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;
    tracing::info!("armctl {} (built {})", VERSION, BUILD_DATE);

    if args.list_ports {
        for port in list_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_or_default()?,
    };
    let params = config.connection_params(args.port.as_deref());

    let controller = ArmController::with_default_transport(config.controller_config());
    let mut events = controller.subscribe();
    let subscription = events.id();
    let printer = std::thread::Builder::new()
        .name("armctl-events".to_string())
        .spawn(move || {
            while let Some(event) = events.blocking_recv() {
                println!("< {}", event);
            }
        })?;

    controller
        .connect(&params)
        .with_context(|| format!("connecting to '{}'", params.port))?;
    if let Some(speed) = config.motion.default_speed_ms {
        controller.set_speed(speed)?;
    }

    println!("Connected to {}. Type 'help' for commands.", params.port);
    let result = console::run(&controller, std::io::stdin().lock());

    controller.disconnect();
    controller.unsubscribe(subscription);
    if printer.join().is_err() {
        tracing::error!("Event printer panicked");
    }

    result
}
