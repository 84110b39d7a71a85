//! # armctl
//!
//! Host-side controller for a six-joint hobby robotic arm driven over a
//! newline-delimited ASCII serial protocol.
//!
//! ## Architecture
//!
//! armctl is organized as a workspace with multiple crates:
//!
//! 1. **armctl-core** - Joint model, pose snapshots, state enums, errors
//! 2. **armctl-communication** - Wire codec, transports, connection manager, protocol engine
//! 3. **armctl-settings** - Configuration and sequence catalog files
//! 4. **armctl** - Terminal console binary that integrates all crates
//!
//! ## Features
//!
//! - **Joint Control**: Per-joint moves with local bounds checks
//! - **Presets**: Device gestures plus paced pick/place and wave expansions
//! - **Teaching**: Sequence recording, replay, deletion and catalog listing
//! - **Connection Protocols**: Serial/USB and TCP serial bridges

pub mod console;

pub use armctl_communication::{
    list_ports, ArmController, ArmEvent, ConnectionParams, ControllerConfig, EventReceiver,
    OutgoingCommand, Preset, SerialPortInfo,
};
pub use armctl_core::{
    ArmPose, ConnectionState, Error, JointId, RecorderState, Result, SequenceEntry,
};
pub use armctl_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Pretty output on stderr, leaving stdout to the console
/// - RUST_LOG environment variable support (default `info`)
/// - Thread names, so receive loop lines show as `armctl-rx`
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
