//! Sonar test harness. Opens the controller's serial port (or a simulated
//! controller), powers the transducers on, and polls the range channels
//! until told to stop.

// Example:
// RUST_LOG=info cargo run --bin sonar -- --port /dev/ttyUSB0 monitor --scale 10
// RUST_LOG=info cargo run --bin sonar -- --dummy log --cycles 20

use clap::Parser;
use sonarbox::{
    args::{LogCommand, RecordCommand, SonarArgs, SonarTask},
    channel::{ByteChannel, SerialChannel},
    config::SonarConfig,
    dummy_sonar::DummySonar,
    gui::{bar_graph, device_selector},
    session::SonarSession,
    sink::{pump, LogSink, RecordSink},
};

use log::{error, info};
use serial2::SerialPort;
use std::{error::Error, path::PathBuf, process::exit};

fn main() {
    env_logger::init();
    let args = SonarArgs::parse();

    let file_config = match &args.config {
        Some(path) => match SonarConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load config {}: {}", path.display(), e);
                exit(1);
            }
        },
        None => SonarConfig::default(),
    };
    let config = args.apply_to(file_config);

    let outcome = if args.dummy {
        info!("Using a simulated controller");
        let num_channels = config.protocol.channels.iter().copied().max().unwrap_or(0);
        let sonar = DummySonar::builder()
            .num_channels(num_channels as usize)
            .build();
        run(sonar, &args.command, config)
    } else {
        let Some(port) = resolve_port(&config) else {
            error!("No serial port selected");
            exit(1);
        };
        let channel = match SerialChannel::open(&port, &config.line) {
            Ok(channel) => channel,
            Err(e) => {
                error!("Unable to open {}: {}", port.display(), e);
                exit(1);
            }
        };
        info!("Serial port {} opened.", port.display());
        run(channel, &args.command, config)
    };

    if let Err(e) = outcome {
        error!("{}", e);
        exit(1);
    }
}

/// The configured port, or whichever one the user picks from the list.
fn resolve_port(config: &SonarConfig) -> Option<PathBuf> {
    if let Some(port) = &config.port {
        return Some(port.clone());
    }

    let available_ports = match SerialPort::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            error!("Failed to list serial ports: {}", e);
            return None;
        }
    };
    match device_selector(available_ports, &config.line) {
        Ok(choice) => choice,
        Err(e) => {
            error!("Device selector failed: {}", e);
            None
        }
    }
}

fn run<C>(channel: C, task: &SonarTask, config: SonarConfig) -> Result<(), Box<dyn Error>>
where
    C: ByteChannel + Send + 'static,
{
    let mut session = SonarSession::new(channel, config.protocol);
    session.start()?;

    match task {
        SonarTask::Monitor(_) => {
            let shown = bar_graph(session, config.display)?;
            info!("Displayed {} readings", shown);
        }
        SonarTask::Log(LogCommand { cycles }) => {
            pump(&mut session, &mut LogSink, *cycles)?;
        }
        SonarTask::Record(RecordCommand { outfile, cycles }) => {
            let mut sink = RecordSink::create(outfile)?;
            pump(&mut session, &mut sink, *cycles)?;
        }
    }

    Ok(())
}
