use clap::{App, Arg};
use colored::*;
use pwrmgr::config::Document;
use pwrmgr::fault::TracingSink;
use pwrmgr::manager::{BusEvent, Manager};
use pwrmgr::pmbus::RegisterAccess;
use pwrmgr::sim::SimulatedBus;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};

/// One line of JSON on stdin: a platform event, or a register value to
/// place on the simulated bus.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Event(BusEvent),
    Register { device: String, command: String, value: u16 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("pwrmgr")
        .version("0.1.0")
        .author("Platform Power Engineering Team")
        .about("Regulator configuration and power supply fault monitoring")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration document")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("poll-ms")
                .long("poll-ms")
                .value_name("MS")
                .help("Override the poll interval")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("debounce-ms")
                .long("debounce-ms")
                .value_name("MS")
                .help("Override the power-on debounce interval")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let path = matches.value_of("config").unwrap_or_default();
    let mut document = Document::load(path)?;
    if let Some(ms) = matches.value_of("poll-ms") {
        document.manager.poll_interval_ms = ms.parse()?;
    }
    if let Some(ms) = matches.value_of("debounce-ms") {
        document.manager.power_on_debounce_ms = ms.parse()?;
    }

    println!("{}", "⚡ pwrmgr - power fault monitor".bright_blue().bold());
    println!(
        "{} {} ({} chassis, {} power supplies, {} sequencers)",
        "Configuration".dimmed(),
        path,
        document.chassis.len(),
        document.power_supplies.len(),
        document.sequencers.len()
    );

    let bus = SimulatedBus::new();
    let factory = |id: &str, _bus: u8, _address: u16| -> Box<dyn RegisterAccess> { Box::new(bus.device(id)) };
    let system = document.build_system(factory)?;
    let monitors = document.build_monitors(factory)?;

    let mut manager = Manager::new(document.manager.clone(), TracingSink::new()).with_system(system);
    for monitor in monitors {
        manager.add_monitor(monitor);
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let input = tokio::spawn(read_input(bus.clone(), event_tx));

    manager
        .run(event_rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    input.abort();
    info!(
        polls = manager.polls(),
        faults = manager.sink().faults_logged(),
        "shutdown complete"
    );
    println!("{}", "pwrmgr stopped".bright_green());
    Ok(())
}

async fn read_input(bus: SimulatedBus, events: mpsc::UnboundedSender<BusEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<InputLine>(&line) {
                Ok(InputLine::Event(event)) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Ok(InputLine::Register { device, command, value }) => {
                    info!(device = %device, command = %command, value, "register set");
                    bus.set_register(&device, &command, value);
                }
                Err(e) => warn!("Ignoring input line: {}", e),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("stdin error: {}", e);
                break;
            }
        }
    }
}
