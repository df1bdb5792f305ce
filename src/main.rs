//! Activimeter console
//!
//! Serial console for Veenstra VIK-202 class dose calibrators: polls the
//! ionization chamber once per second, converts readings into clinical
//! units, applies decay back-correction to a reference time, and takes
//! manual device commands.
//!
//! # Usage
//!
//! ```bash
//! # List serial ports
//! activimeter ports
//!
//! # Probe every port for the calibrator
//! activimeter detect
//!
//! # Poll with the interactive console attached
//! activimeter run --isotope Tc-99m --unit mCi
//!
//! # One-shot raw command
//! activimeter send -p /dev/ttyUSB0 '!GV'
//!
//! # Catalog and command reference
//! activimeter isotopes list
//! activimeter commands
//! ```

mod activity;
mod isotopes;
mod protocol;
#[cfg(feature = "serial")]
mod serial;
#[cfg(feature = "serial")]
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use isotopes::Catalog;
use protocol::COMMAND_REFERENCE;

#[cfg(feature = "serial")]
use activity::Unit;
#[cfg(feature = "serial")]
use std::io::{BufRead, Write};
#[cfg(feature = "serial")]
use std::sync::atomic::Ordering;
#[cfg(feature = "serial")]
use std::sync::mpsc::Receiver;
#[cfg(feature = "serial")]
use std::time::Duration;

#[cfg(feature = "serial")]
use anyhow::anyhow;
#[cfg(feature = "serial")]
use chrono::Local;

#[cfg(feature = "serial")]
use protocol::Command;
#[cfg(feature = "serial")]
use serial::{port::PortConfig, SerialConnection};
#[cfg(feature = "serial")]
use session::{console, Outcome, Selection, Session, SessionEvent, UNAVAILABLE};

/// Activimeter console
///
/// Dose calibrator console with unit conversion and decay correction
#[derive(Parser)]
#[command(name = "activimeter")]
#[command(version = "0.1.0")]
#[command(about = "Dose calibrator console with unit conversion and decay correction")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports (requires --features serial)
    #[cfg(feature = "serial")]
    Ports,

    /// Probe every serial port for the calibrator
    #[cfg(feature = "serial")]
    Detect,

    /// Connect and poll with the interactive console
    #[cfg(feature = "serial")]
    Run {
        /// Serial port path; probes all ports when omitted
        #[arg(short, long)]
        port: Option<String>,

        /// Isotope selected at startup
        #[arg(short, long, default_value = isotopes::DEFAULT_ISOTOPE)]
        isotope: String,

        /// Display unit (MBq, kBq, mCi, µCi)
        #[arg(short, long, default_value = activity::DEFAULT_UNIT.label())]
        unit: Unit,

        /// TOML catalog extension file
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Write a timestamped transcript to this file
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Disable timestamps on console output
        #[arg(long)]
        no_timestamps: bool,
    },

    /// Send a single command and print the response
    #[cfg(feature = "serial")]
    Send {
        /// Serial port path
        #[arg(short, long)]
        port: String,

        /// Command text, sent with a trailing carriage return
        command: String,
    },

    /// Isotope catalog operations
    #[command(subcommand)]
    Isotopes(IsotopeCommands),

    /// Print the device command reference
    Commands,
}

#[derive(Subcommand)]
enum IsotopeCommands {
    /// List catalog entries
    List {
        /// TOML catalog extension file
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Show one catalog entry
    Show {
        /// Isotope name (e.g. Tc-99m)
        name: String,

        /// TOML catalog extension file
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        #[cfg(feature = "serial")]
        Commands::Ports => serial::port::print_ports(),
        #[cfg(feature = "serial")]
        Commands::Detect => handle_detect(),
        #[cfg(feature = "serial")]
        Commands::Run {
            port,
            isotope,
            unit,
            catalog,
            log,
            no_timestamps,
        } => handle_run(port, isotope, unit, catalog.as_deref(), log, !no_timestamps),
        #[cfg(feature = "serial")]
        Commands::Send { port, command } => handle_send(&port, command),
        Commands::Isotopes(cmd) => handle_isotopes(cmd),
        Commands::Commands => handle_commands(),
    }
}

/// Build the catalog, merging an extension file over the builtins
fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let mut catalog = Catalog::builtin();
    if let Some(path) = path {
        let merged = catalog.merge_file(path)?;
        log::info!("Merged {} isotope(s) from {}", merged, path.display());
    }
    Ok(catalog)
}

#[cfg(feature = "serial")]
fn handle_detect() -> Result<()> {
    let ports = serial::port::list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        return Ok(());
    }

    for info in &ports {
        println!("{} Probing {}...", "[*]".cyan().bold(), info.path.white());
        match serial::probe::probe_port(&info.path) {
            Ok(Some(_)) => {
                println!(
                    "{} Calibrator answering on {}",
                    "[OK]".green().bold(),
                    info.path.white().bold()
                );
                println!("\n{}", "To start polling:".cyan());
                println!("  activimeter run --port {}", info.path);
                return Ok(());
            }
            Ok(None) => println!("    no answer"),
            Err(e) => println!("    {} {}", "[skip]".dimmed(), e),
        }
    }

    println!("\n{}", "No calibrator found on any port".yellow().bold());
    println!("  1. Check the RS-232 cable and adapter");
    println!("  2. Make sure no other program holds the port");

    Ok(())
}

#[cfg(feature = "serial")]
fn handle_run(
    port: Option<String>,
    isotope: String,
    unit: Unit,
    catalog_path: Option<&Path>,
    log_path: Option<PathBuf>,
    show_timestamps: bool,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    if catalog.get(&isotope).is_none() {
        return Err(anyhow!(
            "unknown isotope {:?}; see 'activimeter isotopes list'",
            isotope
        ));
    }

    let connection = match port {
        Some(path) => {
            println!("{} Probing {}...", "[*]".cyan().bold(), path.white());
            serial::probe::probe_port(&path)?
                .ok_or_else(|| anyhow!("no calibrator answering on {}", path))?
        }
        None => {
            println!(
                "{} Probing serial ports for the calibrator...",
                "[*]".cyan().bold()
            );
            serial::find_calibrator()?
                .ok_or_else(|| anyhow!("no calibrator found; check cabling or use --port"))?
        }
    };

    println!(
        "{} Connected to {} at {} baud",
        "[OK]".green().bold(),
        connection.config().port_path.white().bold(),
        connection.config().baud_rate
    );
    println!(
        "{} Isotope: {}  Unit: {}",
        "[*]".cyan().bold(),
        isotope.white(),
        unit.label().white()
    );

    let (mut session, events) = Session::start(
        connection,
        catalog,
        Selection { isotope, unit },
    );
    let interrupted = session::install_interrupt_hook();

    let renderer = std::thread::spawn(move || render_events(events, log_path, show_timestamps));

    println!(
        "{}",
        "\n--- Polling started (1 Hz). Type :help for commands, :quit to exit ---\n".cyan()
    );

    // Console input comes in over a channel so this loop can keep watching
    // the interrupt flag while no line is pending. The reader thread is
    // left parked on stdin at shutdown; process exit reaps it.
    let (line_tx, line_rx) = std::sync::mpsc::channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if line_tx.send(line.clone()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("{} Console read failed: {}", "[ERROR]".red().bold(), e);
                    break;
                }
            }
        }
    });

    loop {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        match line_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => {
                if console::dispatch(&session, &line) == Outcome::Quit {
                    break;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            // stdin closed
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    println!("{}", "Stopping...".yellow());
    session.stop();
    drop(session);
    let _ = renderer.join();

    Ok(())
}

/// Render session events on the terminal and into the optional transcript
#[cfg(feature = "serial")]
fn render_events(
    events: Receiver<SessionEvent>,
    log_path: Option<PathBuf>,
    show_timestamps: bool,
) {
    let mut transcript = log_path.and_then(|path| match std::fs::File::create(&path) {
        Ok(file) => {
            println!(
                "{} Logging to: {}",
                "[LOG]".cyan().bold(),
                path.display().to_string().white()
            );
            Some(std::io::BufWriter::new(file))
        }
        Err(e) => {
            eprintln!(
                "{} Failed to create log file {}: {}",
                "[ERROR]".red().bold(),
                path.display(),
                e
            );
            None
        }
    });

    let mut last_was_unavailable = false;
    for event in events {
        let text = event_text(&event);

        if let Some(writer) = transcript.as_mut() {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = writeln!(writer, "[{}] {}", stamp, text);
            let _ = writer.flush();
        }

        // Collapse runs of unavailable markers; the display holds its
        // placeholder until a reading comes back
        if event == SessionEvent::Unavailable {
            if last_was_unavailable {
                continue;
            }
            last_was_unavailable = true;
        } else if matches!(event, SessionEvent::Reading(_)) {
            last_was_unavailable = false;
        }

        let prefix = if show_timestamps {
            format!("{} ", Local::now().format("%H:%M:%S").to_string().dimmed())
        } else {
            String::new()
        };

        match event {
            SessionEvent::Reading(text) => println!("{}{}", prefix, text.white().bold()),
            SessionEvent::Corrected(text) => println!("{}{}", prefix, text.cyan()),
            SessionEvent::Unavailable => println!("{}{}", prefix, UNAVAILABLE.dimmed()),
            SessionEvent::Log(text) => println!("{}{}", prefix, text.dimmed()),
            SessionEvent::Warning(text) => {
                println!("{}{} {}", prefix, "[WARN]".yellow().bold(), text)
            }
        }
    }
}

#[cfg(feature = "serial")]
fn event_text(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Reading(text)
        | SessionEvent::Corrected(text)
        | SessionEvent::Log(text)
        | SessionEvent::Warning(text) => text.clone(),
        SessionEvent::Unavailable => UNAVAILABLE.to_string(),
    }
}

#[cfg(feature = "serial")]
fn handle_send(port: &str, command: String) -> Result<()> {
    let mut conn = SerialConnection::open(PortConfig::new(port))?;

    println!(
        "{} {} -> {}",
        "[TX]".cyan().bold(),
        port.white(),
        command.white().bold()
    );
    conn.write_str(&Command::Raw(command).encode())?;
    conn.flush()?;

    match conn.read_line()? {
        Some(line) => println!("{} {}", "[RX]".green().bold(), line),
        None => println!("{}", "no response (timeout)".yellow()),
    }

    Ok(())
}

fn handle_isotopes(cmd: IsotopeCommands) -> Result<()> {
    match cmd {
        IsotopeCommands::List { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;

            println!("{}", "=".repeat(60));
            println!("{}", "Isotope Catalog".cyan().bold());
            println!("{}", "=".repeat(60));

            for entry in catalog.entries() {
                let decay = match entry.decay_per_min {
                    Some(k) => format!("{} /min", k),
                    None => "(none - manual channel)".to_string(),
                };
                println!(
                    "\n  {}: channel {}",
                    entry.name.white().bold(),
                    entry.channel.cyan()
                );
                println!("    Decay constant: {}", decay);
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} for one entry",
                "activimeter isotopes show <name>".cyan()
            );
        }

        IsotopeCommands::Show { name, catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let entry = catalog.get(&name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown isotope: {}. Use 'activimeter isotopes list' to see the catalog.",
                    name
                )
            })?;

            println!("{}", "=".repeat(60));
            println!("{}", format!("Isotope: {}", entry.name).cyan().bold());
            println!("{}", "=".repeat(60));
            println!("  Channel command: {}", entry.channel);
            match entry.decay_per_min {
                Some(k) => {
                    println!("  Decay constant: {} /min", k);
                    // T1/2 = ln(2)/k, printed in whichever scale reads best
                    let half_life_min = std::f64::consts::LN_2 / k;
                    if half_life_min > 2880.0 {
                        println!("  Half-life: {:.1} days", half_life_min / 1440.0);
                    } else {
                        println!("  Half-life: {:.1} hours", half_life_min / 60.0);
                    }
                }
                None => println!("  Decay constant: none (manual channel, no correction)"),
            }
        }
    }

    Ok(())
}

fn handle_commands() -> Result<()> {
    println!("{}", "=".repeat(60));
    println!("{}", "Device Command Reference".cyan().bold());
    println!("{}", "=".repeat(60));

    for (command, description) in COMMAND_REFERENCE {
        println!("  {} {}", format!("{:<8}", command).white().bold(), description);
    }

    let units: Vec<&str> = activity::Unit::ALL.iter().map(|u| u.label()).collect();
    println!("\n  display units: {}", units.join(", "));
    println!("{}", "=".repeat(60));

    Ok(())
}
