mod console;
mod midi;

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use console::{parse_command, ConsoleCommand, HELP};
use ostinato_core::config::Config;
use ostinato_core::{ArpHandle, NoteSink};
use ostinato_types::clamp_bpm;

#[derive(Parser)]
#[command(name = "ostinato")]
#[command(author, version, about = "Performance arpeggiator: MIDI in, arpeggiated MIDI out", long_about = None)]
struct Cli {
    /// Config file path (default: ~/.config/ostinato/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tempo in BPM (20-300)
    #[arg(long)]
    bpm: Option<f32>,

    /// MIDI input port index (see --list-ports)
    #[arg(short, long)]
    input: Option<usize>,

    /// MIDI output port index; notes are printed when omitted
    #[arg(short, long)]
    output: Option<usize>,

    /// MIDI output channel (0-15)
    #[arg(long)]
    channel: Option<u8>,

    /// List MIDI ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ostinato")
        .join("ostinato.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let Some(log_file) = File::create(&log_path)
        .or_else(|_| File::create("/tmp/ostinato.log"))
        .ok()
    else {
        eprintln!("ostinato: cannot create log file, logging disabled");
        return;
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("ostinato: logger already initialized");
        return;
    }

    log::info!("ostinato starting (log level: {:?})", log_level);
}

fn print_ports() {
    println!("MIDI inputs:");
    for port in midi::input_ports() {
        println!("  {}: {}", port.index, port.name);
    }
    println!("MIDI outputs:");
    for port in midi::output_ports() {
        println!("  {}: {}", port.index, port.name);
    }
}

fn print_status(handle: &mut ArpHandle) {
    handle.drain_feedback();
    let state = if handle.is_running() { "running" } else { "idle" };
    println!("{} step {} pattern {:?}", state, handle.current_step(), handle.pattern());
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_ports {
        print_ports();
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ostinato: {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => Config::load(),
    };

    let bpm = cli.bpm.map(clamp_bpm).unwrap_or_else(|| config.bpm());
    let channel = cli.channel.unwrap_or_else(|| config.midi_channel()).min(15);

    let sink: Box<dyn NoteSink + Send> = match cli.output {
        Some(index) => match midi::MidiOutSink::connect(index, channel) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                eprintln!("ostinato: MIDI output: {}", e);
                std::process::exit(1);
            }
        },
        None => Box::new(midi::PrintSink),
    };

    let mut handle = ArpHandle::spawn(config.arpeggiator(), bpm, sink);

    // Dropping the connection closes the port.
    let _input = match cli.input {
        Some(index) => match midi::connect_input(index, handle.sender()) {
            Ok(connection) => Some(connection),
            Err(e) => {
                eprintln!("ostinato: MIDI input: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    println!("ostinato at {} BPM. Type 'help' for commands.", bpm);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        handle.drain_feedback();
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(ConsoleCommand::Patch(patch)) => handle.apply_patch(patch),
            Ok(ConsoleCommand::ToggleLatch) => handle.toggle_latch(),
            Ok(ConsoleCommand::Panic) => handle.panic(),
            Ok(ConsoleCommand::Bpm(bpm)) => handle.set_bpm(bpm),
            Ok(ConsoleCommand::Status) => print_status(&mut handle),
            Ok(ConsoleCommand::Help) => println!("{}", HELP),
            Ok(ConsoleCommand::Quit) => break,
            Err(e) => println!("{}", e),
        }
        stdout.flush()?;
    }

    log::info!("ostinato shutting down");
    handle.shutdown();
    Ok(())
}
