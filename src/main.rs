// SPDX-License-Identifier: MIT
//
// pport — text-based messenger for the command line.
//
// This binary wires the crates together:
//
//   pport-term → terminal control, key decoding, differential rendering,
//                event loop
//   pport-chat → message model, HTTP transport, session, configuration
//
// Startup runs in cooked mode: print the banner, ask for a name if no
// layer of configuration supplied one. Then the terminal switches to raw
// mode and ChatApp runs inside the event loop until Ctrl+C or EOF.
//
// Screen layout (bottom-anchored, newest message just above the header):
//
//   ┌──────────────────────────────────────────────┐
//   │ ann: older message                           │
//   │ bob: newest message                          │
//   │ 12:00:00 | 80x24 (me) ¿? typed text█         │  ← last row
//   └──────────────────────────────────────────────┘

use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use pport_chat::config::{self, CliOverrides};
use pport_chat::{ChatApp, HttpTransport};
use pport_term::event_loop::{EventLoop, LoopConfig};

const INTRO: &str = r"
  ____  ____   ___  ____ _____
  |  _ \|  _ \ / _ \|  _ \_   _|
  | |_) | |_) | | | | |_) || |
  |  __/|  __/| |_| |  _ < | |
  |_|   |_|    \___/|_| \_\|_|

  Text-based messenger for the command line
";

/// How long the loop waits for a key before running timers.
const TICK: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(name = "pport", version, about = "Text-based messenger for the command line")]
struct Args {
    /// Relay server base URL
    #[arg(short, long)]
    server: Option<String>,

    /// Your name in the chat
    #[arg(short, long)]
    name: Option<String>,

    /// Config file (default: ~/.pport/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: ~/.pport/pport.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Redraw interval in milliseconds
    #[arg(long)]
    redraw_ms: Option<u64>,
}

/// Stdout belongs to the renderer, so logs go to a file or nowhere.
fn init_logging(path: Option<PathBuf>) {
    let Some(path) = path.or_else(config::default_log_path) else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(file) = File::create(&path) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, file);
    }
}

/// Ask for a name on the cooked terminal. EOF or a blank line gives "".
fn prompt_username() -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "type your name: ")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_file.clone());
    info!("pport {} starting", env!("CARGO_PKG_VERSION"));

    let file_config = config::load(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("pport: {e}");
        process::exit(1);
    });

    let cli = CliOverrides {
        server: args.server,
        username: args.name,
        poll_ms: args.poll_ms,
        redraw_ms: args.redraw_ms,
    };
    let resolved = config::resolve(&file_config, &cli);
    info!("server {}", resolved.server);

    println!("{INTRO}");
    let raw_name = match resolved.username.clone() {
        Some(name) => name,
        None => prompt_username().unwrap_or_else(|e| {
            warn!("could not read name: {e}");
            String::new()
        }),
    };
    let session = resolved.session(&raw_name);
    info!("joining as {}", session.username);

    let transport = HttpTransport::new(&resolved.server, resolved.request_timeout).unwrap_or_else(|e| {
        eprintln!("pport: failed to set up HTTP client: {e}");
        process::exit(1);
    });

    let mut app = ChatApp::new(session, transport, Instant::now());
    let mut event_loop = EventLoop::new(LoopConfig {
        tick: TICK,
        redraw_interval: resolved.redraw_interval,
    });

    match event_loop.run(&mut app) {
        Ok(exit) => info!("exit ({exit:?}), {:?}", app.stats()),
        Err(e) => {
            eprintln!("pport: {e}");
            process::exit(1);
        }
    }
}
