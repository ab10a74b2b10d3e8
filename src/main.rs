//! aiderchat - a chat-style terminal front end for aider
//!
//! Runs one aider session at a time, prints its output as it arrives and
//! sends every typed line to it. Lines starting with `/` that name a local
//! command (see `/help`) are handled here; `//text` sends `/text` verbatim.

use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use aiderchat::config::LoggingConfig;
use aiderchat::error::user_message;
use aiderchat::{Config, Credential, Delivery, LineKind, SessionController, SessionState};

/// Longest wait for a stopped session's relay to write its end marker
const END_MARKER_WAIT: Duration = Duration::from_millis(250);

/// Chat with an aider session from the terminal
#[derive(Parser, Debug)]
#[command(name = "aiderchat", version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "AIDERCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the configured model
    #[arg(short, long)]
    model: Option<String>,

    /// Do not start a session on launch; use /start
    #[arg(long)]
    no_autostart: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

/// One line of user input, classified
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Start,
    Stop,
    Status,
    Log(Option<usize>),
    Refresh,
    Export(&'a str),
    Interrupt,
    Help,
    Quit,
    /// Anything else goes to the assistant
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.starts_with("//") {
        return Input::Message(&trimmed[1..]);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match command {
        "/start" => Input::Start,
        "/stop" => Input::Stop,
        "/status" => Input::Status,
        "/log" => Input::Log(rest.parse().ok()),
        "/refresh" => Input::Refresh,
        "/export" if !rest.is_empty() => Input::Export(rest),
        "/interrupt" => Input::Interrupt,
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        _ => Input::Message(line),
    }
}

enum Event {
    Input(Option<String>),
    Output(Delivery),
    CtrlC,
}

/// Terminal display consumer over a [`SessionController`]
struct ChatView {
    controller: SessionController,
    tail_lines: usize,
    /// Whether the end of the last session has been printed
    end_reported: bool,
}

impl ChatView {
    fn new(controller: SessionController, tail_lines: usize) -> Self {
        Self {
            controller,
            tail_lines,
            end_reported: true,
        }
    }

    fn start(&mut self) {
        for line in self.finish_previous() {
            println!("{}", line);
        }
        match self.controller.start() {
            Ok(()) => {
                self.end_reported = false;
                println!("✅ Assistant started: {}", self.controller.launch_spec());
            }
            Err(e) => print_error(&e),
        }
    }

    /// Handle one input line; returns false when the user asked to quit
    fn handle_input(&mut self, line: &str) -> bool {
        match parse_input(line) {
            Input::Start => self.start(),
            Input::Stop => {
                let was_running = self.controller.is_running();
                match self.controller.stop() {
                    Ok(()) if was_running => println!("🛑 Assistant stopped"),
                    Ok(()) => println!("No session is running"),
                    Err(e) => print_error(&e),
                }
            }
            Input::Status => self.print_status(),
            Input::Log(n) => {
                for line in self.controller.log_tail(n.unwrap_or(self.tail_lines)) {
                    if line.is_user() {
                        println!("{:>5} > {}", line.sequence, line.text);
                    } else {
                        println!("{:>5} {}", line.sequence, line.plain_text());
                    }
                }
            }
            Input::Refresh => {
                for line in self.controller.drain_available() {
                    println!("{}", line);
                }
                self.controller.refresh();
            }
            Input::Export(path) => match self.controller.export_log(Path::new(path)) {
                Ok(count) => println!("💾 Exported {} lines to {}", count, path),
                Err(e) => print_error(&e),
            },
            Input::Interrupt => {
                if let Err(e) = self.controller.interrupt() {
                    print_error(&e);
                }
            }
            Input::Help => print_help(),
            Input::Quit => return false,
            Input::Message(text) => {
                if let Err(e) = self.controller.send(text) {
                    print_error(&e);
                }
            }
        }
        true
    }

    fn show(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Line(line) => println!("{}", line),
            Delivery::Empty => {}
            Delivery::Closed => {
                for line in self.take_session_end() {
                    println!("{}", line);
                }
            }
        }
    }

    /// The partial line and sentinel that never go through the queue
    ///
    /// Returns nothing once the end of the session has been reported.
    fn take_session_end(&mut self) -> Vec<String> {
        if self.end_reported {
            return Vec::new();
        }
        self.end_reported = true;

        let log = self.controller.log_snapshot();
        let trailing = log
            .iter()
            .rev()
            .take_while(|line| line.kind != LineKind::Output)
            .count();
        if self.controller.refresh() == SessionState::Idle {
            debug!("Session ended; waiting for /start");
        }
        log[log.len() - trailing..]
            .iter()
            .filter(|line| !line.is_user())
            .map(ToString::to_string)
            .collect()
    }

    /// Undelivered output and the end of a session that was stopped but
    /// whose queue has not reported `Closed` yet
    fn finish_previous(&mut self) -> Vec<String> {
        if self.end_reported || self.controller.refresh() == SessionState::Running {
            return Vec::new();
        }

        let deadline = Instant::now() + END_MARKER_WAIT;
        while !self.controller.log().has_ended() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let mut lines = self.controller.drain_available();
        lines.extend(self.take_session_end());
        lines
    }

    fn print_status(&mut self) {
        let state = self.controller.refresh();
        println!("State: {:?}", state);
        match self.controller.status() {
            Some(status) => {
                println!("Session: {}", status);
                println!("Started: {}", status.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
                if let Some(ended) = status.ended_at {
                    println!("Ended:   {}", ended.format("%Y-%m-%d %H:%M:%S UTC"));
                }
                println!("Uptime:  {}s", status.duration().as_secs());
            }
            None => println!("No session has been started"),
        }
        println!("Command: {}", self.controller.launch_spec());
    }
}

fn print_error(error: &aiderchat::Error) {
    if error.is_validation() {
        println!("⚠️  {}", error);
    } else {
        println!("❌ {}", user_message(error));
    }
}

fn print_help() {
    println!("Commands:");
    println!("    /start          Start the assistant");
    println!("    /stop           Stop the assistant");
    println!("    /status         Show session status");
    println!("    /log [n]        Show the last n log lines");
    println!("    /refresh        Print any output waiting for display");
    println!("    /export <path>  Write the session log as JSON");
    println!("    /interrupt      Interrupt the current reply");
    println!("    /help           Show this help");
    println!("    /quit           Stop the assistant and exit");
    println!();
    println!("Anything else is sent to the assistant. Start a line with // to");
    println!("send a slash command that aiderchat would otherwise handle,");
    println!("e.g. //help sends /help to aider.");
}

/// Fall back to defaults unless the file was named explicitly or the
/// error would make every session fail
fn resolve_config(loaded: aiderchat::Result<Config>, explicit: bool) -> aiderchat::Result<Config> {
    match loaded {
        Ok(config) => Ok(config),
        Err(e) if explicit || e.is_fatal_config() => Err(e),
        Err(e) => {
            warn!("{}; using defaults", e);
            Ok(Config::default())
        }
    }
}

fn exit_on_startup_error(error: &aiderchat::Error) -> ! {
    eprintln!("{}", user_message(error));
    let code = if error.is_fatal_config() { 2 } else { 1 };
    process::exit(code);
}

fn init_logging(args: &Args, configured_level: &str) {
    let debug = args.debug
        || env::var("AIDERCHAT_DEBUG").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let log_level = if debug { "debug" } else { configured_level };

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loaded = aiderchat::load_config(args.config.as_deref());
    let level = match &loaded {
        Ok(config) => config.logging.level.clone(),
        Err(_) => LoggingConfig::default().level,
    };
    init_logging(&args, &level);

    info!("🚀 Starting {} v{}", aiderchat::NAME, aiderchat::VERSION);

    let mut config = match resolve_config(loaded, args.config.is_some()) {
        Ok(config) => config,
        Err(e) => exit_on_startup_error(&e),
    };

    if let Some(model) = &args.model {
        config.assistant.model = model.clone();
    }

    if args.print_config {
        let rendered = toml::to_string_pretty(&config).context("serializing configuration")?;
        print!("{}", rendered);
        return Ok(());
    }

    let credential = match Credential::from_env(&config.assistant.credential_env) {
        Ok(credential) => credential,
        Err(e) => exit_on_startup_error(&e),
    };

    let controller = SessionController::from_config(&config, &credential);
    let poll_timeout = controller.poll_timeout();
    let mut view = ChatView::new(controller, config.relay.log_tail_lines);

    println!("aiderchat v{} (type /help for commands)", aiderchat::VERSION);
    if !args.no_autostart {
        view.start();
    }

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });

    loop {
        let event = tokio::select! {
            line = input_rx.recv() => Event::Input(line),
            delivery = view.controller.next_chunk(poll_timeout) => Event::Output(delivery),
            _ = tokio::signal::ctrl_c() => Event::CtrlC,
        };

        match event {
            Event::Input(Some(line)) => {
                if !view.handle_input(&line) {
                    break;
                }
            }
            Event::Input(None) => {
                debug!("Input closed");
                break;
            }
            Event::Output(delivery) => view.show(delivery),
            Event::CtrlC => {
                // The terminal already delivered the interrupt to the assistant
                println!("(interrupted; type /quit to exit)");
            }
        }
    }

    if let Err(e) = view.controller.stop() {
        print_error(&e);
    }
    for line in view.controller.drain_available() {
        println!("{}", line);
    }
    info!("👋 Goodbye");
    Ok(())
}
