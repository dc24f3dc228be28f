//! Main entry point for the dvr-console CLI application.

use clap::{Parser, Subcommand};
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dvr_console::api::{ConsoleApi, HttpTransport};
use dvr_console::bulk::{BulkActionExecutor, TriggerGuard};
use dvr_console::candidates::CandidateStore;
use dvr_console::config::{Config, RecordingDefaults};
use dvr_console::dispatch::{CommandDispatcher, OptionCommand};
use dvr_console::error::AppError;
use dvr_console::tui::{Action, App, TaskMessage, draw, poll_event};
use dvr_console::types::{ManualRecording, RuleId, ScheduleRequest};
use dvr_console::view::{
    candidate_lines, recording_list_lines, result_lines, rule_lines, snapshot,
};
use log::{debug, info, warn};
use ratatui::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Command-line arguments for the dvr-console application.
#[derive(Parser, Debug)]
#[command(
    name = "dvr-console",
    version,
    about = "A terminal console for a home-media DVR server",
    long_about = "Send natural-language commands to the DVR server, pick episodes, torrents \
                  and recording slots from its answers, and run bulk downloads."
)]
struct Args {
    /// Server base URL (overrides config)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity level: 0=error, 1=warn, 2=info, 3=debug, 4=trace
    #[arg(short, long, default_value_t = 1, global = true)]
    log: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive console (default)
    Tui,
    /// Send one command and print the result
    Send {
        /// Command text, e.g. "search for big buck bunny"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Wake a machine on the LAN
    Wol {
        /// MAC address (defaults to wol_mac from config)
        mac: Option<String>,
    },
    /// Start recording a channel now
    RecordNow(RecordingArgs),
    /// Stop the current recording
    Stop,
    /// Record a channel every week on the given days
    Schedule {
        #[command(flatten)]
        recording: RecordingArgs,
        /// Start time, HH:MM
        #[arg(short, long)]
        time: String,
        /// Weekdays, comma separated (Mon,Wed,Fri)
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<String>,
    },
    /// List weekly recording rules
    Rules,
    /// List recent individual recordings
    Recordings,
    /// Cancel a scheduled recording by its position in the server's schedule
    Cancel {
        /// 0-based schedule position
        index: usize,
    },
    /// Cancel a recurring rule and the episodes scheduled from it
    CancelRule {
        /// Rule id as shown by `rules`
        id: String,
    },
    /// Skip the next episode of a recurring rule
    SkipNext {
        /// Rule id as shown by `rules`
        id: String,
    },
    /// Show recording progress
    Progress,
    /// Auto-categorize torrents on the server
    Categorize,
    /// Write a default config file if none exists
    InitConfig,
}

#[derive(clap::Args, Debug)]
struct RecordingArgs {
    /// Channel number or call sign
    channel: String,
    /// Minutes to record
    #[arg(short, long)]
    duration: Option<u32>,
    /// Container format (mp4, mkv, ...)
    #[arg(long)]
    format: Option<String>,
    /// Encoder quality, 0-51
    #[arg(long)]
    crf: Option<u8>,
    /// Encoder preset
    #[arg(long)]
    preset: Option<String>,
}

impl RecordingArgs {
    fn into_recording(self, defaults: &RecordingDefaults) -> ManualRecording {
        ManualRecording {
            channel: self.channel,
            duration: self.duration.unwrap_or(defaults.duration),
            format: self.format.unwrap_or_else(|| defaults.format.clone()),
            crf: self.crf.unwrap_or(defaults.crf),
            preset: self.preset.unwrap_or_else(|| defaults.preset.clone()),
        }
    }
}

/// Initialize the terminal for TUI rendering.
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Path of the log file used while the console owns the terminal.
fn log_file_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("dvr-console").join("dvr-console.log"))
}

fn init_logging(level: u8, to_file: bool) {
    let log_level = match level {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false);

    if to_file {
        // Log lines on stderr would corrupt the alternate screen
        let file = log_file_path().and_then(|path| {
            let parent = path.parent()?;
            fs::create_dir_all(parent).ok()?;
            OpenOptions::new().create(true).append(true).open(path).ok()
        });
        match file {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    builder.init();
    debug!("Log level set to {:?}", log_level);
}

fn load_config(args: &Args) -> Config {
    let loaded = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load config: {}. Using defaults.", e);
        Config::new()
    });

    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }
    config
}

/// Print the outcome of a one-shot command, exiting non-zero on failure.
fn report<T>(outcome: Result<T, AppError>, print: impl FnOnce(T)) {
    match outcome {
        Ok(value) => print(value),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let interactive = matches!(args.command, None | Some(Commands::Tui));
    init_logging(args.log, interactive);

    let config = load_config(&args);
    let transport = HttpTransport::new(&config.server_url)?;
    info!("Using server {}", transport.base_url());

    let api = ConsoleApi::new(transport.clone());

    match args.command {
        None | Some(Commands::Tui) => run_tui(config, transport).await?,
        Some(Commands::Send { text }) => {
            let dispatcher = CommandDispatcher::new(transport);
            report(dispatcher.send(&text.join(" ")).await, |result| {
                for line in result_lines(&result) {
                    println!("{}", line);
                }
                let mut store = CandidateStore::new();
                if store.replace(&result) {
                    for line in candidate_lines(&snapshot(&store, chrono::Utc::now())) {
                        println!("{}", line);
                    }
                }
            });
        }
        Some(Commands::Wol { mac }) => {
            let Some(mac) = mac.or(config.wol_mac.clone()) else {
                eprintln!("No MAC address given and no wol_mac in config");
                std::process::exit(1);
            };
            report(api.wake(&mac).await, |msg| println!("{}", msg));
        }
        Some(Commands::RecordNow(recording)) => {
            let recording = recording.into_recording(&config.recording);
            report(api.record_now(&recording).await, |msg| println!("{}", msg));
        }
        Some(Commands::Stop) => report(api.stop_recording().await, |msg| println!("{}", msg)),
        Some(Commands::Schedule {
            recording,
            time,
            days,
        }) => {
            let request = ScheduleRequest {
                recording: recording.into_recording(&config.recording),
                time,
                days,
            };
            report(api.schedule(request).await, |msg| println!("{}", msg));
        }
        Some(Commands::Rules) => report(api.recurring_rules().await, |rules| {
            for line in rule_lines(&rules) {
                println!("{}", line);
            }
        }),
        Some(Commands::Recordings) => report(api.recent_recordings().await, |items| {
            for line in recording_list_lines(&items) {
                println!("{}", line);
            }
        }),
        Some(Commands::Cancel { index }) => {
            report(api.cancel_recording(index).await, |msg| println!("{}", msg))
        }
        Some(Commands::CancelRule { id }) => {
            let outcome = match RuleId::parse(&id) {
                Ok(rule) => api.cancel_recurring(&rule).await,
                Err(e) => Err(e),
            };
            report(outcome, |msg| println!("{}", msg));
        }
        Some(Commands::SkipNext { id }) => {
            let outcome = match RuleId::parse(&id) {
                Ok(rule) => api.cancel_next_episode(&rule).await,
                Err(e) => Err(e),
            };
            report(outcome, |msg| println!("{}", msg));
        }
        Some(Commands::Progress) => report(api.progress().await, |text| println!("{}", text)),
        Some(Commands::Categorize) => report(api.auto_categorize().await, |outcome| {
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }),
        Some(Commands::InitConfig) => {
            let path = match &args.config {
                Some(path) => {
                    if !path.exists() {
                        Config::new().save_to(path)?;
                    }
                    path.clone()
                }
                None => Config::create_default_if_missing()?,
            };
            println!("Config file: {}", path.display());
        }
    }

    Ok(())
}

/// Clients shared by the request tasks.
#[derive(Clone)]
struct Services {
    dispatcher: CommandDispatcher<HttpTransport>,
    bulk: BulkActionExecutor<HttpTransport>,
    api: ConsoleApi<HttpTransport>,
    wol_mac: Option<String>,
}

async fn run_tui(
    config: Config,
    transport: HttpTransport,
) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services {
        dispatcher: CommandDispatcher::new(transport.clone()),
        bulk: BulkActionExecutor::new(transport.clone()),
        api: ConsoleApi::new(transport),
        wol_mac: config.wol_mac.clone(),
    };

    let mut terminal = init_terminal()?;
    let mut app = App::new(config.keybindings.clone());
    let progress_every = Duration::from_secs(config.progress_interval_secs);

    let result = run_app(&mut terminal, &mut app, &services, progress_every).await;

    restore_terminal()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    services: &Services,
    progress_every: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let progress_pending = Arc::new(AtomicBool::new(false));
    let mut last_progress: Option<Instant> = None;

    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(msg) = msg_rx.try_recv() {
            app.apply(msg);
        }

        let progress_due = !progress_every.is_zero()
            && last_progress.is_none_or(|t| t.elapsed() >= progress_every);
        if progress_due {
            if let Some(guard) = TriggerGuard::acquire(&progress_pending) {
                last_progress = Some(Instant::now());
                let api = services.api.clone();
                let tx = msg_tx.clone();
                tokio::spawn(async move {
                    let outcome = api.progress().await;
                    drop(guard);
                    let _ = tx.send(TaskMessage::Progress(outcome));
                });
            }
        }

        if let Some(Event::Key(key)) = poll_event(Duration::from_millis(100))? {
            if key.kind == KeyEventKind::Press {
                let action = app.handle_input(key);
                start_action(action, app, services, &msg_tx);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Run the request behind `action` on a background task.
fn start_action(
    action: Action,
    app: &mut App,
    services: &Services,
    tx: &mpsc::UnboundedSender<TaskMessage>,
) {
    let tx = tx.clone();
    match action {
        Action::None | Action::Quit => {}
        Action::Send(text) => {
            let ticket = app.start_command(&text);
            let dispatcher = services.dispatcher.clone();
            tokio::spawn(async move {
                let outcome = dispatcher.send(&text).await;
                let _ = tx.send(TaskMessage::Command { ticket, outcome });
            });
        }
        Action::Option(command) => {
            let ticket = app.start_command(&command.to_string());
            let dispatcher = services.dispatcher.clone();
            tokio::spawn(async move {
                let outcome = dispatcher.send_option(&command).await;
                let _ = tx.send(TaskMessage::Command { ticket, outcome });
            });
        }
        Action::BulkDownload(episodes) => {
            let Some(guard) = TriggerGuard::acquire(&app.bulk_pending) else {
                app.set_status("A bulk action is already running");
                return;
            };
            app.start_request();
            let bulk = services.bulk.clone();
            tokio::spawn(async move {
                let outcome = bulk.run_bulk_download(&episodes).await;
                let _ = tx.send(TaskMessage::Bulk { outcome, guard });
            });
        }
        Action::BulkAddTorrents(options) => {
            let Some(guard) = TriggerGuard::acquire(&app.bulk_pending) else {
                app.set_status("A bulk action is already running");
                return;
            };
            let command = OptionCommand::DownloadMany(options.clone());
            let ticket = app.start_command(&command.to_string());
            let bulk = services.bulk.clone();
            tokio::spawn(async move {
                let outcome = bulk.run_bulk_add_torrents(&options).await;
                let _ = tx.send(TaskMessage::BulkAdd {
                    ticket,
                    outcome,
                    guard,
                });
            });
        }
        Action::Wake => {
            let Some(mac) = services.wol_mac.clone() else {
                app.set_error("No wol_mac set in config.toml");
                return;
            };
            app.start_request();
            let api = services.api.clone();
            tokio::spawn(async move {
                let _ = tx.send(TaskMessage::Notice(api.wake(&mac).await));
            });
        }
        Action::StopRecording => {
            app.start_request();
            let api = services.api.clone();
            tokio::spawn(async move {
                let _ = tx.send(TaskMessage::Notice(api.stop_recording().await));
            });
        }
        Action::Categorize => {
            app.start_request();
            let api = services.api.clone();
            tokio::spawn(async move {
                let outcome = api.auto_categorize().await;
                let _ = tx.send(TaskMessage::Categorized(outcome));
            });
        }
    }
}
