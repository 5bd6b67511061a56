use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use keytempo::broadcast::{JsonLineSink, FULL_RESYNC_INTERVAL_MS};
use keytempo::config::{Config, ConfigStore, FileConfigStore};
use keytempo::engine::{SurfaceReply, TypingTelemetry};
use keytempo::events::ContentChange;
use keytempo::history::{self, SpeedSample, TimeRange};
use keytempo::protocol::SurfaceEvent;
use keytempo::runtime::{ChannelEventSource, EngineEvent, Runner, EVAL_TICK_MS};
use keytempo::store::{SqliteStateStore, StateStore, HISTORY_KEY, KEY_PRESS_KEY};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing_subscriber::EnvFilter;

/// in-editor typing telemetry over ndjson edit streams
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Tracks live words-per-minute, a bounded speed history, and a per-key heatmap from editor edit streams, and mirrors them to a detached presentation surface as newline-delimited JSON."
)]
pub struct Cli {
    /// state database path (":memory:" for an ephemeral store)
    #[clap(long)]
    state: Option<PathBuf>,

    /// config file path
    #[clap(long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// process live edit batches from stdin, emitting surface messages on stdout
    Run,
    /// replay a recorded edit log on a virtual clock
    Replay {
        /// ndjson file of {atMs, changes} records
        input: PathBuf,
    },
    /// print statistics over the persisted speed history
    Summary {
        /// time range to summarize
        #[clap(long, value_enum, default_value_t = RangeArg::AllTime)]
        range: RangeArg,
    },
    /// clear the persisted history and key counters
    Reset,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RangeArg {
    LastHour,
    LastDay,
    LastWeek,
    AllTime,
}

impl RangeArg {
    fn as_range(&self) -> TimeRange {
        match self {
            RangeArg::LastHour => TimeRange::LastHour,
            RangeArg::LastDay => TimeRange::LastDay,
            RangeArg::LastWeek => TimeRange::LastWeek,
            RangeArg::AllTime => TimeRange::AllTime,
        }
    }
}

/// One recorded edit batch: a virtual-clock offset plus its changes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayRecord {
    #[serde(default)]
    at_ms: u64,
    changes: Vec<ContentChange>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);
    let store = open_store(&cli)?;

    match cli.command {
        Command::Run => run_live(config, store),
        Command::Replay { input } => replay(config, store, &input),
        Command::Summary { range } => summary(store, range),
        Command::Reset => reset(store),
    }
}

fn load_config(cli: &Cli) -> Config {
    match &cli.config {
        Some(path) => FileConfigStore::with_path(path).load(),
        None => FileConfigStore::new().load(),
    }
}

fn open_store(cli: &Cli) -> Result<SqliteStateStore, Box<dyn Error>> {
    let store = match &cli.state {
        Some(path) if path.as_os_str() == ":memory:" => SqliteStateStore::open_in_memory()?,
        Some(path) => SqliteStateStore::open(path)?,
        None => SqliteStateStore::open_default()?,
    };
    Ok(store)
}

fn run_live(config: Config, store: SqliteStateStore) -> Result<(), Box<dyn Error>> {
    let mut engine = TypingTelemetry::new(config, Box::new(store), Utc::now());
    engine.set_collecting(true, Utc::now());
    engine.attach_surface(Box::new(JsonLineSink::new(io::stdout())), Utc::now());

    let mut runner = Runner::new(ChannelEventSource::new(spawn_stdin_reader()));
    loop {
        match runner.step() {
            EngineEvent::Edit(changes) => engine.handle_edit(&changes, Utc::now()),
            EngineEvent::Surface(event) => {
                if let SurfaceReply::ShowHistory(samples) =
                    engine.handle_surface_event(event, Utc::now())
                {
                    emit_history_view(&samples);
                }
            }
            EngineEvent::EvalTick => engine.on_eval_tick(Utc::now()),
            EngineEvent::ResyncTick => engine.on_resync_tick(Utc::now()),
            EngineEvent::Shutdown => break,
        }
    }
    Ok(())
}

/// Echo the engine's authoritative series back out so a piped renderer can
/// open its history view from it.
fn emit_history_view(samples: &[SpeedSample]) {
    if let Ok(line) = serde_json::to_string(&SurfaceEvent::ShowHistory {
        history: samples.to_vec(),
    }) {
        println!("{line}");
    }
}

/// Turn stdin lines into engine events on a reader thread, closing with a
/// shutdown marker at end of input.
fn spawn_stdin_reader() -> mpsc::Receiver<EngineEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(event) = parse_line(&line) {
                if tx.send(event).is_err() {
                    break;
                }
            }
        }
        let _ = tx.send(EngineEvent::Shutdown);
    });

    rx
}

/// One stdin line is either a surface command or an edit record.
fn parse_line(line: &str) -> Option<EngineEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(event) = serde_json::from_str::<SurfaceEvent>(trimmed) {
        return Some(EngineEvent::Surface(event));
    }
    match serde_json::from_str::<ReplayRecord>(trimmed) {
        Ok(record) => Some(EngineEvent::Edit(record.changes)),
        Err(err) => {
            tracing::warn!("skipping unreadable input line: {err}");
            None
        }
    }
}

fn replay(config: Config, store: SqliteStateStore, input: &Path) -> Result<(), Box<dyn Error>> {
    let reader = BufReader::new(File::open(input)?);
    let base = Utc
        .timestamp_opt(0, 0)
        .single()
        .ok_or("epoch out of range")?;

    let mut engine = TypingTelemetry::new(config, Box::new(store), base);
    engine.set_collecting(true, base);
    engine.attach_surface(Box::new(JsonLineSink::new(io::stdout())), base);

    let mut next_eval = EVAL_TICK_MS;
    let mut next_resync = FULL_RESYNC_INTERVAL_MS as u64;
    let mut clock_ms = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(&line)?;
        advance_ticks(&mut engine, base, record.at_ms, &mut next_eval, &mut next_resync);
        clock_ms = clock_ms.max(record.at_ms);
        engine.handle_edit(&record.changes, base + Duration::milliseconds(record.at_ms as i64));
    }
    advance_ticks(&mut engine, base, clock_ms, &mut next_eval, &mut next_resync);

    Ok(())
}

/// Fire every virtual tick due at or before `until_ms`, in deadline order.
fn advance_ticks(
    engine: &mut TypingTelemetry,
    base: DateTime<Utc>,
    until_ms: u64,
    next_eval: &mut u64,
    next_resync: &mut u64,
) {
    loop {
        let due = (*next_eval).min(*next_resync);
        if due > until_ms {
            break;
        }
        let at = base + Duration::milliseconds(due as i64);
        if *next_eval <= *next_resync {
            engine.on_eval_tick(at);
            *next_eval += EVAL_TICK_MS;
        } else {
            engine.on_resync_tick(at);
            *next_resync += FULL_RESYNC_INTERVAL_MS as u64;
        }
    }
}

fn summary(store: SqliteStateStore, range: RangeArg) -> Result<(), Box<dyn Error>> {
    let samples: Vec<SpeedSample> = match store.get(HISTORY_KEY)? {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    };
    let filtered = history::filter_range(&samples, range.as_range(), Utc::now());
    let stats = history::summarize(&filtered);

    println!("range: {range}");
    println!("samples: {}", stats.samples);
    println!("peak: {} wpm", stats.peak_wpm);
    println!("average: {:.1} wpm", stats.average_wpm);
    println!("std dev: {:.2}", stats.std_dev);
    Ok(())
}

fn reset(store: SqliteStateStore) -> Result<(), Box<dyn Error>> {
    store.put(HISTORY_KEY, &json!([]))?;
    store.put(KEY_PRESS_KEY, &json!({}))?;
    println!("cleared persisted telemetry");
    Ok(())
}
