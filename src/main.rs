//! Mood Charts - Main entry point
//!
//! Logs moods and draws calendar-windowed charts of them in the terminal.

use std::io::{self, Stdout};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mood_charts::chart::{ChartDriver, ChartSession, ChartState, ChartStatus, NavAction};
use mood_charts::db::{DayEntry, EventEntry};
use mood_charts::display::{ChartFormat, TerminalChart};
use mood_charts::types::{MoodScore, SubjectId};
use mood_charts::{
    Config, Database, DateRange, Error, NavigationController, Result, WindowResolver, WindowType,
};

#[derive(Parser)]
#[command(name = "mood-charts")]
#[command(author, version, about = "Mood log charts with calendar-aligned windows")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MOOD_CHARTS_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw one chart and exit
    Chart {
        /// Window: month, quarter, bi-annual, year, all-time
        #[arg(short, long)]
        window: Option<String>,

        /// Periods to step from the current one (negative = back)
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        step: i32,

        /// Chart another subject's smoothed mood
        #[arg(long)]
        subject: Option<i64>,

        /// Show the detail view around one day (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["window", "step"])]
        day: Option<NaiveDate>,

        /// Print the series as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse charts interactively from stdin
    Browse {
        /// Initial window
        #[arg(short, long)]
        window: Option<String>,

        /// Chart another subject's smoothed mood
        #[arg(long)]
        subject: Option<i64>,
    },

    /// Log a day's mood
    Log {
        /// Mood from -50 to 50
        #[arg(long, allow_hyphen_values = true)]
        mood: i64,

        /// Day to log (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Highest mood of the day
        #[arg(long, allow_hyphen_values = true)]
        max: Option<i64>,

        /// Lowest mood of the day
        #[arg(long, allow_hyphen_values = true)]
        min: Option<i64>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        subject: Option<i64>,
    },

    /// Log an event over logged days
    Event {
        #[arg(long)]
        name: String,

        /// Mood from -50 to 50
        #[arg(long, allow_hyphen_values = true)]
        mood: i64,

        /// First day of the event (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day of the event (default: same as --from)
        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        subject: Option<i64>,
    },

    /// Fill the log with demo data ending today
    Seed {
        #[arg(long, default_value = "400")]
        days: u32,
    },

    /// Show or edit configuration
    Config {
        /// Print current configuration
        #[arg(long)]
        show: bool,

        /// Create default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Database operations
    Db {
        /// Show database path and stats
        #[arg(long)]
        info: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = if let Some(ref path) = cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    config.validate()?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.general.log_level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Some(Commands::Chart {
            window,
            step,
            subject,
            day,
            json,
        }) => {
            let format = if json { ChartFormat::Json } else { ChartFormat::Text };
            run_chart(
                &config,
                window.as_deref(),
                step,
                subject.map(SubjectId),
                day,
                format,
            )
            .await
        }

        Some(Commands::Browse { window, subject }) => {
            run_browse(&config, window.as_deref(), subject.map(SubjectId)).await
        }

        Some(Commands::Log {
            mood,
            date,
            max,
            min,
            notes,
            subject,
        }) => {
            let db = open_database(&config).await?;
            let subject = subject.map_or_else(|| db.owner(), SubjectId);
            let date = date.unwrap_or_else(|| WindowResolver::default().today());
            let entry = DayEntry {
                date,
                mood: MoodScore::new(mood)?,
                high: max.map(MoodScore::new).transpose()?,
                low: min.map(MoodScore::new).transpose()?,
                notes,
            };
            db.log_day(subject, &entry).await?;
            println!("Logged mood {mood} for {date}");
            Ok(())
        }

        Some(Commands::Event {
            name,
            mood,
            from,
            to,
            notes,
            subject,
        }) => {
            let db = open_database(&config).await?;
            let subject = subject.map_or_else(|| db.owner(), SubjectId);
            let from = from.unwrap_or_else(|| WindowResolver::default().today());
            let span = DateRange::new(from, to.unwrap_or(from))?;
            let event = EventEntry {
                name,
                mood: MoodScore::new(mood)?,
                span,
                notes,
            };
            let (id, linked) = db.log_event(subject, &event).await?;
            if linked == 0 {
                warn!(%span, "no logged days in event span");
            }
            println!("Logged event #{id} over {linked} day(s)");
            Ok(())
        }

        Some(Commands::Seed { days }) => run_seed(&config, days).await,

        Some(Commands::Config { show, init }) => {
            if init {
                let default_config = Config::default();
                default_config.save()?;
                println!(
                    "Created default configuration at {}",
                    Config::config_path()?.display()
                );
            } else if show {
                let contents = toml::to_string_pretty(&config)?;
                println!("{contents}");
            } else {
                println!("Configuration path: {}", Config::config_path()?.display());
            }
            Ok(())
        }

        Some(Commands::Db { info }) => {
            if info {
                let db = open_database(&config).await?;
                let count = db.day_count(db.owner()).await?;
                println!("Database path: {}", config.database_path()?.display());
                println!("Logged days: {count}");
                match db.earliest_record(db.owner()).await? {
                    Some(first) => println!("First entry: {first}"),
                    None => println!("First entry: none"),
                }
            }
            Ok(())
        }

        None => {
            // Default: chart the configured window
            run_chart(&config, None, 0, None, None, ChartFormat::Text).await
        }
    }
}

async fn open_database(config: &Config) -> Result<Database> {
    let data_dir = config.data_dir()?;
    let db = Database::new(&config.database, &data_dir).await?;
    Ok(db
        .with_owner(SubjectId(config.chart.owner_id))
        .with_rolling_window(config.chart.rolling_window))
}

fn parse_window(config: &Config, window: Option<&str>) -> Result<WindowType> {
    window.map_or(Ok(config.chart.default_window), str::parse)
}

/// Build a chart driver drawing to stdout.
async fn build_driver(
    config: &Config,
    subject: Option<SubjectId>,
    format: ChartFormat,
) -> Result<ChartDriver<Database, TerminalChart<Stdout>>> {
    let db = open_database(config).await?;
    let earliest = db.earliest_record(subject.unwrap_or_else(|| db.owner())).await?;

    let controller =
        NavigationController::new(WindowResolver::default()).with_earliest_record(earliest);
    let session = ChartSession::new(controller, TerminalChart::new(io::stdout(), format));

    Ok(ChartDriver::new(Arc::new(db), session)
        .with_subject(subject)
        .with_fetch_timeout(config.chart.fetch_timeout()?))
}

async fn run_chart(
    config: &Config,
    window: Option<&str>,
    step: i32,
    subject: Option<SubjectId>,
    day: Option<NaiveDate>,
    format: ChartFormat,
) -> Result<()> {
    let mut driver = build_driver(config, subject, format).await?;

    // Navigate first so only the final range is fetched.
    let controller = driver.session_mut().controller_mut();
    if let Some(day) = day {
        controller.show_day(day)?;
    } else {
        let window = parse_window(config, window)?;
        if !controller.available_windows().contains(&window) {
            println!("{}", unavailable_notice(window));
            return Ok(());
        }
        controller.set_window(window)?;
        for _ in 0..step.unsigned_abs() {
            if step > 0 {
                if controller.step_forward()?.is_none() {
                    info!("already at the latest period");
                    break;
                }
            } else {
                controller.step_backward()?;
            }
        }
    }

    let (tx, rx) = mpsc::channel(1);
    tx.send(NavAction::Refresh)
        .await
        .map_err(|e| Error::other(e.to_string()))?;
    drop(tx);

    let session = driver.run(rx).await?;
    if session.state() == ChartState::Error {
        return Err(Error::other(
            session.last_error().unwrap_or("chart failed").to_string(),
        ));
    }
    Ok(())
}

/// A line typed at the browse prompt
#[derive(Debug, PartialEq, Eq)]
enum BrowseInput {
    Action(NavAction),
    Help,
    Quit,
}

fn parse_browse_input(line: &str) -> Result<Option<BrowseInput>> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };

    let input = match command {
        "f" => BrowseInput::Action(NavAction::StepForward),
        "b" => BrowseInput::Action(NavAction::StepBackward),
        "m" => BrowseInput::Action(NavAction::SetWindow(WindowType::Month)),
        "q" => BrowseInput::Action(NavAction::SetWindow(WindowType::Quarter)),
        "h" => BrowseInput::Action(NavAction::SetWindow(WindowType::BiAnnual)),
        "y" => BrowseInput::Action(NavAction::SetWindow(WindowType::Year)),
        "a" => BrowseInput::Action(NavAction::SetWindow(WindowType::AllTime)),
        "r" => BrowseInput::Action(NavAction::Refresh),
        "d" => {
            let day = parts
                .next()
                .ok_or_else(|| Error::other("usage: d YYYY-MM-DD"))?
                .parse::<NaiveDate>()
                .map_err(|e| Error::other(format!("bad date: {e}")))?;
            BrowseInput::Action(NavAction::ShowDay(day))
        }
        "?" | "help" => BrowseInput::Help,
        "x" | "exit" | "quit" => BrowseInput::Quit,
        other => BrowseInput::Action(NavAction::SetWindow(other.parse()?)),
    };
    Ok(Some(input))
}

fn format_status(status: &ChartStatus) -> String {
    let back = if status.can_step_backward { "[< b]" } else { "[  -]" };
    let forward = if status.can_step_forward { "[f >]" } else { "[-  ]" };
    let window = status.window.map_or("-", WindowType::label);
    let range = status
        .range
        .map_or_else(|| "no range".to_string(), |r| r.to_string());
    let mut line = format!("{back} {window}: {range} {forward}  ({:?})", status.state);
    if let (ChartState::Error, Some(error)) = (status.state, &status.last_error) {
        line.push_str(&format!("  error: {error}; r to retry"));
    }
    if !status.is_available(WindowType::AllTime) {
        line.push_str("  [all-time unavailable]");
    }
    line
}

fn unavailable_notice(window: WindowType) -> String {
    format!("{} view unavailable: no mood entries logged yet", window.label())
}

fn browse_help(status: &ChartStatus) -> String {
    let all = if status.is_available(WindowType::AllTime) {
        "a all"
    } else {
        "(a all: unavailable)"
    };
    format!("f/b step  m/q/h/y month/quarter/half/year  {all}  d DATE day  r refresh  x exit")
}

async fn run_browse(
    config: &Config,
    window: Option<&str>,
    subject: Option<SubjectId>,
) -> Result<()> {
    let driver = build_driver(config, subject, ChartFormat::Text).await?;
    let mut status = driver.subscribe();
    let input_status = driver.subscribe();
    let (tx, rx) = mpsc::channel(8);

    eprintln!("{}", browse_help(&status.borrow()));
    let mut window = parse_window(config, window)?;
    if !status.borrow().is_available(window) {
        eprintln!("{}", unavailable_notice(window));
        window = WindowType::Month;
    }
    tx.send(NavAction::SetWindow(window))
        .await
        .map_err(|e| Error::other(e.to_string()))?;

    let input = async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_browse_input(&line) {
                Ok(Some(BrowseInput::Action(NavAction::SetWindow(window))))
                    if !input_status.borrow().is_available(window) =>
                {
                    eprintln!("{}", unavailable_notice(window));
                }
                Ok(Some(BrowseInput::Action(action))) => {
                    if tx.send(action).await.is_err() {
                        break;
                    }
                }
                Ok(Some(BrowseInput::Help)) => {
                    eprintln!("{}", browse_help(&input_status.borrow()));
                }
                Ok(Some(BrowseInput::Quit)) => break,
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
        Ok::<_, Error>(())
    };

    let printer = async move {
        while status.changed().await.is_ok() {
            eprintln!("{}", format_status(&status.borrow_and_update()));
        }
    };

    let (session, input, ()) = tokio::join!(driver.run(rx), input, printer);
    input?;
    let mut session = session?;
    session.teardown();
    Ok(())
}

/// Deterministic demo moods: a slow wave plus a weekly wobble.
#[allow(clippy::cast_possible_truncation)]
fn demo_mood(day_index: u32) -> i64 {
    let t = f64::from(day_index);
    let wobble = 8.0 * (t / 7.0 * std::f64::consts::TAU).cos();
    let value = 20.0f64.mul_add((t / 45.0).sin(), wobble);
    (value.round() as i64).clamp(mood_charts::types::MOOD_MIN, mood_charts::types::MOOD_MAX)
}

async fn run_seed(config: &Config, days: u32) -> Result<()> {
    let db = open_database(config).await?;
    let owner = db.owner();
    let today = WindowResolver::default().today();

    for offset in 0..days {
        let date = today - chrono::Duration::days(i64::from(days - 1 - offset));
        let mood = demo_mood(offset);
        let entry = DayEntry {
            date,
            mood: MoodScore::new(mood)?,
            high: Some(MoodScore::new((mood + 10).min(mood_charts::types::MOOD_MAX))?),
            low: Some(MoodScore::new((mood - 10).max(mood_charts::types::MOOD_MIN))?),
            notes: None,
        };
        db.log_day(owner, &entry).await?;
    }

    if days >= 20 {
        let start = today - chrono::Duration::days(14);
        let span = DateRange::new(start, today - chrono::Duration::days(12))?;
        db.log_event(
            owner,
            &EventEntry {
                name: "Holiday".into(),
                mood: MoodScore::new(30)?,
                span,
                notes: None,
            },
        )
        .await?;
    }

    info!(days, "demo data written");
    println!("Seeded {days} day(s) ending {today}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browse_input() {
        assert_eq!(
            parse_browse_input("f").unwrap(),
            Some(BrowseInput::Action(NavAction::StepForward))
        );
        assert_eq!(
            parse_browse_input("  h ").unwrap(),
            Some(BrowseInput::Action(NavAction::SetWindow(WindowType::BiAnnual)))
        );
        assert_eq!(
            parse_browse_input("year").unwrap(),
            Some(BrowseInput::Action(NavAction::SetWindow(WindowType::Year)))
        );
        assert_eq!(
            parse_browse_input("d 2024-02-29").unwrap(),
            Some(BrowseInput::Action(NavAction::ShowDay(
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
            )))
        );
        assert_eq!(parse_browse_input("x").unwrap(), Some(BrowseInput::Quit));
        assert_eq!(parse_browse_input("").unwrap(), None);
        assert!(parse_browse_input("d").is_err());
        assert!(parse_browse_input("fortnight").is_err());
    }

    #[test]
    fn test_format_status_buttons() {
        let status = ChartStatus {
            state: ChartState::Ready,
            window: Some(WindowType::Quarter),
            can_step_backward: true,
            ..ChartStatus::default()
        };
        let line = format_status(&status);
        assert!(line.starts_with("[< b] Quarter"));
        assert!(line.contains("[-  ]"));
    }

    #[test]
    fn test_all_time_shown_unavailable_on_empty_log() {
        let status = ChartStatus {
            available_windows: vec![WindowType::Month, WindowType::Year],
            ..ChartStatus::default()
        };
        assert!(format_status(&status).contains("[all-time unavailable]"));
        assert!(browse_help(&status).contains("(a all: unavailable)"));

        let status = ChartStatus {
            available_windows: WindowType::all().to_vec(),
            ..ChartStatus::default()
        };
        assert!(!format_status(&status).contains("unavailable"));
        assert!(browse_help(&status).contains("  a all  "));
        assert_eq!(
            unavailable_notice(WindowType::AllTime),
            "All Time view unavailable: no mood entries logged yet"
        );
    }

    #[test]
    fn test_demo_mood_in_range() {
        for i in 0..1000 {
            let mood = demo_mood(i);
            assert!((mood_charts::types::MOOD_MIN..=mood_charts::types::MOOD_MAX).contains(&mood));
        }
    }
}
