/// ----- CONSOLE LOGGER -----
/// Backend for the `log` facade. Records targeted at `car-<id>` get that
/// car's color; warnings and errors get a highlighted background. Every line
/// starts with the time elapsed since the logger was installed.
use std::env;
use std::io::{stdout, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crossterm::style::{Color, Stylize};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Overrides the configured level when set.
pub const LOG_ENV: &str = "ELEVATOR_LOG";

const CAR_COLORS: [(u8, u8, u8); 9] = [
    (0, 200, 255),
    (255, 140, 0),
    (120, 220, 80),
    (220, 90, 220),
    (255, 215, 0),
    (100, 149, 237),
    (64, 224, 208),
    (255, 105, 180),
    (180, 180, 180),
];

/// Log target for everything concerning one car.
pub fn car_target(elevator_id: u8) -> String {
    format!("car-{}", elevator_id)
}

fn car_color(target: &str) -> Option<Color> {
    let id: usize = target.strip_prefix("car-")?.parse().ok()?;
    let (r, g, b) = CAR_COLORS[id % CAR_COLORS.len()];
    Some(Color::Rgb { r, g, b })
}

fn format_line(elapsed: Duration, record: &Record) -> String {
    format!(
        "+{:>3}.{:03}s {:<5} [{}] {}",
        elapsed.as_secs(),
        elapsed.subsec_millis(),
        record.level(),
        record.target(),
        record.args()
    )
}

pub struct ConsoleLogger {
    level: LevelFilter,
    start: Instant,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        ConsoleLogger {
            level,
            start: Instant::now(),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.start.elapsed(), record);
        let mut out = stdout().lock();
        // A closed stdout has nowhere to report to.
        let _ = match record.level() {
            Level::Error => writeln!(out, "{}", line.white().on(Color::DarkRed)),
            Level::Warn => writeln!(out, "{}", line.black().on(Color::Yellow)),
            _ => match car_color(record.target()) {
                Some(color) => writeln!(out, "{}", line.with(color)),
                None => writeln!(out, "{}", line),
            },
        };
    }

    fn flush(&self) {
        let _ = stdout().flush();
    }
}

/// Resolves the effective level: `ELEVATOR_LOG` wins over the configured
/// value; anything unparsable means `info`.
pub fn level_from(configured: &str) -> LevelFilter {
    env::var(LOG_ENV)
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .or_else(|| LevelFilter::from_str(configured).ok())
        .unwrap_or(LevelFilter::Info)
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(ConsoleLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}
