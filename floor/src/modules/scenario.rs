/// ----- SCENARIO MODULE -----
/// Reads a scenario file of timed passenger requests and replays it against
/// the scheduler.
///
/// One request per line:
///
/// ```text
/// 14:05:15.000 2 up 4 DOOR_FAULT
/// ```
///
/// time of day, origin floor, hall button, destination floor and an optional
/// fault label. Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{info, warn};

use shared_resources::direction::Direction;
use shared_resources::link::{Link, LinkError};
use shared_resources::request::{FaultType, Request};
use shared_resources::system_message::SystemMessage;

use super::lamps::LampEvent;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("could not read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: missing {field}")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: invalid {field} {text:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        text: String,
    },

    #[error("line {line}: floor {floor} is outside the building")]
    FloorOutOfRange { line: usize, floor: u8 },

    #[error("line {line}: pressing {button} at floor {floor} does not lead to floor {car_button}")]
    ButtonMismatch {
        line: usize,
        floor: u8,
        button: Direction,
        car_button: u8,
    },
}

/// Parses `HH:MM:SS.mmm` into the time since midnight.
fn parse_time(text: &str) -> Option<Duration> {
    let mut parts = text.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    if parts.next().is_some() || minutes >= 60 {
        return None;
    }
    let (whole, millis) = match seconds.split_once('.') {
        Some((whole, fraction)) if fraction.len() == 3 => (whole.parse::<u64>().ok()?, fraction.parse::<u64>().ok()?),
        Some(_) => return None,
        None => (seconds.parse::<u64>().ok()?, 0),
    };
    if whole >= 60 {
        return None;
    }
    Some(Duration::from_millis(((hours * 60 + minutes) * 60 + whole) * 1000 + millis))
}

fn field<'a>(fields: &mut impl Iterator<Item = &'a str>, line: usize, name: &'static str) -> Result<&'a str, ScenarioError> {
    fields.next().ok_or(ScenarioError::MissingField { line, field: name })
}

fn invalid(line: usize, field: &'static str, text: &str) -> ScenarioError {
    ScenarioError::InvalidField {
        line,
        field,
        text: text.to_string(),
    }
}

fn parse_floor(text: &str, line: usize, name: &'static str, num_floors: u8) -> Result<u8, ScenarioError> {
    let floor: u8 = text.parse().map_err(|_| invalid(line, name, text))?;
    if !(1..=num_floors).contains(&floor) {
        return Err(ScenarioError::FloorOutOfRange { line, floor });
    }
    Ok(floor)
}

/// Parses one non-empty scenario line. `time` is left as the time of day.
fn parse_line(text: &str, line: usize, num_floors: u8) -> Result<Request, ScenarioError> {
    let mut fields = text.split_whitespace();

    let time = field(&mut fields, line, "time")?;
    let time = parse_time(time).ok_or_else(|| invalid(line, "time", time))?;

    let floor = parse_floor(field(&mut fields, line, "floor")?, line, "floor", num_floors)?;

    let button = field(&mut fields, line, "button")?;
    let button = Direction::from_button(button).ok_or_else(|| invalid(line, "button", button))?;

    let car_button = parse_floor(field(&mut fields, line, "car button")?, line, "car button", num_floors)?;
    if Direction::towards(floor, car_button) != button {
        return Err(ScenarioError::ButtonMismatch {
            line,
            floor,
            button,
            car_button,
        });
    }

    let fault = match fields.next() {
        Some(label) => FaultType::from_label(label).ok_or_else(|| invalid(line, "fault", label))?,
        None => FaultType::NoFault,
    };
    if let Some(extra) = fields.next() {
        return Err(invalid(line, "trailing field", extra));
    }

    Ok(Request::new(time, floor, button, car_button).with_fault(fault))
}

/// Parses a whole scenario. Request times become offsets from the first
/// request; a line earlier than the first one is taken as due immediately.
pub fn parse_scenario(contents: &str, num_floors: u8) -> Result<Vec<Request>, ScenarioError> {
    let mut requests = Vec::new();
    for (index, text) in contents.lines().enumerate() {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        requests.push(parse_line(text, index + 1, num_floors)?);
    }

    if let Some(start) = requests.first().map(|r| r.time) {
        for request in &mut requests {
            request.time = request.time.saturating_sub(start);
        }
    }
    Ok(requests)
}

pub fn read_scenario(path: &Path, num_floors: u8) -> Result<Vec<Request>, ScenarioError> {
    let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scenario(&contents, num_floors)
}

/// Sends scenario requests to the scheduler at their offsets and lights the
/// hall call lamp of each one.
pub struct Injector {
    link: Link,
    scheduler: SocketAddr,
    lamps_tx: Sender<LampEvent>,
}

impl Injector {
    pub fn new(link: Link, scheduler: SocketAddr, lamps_tx: Sender<LampEvent>) -> Self {
        Injector {
            link,
            scheduler,
            lamps_tx,
        }
    }

    pub fn run(&self, requests: Vec<Request>) -> Result<(), LinkError> {
        let start = Instant::now();
        info!("Replaying {} request(s)", requests.len());
        for request in requests {
            if let Some(delay) = request.time.checked_sub(start.elapsed()) {
                thread::sleep(delay);
            }
            info!("Sending request {} (fault: {:?})", request, request.fault);

            let call = LampEvent::CallPressed {
                floor: request.floor,
                direction: request.floor_button,
            };
            self.link.send(&SystemMessage::AddNewRequest { request }, self.scheduler)?;
            if self.lamps_tx.send(call).is_err() {
                warn!("Lamp board is gone, call lamps are no longer shown");
            }
        }
        info!("Scenario finished");
        Ok(())
    }
}
