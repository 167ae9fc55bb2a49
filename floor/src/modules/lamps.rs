/// ----- LAMPS MODULE -----
/// Hall call lamps and per-car direction lamps of every floor, and the
/// threads that keep them up to date.

use std::io::stdout;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use shared_resources::direction::Direction;
use shared_resources::link::{Link, LinkError};
use shared_resources::logger::car_target;
use shared_resources::system_message::SystemMessage;

use crate::utilities::debug;

/// Something that changes a lamp.
#[derive(Debug, Clone, PartialEq)]
pub enum LampEvent {
    /// A lamp command relayed by the scheduler.
    Command(SystemMessage),
    /// A passenger pressed a hall button.
    CallPressed { floor: u8, direction: Direction },
}

fn slot(direction: Direction) -> Option<usize> {
    match direction {
        Direction::Up => Some(0),
        Direction::Down => Some(1),
        Direction::Stop => None,
    }
}

pub struct LampBoard {
    num_floors: u8,
    num_elevators: u8,
    floor_lamps: Vec<[bool; 2]>,
    direction_lamps: Vec<Vec<[bool; 2]>>,
}

impl LampBoard {
    pub fn new(num_floors: u8, num_elevators: u8) -> Self {
        LampBoard {
            num_floors,
            num_elevators,
            floor_lamps: vec![[false; 2]; num_floors as usize],
            direction_lamps: vec![vec![[false; 2]; num_elevators as usize]; num_floors as usize],
        }
    }

    pub fn num_floors(&self) -> u8 {
        self.num_floors
    }

    pub fn num_elevators(&self) -> u8 {
        self.num_elevators
    }

    /// Whether `floor` has a call button for `direction`. The top floor has
    /// no up button and the bottom floor no down button.
    pub fn has_floor_lamp(&self, floor: u8, direction: Direction) -> bool {
        match direction {
            Direction::Up => (1..self.num_floors).contains(&floor),
            Direction::Down => (2..=self.num_floors).contains(&floor),
            Direction::Stop => false,
        }
    }

    pub fn floor_lamp(&self, floor: u8, direction: Direction) -> bool {
        self.floor_lamp_slot(floor, direction)
            .map_or(false, |(i, s)| self.floor_lamps[i][s])
    }

    pub fn direction_lamp(&self, floor: u8, elevator_id: u8, direction: Direction) -> bool {
        self.direction_lamp_slot(floor, elevator_id, direction)
            .map_or(false, |(i, car, s)| self.direction_lamps[i][car][s])
    }

    fn floor_lamp_slot(&self, floor: u8, direction: Direction) -> Option<(usize, usize)> {
        if !self.has_floor_lamp(floor, direction) {
            return None;
        }
        Some((floor as usize - 1, slot(direction)?))
    }

    fn direction_lamp_slot(&self, floor: u8, elevator_id: u8, direction: Direction) -> Option<(usize, usize, usize)> {
        if !(1..=self.num_floors).contains(&floor) || elevator_id >= self.num_elevators {
            return None;
        }
        Some((floor as usize - 1, elevator_id as usize, slot(direction)?))
    }

    /// Returns whether the lamp changed.
    pub fn set_floor_lamp(&mut self, floor: u8, direction: Direction, state: bool) -> bool {
        let Some((i, s)) = self.floor_lamp_slot(floor, direction) else {
            debug!("Floor {} has no {} lamp", floor, direction);
            return false;
        };
        if self.floor_lamps[i][s] == state {
            return false;
        }
        self.floor_lamps[i][s] = state;
        info!(
            "Turned {} floor {} {} lamp",
            if state { "on" } else { "off" },
            floor,
            direction
        );
        true
    }

    /// Returns whether the lamp changed.
    pub fn set_direction_lamp(&mut self, floor: u8, elevator_id: u8, direction: Direction, state: bool) -> bool {
        let Some((i, car, s)) = self.direction_lamp_slot(floor, elevator_id, direction) else {
            warn!(
                "No {} direction lamp for elevator {} at floor {}",
                direction,
                elevator_id,
                floor
            );
            return false;
        };
        if self.direction_lamps[i][car][s] == state {
            return false;
        }
        self.direction_lamps[i][car][s] = state;
        info!(
            target: car_target(elevator_id).as_str(),
            "Turned {} elevator {} {} direction lamp at floor {}",
            if state { "on" } else { "off" },
            elevator_id,
            direction,
            floor
        );
        true
    }

    /// Returns whether any lamp changed.
    pub fn apply(&mut self, event: &LampEvent) -> bool {
        match event {
            LampEvent::CallPressed { floor, direction } => self.set_floor_lamp(*floor, *direction, true),
            LampEvent::Command(SystemMessage::SetFloorLamp { floor, direction, state, .. }) => {
                self.set_floor_lamp(*floor, *direction, *state)
            }
            LampEvent::Command(SystemMessage::SetFloorDirectionLamp {
                elevator_id,
                floor,
                direction,
                state,
            }) => self.set_direction_lamp(*floor, *elevator_id, *direction, *state),
            LampEvent::Command(other) => {
                warn!("Lamp controller ignoring {}", other.kind());
                false
            }
        }
    }
}

/// Receives lamp commands on the floor port and hands them to the board.
/// Returns once the board is gone.
pub fn listen(mut link: Link, lamps_tx: Sender<LampEvent>) -> Result<(), LinkError> {
    info!("Lamp controller listening on {}", link.local_addr());
    loop {
        let message = link.recv()?;
        if lamps_tx.send(LampEvent::Command(message)).is_err() {
            return Ok(());
        }
    }
}

/// Applies every lamp event to `board` until all senders are gone, redrawing
/// the lamp table on each change when `display` is set.
pub fn run_board(mut board: LampBoard, lamps_rx: Receiver<LampEvent>, display: bool) -> crossterm::Result<LampBoard> {
    let mut stdout = stdout();
    for event in lamps_rx.iter() {
        if board.apply(&event) && display {
            debug::print_lamps(&mut stdout, &board)?;
        }
    }
    Ok(board)
}
