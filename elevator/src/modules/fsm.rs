/// ----- FSM MODULE -----
/// The finite state machine driving one car through
/// Idle -> CloseDoor -> Moving -> OpenDoor -> (CloseDoor | Idle).
/// Every state except Idle carries the primary request the car is driving
/// towards. Travel and door times are simulated with sleeps; all questions
/// about the queue that involve other passengers go through the scheduler.

use std::fmt;
use std::net::SocketAddr;
use std::sync::MutexGuard;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};

use shared_resources::config::TimingConfig;
use shared_resources::direction::Direction;
use shared_resources::link::{Link, LinkError};
use shared_resources::logger::car_target;
use shared_resources::request::{FaultType, Request};
use shared_resources::system_message::SystemMessage;

use crate::utilities::request_queue::{self, RequestQueue, SharedQueue};
use crate::utilities::travel_clock::TravelClock;

#[derive(Debug, Clone, PartialEq)]
pub enum ElevatorState {
    Idle,
    CloseDoor(Request),
    Moving(Request),
    OpenDoor(Request),
}

impl ElevatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElevatorState::Idle => "IDLE",
            ElevatorState::CloseDoor(_) => "CLOSE_DOOR",
            ElevatorState::Moving(_) => "MOVING",
            ElevatorState::OpenDoor(_) => "OPEN_DOOR",
        }
    }

    pub fn primary(&self) -> Option<&Request> {
        match self {
            ElevatorState::Idle => None,
            ElevatorState::CloseDoor(r) | ElevatorState::Moving(r) | ElevatorState::OpenDoor(r) => Some(r),
        }
    }
}

/// What the car looked like when it entered `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct CarSnapshot {
    pub elevator_id: u8,
    pub state: ElevatorState,
    pub floor: u8,
    pub direction: Direction,
    pub door_open: bool,
    pub motor_running: bool,
    pub halted: bool,
}

impl fmt::Display for CarSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} floor {} {} door {} motor {}",
            if self.halted { "HALTED" } else { self.state.as_str() },
            self.floor,
            self.direction,
            if self.door_open { "open" } else { "closed" },
            if self.motor_running { "on" } else { "off" }
        )?;
        if let Some(primary) = self.state.primary() {
            write!(f, " primary {}", primary)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CarSettings {
    pub elevator_id: u8,
    pub num_floors: u8,
    pub capacity: usize,
    pub timing: TimingConfig,
    pub scheduler: SocketAddr,
}

pub struct Elevator {
    elevator_id: u8,
    target: String,
    num_floors: u8,
    timing: TimingConfig,
    scheduler: SocketAddr,
    link: Link,
    queue: SharedQueue,
    snapshot_tx: Sender<CarSnapshot>,
    floor: u8,
    direction: Direction,
    motor_running: bool,
    door_open: bool,
    clock: TravelClock,
}

impl Elevator {
    /// A car standing at floor 1 with its door open.
    pub fn new(settings: &CarSettings, link: Link, queue: SharedQueue, snapshot_tx: Sender<CarSnapshot>) -> Self {
        Elevator {
            elevator_id: settings.elevator_id,
            target: car_target(settings.elevator_id),
            num_floors: settings.num_floors,
            timing: settings.timing,
            scheduler: settings.scheduler,
            link,
            queue,
            snapshot_tx,
            floor: 1,
            direction: Direction::Stop,
            motor_running: false,
            door_open: true,
            clock: TravelClock::new(),
        }
    }

    /// Runs until a hard fault halts the car. Returns early only on a
    /// transport or codec error.
    pub fn run(&mut self) -> Result<(), LinkError> {
        let mut state = ElevatorState::Idle;
        loop {
            self.publish(&state, false);
            match self.step(state)? {
                Some(next) => state = next,
                None => return Ok(()),
            }
        }
    }

    /// Runs the handler of `state` and returns the state to enter next, or
    /// `None` once the car has shut down.
    pub fn step(&mut self, state: ElevatorState) -> Result<Option<ElevatorState>, LinkError> {
        match state {
            ElevatorState::Idle => self.idle().map(Some),
            ElevatorState::CloseDoor(primary) => self.close_door(primary).map(Some),
            ElevatorState::Moving(primary) => self.moving(primary),
            ElevatorState::OpenDoor(primary) => self.open_door(primary).map(Some),
        }
    }

    fn idle(&mut self) -> Result<ElevatorState, LinkError> {
        self.set_direction(Direction::Stop);
        info!(target: self.target.as_str(), "ELEVATOR {} STATE: IDLE", self.elevator_id);
        info!(target: self.target.as_str(), "Waiting for a request at floor {}", self.floor);

        let primary = loop {
            match self.link.request_primary(self.elevator_id, self.scheduler)? {
                Some(request) => break request,
                None => thread::sleep(self.timing.idle_poll),
            }
        };

        self.set_direction(Direction::towards(self.floor, primary.current_target_floor()));
        info!(
            target: self.target.as_str(),
            "New primary request {} direction {}",
            primary,
            self.direction
        );
        Ok(ElevatorState::CloseDoor(primary))
    }

    fn close_door(&mut self, mut primary: Request) -> Result<ElevatorState, LinkError> {
        info!(target: self.target.as_str(), "ELEVATOR {} STATE: CLOSE_DOOR", self.elevator_id);

        if primary.current_target_floor() == self.floor && !primary.is_picked_up() {
            let mut queue = self.queue();
            if queue.is_at_capacity() {
                match queue.switch_primary_request(&primary) {
                    Some(next) => {
                        drop(queue);
                        info!(
                            target: self.target.as_str(),
                            "Couldn't pick up passenger for primary request, elevator is full. Switching to {}",
                            next
                        );
                        primary = next;
                        let direction = match Direction::towards(self.floor, primary.current_target_floor()) {
                            Direction::Stop => primary.direction().unwrap_or(self.direction),
                            direction => direction,
                        };
                        self.set_direction(direction);
                    }
                    None => {
                        queue.enqueue(primary);
                        drop(queue);
                        warn!(target: self.target.as_str(), "Elevator is full with nobody left to deliver");
                        return Ok(ElevatorState::Idle);
                    }
                }
            } else {
                queue.board(&mut primary);
                drop(queue);
                let direction = primary.direction().unwrap_or(self.direction);
                self.set_direction(direction);
                info!(target: self.target.as_str(), "Picked up passenger for primary request");
            }
        }

        self.link.send(
            &SystemMessage::ServiceArrivals {
                elevator_id: self.elevator_id,
                floor: self.floor,
                direction: self.direction,
            },
            self.scheduler,
        )?;
        self.sync_with_controller()?;
        let boarding = self.queue().take_boarded_count();

        info!(target: self.target.as_str(), "Closing door");
        self.wait(self.timing.loading / 2);
        self.wait(self.timing.boarding_per_passenger * boarding as u32);
        info!(target: self.target.as_str(), "Boarding passenger count: {}", boarding);

        self.door_open = false;
        info!(target: self.target.as_str(), "Door closed");
        self.set_direction_lamp(false)?;

        Ok(ElevatorState::Moving(primary))
    }

    fn moving(&mut self, primary: Request) -> Result<Option<ElevatorState>, LinkError> {
        info!(target: self.target.as_str(), "ELEVATOR {} STATE: MOVING", self.elevator_id);
        info!(target: self.target.as_str(), "Current floor: {}", self.floor);

        let target_floor = primary.current_target_floor();
        if target_floor == self.floor {
            info!(target: self.target.as_str(), "Already at floor {}, no need to move", self.floor);
            return Ok(Some(ElevatorState::OpenDoor(primary)));
        }

        self.motor_running = true;
        self.clock.start_leg(self.timing.base_move);
        self.wait(self.timing.base_move / 2);

        loop {
            let next_floor = self.direction.next_floor(self.floor);
            if next_floor == self.floor || !(1..=self.num_floors).contains(&next_floor) {
                let towards = Direction::towards(self.floor, target_floor);
                if towards == Direction::Stop || towards == self.direction {
                    error!(
                        target: self.target.as_str(),
                        "Cannot move {} from floor {} towards floor {}",
                        self.direction,
                        self.floor,
                        target_floor
                    );
                    break;
                }
                warn!(
                    target: self.target.as_str(),
                    "Cannot move {} from floor {}, turning {} towards floor {}",
                    self.direction,
                    self.floor,
                    towards,
                    target_floor
                );
                self.set_direction(towards);
                continue;
            }
            let stop_required =
                self.link
                    .request_stop_required(self.elevator_id, next_floor, self.direction, self.scheduler)?;

            self.clock.extend(self.timing.incremental_move);
            self.wait(self.timing.incremental_move);

            self.floor = next_floor;
            self.mirror_position();
            info!(target: self.target.as_str(), "Moved to next floor: {}", self.floor);

            if target_floor == next_floor || stop_required {
                break;
            }
        }

        self.wait(self.timing.base_move / 2);
        info!(
            target: self.target.as_str(),
            "Deadline: {:?} Time: {:?}",
            self.clock.deadline(),
            self.clock.elapsed()
        );

        if self.clock.is_overdue() || self.has_fault(FaultType::FloorTimerFault, &primary) {
            self.shut_down(primary)?;
            return Ok(None);
        }

        self.motor_running = false;
        info!(target: self.target.as_str(), "Stopped at floor {}", self.floor);
        Ok(Some(ElevatorState::OpenDoor(primary)))
    }

    fn open_door(&mut self, primary: Request) -> Result<ElevatorState, LinkError> {
        info!(target: self.target.as_str(), "ELEVATOR {} STATE: OPEN_DOOR", self.elevator_id);

        if self.has_fault(FaultType::DoorFault, &primary) {
            self.wait(self.timing.loading);
            warn!(target: self.target.as_str(), "Elevator {} has door fault at floor {}", self.elevator_id, self.floor);
            info!(target: self.target.as_str(), "Waiting before attempting again");
            self.wait(self.timing.transient_fault);
            info!(target: self.target.as_str(), "Attempting again");
        }
        self.wait(self.timing.loading / 2);
        self.door_open = true;

        self.link.send(
            &SystemMessage::CompleteArrivals {
                elevator_id: self.elevator_id,
                floor: self.floor,
                direction: self.direction,
            },
            self.scheduler,
        )?;
        self.sync_with_controller()?;
        info!(target: self.target.as_str(), "Opened door at floor {}", self.floor);

        let completed = primary.is_picked_up() && primary.current_target_floor() == self.floor;
        if completed {
            info!(target: self.target.as_str(), "Completed primary request: {}", primary);
            self.queue().deliver(&primary);
        }

        let unboarding = self.queue().take_unboarded_count();
        let unboarding_time = self.timing.boarding_per_passenger * unboarding as u32;
        self.wait(unboarding_time);
        info!(
            target: self.target.as_str(),
            "Unboarding passenger count: {} WaitTime: {:?}",
            unboarding,
            unboarding_time
        );

        let primary = if completed {
            match self.link.request_primary(self.elevator_id, self.scheduler)? {
                None => {
                    info!(target: self.target.as_str(), "No request in queue, going to IDLE");
                    return Ok(ElevatorState::Idle);
                }
                Some(next) => {
                    info!(target: self.target.as_str(), "New primary request: {}", next);
                    let direction = match Direction::towards(self.floor, next.current_target_floor()) {
                        Direction::Stop => next.direction().unwrap_or(Direction::Down),
                        direction => direction,
                    };
                    self.set_direction(direction);
                    next
                }
            }
        } else {
            primary
        };

        self.set_floor_lamp(false)?;
        self.set_direction_lamp(true)?;
        Ok(ElevatorState::CloseDoor(primary))
    }

    /// Reports every request this car can no longer serve and stops it for
    /// good.
    fn shut_down(&mut self, primary: Request) -> Result<(), LinkError> {
        self.motor_running = false;
        let last_state = ElevatorState::Moving(primary.clone());
        let mut requests = {
            let mut queue = self.queue();
            queue.take_out_of_service();
            queue.waiting_requests()
        };
        if !primary.is_picked_up() {
            requests.push(primary);
        }
        self.link.send(
            &SystemMessage::ShutdownReport {
                elevator_id: self.elevator_id,
                requests,
            },
            self.scheduler,
        )?;

        error!(
            target: self.target.as_str(),
            "Elevator {} FloorTimerFault at floor {}",
            self.elevator_id,
            self.floor
        );
        info!(target: self.target.as_str(), "Elevator {} is shutting down", self.elevator_id);
        self.publish(&last_state, true);
        Ok(())
    }

    /// Returns once the controller has applied every notice this car sent
    /// before. The scheduler forwards in arrival order and the controller
    /// handles its inbox in order, so the status reply comes after them.
    fn sync_with_controller(&mut self) -> Result<(), LinkError> {
        let status = self.link.request_status(self.elevator_id, self.scheduler)?;
        debug!(
            target: self.target.as_str(),
            "Queue in sync, stops up {:?} down {:?}",
            status.stop_floors_up,
            status.stop_floors_down
        );
        Ok(())
    }

    /// A boarded passenger bound for this floor, the primary one included,
    /// carries `fault`.
    fn has_fault(&self, fault: FaultType, primary: &Request) -> bool {
        let primary_fault = primary.is_picked_up() && primary.car_button == self.floor && primary.has_fault(fault);
        primary_fault || self.queue().has_fault(fault, self.floor)
    }

    /// Hall call lamp at the current floor, relayed to the floor side.
    fn set_floor_lamp(&self, state: bool) -> Result<(), LinkError> {
        self.send_lamp(SystemMessage::SetFloorLamp {
            elevator_id: self.elevator_id,
            floor: self.floor,
            direction: self.direction,
            state,
        })
    }

    /// This car's direction lamp at the current floor.
    fn set_direction_lamp(&self, state: bool) -> Result<(), LinkError> {
        self.send_lamp(SystemMessage::SetFloorDirectionLamp {
            elevator_id: self.elevator_id,
            floor: self.floor,
            direction: self.direction,
            state,
        })
    }

    fn send_lamp(&self, message: SystemMessage) -> Result<(), LinkError> {
        info!(target: self.target.as_str(), "{}", message);
        self.link.send(&message, self.scheduler)
    }

    fn queue(&self) -> MutexGuard<'_, RequestQueue> {
        request_queue::lock(&self.queue)
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.mirror_position();
    }

    fn mirror_position(&self) {
        self.queue().set_position(self.floor, self.direction);
    }

    /// Simulated door, boarding or travel time.
    fn wait(&mut self, duration: Duration) {
        self.clock.advance(duration);
        thread::sleep(duration);
    }

    fn publish(&self, state: &ElevatorState, halted: bool) {
        // Nobody watching is fine.
        let _ = self.snapshot_tx.send(CarSnapshot {
            elevator_id: self.elevator_id,
            state: state.clone(),
            floor: self.floor,
            direction: self.direction,
            door_open: self.door_open,
            motor_running: self.motor_running,
            halted,
        });
    }
}
