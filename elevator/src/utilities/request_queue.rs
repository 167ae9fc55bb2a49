/// ----- REQUEST QUEUE -----
/// Requests assigned to one car, split by travel direction, together with
/// the car's in-car lamps, passenger counters and a mirror of its position.
/// Shared between the car's state machine and its controller behind one
/// mutex; see `SharedQueue`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use shared_resources::direction::Direction;
use shared_resources::elevator_status::ElevatorStatus;
use shared_resources::logger::car_target;
use shared_resources::request::{FaultType, Request};

pub type SharedQueue = Arc<Mutex<RequestQueue>>;

/// Locks the queue. A panic on the other side leaves the queue itself
/// consistent, so a poisoned lock is taken over.
pub fn lock(queue: &SharedQueue) -> MutexGuard<'_, RequestQueue> {
    queue.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct RequestQueue {
    elevator_id: u8,
    target: String,
    num_floors: u8,
    capacity: usize,
    up: VecDeque<Request>,
    down: VecDeque<Request>,
    car_lamps: Vec<bool>,
    riders: usize,
    boarded_at_stop: usize,
    unboarded_at_stop: usize,
    has_waiting_work: bool,
    floor: u8,
    direction: Direction,
    in_service: bool,
}

impl RequestQueue {
    pub fn new(elevator_id: u8, num_floors: u8, capacity: usize) -> Self {
        RequestQueue {
            elevator_id,
            target: car_target(elevator_id),
            num_floors,
            capacity,
            up: VecDeque::new(),
            down: VecDeque::new(),
            car_lamps: vec![false; num_floors as usize],
            riders: 0,
            boarded_at_stop: 0,
            unboarded_at_stop: 0,
            has_waiting_work: false,
            floor: 1,
            direction: Direction::Stop,
            in_service: true,
        }
    }

    pub fn shared(self) -> SharedQueue {
        Arc::new(Mutex::new(self))
    }

    fn list(&self, direction: Direction) -> Option<&VecDeque<Request>> {
        match direction {
            Direction::Up => Some(&self.up),
            Direction::Down => Some(&self.down),
            Direction::Stop => None,
        }
    }

    fn list_mut(&mut self, direction: Direction) -> Option<&mut VecDeque<Request>> {
        match direction {
            Direction::Up => Some(&mut self.up),
            Direction::Down => Some(&mut self.down),
            Direction::Stop => None,
        }
    }

    fn in_building(&self, floor: u8) -> bool {
        (1..=self.num_floors).contains(&floor)
    }

    /// Adds a request to the list for its travel direction. Requests that
    /// go nowhere or leave the building are refused.
    pub fn enqueue(&mut self, request: Request) -> bool {
        let Some(direction) = request.direction() else {
            warn!(target: self.target.as_str(), "Refusing request {}: no travel direction", request);
            return false;
        };
        if !self.in_building(request.floor) || !self.in_building(request.car_button) {
            warn!(target: self.target.as_str(), "Refusing request {}: floor out of range", request);
            return false;
        }
        debug!(target: self.target.as_str(), "Queued {} request {}", direction, request);
        if let Some(list) = self.list_mut(direction) {
            list.push_back(request);
        }
        self.has_waiting_work = true;
        true
    }

    /// Removes the request the car should drive to next: boarded passengers
    /// first (up before down), then the oldest pending up request, then the
    /// oldest pending down request.
    pub fn next_primary_request(&mut self) -> Option<Request> {
        if !self.has_waiting_work {
            return None;
        }
        let next = take_first(&mut self.up, Request::is_picked_up)
            .or_else(|| take_first(&mut self.down, Request::is_picked_up))
            .or_else(|| self.up.pop_front())
            .or_else(|| self.down.pop_front());
        self.refresh_waiting_work();
        next
    }

    /// Swaps `current` for the next primary request and queues `current`
    /// again. `None` when nothing else is queued; `current` then stays the
    /// caller's.
    pub fn switch_primary_request(&mut self, current: &Request) -> Option<Request> {
        let next = self.next_primary_request()?;
        if let Some(list) = current.direction().and_then(|direction| self.list_mut(direction)) {
            list.push_back(current.clone());
            self.has_waiting_work = true;
        }
        Some(next)
    }

    pub fn stop_required_at(&self, floor: u8, direction: Direction) -> bool {
        self.list(direction)
            .map_or(false, |list| list.iter().any(|r| r.current_target_floor() == floor))
    }

    /// Boards the pending passengers waiting at `floor` for `direction`,
    /// as long as there is room. Returns how many boarded.
    pub fn service_arrivals(&mut self, floor: u8, direction: Direction) -> usize {
        let mut boarded = Vec::new();
        let mut room = self.capacity.saturating_sub(self.riders);
        if let Some(list) = self.list_mut(direction) {
            for request in list.iter_mut().filter(|r| !r.is_picked_up() && r.floor == floor) {
                if room == 0 {
                    break;
                }
                request.pick_up();
                room -= 1;
                boarded.push(request.car_button);
            }
        }
        for car_button in &boarded {
            self.riders += 1;
            self.boarded_at_stop += 1;
            info!(target: self.target.as_str(), "Passenger boarded at floor {} for floor {}", floor, car_button);
            self.set_car_lamp(*car_button, true);
        }
        if room == 0 && self.has_pending_at(floor, direction) {
            info!(target: self.target.as_str(), "Elevator full, leaving passengers waiting at floor {}", floor);
        }
        boarded.len()
    }

    fn has_pending_at(&self, floor: u8, direction: Direction) -> bool {
        self.list(direction)
            .map_or(false, |list| list.iter().any(|r| !r.is_picked_up() && r.floor == floor))
    }

    /// Drops off the boarded passengers travelling to `floor` in
    /// `direction`. Returns how many left the car.
    pub fn complete_arrivals(&mut self, floor: u8, direction: Direction) -> usize {
        let mut delivered = Vec::new();
        if let Some(list) = self.list_mut(direction) {
            list.retain(|r| {
                let done = r.is_picked_up() && r.car_button == floor;
                if done {
                    delivered.push(r.clone());
                }
                !done
            });
        }
        for request in &delivered {
            info!(target: self.target.as_str(), "Passenger delivered to floor {}: {}", floor, request);
            self.unboard(request);
        }
        self.refresh_waiting_work();
        delivered.len()
    }

    /// Boards the passenger of the car's primary request.
    pub fn board(&mut self, request: &mut Request) {
        request.pick_up();
        self.riders += 1;
        self.boarded_at_stop += 1;
        self.set_car_lamp(request.car_button, true);
    }

    /// Drops off the passenger of the car's primary request.
    pub fn deliver(&mut self, request: &Request) {
        self.unboard(request);
    }

    fn unboard(&mut self, request: &Request) {
        self.riders = self.riders.saturating_sub(1);
        self.unboarded_at_stop += 1;
        self.set_car_lamp(request.car_button, false);
    }

    pub fn is_at_capacity(&self) -> bool {
        self.riders >= self.capacity
    }

    pub fn riders(&self) -> usize {
        self.riders
    }

    /// Passengers boarded since the last call.
    pub fn take_boarded_count(&mut self) -> usize {
        std::mem::take(&mut self.boarded_at_stop)
    }

    /// Passengers dropped off since the last call.
    pub fn take_unboarded_count(&mut self) -> usize {
        std::mem::take(&mut self.unboarded_at_stop)
    }

    /// A queued, boarded passenger bound for `floor` carries `fault`.
    pub fn has_fault(&self, fault: FaultType, floor: u8) -> bool {
        self.up
            .iter()
            .chain(self.down.iter())
            .any(|r| r.is_picked_up() && r.car_button == floor && r.has_fault(fault))
    }

    /// Copies of every request still waiting for pickup, up list first.
    pub fn waiting_requests(&self) -> Vec<Request> {
        self.up
            .iter()
            .chain(self.down.iter())
            .filter(|r| !r.is_picked_up())
            .cloned()
            .collect()
    }

    pub fn has_waiting_work(&self) -> bool {
        self.has_waiting_work
    }

    fn refresh_waiting_work(&mut self) {
        if self.up.is_empty() && self.down.is_empty() {
            self.has_waiting_work = false;
        }
    }

    pub fn car_lamp(&self, floor: u8) -> bool {
        floor
            .checked_sub(1)
            .and_then(|i| self.car_lamps.get(i as usize))
            .copied()
            .unwrap_or(false)
    }

    fn set_car_lamp(&mut self, floor: u8, state: bool) {
        let Some(lamp) = floor.checked_sub(1).and_then(|i| self.car_lamps.get_mut(i as usize)) else {
            return;
        };
        if *lamp != state {
            *lamp = state;
            info!(
                target: self.target.as_str(),
                "Turned {} elevator button {}",
                if state { "on" } else { "off" },
                floor
            );
        }
    }

    /// Mirrors the car's position so status queries need no access to the
    /// state machine.
    pub fn set_position(&mut self, floor: u8, direction: Direction) {
        self.floor = floor;
        self.direction = direction;
    }

    pub fn take_out_of_service(&mut self) {
        self.in_service = false;
    }

    /// The stop sets hold the current target of every queued request: the
    /// origin of a waiting passenger and the destination of one aboard.
    pub fn status(&self) -> ElevatorStatus {
        ElevatorStatus {
            elevator_id: self.elevator_id,
            direction: self.direction,
            floor: self.floor,
            stop_floors_up: self.up.iter().map(Request::current_target_floor).collect(),
            stop_floors_down: self.down.iter().map(Request::current_target_floor).collect(),
            in_service: self.in_service,
        }
    }
}

fn take_first(list: &mut VecDeque<Request>, predicate: fn(&Request) -> bool) -> Option<Request> {
    let index = list.iter().position(predicate)?;
    list.remove(index)
}
