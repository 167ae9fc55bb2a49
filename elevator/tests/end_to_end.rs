use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use elevator::modules::fsm::{CarSettings, CarSnapshot, ElevatorState};
use elevator::modules::{spawn_car, CarHandles};
use network_rust::udpnet::{Endpoint, MemoryEndpoint, MemoryNetwork};
use scheduler::modules::dispatcher::Dispatcher;
use shared_resources::config::TimingConfig;
use shared_resources::direction::Direction;
use shared_resources::link::Link;
use shared_resources::request::{FaultType, Request};
use shared_resources::system_message::{reply, SystemMessage};

const NUM_FLOORS: u8 = 10;
const PATIENCE: Duration = Duration::from_secs(10);
const QUIET: Duration = Duration::from_millis(300);

fn fast_timing() -> TimingConfig {
    TimingConfig {
        base_move: Duration::from_millis(20),
        incremental_move: Duration::from_millis(10),
        loading: Duration::from_millis(20),
        boarding_per_passenger: Duration::from_millis(2),
        transient_fault: Duration::from_millis(40),
        idle_poll: Duration::from_millis(5),
    }
}

/// A scheduler on an in-memory network, plus the floor side's endpoints.
struct Bank {
    network: MemoryNetwork,
    scheduler: SocketAddr,
    client: MemoryEndpoint,
    floor: MemoryEndpoint,
    snapshot_tx: Sender<CarSnapshot>,
    snapshots: Receiver<CarSnapshot>,
}

impl Bank {
    fn start() -> Self {
        let network = MemoryNetwork::new();
        let floor = network.bind(0).unwrap();
        let mut dispatcher = Dispatcher::new(
            Link::new(network.bind(0).unwrap()),
            Link::new(network.bind(0).unwrap()),
            floor.local_addr(),
        );
        let scheduler = dispatcher.request_addr();
        thread::spawn(move || {
            let _ = dispatcher.run();
        });
        let (snapshot_tx, snapshots) = unbounded();
        Bank {
            client: network.bind(0).unwrap(),
            network,
            scheduler,
            floor,
            snapshot_tx,
            snapshots,
        }
    }

    fn add_car(&self, elevator_id: u8, capacity: usize, timing: TimingConfig) -> CarHandles {
        let settings = CarSettings {
            elevator_id,
            num_floors: NUM_FLOORS,
            capacity,
            timing,
            scheduler: self.scheduler,
        };
        spawn_car(
            settings,
            self.network.bind(0).unwrap(),
            self.network.bind(0).unwrap(),
            self.snapshot_tx.clone(),
        )
        .unwrap()
    }

    fn send(&self, message: SystemMessage) {
        self.client.send_to(&message.encode().unwrap(), self.scheduler).unwrap();
    }

    fn request(&self, request: Request) {
        self.send(SystemMessage::AddNewRequest { request });
    }

    /// Collects snapshots, with their arrival time, up to and including the
    /// first one matching `done`.
    fn wait_for(&self, done: impl Fn(&CarSnapshot) -> bool) -> Vec<(Instant, CarSnapshot)> {
        let deadline = Instant::now() + PATIENCE;
        let mut seen = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            let snapshot = self
                .snapshots
                .recv_timeout(left)
                .unwrap_or_else(|_| panic!("car never got there, saw {:#?}", seen));
            let finished = done(&snapshot);
            seen.push((Instant::now(), snapshot));
            if finished {
                return seen;
            }
        }
    }

    fn floor_messages(&mut self) -> Vec<SystemMessage> {
        let mut messages = Vec::new();
        while let Some(bytes) = self.floor.recv_timeout(Duration::from_millis(50)).unwrap() {
            messages.push(SystemMessage::decode(&bytes).unwrap());
        }
        messages
    }
}

fn request(floor: u8, car_button: u8) -> Request {
    Request::new(Duration::ZERO, floor, Direction::towards(floor, car_button), car_button)
}

fn idle_at(elevator_id: u8, floor: u8) -> impl Fn(&CarSnapshot) -> bool {
    move |s| s.elevator_id == elevator_id && s.state == ElevatorState::Idle && s.floor == floor
}

fn state_names(seen: &[(Instant, CarSnapshot)]) -> Vec<&'static str> {
    seen.iter().map(|(_, s)| s.state.as_str()).collect()
}

#[test]
fn single_trip_from_first_to_fifth_floor() {
    let mut bank = Bank::start();
    let _car = bank.add_car(0, 5, fast_timing());
    bank.request(request(1, 5));

    let seen = bank.wait_for(idle_at(0, 5));
    assert_eq!(state_names(&seen), vec!["IDLE", "CLOSE_DOOR", "MOVING", "OPEN_DOOR", "IDLE"]);

    let (_, last) = seen.last().unwrap();
    assert!(last.door_open);
    assert!(!last.motor_running);
    assert!(!last.halted);

    let boarded = seen
        .iter()
        .find_map(|(_, s)| match &s.state {
            ElevatorState::Moving(primary) => Some(primary.clone()),
            _ => None,
        })
        .unwrap();
    assert!(boarded.is_picked_up());

    bank.send(SystemMessage::StatusRequest { elevator_id: 0 });
    let status = reply::decode_status(&bank.client.recv_timeout(PATIENCE).unwrap().unwrap()).unwrap();
    assert_eq!(status.floor, 5);
    assert!(status.stop_floors_up.is_empty());
    assert!(status.stop_floors_down.is_empty());
    assert!(status.in_service);

    let lamps = bank.floor_messages();
    assert!(lamps.contains(&SystemMessage::SetFloorDirectionLamp {
        elevator_id: 0,
        floor: 1,
        direction: Direction::Up,
        state: false,
    }));
}

#[test]
fn door_fault_delays_opening_and_recovers() {
    let bank = Bank::start();
    let timing = fast_timing();
    let _car = bank.add_car(0, 5, timing);
    bank.request(request(1, 3).with_fault(FaultType::DoorFault));

    let seen = bank.wait_for(idle_at(0, 3));
    assert_eq!(state_names(&seen), vec!["IDLE", "CLOSE_DOOR", "MOVING", "OPEN_DOOR", "IDLE"]);

    let (opened, _) = seen.iter().find(|(_, s)| s.state.as_str() == "OPEN_DOOR").unwrap();
    let (closed, last) = seen.last().unwrap();
    // Sleeps alone add up to loading + transient + loading / 2.
    assert!(*closed - *opened >= timing.loading + timing.transient_fault);
    assert!(!last.halted);
}

#[test]
fn floor_timer_fault_halts_the_car_and_hands_back_its_work() {
    let bank = Bank::start();
    let first = bank.add_car(0, 5, fast_timing());
    bank.request(request(1, 4).with_fault(FaultType::FloorTimerFault));
    bank.request(request(6, 9));

    let seen = bank.wait_for(|s| s.halted);
    let (_, halted) = seen.last().unwrap();
    assert_eq!(halted.elevator_id, 0);
    assert_eq!(halted.floor, 4);
    assert!(!halted.motor_running);

    first.car.join().unwrap();
    assert!(bank.snapshots.recv_timeout(QUIET).is_err());

    // The pending request comes back through the shutdown report and goes to
    // the next car that shows up.
    let _second = bank.add_car(1, 5, fast_timing());
    let seen = bank.wait_for(idle_at(1, 9));
    assert!(seen.iter().all(|(_, s)| s.elevator_id == 1));
}

#[test]
fn full_car_switches_primary_instead_of_boarding() {
    let bank = Bank::start();
    let timing = TimingConfig {
        base_move: Duration::from_millis(60),
        incremental_move: Duration::from_millis(20),
        loading: Duration::from_millis(60),
        ..fast_timing()
    };
    let _car = bank.add_car(0, 1, timing);

    bank.request(request(5, 9));
    bank.wait_for(|s| s.state.as_str() == "CLOSE_DOOR");
    bank.request(request(2, 7));

    let seen = bank.wait_for(idle_at(0, 9));
    let switched = seen.iter().any(|(_, s)| {
        s.floor == 5
            && matches!(&s.state, ElevatorState::Moving(primary) if primary.car_button == 7 && primary.is_picked_up())
    });
    assert!(switched, "car never switched to the boarded passenger at floor 5: {:#?}", seen);

    let delivered_first = seen
        .iter()
        .position(|(_, s)| s.floor == 7 && s.state.as_str() == "OPEN_DOOR")
        .unwrap();
    let boarded_later = seen
        .iter()
        .rposition(|(_, s)| {
            s.floor == 5 && matches!(&s.state, ElevatorState::Moving(primary) if primary.car_button == 9)
        })
        .unwrap();
    assert!(delivered_first < boarded_later);
}

/// Time from entering the first `state` at `floor` until the next snapshot.
fn time_in(seen: &[(Instant, CarSnapshot)], state: &str, floor: u8) -> Duration {
    let at = seen
        .iter()
        .position(|(_, s)| s.state.as_str() == state && s.floor == floor)
        .unwrap_or_else(|| panic!("no {} at floor {} in {:#?}", state, floor, seen));
    seen[at + 1].0 - seen[at].0
}

#[test]
fn full_car_boards_its_primary_once_a_rider_got_off() {
    let bank = Bank::start();
    // Both requests are held back until the car registers, so 5->9 is the
    // primary and 1->5 takes the only seat on the way.
    bank.request(request(5, 9));
    bank.request(request(1, 5));
    let _car = bank.add_car(0, 1, fast_timing());

    let seen = bank.wait_for(idle_at(0, 9));
    assert!(seen.iter().all(|(_, s)| s.floor <= 9), "car overshot: {:#?}", seen);
    let boarded_at_five = seen.iter().any(|(_, s)| {
        s.floor == 5 && matches!(&s.state, ElevatorState::Moving(primary) if primary.car_button == 9 && primary.is_picked_up())
    });
    assert!(boarded_at_five, "primary passenger never boarded at floor 5: {:#?}", seen);
}

#[test]
fn boarding_and_unboarding_time_is_spent_at_the_stop_it_belongs_to() {
    let bank = Bank::start();
    let timing = TimingConfig {
        boarding_per_passenger: Duration::from_millis(150),
        ..fast_timing()
    };
    bank.request(request(1, 9));
    bank.request(request(1, 4));
    let _car = bank.add_car(0, 5, timing);

    let seen = bank.wait_for(idle_at(0, 9));
    assert_eq!(
        state_names(&seen),
        vec!["IDLE", "CLOSE_DOOR", "MOVING", "OPEN_DOOR", "CLOSE_DOOR", "MOVING", "OPEN_DOOR", "IDLE"]
    );

    let half_loading = timing.loading / 2;
    let one = timing.boarding_per_passenger;
    // Two board at floor 1, one gets off at floor 4 on the way to floor 9.
    assert!(time_in(&seen, "CLOSE_DOOR", 1) >= half_loading + one * 2);
    assert!(time_in(&seen, "OPEN_DOOR", 4) >= half_loading + one);
    assert!(time_in(&seen, "CLOSE_DOOR", 4) < one);
    let at_nine = time_in(&seen, "OPEN_DOOR", 9);
    assert!(at_nine >= half_loading + one);
    assert!(at_nine < one * 2, "floor 9 was charged for {:?}", at_nine);
}
