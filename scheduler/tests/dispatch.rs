use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use network_rust::udpnet::{Endpoint, MemoryEndpoint, MemoryNetwork};
use scheduler::modules::dispatcher::Dispatcher;
use shared_resources::direction::Direction;
use shared_resources::elevator_status::ElevatorStatus;
use shared_resources::link::Link;
use shared_resources::request::Request;
use shared_resources::system_message::{reply, SystemMessage};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

struct Harness {
    network: MemoryNetwork,
    dispatcher: SocketAddr,
    floor: MemoryEndpoint,
    client: MemoryEndpoint,
}

impl Harness {
    fn start() -> Self {
        let network = MemoryNetwork::new();
        let floor = network.bind(0).unwrap();
        let mut dispatcher = Dispatcher::new(
            Link::new(network.bind(0).unwrap()),
            Link::new(network.bind(0).unwrap()),
            floor.local_addr(),
        );
        let addr = dispatcher.request_addr();
        thread::spawn(move || {
            let _ = dispatcher.run();
        });
        let client = network.bind(0).unwrap();
        Harness {
            network,
            dispatcher: addr,
            floor,
            client,
        }
    }

    fn send(&self, message: SystemMessage) {
        self.client.send_to(&message.encode().unwrap(), self.dispatcher).unwrap();
    }

    fn reply(&mut self) -> Vec<u8> {
        self.client.recv_timeout(WAIT).unwrap().expect("no reply from dispatcher")
    }

    /// Registers a controller that answers status queries with `status`,
    /// primary queries with `primary`, stop queries with `stop`, and hands
    /// every other command to the returned channel.
    fn fake_controller(&self, status: ElevatorStatus, primary: Option<Request>, stop: bool) -> Receiver<SystemMessage> {
        let mut endpoint = self.network.bind(0).unwrap();
        let register = SystemMessage::RegisterController { elevator_id: status.elevator_id };
        endpoint.send_to(&register.encode().unwrap(), self.dispatcher).unwrap();

        let (commands_tx, commands_rx) = unbounded();
        thread::spawn(move || {
            while let Ok(Some(bytes)) = endpoint.recv_timeout(WAIT * 5) {
                match SystemMessage::decode(&bytes).unwrap() {
                    SystemMessage::StatusRequest { .. } => {
                        endpoint.reply(&reply::encode_status(&status).unwrap()).unwrap();
                    }
                    SystemMessage::NewPrimaryRequest { .. } => {
                        endpoint.reply(&reply::encode_primary(primary.as_ref()).unwrap()).unwrap();
                    }
                    SystemMessage::IsStopRequired { .. } => {
                        endpoint.reply(&reply::encode_stop_required(stop)).unwrap();
                    }
                    command => {
                        if commands_tx.send(command).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        commands_rx
    }
}

fn idle(elevator_id: u8, floor: u8) -> ElevatorStatus {
    ElevatorStatus::new(elevator_id, floor)
}

fn request(floor: u8, car_button: u8) -> Request {
    Request::new(Duration::ZERO, floor, Direction::towards(floor, car_button), car_button)
}

fn assigned(commands: &Receiver<SystemMessage>) -> Option<Request> {
    match commands.recv_timeout(WAIT) {
        Ok(SystemMessage::AddNewRequest { request }) => Some(request),
        _ => None,
    }
}

#[test]
fn new_request_goes_to_nearest_idle_car() {
    let harness = Harness::start();
    let far = harness.fake_controller(idle(0, 9), None, false);
    let near = harness.fake_controller(idle(1, 2), None, false);

    harness.send(SystemMessage::AddNewRequest { request: request(3, 7) });

    assert_eq!(assigned(&near), Some(request(3, 7)));
    assert!(far.recv_timeout(QUIET).is_err());
}

#[test]
fn car_already_stopping_at_the_floor_wins() {
    let harness = Harness::start();
    let mut moving = idle(0, 1);
    moving.direction = Direction::Up;
    moving.stop_floors_up.insert(5);
    let stopping = harness.fake_controller(moving, None, false);
    let waiting = harness.fake_controller(idle(1, 5), None, false);

    harness.send(SystemMessage::AddNewRequest { request: request(5, 8) });

    assert_eq!(assigned(&stopping), Some(request(5, 8)));
    assert!(waiting.recv_timeout(QUIET).is_err());
}

#[test]
fn queries_are_relayed_back_to_the_asking_car() {
    let mut harness = Harness::start();
    let queued = request(4, 1);
    let _commands = harness.fake_controller(idle(0, 4), Some(queued.clone()), true);

    harness.send(SystemMessage::NewPrimaryRequest { elevator_id: 0 });
    assert_eq!(reply::decode_primary(&harness.reply()).unwrap(), Some(queued));

    harness.send(SystemMessage::IsStopRequired { elevator_id: 0, floor: 3, direction: Direction::Down });
    assert_eq!(reply::decode_stop_required(&harness.reply()), Some(true));
}

#[test]
fn arrivals_are_forwarded_to_the_controller() {
    let harness = Harness::start();
    let commands = harness.fake_controller(idle(0, 1), None, false);

    let service = SystemMessage::ServiceArrivals { elevator_id: 0, floor: 1, direction: Direction::Up };
    let complete = SystemMessage::CompleteArrivals { elevator_id: 0, floor: 6, direction: Direction::Up };
    harness.send(service.clone());
    harness.send(complete.clone());

    assert_eq!(commands.recv_timeout(WAIT).unwrap(), service);
    assert_eq!(commands.recv_timeout(WAIT).unwrap(), complete);
}

#[test]
fn lamp_commands_go_to_the_floor_side() {
    let mut harness = Harness::start();
    let lamp = SystemMessage::SetFloorDirectionLamp {
        elevator_id: 2,
        floor: 4,
        direction: Direction::Down,
        state: true,
    };
    harness.send(lamp.clone());

    let bytes = harness.floor.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(SystemMessage::decode(&bytes).unwrap(), lamp);
}

#[test]
fn shutdown_report_reassigns_work_and_retires_the_car() {
    let harness = Harness::start();
    let broken = harness.fake_controller(idle(0, 3), None, false);
    let healthy = harness.fake_controller(idle(1, 10), None, false);

    harness.send(SystemMessage::ShutdownReport {
        elevator_id: 0,
        requests: vec![request(2, 6), request(8, 1)],
    });
    assert_eq!(assigned(&healthy), Some(request(2, 6)));
    assert_eq!(assigned(&healthy), Some(request(8, 1)));

    harness.send(SystemMessage::AddNewRequest { request: request(3, 4) });
    assert_eq!(assigned(&healthy), Some(request(3, 4)));
    assert!(broken.recv_timeout(QUIET).is_err());
}

#[test]
fn backlog_is_flushed_when_a_car_registers() {
    let harness = Harness::start();
    harness.send(SystemMessage::AddNewRequest { request: request(6, 2) });
    thread::sleep(QUIET);

    let late = harness.fake_controller(idle(0, 1), None, false);
    assert_eq!(assigned(&late), Some(request(6, 2)));
}
