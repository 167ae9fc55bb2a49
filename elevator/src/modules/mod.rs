use std::io;
use std::process;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use log::{debug, error, warn};
use network_rust::udpnet::{Endpoint, UdpEndpoint};
use shared_resources::config::ElevatorConfig;
use shared_resources::link::Link;
use shared_resources::logger::car_target;

pub mod controller;
pub mod fsm;

use crate::utilities::request_queue::RequestQueue;
use controller::Controller;
use fsm::{CarSettings, CarSnapshot, Elevator};

pub struct CarHandles {
    pub controller: JoinHandle<()>,
    pub car: JoinHandle<()>,
}

/// Starts one car: registers its controller with the scheduler, then spawns
/// the controller thread and the state machine thread around a shared
/// request queue. A transport error in either thread ends the process.
pub fn spawn_car(
    settings: CarSettings,
    controller_endpoint: impl Endpoint + 'static,
    car_endpoint: impl Endpoint + 'static,
    snapshot_tx: Sender<CarSnapshot>,
) -> io::Result<CarHandles> {
    let elevator_id = settings.elevator_id;
    let queue = RequestQueue::new(elevator_id, settings.num_floors, settings.capacity).shared();

    // INITIALIZE CONTROLLER
    let mut controller = Controller::register(
        elevator_id,
        Link::new(controller_endpoint),
        settings.scheduler,
        queue.clone(),
    )
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let controller = thread::Builder::new()
        .name(format!("controller-{}", elevator_id))
        .spawn(move || {
            if let Err(e) = controller.run() {
                error!(target: car_target(elevator_id).as_str(), "Controller {} stopped: {}", elevator_id, e);
                process::exit(1);
            }
        })?;

    // INITIALIZE THREAD FOR STATE MACHINE
    let mut elevator = Elevator::new(&settings, Link::new(car_endpoint), queue, snapshot_tx);
    let car = thread::Builder::new()
        .name(format!("car-{}", elevator_id))
        .spawn(move || {
            if let Err(e) = elevator.run() {
                error!(target: car_target(elevator_id).as_str(), "Elevator {} stopped: {}", elevator_id, e);
                process::exit(1);
            }
        })?;

    Ok(CarHandles { controller, car })
}

pub fn run(config: ElevatorConfig) {
    for ignored in &config.ignored_args {
        warn!("{}", ignored);
    }

    let (snapshot_tx, snapshot_rx) = unbounded::<CarSnapshot>();
    let mut handles = Vec::new();
    for &elevator_id in &config.elevator_ids {
        let settings = CarSettings {
            elevator_id,
            num_floors: config.num_floors,
            capacity: config.capacity,
            timing: config.timing,
            scheduler: config.network.scheduler_addr(),
        };
        let endpoints = UdpEndpoint::bind(config.network.host, 0)
            .and_then(|controller| Ok((controller, UdpEndpoint::bind(config.network.host, 0)?)));
        let (controller_endpoint, car_endpoint) = match endpoints {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!("Could not bind endpoints for elevator {}: {}", elevator_id, e);
                process::exit(1);
            }
        };
        match spawn_car(settings, controller_endpoint, car_endpoint, snapshot_tx.clone()) {
            Ok(car) => handles.push(car),
            Err(e) => {
                error!("Could not start elevator {}: {}", elevator_id, e);
                process::exit(1);
            }
        }
    }
    drop(snapshot_tx);

    // Ends once every car has halted.
    for snapshot in snapshot_rx.iter() {
        debug!(target: car_target(snapshot.elevator_id).as_str(), "{}", snapshot);
    }

    for car in handles {
        let _ = car.car.join();
        let _ = car.controller.join();
    }
}
