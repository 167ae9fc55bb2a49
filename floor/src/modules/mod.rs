use std::process;
use std::thread;

use crossbeam_channel::unbounded;
use log::{error, info, warn};
use network_rust::udpnet::UdpEndpoint;
use shared_resources::config::FloorConfig;
use shared_resources::link::Link;

pub mod lamps;
pub mod scenario;

use lamps::LampBoard;
use scenario::Injector;

pub fn run(config: FloorConfig) {
    for ignored in &config.ignored_args {
        warn!("{}", ignored);
    }

    // READ SCENARIO
    let requests = match &config.scenario {
        Some(path) => match scenario::read_scenario(path, config.num_floors) {
            Ok(requests) => requests,
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No scenario given, only showing lamps");
            Vec::new()
        }
    };

    // BIND FLOOR ENDPOINTS
    let network = config.network;
    let lamp_port = match UdpEndpoint::bind(network.host, network.floor_port) {
        Ok(endpoint) => Link::new(endpoint),
        Err(e) => {
            error!("Could not bind floor port {}: {}", network.floor_port, e);
            process::exit(1);
        }
    };
    let injector_link = match UdpEndpoint::bind(network.host, 0) {
        Ok(endpoint) => Link::new(endpoint),
        Err(e) => {
            error!("Could not bind request endpoint: {}", e);
            process::exit(1);
        }
    };

    let (lamps_tx, lamps_rx) = unbounded();

    // INITIALIZE THREAD FOR LAMP BOARD
    let board = LampBoard::new(config.num_floors, config.num_elevators);
    let display = config.display;
    let board_thread = thread::Builder::new().name("lamp-board".to_string()).spawn(move || {
        if let Err(e) = lamps::run_board(board, lamps_rx, display) {
            error!("Lamp display failed: {}", e);
            process::exit(1);
        }
    });

    // INITIALIZE THREAD FOR LAMP CONTROLLER
    let listener_tx = lamps_tx.clone();
    let listener_thread = thread::Builder::new().name("lamp-controller".to_string()).spawn(move || {
        if let Err(e) = lamps::listen(lamp_port, listener_tx) {
            error!("Lamp controller stopped: {}", e);
            process::exit(1);
        }
    });

    let (board_thread, listener_thread) = match (board_thread, listener_thread) {
        (Ok(board), Ok(listener)) => (board, listener),
        (Err(e), _) | (_, Err(e)) => {
            error!("Could not start lamp threads: {}", e);
            process::exit(1);
        }
    };

    // REPLAY SCENARIO
    let injector = Injector::new(injector_link, network.scheduler_addr(), lamps_tx);
    if let Err(e) = injector.run(requests) {
        error!("Could not send request: {}", e);
        process::exit(1);
    }
    drop(injector);
    info!("Keeping lamps up to date");

    let _ = listener_thread.join();
    let _ = board_thread.join();
}
