use std::process;
use std::thread;

use log::{error, info, warn};
use network_rust::udpnet::UdpEndpoint;
use shared_resources::config::SchedulerConfig;
use shared_resources::link::Link;

pub mod dispatcher;

use dispatcher::Dispatcher;

pub fn run(config: SchedulerConfig) {
    for ignored in &config.ignored_args {
        warn!("{}", ignored);
    }

    // BIND DISPATCHER ENDPOINTS
    let network = config.network;
    let requests = match UdpEndpoint::bind(network.host, network.scheduler_port) {
        Ok(endpoint) => Link::new(endpoint),
        Err(e) => {
            error!("Could not bind request port {}: {}", network.scheduler_port, e);
            process::exit(1);
        }
    };
    let control = match UdpEndpoint::bind(network.host, network.scheduler_control_port) {
        Ok(endpoint) => Link::new(endpoint),
        Err(e) => {
            error!("Could not bind control port {}: {}", network.scheduler_control_port, e);
            process::exit(1);
        }
    };
    info!(
        "Scheduler listening on {} for {} elevator(s)",
        requests.local_addr(),
        config.num_elevators
    );

    // INITIALIZE THREAD FOR DISPATCH LOOP
    let mut dispatcher = Dispatcher::new(requests, control, network.floor_addr());
    let handle = thread::Builder::new().name("dispatcher".to_string()).spawn(move || {
        if let Err(e) = dispatcher.run() {
            error!("Dispatcher stopped: {}", e);
            process::exit(1);
        }
    });
    match handle {
        Ok(handle) => {
            let _ = handle.join();
        }
        Err(e) => {
            error!("Could not start dispatcher: {}", e);
            process::exit(1);
        }
    }
}
