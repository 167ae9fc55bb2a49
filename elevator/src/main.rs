use std::process;

use shared_resources::config::ElevatorConfig;
use shared_resources::logger;

fn main() {
    // READ CONFIGURATION
    let config = match ElevatorConfig::get() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if logger::init(logger::level_from(&config.log_level)).is_err() {
        process::exit(1);
    }

    elevator::modules::run(config);
}
