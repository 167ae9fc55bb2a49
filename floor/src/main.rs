use std::process;

use shared_resources::config::FloorConfig;
use shared_resources::logger;

fn main() {
    // READ CONFIGURATION
    let config = match FloorConfig::get() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if logger::init(logger::level_from(&config.log_level)).is_err() {
        process::exit(1);
    }

    floor::modules::run(config);
}
