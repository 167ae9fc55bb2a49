use std::env;
use std::fs;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";
const FALLBACK_CONFIG_FILE: &str = "_config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("cannot parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub network: NetworkSection,
    pub building: BuildingSection,
    pub timing: TimingSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct NetworkSection {
    pub host: IpAddr,
    pub scheduler_port: u16,
    pub scheduler_control_port: u16,
    pub floor_port: u16,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct BuildingSection {
    pub num_floors: u8,
    pub num_elevators: u8,
    pub capacity: usize,
}

/// All values in milliseconds.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct TimingSection {
    pub base_move: u64,
    pub incremental_move: u64,
    pub loading: u64,
    pub boarding_per_passenger: u64,
    pub transient_fault: u64,
    pub idle_poll: u64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            level: "info".to_string(),
        }
    }
}

impl ConfigFile {
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.building.num_floors < 1 {
            return Err(ConfigError::Invalid("num_floors must be at least 1".to_string()));
        }
        if self.building.num_elevators < 1 {
            return Err(ConfigError::Invalid("num_elevators must be at least 1".to_string()));
        }
        if self.building.capacity < 1 {
            return Err(ConfigError::Invalid("capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Reads `path` if given, otherwise `config.json`, falling back to the
/// shipped `_config.json`.
pub fn read_config_file(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if Path::new(CONFIG_FILE).exists() => PathBuf::from(CONFIG_FILE),
        None => PathBuf::from(FALLBACK_CONFIG_FILE),
    };
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io { path: path.clone(), source })?;
    ConfigFile::from_json(&contents)
}

/// Command line flags shared by every process. Unknown flags and bad values
/// are collected in `ignored` so they can be logged once logging is up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub elevnum: Option<u8>,
    pub scenario: Option<PathBuf>,
    pub display: bool,
    pub ignored: Vec<String>,
}

/// Parses `--flag value` pairs; `--display` takes no value. `args` excludes
/// the program name.
pub fn parse_env_args(args: &[String]) -> Args {
    let mut parsed = Args::default();
    let mut args = args.iter();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--display" => parsed.display = true,
            "--config" | "--elevnum" | "--scenario" => {
                let Some(value) = args.next() else {
                    parsed.ignored.push(format!("{} is missing a value, skipping...", flag));
                    continue;
                };
                match flag.as_str() {
                    "--config" => parsed.config = Some(PathBuf::from(value)),
                    "--scenario" => parsed.scenario = Some(PathBuf::from(value)),
                    _ => match value.parse::<u8>() {
                        Ok(num) => parsed.elevnum = Some(num),
                        Err(_) => parsed.ignored.push(format!("elevnum {} is not a number, skipping...", value)),
                    },
                }
            }
            _ => parsed.ignored.push(format!("illegal argument {}, skipping...", flag)),
        }
    }
    parsed
}

fn process_args() -> Args {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_env_args(&args)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub host: IpAddr,
    pub scheduler_port: u16,
    pub scheduler_control_port: u16,
    pub floor_port: u16,
}

impl NetworkConfig {
    /// Where floors and cars send their traffic.
    pub fn scheduler_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.scheduler_port)
    }

    pub fn floor_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.floor_port)
    }
}

impl From<&NetworkSection> for NetworkConfig {
    fn from(section: &NetworkSection) -> Self {
        NetworkConfig {
            host: section.host,
            scheduler_port: section.scheduler_port,
            scheduler_control_port: section.scheduler_control_port,
            floor_port: section.floor_port,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    pub base_move: Duration,
    pub incremental_move: Duration,
    pub loading: Duration,
    pub boarding_per_passenger: Duration,
    pub transient_fault: Duration,
    pub idle_poll: Duration,
}

impl From<&TimingSection> for TimingConfig {
    fn from(section: &TimingSection) -> Self {
        TimingConfig {
            base_move: Duration::from_millis(section.base_move),
            incremental_move: Duration::from_millis(section.incremental_move),
            loading: Duration::from_millis(section.loading),
            boarding_per_passenger: Duration::from_millis(section.boarding_per_passenger),
            transient_fault: Duration::from_millis(section.transient_fault),
            idle_poll: Duration::from_millis(section.idle_poll),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub network: NetworkConfig,
    pub num_elevators: u8,
    pub log_level: String,
    pub ignored_args: Vec<String>,
}

impl SchedulerConfig {
    pub fn get() -> Result<Self, ConfigError> {
        let args = process_args();
        let file = read_config_file(args.config.as_deref())?;
        Ok(Self::from_parts(&file, args))
    }

    pub fn from_parts(file: &ConfigFile, args: Args) -> Self {
        SchedulerConfig {
            network: NetworkConfig::from(&file.network),
            num_elevators: file.building.num_elevators,
            log_level: file.logging.level.clone(),
            ignored_args: args.ignored,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElevatorConfig {
    /// Cars hosted by this process.
    pub elevator_ids: Vec<u8>,
    pub network: NetworkConfig,
    pub num_floors: u8,
    pub capacity: usize,
    pub timing: TimingConfig,
    pub log_level: String,
    pub ignored_args: Vec<String>,
}

impl ElevatorConfig {
    pub fn get() -> Result<Self, ConfigError> {
        let args = process_args();
        let file = read_config_file(args.config.as_deref())?;
        Self::from_parts(&file, args)
    }

    pub fn from_parts(file: &ConfigFile, args: Args) -> Result<Self, ConfigError> {
        let elevator_ids = match args.elevnum {
            Some(id) if id >= file.building.num_elevators => {
                return Err(ConfigError::Invalid(format!(
                    "elevnum {} is out of range, building has {} elevators",
                    id, file.building.num_elevators
                )))
            }
            Some(id) => vec![id],
            None => (0..file.building.num_elevators).collect(),
        };
        Ok(ElevatorConfig {
            elevator_ids,
            network: NetworkConfig::from(&file.network),
            num_floors: file.building.num_floors,
            capacity: file.building.capacity,
            timing: TimingConfig::from(&file.timing),
            log_level: file.logging.level.clone(),
            ignored_args: args.ignored,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FloorConfig {
    pub network: NetworkConfig,
    pub num_floors: u8,
    pub num_elevators: u8,
    pub scenario: Option<PathBuf>,
    pub display: bool,
    pub log_level: String,
    pub ignored_args: Vec<String>,
}

impl FloorConfig {
    pub fn get() -> Result<Self, ConfigError> {
        let args = process_args();
        let file = read_config_file(args.config.as_deref())?;
        Ok(Self::from_parts(&file, args))
    }

    pub fn from_parts(file: &ConfigFile, args: Args) -> Self {
        FloorConfig {
            network: NetworkConfig::from(&file.network),
            num_floors: file.building.num_floors,
            num_elevators: file.building.num_elevators,
            scenario: args.scenario,
            display: args.display,
            log_level: file.logging.level.clone(),
            ignored_args: args.ignored,
        }
    }
}
