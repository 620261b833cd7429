/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::process;

use crate::unwrap_or_exit;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone)]
pub struct Config {
    pub building: BuildingConfig,
    pub timing: TimingConfig,
}

#[derive(Deserialize, Clone)]
pub struct BuildingConfig {
    pub n_elevators: u8,
    pub n_floors: u8,
}

#[derive(Deserialize, Clone)]
pub struct TimingConfig {
    pub time_per_floor_ms: u64,
    pub door_transition_ms: u64,
    pub door_hold_ms: u64,
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config(path: &str) -> Config {
    let config_str = unwrap_or_exit!(fs::read_to_string(path));
    let config: Config = unwrap_or_exit!(toml::from_str(&config_str));
    validate_config(&config);
    config
}

// The input layer relies on these bounds, so bad values abort startup
fn validate_config(config: &Config) {
    if config.building.n_elevators == 0 {
        log::error!("Invalid configuration: n_elevators must be at least 1");
        process::exit(1);
    }
    if config.building.n_floors < 2 {
        log::error!("Invalid configuration: n_floors must be at least 2");
        process::exit(1);
    }
    if config.timing.time_per_floor_ms == 0
        || config.timing.door_transition_ms == 0
        || config.timing.door_hold_ms == 0
    {
        log::error!("Invalid configuration: all timing values must be positive");
        process::exit(1);
    }
}
