/* 3rd party libraries */
use clap::Arg;
use crossbeam_channel as cbc;
use env_logger::Env;
use std::thread::Builder;
use std::time::Duration;

/* Custom libraries */
use car::{CarFsm, Shaft};
use dispatcher::Dispatcher;
use shared::{CarSnapshot, Direction, DispatcherEvent};

/* Modules */
mod car;
mod config;
mod console;
mod dispatcher;
mod shared;

/* Main */
fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Load the configuration
    let matches = clap::Command::new("liftsim")
        .about("Elevator bank dispatch simulator")
        .arg(
            Arg::new("config")
                .long("config")
                .takes_value(true)
                .default_value("config.toml"),
        )
        .get_matches();
    let config = config::load_config(matches.value_of("config").unwrap());

    let n_cars = config.building.n_elevators as usize;
    let n_floors = config.building.n_floors;
    let time_per_floor = Duration::from_millis(config.timing.time_per_floor_ms);

    // Dispatcher and monitor channels
    let (dispatcher_event_tx, dispatcher_event_rx) = cbc::unbounded::<DispatcherEvent>();
    let (snapshot_tx, snapshot_rx) = cbc::unbounded::<CarSnapshot>();

    // Per-car channel bundles, collected for the dispatcher and input layer
    let mut car_request_txs = Vec::new();
    let mut pickup_reply_txs = Vec::new();
    let mut terminate_txs = Vec::new();

    for id in 0..n_cars {
        let (car_request_tx, car_request_rx) = cbc::unbounded::<u8>();
        let (motor_cmd_tx, motor_cmd_rx) = cbc::unbounded::<Direction>();
        let (floor_reached_tx, floor_reached_rx) = cbc::unbounded::<u8>();
        let (pickup_reply_tx, pickup_reply_rx) = cbc::unbounded::<Vec<u8>>();
        let (car_terminate_tx, car_terminate_rx) = cbc::unbounded::<()>();
        let (shaft_terminate_tx, shaft_terminate_rx) = cbc::unbounded::<()>();

        // Start the shaft simulation for this car
        let shaft = Shaft::new(
            id,
            n_floors,
            time_per_floor,
            motor_cmd_rx,
            floor_reached_tx,
            shaft_terminate_rx,
        );
        let shaft_thread = Builder::new().name(format!("shaft_{}", id));
        crate::unwrap_or_exit!(shaft_thread.spawn(move || shaft.run()));

        // Start the car state machine
        let fsm = CarFsm::new(
            id,
            &config.timing,
            car_request_rx,
            floor_reached_rx,
            motor_cmd_tx,
            dispatcher_event_tx.clone(),
            pickup_reply_rx,
            car_terminate_rx,
        );
        let fsm_thread = Builder::new().name(format!("car_fsm_{}", id));
        crate::unwrap_or_exit!(fsm_thread.spawn(move || fsm.run()));

        car_request_txs.push(car_request_tx);
        pickup_reply_txs.push(pickup_reply_tx);
        terminate_txs.push(car_terminate_tx);
        terminate_txs.push(shaft_terminate_tx);
    }

    // Start the dispatcher
    let dispatcher = Dispatcher::new(
        dispatcher_event_rx,
        car_request_txs.clone(),
        pickup_reply_txs,
        snapshot_tx,
    );
    let dispatcher_thread = Builder::new().name("dispatcher".into());
    crate::unwrap_or_exit!(dispatcher_thread.spawn(move || dispatcher.run()));

    // Start the presentation monitor
    let monitor_thread = Builder::new().name("monitor".into());
    crate::unwrap_or_exit!(monitor_thread.spawn(move || console::run_monitor(snapshot_rx)));

    // The main thread is the input layer
    console::run_input_loop(&config, &dispatcher_event_tx, &car_request_txs);

    // Wind everything down
    let _ = dispatcher_event_tx.send(DispatcherEvent::Terminate);
    for terminate_tx in terminate_txs {
        let _ = terminate_tx.send(());
    }
}
