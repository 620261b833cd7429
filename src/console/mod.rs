/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::info;
use std::io;
use std::io::BufRead;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::Config;
use crate::shared::{Behaviour, CarSnapshot, Direction, DispatcherEvent, DoorCycle, OutsideRequest};


/// One validated line of rider input.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    HallCall(OutsideRequest),
    CarCall { id: usize, floor: u8 },
    State,
    Quit,
}

const USAGE: &str = "commands: up <floor> | down <floor> | car <id> <floor> | state | quit";

/// Boundary check for everything rider-typed. The core assumes floors are
/// valid, so nothing out of range may pass this function.
pub fn parse_command(line: &str, n_floors: u8, n_cars: usize) -> Result<ConsoleCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();

    match words.as_slice() {
        ["up", floor] => {
            let floor = parse_floor(floor, n_floors)?;
            if floor == n_floors {
                return Err(format!("floor {} is the top floor, cannot go up", floor));
            }
            Ok(ConsoleCommand::HallCall(OutsideRequest {
                floor,
                direction: Direction::Up,
            }))
        }
        ["down", floor] => {
            let floor = parse_floor(floor, n_floors)?;
            if floor == 1 {
                return Err(String::from("floor 1 is the bottom floor, cannot go down"));
            }
            Ok(ConsoleCommand::HallCall(OutsideRequest {
                floor,
                direction: Direction::Down,
            }))
        }
        ["car", id, floor] => {
            let id: usize = id
                .parse()
                .map_err(|_| format!("not a car id: {}", id))?;
            if id >= n_cars {
                return Err(format!("no such car: {} (have {})", id, n_cars));
            }
            let floor = parse_floor(floor, n_floors)?;
            Ok(ConsoleCommand::CarCall { id, floor })
        }
        ["state"] => Ok(ConsoleCommand::State),
        ["quit"] => Ok(ConsoleCommand::Quit),
        _ => Err(String::from(USAGE)),
    }
}

fn parse_floor(word: &str, n_floors: u8) -> Result<u8, String> {
    let floor: u8 = word
        .parse()
        .map_err(|_| format!("not a floor: {}", word))?;
    if floor < 1 || floor > n_floors {
        return Err(format!("floor {} is outside 1..={}", floor, n_floors));
    }
    Ok(floor)
}

/// Stdin command loop; returns when the rider quits or stdin closes.
pub fn run_input_loop(
    config: &Config,
    dispatcher_tx: &cbc::Sender<DispatcherEvent>,
    car_request_tx: &[cbc::Sender<u8>],
) {
    let n_floors = config.building.n_floors;
    let n_cars = car_request_tx.len();

    println!("{}", USAGE);
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        match parse_command(&line, n_floors, n_cars) {
            Ok(ConsoleCommand::HallCall(request)) => {
                if dispatcher_tx
                    .send(DispatcherEvent::HallCall(request))
                    .is_err()
                {
                    break;
                }
            }
            Ok(ConsoleCommand::CarCall { id, floor }) => {
                if car_request_tx[id].send(floor).is_err() {
                    break;
                }
            }
            Ok(ConsoleCommand::State) => {
                if dispatcher_tx.send(DispatcherEvent::DumpState).is_err() {
                    break;
                }
            }
            Ok(ConsoleCommand::Quit) => break,
            Err(message) => println!("{}", message),
        }
    }
}

/// Presentation stand-in: logs every snapshot the dispatcher forwards.
pub fn run_monitor(snapshot_rx: cbc::Receiver<CarSnapshot>) {
    while let Ok(snapshot) = snapshot_rx.recv() {
        info!(
            "car {} | floor {:>2} {} | doors {} | stops {:?}",
            snapshot.id,
            snapshot.floor,
            direction_arrow(&snapshot),
            door_label(snapshot.door),
            snapshot.queue
        );
    }
}

fn direction_arrow(snapshot: &CarSnapshot) -> &'static str {
    match (snapshot.behaviour, snapshot.direction) {
        (Behaviour::Idle, _) => "--",
        (_, Direction::Up) => "up",
        (_, Direction::Down) => "dn",
        (_, Direction::Stop) => "--",
    }
}

fn door_label(door: DoorCycle) -> &'static str {
    match door {
        DoorCycle::Closed => "closed",
        DoorCycle::Opening => "opening",
        DoorCycle::Open => "open",
        DoorCycle::Closing => "closing",
    }
}
