/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, warn};
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::Direction;

/**
 * Simulated elevator shaft.
 *
 * Owns the physical position of one car. The FSM commands a motor direction;
 * while the motor runs, the shaft reports one floor arrival per
 * `time_per_floor` elapsed. The FSM decides at each arrival whether to stop,
 * so the shaft never needs to know the target floor.
 *
 * # Fields
 * - `floor`:              Current physical position, 1-based.
 * - `n_floors`:           Top floor of the building; positions are clamped to [1, n_floors].
 * - `time_per_floor`:     Travel time for one floor-to-floor transition.
 * - `motor_cmd_rx`:       Receives motor direction commands from the FSM.
 * - `floor_reached_tx`:   Reports floor arrivals to the FSM.
 * - `terminate_rx`:       Shuts the thread down.
 */
pub struct Shaft {
    id: usize,
    floor: u8,
    n_floors: u8,
    time_per_floor: Duration,
    direction: Direction,
    motor_cmd_rx: cbc::Receiver<Direction>,
    floor_reached_tx: cbc::Sender<u8>,
    terminate_rx: cbc::Receiver<()>,
}

impl Shaft {
    pub fn new(
        id: usize,
        n_floors: u8,
        time_per_floor: Duration,
        motor_cmd_rx: cbc::Receiver<Direction>,
        floor_reached_tx: cbc::Sender<u8>,
        terminate_rx: cbc::Receiver<()>,
    ) -> Shaft {
        Shaft {
            id,
            floor: 1,
            n_floors,
            time_per_floor,
            direction: Direction::Stop,
            motor_cmd_rx,
            floor_reached_tx,
            terminate_rx,
        }
    }

    pub fn run(mut self) {
        // Deadline for the next floor arrival; never() while the motor is off
        let mut arrival = cbc::never::<Instant>();

        loop {
            cbc::select! {
                recv(self.motor_cmd_rx) -> cmd => {
                    match cmd {
                        Ok(direction) => {
                            if direction == self.direction {
                                continue;
                            }
                            self.direction = direction;
                            arrival = match direction {
                                Direction::Stop => cbc::never::<Instant>(),
                                _ => cbc::after(self.time_per_floor),
                            };
                        }
                        // FSM is gone, nothing left to drive
                        Err(_) => return,
                    }
                }
                recv(arrival) -> _ => {
                    let next = match self.direction {
                        Direction::Up if self.floor < self.n_floors => self.floor + 1,
                        Direction::Down if self.floor > 1 => self.floor - 1,
                        Direction::Stop => {
                            arrival = cbc::never::<Instant>();
                            continue;
                        }
                        _ => {
                            warn!("shaft {}: motor ran off the end at floor {}", self.id, self.floor);
                            self.direction = Direction::Stop;
                            arrival = cbc::never::<Instant>();
                            continue;
                        }
                    };
                    self.floor = next;
                    debug!("shaft {}: reached floor {}", self.id, self.floor);
                    if self.floor_reached_tx.send(self.floor).is_err() {
                        return;
                    }
                    // Keep rolling until told otherwise
                    arrival = cbc::after(self.time_per_floor);
                }
                recv(self.terminate_rx) -> _ => {
                    return;
                }
            }
        }
    }
}
