/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info};
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::car::queue::StopQueue;
use crate::config::TimingConfig;
use crate::shared::{Behaviour, CarSnapshot, Direction, DispatcherEvent, DoorCycle};

/**
 * Per-car motion and door state machine.
 *
 * One `CarFsm` runs on its own thread and is the only owner of its car's
 * state; floor requests arrive through the car's mailbox and are merged into
 * the stop queue here. The FSM commands the shaft one direction at a time
 * and re-evaluates at every reported floor: stop and cycle the doors when
 * the floor is queued, keep going while work remains ahead, reverse when
 * only opposite work is left, and rest otherwise.
 *
 * After each floor arrival the FSM announces itself to the dispatcher and
 * waits for the pickup reply, so hall calls at the arrival floor in the
 * travel direction join the queue before the stop decision is made.
 *
 * # Fields
 * - `request_rx`:        Mailbox of floor stops (inside requests and assignments).
 * - `floor_reached_rx`:  Floor arrivals from the shaft.
 * - `motor_cmd_tx`:      Motor direction commands to the shaft.
 * - `dispatcher_tx`:     Arrival announcements and state snapshots.
 * - `pickup_reply_rx`:   Hall-call floors picked up at the announced arrival.
 * - `door_timer`:        Deadline receiver driving the door cycle phases.
 */
pub struct CarFsm {
    id: usize,
    floor: u8,
    direction: Direction,
    behaviour: Behaviour,
    door: DoorCycle,
    queue: StopQueue,
    door_transition: Duration,
    door_hold: Duration,

    request_rx: cbc::Receiver<u8>,
    floor_reached_rx: cbc::Receiver<u8>,
    motor_cmd_tx: cbc::Sender<Direction>,
    dispatcher_tx: cbc::Sender<DispatcherEvent>,
    pickup_reply_rx: cbc::Receiver<Vec<u8>>,
    terminate_rx: cbc::Receiver<()>,

    door_timer: cbc::Receiver<Instant>,
}

enum Event {
    FloorRequested(u8),
    FloorReached(u8),
    DoorTimer,
    Terminate,
}

impl CarFsm {
    pub fn new(
        id: usize,
        config: &TimingConfig,
        request_rx: cbc::Receiver<u8>,
        floor_reached_rx: cbc::Receiver<u8>,
        motor_cmd_tx: cbc::Sender<Direction>,
        dispatcher_tx: cbc::Sender<DispatcherEvent>,
        pickup_reply_rx: cbc::Receiver<Vec<u8>>,
        terminate_rx: cbc::Receiver<()>,
    ) -> CarFsm {
        CarFsm {
            id,
            floor: 1,
            direction: Direction::Stop,
            behaviour: Behaviour::Idle,
            door: DoorCycle::Closed,
            queue: StopQueue::new(),
            door_transition: Duration::from_millis(config.door_transition_ms),
            door_hold: Duration::from_millis(config.door_hold_ms),
            request_rx,
            floor_reached_rx,
            motor_cmd_tx,
            dispatcher_tx,
            pickup_reply_rx,
            terminate_rx,
            door_timer: cbc::never::<Instant>(),
        }
    }

    pub fn run(mut self) {
        self.publish_state();

        loop {
            match self.wait_for_event() {
                Event::FloorRequested(floor) => self.handle_request(floor),
                Event::FloorReached(floor) => self.handle_arrival(floor),
                Event::DoorTimer => self.advance_door(),
                Event::Terminate => break,
            }
        }
        info!("car {} terminated", self.id);
    }

    fn wait_for_event(&self) -> Event {
        cbc::select! {
            recv(self.request_rx) -> msg => {
                match msg {
                    Ok(floor) => Event::FloorRequested(floor),
                    Err(_) => Event::Terminate,
                }
            }
            recv(self.floor_reached_rx) -> msg => {
                match msg {
                    Ok(floor) => Event::FloorReached(floor),
                    Err(_) => Event::Terminate,
                }
            }
            recv(self.door_timer) -> _ => Event::DoorTimer,
            recv(self.terminate_rx) -> _ => Event::Terminate,
        }
    }

    fn handle_request(&mut self, floor: u8) {
        if floor == self.floor {
            match self.behaviour {
                // Rider is already at their destination, just open up
                Behaviour::Idle => self.open_door(),
                Behaviour::DoorOpen => (),
                // Car has left this floor; serve it on a later pass
                Behaviour::Moving => {
                    if self.queue.insert(floor) {
                        self.publish_state();
                    }
                }
            }
            return;
        }

        if !self.queue.insert(floor) {
            debug!("car {}: floor {} already queued", self.id, floor);
            return;
        }

        if self.behaviour == Behaviour::Idle {
            self.start_moving();
        }
        self.publish_state();
    }

    fn handle_arrival(&mut self, floor: u8) {
        self.floor = floor;
        debug!("car {}: at floor {}", self.id, floor);

        // Pickup hook: hall calls at this floor in our direction join the queue
        self.merge_pickups();

        if self.queue.remove(floor) {
            self.open_door();
            return;
        }

        let next = self.choose_direction();
        if next != self.direction {
            self.direction = next;
            if next == Direction::Stop {
                self.behaviour = Behaviour::Idle;
            }
            self.send_motor(next);
        }
        self.publish_state();
    }

    /// Runs the non-interruptible open -> hold -> close sequence; motion
    /// resumes only from the final Closed phase.
    fn advance_door(&mut self) {
        match self.door {
            DoorCycle::Opening => {
                self.door = DoorCycle::Open;
                self.door_timer = cbc::after(self.door_hold);
            }
            DoorCycle::Open => {
                self.door = DoorCycle::Closing;
                self.door_timer = cbc::after(self.door_transition);
            }
            DoorCycle::Closing => {
                self.door = DoorCycle::Closed;
                self.door_timer = cbc::never::<Instant>();
                self.resume();
            }
            // Stale timer event
            DoorCycle::Closed => return,
        }
        self.publish_state();
    }

    fn open_door(&mut self) {
        self.send_motor(Direction::Stop);
        self.behaviour = Behaviour::DoorOpen;
        self.door = DoorCycle::Opening;
        self.door_timer = cbc::after(self.door_transition);
        self.publish_state();
    }

    // Doors are closed again; pick up where the stop left off
    fn resume(&mut self) {
        self.direction = self.choose_direction();
        match self.direction {
            Direction::Stop => self.behaviour = Behaviour::Idle,
            _ => {
                self.behaviour = Behaviour::Moving;
                self.send_motor(self.direction);
            }
        }
    }

    fn start_moving(&mut self) {
        // Direction is committed to the oldest queued stop
        let target = match self.queue.first() {
            Some(floor) => floor,
            None => return,
        };
        if target == self.floor {
            // Stop at the resting floor: serve it in place
            self.queue.remove(target);
            self.open_door();
            return;
        }
        self.direction = if target > self.floor {
            Direction::Up
        } else {
            Direction::Down
        };
        self.behaviour = Behaviour::Moving;
        self.send_motor(self.direction);
    }

    fn choose_direction(&self) -> Direction {
        // Keep going while there is work ahead
        if self.queue.has_in_direction(self.floor, self.direction) {
            return self.direction;
        }

        // Otherwise turn around if work remains behind
        let opposite = self.direction.opposite();
        if self.queue.has_in_direction(self.floor, opposite) {
            return opposite;
        }

        // Starting from rest, the oldest stop decides
        if self.direction == Direction::Stop {
            if let Some(target) = self.queue.first() {
                if target > self.floor {
                    return Direction::Up;
                }
                if target < self.floor {
                    return Direction::Down;
                }
            }
        }

        Direction::Stop
    }

    fn merge_pickups(&mut self) {
        let arrived = DispatcherEvent::Arrived {
            id: self.id,
            floor: self.floor,
            direction: self.direction,
        };
        if self.dispatcher_tx.send(arrived).is_err() {
            return;
        }
        match self.pickup_reply_rx.recv() {
            Ok(floors) => {
                for floor in floors {
                    if self.queue.insert(floor) {
                        info!("car {}: picked up hall call at floor {}", self.id, floor);
                    }
                }
            }
            // Dispatcher is gone; nothing to merge
            Err(_) => (),
        }
    }

    fn send_motor(&self, direction: Direction) {
        let _ = self.motor_cmd_tx.send(direction);
    }

    fn publish_state(&self) {
        let snapshot = CarSnapshot {
            id: self.id,
            floor: self.floor,
            direction: self.direction,
            behaviour: self.behaviour,
            door: self.door,
            queue: self.queue.as_sorted(),
        };
        let _ = self.dispatcher_tx.send(DispatcherEvent::StateChanged(snapshot));
    }
}

/***************************************/
/*            Test helpers             */
/***************************************/
#[cfg(test)]
impl CarFsm {
    pub fn test_set_state(&mut self, floor: u8, direction: Direction) {
        self.floor = floor;
        self.direction = direction;
    }

    pub fn test_queue_floors(&mut self, floors: &[u8]) {
        for floor in floors {
            self.queue.insert(*floor);
        }
    }

    pub fn test_choose_direction(&self) -> Direction {
        self.choose_direction()
    }
}
