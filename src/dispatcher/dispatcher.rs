/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, error, info, warn};
use serde::Serialize;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{CarSnapshot, Direction, DispatcherEvent, OutsideRequest};

/**
 * Assigns hall calls to cars and owns the pool of unassigned calls.
 *
 * The dispatcher is the single owner of the pending pool: cars never touch
 * it directly. It keeps the last-known snapshot of every car (pushed by the
 * car FSMs after each state change) and runs the selection policy against
 * that view. Calls nobody can take stay pending until a car reports idle or
 * passes the floor in the matching direction.
 *
 * # Fields
 * - `snapshots`:        Last-known state per car, indexed by car id.
 * - `pending`:          Unassigned hall calls, oldest first, no duplicates.
 * - `event_rx`:         Hall calls, arrivals, and state changes.
 * - `car_request_tx`:   Per-car mailboxes for assigned floors.
 * - `pickup_reply_tx`:  Per-car replies to arrival announcements.
 * - `monitor_tx`:       Snapshot forwarding to the presentation layer.
 */
pub struct Dispatcher {
    snapshots: Vec<CarSnapshot>,
    pending: Vec<OutsideRequest>,
    event_rx: cbc::Receiver<DispatcherEvent>,
    car_request_tx: Vec<cbc::Sender<u8>>,
    pickup_reply_tx: Vec<cbc::Sender<Vec<u8>>>,
    monitor_tx: cbc::Sender<CarSnapshot>,
}

#[derive(Serialize)]
struct DebugState<'a> {
    pending: &'a [OutsideRequest],
    cars: &'a [CarSnapshot],
}

/// Selection policy: any resting car wins, first by car order; failing that,
/// the closest car already committed to the call's direction; failing both,
/// nobody. Proximity of busy cars in other directions never enters into it.
pub fn select_car(snapshots: &[CarSnapshot], request: &OutsideRequest) -> Option<usize> {
    if let Some(snapshot) = snapshots
        .iter()
        .find(|s| s.direction == Direction::Stop)
    {
        return Some(snapshot.id);
    }

    snapshots
        .iter()
        .filter(|s| s.direction == request.direction)
        .min_by_key(|s| s.floor.abs_diff(request.floor))
        .map(|s| s.id)
}

impl Dispatcher {
    pub fn new(
        event_rx: cbc::Receiver<DispatcherEvent>,
        car_request_tx: Vec<cbc::Sender<u8>>,
        pickup_reply_tx: Vec<cbc::Sender<Vec<u8>>>,
        monitor_tx: cbc::Sender<CarSnapshot>,
    ) -> Dispatcher {
        let n_cars = car_request_tx.len();
        Dispatcher {
            snapshots: (0..n_cars).map(CarSnapshot::new).collect(),
            pending: Vec::new(),
            event_rx,
            car_request_tx,
            pickup_reply_tx,
            monitor_tx,
        }
    }

    pub fn run(mut self) {
        loop {
            match self.event_rx.recv() {
                Ok(DispatcherEvent::Terminate) | Err(_) => break,
                Ok(event) => self.handle_event(event),
            }
        }
        info!("dispatcher terminated");
    }

    fn handle_event(&mut self, event: DispatcherEvent) {
        match event {
            DispatcherEvent::HallCall(request) => self.handle_hall_call(request),
            DispatcherEvent::Arrived {
                id,
                floor,
                direction,
            } => self.handle_arrival(id, floor, direction),
            DispatcherEvent::StateChanged(snapshot) => self.handle_state_changed(snapshot),
            DispatcherEvent::DumpState => self.dump_state(),
            DispatcherEvent::Terminate => (),
        }
    }

    fn handle_hall_call(&mut self, request: OutsideRequest) {
        if !self.pending.contains(&request) {
            self.pending.push(request);
        }

        match select_car(&self.snapshots, &request) {
            Some(id) => {
                self.pending.retain(|r| *r != request);
                self.assign(id, request);
            }
            None => {
                info!(
                    "no car can take floor {} {:?}, call left pending",
                    request.floor, request.direction
                );
            }
        }
    }

    /// Pickup: drains every pending call at the arrival floor in the car's
    /// travel direction into the reply. The reply is always sent, empty or
    /// not, because the car is waiting on it.
    fn handle_arrival(&mut self, id: usize, floor: u8, direction: Direction) {
        let mut picked = Vec::new();
        self.pending.retain(|request| {
            if request.floor == floor && request.direction == direction {
                picked.push(request.floor);
                false
            } else {
                true
            }
        });

        if !picked.is_empty() {
            info!("car {} picks up hall call at floor {}", id, floor);
        }
        if self.pickup_reply_tx[id].send(picked).is_err() {
            warn!("car {} is gone, pickup reply dropped", id);
        }

        // Keep the position current for distance-based selection
        if let Some(snapshot) = self.snapshots.get_mut(id) {
            snapshot.floor = floor;
            snapshot.direction = direction;
        }
    }

    fn handle_state_changed(&mut self, snapshot: CarSnapshot) {
        let went_idle = snapshot.direction == Direction::Stop;
        self.snapshots[snapshot.id] = snapshot.clone();
        let _ = self.monitor_tx.send(snapshot);

        if went_idle && !self.pending.is_empty() {
            self.retry_pending();
        }
    }

    // A car reported idle; place as many pending calls as the policy allows,
    // oldest first
    fn retry_pending(&mut self) {
        let mut index = 0;
        while index < self.pending.len() {
            let request = self.pending[index];
            match select_car(&self.snapshots, &request) {
                Some(id) => {
                    self.pending.remove(index);
                    self.assign(id, request);
                }
                None => index += 1,
            }
        }
    }

    fn assign(&mut self, id: usize, request: OutsideRequest) {
        info!(
            "hall call floor {} {:?} assigned to car {}",
            request.floor, request.direction, id
        );
        if self.car_request_tx[id].send(request.floor).is_err() {
            warn!("car {} is gone, assignment dropped", id);
            return;
        }

        // The car has not reported back yet; note the direction it will
        // commit to so one idle car does not soak up every pending call
        let snapshot = &mut self.snapshots[id];
        if snapshot.direction == Direction::Stop {
            if request.floor > snapshot.floor {
                snapshot.direction = Direction::Up;
            } else if request.floor < snapshot.floor {
                snapshot.direction = Direction::Down;
            }
        }
    }

    fn dump_state(&self) {
        let state = DebugState {
            pending: &self.pending,
            cars: &self.snapshots,
        };
        match serde_json::to_string_pretty(&state) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize dispatcher state: {}", e),
        }
        debug!("state dumped");
    }
}
