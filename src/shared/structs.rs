/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::ser::Serializer;
use serde::Serialize;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Stop,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match *self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Stop => Direction::Stop,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "moving")]
    Moving,
    #[serde(rename = "doorOpen")]
    DoorOpen,
}

/// Door sub-state. A cycle runs Closed -> Opening -> Open -> Closing -> Closed
/// and cannot be interrupted once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCycle {
    Closed,
    Opening,
    Open,
    Closing,
}

// Snapshots expose the three-state view: both leaf movements read as
// "transitioning"
impl Serialize for DoorCycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name = match *self {
            DoorCycle::Closed => "closed",
            DoorCycle::Open => "open",
            DoorCycle::Opening | DoorCycle::Closing => "transitioning",
        };
        serializer.serialize_str(name)
    }
}

/// A hall call: a floor plus the direction the rider wants to travel.
/// `direction` is never `Stop`; the input layer guarantees it.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutsideRequest {
    pub floor: u8,
    pub direction: Direction,
}

/// Read-only state snapshot of one car, pushed to the dispatcher after every
/// state-changing step and forwarded to the presentation layer.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CarSnapshot {
    pub id: usize,
    pub floor: u8,
    pub direction: Direction,
    pub behaviour: Behaviour,
    pub door: DoorCycle,
    pub queue: Vec<u8>,
}

impl CarSnapshot {
    pub fn new(id: usize) -> CarSnapshot {
        CarSnapshot {
            id,
            floor: 1,
            direction: Direction::Stop,
            behaviour: Behaviour::Idle,
            door: DoorCycle::Closed,
            queue: Vec::new(),
        }
    }
}

/// Everything the dispatcher reacts to, from the input layer and the cars.
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    HallCall(OutsideRequest),
    Arrived {
        id: usize,
        floor: u8,
        direction: Direction,
    },
    StateChanged(CarSnapshot),
    DumpState,
    Terminate,
}
