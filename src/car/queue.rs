/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::Direction;

/// Pending stops of one car. Insertion order is kept because a car starting
/// from rest commits its direction to the oldest stop; everything else works
/// on direction-relative distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopQueue {
    stops: Vec<u8>,
}

impl StopQueue {
    pub fn new() -> StopQueue {
        StopQueue { stops: Vec::new() }
    }

    /// Adds a stop. Returns false when the floor was already queued.
    pub fn insert(&mut self, floor: u8) -> bool {
        if self.stops.contains(&floor) {
            return false;
        }
        self.stops.push(floor);
        true
    }

    /// Removes a stop. Returns false when the floor was not queued.
    pub fn remove(&mut self, floor: u8) -> bool {
        match self.stops.iter().position(|f| *f == floor) {
            Some(index) => {
                self.stops.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, floor: u8) -> bool {
        self.stops.contains(&floor)
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// The oldest queued stop, used to pick a direction from rest.
    pub fn first(&self) -> Option<u8> {
        self.stops.first().copied()
    }

    /// The closest stop strictly beyond `floor` in `direction`. Ties cannot
    /// occur since stops are unique.
    pub fn next_in_direction(&self, floor: u8, direction: Direction) -> Option<u8> {
        match direction {
            Direction::Up => self
                .stops
                .iter()
                .filter(|f| **f > floor)
                .min_by_key(|f| **f - floor)
                .copied(),
            Direction::Down => self
                .stops
                .iter()
                .filter(|f| **f < floor)
                .min_by_key(|f| floor - **f)
                .copied(),
            Direction::Stop => None,
        }
    }

    pub fn has_in_direction(&self, floor: u8, direction: Direction) -> bool {
        self.next_in_direction(floor, direction).is_some()
    }

    /// Sorted copy for state snapshots.
    pub fn as_sorted(&self) -> Vec<u8> {
        let mut stops = self.stops.clone();
        stops.sort_unstable();
        stops
    }
}
