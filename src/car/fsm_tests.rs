/*
 * Unit tests for the car module
 *
 * The unit tests follow the Arrange, Act, Assert pattern. The FSM runs on
 * its own thread and is driven entirely through its channels: the test
 * plays both the shaft (feeding floor arrivals) and the dispatcher
 * (answering arrival announcements with pickup replies).
 *
 * Tests:
 * - test_fsm_init
 * - test_fsm_inside_request_runs_to_idle
 * - test_fsm_door_cycle_blocks_motion
 * - test_fsm_pickup_is_served_before_farther_stops
 * - test_fsm_duplicate_request_queues_once
 * - test_fsm_same_floor_request_opens_door
 * - test_fsm_choose_direction
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod fsm_tests {
    use crate::car::CarFsm;
    use crate::config::TimingConfig;
    use crate::shared::{Behaviour, CarSnapshot, Direction, DispatcherEvent, DoorCycle};
    use crossbeam_channel as cbc;
    use crossbeam_channel::unbounded;
    use std::thread::spawn;
    use std::time::Duration;

    fn setup_fsm() -> (
        CarFsm,
        cbc::Sender<u8>,
        cbc::Sender<u8>,
        cbc::Receiver<Direction>,
        cbc::Receiver<DispatcherEvent>,
        cbc::Sender<Vec<u8>>,
        cbc::Sender<()>,
    ) {
        // Arrange mock channels
        let (car_request_tx, car_request_rx) = unbounded::<u8>();
        let (floor_reached_tx, floor_reached_rx) = unbounded::<u8>();
        let (motor_cmd_tx, motor_cmd_rx) = unbounded::<Direction>();
        let (dispatcher_event_tx, dispatcher_event_rx) = unbounded::<DispatcherEvent>();
        let (pickup_reply_tx, pickup_reply_rx) = unbounded::<Vec<u8>>();
        let (terminate_tx, terminate_rx) = unbounded::<()>();

        // Short door times so a full cycle fits comfortably in a test
        let config = TimingConfig {
            time_per_floor_ms: 10,
            door_transition_ms: 50,
            door_hold_ms: 100,
        };

        // Create the FSM and return it with the channels
        (
            CarFsm::new(
                0,
                &config,
                car_request_rx,
                floor_reached_rx,
                motor_cmd_tx,
                dispatcher_event_tx,
                pickup_reply_rx,
                terminate_rx,
            ),
            car_request_tx,
            floor_reached_tx,
            motor_cmd_rx,
            dispatcher_event_rx,
            pickup_reply_tx,
            terminate_tx,
        )
    }

    // Waits for the FSM to announce an arrival, answers it, and returns the
    // announced floor and direction
    fn reply_to_arrival(
        dispatcher_rx: &cbc::Receiver<DispatcherEvent>,
        pickup_reply_tx: &cbc::Sender<Vec<u8>>,
        reply: Vec<u8>,
    ) -> (u8, Direction) {
        loop {
            match dispatcher_rx.recv_timeout(Duration::from_secs(3)) {
                Ok(DispatcherEvent::Arrived {
                    floor, direction, ..
                }) => {
                    pickup_reply_tx.send(reply).unwrap();
                    return (floor, direction);
                }
                Ok(_) => continue,
                Err(e) => panic!("Timed out waiting for arrival: {:?}", e),
            }
        }
    }

    fn wait_for_snapshot<F>(
        dispatcher_rx: &cbc::Receiver<DispatcherEvent>,
        predicate: F,
    ) -> CarSnapshot
    where
        F: Fn(&CarSnapshot) -> bool,
    {
        loop {
            match dispatcher_rx.recv_timeout(Duration::from_secs(3)) {
                Ok(DispatcherEvent::StateChanged(snapshot)) => {
                    if predicate(&snapshot) {
                        return snapshot;
                    }
                }
                Ok(DispatcherEvent::Arrived { .. }) => {
                    panic!("Unexpected arrival while waiting for a snapshot");
                }
                Ok(_) => continue,
                Err(e) => panic!("Timed out waiting for snapshot: {:?}", e),
            }
        }
    }

    #[test]
    fn test_fsm_init() {
        // Purpose: Verify that the FSM reports the expected resting state on startup

        // Arrange
        let (fsm, _request_tx, _floor_tx, _motor_rx, dispatcher_rx, _pickup_tx, terminate_tx) =
            setup_fsm();

        // Act
        let fsm_thread = spawn(move || fsm.run());
        let snapshot = wait_for_snapshot(&dispatcher_rx, |_| true);

        // Assert
        assert_eq!(snapshot.floor, 1);
        assert_eq!(snapshot.direction, Direction::Stop);
        assert_eq!(snapshot.behaviour, Behaviour::Idle);
        assert_eq!(snapshot.door, DoorCycle::Closed);
        assert!(snapshot.queue.is_empty());

        // Cleanup
        terminate_tx.send(()).unwrap();
        fsm_thread.join().unwrap();
    }

    #[test]
    fn test_fsm_inside_request_runs_to_idle() {
        // Purpose: An idle car at floor 1 serves an inside request for floor 5
        // and returns to rest (direction commits Up, door cycles at 5, idle after)

        // Arrange
        let (fsm, request_tx, floor_tx, motor_rx, dispatcher_rx, pickup_tx, terminate_tx) =
            setup_fsm();
        let fsm_thread = spawn(move || fsm.run());

        // Act
        request_tx.send(5).unwrap();

        // Assert: the car commits Up and starts the motor
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Up)
        );

        // Feed the ride up; no hall calls anywhere along the way
        for floor in 2..=5 {
            floor_tx.send(floor).unwrap();
            let (at, direction) = reply_to_arrival(&dispatcher_rx, &pickup_tx, vec![]);
            assert_eq!(at, floor);
            assert_eq!(direction, Direction::Up);
        }

        // The motor stops at 5 and the full door cycle runs
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Stop)
        );
        let open = wait_for_snapshot(&dispatcher_rx, |s| s.door == DoorCycle::Open);
        assert_eq!(open.behaviour, Behaviour::DoorOpen);
        assert_eq!(open.floor, 5);

        // Back to rest with nothing queued
        let idle = wait_for_snapshot(&dispatcher_rx, |s| s.behaviour == Behaviour::Idle);
        assert_eq!(idle.floor, 5);
        assert_eq!(idle.direction, Direction::Stop);
        assert!(idle.queue.is_empty());

        // Cleanup
        terminate_tx.send(()).unwrap();
        fsm_thread.join().unwrap();
    }

    #[test]
    fn test_fsm_door_cycle_blocks_motion() {
        // Purpose: Once the doors start cycling, no motor command is issued
        // until they are fully closed again

        // Arrange
        let (fsm, request_tx, floor_tx, motor_rx, dispatcher_rx, pickup_tx, terminate_tx) =
            setup_fsm();
        let fsm_thread = spawn(move || fsm.run());

        // Two stops so the car has somewhere to go after the first door cycle
        request_tx.send(2).unwrap();
        request_tx.send(3).unwrap();
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Up)
        );

        // Act: arrive at the first stop
        floor_tx.send(2).unwrap();
        reply_to_arrival(&dispatcher_rx, &pickup_tx, vec![]);
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Stop)
        );

        // Assert: mid-cycle, with the doors open, the motor stays silent
        wait_for_snapshot(&dispatcher_rx, |s| s.door == DoorCycle::Open);
        assert!(motor_rx.try_recv().is_err());

        // Only after the doors close does the ride to floor 3 resume
        let closed = wait_for_snapshot(&dispatcher_rx, |s| s.door == DoorCycle::Closed);
        assert_eq!(closed.behaviour, Behaviour::Moving);
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Up)
        );

        // Cleanup
        terminate_tx.send(()).unwrap();
        fsm_thread.join().unwrap();
    }

    #[test]
    fn test_fsm_pickup_is_served_before_farther_stops() {
        // Purpose: A hall call merged in through the pickup reply at floor 6
        // is served before the queued stops at 8 and 10 (closest-first, no
        // reversal while work remains ahead)

        // Arrange
        let (fsm, request_tx, floor_tx, motor_rx, dispatcher_rx, pickup_tx, terminate_tx) =
            setup_fsm();
        let fsm_thread = spawn(move || fsm.run());

        request_tx.send(8).unwrap();
        request_tx.send(10).unwrap();
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Up)
        );

        // Act: ride up; the dispatcher hands over a hall call on arrival at 6
        for floor in 2..=5 {
            floor_tx.send(floor).unwrap();
            reply_to_arrival(&dispatcher_rx, &pickup_tx, vec![]);
        }
        floor_tx.send(6).unwrap();
        reply_to_arrival(&dispatcher_rx, &pickup_tx, vec![6]);

        // Assert: the car stops and door-cycles at 6 first
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Stop)
        );
        let stop = wait_for_snapshot(&dispatcher_rx, |s| s.behaviour == Behaviour::DoorOpen);
        assert_eq!(stop.floor, 6);

        // Then continues up to 8
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Up)
        );
        for floor in 7..=8 {
            floor_tx.send(floor).unwrap();
            reply_to_arrival(&dispatcher_rx, &pickup_tx, vec![]);
        }
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Stop)
        );
        let stop = wait_for_snapshot(&dispatcher_rx, |s| s.behaviour == Behaviour::DoorOpen);
        assert_eq!(stop.floor, 8);

        // And finishes at 10, going idle
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Up)
        );
        for floor in 9..=10 {
            floor_tx.send(floor).unwrap();
            reply_to_arrival(&dispatcher_rx, &pickup_tx, vec![]);
        }
        assert_eq!(
            motor_rx.recv_timeout(Duration::from_secs(3)),
            Ok(Direction::Stop)
        );
        let idle = wait_for_snapshot(&dispatcher_rx, |s| s.behaviour == Behaviour::Idle);
        assert_eq!(idle.floor, 10);
        assert!(idle.queue.is_empty());

        // Cleanup
        terminate_tx.send(()).unwrap();
        fsm_thread.join().unwrap();
    }

    #[test]
    fn test_fsm_duplicate_request_queues_once() {
        // Purpose: Requesting the same floor twice leaves one queue entry

        // Arrange
        let (fsm, request_tx, _floor_tx, _motor_rx, dispatcher_rx, _pickup_tx, terminate_tx) =
            setup_fsm();
        let fsm_thread = spawn(move || fsm.run());

        // Act
        request_tx.send(5).unwrap();
        request_tx.send(5).unwrap();
        request_tx.send(7).unwrap();

        // Assert: once 7 shows up, 5 is still there exactly once
        let snapshot = wait_for_snapshot(&dispatcher_rx, |s| s.queue.contains(&7));
        assert_eq!(snapshot.queue, vec![5, 7]);

        // Cleanup
        terminate_tx.send(()).unwrap();
        fsm_thread.join().unwrap();
    }

    #[test]
    fn test_fsm_same_floor_request_opens_door() {
        // Purpose: A request for the floor the car is resting at opens the
        // doors in place instead of queueing a stop

        // Arrange
        let (fsm, request_tx, _floor_tx, motor_rx, dispatcher_rx, _pickup_tx, terminate_tx) =
            setup_fsm();
        let fsm_thread = spawn(move || fsm.run());

        // Act
        request_tx.send(1).unwrap();

        // Assert: full door cycle at floor 1, then idle again
        let open = wait_for_snapshot(&dispatcher_rx, |s| s.door == DoorCycle::Open);
        assert_eq!(open.floor, 1);
        let idle = wait_for_snapshot(&dispatcher_rx, |s| s.behaviour == Behaviour::Idle);
        assert!(idle.queue.is_empty());

        // The motor was never started
        while let Ok(command) = motor_rx.try_recv() {
            assert_eq!(command, Direction::Stop);
        }

        // Cleanup
        terminate_tx.send(()).unwrap();
        fsm_thread.join().unwrap();
    }

    #[test]
    fn test_fsm_choose_direction() {
        // Purpose: Verify the direction policy in isolation: keep going while
        // work remains ahead, reverse when it is all behind, rest otherwise

        // Work ahead keeps the committed direction
        let (mut fsm, _request_tx, _floor_tx, _motor_rx, _dispatcher_rx, _pickup_tx, _terminate_tx) =
            setup_fsm();
        fsm.test_set_state(5, Direction::Up);
        fsm.test_queue_floors(&[8]);
        assert_eq!(fsm.test_choose_direction(), Direction::Up);

        // Work only behind reverses
        let (mut fsm, _request_tx, _floor_tx, _motor_rx, _dispatcher_rx, _pickup_tx, _terminate_tx) =
            setup_fsm();
        fsm.test_set_state(5, Direction::Up);
        fsm.test_queue_floors(&[3]);
        assert_eq!(fsm.test_choose_direction(), Direction::Down);

        // No work rests
        let (mut fsm, _request_tx, _floor_tx, _motor_rx, _dispatcher_rx, _pickup_tx, _terminate_tx) =
            setup_fsm();
        fsm.test_set_state(5, Direction::Up);
        assert_eq!(fsm.test_choose_direction(), Direction::Stop);

        // From rest the oldest stop decides
        let (mut fsm, _request_tx, _floor_tx, _motor_rx, _dispatcher_rx, _pickup_tx, _terminate_tx) =
            setup_fsm();
        fsm.test_set_state(5, Direction::Stop);
        fsm.test_queue_floors(&[7, 2]);
        assert_eq!(fsm.test_choose_direction(), Direction::Up);

        let (mut fsm, _request_tx, _floor_tx, _motor_rx, _dispatcher_rx, _pickup_tx, _terminate_tx) =
            setup_fsm();
        fsm.test_set_state(5, Direction::Stop);
        fsm.test_queue_floors(&[2, 7]);
        assert_eq!(fsm.test_choose_direction(), Direction::Down);
    }
}
