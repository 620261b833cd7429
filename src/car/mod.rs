pub mod fsm;
pub mod fsm_tests;
pub mod motion;
pub mod queue;

pub use fsm::CarFsm;
pub use motion::Shaft;
pub use queue::StopQueue;
