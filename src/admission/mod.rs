//! Admission-control logic and state management.

mod key;
mod limiter;
mod registry;
mod sweeper;
mod window;

pub use key::{KeyDeriver, RemoteAddrKey, UNKNOWN_CLIENT};
pub use limiter::{Decision, LimitEvent, Limiter};
pub use registry::{PolicyClass, PolicyRegistry};
pub use sweeper::{Sweeper, SweeperHandle};
pub use window::Policy;
