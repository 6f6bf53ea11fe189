//! Dashboard state: attribute cache, capture session, and the event loop
//!
//! - `attribute`: the three store keys and the toggle rule
//! - `capture`: Idle / Listening / Completed / Failed voice sessions
//! - `dashboard`: immutable state record with a single update function
//! - `machine`: event loop that serializes every input onto that record

mod attribute;
mod capture;
mod dashboard;
mod machine;

pub use attribute::{toggled, DeviceAttribute};
pub use capture::CaptureSignal;
pub use dashboard::DashboardState;
pub use machine::{DashboardMachine, Input};
