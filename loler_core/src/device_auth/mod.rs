pub mod driver;
pub mod machine;

pub use driver::DeviceAuthDriver;
pub use machine::{
    transition, Command, DeviceAuthEvent, DeviceAuthState, PendingSession, SLOW_DOWN_STEP_SECS,
};
