mod queue;

pub use queue::{Due, TimerQueue};
