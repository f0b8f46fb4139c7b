use std::time::Duration;

use futures_timer::Delay;

/// Resolves once `duration` has elapsed. Works under any executor, including
/// `futures::executor::block_on`.
pub fn sleep(duration: Duration) -> Delay {
    Delay::new(duration)
}
