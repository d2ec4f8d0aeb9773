use std::time::Duration;

/// Average transfer speed in bytes per second.
///
/// Elapsed time is counted in whole milliseconds, at least one.
pub fn average_speed(received: u64, elapsed: Duration) -> u64 {
    let millis = elapsed.as_millis().max(1);
    let bps = u128::from(received) * 1000 / millis;
    u64::try_from(bps).unwrap_or(u64::MAX)
}

/// The average speed, if it is below `minimum` once `grace` has passed.
pub fn below_minimum(received: u64, elapsed: Duration, grace: Duration, minimum: u64) -> Option<u64> {
    if elapsed < grace {
        return None;
    }
    let average = average_speed(received, elapsed);
    (average < minimum).then_some(average)
}
