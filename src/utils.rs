use std::time::{SystemTime, UNIX_EPOCH};

// utility functions

/// linear blend between x and y, a in [0, 1]
pub fn mix(x: f32, y: f32, a: f32) -> f32 {
    x * (1.0 - a) + y * a
}

/// microseconds since the epoch, used to drive MicroTimer based loops
pub fn get_micro_time() -> u128 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_micros(),
        Err(_) => 0,
    }
}
