//! Simple stopwatch for measuring elapsed time.

use std::time::Instant;

/// A lightweight stopwatch used to time requests.
pub struct Watch {
    start: Instant,
}

impl Watch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds since the watch was started, saturating at `i64::MAX`.
    pub fn elapsed_ms(&self) -> i64 {
        i64::try_from(self.start.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn measures_elapsed_time() {
        let watch = Watch::start();
        thread::sleep(Duration::from_millis(20));
        let elapsed = watch.elapsed_ms();
        assert!(elapsed >= 19, "elapsed was {elapsed} ms");
    }
}
