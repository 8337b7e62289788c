use std::time::Duration;

use crate::protocol::MAX_FRAME_SIZE;

/// How long to wait for a response, and how often to resend a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetryPolicy {
    /// Wait this long for a matching response before resending.
    pub interval: Duration,
    /// Total number of requests sent before giving up. At least 1.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Send once, wait `window`.
    pub fn once(window: Duration) -> Self {
        Self::new(window, 1)
    }

    /// The whole time a read may take before timing out.
    pub fn window(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 4 x 50ms, a 200ms window
        Self::new(Duration::from_millis(50), 4)
    }
}

/// Tunables for a [Client][crate::Client].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientConfig {
    pub retry: RetryPolicy,
    /// The receive buffer drops its garbage when it grows this large
    /// without yielding a frame.
    pub buffer_capacity: usize,
    /// Largest single read from the port.
    pub read_chunk: usize,
    /// How long a command may run before its acknowledgement is given up on.
    pub command_timeout: Duration,
}

impl ClientConfig {
    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }

    pub fn with_buffer_capacity(self, buffer_capacity: usize) -> Self {
        Self {
            // must always have room for the largest frame and the next preamble
            buffer_capacity: buffer_capacity.max(2 * MAX_FRAME_SIZE),
            ..self
        }
    }

    pub fn with_read_chunk(self, read_chunk: usize) -> Self {
        Self {
            read_chunk: read_chunk.max(1),
            ..self
        }
    }

    pub fn with_command_timeout(self, command_timeout: Duration) -> Self {
        Self {
            command_timeout,
            ..self
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            buffer_capacity: 512,
            read_chunk: 128,
            // zeroing the gyros takes a few seconds of averaging
            command_timeout: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_window() {
        assert_eq!(RetryPolicy::default().window(), Duration::from_millis(200));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(Duration::from_millis(1), 0).max_attempts, 1);
    }

    #[test]
    fn capacity_floor() {
        let config = ClientConfig::default().with_buffer_capacity(10);
        assert_eq!(config.buffer_capacity, 2 * MAX_FRAME_SIZE);
    }
}
