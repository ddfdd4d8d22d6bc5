//! Frame-rate independent rate limiting for outbound updates.

/// Allows one send per `interval_ms`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval_ms: u64,
    last_sent: Option<u64>,
}

impl RateLimiter {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns `true` and records the send if the interval has elapsed.
    pub fn ready(&mut self, now_ms: u64) -> bool {
        match self.last_sent {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last_sent = Some(now_ms);
                true
            }
        }
    }

    /// Forget the last send so the next call goes through.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
