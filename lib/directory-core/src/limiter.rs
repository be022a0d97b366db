//! Static per-client traffic limits

use directory_api::LimitReply;
use tracing::debug;

pub const DEFAULT_LIMIT_IN: i64 = 1_048_576;
pub const DEFAULT_LIMIT_OUT: i64 = 1_048_576;

#[derive(Clone, Debug)]
pub struct LimiterOptions {
    /// Inbound bytes per second, `<= 0` for the default
    pub limit_in: i64,
    /// Outbound bytes per second, `<= 0` for the default
    pub limit_out: i64,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            limit_in: DEFAULT_LIMIT_IN,
            limit_out: DEFAULT_LIMIT_OUT,
        }
    }
}

/// TrafficLimiter answers every client with the same configured limits
pub struct TrafficLimiter {
    opts: LimiterOptions,
}

impl TrafficLimiter {
    pub fn new(opts: LimiterOptions) -> Self {
        Self { opts }
    }

    pub fn limit(&self, client: &str) -> LimitReply {
        let limit_in = if self.opts.limit_in > 0 {
            self.opts.limit_in
        } else {
            DEFAULT_LIMIT_IN
        };
        let limit_out = if self.opts.limit_out > 0 {
            self.opts.limit_out
        } else {
            DEFAULT_LIMIT_OUT
        };

        debug!(client = %client, limit_in, limit_out, "limit");
        LimitReply {
            limit_in,
            limit_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_limits() {
        let limiter = TrafficLimiter::new(LimiterOptions {
            limit_in: 100,
            limit_out: 200,
        });
        let reply = limiter.limit("client-a");
        assert_eq!(reply.limit_in, 100);
        assert_eq!(reply.limit_out, 200);
    }

    #[test]
    fn test_non_positive_limits_fall_back() {
        let limiter = TrafficLimiter::new(LimiterOptions {
            limit_in: 0,
            limit_out: -5,
        });
        let reply = limiter.limit("");
        assert_eq!(reply.limit_in, DEFAULT_LIMIT_IN);
        assert_eq!(reply.limit_out, DEFAULT_LIMIT_OUT);
    }
}
