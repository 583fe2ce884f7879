//! Harness configuration.
//!
//! # Example
//!
//! ```
//! use handler_harness_runtime::{CallThrough, HarnessConfig};
//! use std::time::Duration;
//!
//! let config = HarnessConfig::builder()
//!     .default_timeout(Duration::from_secs(2))
//!     .call_through(CallThrough::Stubbed)
//!     .build();
//!
//! assert_eq!(config.default_timeout, Duration::from_secs(2));
//! assert_eq!(config.call_through, CallThrough::Stubbed);
//! ```

use crate::spy::CallThrough;
use std::time::Duration;

/// Wait used by [`Harness::await_next_default`](crate::Harness::await_next_default) unless configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Harness configuration.
///
/// # Default Values
///
/// - `default_timeout`: 10 seconds
/// - `call_through`: [`CallThrough::Real`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Wait applied when a test does not pass an explicit timeout
    pub default_timeout: Duration,
    /// Call-through policy for handlers registered without an explicit one
    pub call_through: CallThrough,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            call_through: CallThrough::Real,
        }
    }
}

impl HarnessConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub const fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder {
            default_timeout: None,
            call_through: None,
        }
    }
}

/// Builder for [`HarnessConfig`].
#[derive(Debug, Clone)]
pub struct HarnessConfigBuilder {
    default_timeout: Option<Duration>,
    call_through: Option<CallThrough>,
}

impl HarnessConfigBuilder {
    /// Set the default wait for [`Harness::await_next_default`](crate::Harness::await_next_default).
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Set the call-through policy applied by [`Harness::register`](crate::Harness::register).
    #[must_use]
    pub const fn call_through(mut self, call_through: CallThrough) -> Self {
        self.call_through = Some(call_through);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> HarnessConfig {
        HarnessConfig {
            default_timeout: self.default_timeout.unwrap_or(DEFAULT_TIMEOUT),
            call_through: self.call_through.unwrap_or_default(),
        }
    }
}
