use clap::Parser;

use crate::error::ConfigError;

/// Runtime tunables of the follower.
///
/// Defaults are applied to every missing field, so both
/// `FollowerConfig::default()` and [`FollowerConfig::build`] with a bare
/// argv yield a usable config.
#[derive(Clone, Debug, Parser, PartialEq)]
pub struct FollowerConfig {
    /// Initial capacity of the ingress queue of pending append-entries
    /// requests. The queue grows past this; the value only sizes the
    /// initial allocation.
    #[clap(long, default_value = "128")]
    pub cached_requests: usize,

    /// Interval in milliseconds between queue-empty checks while draining
    /// pending requests on stop.
    #[clap(long, default_value = "50")]
    pub drain_poll_ms: u64,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl FollowerConfig {
    /// Build a config from command-line style arguments (the first element
    /// is the program name) and validate it.
    pub fn build(args: &[&str]) -> Result<FollowerConfig, ConfigError> {
        let config = <Self as Parser>::parse_from(args);
        config.validate()
    }

    /// Validate the config, returning it for chaining.
    pub fn validate(self) -> Result<FollowerConfig, ConfigError> {
        if self.cached_requests == 0 {
            return Err(ConfigError::ZeroCachedRequests);
        }

        if self.drain_poll_ms == 0 {
            return Err(ConfigError::ZeroDrainPoll);
        }

        Ok(self)
    }
}
