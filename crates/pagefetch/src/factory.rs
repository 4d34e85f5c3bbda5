//! Process-wide defaults for new resources

use crate::error::FetchError;
use crate::options::{OptionOverrides, Options};
use crate::resource::Resource;
use tracing::debug;

/// Builds [`Resource`]s from a shared set of default options
///
/// Reconfiguring the factory never affects resources it already built.
#[derive(Debug, Clone, Default)]
pub struct ResourceFactory {
    defaults: Options,
}

impl ResourceFactory {
    /// Factory using the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory using `defaults`
    pub fn with_defaults(defaults: Options) -> Self {
        Self { defaults }
    }

    /// Current defaults
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Merge `overrides` into the defaults
    ///
    /// Either every override is applied or, on error, none is.
    pub fn configure(&mut self, overrides: &OptionOverrides) -> Result<&Options, FetchError> {
        self.defaults = self.defaults.merged(overrides)?;
        debug!(defaults = ?self.defaults, "Updated default options");
        Ok(&self.defaults)
    }

    /// Merge overrides given as a JSON object into the defaults
    pub fn configure_json(&mut self, overrides: &serde_json::Value) -> Result<&Options, FetchError> {
        let overrides = OptionOverrides::from_value(overrides)?;
        self.configure(&overrides)
    }

    /// New resource for `url` using the current defaults
    pub fn resource(&self, url: &str) -> Result<Resource, FetchError> {
        Resource::with_options(url, self.defaults.clone())
    }

    /// New resource for `url` using the current defaults plus `overrides`
    pub fn resource_with(
        &self,
        url: &str,
        overrides: &serde_json::Value,
    ) -> Result<Resource, FetchError> {
        let overrides = OptionOverrides::from_value(overrides)?;
        Resource::with_options(url, self.defaults.merged(&overrides)?)
    }
}
