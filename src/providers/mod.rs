//! Provider integrations and the registry the CLI resolves names against.
//!
//! Every integration is an independent unit struct implementing
//! [`Integration`]; nothing is shared between them beyond the IO helpers and
//! the normalised [`DateKeyedResults`] they produce.

use crate::config::ProviderConfig;
use crate::dates::DateRange;
use crate::error::{Result, ToolError};
use crate::model::DateKeyedResults;

pub mod ifac;
pub mod jaksa;
pub mod kronos;
pub mod perubus;
pub mod pidesoft;
pub mod quatrobus;
pub mod transmar;

/// A third-party booking API that can be queried for itineraries.
pub trait Integration: Sync {
    /// Registry key, also used in export file names.
    fn name(&self) -> &'static str;

    /// Environment variables that must be set before the integration runs.
    fn required_variables(&self) -> &'static [&'static str];

    /// Whether the integration is implemented or still a scaffolded stub.
    fn ready(&self) -> bool {
        true
    }

    /// Captures the required configuration from the process environment.
    fn check_config(&self) -> Result<ProviderConfig> {
        ProviderConfig::from_env(self.required_variables())
    }

    /// Queries the provider for every date in `range` and normalises the
    /// answers.
    fn fetch(&self, config: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults>;
}

/// Every integration known to the CLI, in listing order.
pub static REGISTRY: &[&dyn Integration] = &[
    &ifac::Ifac,
    &jaksa::Jaksa,
    &kronos::Kronos,
    &perubus::Perubus,
    &pidesoft::Pidesoft,
    &quatrobus::Quatrobus,
    &transmar::Transmar,
];

/// Looks an integration up by its registry key.
pub fn find(name: &str) -> Option<&'static dyn Integration> {
    REGISTRY
        .iter()
        .copied()
        .find(|integration| integration.name() == name)
}

/// Resolves every requested name, failing on the first unknown one.
pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static dyn Integration>> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            find(name).ok_or_else(|| ToolError::UnknownIntegration(name.to_string()))
        })
        .collect()
}
