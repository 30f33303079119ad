//! Target identity: which interface, against which base URL.

use std::sync::Arc;

use crate::contract::InterfaceDefinition;
use crate::error::{TransportError, TransportErrorKind};
use crate::request::RequestTemplate;

/// Binds an interface definition to a base address.
///
/// One [`crate::dispatch::BoundClient`] exists per target; the definition
/// is shared read-only.
#[derive(Debug, Clone)]
pub struct Target {
    definition: Arc<InterfaceDefinition>,
    name: String,
    url: String,
}

impl Target {
    /// Creates a target. The name defaults to the URL.
    ///
    /// ## Errors
    ///
    /// Returns [`TransportError`] when `url` is not an absolute URL.
    pub fn new(
        definition: InterfaceDefinition,
        url: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        url::Url::parse(&url).map_err(|err| {
            TransportError::new(
                TransportErrorKind::Protocol,
                format!("invalid target URL {url:?}"),
                false,
            )
            .with_source(err)
        })?;
        Ok(Self {
            definition: Arc::new(definition),
            name: url.clone(),
            url,
        })
    }

    /// Overrides the diagnostic name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The bound interface definition.
    pub fn definition(&self) -> &InterfaceDefinition {
        &self.definition
    }

    /// The diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Applies the base URL to a template that does not already carry one
    /// (a per-call URL override wins).
    pub fn apply(&self, template: &mut RequestTemplate) {
        if template.target().is_none() {
            template.set_target(&self.url);
        }
    }
}
