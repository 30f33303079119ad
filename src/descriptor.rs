//! Compiled per-method metadata.
//!
//! A [`MethodDescriptor`] is produced once by the contract compiler and is
//! immutable afterwards; the dispatch runtime shares it read-only across
//! every call for the life of the compiled client. Construction goes
//! through [`MethodDescriptorBuilder`], which accumulates role bindings and
//! fails fast on conflicts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::request::RequestTemplate;
use crate::types::TypeRef;
use crate::value::ParamExpander;

/// Compiled, validated metadata for one interface method.
pub struct MethodDescriptor {
    config_key: String,
    return_type: TypeRef,
    template: RequestTemplate,
    param_count: usize,
    url_index: Option<usize>,
    body_index: Option<usize>,
    body_type: Option<TypeRef>,
    header_map_index: Option<usize>,
    query_map_index: Option<usize>,
    query_map_encoded: bool,
    form_params: Vec<String>,
    index_to_name: BTreeMap<usize, Vec<String>>,
    index_to_expander: BTreeMap<usize, Arc<dyn ParamExpander>>,
    ignored_params: BTreeSet<usize>,
    ignored: bool,
    warnings: Vec<String>,
}

impl MethodDescriptor {
    /// Starts building a descriptor for the given correlation key.
    pub fn builder(config_key: impl Into<String>) -> MethodDescriptorBuilder {
        MethodDescriptorBuilder {
            inner: MethodDescriptor {
                config_key: config_key.into(),
                return_type: TypeRef::unit(),
                template: RequestTemplate::new(),
                param_count: 0,
                url_index: None,
                body_index: None,
                body_type: None,
                header_map_index: None,
                query_map_index: None,
                query_map_encoded: false,
                form_params: Vec::new(),
                index_to_name: BTreeMap::new(),
                index_to_expander: BTreeMap::new(),
                ignored_params: BTreeSet::new(),
                ignored: false,
                warnings: Vec::new(),
            },
        }
    }

    /// The correlation key (`TypeName#methodName(ParamType,…)`).
    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    /// The resolved return type.
    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    /// The compiled request template.
    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    /// Number of declared parameters.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Position of the per-call URL override parameter.
    pub fn url_index(&self) -> Option<usize> {
        self.url_index
    }

    /// Position of the body parameter.
    pub fn body_index(&self) -> Option<usize> {
        self.body_index
    }

    /// Resolved type of the body parameter.
    pub fn body_type(&self) -> Option<&TypeRef> {
        self.body_type.as_ref()
    }

    /// Position of the header-map parameter.
    pub fn header_map_index(&self) -> Option<usize> {
        self.header_map_index
    }

    /// Position of the query-map parameter.
    pub fn query_map_index(&self) -> Option<usize> {
        self.query_map_index
    }

    /// Whether query-map values arrive pre-encoded.
    pub fn query_map_encoded(&self) -> bool {
        self.query_map_encoded
    }

    /// Names bound as form parameters.
    pub fn form_params(&self) -> &[String] {
        &self.form_params
    }

    /// Parameter position to bound template variable names, insertion order
    /// preserved per position.
    pub fn index_to_name(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.index_to_name
    }

    /// Custom expander for a parameter position, if registered.
    pub fn expander(&self, index: usize) -> Option<&Arc<dyn ParamExpander>> {
        self.index_to_expander.get(&index)
    }

    /// Whether the position is excluded from implicit body binding.
    pub fn is_param_ignored(&self, index: usize) -> bool {
        self.ignored_params.contains(&index)
    }

    /// Whether the whole method was marked non-HTTP.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Diagnostic warnings accumulated during compilation.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("config_key", &self.config_key)
            .field("return_type", &self.return_type.to_string())
            .field("param_count", &self.param_count)
            .field("url_index", &self.url_index)
            .field("body_index", &self.body_index)
            .field("header_map_index", &self.header_map_index)
            .field("query_map_index", &self.query_map_index)
            .field("form_params", &self.form_params)
            .field("index_to_name", &self.index_to_name)
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}

/// Accumulates role bindings for one method, failing fast on conflicts,
/// then freezes into a [`MethodDescriptor`].
#[derive(Debug)]
pub struct MethodDescriptorBuilder {
    inner: MethodDescriptor,
}

impl MethodDescriptorBuilder {
    /// The correlation key being built.
    pub fn config_key(&self) -> &str {
        &self.inner.config_key
    }

    /// Sets the resolved return type.
    pub fn return_type(&mut self, ty: TypeRef) -> &mut Self {
        self.inner.return_type = ty;
        self
    }

    /// Records the declared parameter count.
    pub fn param_count(&mut self, count: usize) -> &mut Self {
        self.inner.param_count = count;
        self
    }

    /// Mutable access to the request template, for marker handlers.
    pub fn template_mut(&mut self) -> &mut RequestTemplate {
        &mut self.inner.template
    }

    /// Read access to the request template.
    pub fn template(&self) -> &RequestTemplate {
        &self.inner.template
    }

    /// Whether the position already holds any role or name binding.
    pub fn is_processed(&self, index: usize) -> bool {
        let d = &self.inner;
        d.url_index == Some(index)
            || d.body_index == Some(index)
            || d.header_map_index == Some(index)
            || d.query_map_index == Some(index)
            || d.index_to_name.contains_key(&index)
            || d.index_to_expander.contains_key(&index)
            || d.ignored_params.contains(&index)
    }

    fn role_conflict(&self, index: usize) -> ConfigurationError {
        ConfigurationError::ConflictingRoles {
            index,
            config_key: self.inner.config_key.clone(),
        }
    }

    /// Binds the position as the per-call URL override.
    ///
    /// ## Errors
    ///
    /// Fails when the position already holds a conflicting role.
    pub fn url_index(&mut self, index: usize) -> Result<&mut Self, ConfigurationError> {
        if self.inner.body_index == Some(index)
            || self.inner.header_map_index == Some(index)
            || self.inner.query_map_index == Some(index)
        {
            return Err(self.role_conflict(index));
        }
        self.inner.url_index = Some(index);
        Ok(self)
    }

    /// Binds the position as the body parameter.
    ///
    /// ## Errors
    ///
    /// Fails when a body parameter already exists or the position holds a
    /// conflicting role.
    pub fn body_index(&mut self, index: usize, ty: TypeRef) -> Result<&mut Self, ConfigurationError> {
        if self.inner.body_index.is_some() {
            return Err(ConfigurationError::TooManyBodyParams {
                config_key: self.inner.config_key.clone(),
                warnings: self.warnings_suffix(),
            });
        }
        if self.is_processed(index) {
            return Err(self.role_conflict(index));
        }
        self.inner.body_index = Some(index);
        self.inner.body_type = Some(ty);
        Ok(self)
    }

    /// Binds the position as the header map.
    ///
    /// ## Errors
    ///
    /// Fails on a second header-map binding or a conflicting role.
    pub fn header_map_index(&mut self, index: usize) -> Result<&mut Self, ConfigurationError> {
        if self.inner.header_map_index.is_some() {
            return Err(ConfigurationError::DuplicateHeaderMap {
                config_key: self.inner.config_key.clone(),
            });
        }
        if self.is_processed(index) {
            return Err(self.role_conflict(index));
        }
        self.inner.header_map_index = Some(index);
        Ok(self)
    }

    /// Binds the position as the query map.
    ///
    /// ## Errors
    ///
    /// Fails on a second query-map binding or a conflicting role.
    pub fn query_map_index(
        &mut self,
        index: usize,
        encoded: bool,
    ) -> Result<&mut Self, ConfigurationError> {
        if self.inner.query_map_index.is_some() {
            return Err(ConfigurationError::DuplicateQueryMap {
                config_key: self.inner.config_key.clone(),
            });
        }
        if self.is_processed(index) {
            return Err(self.role_conflict(index));
        }
        self.inner.query_map_index = Some(index);
        self.inner.query_map_encoded = encoded;
        Ok(self)
    }

    /// Links a template variable name to a parameter position. Several
    /// names may share one position; map roles may not.
    ///
    /// ## Errors
    ///
    /// Fails when the position holds a map or body role.
    pub fn name_param(
        &mut self,
        name: impl Into<String>,
        index: usize,
    ) -> Result<&mut Self, ConfigurationError> {
        if self.inner.body_index == Some(index)
            || self.inner.header_map_index == Some(index)
            || self.inner.query_map_index == Some(index)
        {
            return Err(self.role_conflict(index));
        }
        self.inner
            .index_to_name
            .entry(index)
            .or_default()
            .push(name.into());
        Ok(self)
    }

    /// Registers a custom expander for a parameter position.
    pub fn expander(&mut self, index: usize, expander: Arc<dyn ParamExpander>) -> &mut Self {
        self.inner.index_to_expander.insert(index, expander);
        self
    }

    /// Records a form parameter name.
    pub fn form_param(&mut self, name: impl Into<String>) -> &mut Self {
        self.inner.form_params.push(name.into());
        self
    }

    /// Form parameter names recorded so far.
    pub fn form_params(&self) -> &[String] {
        &self.inner.form_params
    }

    /// Position of the body parameter, if bound so far.
    pub fn body_index_so_far(&self) -> Option<usize> {
        self.inner.body_index
    }

    /// Position of the header-map parameter, if bound so far.
    pub fn header_map_index_so_far(&self) -> Option<usize> {
        self.inner.header_map_index
    }

    /// Position of the query-map parameter, if bound so far.
    pub fn query_map_index_so_far(&self) -> Option<usize> {
        self.inner.query_map_index
    }

    /// Excludes the position from implicit body binding.
    pub fn ignore_param(&mut self, index: usize) -> &mut Self {
        self.inner.ignored_params.insert(index);
        self
    }

    /// Marks the whole method non-HTTP; validation stops there.
    pub fn ignore_method(&mut self) -> &mut Self {
        self.inner.ignored = true;
        self
    }

    /// Attaches a diagnostic warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) -> &mut Self {
        self.inner.warnings.push(warning.into());
        self
    }

    /// Warnings formatted for appending to an error message.
    pub fn warnings_suffix(&self) -> String {
        if self.inner.warnings.is_empty() {
            return String::new();
        }
        let mut out = String::from("\nWarnings:");
        for warning in &self.inner.warnings {
            out.push_str("\n- ");
            out.push_str(warning);
        }
        out
    }

    /// Freezes the descriptor.
    pub fn build(self) -> MethodDescriptor {
        self.inner
    }
}
