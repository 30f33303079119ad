//! The dispatch runtime.
//!
//! A compiled client is a [`DispatchTable`]: one executor per method, keyed
//! by `config_key`, built once and read-only afterwards. Calls resolve the
//! method's template against their arguments, run the interceptor chain,
//! execute through the transport inside the retry loop, and decode the
//! response - all on the calling thread. Descriptors and the table are
//! shared across threads; everything mutable is per-call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::client::Client;
use crate::codec::{empty_value_of, Decoder, Encoder, ErrorDecoder, QueryMapEncoder};
use crate::descriptor::MethodDescriptor;
use crate::error::{DispatchError, EncodeError, Error, ExceptionPropagationPolicy};
use crate::interceptor::RequestInterceptor;
use crate::logger::{Level, Logger};
use crate::request::{Options, RequestTemplate};
use crate::retry::Retryer;
use crate::target::Target;
use crate::template::Bindings;
use crate::types::TypeRef;
use crate::value::{ArgValue, DecodedValue, ParamExpander, ToStringExpander};

/// One bound executor: the full request pipeline for a single method.
pub trait MethodHandler: Send + Sync + fmt::Debug {
    /// Executes the method with positional arguments.
    ///
    /// ## Errors
    ///
    /// Any call-time error from the taxonomy in [`crate::error`].
    fn invoke(&self, args: &[ArgValue]) -> Result<DecodedValue, Error>;
}

/// Immutable mapping from `config_key` to executor.
pub struct DispatchTable {
    handlers: BTreeMap<String, Arc<dyn MethodHandler>>,
}

impl DispatchTable {
    /// Builds a table from pre-constructed executors.
    pub fn new(handlers: BTreeMap<String, Arc<dyn MethodHandler>>) -> Self {
        Self { handlers }
    }

    /// Number of bound executors.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All bound correlation keys.
    pub fn config_keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// The executor for an exact correlation key.
    pub fn handler(&self, config_key: &str) -> Option<&Arc<dyn MethodHandler>> {
        self.handlers.get(config_key)
    }

    /// Resolves a method reference: an exact `config_key`, or a bare method
    /// name when it matches exactly one compiled method.
    ///
    /// ## Errors
    ///
    /// [`DispatchError::Unknown`] when nothing matches,
    /// [`DispatchError::Ambiguous`] when a bare name matches several
    /// overloads.
    pub fn lookup(&self, method: &str) -> Result<&Arc<dyn MethodHandler>, DispatchError> {
        if method.contains('#') {
            return self.handlers.get(method).ok_or_else(|| DispatchError::Unknown {
                method: method.to_string(),
            });
        }
        let mut matches = self
            .handlers
            .iter()
            .filter(|(key, _)| method_name_of(key) == method);
        match (matches.next(), matches.next()) {
            (Some((_, handler)), None) => Ok(handler),
            (None, _) => Err(DispatchError::Unknown {
                method: method.to_string(),
            }),
            (Some((first, _)), Some((second, _))) => {
                let mut candidates = vec![first.clone(), second.clone()];
                candidates.extend(matches.map(|(key, _)| key.clone()));
                Err(DispatchError::Ambiguous {
                    method: method.to_string(),
                    candidates,
                })
            }
        }
    }
}

fn method_name_of(config_key: &str) -> &str {
    config_key
        .split_once('#')
        .map(|(_, rest)| rest)
        .unwrap_or(config_key)
        .split_once('(')
        .map(|(name, _)| name)
        .unwrap_or(config_key)
}

/// Routes calls to the executors of one compiled client.
pub trait InvocationHandler: Send + Sync {
    /// Dispatches one call.
    ///
    /// ## Errors
    ///
    /// [`DispatchError`] for unroutable calls, plus whatever the executor
    /// returns.
    fn invoke(&self, method: &str, args: &[ArgValue]) -> Result<DecodedValue, Error>;
}

/// Swappable dispatch construction.
///
/// Replacements must keep exactly one executor per method, the read-only
/// table contract, and an identical method-to-executor mapping for the life
/// of the client.
pub trait InvocationHandlerFactory: Send + Sync {
    /// Builds the invocation handler for one target.
    fn create(&self, target: &Target, dispatch: DispatchTable) -> Box<dyn InvocationHandler>;
}

/// Default factory: straight table lookup.
#[derive(Debug, Default)]
pub struct DefaultInvocationHandlerFactory;

impl InvocationHandlerFactory for DefaultInvocationHandlerFactory {
    fn create(&self, _target: &Target, dispatch: DispatchTable) -> Box<dyn InvocationHandler> {
        Box::new(TableInvocationHandler { dispatch })
    }
}

struct TableInvocationHandler {
    dispatch: DispatchTable,
}

impl InvocationHandler for TableInvocationHandler {
    fn invoke(&self, method: &str, args: &[ArgValue]) -> Result<DecodedValue, Error> {
        let handler = self.dispatch.lookup(method)?;
        handler.invoke(args)
    }
}

/// A callable client bound to one target.
///
/// Cheap to share behind an `Arc`; safe to call from any number of threads
/// concurrently.
pub struct BoundClient {
    target: Target,
    handler: Box<dyn InvocationHandler>,
}

impl BoundClient {
    pub(crate) fn new(target: Target, handler: Box<dyn InvocationHandler>) -> Self {
        Self { target, handler }
    }

    /// The target this client is bound to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Calls a compiled method by `config_key` or unambiguous bare name.
    ///
    /// ## Errors
    ///
    /// Any call-time error from the taxonomy in [`crate::error`].
    pub fn call(&self, method: &str, args: &[ArgValue]) -> Result<DecodedValue, Error> {
        self.handler.invoke(method, args)
    }
}

/// The shared pipeline collaborators, assembled once per built client.
pub(crate) struct Pipeline {
    pub(crate) client: Arc<dyn Client>,
    pub(crate) retryer: Arc<dyn Retryer>,
    pub(crate) interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) log_level: Level,
    pub(crate) encoder: Arc<dyn Encoder>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) query_map_encoder: Arc<dyn QueryMapEncoder>,
    pub(crate) error_decoder: Arc<dyn ErrorDecoder>,
    pub(crate) options: Options,
    pub(crate) decode404: bool,
    pub(crate) close_after_decode: bool,
    pub(crate) propagation_policy: ExceptionPropagationPolicy,
    pub(crate) force_decoding: bool,
}

/// The synchronous executor: template resolution, interceptors, transport
/// with retry, error handling, decode - all on the calling thread.
pub(crate) struct SynchronousMethodHandler {
    target: Target,
    descriptor: Arc<MethodDescriptor>,
    pipeline: Arc<Pipeline>,
}

impl SynchronousMethodHandler {
    pub(crate) fn new(
        target: Target,
        descriptor: Arc<MethodDescriptor>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Self {
            target,
            descriptor,
            pipeline,
        }
    }

    /// Builds the per-call resolved template from positional arguments.
    fn resolved_template(&self, args: &[ArgValue]) -> Result<RequestTemplate, Error> {
        let descriptor = &self.descriptor;
        if args.len() != descriptor.param_count() {
            return Err(DispatchError::Arity {
                config_key: descriptor.config_key().to_string(),
                expected: descriptor.param_count(),
                got: args.len(),
            }
            .into());
        }

        let mut bindings = Bindings::new();
        for (index, names) in descriptor.index_to_name() {
            let values = expand_values(&args[*index], descriptor.expander(*index))?;
            for name in names {
                bindings.insert_values(name.clone(), values.clone(), false);
            }
        }

        let mut template = descriptor.template().resolve(&bindings)?;

        if !descriptor.form_params().is_empty() {
            let mut form = BTreeMap::new();
            for name in descriptor.form_params() {
                if let Some(values) = bindings.values(name) {
                    form.insert(name.clone(), values.to_vec());
                }
            }
            self.pipeline.encoder.encode(
                &ArgValue::Map(form),
                &TypeRef::generic(
                    "HashMap",
                    vec![TypeRef::new("String"), TypeRef::new("String")],
                ),
                &mut template,
            )?;
        } else if let Some(body_index) = descriptor.body_index() {
            let body_type = descriptor.body_type().cloned().unwrap_or_else(TypeRef::unit);
            self.pipeline
                .encoder
                .encode(&args[body_index], &body_type, &mut template)?;
        }

        if let Some(index) = descriptor.query_map_index() {
            let map = self.pipeline.query_map_encoder.encode(&args[index])?;
            for (name, values) in &map {
                template.query_literal(name, values, descriptor.query_map_encoded());
            }
        }

        if let Some(index) = descriptor.header_map_index() {
            let ArgValue::Map(map) = &args[index] else {
                return Err(EncodeError::Unsupported {
                    value_kind: "header map argument",
                }
                .into());
            };
            for (name, values) in map {
                template.header_literal(name, values);
            }
        }

        if let Some(index) = descriptor.url_index() {
            let url = match &args[index] {
                ArgValue::Url(url) => url.to_string(),
                ArgValue::Str(url) => url.clone(),
                _ => {
                    return Err(EncodeError::Unsupported {
                        value_kind: "URL override argument",
                    }
                    .into())
                }
            };
            template.set_target(url);
        }

        Ok(template)
    }

    fn execute_and_decode(
        &self,
        template: &RequestTemplate,
        options: &Options,
    ) -> Result<DecodedValue, Error> {
        let pipeline = &self.pipeline;
        let config_key = self.descriptor.config_key();

        let mut template = template.clone();
        for interceptor in &pipeline.interceptors {
            interceptor.apply(&mut template);
        }
        self.target.apply(&mut template);
        let request = template.to_request()?;

        pipeline
            .logger
            .log_request(pipeline.log_level, config_key, &request);

        let start = Instant::now();
        let response = pipeline.client.execute(&request, options)?;
        pipeline.logger.log_response(
            pipeline.log_level,
            config_key,
            response.status(),
            start.elapsed().as_millis(),
        );

        let return_type = self.descriptor.return_type();
        if response.is_success() {
            if return_type.is_response() {
                return Ok(DecodedValue::Response(response));
            }
            if return_type.is_unit() && !pipeline.force_decoding {
                return Ok(DecodedValue::Empty);
            }
            let response = if pipeline.close_after_decode {
                response.buffered().map_err(Error::Decode)?
            } else {
                response
            };
            return pipeline
                .decoder
                .decode(response, return_type)
                .map_err(Error::Decode);
        }

        if pipeline.decode404 && response.status() == 404 && !return_type.is_response() {
            return Ok(empty_value_of(return_type));
        }

        Err(pipeline.error_decoder.decode(config_key, response))
    }
}

impl fmt::Debug for SynchronousMethodHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronousMethodHandler")
            .field("config_key", &self.descriptor.config_key())
            .finish_non_exhaustive()
    }
}

impl MethodHandler for SynchronousMethodHandler {
    fn invoke(&self, args: &[ArgValue]) -> Result<DecodedValue, Error> {
        let template = self.resolved_template(args)?;
        let options = args
            .iter()
            .find_map(|arg| match arg {
                ArgValue::Options(options) => Some(options.clone()),
                _ => None,
            })
            .unwrap_or_else(|| self.pipeline.options.clone());

        let mut attempt = self.pipeline.retryer.begin();
        loop {
            match self.execute_and_decode(&template, &options) {
                Err(Error::Transport(err)) if err.retryable => {
                    match attempt.continue_or_propagate(err) {
                        Ok(()) => {
                            self.pipeline.logger.log_retry(
                                self.pipeline.log_level,
                                self.descriptor.config_key(),
                            );
                        }
                        Err(terminal) => {
                            return Err(self.pipeline.propagation_policy.apply(terminal))
                        }
                    }
                }
                other => return other,
            }
        }
    }
}

/// Expands one argument into template values, element-wise for
/// multi-valued arguments.
fn expand_values(
    value: &ArgValue,
    expander: Option<&Arc<dyn ParamExpander>>,
) -> Result<Vec<String>, Error> {
    let default = ToStringExpander;
    let expander: &dyn ParamExpander = match expander {
        Some(custom) => custom.as_ref(),
        None => &default,
    };
    let values = match value {
        ArgValue::Strings(items) => items
            .iter()
            .map(|item| expander.expand(&ArgValue::Str(item.clone())))
            .collect::<Result<Vec<_>, _>>()?,
        ArgValue::Json(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| expander.expand(&ArgValue::Json(item.clone())))
            .collect::<Result<Vec<_>, _>>()?,
        other => vec![expander.expand(other)?],
    };
    Ok(values)
}
