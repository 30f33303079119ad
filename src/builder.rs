//! Client construction.
//!
//! [`Builder`] collects the pluggable collaborators, [`Builder::build`]
//! runs capability enrichment and freezes them into a [`Pretext`] factory,
//! and [`Pretext::new_instance`] compiles a target's contract into a
//! [`BoundClient`]. Cache the bound client: compilation happens once, calls
//! are cheap and thread-safe.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capability::Capability;
use crate::client::{Client, ReqwestClient};
use crate::codec::{
    Decoder, DefaultDecoder, DefaultEncoder, DefaultErrorDecoder, DefaultQueryMapEncoder, Encoder,
    ErrorDecoder, QueryMapEncoder, ResponseMapper, ResponseMappingDecoder,
};
use crate::contract::{Contract, DeclarativeContract, InterfaceDefinition, MethodDefinition};
use crate::dispatch::{
    BoundClient, DefaultInvocationHandlerFactory, DispatchTable, InvocationHandlerFactory,
    MethodHandler, Pipeline, SynchronousMethodHandler,
};
use crate::error::{Error, ExceptionPropagationPolicy};
use crate::interceptor::RequestInterceptor;
use crate::logger::{Level, Logger, NoOpLogger};
use crate::request::Options;
use crate::retry::{DefaultRetryer, Retryer};
use crate::target::Target;
use crate::types::TypeEnv;

/// Computes the correlation key for one method: the same format the
/// compiler stamps on descriptors, exposed for caller-side correlation.
///
/// The format is `TypeName#methodName(ParamType1,ParamType2,…)` - outer
/// type names only, no whitespace. Examples:
///
/// - `Route53#list()`
/// - `Route53#listAt(Marker)`
/// - `Route53#listByNameAndType(String,String)`
pub fn config_key(interface: &str, method: &MethodDefinition, env: &TypeEnv) -> String {
    let params = method
        .params()
        .iter()
        .map(|param| param.ty().resolve(env).name().to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{interface}#{}({params})", method.name())
}

/// Collects collaborators for a compiled client.
pub struct Builder {
    interceptors: Vec<Box<dyn RequestInterceptor>>,
    log_level: Level,
    contract: Box<dyn Contract>,
    client: Option<Box<dyn Client>>,
    retryer: Box<dyn Retryer>,
    logger: Box<dyn Logger>,
    encoder: Box<dyn Encoder>,
    decoder: Box<dyn Decoder>,
    query_map_encoder: Box<dyn QueryMapEncoder>,
    error_decoder: Box<dyn ErrorDecoder>,
    options: Options,
    invocation_handler_factory: Box<dyn InvocationHandlerFactory>,
    decode404: bool,
    close_after_decode: bool,
    propagation_policy: ExceptionPropagationPolicy,
    force_decoding: bool,
    capabilities: Vec<Box<dyn Capability>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            interceptors: Vec::new(),
            log_level: Level::None,
            contract: Box::new(DeclarativeContract::standard()),
            client: None,
            retryer: Box::new(DefaultRetryer::default()),
            logger: Box::new(NoOpLogger),
            encoder: Box::new(DefaultEncoder),
            decoder: Box::new(DefaultDecoder),
            query_map_encoder: Box::new(DefaultQueryMapEncoder),
            error_decoder: Box::new(DefaultErrorDecoder),
            options: Options::default(),
            invocation_handler_factory: Box::new(DefaultInvocationHandlerFactory),
            decode404: false,
            close_after_decode: true,
            propagation_policy: ExceptionPropagationPolicy::None,
            force_decoding: false,
            capabilities: Vec::new(),
        }
    }
}

impl Builder {
    /// A builder with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log verbosity.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Replaces the contract.
    pub fn contract(mut self, contract: impl Contract + 'static) -> Self {
        self.contract = Box::new(contract);
        self
    }

    /// Replaces the transport client.
    pub fn client(mut self, client: impl Client + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Replaces the retry policy.
    pub fn retryer(mut self, retryer: impl Retryer + 'static) -> Self {
        self.retryer = Box::new(retryer);
        self
    }

    /// Replaces the logger.
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Replaces the body encoder.
    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Replaces the response decoder.
    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Replaces the decoder with one that maps the response first.
    pub fn map_and_decode(
        mut self,
        mapper: impl ResponseMapper + 'static,
        decoder: impl Decoder + 'static,
    ) -> Self {
        self.decoder = Box::new(ResponseMappingDecoder::new(
            Box::new(mapper),
            Box::new(decoder),
        ));
        self
    }

    /// Replaces the query-map encoder.
    pub fn query_map_encoder(mut self, encoder: impl QueryMapEncoder + 'static) -> Self {
        self.query_map_encoder = Box::new(encoder);
        self
    }

    /// Replaces the error decoder.
    pub fn error_decoder(mut self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_decoder = Box::new(decoder);
        self
    }

    /// Sets the default per-request options.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Appends a request interceptor.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    /// Replaces the dispatch-table construction strategy.
    pub fn invocation_handler_factory(
        mut self,
        factory: impl InvocationHandlerFactory + 'static,
    ) -> Self {
        self.invocation_handler_factory = Box::new(factory);
        self
    }

    /// Decodes 404 responses into the declared shape's empty value instead
    /// of raising a status error.
    ///
    /// Only 404 gets this treatment: not-found-as-empty is safe and common,
    /// and keeping it narrow avoids complicating redirect, retry, or
    /// fallback behavior.
    pub fn decode404(mut self) -> Self {
        self.decode404 = true;
        self
    }

    /// Leaves the response open after decoding.
    ///
    /// Required when the decode strategy outlives the decode call - the
    /// lazy-sequence strategy in [`crate::codec::stream`] in particular.
    /// The consumer then owns closing whatever the decoder returned.
    pub fn do_not_close_after_decode(mut self) -> Self {
        self.close_after_decode = false;
        self
    }

    /// Sets how terminal retry failures surface.
    pub fn exception_propagation_policy(mut self, policy: ExceptionPropagationPolicy) -> Self {
        self.propagation_policy = policy;
        self
    }

    /// Always invokes the decoder, even for unit-shaped returns. For decode
    /// strategies that need to see every response.
    pub fn force_decoding(mut self) -> Self {
        self.force_decoding = true;
        self
    }

    /// Registers a capability-enrichment hook.
    pub fn add_capability(mut self, capability: impl Capability + 'static) -> Self {
        self.capabilities.push(Box::new(capability));
        self
    }

    /// Compiles a target in one step.
    ///
    /// ## Errors
    ///
    /// Anything [`Builder::build`] or [`Pretext::new_instance`] can return.
    pub fn target(
        self,
        definition: InterfaceDefinition,
        url: impl Into<String>,
    ) -> Result<BoundClient, Error> {
        let target = Target::new(definition, url)?;
        self.build()?.new_instance(target)
    }

    /// Runs capability enrichment and freezes the collaborators.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::Transport`] when no client was configured and the
    /// default one cannot be constructed.
    pub fn build(self) -> Result<Pretext, Error> {
        let caps = &self.capabilities;

        let client = match self.client {
            Some(client) => client,
            None => Box::new(ReqwestClient::new()?),
        };
        let client = caps.iter().fold(client, |c, cap| cap.enrich_client(c));
        let retryer = caps.iter().fold(self.retryer, |r, cap| cap.enrich_retryer(r));
        let interceptors: Vec<Arc<dyn RequestInterceptor>> = self
            .interceptors
            .into_iter()
            .map(|interceptor| {
                caps.iter()
                    .fold(interceptor, |i, cap| cap.enrich_request_interceptor(i))
            })
            .map(Arc::from)
            .collect();
        let logger = caps.iter().fold(self.logger, |l, cap| cap.enrich_logger(l));
        let contract = caps.iter().fold(self.contract, |c, cap| cap.enrich_contract(c));
        let options = caps.iter().fold(self.options, |o, cap| cap.enrich_options(o));
        let encoder = caps.iter().fold(self.encoder, |e, cap| cap.enrich_encoder(e));
        let decoder = caps.iter().fold(self.decoder, |d, cap| cap.enrich_decoder(d));
        let invocation_handler_factory = caps.iter().fold(
            self.invocation_handler_factory,
            |f, cap| cap.enrich_invocation_handler_factory(f),
        );
        let query_map_encoder = caps
            .iter()
            .fold(self.query_map_encoder, |q, cap| cap.enrich_query_map_encoder(q));

        Ok(Pretext {
            contract,
            invocation_handler_factory,
            pipeline: Arc::new(Pipeline {
                client: Arc::from(client),
                retryer: Arc::from(retryer),
                interceptors,
                logger: Arc::from(logger),
                log_level: self.log_level,
                encoder: Arc::from(encoder),
                decoder: Arc::from(decoder),
                query_map_encoder: Arc::from(query_map_encoder),
                error_decoder: Arc::from(self.error_decoder),
                options,
                decode404: self.decode404,
                close_after_decode: self.close_after_decode,
                propagation_policy: self.propagation_policy,
                force_decoding: self.force_decoding,
            }),
        })
    }
}

/// A frozen factory for bound clients.
pub struct Pretext {
    contract: Box<dyn Contract>,
    invocation_handler_factory: Box<dyn InvocationHandlerFactory>,
    pipeline: Arc<Pipeline>,
}

impl Pretext {
    /// Starts a builder.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Compiles the target's contract and binds one callable client.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::Configuration`] when the contract rejects the
    /// definition; no partial client is produced.
    pub fn new_instance(&self, target: Target) -> Result<BoundClient, Error> {
        let descriptors = self.contract.parse_and_validate(target.definition())?;

        let mut handlers: BTreeMap<String, Arc<dyn MethodHandler>> = BTreeMap::new();
        for descriptor in descriptors {
            if descriptor.is_ignored() {
                continue;
            }
            let key = descriptor.config_key().to_string();
            handlers.insert(
                key,
                Arc::new(SynchronousMethodHandler::new(
                    target.clone(),
                    Arc::new(descriptor),
                    self.pipeline.clone(),
                )),
            );
        }

        let table = DispatchTable::new(handlers);
        let handler = self.invocation_handler_factory.create(&target, table);
        Ok(BoundClient::new(target, handler))
    }
}
