//! Capability enrichment.
//!
//! A capability may wrap or replace any pluggable collaborator before the
//! client is finalized - metrics decorators, tracing wrappers, test
//! instrumentation. Every hook defaults to pass-through; implementors
//! override only what they care about. Enrichment runs once, in
//! registration order, during [`crate::builder::Builder::build`].

use crate::client::Client;
use crate::codec::{Decoder, Encoder, QueryMapEncoder};
use crate::contract::Contract;
use crate::dispatch::InvocationHandlerFactory;
use crate::interceptor::RequestInterceptor;
use crate::logger::Logger;
use crate::request::Options;
use crate::retry::Retryer;

/// Build-time hooks over the pluggable collaborators.
#[allow(unused_variables)]
pub trait Capability: Send + Sync {
    /// Wraps the transport client.
    fn enrich_client(&self, client: Box<dyn Client>) -> Box<dyn Client> {
        client
    }

    /// Wraps the retry policy.
    fn enrich_retryer(&self, retryer: Box<dyn Retryer>) -> Box<dyn Retryer> {
        retryer
    }

    /// Wraps one request interceptor.
    fn enrich_request_interceptor(
        &self,
        interceptor: Box<dyn RequestInterceptor>,
    ) -> Box<dyn RequestInterceptor> {
        interceptor
    }

    /// Wraps the logger.
    fn enrich_logger(&self, logger: Box<dyn Logger>) -> Box<dyn Logger> {
        logger
    }

    /// Wraps the contract.
    fn enrich_contract(&self, contract: Box<dyn Contract>) -> Box<dyn Contract> {
        contract
    }

    /// Adjusts the default per-request options.
    fn enrich_options(&self, options: Options) -> Options {
        options
    }

    /// Wraps the body encoder.
    fn enrich_encoder(&self, encoder: Box<dyn Encoder>) -> Box<dyn Encoder> {
        encoder
    }

    /// Wraps the response decoder.
    fn enrich_decoder(&self, decoder: Box<dyn Decoder>) -> Box<dyn Decoder> {
        decoder
    }

    /// Wraps the query-map encoder.
    fn enrich_query_map_encoder(
        &self,
        encoder: Box<dyn QueryMapEncoder>,
    ) -> Box<dyn QueryMapEncoder> {
        encoder
    }

    /// Wraps the dispatch-table construction strategy.
    fn enrich_invocation_handler_factory(
        &self,
        factory: Box<dyn InvocationHandlerFactory>,
    ) -> Box<dyn InvocationHandlerFactory> {
        factory
    }
}
