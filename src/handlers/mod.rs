//! Handler builders and associated traits.
//!
//! Provides a minimal builder API for constructing handlers in a
//! type‑safe manner. Each builder implements [`HandlerBuilderTrait`]
//! which returns a boxed [`FemtoHandlerTrait`] ready for registration
//! with a logger.

use std::io;

use thiserror::Error;

use crate::{handler::FemtoHandlerTrait, mqtt_handler::BrokerError};

pub mod mqtt_builder;

pub use mqtt_builder::{BackoffOverrides, MqttHandlerBuilder};

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O error whilst reading configuration.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The broker client could not be created.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Trait implemented by all handler builders.
///
/// Builders return boxed [`FemtoHandlerTrait`] objects so the caller can
/// register them without knowing the concrete handler type.
pub trait HandlerBuilderTrait: Send + Sync {
    type Handler: FemtoHandlerTrait + 'static;

    /// Build the concrete handler.
    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError>;

    /// Build the handler behind a trait object.
    fn build(&self) -> Result<Box<dyn FemtoHandlerTrait>, HandlerBuildError> {
        Ok(Box::new(self.build_inner()?))
    }
}
