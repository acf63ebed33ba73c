//! Downstream container seam.
//!
//! The container (dependency injection, transport, whatever the application
//! runs on) is opaque to the bootstrap: it is handed the resolved descriptor
//! and configuration, and is asked to stop during shutdown.

use async_trait::async_trait;
use thiserror::Error;

use crate::composite::Configuration;
use crate::descriptor::AppDescriptor;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Container failed to start: {0}")]
    Start(String),

    #[error("Container failed to stop: {0}")]
    Stop(String),
}

/// Application container driven by the lifecycle controller.
#[async_trait]
pub trait Container: Send {
    /// Build or refresh the container; resolve once it is ready to serve.
    async fn start(&mut self, descriptor: &AppDescriptor, config: &Configuration) -> Result<(), ContainerError>;

    /// Resolve once the container has fully stopped.
    async fn stop(&mut self) -> Result<(), ContainerError>;
}

/// Container for applications that do not need one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContainer;

#[async_trait]
impl Container for NoContainer {
    async fn start(&mut self, descriptor: &AppDescriptor, _config: &Configuration) -> Result<(), ContainerError> {
        tracing::debug!(app = %descriptor.name, "No container to start");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ContainerError> {
        Ok(())
    }
}
