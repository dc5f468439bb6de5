// ABOUTME: Core AgentBackend trait that all backends implement.
// ABOUTME: A backend turns one input into a stream of chat/system outputs.

use crate::event::AgentOutput;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

/// Core trait that all agent backends implement.
///
/// A backend is owned by exactly one session worker and only ever handles one
/// input at a time; the worker serializes inputs in submission order.
pub trait AgentBackend: Send + Sync {
    /// Backend name for logging and metrics
    fn name(&self) -> &'static str;

    /// Handle one input and stream its outputs
    ///
    /// The outer error means the backend could not start at all. An `Err`
    /// item ends the turn early and is reported as an error notice.
    fn run<'a>(
        &'a self,
        input: &'a str,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<AgentOutput>>>>;
}
