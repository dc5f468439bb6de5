// ABOUTME: Echo backend - replies with the input text as a single chat output.
// ABOUTME: Used as the fallback agent type and for smoke-testing a deployment.

use crate::event::AgentOutput;
use crate::traits::AgentBackend;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};

pub struct EchoBackend;

impl EchoBackend {
    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|_settings| Ok(Box::new(EchoBackend)))
    }
}

impl AgentBackend for EchoBackend {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn run<'a>(
        &'a self,
        input: &'a str,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<AgentOutput>>>> {
        Box::pin(async move {
            let output = AgentOutput::chat(input);
            Ok(stream::once(async move { Ok(output) }).boxed())
        })
    }
}
