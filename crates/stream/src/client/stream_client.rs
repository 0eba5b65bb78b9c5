use std::sync::Weak;

use crate::client::StreamPrototype;
use crate::engine::EngineInner;
use crate::error::ClientError;

/// Entry point for creating streams on an engine.
///
/// The client does not keep the engine alive; once the engine is terminated or
/// dropped every call fails with [`ClientError::EngineTerminated`].
#[derive(Debug, Clone)]
pub struct StreamClient {
    engine: Weak<EngineInner>,
}

impl StreamClient {
    pub(crate) fn new(engine: Weak<EngineInner>) -> Self {
        Self { engine }
    }

    pub fn new_stream_prototype(&self) -> Result<StreamPrototype, ClientError> {
        match self.engine.upgrade() {
            Some(engine) if engine.is_running() => Ok(StreamPrototype::new(Weak::clone(&self.engine))),
            _ => Err(ClientError::EngineTerminated),
        }
    }
}
