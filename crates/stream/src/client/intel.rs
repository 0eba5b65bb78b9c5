/// Per stream information handed to every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamIntel {
    stream_id: u64,
    connection_id: i64,
    consumed_bytes_from_response: u64,
}

impl StreamIntel {
    pub(crate) fn new(stream_id: u64, consumed_bytes_from_response: u64) -> Self {
        // streams are served in process, there is never an upstream connection
        Self { stream_id, connection_id: -1, consumed_bytes_from_response }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn connection_id(&self) -> i64 {
        self.connection_id
    }

    /// Response body bytes delivered to the application so far
    pub fn consumed_bytes_from_response(&self) -> u64 {
        self.consumed_bytes_from_response
    }
}
