mod mock_source;
mod reconnect;
mod transport;

pub use mock_source::{MockPushEventSource, MockPushEventSourceHandle};
pub use reconnect::{ReconnectConfig, ReconnectingPushEventSource};
pub use transport::{PushTransport, RawPushStream};
