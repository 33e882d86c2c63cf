pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod net;
pub mod poller;
pub mod upload;

pub use descriptor::{RequestDescriptor, ResultMapping};
pub use dispatcher::Dispatcher;
pub use envelope::{Body, ResultEnvelope};
pub use error::{Error, Result, UploadError};
pub use net::mock_transport::{MockCall, MockTransport};
pub use net::reqwest_transport::ReqwestTransport;
pub use net::transport::{OutboundRequest, RawResponse, Transport};
pub use net::transport_config::TransportConfig;
pub use poller::{PollConfig, PollHandle, Poller, DEFAULT_POLL_INTERVAL};
pub use reqwest::{Method, Url};
pub use upload::{UploadFile, UploadRules, Uploader};
