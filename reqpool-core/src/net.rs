pub mod mock_transport;
pub mod response_decoder;
pub mod reqwest_transport;
pub mod transport;
pub mod transport_config;
