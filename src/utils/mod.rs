pub mod capability;
pub mod http;

pub use capability::Capability;
pub use http::build_http_client;
