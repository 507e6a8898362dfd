//! Transport adapter: `may_minihttp` requests in, dispatcher outcomes out.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::decode_request;
pub use response::{status_reason, MAX_RESPONSE_HEADERS};
pub use service::AppService;
