use super::request::decode_request;
use super::response::{write_response, HeaderLines};
use crate::context::OutboundResponse;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// `may_minihttp` service backed by a [`Dispatcher`].
///
/// One clone runs per connection; every clone shares the same dispatcher
/// and owns the header lines of its connection's response in flight.
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    lines: HeaderLines,
}

impl Clone for AppService {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.dispatcher))
    }
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            lines: HeaderLines::default(),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl From<Dispatcher> for AppService {
    fn from(dispatcher: Dispatcher) -> Self {
        Self::new(Arc::new(dispatcher))
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        // The previous response on this connection has been encoded by now.
        self.lines.recycle();
        let inbound = match decode_request(req) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!(error = %err, "Request could not be decoded");
                let body = json!({ "error": "Bad Request", "message": err.to_string(), "status": 400 });
                write_response(res, OutboundResponse::json(400, &body), &mut self.lines);
                return Ok(());
            }
        };

        match self.dispatcher.dispatch(inbound) {
            DispatchOutcome::Respond(resp) => {
                write_response(res, resp, &mut self.lines);
                Ok(())
            }
            DispatchOutcome::Close => {
                // minihttp answers a service error with a bare 500 carrying
                // only the io error text.
                debug!("Response abandoned by error policy");
                Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "unhandled handler error",
                ))
            }
        }
    }
}
