//! The seam where the host performs I/O.
//!
//! The core never touches the network. A host implements [`Transport`] with
//! whatever HTTP stack it has; non-2xx responses must come back as `Ok`
//! responses so the core interprets status codes itself. Only failures that
//! produce no response at all map to [`ApiError::Transport`].

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}
