//! ureq-backed [`Transport`].
//!
//! Status-as-error is off: 4xx/5xx come back as ordinary responses and the
//! core turns them into `ApiError`s. Only failures with no response at all
//! (refused connection, bad URL) become `ApiError::Transport`.

use todo_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, Transport};
use tracing::trace;

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let content_type = req
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| "application/json".to_string());

        let result = match (req.method, req.body) {
            (HttpMethod::Get, _) => self.agent.get(&req.url).call(),
            (HttpMethod::Delete, _) => self.agent.delete(&req.url).call(),
            (HttpMethod::Post, Some(body)) => self
                .agent
                .post(&req.url)
                .content_type(&content_type)
                .send(body.as_bytes()),
            (HttpMethod::Post, None) => self.agent.post(&req.url).send_empty(),
            (HttpMethod::Put, Some(body)) => self
                .agent
                .put(&req.url)
                .content_type(&content_type)
                .send(body.as_bytes()),
            (HttpMethod::Put, None) => self.agent.put(&req.url).send_empty(),
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        trace!(status, bytes = body.len(), "response received");
        Ok(HttpResponse::new(status, body))
    }
}
