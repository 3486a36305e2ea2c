//! Innermost pipeline layer: the layer that actually talks HTTP.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{header, StatusCode};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::envelope::{FailureClass, RequestEnvelope, ResponseBody};
use super::HttpSend;

const ACCEPT_VALUE: &str = "text/html, application/json;q=0.9, */*;q=0.8";

/// Issues the HTTP call, records the status code and decodes the body.
///
/// Connection failures are mapped to a 503 status plus an error entry and
/// classified for the retry layer; they are not retried here. A body that
/// fails to decode is recorded as an error but is not fatal - the raw text
/// stays attached to the envelope for inspection.
pub struct BaseSender {
    client: reqwest::Client,
}

impl BaseSender {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: ResponseBody> HttpSend<T> for BaseSender {
    async fn send(
        &self,
        mut envelope: RequestEnvelope<T>,
        cancel: &CancellationToken,
    ) -> RequestEnvelope<T> {
        envelope.clear_failure();

        if envelope.url.trim().is_empty() {
            error!("request rejected: empty URL");
            envelope.record_error("request rejected: empty URL");
            envelope.status = Some(StatusCode::BAD_REQUEST);
            return envelope;
        }

        if cancel.is_cancelled() {
            envelope.record_error("cancelled before dispatch");
            envelope.mark_failure(FailureClass::Cancelled);
            return envelope;
        }

        let mut request = self
            .client
            .request(envelope.method.clone(), &envelope.url)
            .header(header::ACCEPT, ACCEPT_VALUE)
            .header("x-request-id", Uuid::new_v4().to_string());

        if let Some(body) = &envelope.request_body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("connection failure for {}: {e}", envelope.url);
                envelope.record_error(format!("connection failure: {e}"));
                envelope.status = Some(StatusCode::SERVICE_UNAVAILABLE);
                envelope.mark_failure(FailureClass::Connection);
                return envelope;
            }
        };

        let status = response.status();
        envelope.status = Some(status);
        if status == StatusCode::MOVED_PERMANENTLY {
            info!("{} responded moved permanently", envelope.url);
            envelope.record_error(format!("redirect: {} moved permanently", envelope.url));
        }

        match response.text().await {
            Ok(text) => {
                match T::from_raw(&text) {
                    Ok(body) => envelope.body = Some(body),
                    Err(e) => {
                        debug!("deserialize failure for {}: {e}", envelope.url);
                        envelope.record_error(format!("deserialize failure: {e}"));
                        envelope.mark_failure(FailureClass::Deserialize);
                    }
                }
                envelope.raw_body = Some(text);
            }
            Err(e) => {
                error!("connection failure reading body for {}: {e}", envelope.url);
                envelope.record_error(format!("connection failure reading body: {e}"));
                envelope.status = Some(StatusCode::SERVICE_UNAVAILABLE);
                envelope.mark_failure(FailureClass::Connection);
            }
        }

        envelope
    }
}
