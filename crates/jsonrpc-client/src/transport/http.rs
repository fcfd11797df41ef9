use std::collections::HashMap;

use reqwest::Method;

use crate::error::ClientError;

/// The outcome of one HTTP request/response cycle (spec.md §6.1). HTTP is
/// stateless (spec.md §4.5): there is no connection object here, just a
/// one-shot call per [`crate::Client::send`]/`notify`/`batch`.
pub struct HttpOutcome {
    pub status: u16,
    pub body: String,
}

pub async fn post_frame(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    body: String,
) -> Result<HttpOutcome, ClientError> {
    let verb: Method = method
        .parse()
        .unwrap_or(Method::POST);
    let full_url = format!("{}{}", url.trim_end_matches('/'), path);

    let mut request = client
        .request(verb, &full_url)
        .header("content-type", "application/json")
        .body(body);
    for (key, value) in headers {
        request = request.header(key, value);
    }

    let response = request
        .send()
        .await
        .map_err(|err| ClientError::Transport(err.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|err| ClientError::Transport(err.to_string()))?;

    Ok(HttpOutcome { status, body })
}
