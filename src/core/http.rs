use std::time::Duration;

use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        ACCEPT,
        USER_AGENT,
    },
    Client,
};

use crate::core::TenderError;

const SPREADSHEET_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet, application/octet-stream";

/// Client used for artifact requests. `timeout` bounds the whole exchange,
/// body included.
pub fn http_client(timeout: Duration) -> Result<Client, TenderError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("tender-results/0.1 (+reqwest)"));
    headers.insert(ACCEPT, HeaderValue::from_static(SPREADSHEET_MIME));

    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| TenderError::Custom(format!("HTTP client build failed: {e}")))
}

/// The `Content-Type` of a response, if it is readable text.
pub fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
