//! National Weather Service forecast adapter.
//!
//! Implements [`ForecastPort`] by downloading the digital DWML document for
//! the station's location and pulling the hourly quantitative precipitation
//! forecast (`<hourly-qpf>`) out of it.
//!
//! The extractor ([`parse_hourly_qpf`]) is plain string scanning and runs on
//! every target; only the HTTP transport is cfg-gated.  On the host there is
//! no network stack, so [`NwsForecastClient::fetch`] reports a transport
//! failure and the controller exercises its cached-forecast path.

use log::{info, warn};

use crate::app::ports::ForecastPort;
use crate::config::Location;
use crate::error::FetchError;

const BASE_URL: &str = "https://forecast.weather.gov/MapClick.php";

/// weather.gov rejects requests without an identifying agent.
pub const USER_AGENT: &str = "rainbypass/0.1 (irrigation rain bypass controller)";

/// A week of hourly data is roughly 100 KiB of XML.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

const HTTP_TIMEOUT_MS: u64 = 20_000;

/// Request URL for a location.
pub fn forecast_url(location: Location) -> String {
    format!(
        "{}?lat={:.4}&lon={:.4}&FcstType=digitalDWML",
        BASE_URL, location.latitude, location.longitude
    )
}

// ── Extractor ─────────────────────────────────────────────────

/// Extract the `<value>` children of the first `<hourly-qpf>` element, in
/// document order (index 0 = the current hour).
///
/// A missing element, an empty or nil value, or a value that is not a
/// finite non-negative number is a [`FetchError::Parse`].  Children other
/// than `<value>` are skipped.
pub fn parse_hourly_qpf(doc: &str) -> Result<Vec<f32>, FetchError> {
    let body = element_body(doc, "hourly-qpf")?;
    let mut values = Vec::new();
    let mut rest = body;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let close = after
            .find('>')
            .ok_or(FetchError::Parse("unterminated tag"))?;
        let tag = &after[..close];
        rest = &after[close + 1..];

        if tag.starts_with(['/', '?', '!']) {
            continue;
        }
        if tag_name(tag) != "value" {
            continue;
        }
        if tag.ends_with('/') {
            // <value xsi:nil="true"/>
            return Err(FetchError::Parse("empty value"));
        }

        let end = rest
            .find("</value>")
            .ok_or(FetchError::Parse("unterminated value"))?;
        let text = rest[..end].trim();
        rest = &rest[end + "</value>".len()..];

        let v: f32 = text
            .parse()
            .map_err(|_| FetchError::Parse("non-numeric value"))?;
        if !v.is_finite() || v < 0.0 {
            return Err(FetchError::Parse("value out of range"));
        }
        values.push(v);
    }

    Ok(values)
}

/// Text between `<name ...>` and `</name>`.  A self-closing element has an
/// empty body.
fn element_body<'a>(doc: &'a str, name: &str) -> Result<&'a str, FetchError> {
    let mut search = 0;
    loop {
        let rel = doc[search..]
            .find('<')
            .ok_or(FetchError::Parse("no hourly-qpf element"))?;
        let start = search + rel + 1;
        let after = &doc[start..];
        let close = after
            .find('>')
            .ok_or(FetchError::Parse("unterminated tag"))?;
        let tag = &after[..close];
        search = start + close + 1;

        if tag_name(tag) != name {
            continue;
        }
        if tag.ends_with('/') {
            return Ok("");
        }

        let closing = format!("</{}>", name);
        let end = doc[search..]
            .find(&closing)
            .ok_or(FetchError::Parse("unterminated hourly-qpf element"))?;
        return Ok(&doc[search..search + end]);
    }
}

fn tag_name(tag: &str) -> &str {
    tag.split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
}

// ── Client ────────────────────────────────────────────────────

/// Blocking HTTPS client for the digital DWML forecast.
pub struct NwsForecastClient {
    timeout_ms: u64,
}

impl Default for NwsForecastClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NwsForecastClient {
    pub fn new() -> Self {
        Self {
            timeout_ms: HTTP_TIMEOUT_MS,
        }
    }

    #[cfg(target_os = "espidf")]
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        use core::time::Duration;
        use embedded_svc::http::Method;
        use embedded_svc::http::client::Client;
        use embedded_svc::io::Read;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(Duration::from_millis(self.timeout_ms)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            buffer_size: Some(2048),
            ..Default::default()
        })
        .map_err(|_| FetchError::Transport("connection setup failed"))?;
        let mut client = Client::wrap(connection);

        let headers = [("User-Agent", USER_AGENT), ("Accept", "application/xml")];
        let request = client
            .request(Method::Get, url, &headers)
            .map_err(|_| FetchError::Transport("request failed"))?;
        let mut response = request
            .submit()
            .map_err(|_| FetchError::Transport("no response"))?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(FetchError::Http(status));
        }

        let mut body = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = response
                .read(&mut chunk)
                .map_err(|_| FetchError::Transport("read failed"))?;
            if n == 0 {
                break;
            }
            if body.len() + n > MAX_BODY_BYTES {
                return Err(FetchError::Parse("response too large"));
            }
            body.extend_from_slice(&chunk[..n]);
        }
        Ok(body)
    }

    #[cfg(not(target_os = "espidf"))]
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::debug!("Forecast(sim): would GET {} (timeout {} ms)", url, self.timeout_ms);
        Err(FetchError::Transport("no network in simulation"))
    }
}

impl ForecastPort for NwsForecastClient {
    fn fetch(&mut self, location: Location) -> Result<Vec<f32>, FetchError> {
        let url = forecast_url(location);
        info!("Forecast: loading {}", url);

        let body = self.get(&url).inspect_err(|e| warn!("Forecast: {}", e))?;
        let doc =
            core::str::from_utf8(&body).map_err(|_| FetchError::Parse("response is not UTF-8"))?;
        let qpf = parse_hourly_qpf(doc).inspect_err(|e| warn!("Forecast: {}", e))?;
        info!("Forecast: {} hourly values", qpf.len());
        Ok(qpf)
    }
}
