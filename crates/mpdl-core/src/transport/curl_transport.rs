//! libcurl transport: one Easy handle per request, routed through an HTTP proxy.
//!
//! Bodies are streamed: the transfer runs on its own thread and hands each
//! received buffer over a bounded channel, so a slow reader pauses curl
//! instead of growing memory. Dropping the body aborts the transfer.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::str;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::Duration;

use curl::easy::{Easy, List};

use super::headers::{parse_header_lines, parse_status_line};
use super::{
    FetchError, FetchResponse, FetchService, HeadResponse, RangedRequest, ResponseBody,
    StreamRequest,
};
use crate::directory::ProxyEndpoint;

/// Buffers queued between the transfer thread and the reader.
const STREAM_QUEUE_DEPTH: usize = 64;

/// libcurl accepts receive buffers between these sizes.
const MIN_BUFFER_SIZE: usize = 1024;
const MAX_BUFFER_SIZE: usize = 512 * 1024;

/// Timeouts and routing for every request made by a [`CurlTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Proxy for unranged requests (size probe, single-stream GET, listing).
    /// `None` connects directly.
    pub default_proxy: Option<String>,
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard cap on one request.
    pub timeout: Duration,
    /// Receive buffer size for ranged GETs.
    pub buffer_size: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            default_proxy: None,
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            buffer_size: 8192,
        }
    }
}

/// [`FetchService`] backed by libcurl.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: TransportOptions,
}

impl CurlTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    fn default_endpoint(&self) -> Option<ProxyEndpoint> {
        self.options.default_proxy.as_deref().map(ProxyEndpoint::new)
    }

    fn easy(
        &self,
        url: &str,
        method: &str,
        headers: &HashMap<String, String>,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        match method {
            "GET" => easy.get(true)?,
            "HEAD" => easy.nobody(true)?,
            other => easy.custom_request(other)?,
        }
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(self.options.low_speed_limit)?;
        easy.low_speed_time(self.options.low_speed_time)?;
        easy.timeout(self.options.timeout)?;

        if let Some(proxy) = proxy {
            easy.proxy(&proxy_address(proxy))?;
            // An explicit route ignores `no_proxy` from the environment.
            easy.noproxy("")?;
        }

        let mut list = List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl FetchService for CurlTransport {
    fn fetch_ranged(&self, req: &RangedRequest<'_>) -> Result<FetchResponse, FetchError> {
        let mut easy = self.easy(req.url, req.method, req.headers, Some(req.endpoint))?;
        // curl wants "start-end" (inclusive), not "bytes=start-end".
        easy.range(&format!("{}-{}", req.start, req.end))?;
        easy.buffer_size(clamp_buffer(self.options.buffer_size))?;
        tracing::trace!(
            url = req.url,
            proxy = %req.endpoint,
            "ranged {} bytes={}-{}",
            req.method,
            req.start,
            req.end
        );
        spawn_transfer(easy)
    }

    fn fetch_streaming(&self, req: &StreamRequest<'_>) -> Result<FetchResponse, FetchError> {
        let route = self.default_endpoint();
        let mut easy = self.easy(req.url, req.method, req.headers, route.as_ref())?;
        easy.buffer_size(clamp_buffer(req.chunk_size))?;
        tracing::trace!(url = req.url, "streaming {}", req.method);
        spawn_transfer(easy)
    }

    fn probe_head(&self, url: &str) -> Result<HeadResponse, FetchError> {
        let route = self.default_endpoint();
        let mut easy = self.easy(url, "HEAD", &HashMap::new(), route.as_ref())?;
        let mut lines: Vec<String> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                record_header_line(&mut lines, data);
                true
            })?;
            transfer.perform()?;
        }
        let status = easy.response_code()?;
        Ok(HeadResponse {
            status,
            headers: parse_header_lines(&lines),
        })
    }

    fn default_route(&self) -> String {
        self.options
            .default_proxy
            .clone()
            .unwrap_or_else(|| "direct".to_string())
    }
}

/// Proxy string for libcurl. A port hint replaces the URL's port; libcurl's
/// own proxy-port option is ignored when the proxy string carries a port.
fn proxy_address(endpoint: &ProxyEndpoint) -> String {
    let Some(port) = endpoint.port_hint else {
        return endpoint.url.clone();
    };
    match url::Url::parse(&endpoint.url) {
        Ok(u) => match u.host_str() {
            Some(host) => format!("{}://{}:{}", u.scheme(), host, port),
            None => endpoint.url.clone(),
        },
        Err(_) => endpoint.url.clone(),
    }
}

fn clamp_buffer(size: usize) -> usize {
    size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)
}

/// Keeps only the header lines of the latest response (redirects and proxy
/// CONNECT replies each start with a new status line).
fn record_header_line(lines: &mut Vec<String>, data: &[u8]) {
    let Ok(s) = str::from_utf8(data) else {
        return;
    };
    let line = s.trim_end();
    if line.starts_with("HTTP/") {
        lines.clear();
    }
    if !line.is_empty() {
        lines.push(line.to_string());
    }
}

enum TransferEvent {
    Head { status: u32, lines: Vec<String> },
    Data(Vec<u8>),
    Done(Result<(), FetchError>),
}

/// Response head collected by the header callback, handed over once.
#[derive(Default)]
struct HeadState {
    lines: RefCell<Vec<String>>,
    sent: Cell<bool>,
}

impl HeadState {
    fn on_header(&self, data: &[u8]) {
        record_header_line(&mut self.lines.borrow_mut(), data);
    }

    /// Returns the head the first time it is called, `None` afterwards.
    fn take(&self, fallback_status: u32) -> Option<TransferEvent> {
        if self.sent.replace(true) {
            return None;
        }
        let lines = self.lines.take();
        let status = lines
            .first()
            .and_then(|l| parse_status_line(l))
            .unwrap_or(fallback_status);
        Some(TransferEvent::Head { status, lines })
    }
}

/// Starts `easy` on a transfer thread and waits for the response head.
fn spawn_transfer(easy: Easy) -> Result<FetchResponse, FetchError> {
    let (tx, rx) = mpsc::sync_channel(STREAM_QUEUE_DEPTH);
    thread::Builder::new()
        .name("mpdl-transfer".to_string())
        .spawn(move || drive_transfer(easy, tx))
        .map_err(|e| FetchError::Stream(format!("spawn transfer thread: {}", e)))?;

    match rx.recv() {
        Ok(TransferEvent::Head { status, lines }) => Ok(FetchResponse {
            status,
            headers: parse_header_lines(&lines),
            body: ResponseBody::Streamed(Box::new(TransferStream { rx: Some(rx) })),
        }),
        Ok(TransferEvent::Done(Err(e))) => Err(e),
        Ok(_) => Err(FetchError::Stream("body arrived before response head".to_string())),
        Err(_) => Err(FetchError::Closed),
    }
}

fn drive_transfer(mut easy: Easy, tx: SyncSender<TransferEvent>) {
    let head = HeadState::default();

    let performed = (|| -> Result<(), curl::Error> {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            head.on_header(data);
            true
        })?;
        transfer.write_function(|data| {
            if let Some(event) = head.take(0) {
                if tx.send(event).is_err() {
                    return Ok(0);
                }
            }
            // A closed receiver means the body was dropped: abort the transfer.
            match tx.send(TransferEvent::Data(data.to_vec())) {
                Ok(()) => Ok(data.len()),
                Err(_) => Ok(0),
            }
        })?;
        transfer.perform()
    })();

    match performed {
        Ok(()) => {
            // Empty body: the head has not been sent yet.
            let code = easy.response_code().unwrap_or(0);
            if let Some(event) = head.take(code) {
                let _ = tx.send(event);
            }
            let _ = tx.send(TransferEvent::Done(Ok(())));
        }
        Err(e) => {
            let _ = tx.send(TransferEvent::Done(Err(FetchError::Curl(e))));
        }
    }
}

/// Body iterator fed by the transfer thread.
struct TransferStream {
    rx: Option<Receiver<TransferEvent>>,
}

impl Iterator for TransferStream {
    type Item = Result<Vec<u8>, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rx = self.rx.as_ref()?;
        let item = match rx.recv() {
            Ok(TransferEvent::Data(data)) => return Some(Ok(data)),
            Ok(TransferEvent::Done(Ok(()))) => None,
            Ok(TransferEvent::Done(Err(e))) => Some(Err(e)),
            Ok(TransferEvent::Head { .. }) => {
                Some(Err(FetchError::Stream("duplicate response head".to_string())))
            }
            Err(_) => Some(Err(FetchError::Closed)),
        };
        self.rx = None;
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lines_reset_on_new_status() {
        let mut lines = Vec::new();
        record_header_line(&mut lines, b"HTTP/1.1 200 Connection established\r\n");
        record_header_line(&mut lines, b"\r\n");
        record_header_line(&mut lines, b"HTTP/1.1 206 Partial Content\r\n");
        record_header_line(&mut lines, b"Content-Length: 10\r\n");
        assert_eq!(lines, vec!["HTTP/1.1 206 Partial Content", "Content-Length: 10"]);
    }

    #[test]
    fn head_state_is_taken_once() {
        let head = HeadState::default();
        head.on_header(b"HTTP/1.1 206 Partial Content\r\n");
        match head.take(0) {
            Some(TransferEvent::Head { status, .. }) => assert_eq!(status, 206),
            _ => panic!("expected head"),
        }
        assert!(head.take(0).is_none());
    }

    #[test]
    fn head_state_falls_back_to_response_code() {
        let head = HeadState::default();
        match head.take(204) {
            Some(TransferEvent::Head { status, lines }) => {
                assert_eq!(status, 204);
                assert!(lines.is_empty());
            }
            _ => panic!("expected head"),
        }
    }

    #[test]
    fn port_hint_replaces_proxy_port() {
        let plain = ProxyEndpoint::new("http://127.0.0.1:4444");
        assert_eq!(proxy_address(&plain), "http://127.0.0.1:4444");
        let hinted = plain.clone().with_port_hint(4447);
        assert_eq!(proxy_address(&hinted), "http://127.0.0.1:4447");
        let no_port = ProxyEndpoint::new("http://exit.i2p").with_port_hint(4444);
        assert_eq!(proxy_address(&no_port), "http://exit.i2p:4444");
    }

    #[test]
    fn buffer_size_is_clamped() {
        assert_eq!(clamp_buffer(0), MIN_BUFFER_SIZE);
        assert_eq!(clamp_buffer(8192), 8192);
        assert_eq!(clamp_buffer(usize::MAX), MAX_BUFFER_SIZE);
    }
}
