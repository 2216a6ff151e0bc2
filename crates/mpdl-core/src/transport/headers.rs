//! Parse raw HTTP response header lines into the fields the downloader uses.

/// Headers of interest from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// Body size in bytes, if `Content-Length` is present and numeric.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// Raw `Content-Range` value (e.g. `bytes 0-99/1000`).
    pub content_range: Option<String>,
    /// `ETag` value without surrounding quotes.
    pub etag: Option<String>,
}

/// Parse collected header lines. Status lines and blank lines are skipped;
/// when several responses were seen (redirects, proxy CONNECT) the caller
/// should pass only the lines of the final one.
pub fn parse_header_lines<S: AsRef<str>>(lines: &[S]) -> ResponseHeaders {
    let mut out = ResponseHeaders::default();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() || line.starts_with("HTTP/") {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("content-range") {
            out.content_range = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("etag") {
            out.etag = Some(value.trim_matches('"').to_string());
        }
    }

    out
}

/// Status code from a status line such as `HTTP/1.1 206 Partial Content`.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}
