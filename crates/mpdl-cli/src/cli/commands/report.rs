//! Download report printing (text or JSON).

use anyhow::Result;
use mpdl_core::coordinator::DownloadReport;
use mpdl_core::metrics::format_bytes;
use mpdl_core::output;
use std::path::PathBuf;

/// `-o` or the URL's file name in the current directory.
pub(crate) fn output_path(url: &str, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(output::default_file_name(url)))
}

pub(crate) fn print_report(report: &DownloadReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}

pub(crate) fn render_text(report: &DownloadReport) -> String {
    let m = &report.metrics;
    let mut out = format!(
        "Downloaded {} in {:.2}s ({:.2} MB/s)",
        format_bytes(m.bytes),
        m.elapsed.as_secs_f64(),
        m.megabytes_per_sec()
    );
    if let Some(path) = &report.output {
        out.push_str(&format!(" -> {}", path.display()));
    }
    out.push('\n');
    out.push_str(&format!("  chunks: {}\n", report.chunk_count));
    for (endpoint, bytes) in &report.per_endpoint {
        out.push_str(&format!("  {:<40} {:>12}\n", endpoint, format_bytes(*bytes)));
    }
    if let Some(m) = &report.size_mismatch {
        out.push_str(&format!("  warning: {}\n", m));
    }
    if let Some(digest) = &report.sha256 {
        out.push_str(&format!("  sha256: {}\n", digest));
    }
    out
}
