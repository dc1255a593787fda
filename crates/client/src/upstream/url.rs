//! Upstream URL construction.

use waygate_core::TargetDate;

/// Timestamp suffix asking the archive for the raw capture, without the
/// injected toolbar or rewritten links.
const RAW_CAPTURE_SUFFIX: &str = "000000id_";

/// URL of the capture of `url` closest to `date`.
///
/// `{host}/web/{YYYYMMDD}000000id_/{url}`; the target URL is appended as-is.
pub fn snapshot_url(archive_host: &str, date: &TargetDate, url: &str) -> String {
    format!("{}/web/{}{RAW_CAPTURE_SUFFIX}/{url}", archive_host.trim_end_matches('/'), date.wayback_timestamp())
}

/// Endpoint of the availability API. The target goes in the `url` query parameter.
pub fn availability_endpoint(availability_host: &str) -> String {
    format!("{}/wayback/available", availability_host.trim_end_matches('/'))
}
