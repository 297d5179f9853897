//! Expiry aggregation across a run and its human-readable rendering.
//!
//! The playlist-facing strings are Greek, matching the playlists this tool
//! has always produced; timestamps are rendered in Athens local time.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Europe::Athens;

use ytdlp_resolver::ResolvedRecord;

/// Sentinel for a missing expiry.
pub const NOT_AVAILABLE: &str = "μη διαθέσιμη";
/// Sentinel for an already-elapsed expiry.
pub const EXPIRES_NOW: &str = "λήγει τώρα";

/// Timestamp format shared by the header comment and the special entry.
pub const LOCAL_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Latest expiry across all buffered records, if any carries one.
pub fn expire_max(records: &[ResolvedRecord]) -> Option<i64> {
    records.iter().filter_map(|r| r.expire_epoch).max()
}

/// Renders a delta in seconds as `σε <hours> και <minutes> και <seconds>`,
/// omitting zero components; a non-positive delta is already expired.
pub fn render_relative_delta(total_secs: i64) -> String {
    if total_secs <= 0 {
        return EXPIRES_NOW.to_string();
    }
    let hours = total_secs / 3600;
    let rem = total_secs % 3600;
    let minutes = rem / 60;
    let seconds = rem % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!(
            "{hours} {}",
            if hours == 1 { "ώρα" } else { "ώρες" }
        ));
    }
    if minutes > 0 {
        parts.push(format!(
            "{minutes} {}",
            if minutes == 1 { "λεπτό" } else { "λεπτά" }
        ));
    }
    if seconds > 0 {
        parts.push(format!(
            "{seconds} {}",
            if seconds == 1 {
                "δευτερόλεπτο"
            } else {
                "δευτερόλεπτα"
            }
        ));
    }
    format!("σε {}", parts.join(" και "))
}

/// Title of the synthetic first entry: the aggregated expiry in Athens
/// local time plus a relative countdown, or the not-available sentinel.
/// `now` is passed in so rendering stays deterministic under test.
pub fn special_entry_title(expire_max: Option<i64>, now: DateTime<Utc>) -> String {
    match expire_max.and_then(|epoch| Utc.timestamp_opt(epoch, 0).single()) {
        Some(expire_utc) => {
            let local = expire_utc.with_timezone(&Athens);
            let delta = (expire_utc - now).num_seconds();
            format!(
                "Λήξη συνδέσμων: {} ({})",
                local.format(LOCAL_TIME_FORMAT),
                render_relative_delta(delta)
            )
        }
        None => format!("Λήξη συνδέσμων: {NOT_AVAILABLE}"),
    }
}
