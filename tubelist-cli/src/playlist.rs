//! M3U output: descriptor grammar, special-entry selection and the durably
//! written playlist file.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use chrono_tz::Tz;

use ytdlp_resolver::{ResolvedRecord, is_manifest_url, normalize_reference};

use crate::expiry::LOCAL_TIME_FORMAT;

/// Fixed header declaring the format version and the nesting-separator
/// convention consumers rely on.
pub const PLAYLIST_HEADER: &str = r#"#EXTM3U $BorpasFileFormat="1" $NestedGroupsSeparator="/""#;

/// Identifier carried by the synthetic special entry.
pub const SPECIAL_ENTRY_ID: &str = "info";

/// Escapes a value for use inside a double-quoted descriptor attribute.
pub fn escape_attr(value: &str) -> String {
    value.replace('"', "%22")
}

/// Builds one `#EXTINF` descriptor line: fixed tag, optional
/// space-separated attributes, a comma, then the free-text title with
/// newlines stripped.
pub fn build_extinf(id: Option<&str>, logo: Option<&str>, title: &str) -> String {
    let mut attrs = Vec::new();
    if let Some(id) = id {
        attrs.push(format!("tvg-id=\"{}\"", escape_attr(id)));
    }
    if let Some(logo) = logo {
        attrs.push(format!("tvg-logo=\"{}\"", escape_attr(logo)));
    }
    let attrs_str = if attrs.is_empty() {
        String::new()
    } else {
        format!(" {}", attrs.join(" "))
    };
    let title = title.replace(['\n', '\r'], " ");
    format!("#EXTINF:-1{attrs_str},{}", title.trim())
}

/// Endpoint of the special entry: the first buffered record whose stream
/// URL looks like a manifest, else the canonical reference of the first
/// surviving input line, else absent.
pub fn select_special_url(records: &[ResolvedRecord], unique_inputs: &[String]) -> Option<String> {
    records
        .iter()
        .filter_map(|r| r.stream_url.as_deref())
        .find(|url| is_manifest_url(url))
        .map(ToOwned::to_owned)
        .or_else(|| unique_inputs.first().map(|line| normalize_reference(line)))
}

/// Suffixes the output file name with a run timestamp.
pub fn timestamped_path(path: &Path, now: DateTime<Tz>) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("playlist");
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or("m3u");
    path.with_file_name(format!("{stem}_{}.{ext}", now.format("%Y%m%d_%H%M%S")))
}

/// Playlist file with an explicit durability barrier after the header and
/// after every entry: a crash mid-run leaves a valid prefix, never a torn
/// entry.
pub struct PlaylistWriter {
    file: File,
}

impl PlaylistWriter {
    /// Creates (truncating) the playlist and writes the format header and
    /// the creation-timestamp comment.
    pub fn create(path: &Path, created: DateTime<Tz>) -> io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "{PLAYLIST_HEADER}")?;
        writeln!(
            file,
            "# Δημιουργήθηκε στις {}",
            created.format(LOCAL_TIME_FORMAT)
        )?;
        file.flush()?;
        file.sync_data()?;
        Ok(Self { file })
    }

    /// Writes one (descriptor, endpoint) pair and syncs it to disk.
    pub fn write_entry(&mut self, extinf: &str, url: &str) -> io::Result<()> {
        writeln!(self.file, "{extinf}")?;
        writeln!(self.file, "{url}")?;
        self.sync()
    }

    /// Writes a descriptor that has no endpoint line (a special entry for
    /// which no URL could be chosen).
    pub fn write_descriptor(&mut self, extinf: &str) -> io::Result<()> {
        writeln!(self.file, "{extinf}")?;
        self.sync()
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}
