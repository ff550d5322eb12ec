use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// EXIF stores capture time as local wall-clock text: "YYYY:MM:DD HH:MM:SS".
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum CaptureTimeError {
    #[error("IO error reading modification time of {path}: {source}")]
    Modified {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where a photo's capture time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    DateTimeOriginal,
    Modified,
}

/// Resolve the capture time of `file_path`.
///
/// `DateTimeOriginal` wins when present and well formed; anything else (no
/// EXIF block, no tag, garbage text) falls back to the file's mtime.
pub fn capture_time(file_path: &Path) -> Result<(NaiveDateTime, TimeSource), CaptureTimeError> {
    if let Some(taken) = read_date_time_original(file_path) {
        return Ok((taken, TimeSource::DateTimeOriginal));
    }
    modified_time(file_path).map(|t| (t, TimeSource::Modified))
}

/// Read and parse the `DateTimeOriginal` tag, if the container has one.
pub fn read_date_time_original(file_path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(file_path).ok()?;
    let mut buf_reader = BufReader::new(file);

    let exif_reader = match Reader::new().read_from_container(&mut buf_reader) {
        Ok(reader) => reader,
        Err(_) => return None, // No EXIF data or unsupported container
    };

    let field = exif_reader.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let raw = field_to_string(&field.value)?;
    let parsed = parse_exif_datetime(&raw);
    if parsed.is_none() {
        log::debug!(
            "Unparseable DateTimeOriginal {:?} in {}, using mtime",
            raw,
            file_path.display()
        );
    }
    parsed
}

/// The file's last-modified time as local wall-clock time.
pub fn modified_time(file_path: &Path) -> Result<NaiveDateTime, CaptureTimeError> {
    let modified = fs::metadata(file_path)
        .and_then(|m| m.modified())
        .map_err(|source| CaptureTimeError::Modified {
            path: file_path.display().to_string(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Parse an EXIF datetime string. Only the canonical format is accepted.
pub fn parse_exif_datetime(datetime_str: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(datetime_str.trim_end_matches('\0'), EXIF_DATETIME_FORMAT).ok()
}

fn field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(vec) => vec
            .first()
            .map(|ascii_val| String::from_utf8_lossy(ascii_val).trim_end_matches('\0').to_string()),
        Value::Undefined(data, _) => {
            Some(String::from_utf8_lossy(data).trim_end_matches('\0').to_string())
        }
        _ => None,
    }
}
