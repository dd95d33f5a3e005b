use std::fmt;
use std::io;
use std::path::PathBuf;

pub mod chart;
pub mod cue;
pub mod param_table;

/// Conditions that abort a load phase. Missing or duplicated assets are
/// not errors; those are reported through the progress sink and the
/// phase keeps going.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Json(serde_json::Error),
    Image(image::ImageError),
    /// A parameter-table entry is missing a required field or carries
    /// unparsable numeric text.
    MalformedRecord(String),
    /// A chart file matched the difficulty-index naming convention but
    /// one of its directives could not be extracted.
    ChartParse { path: PathBuf, reason: String },
    /// A cue-sheet row could not be decoded.
    CueParse { line: usize, reason: String },
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Json(err)
    }
}

impl From<image::ImageError> for LoadError {
    fn from(err: image::ImageError) -> Self {
        LoadError::Image(err)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "IO Error: {}", e),
            LoadError::Json(e) => write!(f, "JSON Error: {}", e),
            LoadError::Image(e) => write!(f, "Image Error: {}", e),
            LoadError::MalformedRecord(msg) => write!(f, "Malformed record: {}", msg),
            LoadError::ChartParse { path, reason } => {
                write!(f, "Chart parse error in {:?}: {}", path, reason)
            }
            LoadError::CueParse { line, reason } => {
                write!(f, "Cue sheet parse error on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Json(e) => Some(e),
            LoadError::Image(e) => Some(e),
            _ => None,
        }
    }
}

/// Canonical song id for a numeric id from the cue table: `3014` maps
/// to `S03-014`.
pub fn song_id_from_int(n: u32) -> String {
    format!("S{:02}-{:03}", n / 1000, n % 1000)
}

/// Chart files spell audio ids with an underscore separator; every map
/// in the database keys on the hyphenated form.
pub fn hyphenate_id(raw: &str) -> String {
    raw.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_map_to_hyphenated_form() {
        assert_eq!(song_id_from_int(3014), "S03-014");
        assert_eq!(song_id_from_int(1001), "S01-001");
        assert_eq!(song_id_from_int(7), "S00-007");
    }

    #[test]
    fn hyphenation_replaces_every_underscore() {
        assert_eq!(hyphenate_id("S03_014"), "S03-014");
        assert_eq!(hyphenate_id("S01-001"), "S01-001");
    }
}
