use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::parsing::{song_id_from_int, LoadError};

/// Location of one playable clip inside the extracted audio banks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwbCue {
    /// Bank directory under the audio root, e.g. `MER_BGM_V3`.
    pub bank: String,
    /// Index of the clip inside the bank; `<cue>.wav` on disk.
    pub cue: u32,
}

/// Canonical song id to cue location. `None` records an id the cue
/// table lists but has no mapping for.
pub type CueIndex = BTreeMap<String, Option<AwbCue>>;

/// Parses the cue sheet: a header row, then rows of
/// `numeric song id, encoded cue value`. Duplicate ids overwrite the
/// previous row silently.
pub fn parse_file(path: &Path) -> Result<CueIndex, LoadError> {
    let content = fs::read_to_string(path)?;
    parse_str(&content)
}

pub fn parse_str(content: &str) -> Result<CueIndex, LoadError> {
    let mut index = CueIndex::new();
    for (idx, line) in content.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(2, ',');
        let id_field = fields.next().unwrap_or("");
        let cue_field = fields
            .next()
            .ok_or_else(|| cue_err(line_no, "missing cue column"))?;

        let numeric: u32 = id_field
            .trim()
            .parse()
            .map_err(|_| cue_err(line_no, &format!("bad song id '{}'", id_field.trim())))?;
        let cue = decode_cue(cue_field.trim()).map_err(|reason| cue_err(line_no, &reason))?;

        index.insert(song_id_from_int(numeric), cue);
    }
    Ok(index)
}

/// Decodes one encoded cue value: `V{n}-{cue}` names clip `cue` in bank
/// `MER_BGM_V{n}`. The placeholders `-` and the empty string mean the
/// table has no mapping for this id.
fn decode_cue(field: &str) -> Result<Option<AwbCue>, String> {
    if field.is_empty() || field == "-" {
        return Ok(None);
    }

    let Some((tag, cue)) = field.split_once('-') else {
        return Err(format!("undecodable cue value '{}'", field));
    };
    if !tag.starts_with('V') || tag.len() < 2 {
        return Err(format!("unknown bank tag '{}'", tag));
    }
    let cue: u32 = cue
        .trim()
        .parse()
        .map_err(|_| format!("bad cue index '{}'", cue))?;

    Ok(Some(AwbCue {
        bank: format!("MER_BGM_{}", tag),
        cue,
    }))
}

fn cue_err(line: usize, reason: &str) -> LoadError {
    LoadError::CueParse {
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_decode_to_banks_and_cue_indices() {
        let index = parse_str("id,cue\n3014,V3-812\n1001,V1-10\n").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index["S03-014"],
            Some(AwbCue { bank: "MER_BGM_V3".to_string(), cue: 812 })
        );
        assert_eq!(
            index["S01-001"],
            Some(AwbCue { bank: "MER_BGM_V1".to_string(), cue: 10 })
        );
    }

    #[test]
    fn header_row_is_skipped_even_when_it_looks_like_data() {
        let index = parse_str("id,cue\n7,-\n").unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index["S00-007"], None);
    }

    #[test]
    fn placeholder_cues_record_an_absent_mapping() {
        let index = parse_str("id,cue\n7,-\n8,\n").unwrap();
        assert_eq!(index["S00-007"], None);
        assert_eq!(index["S00-008"], None);
    }

    #[test]
    fn duplicate_ids_keep_the_later_row() {
        let index = parse_str("id,cue\n1001,V1-10\n1001,V2-44\n").unwrap();
        assert_eq!(
            index["S01-001"],
            Some(AwbCue { bank: "MER_BGM_V2".to_string(), cue: 44 })
        );
    }

    #[test]
    fn malformed_rows_fail_the_load() {
        assert!(matches!(
            parse_str("id,cue\nnot-a-number,V1-10\n"),
            Err(LoadError::CueParse { line: 2, .. })
        ));
        assert!(matches!(
            parse_str("id,cue\n1001\n"),
            Err(LoadError::CueParse { line: 2, .. })
        ));
        assert!(matches!(
            parse_str("id,cue\n1001,garbage\n"),
            Err(LoadError::CueParse { line: 2, .. })
        ));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let index = parse_str("id,cue\n\n1001,V1-10\n\n").unwrap();
        assert_eq!(index.len(), 1);
    }
}
