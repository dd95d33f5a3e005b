use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::parsing::{hyphenate_id, LoadError};

/// Chart filenames carry a two-digit difficulty index immediately
/// before the extension (`S03-014_02.mer`).
static CHART_FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d\d)\.mer$").unwrap());

/// Raw audio id as chart files spell it, underscore separated.
static AUDIO_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"S\d\d_\d\d\d").unwrap());

const AUDIO_DIRECTIVE: &str = "MUSIC_FILE_PATH";
const OFFSET_DIRECTIVE: &str = "OFFSET";

/// Audio linkage extracted from one chart file: the referenced audio id
/// (already hyphenated) and the playback offset exactly as written.
pub type AudioRef = (String, String);

/// Scans `<charts_root>/<song_id>` and returns the audio linkage per
/// difficulty slot. A missing directory means the song shipped without
/// charts: every slot is `None`. A chart file that matches the naming
/// convention but cannot produce both directives fails the load.
pub fn scan_song_dir(
    charts_root: &Path,
    song_id: &str,
) -> Result<[Option<AudioRef>; 4], LoadError> {
    let dir = charts_root.join(song_id);
    let mut slots: [Option<AudioRef>; 4] = [None, None, None, None];
    if !dir.is_dir() {
        debug!("no chart directory for {}", song_id);
        return Ok(slots);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    files.sort();

    for (name, path) in files {
        let Some(caps) = CHART_FILE_RE.captures(&name) else {
            continue;
        };
        let index = caps[1]
            .parse::<usize>()
            .ok()
            .filter(|&i| i < slots.len())
            .ok_or_else(|| chart_err(&path, &format!("difficulty index {} out of range", &caps[1])))?;
        slots[index] = Some(scan_chart_file(&path)?);
    }

    Ok(slots)
}

/// Pulls the two directives out of one chart file. The first occurrence
/// of each wins and scanning stops once both are found.
fn scan_chart_file(path: &Path) -> Result<AudioRef, LoadError> {
    let content = fs::read_to_string(path)?;

    let mut audio_id: Option<String> = None;
    let mut offset: Option<String> = None;
    for line in content.lines() {
        if audio_id.is_none() && line.contains(AUDIO_DIRECTIVE) {
            let token = second_token(line)
                .ok_or_else(|| chart_err(path, "MUSIC_FILE_PATH line has no value token"))?;
            let raw = AUDIO_ID_RE.find(token).ok_or_else(|| {
                chart_err(path, &format!("no audio id in MUSIC_FILE_PATH token '{}'", token))
            })?;
            audio_id = Some(hyphenate_id(raw.as_str()));
        } else if offset.is_none() && line.contains(OFFSET_DIRECTIVE) {
            let token = second_token(line)
                .ok_or_else(|| chart_err(path, "OFFSET line has no value token"))?;
            offset = Some(token.to_string());
        }
        if audio_id.is_some() && offset.is_some() {
            break;
        }
    }

    match (audio_id, offset) {
        (Some(a), Some(o)) => Ok((a, o)),
        (None, None) => Err(chart_err(path, "neither MUSIC_FILE_PATH nor OFFSET present")),
        (Some(_), None) => Err(chart_err(path, "OFFSET directive missing")),
        (None, Some(_)) => Err(chart_err(path, "MUSIC_FILE_PATH directive missing")),
    }
}

fn second_token(line: &str) -> Option<&str> {
    line.split_whitespace().nth(1)
}

fn chart_err(path: &Path, reason: &str) -> LoadError {
    LoadError::ChartParse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
