use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::parsing::LoadError;

/// Ids containing this marker are internal/test songs, not content.
const SYSTEM_SONG_MARKER: &str = "S99";

/// Values the table writes where it means "nothing here".
const PLACEHOLDER_VALUES: [&str; 2] = ["", "-"];

// --- Wire format ---
// The export is one JSON object: Exports[0].Table.Data is the list of
// song entries, each entry a bag of {Name, Value} properties.

#[derive(Deserialize, Debug)]
struct ParameterFile {
    #[serde(rename = "Exports")]
    exports: Vec<Export>,
}

#[derive(Deserialize, Debug)]
struct Export {
    #[serde(rename = "Table")]
    table: Table,
}

#[derive(Deserialize, Debug)]
struct Table {
    #[serde(rename = "Data")]
    data: Vec<Entry>,
}

#[derive(Deserialize, Debug)]
struct Entry {
    #[serde(rename = "Value")]
    value: Vec<Property>,
}

#[derive(Deserialize, Debug)]
struct Property {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: serde_json::Value,
}

impl Property {
    /// The table serializes most fields as text, but some dumps export
    /// numerics as JSON numbers; accept both. Null reads as empty.
    fn text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// --- Raw records ---

/// One parameter-table entry before charts and assets are joined in.
/// Per-difficulty arrays index by tier order: Normal, Hard, Expert,
/// Inferno.
#[derive(Debug, Clone, Default)]
pub struct RawSong {
    pub id: Option<String>,
    pub genre: Option<u32>,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub rubi: Option<String>,
    pub tempo: Option<String>,
    pub copyright: Option<String>,
    pub version: Option<u32>,
    pub jacket_asset: Option<String>,
    pub preview_time: Option<f64>,
    pub preview_duration: Option<f64>,
    pub levels: [Option<f64>; 4],
    pub clear_requirements: [Option<f64>; 4],
    pub designers: [Option<String>; 4],
    pub movie_assets: [Option<String>; 4],
}

impl RawSong {
    /// Field dispatch for one `{Name, Value}` property. Unrecognized
    /// names fall through the final arm.
    fn apply(&mut self, prop: &Property) -> Result<(), LoadError> {
        let text = prop.text();
        match prop.name.as_str() {
            "AssetDirectory" => self.id = Some(text),
            // SongInfo
            "ScoreGenre" => self.genre = Some(parse_int(&prop.name, &text)?),
            "MusicMessage" => self.name = Some(text),
            "ArtistMessage" => self.artist = Some(text),
            "Rubi" => self.rubi = Some(text),
            "Bpm" => self.tempo = Some(text),
            "CopyrightMessage" => self.copyright = non_placeholder(text),
            "VersionNo" => self.version = Some(parse_int(&prop.name, &text)?),
            "JacketAssetName" => self.jacket_asset = Some(text),
            // ChartInfo levels; "+0" parses to 0 and means no chart
            "DifficultyNormalLv" => self.levels[0] = Some(parse_number(&prop.name, &text)?),
            "DifficultyHardLv" => self.levels[1] = Some(parse_number(&prop.name, &text)?),
            "DifficultyExtremeLv" => self.levels[2] = Some(parse_number(&prop.name, &text)?),
            "DifficultyInfernoLv" => self.levels[3] = Some(parse_number(&prop.name, &text)?),
            // Audio previews
            "PreviewBeginTime" => self.preview_time = Some(parse_number(&prop.name, &text)?),
            "PreviewSeconds" => self.preview_duration = Some(parse_number(&prop.name, &text)?),
            // Clear requirements
            "ClearNormaRateNormal" => {
                self.clear_requirements[0] = Some(parse_number(&prop.name, &text)?)
            }
            "ClearNormaRateHard" => {
                self.clear_requirements[1] = Some(parse_number(&prop.name, &text)?)
            }
            "ClearNormaRateExtreme" => {
                self.clear_requirements[2] = Some(parse_number(&prop.name, &text)?)
            }
            "ClearNormaRateInferno" => {
                self.clear_requirements[3] = Some(parse_number(&prop.name, &text)?)
            }
            // ChartInfo designers
            "NotesDesignerNormal" => self.designers[0] = Some(text),
            "NotesDesignerHard" => self.designers[1] = Some(text),
            "NotesDesignerExpert" => self.designers[2] = Some(text),
            "NotesDesignerInferno" => self.designers[3] = Some(text),
            // Video backgrounds
            "MovieAssetName" => self.movie_assets[0] = non_placeholder(text),
            "MovieAssetNameHard" => self.movie_assets[1] = non_placeholder(text),
            "MovieAssetNameExpert" => self.movie_assets[2] = non_placeholder(text),
            "MovieAssetNameInferno" => self.movie_assets[3] = non_placeholder(text),
            _ => {}
        }
        Ok(())
    }
}

fn non_placeholder(value: String) -> Option<String> {
    if PLACEHOLDER_VALUES.contains(&value.as_str()) {
        None
    } else {
        Some(value)
    }
}

/// Levels, clear rates and preview timings are kept to 2 decimals.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn parse_number(field: &str, text: &str) -> Result<f64, LoadError> {
    text.trim()
        .parse::<f64>()
        .map(round2)
        .map_err(|_| malformed(field, text))
}

fn parse_int(field: &str, text: &str) -> Result<u32, LoadError> {
    text.trim().parse::<u32>().map_err(|_| malformed(field, text))
}

fn malformed(field: &str, text: &str) -> LoadError {
    LoadError::MalformedRecord(format!("unparsable value '{}' for {}", text, field))
}

// --- Parsing ---

/// Reads the export table and produces one raw record per non-system
/// entry, in table order.
pub fn parse_file(path: &Path) -> Result<Vec<RawSong>, LoadError> {
    let bytes = fs::read(path)?;
    parse_bytes(&bytes)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<RawSong>, LoadError> {
    let file: ParameterFile = serde_json::from_slice(bytes)?;
    let export = file.exports.into_iter().next().ok_or_else(|| {
        LoadError::MalformedRecord("parameter table has no exports".to_string())
    })?;

    let mut songs = Vec::new();
    for entry in &export.table.data {
        let mut raw = RawSong::default();
        for prop in &entry.value {
            raw.apply(prop)?;
        }

        let Some(id) = &raw.id else {
            return Err(LoadError::MalformedRecord(
                "entry has no AssetDirectory".to_string(),
            ));
        };
        if id.contains(SYSTEM_SONG_MARKER) {
            debug!("skipping system song {}", id);
            continue;
        }

        songs.push(raw);
    }
    Ok(songs)
}
