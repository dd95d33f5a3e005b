use image::RgbaImage;
use log::info;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::assets;
use crate::config::Library;
use crate::parsing::chart;
use crate::parsing::cue::{self, AwbCue, CueIndex};
use crate::parsing::param_table::{self, RawSong};
use crate::parsing::LoadError;
use crate::progress::{ProgressSink, TaskState};
use crate::song::{DifficultyInfo, SongMetadata};

// --- Load phases ---
// Each phase builds a scratch value and returns it; nothing partial is
// ever observable. The caller assembles the phase outputs into a new
// SongDb generation and swaps it in atomically.

/// Song metadata phase: parameter table, chart linkage, jacket and
/// video resolution.
pub fn load_songs(
    library: &Library,
    progress: &mut dyn ProgressSink,
) -> Result<BTreeMap<String, SongMetadata>, LoadError> {
    progress.set_status(TaskState::Running);
    match build_songs(library, progress) {
        Ok(songs) => {
            progress.set_progress(100, None);
            progress.set_status(TaskState::Complete);
            progress.log(&format!("Found {} songs.", songs.len()));
            progress.log("  NOTE: Metadata covers videos and charts as well!");
            Ok(songs)
        }
        Err(e) => {
            progress.log("FATAL: Error occurred!");
            progress.set_status(TaskState::Error);
            Err(e)
        }
    }
}

fn build_songs(
    library: &Library,
    progress: &mut dyn ProgressSink,
) -> Result<BTreeMap<String, SongMetadata>, LoadError> {
    let metadata_path = library.metadata_json();
    info!(
        "Initializing charts metadata from {}...",
        metadata_path.display()
    );

    let mut songs = BTreeMap::new();
    for raw in param_table::parse_file(&metadata_path)? {
        let song = build_song(library, raw, progress)?;
        songs.insert(song.id.clone(), song);
    }
    Ok(songs)
}

fn build_song(
    library: &Library,
    raw: RawSong,
    progress: &mut dyn ProgressSink,
) -> Result<SongMetadata, LoadError> {
    let RawSong {
        id,
        genre,
        name,
        artist,
        rubi,
        tempo,
        copyright,
        version,
        jacket_asset,
        preview_time,
        preview_duration,
        levels,
        clear_requirements,
        designers,
        movie_assets,
    } = raw;

    let id = id.ok_or_else(|| {
        LoadError::MalformedRecord("entry has no AssetDirectory".to_string())
    })?;
    let name = name.ok_or_else(|| missing_field(&id, "MusicMessage"))?;
    let artist = artist.ok_or_else(|| missing_field(&id, "ArtistMessage"))?;
    let tempo = tempo.ok_or_else(|| missing_field(&id, "Bpm"))?;
    let genre_id = genre.ok_or_else(|| missing_field(&id, "ScoreGenre"))?;

    let mut videos =
        assets::resolve_videos(&library.videos_dir(), &id, &movie_assets, progress);
    assets::apply_video_fallback(&mut videos);

    let audio_refs = chart::scan_song_dir(&library.charts_dir(), &id)?;

    let mut difficulties: [Option<DifficultyInfo>; 4] = [None, None, None, None];
    for (i, linkage) in audio_refs.into_iter().enumerate() {
        // slots without a chart stay empty even when the table lists a
        // level for them
        let Some((audio_id, audio_offset)) = linkage else {
            continue;
        };
        difficulties[i] = Some(DifficultyInfo {
            audio_id,
            audio_offset,
            audio_preview_time: preview_time,
            audio_preview_duration: preview_duration,
            video: videos[i].clone(),
            designer: designers[i].clone(),
            clear_requirement: clear_requirements[i],
            level: levels[i],
        });
    }

    let jacket = jacket_asset
        .as_deref()
        .and_then(|asset| assets::resolve_jacket(&library.jackets_dir(), asset));
    if jacket.is_none() {
        progress.log(&format!("WARNING: Could not find jacket for {}!", id));
    }

    Ok(SongMetadata {
        id,
        name,
        artist,
        rubi,
        genre_id,
        copyright,
        tempo,
        version,
        jacket,
        difficulties,
    })
}

fn missing_field(id: &str, field: &str) -> LoadError {
    LoadError::MalformedRecord(format!("{}: missing {}", id, field))
}

/// Cue index plus resolved audio paths, built by the audio phase.
#[derive(Debug, Default)]
pub struct AudioCatalog {
    pub index: CueIndex,
    pub files: BTreeMap<String, PathBuf>,
    pub orphans: Vec<PathBuf>,
}

/// Audio phase: cue sheet to cue index, cue index to files on disk.
pub fn load_audio(
    library: &Library,
    progress: &mut dyn ProgressSink,
) -> Result<AudioCatalog, LoadError> {
    progress.set_status(TaskState::Running);
    match build_audio(library, progress) {
        Ok(catalog) => {
            let state = if catalog.files.len() < catalog.index.len() {
                TaskState::Alert
            } else {
                TaskState::Complete
            };
            progress.set_progress(catalog.files.len(), None);
            progress.set_status(state);
            Ok(catalog)
        }
        Err(e) => {
            progress.log("FATAL: Error occurred!");
            progress.set_status(TaskState::Error);
            Err(e)
        }
    }
}

fn build_audio(
    library: &Library,
    progress: &mut dyn ProgressSink,
) -> Result<AudioCatalog, LoadError> {
    info!("Creating audio index from {}...", library.cue_sheet.display());
    let index = cue::parse_file(&library.cue_sheet)?;
    progress.log(&format!("Found {} audio indices.", index.len()));
    progress.set_progress(0, Some(index.len()));

    let audio_dir = library.audio_dir();
    info!("Finding audio in {}...", audio_dir.display());
    let resolved = assets::resolve_audio_files(&audio_dir, &index, progress)?;

    Ok(AudioCatalog {
        index,
        files: resolved.by_id,
        orphans: resolved.orphans,
    })
}

/// Jacket preview phase: decode every resolved jacket into a listing
/// thumbnail.
pub fn load_jacket_previews(
    songs: &BTreeMap<String, SongMetadata>,
    progress: &mut dyn ProgressSink,
) -> Result<BTreeMap<String, RgbaImage>, LoadError> {
    progress.set_status(TaskState::Running);
    match assets::load_jacket_previews(songs, progress) {
        Ok(previews) => {
            progress.log(&format!(
                "Found {}/{} jackets.",
                previews.len(),
                songs.len()
            ));
            let state = if previews.len() < songs.len() {
                TaskState::Alert
            } else {
                TaskState::Complete
            };
            progress.set_status(state);
            Ok(previews)
        }
        Err(e) => {
            progress.log("FATAL: Error occurred!");
            progress.set_status(TaskState::Error);
            Err(e)
        }
    }
}

// --- Assembled database ---

/// One fully-built generation of the catalog. Callers hold it read-only
/// and swap the whole value on the next load; a failed load leaves the
/// previous generation untouched.
#[derive(Debug, Default)]
pub struct SongDb {
    songs: BTreeMap<String, SongMetadata>,
    audio_index: CueIndex,
    audio_files: BTreeMap<String, PathBuf>,
    jacket_previews: BTreeMap<String, RgbaImage>,
    orphan_audio: Vec<PathBuf>,
    missing_audio: Vec<String>,
    missing_jackets: Vec<String>,
}

impl SongDb {
    pub fn assemble(
        songs: BTreeMap<String, SongMetadata>,
        audio: AudioCatalog,
        jacket_previews: BTreeMap<String, RgbaImage>,
    ) -> Self {
        let missing_audio = songs
            .keys()
            .filter(|id| !audio.files.contains_key(*id))
            .cloned()
            .collect();
        let missing_jackets = songs
            .values()
            .filter(|song| song.jacket.is_none())
            .map(|song| song.id.clone())
            .collect();

        SongDb {
            songs,
            audio_index: audio.index,
            audio_files: audio.files,
            jacket_previews,
            orphan_audio: audio.orphans,
            missing_audio,
            missing_jackets,
        }
    }

    pub fn get(&self, id: &str) -> Option<&SongMetadata> {
        self.songs.get(id)
    }

    pub fn songs(&self) -> impl Iterator<Item = &SongMetadata> {
        self.songs.values()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn cue(&self, id: &str) -> Option<&AwbCue> {
        self.audio_index.get(id).and_then(|cue| cue.as_ref())
    }

    pub fn audio_file(&self, id: &str) -> Option<&Path> {
        self.audio_files.get(id).map(PathBuf::as_path)
    }

    pub fn jacket_preview(&self, id: &str) -> Option<&RgbaImage> {
        self.jacket_previews.get(id)
    }

    pub fn orphan_audio(&self) -> &[PathBuf] {
        &self.orphan_audio
    }

    pub fn missing_audio(&self) -> &[String] {
        &self.missing_audio
    }

    pub fn missing_jackets(&self) -> &[String] {
        &self.missing_jackets
    }
}
