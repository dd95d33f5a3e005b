use image::imageops::FilterType;
use image::RgbaImage;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::parsing::cue::CueIndex;
use crate::parsing::LoadError;
use crate::progress::ProgressSink;
use crate::song::{SongMetadata, ALL_DIFFICULTIES};

/// Listing-layer thumbnails are square.
pub const PREVIEW_SIZE: u32 = 200;

// --- Jackets ---

/// Resolves a slash-delimited jacket asset path to a file on disk.
/// A directory under the jackets root wins, taking the
/// lexicographically first .png inside it; otherwise the path itself
/// with a .png extension is tried as a direct file.
pub fn resolve_jacket(jackets_root: &Path, asset_path: &str) -> Option<PathBuf> {
    let mut dir = jackets_root.to_path_buf();
    for segment in asset_path.split('/') {
        dir.push(segment);
    }

    if dir.is_dir() {
        let mut candidates: Vec<PathBuf> = fs::read_dir(&dir)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        candidates.sort();
        return candidates.into_iter().next();
    }

    let mut file = dir.into_os_string();
    file.push(".png");
    let file = PathBuf::from(file);
    if file.exists() { Some(file) } else { None }
}

// --- Background videos ---

/// Per-difficulty video resolution. A missing file warns through the
/// sink and nulls the slot.
pub fn resolve_videos(
    videos_root: &Path,
    song_id: &str,
    movie_assets: &[Option<String>; 4],
    progress: &mut dyn ProgressSink,
) -> [Option<PathBuf>; 4] {
    let mut resolved: [Option<PathBuf>; 4] = [None, None, None, None];
    for (i, asset) in movie_assets.iter().enumerate() {
        let Some(name) = asset else { continue };
        let path = videos_root.join(format!("{}.mp4", name));
        if path.exists() {
            resolved[i] = Some(path);
        } else {
            progress.log(&format!(
                "WARNING: Could not find video file for {} ({})!",
                song_id,
                ALL_DIFFICULTIES[i].name()
            ));
            progress.log(&format!("    {}", path.display()));
        }
    }
    resolved
}

/// Variant difficulties default to the base background when their own
/// video did not resolve.
pub fn apply_video_fallback(resolved: &mut [Option<PathBuf>; 4]) {
    let base = resolved[0].clone();
    if base.is_none() {
        return;
    }
    for slot in resolved.iter_mut().skip(1) {
        if slot.is_none() {
            *slot = base.clone();
        }
    }
}

// --- Audio files ---

/// Outcome of the audio path phase: the resolved id-to-file map plus
/// every .wav in the dump that no cue entry accounted for.
#[derive(Debug, Default)]
pub struct AudioFiles {
    pub by_id: BTreeMap<String, PathBuf>,
    pub orphans: Vec<PathBuf>,
}

/// Maps every cue entry to a file under the audio root. Banks store a
/// paired equalized take at `<cue + 1>.wav`; registering the primary
/// accounts for both. A file claimed by two ids warns and the later id
/// keeps it.
pub fn resolve_audio_files(
    audio_root: &Path,
    index: &CueIndex,
    progress: &mut dyn ProgressSink,
) -> Result<AudioFiles, LoadError> {
    // leftovers after matching point at holes in the cue table
    let mut untouched: BTreeSet<PathBuf> = BTreeSet::new();
    collect_wavs(audio_root, &mut untouched)?;

    let mut by_id: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut owner: BTreeMap<PathBuf, String> = BTreeMap::new();

    for (id, cue) in index {
        let Some(cue) = cue else {
            progress.log(&format!("WARNING: audio ID {} has no cue index!!", id));
            progress.log("    This audio ID will have no sound!");
            continue;
        };

        let bank = audio_root.join(&cue.bank);
        let primary = bank.join(format!("{}.wav", cue.cue));
        let paired = bank.join(format!("{}.wav", cue.cue + 1));

        if primary.exists() {
            if let Some(prev) = owner.insert(primary.clone(), id.clone()) {
                progress.log(&format!(
                    "WARNING: Duplicate audio file {}! Overwriting {} with {}",
                    primary.display(),
                    prev,
                    id
                ));
                by_id.remove(&prev);
            }
            untouched.remove(&primary);
            untouched.remove(&paired);
            by_id.insert(id.clone(), primary);
            progress.set_progress(by_id.len(), None);
        } else {
            progress.log(&format!(
                "WARNING: Could not find audio for {} ({})!",
                id,
                primary.display()
            ));
        }
    }

    progress.log(&format!(
        "Found {}/{} audio files.",
        by_id.len(),
        index.len()
    ));

    let orphans: Vec<PathBuf> = untouched.into_iter().collect();
    if !orphans.is_empty() {
        info!("{} files weren't added:", orphans.len());
        for file in &orphans {
            info!("  {}", file.display());
        }
    }

    Ok(AudioFiles { by_id, orphans })
}

fn collect_wavs(dir: &Path, out: &mut BTreeSet<PathBuf>) -> Result<(), LoadError> {
    if !dir.is_dir() {
        debug!("audio directory {:?} does not exist", dir);
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_wavs(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("wav")) {
            out.insert(path);
        }
    }
    Ok(())
}

// --- Jacket previews ---

/// Decodes every resolved jacket into a square thumbnail for the
/// listing layer. A jacket that resolved on disk but fails to decode
/// aborts the phase.
pub fn load_jacket_previews(
    songs: &BTreeMap<String, SongMetadata>,
    progress: &mut dyn ProgressSink,
) -> Result<BTreeMap<String, RgbaImage>, LoadError> {
    let mut previews = BTreeMap::new();
    progress.set_progress(0, Some(songs.len()));

    for (id, song) in songs {
        let Some(jacket) = &song.jacket else { continue };
        let img = image::open(jacket)?;
        previews.insert(
            id.clone(),
            img.resize_exact(PREVIEW_SIZE, PREVIEW_SIZE, FilterType::CatmullRom)
                .to_rgba8(),
        );
        progress.set_progress(previews.len(), None);
    }

    Ok(previews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::cue::AwbCue;
    use crate::progress::RecordingSink;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    // --- jackets ---

    #[test]
    fn jacket_directory_picks_the_lexicographically_first_png() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b").join("c");
        touch(&dir.join("02_large.png"));
        touch(&dir.join("01_small.png"));
        touch(&dir.join("00_notes.txt"));

        let resolved = resolve_jacket(tmp.path(), "a/b/c").unwrap();
        assert_eq!(resolved, dir.join("01_small.png"));
    }

    #[test]
    fn jacket_falls_back_to_a_direct_png_file() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a").join("b").join("c.png"));

        let resolved = resolve_jacket(tmp.path(), "a/b/c").unwrap();
        assert_eq!(resolved, tmp.path().join("a/b/c.png"));
    }

    #[test]
    fn jacket_with_no_directory_and_no_file_is_unresolved() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve_jacket(tmp.path(), "a/b/c"), None);
    }

    #[test]
    fn jacket_directory_without_pngs_is_unresolved() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a").join("b").join("c").join("readme.txt"));
        assert_eq!(resolve_jacket(tmp.path(), "a/b/c"), None);
    }

    // --- videos ---

    #[test]
    fn videos_resolve_per_difficulty_and_warn_when_missing() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("MOV001.mp4"));

        let assets = [
            Some("MOV001".to_string()),
            Some("MOV404".to_string()),
            None,
            None,
        ];
        let mut sink = RecordingSink::new();
        let resolved = resolve_videos(tmp.path(), "S01-001", &assets, &mut sink);

        assert_eq!(resolved[0], Some(tmp.path().join("MOV001.mp4")));
        assert_eq!(resolved[1], None);
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn unresolved_variant_slots_inherit_the_base_video() {
        let base = PathBuf::from("/movies/MOV001.mp4");
        let expert = PathBuf::from("/movies/MOV002.mp4");
        let mut resolved = [Some(base.clone()), None, Some(expert.clone()), None];
        apply_video_fallback(&mut resolved);

        assert_eq!(resolved[1], Some(base.clone()));
        assert_eq!(resolved[2], Some(expert));
        assert_eq!(resolved[3], Some(base));
    }

    #[test]
    fn fallback_does_nothing_without_a_base_video() {
        let mut resolved = [None, Some(PathBuf::from("/movies/MOV002.mp4")), None, None];
        apply_video_fallback(&mut resolved);
        assert_eq!(resolved[0], None);
        assert_eq!(resolved[3], None);
    }

    // --- audio ---

    fn cue(bank: &str, cue: u32) -> Option<AwbCue> {
        Some(AwbCue { bank: bank.to_string(), cue })
    }

    #[test]
    fn primary_and_paired_files_are_both_accounted_for() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("MER_BGM_V1").join("10.wav"));
        touch(&tmp.path().join("MER_BGM_V1").join("11.wav"));
        touch(&tmp.path().join("MER_BGM_V1").join("12.wav"));

        let mut index = CueIndex::new();
        index.insert("S01-001".to_string(), cue("MER_BGM_V1", 10));

        let mut sink = RecordingSink::new();
        let files = resolve_audio_files(tmp.path(), &index, &mut sink).unwrap();

        assert_eq!(
            files.by_id["S01-001"],
            tmp.path().join("MER_BGM_V1/10.wav")
        );
        // 10 exposed, 11 is its equalized pair; only 12 is orphaned
        assert_eq!(files.orphans, vec![tmp.path().join("MER_BGM_V1/12.wav")]);
    }

    #[test]
    fn missing_primary_file_warns_and_leaves_the_id_unmapped() {
        let tmp = TempDir::new().unwrap();
        let mut index = CueIndex::new();
        index.insert("S00-007".to_string(), cue("MER_BGM_V1", 10));

        let mut sink = RecordingSink::new();
        let files = resolve_audio_files(tmp.path(), &index, &mut sink).unwrap();

        assert!(files.by_id.is_empty());
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn absent_cue_mapping_warns_and_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let mut index = CueIndex::new();
        index.insert("S00-007".to_string(), None);

        let mut sink = RecordingSink::new();
        let files = resolve_audio_files(tmp.path(), &index, &mut sink).unwrap();

        assert!(files.by_id.is_empty());
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn duplicate_file_claims_warn_once_and_the_later_id_wins() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("MER_BGM_V2").join("40.wav"));
        touch(&tmp.path().join("MER_BGM_V2").join("41.wav"));

        let mut index = CueIndex::new();
        index.insert("S01-001".to_string(), cue("MER_BGM_V2", 40));
        index.insert("S03-014".to_string(), cue("MER_BGM_V2", 40));

        let mut sink = RecordingSink::new();
        let files = resolve_audio_files(tmp.path(), &index, &mut sink).unwrap();

        let duplicates: Vec<_> = sink
            .warnings()
            .into_iter()
            .filter(|m| m.contains("Duplicate"))
            .collect();
        assert_eq!(duplicates.len(), 1);
        // ascending id order: S03-014 is processed later and keeps the file
        assert_eq!(
            files.by_id.get("S03-014"),
            Some(&tmp.path().join("MER_BGM_V2/40.wav"))
        );
        assert_eq!(files.by_id.get("S01-001"), None);
    }

    // --- previews ---

    #[test]
    fn previews_decode_resolved_jackets_only() {
        let tmp = TempDir::new().unwrap();
        let jacket = tmp.path().join("S01-001.png");
        RgbaImage::new(4, 4).save(&jacket).unwrap();

        let mut songs = BTreeMap::new();
        songs.insert("S01-001".to_string(), song_with_jacket("S01-001", Some(jacket)));
        songs.insert("S01-002".to_string(), song_with_jacket("S01-002", None));

        let mut sink = RecordingSink::new();
        let previews = load_jacket_previews(&songs, &mut sink).unwrap();

        assert_eq!(previews.len(), 1);
        let preview = &previews["S01-001"];
        assert_eq!((preview.width(), preview.height()), (PREVIEW_SIZE, PREVIEW_SIZE));
    }

    fn song_with_jacket(id: &str, jacket: Option<PathBuf>) -> SongMetadata {
        SongMetadata {
            id: id.to_string(),
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            rubi: None,
            genre_id: 0,
            copyright: None,
            tempo: "120".to_string(),
            version: None,
            jacket,
            difficulties: [None, None, None, None],
        }
    }
}
