use configparser::ini::Ini;
use log::{info, warn};
use std::path::{Path, PathBuf};

const SETTINGS_PATH: &str = "mertool.ini";
const DEFAULT_WORKING_PATH: &str = "data";
const DEFAULT_CUE_SHEET_PATH: &str = "assets/awb.csv";

// --- Settings ---

/// User-editable paths, read from `mertool.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Root of the extracted game dump.
    pub working_path: PathBuf,
    /// The bundled numeric-id-to-cue table.
    pub cue_sheet_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            working_path: PathBuf::from(DEFAULT_WORKING_PATH),
            cue_sheet_path: PathBuf::from(DEFAULT_CUE_SHEET_PATH),
        }
    }
}

/// Creates the default settings file if it doesn't exist.
fn create_default_file(path: &Path) -> Result<(), std::io::Error> {
    info!("Settings file not found, creating defaults at '{}'.", path.display());
    let defaults = Settings::default();

    let mut conf = Ini::new();
    conf.set(
        "paths",
        "WorkingPath",
        Some(defaults.working_path.display().to_string()),
    );
    conf.set(
        "paths",
        "CueSheet",
        Some(defaults.cue_sheet_path.display().to_string()),
    );
    conf.write(path)?;

    Ok(())
}

pub fn load() -> Settings {
    load_from(Path::new(SETTINGS_PATH))
}

pub fn load_from(path: &Path) -> Settings {
    let defaults = Settings::default();

    if !path.exists() {
        if let Err(e) = create_default_file(path) {
            warn!("Failed to create default settings file: {}", e);
        }
        return defaults;
    }

    let mut conf = Ini::new();
    if conf.load(path).is_err() {
        warn!("Failed to load '{}', using default paths.", path.display());
        return defaults;
    }

    Settings {
        working_path: conf
            .get("paths", "WorkingPath")
            .map(PathBuf::from)
            .unwrap_or(defaults.working_path),
        cue_sheet_path: conf
            .get("paths", "CueSheet")
            .map(PathBuf::from)
            .unwrap_or(defaults.cue_sheet_path),
    }
}

// --- Library layout ---

/// Directory layout of one extracted dump. The conventional subpaths all
/// hang off the working path the way the game stores them.
#[derive(Debug, Clone)]
pub struct Library {
    pub working_path: PathBuf,
    pub cue_sheet: PathBuf,
}

impl Library {
    pub fn new(settings: &Settings) -> Self {
        Library {
            working_path: settings.working_path.clone(),
            cue_sheet: settings.cue_sheet_path.clone(),
        }
    }

    pub fn metadata_json(&self) -> PathBuf {
        self.working_path.join("metadata.json")
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.working_path.join("MusicData")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.working_path.join("MER_BGM")
    }

    pub fn jackets_dir(&self) -> PathBuf {
        self.working_path.join("jackets")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.working_path.join("movies")
    }

    /// Library rooted at `root` with the cue sheet beside it; test
    /// fixtures build dumps this way.
    #[cfg(test)]
    pub fn at(root: &Path) -> Self {
        Library {
            working_path: root.to_path_buf(),
            cue_sheet: root.join("awb.csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_defaults_and_reads_them_back() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("mertool.ini");

        let first = load_from(&ini);
        assert_eq!(first, Settings::default());
        assert!(ini.exists());

        let second = load_from(&ini);
        assert_eq!(second, first);
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("mertool.ini");
        std::fs::write(
            &ini,
            "[paths]\nWorkingPath=/dumps/reverse\nCueSheet=/dumps/awb.csv\n",
        )
        .unwrap();

        let settings = load_from(&ini);
        assert_eq!(settings.working_path, PathBuf::from("/dumps/reverse"));
        assert_eq!(settings.cue_sheet_path, PathBuf::from("/dumps/awb.csv"));
    }

    #[test]
    fn library_layout_follows_the_dump_conventions() {
        let settings = Settings {
            working_path: PathBuf::from("/dumps/reverse"),
            cue_sheet_path: PathBuf::from("awb.csv"),
        };
        let library = Library::new(&settings);
        assert_eq!(library.charts_dir(), PathBuf::from("/dumps/reverse/MusicData"));
        assert_eq!(library.audio_dir(), PathBuf::from("/dumps/reverse/MER_BGM"));
        assert_eq!(library.videos_dir(), PathBuf::from("/dumps/reverse/movies"));
    }
}
