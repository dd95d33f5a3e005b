use log::{error, info, LevelFilter};
use std::error::Error;

mod assets;
mod config;
mod database;
mod parsing;
mod progress;
mod song;

use crate::config::Library;
use crate::database::SongDb;
use crate::progress::LogSink;
use crate::song::{game_title, genre_name, SongMetadata, ALL_DIFFICULTIES};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("mertool::parsing", LevelFilter::Debug)
        .filter_module("mertool::database", LevelFilter::Debug)
        .init();

    let settings = config::load();
    let library = Library::new(&settings);
    info!("Loading song database from {}", library.working_path.display());

    let mut sink = LogSink;
    let songs = match database::load_songs(&library, &mut sink) {
        Ok(songs) => songs,
        Err(e) => {
            error!("Song metadata load failed: {}", e);
            return Err(Box::new(e));
        }
    };
    let audio = database::load_audio(&library, &mut sink)?;
    let previews = database::load_jacket_previews(&songs, &mut sink)?;

    let db = SongDb::assemble(songs, audio, previews);
    print_report(&db);

    Ok(())
}

fn print_report(db: &SongDb) {
    println!();
    println!("{} songs", db.len());
    for song in db.songs() {
        let game = song.version.map(game_title).unwrap_or("Unknown");
        println!(
            "{}  {} - {} [{}] ({})",
            song.id,
            song.name,
            song.artist,
            genre_name(song.genre_id),
            game
        );
        let audio = match db.audio_file(&song.id) {
            Some(path) => path.display().to_string(),
            None => match db.cue(&song.id) {
                Some(cue) => format!("missing ({}/{}.wav)", cue.bank, cue.cue),
                None => "no cue".to_string(),
            },
        };
        println!(
            "    levels: {}   charts: {}   audio: {}",
            format_levels(song),
            song.chart_count(),
            audio
        );
    }

    if !db.missing_audio().is_empty() {
        println!();
        println!("Missing audio: {}", db.missing_audio().join(", "));
    }
    if !db.missing_jackets().is_empty() {
        println!();
        println!("Missing jackets: {}", db.missing_jackets().join(", "));
    }
    if !db.orphan_audio().is_empty() {
        println!();
        println!("{} audio files not referenced by any cue.", db.orphan_audio().len());
    }
}

fn format_levels(song: &SongMetadata) -> String {
    ALL_DIFFICULTIES
        .iter()
        .map(|tier| match song.difficulty(*tier) {
            Some(slot) => match slot.level {
                Some(level) => format!("{}", level),
                None => "?".to_string(),
            },
            None => "-".to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
