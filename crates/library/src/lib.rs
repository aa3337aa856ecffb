mod migrate;

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use common::{is_safe_id, now_iso, now_millis, Genre, Track};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use migrate::{document_version, migrate_genres, migrate_track, TrackDocumentRef};
pub use migrate::SCHEMA_VERSION;

const TRACKS_DIR: &str = "tracks";
const GENRES_FILE: &str = "genres.json";
const DOCUMENT_EXT: &str = "json";

const DEFAULT_GENRES: &[&str] = &[
    "Rock",
    "Pop",
    "Hip Hop",
    "Jazz",
    "Classical",
    "Electronic",
    "R&B",
    "Country",
    "Folk",
    "Reggae",
    "Metal",
    "Blues",
    "Indie",
];

#[derive(Clone, Debug)]
pub struct Catalog {
    root: PathBuf,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MigrationReport {
    pub tracks_migrated: usize,
    pub tracks_current: usize,
    pub tracks_failed: usize,
    pub genres_migrated: bool,
}

impl Catalog {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let catalog = Self { root: root.into() };
        fs::create_dir_all(catalog.tracks_dir())?;
        let genres_path = catalog.genres_path();
        if !genres_path.exists() {
            let created_at = now_iso();
            let genres: Vec<Genre> = DEFAULT_GENRES
                .iter()
                .enumerate()
                .map(|(index, name)| Genre {
                    id: (index + 1).to_string(),
                    name: name.to_string(),
                    slug: common::genre_slug(name),
                    created_at: created_at.clone(),
                    updated_at: created_at.clone(),
                })
                .collect();
            catalog.save_genres(&genres)?;
            info!("Seeded {} genres at {:?}", genres.len(), genres_path);
        }
        Ok(catalog)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
        let mut tracks = Vec::new();
        for path in self.track_files()? {
            match read_track_file(&path) {
                Ok(track) => tracks.push(track),
                Err(err) => warn!("Skipping unreadable track {:?}: {}", path, err),
            }
        }
        Ok(tracks)
    }

    pub fn get_track(&self, id: &str) -> Result<Option<Track>, CatalogError> {
        if !is_safe_id(id) {
            return Ok(None);
        }
        let path = self.track_path(id);
        match fs::metadata(&path) {
            Ok(meta) if meta.len() == 0 => Ok(None),
            Ok(_) => read_track_file(&path).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn find_track_by_slug(&self, slug: &str) -> Result<Option<Track>, CatalogError> {
        Ok(self
            .list_tracks()?
            .into_iter()
            .find(|track| track.slug == slug))
    }

    pub fn save_track(&self, track: &Track) -> Result<(), CatalogError> {
        if !is_safe_id(&track.id) {
            return Err(CatalogError::InvalidDocument(format!(
                "invalid track id: {}",
                track.id
            )));
        }
        write_json(&self.track_path(&track.id), &TrackDocumentRef::current(track))
    }

    pub fn delete_track(&self, id: &str) -> Result<bool, CatalogError> {
        if !is_safe_id(id) {
            return Ok(false);
        }
        match fs::remove_file(self.track_path(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Claims a millisecond timestamp id, bumped past any id already on
    /// disk, by creating an empty placeholder document. The placeholder is
    /// invisible to reads until `save_track` fills it; `delete_track`
    /// releases it.
    pub fn reserve_track_id(&self) -> Result<String, CatalogError> {
        fs::create_dir_all(self.tracks_dir())?;
        let mut candidate = now_millis();
        loop {
            let id = candidate.to_string();
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.track_path(&id))
            {
                Ok(_) => return Ok(id),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => candidate += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn list_genres(&self) -> Result<Vec<Genre>, CatalogError> {
        let path = self.genres_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)?;
        let (genres, _) = migrate_genres(serde_json::from_str(&contents)?)?;
        Ok(genres)
    }

    pub fn save_genres(&self, genres: &[Genre]) -> Result<(), CatalogError> {
        write_json(&self.genres_path(), &genres)
    }

    pub fn migrate_all(&self) -> Result<MigrationReport, CatalogError> {
        let mut report = MigrationReport::default();
        for path in self.track_files()? {
            match migrate_track_file(&path) {
                Ok(true) => report.tracks_migrated += 1,
                Ok(false) => report.tracks_current += 1,
                Err(err) => {
                    warn!("Failed to migrate {:?}: {}", path, err);
                    report.tracks_failed += 1;
                }
            }
        }

        let genres_path = self.genres_path();
        if genres_path.exists() {
            let contents = fs::read_to_string(&genres_path)?;
            let (genres, legacy) = migrate_genres(serde_json::from_str(&contents)?)?;
            if legacy {
                self.save_genres(&genres)?;
                report.genres_migrated = true;
            }
        }
        Ok(report)
    }

    fn tracks_dir(&self) -> PathBuf {
        self.root.join(TRACKS_DIR)
    }

    fn track_path(&self, id: &str) -> PathBuf {
        self.tracks_dir().join(format!("{}.{}", id, DOCUMENT_EXT))
    }

    fn genres_path(&self) -> PathBuf {
        self.root.join(GENRES_FILE)
    }

    fn track_files(&self) -> Result<Vec<PathBuf>, CatalogError> {
        let dir = self.tracks_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXT)
            {
                continue;
            }
            // reserved id, not yet written
            if entry.metadata()?.len() == 0 {
                continue;
            }
            files.push(path.to_path_buf());
        }
        Ok(files)
    }
}

fn read_track_file(path: &Path) -> Result<Track, CatalogError> {
    let contents = fs::read_to_string(path)?;
    decode_track(path, serde_json::from_str(&contents)?)
}

// The file stem is the track id; a differing id inside a legacy document
// is overridden so lookups, updates and deletes all address the same file.
fn decode_track(path: &Path, value: serde_json::Value) -> Result<Track, CatalogError> {
    let stem = file_stem(path);
    let mut track = migrate_track(value, &stem)?;
    if track.id != stem {
        warn!(
            "Track {:?} declares id {}; using its file name",
            path, track.id
        );
        track.id = stem;
    }
    Ok(track)
}

fn migrate_track_file(path: &Path) -> Result<bool, CatalogError> {
    let contents = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    if document_version(&value)? == SCHEMA_VERSION {
        return Ok(false);
    }
    let track = decode_track(path, value)?;
    write_json(path, &TrackDocumentRef::current(&track))?;
    debug!("Migrated {:?} to schema version {}", path, SCHEMA_VERSION);
    Ok(true)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Walk(walkdir::Error),
    Json(serde_json::Error),
    UnsupportedVersion { found: u64, supported: u32 },
    InvalidDocument(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "io error: {}", err),
            CatalogError::Walk(err) => write!(f, "directory scan error: {}", err),
            CatalogError::Json(err) => write!(f, "json error: {}", err),
            CatalogError::UnsupportedVersion { found, supported } => write!(
                f,
                "document schema version {} is newer than supported version {}",
                found, supported
            ),
            CatalogError::InvalidDocument(message) => write!(f, "invalid document: {}", message),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Walk(err) => Some(err),
            CatalogError::Json(err) => Some(err),
            CatalogError::UnsupportedVersion { .. } | CatalogError::InvalidDocument(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<walkdir::Error> for CatalogError {
    fn from(err: walkdir::Error) -> Self {
        CatalogError::Walk(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Json(err)
    }
}
