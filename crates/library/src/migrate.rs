use common::{genre_slug, now_iso, track_slug, Genre, Track};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CatalogError;

/// Version stamped into every track document written by this crate.
/// Documents without a `schemaVersion` field are version 0.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schemaVersion";
const UNKNOWN_GENRE: &str = "unknown";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackDocumentV1 {
    #[allow(dead_code)]
    schema_version: u32,
    #[serde(flatten)]
    track: Track,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackDocumentRef<'a> {
    schema_version: u32,
    #[serde(flatten)]
    track: &'a Track,
}

impl<'a> TrackDocumentRef<'a> {
    pub(crate) fn current(track: &'a Track) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            track,
        }
    }
}

/// Shape written before documents were versioned: genres could be a single
/// `genreId`, and the audio reference lived in `filePath`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackDocumentV0 {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    album: Option<String>,
    genres: Option<Value>,
    genre_id: Option<Value>,
    slug: Option<String>,
    cover_image: Option<String>,
    audio_file: Option<String>,
    file_path: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenreEntry {
    Name(String),
    Record(Genre),
}

pub(crate) fn document_version(value: &Value) -> Result<u32, CatalogError> {
    if !value.is_object() {
        return Err(CatalogError::InvalidDocument(
            "track document is not an object".to_string(),
        ));
    }
    match value.get(SCHEMA_VERSION_KEY) {
        None | Some(Value::Null) => Ok(0),
        Some(raw) => {
            let found = raw.as_u64().ok_or_else(|| {
                CatalogError::InvalidDocument(format!("invalid {}: {}", SCHEMA_VERSION_KEY, raw))
            })?;
            if found > SCHEMA_VERSION as u64 {
                return Err(CatalogError::UnsupportedVersion {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
            Ok(found as u32)
        }
    }
}

/// Brings a raw track document up to the current schema. `fallback_id` is
/// the file stem, used when a legacy document lacks its own id.
pub(crate) fn migrate_track(value: Value, fallback_id: &str) -> Result<Track, CatalogError> {
    match document_version(&value)? {
        0 => {
            let legacy: TrackDocumentV0 = serde_json::from_value(value)?;
            Ok(track_from_v0(legacy, fallback_id))
        }
        _ => {
            let doc: TrackDocumentV1 = serde_json::from_value(value)?;
            Ok(doc.track)
        }
    }
}

fn track_from_v0(doc: TrackDocumentV0, fallback_id: &str) -> Track {
    let genres = match doc.genres {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => vec![doc
            .genre_id
            .as_ref()
            .and_then(value_as_label)
            .unwrap_or_else(|| UNKNOWN_GENRE.to_string())],
    };
    let audio_file = doc
        .audio_file
        .filter(|value| !value.is_empty())
        .or(doc.file_path.filter(|value| !value.is_empty()));
    let slug = doc
        .slug
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| track_slug(&doc.artist, &doc.title));
    let created_at = doc.created_at.unwrap_or_default();
    let updated_at = doc.updated_at.unwrap_or_else(|| created_at.clone());

    Track {
        id: doc
            .id
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| fallback_id.to_string()),
        title: doc.title,
        artist: doc.artist,
        album: doc.album,
        genres,
        slug,
        cover_image: doc.cover_image,
        audio_file,
        created_at,
        updated_at,
    }
}

fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn migrate_genres(value: Value) -> Result<(Vec<Genre>, bool), CatalogError> {
    let entries: Vec<GenreEntry> = serde_json::from_value(value)?;
    let loaded_at = now_iso();
    let mut legacy = false;
    let genres = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            GenreEntry::Record(genre) => genre,
            GenreEntry::Name(name) => {
                legacy = true;
                Genre {
                    id: (index + 1).to_string(),
                    slug: genre_slug(&name),
                    name,
                    created_at: loaded_at.clone(),
                    updated_at: loaded_at.clone(),
                }
            }
        })
        .collect();
    Ok((genres, legacy))
}
