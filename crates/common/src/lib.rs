use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Track {
    pub fn has_audio(&self) -> bool {
        self.audio_file
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn refresh_slug(&mut self) {
        self.slug = track_slug(&self.artist, &self.title);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
}

impl From<&Track> for ActiveTrack {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            audio_file: track.audio_file.clone(),
        }
    }
}

pub fn track_slug(artist: &str, title: &str) -> String {
    slugify(&format!("{} {}", artist, title))
}

/// Lowercases and collapses every run of non-alphanumeric characters into a
/// single `-`, without leading or trailing dashes.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Slug rule used for genres stored as bare names: one dash per rejected
/// character, no collapsing.
pub fn genre_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect()
}

/// Ids double as file stems, so anything that could escape the tracks
/// directory is rejected.
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

pub fn now_iso() -> String {
    format_iso(OffsetDateTime::now_utc())
}

pub fn format_iso(value: OffsetDateTime) -> String {
    let value = value.to_offset(time::UtcOffset::UTC);
    value
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> Track {
        Track {
            id: "1700000000000".to_string(),
            title: "Paranoid Android".to_string(),
            artist: "Radiohead".to_string(),
            album: None,
            genres: vec!["Rock".to_string()],
            slug: String::new(),
            cover_image: None,
            audio_file: None,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Radiohead Paranoid Android"), "radiohead-paranoid-android");
        assert_eq!(slugify("  AC/DC -- Back In Black! "), "ac-dc-back-in-black");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn track_slug_joins_artist_and_title() {
        assert_eq!(track_slug("Daft Punk", "One More Time"), "daft-punk-one-more-time");
    }

    #[test]
    fn genre_slug_replaces_each_character() {
        assert_eq!(genre_slug("Hip Hop"), "hip-hop");
        assert_eq!(genre_slug("R&B"), "r-b");
        assert_eq!(genre_slug("Drum & Bass"), "drum---bass");
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(is_safe_id("1700000000000"));
        assert!(is_safe_id("legacy_track-2"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("../genres"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a.json"));
    }

    #[test]
    fn formats_timestamps_with_millis() {
        let value = OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_000_000).unwrap();
        assert_eq!(format_iso(value), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn has_audio_ignores_blank_references() {
        let mut track = sample_track();
        assert!(!track.has_audio());
        track.audio_file = Some("   ".to_string());
        assert!(!track.has_audio());
        track.audio_file = Some("1_audio.mp3".to_string());
        assert!(track.has_audio());
    }

    #[test]
    fn serializes_camel_case_and_skips_empty_options() {
        let mut track = sample_track();
        track.refresh_slug();
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["slug"], "radiohead-paranoid-android");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00.000Z");
        assert!(json.get("album").is_none());
        assert!(json.get("audioFile").is_none());
    }
}
