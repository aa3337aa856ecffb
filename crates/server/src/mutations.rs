use async_graphql::{InputObject, MaybeUndefined, SimpleObject};
use common::{now_iso, track_slug, Track};
use library::Catalog;
use tracing::{info, warn};

use crate::error::{ServiceError, DELETE_FAILED, TRACK_NOT_FOUND};

const ID_FIELD: &str = "id";

#[derive(InputObject, Clone, Debug, Default)]
pub struct TrackCreateInput {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    #[graphql(default)]
    pub genres: Vec<String>,
    pub cover_image: Option<String>,
}

/// `album` and `coverImage` distinguish an omitted field (keep the stored
/// value) from an explicit `null` (clear it).
#[derive(InputObject, Clone, Debug, Default)]
pub struct TrackUpdateInput {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: MaybeUndefined<String>,
    pub genres: Option<Vec<String>>,
    pub cover_image: MaybeUndefined<String>,
}

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct BulkDeleteError {
    pub message: String,
    pub code: Option<String>,
    pub field: Option<String>,
}

#[derive(SimpleObject, Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkDeleteResponse {
    pub success: bool,
    pub success_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub errors: Vec<BulkDeleteError>,
}

pub fn create_track(catalog: &Catalog, input: TrackCreateInput) -> Result<Track, ServiceError> {
    if input.title.trim().is_empty() {
        return Err(ServiceError::Validation("title is required".to_string()));
    }
    if input.artist.trim().is_empty() {
        return Err(ServiceError::Validation("artist is required".to_string()));
    }

    let now = now_iso();
    let track = Track {
        id: catalog.reserve_track_id()?,
        slug: track_slug(&input.artist, &input.title),
        title: input.title,
        artist: input.artist,
        album: input.album,
        genres: input.genres,
        cover_image: input.cover_image,
        audio_file: None,
        created_at: now.clone(),
        updated_at: now,
    };
    if let Err(err) = catalog.save_track(&track) {
        if let Err(cleanup) = catalog.delete_track(&track.id) {
            warn!("Failed to release reserved id {}: {}", track.id, cleanup);
        }
        return Err(err.into());
    }
    info!("Created track {} ({})", track.id, track.slug);
    Ok(track)
}

pub fn update_track(
    catalog: &Catalog,
    id: &str,
    input: TrackUpdateInput,
) -> Result<Track, ServiceError> {
    let mut track = load_existing(catalog, id)?;
    let renamed = input.title.is_some() || input.artist.is_some();

    if let Some(title) = input.title {
        track.title = title;
    }
    if let Some(artist) = input.artist {
        track.artist = artist;
    }
    apply_nullable(&mut track.album, input.album);
    if let Some(genres) = input.genres {
        track.genres = genres;
    }
    apply_nullable(&mut track.cover_image, input.cover_image);
    if renamed {
        track.refresh_slug();
    }
    track.updated_at = now_iso();

    catalog.save_track(&track)?;
    Ok(track)
}

fn apply_nullable(target: &mut Option<String>, value: MaybeUndefined<String>) {
    match value {
        MaybeUndefined::Undefined => {}
        MaybeUndefined::Null => *target = None,
        MaybeUndefined::Value(value) => *target = Some(value),
    }
}

pub fn delete_track(catalog: &Catalog, id: &str) -> Result<bool, ServiceError> {
    if catalog.delete_track(id)? {
        info!("Deleted track {}", id);
        Ok(true)
    } else {
        Err(ServiceError::TrackNotFound(id.to_string()))
    }
}

/// Deletes every id it can; failures are reported per id and never stop
/// the batch.
pub fn delete_tracks(catalog: &Catalog, ids: &[String]) -> BulkDeleteResponse {
    let mut response = BulkDeleteResponse::default();

    for id in ids {
        let outcome = match catalog.get_track(id) {
            Ok(Some(_)) => catalog.delete_track(id),
            Ok(None) => Ok(false),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(true) => response.success_ids.push(id.clone()),
            Ok(false) => {
                response.failed_ids.push(id.clone());
                response.errors.push(BulkDeleteError {
                    message: ServiceError::TrackNotFound(id.clone()).to_string(),
                    code: Some(TRACK_NOT_FOUND.to_string()),
                    field: Some(ID_FIELD.to_string()),
                });
            }
            Err(err) => {
                warn!("Failed to delete track {}: {}", id, err);
                response.failed_ids.push(id.clone());
                response.errors.push(BulkDeleteError {
                    message: format!("Failed to delete track {}: {}", id, err),
                    code: Some(DELETE_FAILED.to_string()),
                    field: Some(ID_FIELD.to_string()),
                });
            }
        }
    }

    response.success = response.failed_ids.is_empty();
    info!(
        "Bulk delete: {} deleted, {} failed",
        response.success_ids.len(),
        response.failed_ids.len()
    );
    response
}

pub fn audio_file_name(id: &str) -> String {
    format!("{}_audio.mp3", id)
}

pub fn attach_audio(catalog: &Catalog, id: &str) -> Result<Track, ServiceError> {
    let mut track = load_existing(catalog, id)?;
    track.audio_file = Some(audio_file_name(id));
    track.updated_at = now_iso();
    catalog.save_track(&track)?;
    Ok(track)
}

pub fn detach_audio(catalog: &Catalog, id: &str) -> Result<Track, ServiceError> {
    let mut track = load_existing(catalog, id)?;
    track.audio_file = None;
    track.updated_at = now_iso();
    catalog.save_track(&track)?;
    Ok(track)
}

fn load_existing(catalog: &Catalog, id: &str) -> Result<Track, ServiceError> {
    catalog
        .get_track(id)?
        .ok_or_else(|| ServiceError::TrackNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path()).unwrap();
        (dir, catalog)
    }

    fn create(catalog: &Catalog, title: &str, artist: &str) -> Track {
        create_track(
            catalog,
            TrackCreateInput {
                title: title.to_string(),
                artist: artist.to_string(),
                album: Some("Discovery".to_string()),
                genres: vec!["Electronic".to_string()],
                cover_image: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn create_assigns_id_slug_and_timestamps() {
        let (_dir, catalog) = open();
        let track = create(&catalog, "One More Time", "Daft Punk");
        assert!(track.id.parse::<u64>().is_ok());
        assert_eq!(track.slug, "daft-punk-one-more-time");
        assert_eq!(track.created_at, track.updated_at);
        assert!(track.audio_file.is_none());
        assert_eq!(catalog.get_track(&track.id).unwrap(), Some(track));
    }

    #[test]
    fn create_rejects_blank_title() {
        let (_dir, catalog) = open();
        let err = create_track(
            &catalog,
            TrackCreateInput {
                title: "  ".to_string(),
                artist: "Someone".to_string(),
                ..TrackCreateInput::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(catalog.list_tracks().unwrap().is_empty());
    }

    #[test]
    fn back_to_back_creates_get_distinct_ids() {
        let (_dir, catalog) = open();
        let first = create(&catalog, "A", "X");
        let second = create(&catalog, "B", "X");
        assert_ne!(first.id, second.id);
        assert_eq!(catalog.list_tracks().unwrap().len(), 2);
    }

    #[test]
    fn parallel_creates_keep_every_track() {
        let (_dir, catalog) = open();
        let barrier = std::sync::Barrier::new(8);
        let created: Vec<Track> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let catalog = catalog.clone();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let mut tracks = Vec::new();
                        for round in 0..5 {
                            barrier.wait();
                            let title = format!("Take {}-{}", n, round);
                            tracks.push(create(&catalog, &title, "Daft Punk"));
                        }
                        tracks
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(created.len(), 40);
        let stored = catalog.list_tracks().unwrap();
        assert_eq!(stored.len(), 40);
        for track in &created {
            assert_eq!(catalog.get_track(&track.id).unwrap().as_ref(), Some(track));
        }
    }

    #[test]
    fn updating_album_keeps_slug() {
        let (_dir, catalog) = open();
        let track = create(&catalog, "Digital Love", "Daft Punk");
        let mut stored = track.clone();
        stored.slug = "custom-slug".to_string();
        catalog.save_track(&stored).unwrap();

        let updated = update_track(
            &catalog,
            &track.id,
            TrackUpdateInput {
                album: MaybeUndefined::Value("Alive 2007".to_string()),
                ..TrackUpdateInput::default()
            },
        )
        .unwrap();
        assert_eq!(updated.album.as_deref(), Some("Alive 2007"));
        assert_eq!(updated.slug, "custom-slug");
    }

    #[test]
    fn updating_title_or_artist_recomputes_slug() {
        let (_dir, catalog) = open();
        let track = create(&catalog, "Digital Love", "Daft Punk");

        let retitled = update_track(
            &catalog,
            &track.id,
            TrackUpdateInput {
                title: Some("Aerodynamic".to_string()),
                ..TrackUpdateInput::default()
            },
        )
        .unwrap();
        assert_eq!(retitled.slug, "daft-punk-aerodynamic");

        let reartisted = update_track(
            &catalog,
            &track.id,
            TrackUpdateInput {
                artist: Some("Thomas Bangalter".to_string()),
                ..TrackUpdateInput::default()
            },
        )
        .unwrap();
        assert_eq!(reartisted.slug, "thomas-bangalter-aerodynamic");
        assert_eq!(
            catalog.get_track(&track.id).unwrap().map(|t| t.slug),
            Some("thomas-bangalter-aerodynamic".to_string())
        );
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let (_dir, catalog) = open();
        let track = create(&catalog, "Voyager", "Daft Punk");
        let cleared = update_track(
            &catalog,
            &track.id,
            TrackUpdateInput {
                album: MaybeUndefined::Null,
                genres: Some(Vec::new()),
                ..TrackUpdateInput::default()
            },
        )
        .unwrap();
        assert!(cleared.album.is_none());
        assert!(cleared.genres.is_empty());
        assert_eq!(cleared.title, "Voyager");
    }

    #[test]
    fn update_missing_track_fails() {
        let (_dir, catalog) = open();
        let err = update_track(&catalog, "404", TrackUpdateInput::default()).unwrap_err();
        assert_eq!(err.to_string(), "Track with id 404 not found");
    }

    #[test]
    fn delete_missing_track_fails() {
        let (_dir, catalog) = open();
        let err = delete_track(&catalog, "404").unwrap_err();
        assert!(matches!(err, ServiceError::TrackNotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn delete_removes_track() {
        let (_dir, catalog) = open();
        let track = create(&catalog, "Crescendolls", "Daft Punk");
        assert!(delete_track(&catalog, &track.id).unwrap());
        assert_eq!(catalog.get_track(&track.id).unwrap(), None);
    }

    #[test]
    fn bulk_delete_continues_past_missing_ids() {
        let (_dir, catalog) = open();
        let a = create(&catalog, "Nightvision", "Daft Punk");
        let b = create(&catalog, "Superheroes", "Daft Punk");
        let ids = vec![
            a.id.clone(),
            "missing-1".to_string(),
            b.id.clone(),
            "missing-2".to_string(),
        ];

        let response = delete_tracks(&catalog, &ids);
        assert!(!response.success);
        assert_eq!(response.success_ids, vec![a.id.clone(), b.id.clone()]);
        assert_eq!(
            response.failed_ids,
            vec!["missing-1".to_string(), "missing-2".to_string()]
        );
        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[0].code.as_deref(), Some(TRACK_NOT_FOUND));
        assert_eq!(response.errors[0].field.as_deref(), Some("id"));
        assert_eq!(response.errors[0].message, "Track with id missing-1 not found");
        assert!(catalog.list_tracks().unwrap().is_empty());
    }

    #[test]
    fn bulk_delete_of_valid_ids_succeeds() {
        let (_dir, catalog) = open();
        let a = create(&catalog, "Face to Face", "Daft Punk");
        let response = delete_tracks(&catalog, &[a.id.clone()]);
        assert!(response.success);
        assert!(response.errors.is_empty());
    }

    #[test]
    fn attach_and_detach_audio() {
        let (_dir, catalog) = open();
        let track = create(&catalog, "Too Long", "Daft Punk");
        let attached = attach_audio(&catalog, &track.id).unwrap();
        assert_eq!(
            attached.audio_file.as_deref(),
            Some(audio_file_name(&track.id).as_str())
        );
        assert!(attached.has_audio());

        let detached = detach_audio(&catalog, &track.id).unwrap();
        assert!(detached.audio_file.is_none());
        assert!(matches!(
            attach_audio(&catalog, "nope"),
            Err(ServiceError::TrackNotFound(_))
        ));
    }
}
