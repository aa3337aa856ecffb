use std::cmp::Ordering;

use async_graphql::{Enum, InputObject, SimpleObject};
use common::Track;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 10;

#[derive(InputObject, Clone, Debug, Default)]
pub struct TracksFilterInput {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub artist: Option<String>,
}

#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TrackSortField {
    Title,
    Artist,
    Album,
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct TracksSortInput {
    pub field: Option<TrackSortField>,
    pub order: Option<SortOrder>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct PaginationInput {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct TracksInput {
    pub filter: Option<TracksFilterInput>,
    pub sort: Option<TracksSortInput>,
    pub pagination: Option<PaginationInput>,
}

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct PageInfo {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct TracksConnection {
    pub data: Vec<Track>,
    pub page_info: PageInfo,
}

pub fn run_tracks_query(tracks: Vec<Track>, input: &TracksInput) -> TracksConnection {
    let mut tracks = match &input.filter {
        Some(filter) => tracks
            .into_iter()
            .filter(|track| matches_filter(track, filter))
            .collect(),
        None => tracks,
    };

    let sort = input.sort.clone().unwrap_or_default();
    sort_tracks(
        &mut tracks,
        sort.field.unwrap_or_default(),
        sort.order.unwrap_or_default(),
    );

    let pagination = input.pagination.clone().unwrap_or_default();
    paginate(tracks, pagination.page, pagination.limit)
}

fn matches_filter(track: &Track, filter: &TracksFilterInput) -> bool {
    if let Some(genre) = non_empty(&filter.genre) {
        if !track.genres.iter().any(|value| value == genre) {
            return false;
        }
    }

    if let Some(artist) = non_empty(&filter.artist) {
        if !contains_ignore_case(&track.artist, &artist.to_lowercase()) {
            return false;
        }
    }

    if let Some(search) = non_empty(&filter.search) {
        let needle = search.to_lowercase();
        let hit = contains_ignore_case(&track.title, &needle)
            || contains_ignore_case(&track.artist, &needle)
            || track
                .album
                .as_deref()
                .map(|album| contains_ignore_case(album, &needle))
                .unwrap_or(false)
            || track
                .genres
                .iter()
                .any(|genre| contains_ignore_case(genre, &needle));
        if !hit {
            return false;
        }
    }

    true
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn contains_ignore_case(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

pub fn sort_tracks(tracks: &mut [Track], field: TrackSortField, order: SortOrder) {
    tracks.sort_by(|a, b| {
        let ordering = collate(sort_key(a, field), sort_key(b, field));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn sort_key(track: &Track, field: TrackSortField) -> &str {
    match field {
        TrackSortField::Title => &track.title,
        TrackSortField::Artist => &track.artist,
        TrackSortField::Album => track.album.as_deref().unwrap_or(""),
        TrackSortField::CreatedAt => &track.created_at,
        TrackSortField::UpdatedAt => &track.updated_at,
    }
}

/// Compares base letters first (accents and case ignored), then accents,
/// then case with lowercase first.
pub fn collate(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| lowered(a).cmp(lowered(b)))
        .then_with(|| b.cmp(a))
}

fn base_letters(value: &str) -> impl Iterator<Item = char> + '_ {
    value
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
}

fn lowered(value: &str) -> impl Iterator<Item = char> + '_ {
    value.nfc().flat_map(char::to_lowercase)
}

fn paginate(tracks: Vec<Track>, page: Option<i32>, limit: Option<i32>) -> TracksConnection {
    let page = positive_or(page, DEFAULT_PAGE);
    let limit = positive_or(limit, DEFAULT_LIMIT);
    let total = tracks.len();
    let offset = (page - 1).saturating_mul(limit);
    let data = tracks.into_iter().skip(offset).take(limit).collect();

    TracksConnection {
        data,
        page_info: PageInfo {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        },
    }
}

fn positive_or(value: Option<i32>, fallback: usize) -> usize {
    match value {
        Some(value) if value > 0 => value as usize,
        _ => fallback,
    }
}
