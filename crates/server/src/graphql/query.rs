use async_graphql::{Context, Object};
use common::{Genre, Track};

use crate::tracks_query::{run_tracks_query, TracksConnection, TracksInput};

use super::run_blocking;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn genres(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Genre>> {
        run_blocking(ctx, |catalog| Ok(catalog.list_genres()?)).await
    }

    async fn genre(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<Genre>> {
        run_blocking(ctx, move |catalog| {
            Ok(catalog.list_genres()?.into_iter().find(|genre| genre.id == id))
        })
        .await
    }

    async fn genre_by_slug(
        &self,
        ctx: &Context<'_>,
        slug: String,
    ) -> async_graphql::Result<Option<Genre>> {
        run_blocking(ctx, move |catalog| {
            Ok(catalog
                .list_genres()?
                .into_iter()
                .find(|genre| genre.slug == slug))
        })
        .await
    }

    async fn tracks(
        &self,
        ctx: &Context<'_>,
        input: Option<TracksInput>,
    ) -> async_graphql::Result<TracksConnection> {
        let input = input.unwrap_or_default();
        run_blocking(ctx, move |catalog| {
            Ok(run_tracks_query(catalog.list_tracks()?, &input))
        })
        .await
    }

    async fn track(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<Track>> {
        run_blocking(ctx, move |catalog| Ok(catalog.get_track(&id)?)).await
    }

    async fn track_by_slug(
        &self,
        ctx: &Context<'_>,
        slug: String,
    ) -> async_graphql::Result<Option<Track>> {
        run_blocking(ctx, move |catalog| Ok(catalog.find_track_by_slug(&slug)?)).await
    }
}
