use async_graphql::{Context, Object, Upload};
use common::Track;
use tracing::{info, warn};

use crate::mutations::{
    self, BulkDeleteResponse, TrackCreateInput, TrackUpdateInput,
};

use super::run_blocking;

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_track(
        &self,
        ctx: &Context<'_>,
        input: TrackCreateInput,
    ) -> async_graphql::Result<Track> {
        run_blocking(ctx, move |catalog| mutations::create_track(catalog, input)).await
    }

    async fn update_track(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: TrackUpdateInput,
    ) -> async_graphql::Result<Track> {
        run_blocking(ctx, move |catalog| mutations::update_track(catalog, &id, input)).await
    }

    async fn delete_track(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<bool> {
        run_blocking(ctx, move |catalog| mutations::delete_track(catalog, &id)).await
    }

    async fn delete_tracks(
        &self,
        ctx: &Context<'_>,
        ids: Vec<String>,
    ) -> async_graphql::Result<BulkDeleteResponse> {
        run_blocking(ctx, move |catalog| Ok(mutations::delete_tracks(catalog, &ids))).await
    }

    /// Records an audio attachment for the track. The uploaded bytes are
    /// not kept.
    async fn upload_track_file(
        &self,
        ctx: &Context<'_>,
        id: String,
        file: Option<Upload>,
    ) -> async_graphql::Result<Track> {
        if let Some(file) = file {
            let upload = file.value(ctx)?;
            match upload.size() {
                Ok(size) => info!(
                    "Received audio upload {:?} ({} bytes, {}) for track {}",
                    upload.filename,
                    size,
                    upload.content_type.as_deref().unwrap_or("unknown type"),
                    id
                ),
                Err(err) => warn!(
                    "Received audio upload {:?} for track {} of unknown size: {}",
                    upload.filename, id, err
                ),
            }
        }
        run_blocking(ctx, move |catalog| mutations::attach_audio(catalog, &id)).await
    }

    async fn delete_track_file(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<Track> {
        run_blocking(ctx, move |catalog| mutations::detach_audio(catalog, &id)).await
    }
}
