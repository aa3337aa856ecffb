use async_graphql::{Context, Subscription};
use common::ActiveTrack;
use futures_util::{stream, Stream, StreamExt};

use crate::active_track::ActiveTrackBroadcaster;

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// The current active track (when one has been picked), then every
    /// change. `null` means no track has audio.
    async fn active_track(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<impl Stream<Item = Option<ActiveTrack>>> {
        let broadcaster = ctx.data::<ActiveTrackBroadcaster>()?;
        let updates = broadcaster.subscribe().map(|event| event.active_track);
        let current = broadcaster.current().map(Some);
        Ok(stream::iter(current).chain(updates))
    }
}
