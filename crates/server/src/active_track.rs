use std::sync::Arc;
use std::time::Duration;

use common::{ActiveTrack, Track};
use futures_util::{Stream, StreamExt};
use library::Catalog;
use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ActiveTrackConfig;

pub const CHANNEL_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveTrackChanged {
    pub active_track: Option<ActiveTrack>,
}

#[derive(Clone)]
pub struct ActiveTrackBroadcaster {
    tx: broadcast::Sender<ActiveTrackChanged>,
    current: Arc<RwLock<Option<ActiveTrack>>>,
}

impl ActiveTrackBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub fn current(&self) -> Option<ActiveTrack> {
        self.current.read().clone()
    }

    /// Stores the new value and pushes it to every live subscriber. Returns
    /// how many subscribers received it.
    pub fn publish(&self, active_track: Option<ActiveTrack>) -> usize {
        *self.current.write() = active_track.clone();
        match self.tx.send(ActiveTrackChanged { active_track }) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> impl Stream<Item = ActiveTrackChanged> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|result| async move {
            match result {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Active track subscriber lagged; skipped {} updates", skipped);
                    None
                }
            }
        })
    }

    pub fn spawn(
        &self,
        catalog: Catalog,
        timing: ActiveTrackConfig,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let broadcaster = self.clone();
        tokio::spawn(async move {
            broadcaster.run(catalog, timing, shutdown).await;
        })
    }

    async fn run(self, catalog: Catalog, timing: ActiveTrackConfig, shutdown: CancellationToken) {
        let mut delay = Duration::from_millis(timing.initial_delay_ms);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Active track rotation stopped");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let active_track = select_active_track(&catalog).await;
            match &active_track {
                Some(track) => info!("Active track changed to: {}", track.title),
                None => info!("Active track changed to: null"),
            }
            let delivered = self.publish(active_track);
            debug!("Active track delivered to {} subscribers", delivered);

            delay = next_interval(&timing, &mut rand::rng());
        }
    }
}

async fn select_active_track(catalog: &Catalog) -> Option<ActiveTrack> {
    let catalog = catalog.clone();
    match tokio::task::spawn_blocking(move || catalog.list_tracks()).await {
        Ok(Ok(tracks)) => pick_active_track(&tracks, &mut rand::rng()),
        Ok(Err(err)) => {
            warn!("Failed to load tracks for rotation: {}", err);
            None
        }
        Err(err) => {
            warn!("Track rotation join error: {}", err);
            None
        }
    }
}

pub fn pick_active_track<R: Rng>(tracks: &[Track], rng: &mut R) -> Option<ActiveTrack> {
    let playable: Vec<&Track> = tracks.iter().filter(|track| track.has_audio()).collect();
    if playable.is_empty() {
        debug!("No tracks with audio files found");
        return None;
    }
    let index = rng.random_range(0..playable.len());
    Some(ActiveTrack::from(playable[index]))
}

pub fn next_interval<R: Rng>(timing: &ActiveTrackConfig, rng: &mut R) -> Duration {
    let min = timing.min_interval_ms.min(timing.max_interval_ms);
    let max = timing.min_interval_ms.max(timing.max_interval_ms);
    if min == max {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rng.random_range(min..max))
}
