mod mutation;
mod query;
mod subscription;

use async_graphql::{Context, ErrorExtensions, Schema};
use library::Catalog;
use tracing::error;

use crate::active_track::ActiveTrackBroadcaster;
use crate::error::ServiceError;

pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;

pub type CatalogSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(catalog: Catalog, broadcaster: ActiveTrackBroadcaster) -> CatalogSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(catalog)
        .data(broadcaster)
        .finish()
}

pub(crate) async fn run_blocking<T, F>(ctx: &Context<'_>, job: F) -> async_graphql::Result<T>
where
    F: FnOnce(&Catalog) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    let catalog = ctx.data::<Catalog>()?.clone();
    let result = tokio::task::spawn_blocking(move || job(&catalog))
        .await
        .unwrap_or_else(|err| Err(ServiceError::Task(err.to_string())));
    result.map_err(|err| {
        if err.is_internal() {
            error!("GraphQL resolver failed: {}", err);
        }
        err.extend()
    })
}
