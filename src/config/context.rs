use std::sync::Arc;
use std::time::Duration;

use crate::catalog::locator::TableLocatorFactory;
use crate::catalog::naming::AffixDatabaseNames;
use crate::catalog::reconciler::CatalogReconciler;
use crate::catalog::table::CatalogTableFactory;
use crate::catalog::{CatalogResult, CatalogStore};
use crate::events::dispatcher::EventDispatcher;
use crate::events::{Clock, EventHandler};
use crate::queue::MessageQueue;

use super::schema;

pub fn build_table_factory(cfg: &schema::StrataConfig) -> CatalogResult<CatalogTableFactory> {
    let database_names = AffixDatabaseNames::new(
        &cfg.catalog.database_prefix,
        &cfg.catalog.database_suffix,
    );
    let locators = TableLocatorFactory::try_new(&cfg.storage.bucket, &cfg.storage.prefix)?;

    Ok(CatalogTableFactory::new(Arc::new(database_names), locators))
}

pub fn build_reconciler(
    cfg: &schema::StrataConfig,
    store: Arc<dyn CatalogStore>,
) -> CatalogReconciler {
    CatalogReconciler::new(store).with_page_size(cfg.catalog.page_size)
}

pub fn build_dispatcher(
    cfg: &schema::StrataConfig,
    queue: Arc<dyn MessageQueue>,
    handler: Arc<dyn EventHandler>,
    clock: Arc<dyn Clock>,
) -> EventDispatcher {
    let dispatcher = EventDispatcher::new(queue, handler, clock);

    match &cfg.queue {
        Some(queue) => dispatcher.with_receive_options(queue.receive_options()),
        None => dispatcher,
    }
}

pub fn poll_interval(cfg: &schema::StrataConfig) -> Duration {
    Duration::from_millis(cfg.misc.poll_interval_ms)
}
