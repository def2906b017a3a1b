//! One-shot review purge

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::scheduler::PurgeScheduler;

pub async fn cmd_purge(config: &Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let scheduler = PurgeScheduler::new(Arc::new(store), &config.scheduler);
    let removed = scheduler.run_once().await?;

    println!("Removed {removed} review(s) from previous months.");
    Ok(())
}
