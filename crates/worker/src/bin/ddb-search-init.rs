//! One-shot search index (re)build.
//!
//! ```text
//! ddb-search-init --index-type recipes --index-type meals --wipe
//! ddb-search-init --all
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ddb_core::IndexType;
use ddb_db::PgDataManager;
use ddb_events::{standard_indexers, IndexDispatcher, SearchIndexInitializer};
use ddb_search::SearchConfig;
use ddb_worker::init_tracing;

#[derive(Parser, Debug)]
#[command(about = "Rebuild search indexes from the datastore")]
struct CliArgs {
    /// Index to rebuild. Repeat for several.
    #[arg(long = "index-type", required_unless_present = "all")]
    index_types: Vec<IndexType>,

    /// Rebuild every index.
    #[arg(long, conflicts_with = "index_types")]
    all: bool,

    /// Empty each index before rebuilding it.
    #[arg(long)]
    wipe: bool,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = ddb_db::DEFAULT_MAX_CONNECTIONS)]
    database_max_connections: u32,
}

impl CliArgs {
    fn selected(&self) -> Vec<IndexType> {
        if self.all {
            IndexType::ALL.to_vec()
        } else {
            self.index_types.clone()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("ddb_search_init=info,ddb_events=info");

    let args = CliArgs::parse();
    let types = args.selected();

    let pool = tokio::time::timeout(
        Duration::from_secs(15),
        ddb_db::create_pool(&args.database_url, args.database_max_connections),
    )
    .await
    .context("Timed out connecting to the database")?
    .context("Failed to connect to database")?;
    let data = Arc::new(PgDataManager::new(pool));

    let search = SearchConfig::from_env()?;
    let dispatcher = Arc::new(IndexDispatcher::new(data, standard_indexers(&search)));
    let initializer = SearchIndexInitializer::new(dispatcher);

    tracing::info!(types = ?types, wipe = args.wipe, "Rebuilding search indexes");
    let report = initializer.run(&types, args.wipe).await?;

    for (index_type, queued) in &report.queued {
        tracing::info!(index_type = %index_type, queued, "Index rebuilt");
    }
    if report.failed > 0 {
        anyhow::bail!("{} of {} rows failed to index", report.failed, report.indexed + report.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_index_types_parse() {
        let args = CliArgs::try_parse_from([
            "ddb-search-init",
            "--index-type",
            "recipes",
            "--index-type",
            "valid_vessels",
            "--wipe",
            "--database-url",
            "postgres://localhost/ddb",
        ])
        .unwrap();
        assert_eq!(args.selected(), vec![IndexType::Recipes, IndexType::ValidVessels]);
        assert!(args.wipe);
    }

    #[test]
    fn all_selects_every_index() {
        let args =
            CliArgs::try_parse_from(["ddb-search-init", "--all", "--database-url", "postgres://localhost/ddb"]).unwrap();
        assert_eq!(args.selected(), IndexType::ALL.to_vec());
    }

    #[test]
    fn unknown_index_type_is_rejected() {
        assert!(CliArgs::try_parse_from([
            "ddb-search-init",
            "--index-type",
            "spaceships",
            "--database-url",
            "x"
        ])
        .is_err());
    }

    #[test]
    fn an_index_selection_is_required() {
        assert!(CliArgs::try_parse_from(["ddb-search-init", "--database-url", "x"]).is_err());
    }
}
