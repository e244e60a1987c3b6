pub mod catalog;
pub mod interactions;
pub mod recommendations;

pub use catalog::CatalogStore;
pub use interactions::InteractionIndex;
pub use recommendations::{parse_recommendation, RecommendationTable};

use crate::{config::Config, error::AppResult};

/// The three read-only stores, loaded together once per process
#[derive(Debug, Default)]
pub struct BookStores {
    pub catalog: CatalogStore,
    pub interactions: InteractionIndex,
    pub recommendations: RecommendationTable,
}

impl BookStores {
    /// Loads every source file named in `config`, failing on the first
    /// structurally broken one
    pub fn load(config: &Config) -> AppResult<Self> {
        tracing::info!(
            catalog = %config.catalog_path.display(),
            interactions = %config.interactions_path.display(),
            recommendations = %config.recommendations_path.display(),
            "Loading book data"
        );

        Ok(Self {
            catalog: CatalogStore::from_path(&config.catalog_path)?,
            interactions: InteractionIndex::from_path(&config.interactions_path)?,
            recommendations: RecommendationTable::from_path(&config.recommendations_path)?,
        })
    }
}
