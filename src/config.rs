use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Book catalog CSV (one row per book, keyed by the `i` column)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Interaction log CSV (one row per user/book interaction)
    #[serde(default = "default_interactions_path")]
    pub interactions_path: PathBuf,

    /// Precomputed recommendations CSV (`user_id`, `recommendation`)
    #[serde(default = "default_recommendations_path")]
    pub recommendations_path: PathBuf,

    /// Genre labels shown as shelves by the genre browsing view
    #[serde(default = "default_genre_shelves")]
    pub genre_shelves: Vec<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("books_complete.csv")
}

fn default_interactions_path() -> PathBuf {
    PathBuf::from("interactions_train1.csv")
}

fn default_recommendations_path() -> PathBuf {
    PathBuf::from("tf_idf.csv")
}

fn default_genre_shelves() -> Vec<String> {
    [
        "Mangas",
        "Roman",
        "Bande dessinées",
        "Science-fiction",
        "Thriller",
        "Fantasy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
