use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::BookService,
};

/// Reads the source files on a blocking thread
async fn load_service(config: Config) -> AppResult<Arc<BookService>> {
    let service = tokio::task::spawn_blocking(move || BookService::load(&config))
        .await
        .map_err(|e| AppError::Internal(format!("Load task failed: {}", e)))??;

    tracing::info!(
        books = service.stores().catalog.len(),
        users = service.stores().recommendations.len(),
        interactions = service.stores().interactions.total_events(),
        "Book data ready"
    );
    Ok(Arc::new(service))
}

/// Shared application state
///
/// The book data is loaded at most once. Until then, handlers get
/// `AppError::NotReady`.
#[derive(Clone, Default)]
pub struct AppState {
    service: Arc<OnceCell<Arc<BookService>>>,
}

impl AppState {
    /// Creates a state whose book data has not been loaded yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state around an already-loaded service
    pub fn with_service(service: BookService) -> Self {
        Self {
            service: Arc::new(OnceCell::new_with(Some(Arc::new(service)))),
        }
    }

    /// Loads the book data from the files in `config`, once.
    ///
    /// Concurrent callers wait for the in-flight load; later calls return the
    /// already-loaded service. A failed load leaves the state uninitialized.
    pub async fn initialize(&self, config: &Config) -> AppResult<Arc<BookService>> {
        self.service
            .get_or_try_init(|| load_service(config.clone()))
            .await
            .cloned()
    }

    /// The loaded service, or `NotReady` while loading
    pub fn service(&self) -> AppResult<Arc<BookService>> {
        self.service.get().cloned().ok_or(AppError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.service.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BookStores;

    #[test]
    fn test_not_ready_until_initialized() {
        let state = AppState::new();
        assert!(!state.is_ready());
        assert!(matches!(state.service(), Err(AppError::NotReady)));
    }

    #[test]
    fn test_with_service_is_ready() {
        let state = AppState::with_service(BookService::new(BookStores::default(), Vec::new()));
        assert!(state.is_ready());
        assert!(state.service().is_ok());
    }

    #[tokio::test]
    async fn test_failed_initialize_stays_not_ready() {
        let state = AppState::new();
        let config = Config {
            catalog_path: "does/not/exist.csv".into(),
            interactions_path: "does/not/exist.csv".into(),
            recommendations_path: "does/not/exist.csv".into(),
            genre_shelves: Vec::new(),
            host: "127.0.0.1".to_string(),
            port: 0,
        };

        let result = state.initialize(&config).await;
        assert!(matches!(result, Err(AppError::Io(_))));
        assert!(!state.is_ready());
    }
}
