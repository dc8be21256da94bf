//! Application wiring: one cache, one transport, one presenter.

use std::sync::Arc;

use ucsb_client::Transport;
use ucsb_flux::CacheStore;

use crate::controller::ResourceController;
use crate::entities::Catalogue;
use crate::error::ResourceError;
use crate::presenter::Presenter;
use crate::session::Session;

/// Owns the process-wide cache and hands out controllers that share it.
pub struct AppContext {
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    presenter: Arc<dyn Presenter>,
    catalogue: Catalogue,
}

impl AppContext {
    pub fn new(transport: Arc<dyn Transport>, presenter: Arc<dyn Presenter>) -> Result<Self, ResourceError> {
        Ok(Self {
            store: Arc::new(CacheStore::new()),
            transport,
            presenter,
            catalogue: Catalogue::standard()?,
        })
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn session(&self) -> Session {
        Session::mount(Arc::clone(&self.store), Arc::clone(&self.transport))
    }

    /// Controller for the entity named `name` (any alias).
    pub fn controller(&self, name: &str) -> Result<ResourceController, ResourceError> {
        let entity = self
            .catalogue
            .lookup(name)
            .ok_or_else(|| ResourceError::UnknownResource(name.to_string()))?;
        Ok(ResourceController::new(
            entity,
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            Arc::clone(&self.presenter),
        ))
    }
}
