//! Per-entity resource controller.
//!
//! Composes fetch and mutation bindings with an [`EntityDef`]'s request
//! shaping, gates each action on the current user's roles, and turns
//! mutation outcomes into presenter calls.

use std::sync::Arc;

use serde_json::Value;
use ucsb_client::Transport;
use ucsb_core::{Record, RecordKey};
use ucsb_flux::{CacheStore, FetchBinding, MutationBinding, MutationDescriptor, MutationOutcome};
use ucsb_schema::{EntitySchema, FieldErrors, ValidatedRecord};

use crate::entity::EntityDef;
use crate::error::ResourceError;
use crate::form::{EntityForm, SubmitOutcome};
use crate::presenter::Presenter;
use crate::session::{AccessDenied, Action, CurrentUser, authorize};

type Build = fn(&EntityDef, &ValidatedRecord) -> Result<MutationDescriptor, FieldErrors>;

pub struct ResourceController {
    entity: Arc<EntityDef>,
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    presenter: Arc<dyn Presenter>,
}

impl ResourceController {
    pub fn new(
        entity: Arc<EntityDef>,
        store: Arc<CacheStore>,
        transport: Arc<dyn Transport>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self { entity, store, transport, presenter }
    }

    pub fn entity(&self) -> &Arc<EntityDef> {
        &self.entity
    }

    /// Bind the collection. Call `load` on the result to fetch it.
    pub fn list(&self, user: &CurrentUser) -> Result<FetchBinding, AccessDenied> {
        authorize(user, Action::Read)?;
        Ok(self.mount(self.entity.list_request()))
    }

    pub fn get(&self, user: &CurrentUser, key: &RecordKey) -> Result<FetchBinding, AccessDenied> {
        authorize(user, Action::Read)?;
        Ok(self.mount(self.entity.get_request(key)))
    }

    pub fn create_form(&self) -> EntityForm {
        let entity = Arc::clone(&self.entity);
        let binding = self.binding(
            Arc::clone(entity.schema()),
            EntityDef::describe_create,
            move |body| entity.created_message(body),
        );
        EntityForm::new(
            Arc::clone(&self.entity),
            Action::Create,
            None,
            Record::new(),
            binding,
            Arc::clone(&self.presenter),
        )
    }

    /// Open an edit form filled with the record's current contents.
    pub async fn edit_form(&self, user: &CurrentUser, key: RecordKey) -> Result<EntityForm, ResourceError> {
        authorize(user, Action::Update)?;

        let view = self.mount(self.entity.get_request(&key)).load().await;
        let initial = match (view.data, view.error) {
            (Some(data), _) => data
                .as_object()
                .cloned()
                .ok_or_else(|| ResourceError::NotARecord(self.entity.singleton_key(&key)))?,
            (None, Some(error)) => return Err(error.into()),
            (None, None) => Record::new(),
        };

        let entity = Arc::clone(&self.entity);
        let binding = self.binding(
            Arc::clone(entity.schema()),
            EntityDef::describe_update,
            move |body| entity.updated_message(body),
        );
        Ok(EntityForm::new(
            Arc::clone(&self.entity),
            Action::Update,
            Some(key),
            initial,
            binding,
            Arc::clone(&self.presenter),
        ))
    }

    /// Delete one record. Deleting leaves the view where it is, so a
    /// successful outcome carries no navigation.
    pub async fn delete(&self, user: &CurrentUser, key: &RecordKey) -> SubmitOutcome {
        if let Err(denied) = authorize(user, Action::Delete) {
            tracing::warn!(entity = self.entity.name(), "delete forbidden");
            self.presenter.error(&denied.to_string());
            return SubmitOutcome::Forbidden(denied);
        }

        let entity = Arc::clone(&self.entity);
        let deleted = key.clone();
        let binding = self.binding(
            Arc::clone(entity.key_schema()),
            EntityDef::describe_delete,
            move |body| entity.deleted_message(body, &deleted),
        );

        let mut raw = Record::new();
        raw.insert(self.entity.key().name.clone(), key.to_value());
        match binding.mutate(&raw).await {
            MutationOutcome::Succeeded(response) => SubmitOutcome::Saved { response, navigate: None },
            MutationOutcome::Failed(failure) => SubmitOutcome::Failed(failure),
            MutationOutcome::Invalid(errors) => SubmitOutcome::Invalid(errors),
        }
    }

    fn mount(&self, request: ucsb_client::Request) -> FetchBinding {
        FetchBinding::mount(Arc::clone(&self.store), Arc::clone(&self.transport), request)
    }

    fn binding<M>(&self, schema: Arc<EntitySchema>, build: Build, message: M) -> Arc<MutationBinding>
    where
        M: Fn(&Value) -> String + Send + Sync + 'static,
    {
        let entity = Arc::clone(&self.entity);
        let binding = MutationBinding::new(
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            schema,
            move |record: &ValidatedRecord| build(&entity, record),
        );
        let presenter = Arc::clone(&self.presenter);
        binding.on_outcome(move |outcome| match outcome {
            MutationOutcome::Succeeded(response) => presenter.notify(&message(&response.body)),
            MutationOutcome::Failed(failure) => presenter.error(&failure.banner()),
            MutationOutcome::Invalid(_) => {}
        });
        Arc::new(binding)
    }
}
