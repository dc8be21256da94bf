//! Create and edit forms.
//!
//! A form moves through
//!
//! ```text
//! Idle ──submit──▶ Validating ──accepted──▶ Submitting ──succeeded──▶ Navigated
//!  ▲ ▲                  │                        │
//!  │ └─rejected/forbidden┘                        │
//!  └──────────────failed (banner)────────────────┘
//! ```
//!
//! `Navigated` is terminal. There is no partial-success state.

use std::sync::Arc;

use ucsb_client::Response;
use ucsb_core::{Record, RecordKey, merge_patch};
use ucsb_flux::{MutationBinding, MutationFailure, MutationOutcome, MutationStatus};
use ucsb_schema::FieldErrors;

use crate::entity::EntityDef;
use crate::presenter::Presenter;
use crate::session::{AccessDenied, Action, CurrentUser, authorize};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Navigated(String),
}

impl FormPhase {
    pub fn name(&self) -> &'static str {
        match self {
            FormPhase::Idle => "idle",
            FormPhase::Validating => "validating",
            FormPhase::Submitting => "submitting",
            FormPhase::Navigated(_) => "navigated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    Submit,
    Forbidden(String),
    Rejected(FieldErrors),
    Accepted,
    Succeeded(String),
    Failed(String),
}

impl FormEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FormEvent::Submit => "submit",
            FormEvent::Forbidden(_) => "forbidden",
            FormEvent::Rejected(_) => "rejected",
            FormEvent::Accepted => "accepted",
            FormEvent::Succeeded(_) => "succeeded",
            FormEvent::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply '{event}' to a form that is {phase}")]
pub struct InvalidTransition {
    pub phase: &'static str,
    pub event: &'static str,
}

/// Phase plus what the view shows alongside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub phase: FormPhase,
    /// Inline errors from the last rejected submission.
    pub field_errors: FieldErrors,
    /// Non-field error from the last forbidden or failed submission.
    pub banner: Option<String>,
}

impl FormState {
    pub fn apply(&mut self, event: FormEvent) -> Result<(), InvalidTransition> {
        let next = match (&self.phase, event) {
            (FormPhase::Idle, FormEvent::Submit) => {
                self.field_errors = FieldErrors::new();
                self.banner = None;
                FormPhase::Validating
            }
            (FormPhase::Validating, FormEvent::Forbidden(message)) => {
                self.banner = Some(message);
                FormPhase::Idle
            }
            (FormPhase::Validating, FormEvent::Rejected(errors)) => {
                self.field_errors = errors;
                FormPhase::Idle
            }
            (FormPhase::Validating, FormEvent::Accepted) => FormPhase::Submitting,
            (FormPhase::Submitting, FormEvent::Succeeded(route)) => FormPhase::Navigated(route),
            (FormPhase::Submitting, FormEvent::Failed(banner)) => {
                self.banner = Some(banner);
                FormPhase::Idle
            }
            (phase, event) => {
                return Err(InvalidTransition { phase: phase.name(), event: event.name() });
            }
        };
        self.phase = next;
        Ok(())
    }
}

/// How a submission (or a delete) ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The user may not perform the action; nothing was sent.
    Forbidden(AccessDenied),
    /// Validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// Backend accepted the write. `navigate` is where the view went.
    Saved { response: Response, navigate: Option<String> },
    Failed(MutationFailure),
}

impl SubmitOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SubmitOutcome::Saved { .. })
    }
}

pub struct EntityForm {
    entity: Arc<EntityDef>,
    action: Action,
    key: Option<RecordKey>,
    initial: Record,
    binding: Arc<MutationBinding>,
    presenter: Arc<dyn Presenter>,
    state: FormState,
}

impl EntityForm {
    pub(crate) fn new(
        entity: Arc<EntityDef>,
        action: Action,
        key: Option<RecordKey>,
        initial: Record,
        binding: Arc<MutationBinding>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            entity,
            action,
            key,
            initial,
            binding,
            presenter,
            state: FormState::default(),
        }
    }

    pub fn entity(&self) -> &EntityDef {
        &self.entity
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Contents the form opened with; empty for a create form.
    pub fn initial(&self) -> &Record {
        &self.initial
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn mutation_status(&self) -> MutationStatus {
        self.binding.status()
    }

    /// Submit `input` on top of the initial contents.
    ///
    /// Fields in `input` replace the initial ones; a `null` clears one.
    /// An edit form always submits under the key it was opened with.
    pub async fn submit(
        &mut self,
        user: &CurrentUser,
        input: &Record,
    ) -> Result<SubmitOutcome, InvalidTransition> {
        self.state.apply(FormEvent::Submit)?;

        if let Err(denied) = authorize(user, self.action) {
            tracing::warn!(entity = self.entity.name(), action = %self.action, "submission forbidden");
            let message = denied.to_string();
            self.presenter.error(&message);
            self.state.apply(FormEvent::Forbidden(message))?;
            return Ok(SubmitOutcome::Forbidden(denied));
        }

        let mut raw = self.initial.clone();
        merge_patch(&mut raw, input);
        if let Some(key) = &self.key {
            raw.insert(self.entity.key().name.clone(), key.to_value());
        }

        let descriptor = match self.binding.prepare(&raw) {
            Ok(descriptor) => descriptor,
            Err(errors) => {
                self.state.apply(FormEvent::Rejected(errors.clone()))?;
                return Ok(SubmitOutcome::Invalid(errors));
            }
        };
        self.state.apply(FormEvent::Accepted)?;

        match self.binding.send(descriptor).await {
            MutationOutcome::Succeeded(response) => {
                let route = self.entity.list_route().to_string();
                self.presenter.navigate(&route);
                self.state.apply(FormEvent::Succeeded(route.clone()))?;
                Ok(SubmitOutcome::Saved { response, navigate: Some(route) })
            }
            MutationOutcome::Failed(failure) => {
                self.state.apply(FormEvent::Failed(failure.banner()))?;
                Ok(SubmitOutcome::Failed(failure))
            }
            MutationOutcome::Invalid(errors) => {
                self.state.apply(FormEvent::Failed(errors.to_string()))?;
                Ok(SubmitOutcome::Invalid(errors))
            }
        }
    }
}
