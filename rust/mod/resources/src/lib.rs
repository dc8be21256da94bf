//! Resource controllers for the six UCSB record types.
//!
//! - [`entities`]: schemas, endpoints and notification wording per type
//! - [`ResourceController`]: list/get bindings, create and edit forms, delete
//! - [`Session`]: current user and system info, plus [`authorize`]
//! - [`AppContext`]: one shared cache wired to a transport and presenter
//!
//! Views stay thin: they mount bindings, submit forms and react to
//! [`Presenter`] calls.

pub mod context;
pub mod controller;
pub mod entities;
pub mod entity;
pub mod error;
pub mod form;
pub mod normalize;
pub mod presenter;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use context::AppContext;
pub use controller::ResourceController;
pub use entities::Catalogue;
pub use entity::EntityDef;
pub use error::ResourceError;
pub use form::{EntityForm, FormEvent, FormPhase, FormState, InvalidTransition, SubmitOutcome};
pub use normalize::TimestampSuffix;
pub use presenter::Presenter;
pub use session::{
    AccessDenied, Action, Authority, CurrentUser, Session, SystemInfo, UserInfo, UserRoot, authorize,
};
