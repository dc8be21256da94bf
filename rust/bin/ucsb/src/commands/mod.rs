pub mod context;
pub mod resource;
