//! `pantry-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod user;
pub mod visit;

pub use error::{DomainError, DomainResult};
pub use id::{Id, IdKind, OrderId, UserId, VisitId};
pub use user::{Email, Role, User};
pub use visit::Visit;
