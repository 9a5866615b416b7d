//! Orchestration layer: the session service plus its call guard and
//! auto-call scheduler.

pub mod guard;
pub mod scheduler;
pub mod service;

pub use guard::{CallGuard, CallPermit};
pub use scheduler::CallScheduler;
pub use service::{BingoCheck, CreateSession, SessionService};
