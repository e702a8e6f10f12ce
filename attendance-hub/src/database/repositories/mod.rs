//! Repository layer for database access.
//!
//! Every store the core consumes sits behind an async trait so services can be
//! wired against SQLite in production and against the same traits in tests.

pub mod attendance;
pub mod notification;
pub mod preference;
pub mod supervisor;
pub mod user;
pub mod verification;

pub use attendance::*;
pub use notification::*;
pub use preference::*;
pub use supervisor::*;
pub use user::*;
pub use verification::*;
