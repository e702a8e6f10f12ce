//! Database row models.
//!
//! Each model mirrors one table row; conversions to domain types live next to
//! the model.

pub mod attendance;
pub mod notification;
pub mod supervisor;
pub mod user;
pub mod verification;

pub use attendance::*;
pub use notification::*;
pub use supervisor::*;
pub use user::*;
pub use verification::*;
