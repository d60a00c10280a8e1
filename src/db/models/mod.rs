mod booking;
mod common;
mod room;
mod session;
mod user;

pub use booking::*;
pub use common::*;
pub use room::*;
pub use session::*;
pub use user::*;
