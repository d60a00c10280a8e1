mod bookings;
mod conflicts;
mod session_sweeper;
mod sessions;

pub use bookings::*;
pub use conflicts::*;
pub use session_sweeper::*;
pub use sessions::*;
