pub mod appointment;
pub mod communication;
pub mod enums;
pub mod slot;
pub mod work_window;

pub use appointment::*;
pub use communication::*;
pub use enums::*;
pub use slot::*;
pub use work_window::*;
