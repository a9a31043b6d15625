//! Sessions and their media paths

mod io;
mod media;
mod session;

pub use media::{Direction, MediaStats};
pub use session::Session;
