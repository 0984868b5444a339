mod events;
mod file;
mod store;

pub use events::*;
pub use file::*;
pub use store::*;
