pub mod document;
pub mod identity;
pub mod state;
pub mod topics;

pub use document::*;
pub use identity::*;
pub use state::*;
