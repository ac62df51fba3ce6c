pub mod conversation;
pub mod events;
pub mod operations;
pub mod policy;
pub mod tickets;

pub use conversation::*;
pub use events::*;
pub use operations::*;
pub use policy::*;
pub use tickets::*;
