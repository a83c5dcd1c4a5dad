//! Built-in event handlers and commands.

pub mod directory;
pub mod screening;
pub mod space;

pub use directory::{MemberDirectoryCommand, NameIndexService, PingUnsetCommand};
pub use screening::{ApplyCommand, RecheckCommand, ScreeningService};
pub use space::SpaceService;
