mod console_commands;
mod overlay;

pub use console_commands::{
    CommandParseError, ConsoleCommandProcessor, ConsoleCommandRegistry, LocalAction,
    ParsedCommand, MAX_PENDING_DEBUG_COMMANDS,
};
pub use overlay::{DebugOverlay, OverlayData};
