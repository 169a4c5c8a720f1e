pub mod command;
pub mod handlers;
pub mod prompt;
pub mod render;

pub use command::CliCommand;
pub use handlers::{run_command, Context};
pub use prompt::TerminalPrompter;
pub use render::Output;
