//! Command handlers. Each takes the live session and global options.

pub mod config_cmd;
pub mod discover;
pub mod onboard;
pub mod ping;
pub mod set;
pub mod status;
pub mod util;
pub mod watch;

use amotion_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a session command to its handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(session, global).await,
        Command::Watch(args) => watch::handle(session, &args, global).await,
        Command::Discover => discover::handle(session, global).await,
        Command::Ping => ping::handle(session, global).await,
        Command::Set(args) => set::handle(session, &args, global).await,
        Command::Onboard(_) | Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not use a unit session".into(),
        )),
    }
}
