pub mod people;
pub mod system;
pub mod transactions;

use crate::cli::core::CommandError;
use crate::cli::registry::CommandEntry;

pub(crate) fn all_definitions() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(people::definitions());
    commands.extend(transactions::definitions());
    commands.extend(system::definitions());
    commands
}

pub(crate) fn require_args(args: &[&str], count: usize, usage: &str) -> Result<(), CommandError> {
    if args.len() < count {
        Err(CommandError::InvalidArguments(format!("Usage: {usage}")))
    } else {
        Ok(())
    }
}
