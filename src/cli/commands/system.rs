use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::help;
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;
use crate::storage::json_backend::STORE_SCHEMA_VERSION;
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "account",
            "Show the signed-in account, or switch to another one",
            "account [id]",
            cmd_account,
        ),
        CommandEntry::new("signout", "Sign out of the current account", "signout", cmd_signout),
        CommandEntry::new("version", "Show build metadata", "version", cmd_version),
        CommandEntry::new(
            "help",
            "Show available commands",
            "help [command]",
            cmd_help,
        ),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_account(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(account) = args.first() {
        context.switch_account(account)?;
        io::print_success(format!("Signed in as `{}`.", account.trim()));
        return Ok(());
    }
    match context.session.account() {
        Some(account) => {
            let status = context.session.sync_status();
            io::print_info(format!("Account: {account}"));
            if !status.is_ready() {
                io::print_info("Still loading ledger data.");
            }
        }
        None => io::print_info("Signed out."),
    }
    Ok(())
}

fn cmd_signout(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if context.session.account().is_none() {
        return Err(CommandError::Message("Already signed out.".into()));
    }
    context.identity.sign_out();
    io::print_success("Signed out.");
    Ok(())
}

fn cmd_version(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output_section(format!("People Ledger {}", meta.version));
    io::print_info(format!("  Store schema : v{}", STORE_SCHEMA_VERSION));
    io::print_info(format!(
        "  Data file    : {}",
        context.config_manager.data_file().display()
    ));
    io::print_info(format!(
        "  Build hash   : {} ({})",
        meta.git_hash, meta.git_status
    ));
    io::print_info(format!("  Built at     : {}", meta.timestamp));
    io::print_info(format!("  Target       : {}", meta.target));
    io::print_info(format!("  Profile      : {}", meta.profile));
    io::print_info(format!("  Rustc        : {}", meta.rustc));
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.command(&name.to_lowercase()) {
            Some(entry) => help::print_command(entry),
            None => context.suggest_command(name),
        }
        return Ok(());
    }
    help::print_overview(&context.registry);
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
