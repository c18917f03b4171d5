use crate::cli::core::{CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{self, section as output_section};
use crate::cli::registry::CommandEntry;

use super::require_args;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("people", "List people with their balances", "people", cmd_people),
        CommandEntry::new("add", "Add a person", "add <name>", cmd_add),
        CommandEntry::new(
            "rename",
            "Rename a person",
            "rename <person> <new name>",
            cmd_rename,
        ),
        CommandEntry::new(
            "remove",
            "Remove a person and all of their transactions",
            "remove <person>",
            cmd_remove,
        ),
        CommandEntry::new(
            "use",
            "Select the active person, or clear the selection",
            "use <person> | use --none",
            cmd_use,
        ),
        CommandEntry::new("active", "Show the active person", "active", cmd_active),
        CommandEntry::new(
            "balance",
            "Show one balance, or every balance and the net total",
            "balance [person]",
            cmd_balance,
        ),
    ]
}

fn cmd_people(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let summaries = context.session.summaries();
    output_section(format!("People ({})", context.session.people_meta()));
    if summaries.is_empty() {
        io::print_info("No people yet. Use `add <name>` to create one.");
        return Ok(());
    }
    let active = context.session.get_active_person().map(|p| p.id);
    for summary in summaries {
        let marker = if active.as_ref() == Some(&summary.person.id) {
            "*"
        } else {
            " "
        };
        io::print_info(format!(
            "{marker} {:<24} {}",
            summary.person.name,
            output::balance(summary.balance, summary.status)
        ));
    }
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "add <name>")?;
    let person = context.session.add_person(&args.join(" "))?;
    io::print_success(format!("Added `{}`.", person.name));
    Ok(())
}

fn cmd_rename(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 2, "rename <person> <new name>")?;
    let person = context.resolve_person(args[0])?;
    let renamed = context
        .session
        .rename_person(&person.id, &args[1..].join(" "))?;
    io::print_success(format!("Renamed `{}` to `{}`.", person.name, renamed.name));
    Ok(())
}

fn cmd_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "remove <person>")?;
    let person = context.resolve_person(&args.join(" "))?;
    let count = context.session.list_transactions(&person.id).len();
    let prompt = format!(
        "Remove `{}` and {} transaction(s)?",
        person.name, count
    );
    if !context.confirm(&prompt)? {
        io::print_info("Nothing removed.");
        return Ok(());
    }
    context.session.remove_person(&person.id)?;
    io::print_success(format!("Removed `{}`.", person.name));
    Ok(())
}

fn cmd_use(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "use <person> | use --none")?;
    if args == ["--none"] {
        context.session.clear_active_person();
        io::print_success("Active person cleared.");
        return Ok(());
    }
    let person = context.resolve_person(&args.join(" "))?;
    context.session.set_active_person(&person.id)?;
    io::print_success(format!("Active person: `{}`.", person.name));
    Ok(())
}

fn cmd_active(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.session.get_active_person() {
        Some(person) => io::print_info(format!("Active person: {}", person.name)),
        None => io::print_info("No active person."),
    }
    Ok(())
}

fn cmd_balance(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() && context.session.get_active_person().is_none() {
        for summary in context.session.summaries() {
            io::print_info(format!(
                "{:<24} {}",
                summary.person.name,
                output::balance(summary.balance, summary.status)
            ));
        }
        io::print_info(format!(
            "Net: {}",
            context.session.net_total().format_grouped()
        ));
        return Ok(());
    }

    let reference = args.join(" ");
    let person = if reference.is_empty() {
        context.active_person()?
    } else {
        context.resolve_person(&reference)?
    };
    let balance = context.session.get_balance(&person.id);
    let status = context.session.get_status(&person.id);
    io::print_info(format!(
        "{:<24} {}",
        person.name,
        output::balance(balance, status)
    ));
    Ok(())
}
