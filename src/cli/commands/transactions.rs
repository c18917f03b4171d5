use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;
use crate::core::services::{TransactionDraft, TransactionPatch};
use crate::core::Clock;
use crate::domain::{dates, PersonId, Transaction, TransactionKind};

use super::require_args;

const SHORT_ID: usize = 8;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "give",
            "Record money given to the active person",
            "give <amount> [date] [note]",
            cmd_give,
        ),
        CommandEntry::new(
            "receive",
            "Record money received from the active person",
            "receive <amount> [date] [note]",
            cmd_receive,
        ),
        CommandEntry::new(
            "txns",
            "List transactions of a person, newest first",
            "txns [person]",
            cmd_txns,
        ),
        CommandEntry::new(
            "edit",
            "Change fields of a transaction",
            "edit <txn> [amount=..] [date=..] [type=..] [note=..] [person=..]",
            cmd_edit,
        ),
        CommandEntry::new("delete", "Delete a transaction", "delete <txn>", cmd_delete),
    ]
}

fn cmd_give(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    record(context, args, TransactionKind::Given, "give <amount> [date] [note]")
}

fn cmd_receive(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    record(
        context,
        args,
        TransactionKind::Received,
        "receive <amount> [date] [note]",
    )
}

/// The second argument is taken as a date when it is shaped like one; everything after is
/// the note.
fn record(
    context: &mut ShellContext,
    args: &[&str],
    kind: TransactionKind,
    usage: &str,
) -> CommandResult {
    require_args(args, 1, usage)?;
    let person = context.active_person()?;

    let (date, note_start) = match args.get(1) {
        Some(candidate) if looks_like_date(candidate) => (candidate.to_string(), 2),
        _ => (dates::to_display(context.clock.today()), 1),
    };
    let mut draft = TransactionDraft::new(person.id.clone(), args[0], date, kind.as_str());
    if args.len() > note_start {
        draft = draft.note(args[note_start..].join(" "));
    }

    let transaction = context.session.add_transaction(draft)?;
    io::print_success(format!(
        "Recorded {} {} for `{}` ({}).",
        transaction.kind,
        transaction.amount.format_grouped(),
        person.name,
        short_id(&transaction)
    ));
    Ok(())
}

fn cmd_txns(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let person = if args.is_empty() {
        context.active_person()?
    } else {
        context.resolve_person(&args.join(" "))?
    };
    let transactions = context.session.list_transactions(&person.id);
    output_section(format!("Transactions: {}", person.name));
    if transactions.is_empty() {
        io::print_info("No transactions.");
        return Ok(());
    }
    for transaction in &transactions {
        io::print_info(format_row(transaction));
    }
    io::print_info(format!(
        "Balance: {} ({})",
        context.session.get_balance(&person.id).format_grouped(),
        context.session.get_status(&person.id)
    ));
    Ok(())
}

fn cmd_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "edit <txn> [amount=..] [date=..] [type=..] [note=..] [person=..]";
    require_args(args, 2, usage)?;
    let transaction = context.resolve_transaction(args[0])?;

    let mut patch = TransactionPatch::default();
    for arg in &args[1..] {
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            CommandError::InvalidArguments(format!("Expected field=value, got `{arg}`."))
        })?;
        match key.to_ascii_lowercase().as_str() {
            "amount" => patch.amount = Some(value.to_string()),
            "date" => patch.date = Some(value.to_string()),
            "type" => patch.kind = Some(value.to_string()),
            "note" => patch.note = Some(value.to_string()),
            "person" => patch.person_id = Some(resolve_person_id(context, value)),
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "Unknown field `{other}`. Usage: {usage}"
                )))
            }
        }
    }

    let updated = context.session.update_transaction(&transaction.id, patch)?;
    io::print_success(format!("Updated {}.", short_id(&updated)));
    io::print_info(format_row(&updated));
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    require_args(args, 1, "delete <txn>")?;
    let transaction = context.resolve_transaction(args[0])?;
    if !context.confirm(&format!("Delete transaction {}?", short_id(&transaction)))? {
        io::print_info("Nothing deleted.");
        return Ok(());
    }
    context.session.remove_transaction(&transaction.id)?;
    io::print_success(format!("Deleted {}.", short_id(&transaction)));
    Ok(())
}

fn looks_like_date(arg: &str) -> bool {
    arg.len() == 10
        && arg.contains('-')
        && arg.bytes().all(|b| b.is_ascii_digit() || b == b'-')
}

/// Unknown references pass through so the ledger reports them as `PersonNotFound`.
fn resolve_person_id(context: &ShellContext, reference: &str) -> PersonId {
    context
        .resolve_person(reference)
        .map(|person| person.id)
        .unwrap_or_else(|_| PersonId::new(reference))
}

fn short_id(transaction: &Transaction) -> &str {
    let id = transaction.id.as_str();
    id.get(..SHORT_ID).unwrap_or(id)
}

fn format_row(transaction: &Transaction) -> String {
    let signed = transaction.signed_amount();
    let mut row = format!(
        "[{}] {}  {:<8} {:>12}",
        short_id(transaction),
        transaction.display_date(),
        transaction.kind.as_str(),
        signed.format_grouped()
    );
    if !transaction.note.is_empty() {
        row.push_str("  ");
        row.push_str(&transaction.note);
    }
    row
}
