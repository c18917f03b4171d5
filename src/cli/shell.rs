use std::{
    fmt,
    io::{self, BufRead, IsTerminal},
    sync::Arc,
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};

use crate::cli::core::{CliError, CliMode, LoopControl, ShellContext};
use crate::cli::io::print_info;
use crate::core::LedgerSession;

pub fn run_cli() -> Result<(), CliError> {
    if std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let mode = CliMode::from_env();
    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let helper = LedgerHelper::new(context.command_names(), Arc::clone(&context.session));
    let mut editor = Editor::<LedgerHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(helper));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    print_info("Type `help` to list commands.");
    while context.running {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();

                match context.process_line(trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                print_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        match context.process_line(&line?) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err),
        }
    }
    Ok(())
}

/// Commands whose first argument names a person.
const PERSON_ARGUMENT: &[&str] = &["balance", "remove", "rename", "txns", "use"];

/// Line editor hooks. The first word completes against command names; the first argument of
/// person commands completes against live person names, quoted when they contain spaces.
struct LedgerHelper {
    commands: Vec<String>,
    session: Arc<LedgerSession>,
}

impl LedgerHelper {
    fn new(names: Vec<&'static str>, session: Arc<LedgerSession>) -> Self {
        let mut commands: Vec<String> = names.into_iter().map(str::to_ascii_lowercase).collect();
        commands.sort();
        commands.dedup();
        Self { commands, session }
    }

    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let head = &line[..pos];
        let word_start = head
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(idx, c)| idx + c.len_utf8());
        let needle = head[word_start..].to_lowercase();
        let preceding: Vec<&str> = head[..word_start].split_whitespace().collect();

        let pool: Vec<String> = match preceding.as_slice() {
            [] => self.commands.clone(),
            [command] if command.eq_ignore_ascii_case("help") => self.commands.clone(),
            [command] if PERSON_ARGUMENT.contains(&command.to_ascii_lowercase().as_str()) => self
                .session
                .list_people()
                .into_iter()
                .map(|person| person.name)
                .collect(),
            _ => return (word_start, Vec::new()),
        };

        let matches = pool
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
            .map(|candidate| shell_words::quote(&candidate).into_owned())
            .collect();
        (word_start, matches)
    }
}

impl Helper for LedgerHelper {}

impl Completer for LedgerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, found) = self.candidates(line, pos);
        let pairs = found
            .into_iter()
            .map(|replacement| Pair {
                display: replacement.trim_matches('\'').to_string(),
                replacement,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for LedgerHelper {
    type Hint = String;
}

impl Highlighter for LedgerHelper {}

impl Validator for LedgerHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    shell_words::split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse command: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;
    use crate::storage::memory::MemoryStore;

    #[test]
    fn quoted_arguments_stay_together() {
        let tokens = parse_command_line(r#"rename alice "Alice Smith""#).unwrap();
        assert_eq!(tokens, ["rename", "alice", "Alice Smith"]);
        assert!(parse_command_line("add \"unterminated").is_err());
    }

    fn helper_with_people(names: &[&str]) -> LedgerHelper {
        let session = Arc::new(LedgerSession::new(Arc::new(MemoryStore::new())));
        session.sign_in(&AccountId::new("local")).unwrap();
        for name in names {
            session.add_person(name).unwrap();
        }
        LedgerHelper::new(vec!["remove", "rename", "receive", "people", "help"], session)
    }

    #[test]
    fn first_word_completes_commands() {
        let helper = helper_with_people(&[]);
        let (start, names) = helper.candidates("re", 2);
        assert_eq!(start, 0);
        assert_eq!(names, ["receive", "remove", "rename"]);

        let (start, names) = helper.candidates("help pe", 7);
        assert_eq!(start, 5);
        assert_eq!(names, ["people"]);
    }

    #[test]
    fn person_arguments_complete_names_with_quoting() {
        let helper = helper_with_people(&["Alice Smith", "alfred", "Bob"]);
        let (start, names) = helper.candidates("rename al", 9);
        assert_eq!(start, 7);
        assert_eq!(names, ["alfred", "'Alice Smith'"]);

        let (_, names) = helper.candidates("rename Bob B", 12);
        assert!(names.is_empty());
        let (_, names) = helper.candidates("people b", 8);
        assert!(names.is_empty());
    }

    #[test]
    fn wide_whitespace_separates_words() {
        let helper = helper_with_people(&["Alice Smith", "alfred"]);
        let line = "rename\u{3000}al";
        let (start, names) = helper.candidates(line, line.len());
        assert_eq!(start, "rename\u{3000}".len());
        assert_eq!(names, ["alfred", "'Alice Smith'"]);

        let line = "re\u{a0}";
        let (start, names) = helper.candidates(line, line.len());
        assert_eq!(start, line.len());
        assert!(names.is_empty());
    }
}
