use std::{io, sync::Arc};

use dialoguer::theme::ColorfulTheme;
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;

use crate::{
    config::{Config, ConfigError, ConfigManager},
    core::{Clock, IdentityContext, LedgerSession, SystemClock},
    domain::{AccountId, Person, PersonId, Transaction},
    errors::LedgerError,
    storage::{JsonFileStore, StoreError},
};

use super::commands;
use super::io as cli_io;
use super::registry::{CommandEntry, CommandRegistry};

/// Environment variable that switches the shell to line-by-line stdin processing.
pub const SCRIPT_ENV: &str = "PEOPLE_LEDGER_CLI_SCRIPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

impl CliMode {
    pub fn from_env() -> Self {
        if std::env::var_os(SCRIPT_ENV).is_some() {
            CliMode::Script
        } else {
            CliMode::Interactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not open ledger data: {0}")]
    Storage(#[from] StoreError),
    #[error("{0}")]
    Command(String),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub type CommandResult = Result<(), CommandError>;

/// State shared by every command handler for the lifetime of the shell.
pub struct ShellContext {
    pub(crate) mode: CliMode,
    pub(crate) running: bool,
    pub(crate) registry: CommandRegistry,
    pub(crate) session: Arc<LedgerSession>,
    pub(crate) identity: IdentityContext,
    pub(crate) config_manager: ConfigManager,
    pub(crate) config: Config,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) theme: ColorfulTheme,
    pub(crate) last_command: Option<String>,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_manager(mode, ConfigManager::new())
    }

    /// Builds a shell whose config and data live under `config_manager`'s directory.
    pub fn with_manager(mode: CliMode, config_manager: ConfigManager) -> Result<Self, CliError> {
        let config = config_manager.load()?;
        let store = Arc::new(JsonFileStore::open(config_manager.data_file())?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let session = Arc::new(
            LedgerSession::new(store)
                .with_clock(Arc::clone(&clock))
                .with_max_people(config.max_people),
        );
        let identity = IdentityContext::signed_in(config.account.as_str());
        session.follow(&identity);

        let mut registry = CommandRegistry::new();
        for entry in commands::all_definitions() {
            registry.register(entry);
        }

        Ok(Self {
            mode,
            running: true,
            registry,
            session,
            identity,
            config_manager,
            config,
            clock,
            theme: ColorfulTheme::default(),
            last_command: None,
        })
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn prompt(&self) -> String {
        let account = self
            .session
            .account()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "signed out".into());
        match self.session.get_active_person() {
            Some(person) => format!("people_ledger [{account}:{}]> ", person.name),
            None => format!("people_ledger [{account}]> "),
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match super::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                cli_io::print_warning(err);
                return Ok(LoopControl::Continue);
            }
        };
        let Some((raw, rest)) = tokens.split_first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        self.last_command = Some(line.trim().to_string());
        let control = self.dispatch(&command, raw, &args)?;
        if control == LoopControl::Exit {
            self.running = false;
        }
        Ok(control)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, prompt, false)
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(cli_io::confirm_action(&self.theme, "Exit shell?", true)?)
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(message);
                cli_io::print_hint("Use `help <command>` for usage details.");
            }
            CommandError::Ledger(LedgerError::SignedOut) => {
                cli_io::print_error(LedgerError::SignedOut);
                cli_io::print_hint("Sign in with `account <id>`.");
            }
            other => cli_io::print_error(other),
        }
    }

    /// Resolves a person by id, case-insensitive name, or unique id prefix.
    pub(crate) fn resolve_person(&self, reference: &str) -> Result<Person, CommandError> {
        let people = self.session.people_by_creation();
        if let Some(found) = people.iter().find(|p| p.id.as_str() == reference) {
            return Ok(found.clone());
        }
        if let Some(found) = people.iter().find(|p| p.matches_name(reference)) {
            return Ok(found.clone());
        }
        unique_prefix(&people, reference, |p| p.id.as_str())
            .ok_or_else(|| CommandError::Message(format!("No person matches `{reference}`.")))
    }

    /// The person named in `args[0]`, or the active person when no argument was given.
    pub(crate) fn person_or_active(&self, args: &[&str]) -> Result<Person, CommandError> {
        match args.first() {
            Some(reference) => self.resolve_person(reference),
            None => self.active_person(),
        }
    }

    pub(crate) fn active_person(&self) -> Result<Person, CommandError> {
        self.session.get_active_person().ok_or_else(|| {
            CommandError::Message("No active person. Use `use <person>` first.".into())
        })
    }

    /// Resolves a transaction by full id or unique id prefix.
    pub(crate) fn resolve_transaction(&self, reference: &str) -> Result<Transaction, CommandError> {
        let people: Vec<PersonId> = self
            .session
            .people_by_creation()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let transactions: Vec<Transaction> = people
            .iter()
            .flat_map(|id| self.session.list_transactions(id))
            .collect();
        if let Some(found) = transactions.iter().find(|t| t.id.as_str() == reference) {
            return Ok(found.clone());
        }
        unique_prefix(&transactions, reference, |t| t.id.as_str()).ok_or_else(|| {
            CommandError::Message(format!("No single transaction matches `{reference}`."))
        })
    }

    pub(crate) fn switch_account(&mut self, account: &str) -> CommandResult {
        let account = account.trim();
        if account.is_empty() {
            return Err(CommandError::InvalidArguments(
                "Account id cannot be empty.".into(),
            ));
        }
        self.identity.sign_in(AccountId::new(account));
        if self.session.account().is_none() {
            return Err(CommandError::Message(format!(
                "Could not open account `{account}`."
            )));
        }
        self.config.account = account.to_string();
        self.config_manager.save(&self.config)?;
        Ok(())
    }
}

fn unique_prefix<T: Clone>(items: &[T], prefix: &str, id: impl Fn(&T) -> &str) -> Option<T> {
    if prefix.is_empty() {
        return None;
    }
    let mut matches = items.iter().filter(|item| id(item).starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(found), None) => Some(found.clone()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn process_script(
    manager: ConfigManager,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut context = ShellContext::with_manager(CliMode::Script, manager)?;
    for line in lines {
        match context.process_line(line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err),
        }
    }
    Ok(context)
}
