use std::collections::{HashMap, VecDeque};

use tracing::warn;

use crate::zones::{ZoneDebugCommand, ZoneId};

pub const MAX_PENDING_DEBUG_COMMANDS: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Local(LocalAction),
    Queueable(ZoneDebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    pub fn new(reason: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.into(),
        }
    }
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;
type BuiltinParse = fn(&[String]) -> Result<ParsedCommand, CommandParseError>;

struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl Default for ConsoleCommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandRegistry {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub fn with_zone_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, &str, BuiltinParse); 7] = [
            ("help", "List commands", "", parse_help_command),
            (
                "zone_discover",
                "Send a zone discovered event",
                "<zone_id>",
                parse_zone_discover_command,
            ),
            ("zone_unlock", "Unlock a zone", "<zone_id>", parse_zone_unlock_command),
            (
                "zone_connect",
                "Connect two zones",
                "<from> <to> [oneway]",
                parse_zone_connect_command,
            ),
            (
                "zone_travel",
                "Warp to a connected zone",
                "<zone_id>",
                parse_zone_travel_command,
            ),
            ("zone_dump", "Print the zone table and cache state", "", parse_zone_dump_command),
            ("gc", "Run an asset garbage collection sweep", "", parse_gc_command),
        ];
        for (name, help, arg_schema, parse) in builtins {
            if let Err(error) = registry.register(name, help, arg_schema, parse) {
                warn!(command = name, error = %error, "builtin_command_registration_failed");
            }
        }
        registry
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    /// Registration order.
    pub fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.specs.iter().map(|spec| {
            (
                spec.name.as_str(),
                spec.help.as_str(),
                spec.arg_schema.as_str(),
            )
        })
    }
}

/// Parses operator lines into zone debug commands. Output for each line is
/// returned directly; commands that act on the manager are queued until the
/// host drains them between ticks.
pub struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_debug_commands: VecDeque<ZoneDebugCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_zone_builtins(),
            pending_debug_commands: VecDeque::new(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut ConsoleCommandRegistry {
        &mut self.registry
    }

    pub fn drain_pending_debug_commands_into(&mut self, out: &mut Vec<ZoneDebugCommand>) {
        out.extend(self.pending_debug_commands.drain(..));
    }

    pub fn process_line(&mut self, raw_line: &str) -> Vec<String> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => return vec![format!("error: {reason}. usage: help")],
        };
        let Some((command_name, args)) = tokens.split_first() else {
            return Vec::new();
        };
        let Some(spec) = self.registry.lookup(command_name) else {
            return vec![format!(
                "error: unknown command '{}'. try: help",
                command_name
            )];
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(action),
            Ok(ParsedCommand::Queueable(command)) => {
                self.push_queueable(command);
                Vec::new()
            }
            Err(error) => vec![format!("error: {}. usage: {}", error.reason, error.usage)],
        }
    }

    fn apply_local_action(&self, action: LocalAction) -> Vec<String> {
        match action {
            LocalAction::Help => self
                .registry
                .iter_specs_in_order()
                .map(|(name, help, arg_schema)| {
                    if arg_schema.is_empty() {
                        format!("{name} - {help}")
                    } else {
                        format!("{name} {arg_schema} - {help}")
                    }
                })
                .collect(),
        }
    }

    fn push_queueable(&mut self, command: ZoneDebugCommand) {
        if self.pending_debug_commands.len() == MAX_PENDING_DEBUG_COMMANDS {
            self.pending_debug_commands.pop_front();
        }
        self.pending_debug_commands.push_back(command);
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending_token {
                    tokens.push(std::mem::take(&mut current));
                    pending_token = false;
                }
            }
            _ => {
                current.push(ch);
                pending_token = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if pending_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_zone_discover_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let zone = require_zone_id(args, "zone_discover <zone_id>")?;
    Ok(ParsedCommand::Queueable(ZoneDebugCommand::Discover(zone)))
}

fn parse_zone_unlock_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let zone = require_zone_id(args, "zone_unlock <zone_id>")?;
    Ok(ParsedCommand::Queueable(ZoneDebugCommand::Unlock(zone)))
}

fn parse_zone_travel_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let zone = require_zone_id(args, "zone_travel <zone_id>")?;
    Ok(ParsedCommand::Queueable(ZoneDebugCommand::Travel(zone)))
}

fn parse_zone_connect_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "zone_connect <from> <to> [oneway]";
    let (from, to, bidirectional) = match args {
        [from, to] => (from, to, true),
        [from, to, mode] if mode.eq_ignore_ascii_case("oneway") => (from, to, false),
        [_, _, mode] => {
            return Err(CommandParseError::new(
                format!("unknown connection mode '{mode}' (expected oneway)"),
                USAGE,
            ));
        }
        _ => {
            return Err(CommandParseError::new(
                "expected <from> <to> [oneway]",
                USAGE,
            ));
        }
    };
    if from == to {
        return Err(CommandParseError::new(
            "cannot connect a zone to itself",
            USAGE,
        ));
    }
    Ok(ParsedCommand::Queueable(ZoneDebugCommand::Connect {
        from: ZoneId::new(from.as_str()),
        to: ZoneId::new(to.as_str()),
        bidirectional,
    }))
}

fn parse_zone_dump_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "zone_dump")?;
    Ok(ParsedCommand::Queueable(ZoneDebugCommand::Dump))
}

fn parse_gc_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "gc")?;
    Ok(ParsedCommand::Queueable(ZoneDebugCommand::CollectGarbage))
}

fn require_zone_id(args: &[String], usage: &str) -> Result<ZoneId, CommandParseError> {
    match args {
        [zone] if !zone.trim().is_empty() => Ok(ZoneId::new(zone.as_str())),
        _ => Err(CommandParseError::new(
            "expected exactly one argument <zone_id>",
            usage,
        )),
    }
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}
