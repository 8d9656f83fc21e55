//! # Command Parsing Module
//!
//! Turns raw chat text into a [`Command`]. Messages addressed to the bot
//! look like `orderbot: <command>: <arguments>`; the text is split on `:`
//! into at most three segments. A message that is a single word is either
//! a confirmation (`yes`/`y`/`no`/`n`) or a stray reply; everything else is
//! ordinary channel chatter and parses to [`Command::NoMatch`].
//!
//! Patterns are compiled once, when the parser is built, and parsing never
//! touches the store.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// What a `list` command asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListTarget {
    All,
    /// Restaurant name as typed, not yet resolved through the directory
    Restaurant(String),
}

/// A parsed chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add: <restaurant>: <entree>`
    Add { restaurant: String, entree: String },
    /// `add` without a colon-separated restaurant and entree
    MalformedAdd,
    Delete,
    Status,
    List(ListTarget),
    Help,
    /// Terse `yes`/`no` answer; `true` for yes
    Confirm(bool),
    /// Any other single-word message
    Reply(String),
    NoMatch,
}

lazy_static! {
    static ref CONFIRM_REGEX: Regex =
        Regex::new(r"(?i)^(?:(?P<yes>yes|y)|no|n)$").expect("Confirmation pattern should be valid");
    static ref SINGLE_WORD_REGEX: Regex =
        Regex::new(r"^\S+$").expect("Single word pattern should be valid");
}

/// Parser bound to one bot prefix
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
    /// `<prefix>: <command>[: <rest>]`
    command_pattern: Regex,
    /// `<prefix> help` with any of the looser separators
    help_pattern: Regex,
}

impl CommandParser {
    /// Create a parser for the given bot prefix
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orderbot::command::{Command, CommandParser};
    ///
    /// let parser = CommandParser::new("orderbot")?;
    /// assert_eq!(parser.parse("OrderBot: status"), Command::Status);
    /// # Ok::<(), regex::Error>(())
    /// ```
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let prefix = prefix.trim().to_lowercase();
        let escaped = regex::escape(&prefix);

        let command_pattern = Regex::new(&format!(
            r"(?is)^@?{escaped}\s*:(?P<command>[^:]*)(?::(?P<rest>.*))?$"
        ))?;
        let help_pattern = Regex::new(&format!(r"(?i)^@?{escaped}\s*[,.\- ;]\s*(?:help|\?)$"))?;

        Ok(Self {
            prefix,
            command_pattern,
            help_pattern,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parse one raw message
    pub fn parse(&self, raw: &str) -> Command {
        let text = raw.trim().to_lowercase();
        let command = self.parse_normalized(&text);
        debug!(command = ?command, "Parsed message");
        command
    }

    fn parse_normalized(&self, text: &str) -> Command {
        if let Some(caps) = CONFIRM_REGEX.captures(text) {
            return Command::Confirm(caps.name("yes").is_some());
        }

        if let Some(caps) = self.command_pattern.captures(text) {
            let token = caps.name("command").map_or("", |m| m.as_str().trim());
            let rest = caps.name("rest").map(|m| m.as_str().trim());
            return parse_command_token(token, rest);
        }

        if self.help_pattern.is_match(text) {
            return Command::Help;
        }

        if SINGLE_WORD_REGEX.is_match(text) {
            return Command::Reply(text.to_string());
        }

        Command::NoMatch
    }
}

fn parse_command_token(token: &str, rest: Option<&str>) -> Command {
    match token {
        "add" => parse_add(rest),
        "delete" => Command::Delete,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "list" => match rest {
            None | Some("") | Some("all") => Command::List(ListTarget::All),
            Some(name) => Command::List(ListTarget::Restaurant(name.to_string())),
        },
        _ => Command::NoMatch,
    }
}

fn parse_add(rest: Option<&str>) -> Command {
    let Some((restaurant, entree)) = rest.and_then(|r| r.split_once(':')) else {
        return Command::MalformedAdd;
    };

    let (restaurant, entree) = (restaurant.trim(), entree.trim());
    if restaurant.is_empty() || entree.is_empty() {
        return Command::MalformedAdd;
    }

    Command::Add {
        restaurant: restaurant.to_string(),
        entree: entree.to_string(),
    }
}
