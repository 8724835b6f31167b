//! `!`-command registry and dispatcher.
//!
//! The registry is a fixed table built once at startup: each token is bound to a
//! [`CommandKind`] variant, and dispatch is a `match` on that variant.

use rand::RngCore;
use tracing::debug;

use crate::{router::Command, stats::BotState};

mod handlers;

pub use handlers::HELP_TEXT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Help,
    Ping,
    Time,
    Status,
    Rooms,
    Stats,
    Joke,
    Weather,
    Calc,
    Quote,
}

#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub token: &'static str,
    pub kind: CommandKind,
    pub help: &'static str,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        token: "!help",
        kind: CommandKind::Help,
        help: "Show this help message",
    },
    CommandSpec {
        token: "!ping",
        kind: CommandKind::Ping,
        help: "Test bot responsiveness",
    },
    CommandSpec {
        token: "!time",
        kind: CommandKind::Time,
        help: "Show current server time",
    },
    CommandSpec {
        token: "!status",
        kind: CommandKind::Status,
        help: "Display bot status",
    },
    CommandSpec {
        token: "!rooms",
        kind: CommandKind::Rooms,
        help: "List bot's rooms",
    },
    CommandSpec {
        token: "!stats",
        kind: CommandKind::Stats,
        help: "Show bot statistics",
    },
    CommandSpec {
        token: "!joke",
        kind: CommandKind::Joke,
        help: "Tell a random joke",
    },
    CommandSpec {
        token: "!weather",
        kind: CommandKind::Weather,
        help: "Weather information (demo)",
    },
    CommandSpec {
        token: "!calc",
        kind: CommandKind::Calc,
        help: "Simple calculator",
    },
    CommandSpec {
        token: "!quote",
        kind: CommandKind::Quote,
        help: "Inspirational quote",
    },
];

/// Everything a handler may look at.
pub struct Invocation<'a> {
    pub args: &'a str,
    pub sender: &'a str,
    pub state: &'a BotState,
}

/// Immutable token → handler table.
#[derive(Clone, Debug)]
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            specs: COMMANDS.to_vec(),
        }
    }

    pub fn specs(&self) -> &[CommandSpec] {
        &self.specs
    }

    /// Exact, case-insensitive token lookup.
    pub fn lookup(&self, token: &str) -> Option<&CommandSpec> {
        self.specs
            .iter()
            .find(|s| s.token.eq_ignore_ascii_case(token))
    }

    /// Run a command and produce the reply text.
    ///
    /// Unknown tokens get a fixed fallback reply; nothing here fails.
    pub fn dispatch(&self, cmd: &Command, state: &BotState, rng: &mut dyn RngCore) -> String {
        let Some(spec) = self.lookup(&cmd.token) else {
            debug!(token = %cmd.token, "unknown command");
            return unknown_command_reply(&cmd.token);
        };

        state.stats.record_command();
        debug!(token = spec.token, sender = %cmd.sender, "dispatching command");

        let inv = Invocation {
            args: &cmd.args,
            sender: &cmd.sender.0,
            state,
        };
        handlers::run(spec.kind, &inv, rng)
    }
}

pub fn unknown_command_reply(token: &str) -> String {
    format!(
        "🤔 Unknown command: {}\nType !help for available commands.",
        token.to_lowercase()
    )
}
