//! Command-line interface for game-session.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::session::NetworkMode;

/// What the demo binary should do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    /// Refresh and print the server list.
    #[default]
    List,
    /// Host a session with this display name.
    Host(String),
    /// Refresh, then join the result at this index.
    Join(usize),
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Action to run.
    pub action: Action,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Force LAN or online sessions.
    pub network_mode: Option<NetworkMode>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('n') | Long("name") => {
                result.action = Action::Host(parser.value()?.parse()?);
            }
            Short('j') | Long("join") => {
                let value: String = parser.value()?.parse()?;
                let index = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("join", value))?;
                result.action = Action::Join(index);
            }
            Long("list") => {
                result.action = Action::List;
            }
            Long("lan") => {
                result.network_mode = Some(NetworkMode::Lan);
            }
            Long("online") => {
                result.network_mode = Some(NetworkMode::Online);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"game-session {version}
Online session lifecycle coordinator for multiplayer game clients

USAGE:
    game-session [OPTIONS]

OPTIONS:
    -n, --name <NAME>       Host a session advertised as NAME
    -j, --join <INDEX>      Search, then join the server at INDEX
        --list              Search and print the server list [default]
        --lan               Host and search on the local network
        --online            Host and search through the online service
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    GAME_SESSION_NAME           Named session key (overrides config)
    GAME_SESSION_NETWORK_MODE   auto, lan or online (overrides config)
    GAME_SESSION_MAX_RESULTS    Search result cap (overrides config)
    GAME_SESSION_LOG_LEVEL      Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    # List advertised servers
    game-session

    # Host a LAN game
    game-session --lan -n "Alice's Game"

    # Join the second server in the list
    game-session -j 1
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("game-session {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
