//! Command-line parsing for pipe streams.
//!
//! A command is split on spaces, tabs and newlines. A lone `<` or `>` token
//! marks the next token as the file to attach to the program's standard
//! input or output; every other token is an argument. There is no quoting.

use crate::error::StreamError;

const DELIMITERS: &[char] = &[' ', '\t', '\n'];

/// A parsed command ready to be executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name followed by its arguments. Never empty.
    pub argv: Vec<String>,
    /// File to open read-only onto standard input (`< file`).
    pub stdin_from: Option<String>,
    /// File to create/truncate onto standard output (`> file`).
    pub stdout_to: Option<String>,
}

impl CommandLine {
    /// Program to execute (looked up on `PATH`).
    pub fn program(&self) -> &str {
        &self.argv[0]
    }
}

/// Split a command line into arguments and redirections.
///
/// A repeated redirection keeps the last file name.
pub fn parse_command(command: &str) -> Result<CommandLine, StreamError> {
    let mut parsed = CommandLine::default();
    let mut tokens = command.split(DELIMITERS).filter(|t| !t.is_empty());

    while let Some(token) = tokens.next() {
        match token {
            "<" => parsed.stdin_from = Some(redirect_target(&mut tokens, '<')?),
            ">" => parsed.stdout_to = Some(redirect_target(&mut tokens, '>')?),
            arg => parsed.argv.push(arg.to_owned()),
        }
    }

    if parsed.argv.is_empty() {
        return Err(StreamError::EmptyCommand);
    }
    Ok(parsed)
}

fn redirect_target<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    op: char,
) -> Result<String, StreamError> {
    match tokens.next() {
        Some(name) if name != "<" && name != ">" => Ok(name.to_owned()),
        _ => Err(StreamError::MissingRedirectTarget(op)),
    }
}
