// src/cli.rs
//! Terminal front end: command parsing and plain-text rendering of the session.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::models::{Chat, ChatId, Message, Role};
use crate::session::attachments::FileAttachment;

pub const HELP: &str = "\
Commands:
  login <email>          log in (password is prompted)
  signup <email>         create an account
  logout                 forget the stored login
  chats                  list chats
  new                    start a new chat
  open <n>               open chat number n
  delete <n>             delete chat number n
  rename <n> <title>     rename chat number n
  attach <path>          stage a file for the next message (\"quote paths\" with spaces)
  detach <n>             unstage file number n
  url <url>              stage a URL for the next message
  unurl <n>              unstage URL number n
  show                   print the open chat
  help                   this text
  quit                   exit
Anything else, including a command word followed by other text, is sent as a
message to the open chat.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Login { email: String },
    Signup { email: String },
    Logout,
    Chats,
    New,
    Open(usize),
    Delete(usize),
    Rename { index: usize, title: String },
    Attach(PathBuf),
    Detach(usize),
    Url(String),
    Unurl(usize),
    Show,
    Quit,
    Send(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

/// 1-based position as typed by the user, turned into a 0-based index.
fn position(arg: &str, what: &str) -> Result<usize, ParseError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError(format!("Expected a {} number, got {:?}", what, arg))),
    }
}

fn is_number(arg: &str) -> bool {
    !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit())
}

fn is_word(arg: &str) -> bool {
    !arg.is_empty() && !arg.contains(char::is_whitespace)
}

/// A single-word path, or a double-quoted one that may contain spaces.
fn attachment_path(arg: &str) -> Option<PathBuf> {
    let quoted = arg
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .filter(|a| !a.trim().is_empty());
    match quoted {
        Some(inner) => Some(PathBuf::from(inner)),
        None if is_word(arg) => Some(PathBuf::from(arg)),
        None => None,
    }
}

fn usage(word: &str) -> ParseError {
    let usage = match word {
        "login" => "login <email>",
        "signup" => "signup <email>",
        "open" => "open <n>",
        "delete" => "delete <n>",
        "rename" => "rename <n> <title>",
        "attach" => "attach <path>",
        "detach" => "detach <n>",
        "url" => "url <url>",
        _ => "unurl <n>",
    };
    ParseError(format!("Usage: {}", usage))
}

impl Command {
    /// Parse one input line. A command word followed by something that is not its
    /// argument is a message, so "show me the sources" is sent rather than run.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(Command::Empty);
        }

        let trimmed = line.trim();
        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (trimmed, ""),
        };

        let command = match (word, rest) {
            ("help" | "?", "") => Command::Help,
            ("logout", "") => Command::Logout,
            ("chats", "") => Command::Chats,
            ("new", "") => Command::New,
            ("show", "") => Command::Show,
            ("quit" | "exit", "") => Command::Quit,
            (
                "login" | "signup" | "open" | "delete" | "rename" | "attach" | "detach" | "url"
                | "unurl",
                "",
            ) => return Err(usage(word)),
            ("login", email) if is_word(email) => Command::Login {
                email: email.to_string(),
            },
            ("signup", email) if is_word(email) => Command::Signup {
                email: email.to_string(),
            },
            ("open", n) if is_number(n) => Command::Open(position(n, "chat")?),
            ("delete", n) if is_number(n) => Command::Delete(position(n, "chat")?),
            ("detach", n) if is_number(n) => Command::Detach(position(n, "file")?),
            ("unurl", n) if is_number(n) => Command::Unurl(position(n, "URL")?),
            ("rename", args) => match args.split_once(char::is_whitespace) {
                Some((n, title)) if is_number(n) => Command::Rename {
                    index: position(n, "chat")?,
                    title: title.trim().to_string(),
                },
                None if is_number(args) => return Err(usage(word)),
                _ => Command::Send(line.to_string()),
            },
            ("attach", path) => match attachment_path(path) {
                Some(path) => Command::Attach(path),
                None => Command::Send(line.to_string()),
            },
            ("url", url) if is_word(url) => Command::Url(url.to_string()),
            _ => Command::Send(line.to_string()),
        };
        Ok(command)
    }
}

pub fn render_chats(chats: &[Chat], active: Option<ChatId>) -> String {
    if chats.is_empty() {
        return "No chats yet".to_string();
    }
    let mut out = String::new();
    for (i, chat) in chats.iter().enumerate() {
        let marker = if Some(chat.id) == active { '*' } else { ' ' };
        let _ = writeln!(out, "{} {:>2}. {}", marker, i + 1, chat.title);
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn render_message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "bot",
    };
    let mut out = format!("{}> {}", speaker, message.text);
    if !message.sources.is_empty() {
        out.push_str("\n     sources:");
        for source in &message.sources {
            let _ = write!(out, "\n       - {}", source);
        }
    }
    out
}

pub fn render_log(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Staged files and URLs, numbered for `detach` and `unurl`. Empty when nothing is staged.
pub fn render_attachments(files: &[FileAttachment], urls: &[String]) -> String {
    let mut out = String::new();
    for (i, file) in files.iter().enumerate() {
        let _ = writeln!(out, "  [file {}] {} ({} bytes)", i + 1, file.name, file.size());
    }
    for (i, url) in urls.iter().enumerate() {
        let _ = writeln!(out, "  [url {}] {}", i + 1, url);
    }
    out.truncate(out.trim_end().len());
    out
}
