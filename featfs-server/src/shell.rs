//! Line-oriented command shell over a mounted namespace
//!
//! Stands in for a kernel VFS: every command maps onto one namespace
//! operation and failures are reported with their errno.

use std::sync::Arc;

use featfs_utils::{FeatfsError, Result};

use crate::namespace::NodeKind;
use crate::service::{FeatureFs, WriteMode};

pub const HELP: &str = "\
commands:
  ls [path]             list a directory
  cat <path>            print a file
  write <path> <data>   replace a file's content
  append <path> <data>  add values to a parameter file
  mkdir <path>          create a config under /configs
  rmdir <path>          remove a config
  tree [path]           print the namespace below path
  dump                  print every config as JSON
  help                  show this text
  quit                  leave the shell
";

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(String),
    Cat(String),
    Write {
        path: String,
        data: String,
        mode: WriteMode,
    },
    Mkdir(String),
    Rmdir(String),
    Tree(String),
    Dump,
    Help,
    Quit,
}

impl Command {
    /// Parse one line; blank lines and `#` comments yield `None`
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = split_word(line);
        let (path, data) = split_word(rest);

        let command = match verb {
            "ls" => Command::List(or_root(path)),
            "tree" => Command::Tree(or_root(path)),
            "cat" => Command::Cat(required(verb, path)?),
            "mkdir" => Command::Mkdir(required(verb, path)?),
            "rmdir" => Command::Rmdir(required(verb, path)?),
            "write" | "append" => Command::Write {
                path: required(verb, path)?,
                data: data.to_string(),
                mode: if verb == "append" {
                    WriteMode::Append
                } else {
                    WriteMode::Replace
                },
            },
            "dump" => Command::Dump,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(FeatfsError::invalid_input(format!(
                    "unknown command {:?}, try help",
                    other
                )))
            }
        };
        Ok(Some(command))
    }
}

/// What the caller should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Print(String),
    Quit,
}

pub struct Shell {
    fs: Arc<FeatureFs>,
}

impl Shell {
    pub fn new(fs: Arc<FeatureFs>) -> Self {
        Self { fs }
    }

    pub fn execute(&self, command: Command) -> Result<Outcome> {
        let out = match command {
            Command::List(path) => self
                .fs
                .list(&path)?
                .into_iter()
                .map(|e| match e.kind {
                    NodeKind::Dir => format!("{}/\n", e.name),
                    NodeKind::File => format!("{}\n", e.name),
                })
                .collect(),
            Command::Cat(path) => self.fs.read(&path)?,
            Command::Write { path, data, mode } => {
                let n = self.fs.write(&path, data.as_bytes(), mode)?;
                tracing::debug!("Wrote {} bytes to {}", n, path);
                String::new()
            }
            Command::Mkdir(path) => {
                self.fs.mkdir(&path)?;
                String::new()
            }
            Command::Rmdir(path) => {
                self.fs.rmdir(&path)?;
                String::new()
            }
            Command::Tree(path) => {
                let mut out = format!("{}\n", path);
                self.render_tree(&path, 1, &mut out)?;
                out
            }
            Command::Dump => {
                let mut json = serde_json::to_string_pretty(&self.fs.snapshot())
                    .map_err(|e| FeatfsError::internal(e.to_string()))?;
                json.push('\n');
                json
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Print(out))
    }

    /// Parse and run one line
    pub fn run_line(&self, line: &str) -> Result<Option<Outcome>> {
        match Command::parse(line)? {
            Some(command) => self.execute(command).map(Some),
            None => Ok(None),
        }
    }

    fn render_tree(&self, path: &str, depth: usize, out: &mut String) -> Result<()> {
        for entry in self.fs.list(path)? {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&entry.name);
            if entry.kind == NodeKind::Dir {
                out.push_str("/\n");
                let child = format!("{}/{}", path.trim_end_matches('/'), entry.name);
                self.render_tree(&child, depth + 1, out)?;
            } else {
                out.push('\n');
            }
        }
        Ok(())
    }
}

/// Log a failed command and render the line printed for it
///
/// Caller mistakes are logged as warnings; failures of the service or of a
/// feature as errors.
pub fn report_failure(line_no: usize, err: &FeatfsError) -> String {
    if err.is_user_error() {
        tracing::warn!(line = line_no, "Command rejected: {}", err);
    } else {
        tracing::error!(line = line_no, "Command failed: {}", err);
    }
    format!("featfs: line {}: {} (errno {})", line_no, err, err.errno())
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn or_root(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn required(verb: &str, path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(FeatfsError::invalid_input(format!("{} needs a path", verb)));
    }
    Ok(path.to_string())
}
