//! Interactive prompt loop.
//!
//! Reads one line at a time with rustyline, dispatches it to the session,
//! and persists history to `~/.seriesdb_history`. The `history` command is
//! handled here because it needs the editor.

use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::history::{History, SearchDirection};
use rustyline::DefaultEditor;

use crate::session::{Outcome, Session};

pub struct Repl {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new() -> anyhow::Result<Self> {
        let mut editor = DefaultEditor::new()?;

        let history_path = dirs_next::home_dir().map(|home| home.join(".seriesdb_history"));
        if let Some(path) = &history_path {
            // A missing history file on first run is fine.
            let _ = editor.load_history(path);
        }

        Ok(Repl {
            editor,
            history_path,
        })
    }

    /// Read commands until exit, interrupt, or end of input.
    pub fn run(&mut self, session: &mut Session) -> anyhow::Result<()> {
        loop {
            match self.editor.readline("> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let lower = trimmed.to_lowercase();
                    let outcome = if lower.split_whitespace().next() == Some("history") {
                        self.print_history();
                        Outcome::Continue
                    } else {
                        session.handle(&line)
                    };

                    self.editor.add_history_entry(trimmed).ok();
                    if outcome == Outcome::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("ERR: {e}");
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn print_history(&self) {
        let history = self.editor.history();
        for i in 0..history.len() {
            if let Ok(Some(found)) = history.get(i, SearchDirection::Forward) {
                println!("{}", found.entry);
            }
        }
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.save_history(path) {
                eprintln!("There was an error writing history file: {e}");
            }
        }
    }
}
