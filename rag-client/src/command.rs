use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  upload <path>        upload and index a PDF (or .txt/.md)
  docs                 list uploaded documents
  select <filename>    query only this document
  all on|off           search all documents (ignore selection)
  ask <question>       ask a question (bare text works too)
  clear                reset the session
  help                 show this help
  quit                 exit";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Upload(PathBuf),
    Docs,
    Select(String),
    All(bool),
    Ask(String),
    Clear,
    Help,
    Quit,
    Empty,
}

impl Command {
    /// Parse one input line. Unknown words are treated as a question.
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };
        let need = |what: &str| {
            if rest.is_empty() {
                Err(format!("usage: {head} <{what}>"))
            } else {
                Ok(rest.to_string())
            }
        };

        match head.to_ascii_lowercase().as_str() {
            "upload" => need("path").map(|p| Command::Upload(PathBuf::from(p))),
            "docs" => Ok(Command::Docs),
            "select" => need("filename").map(Command::Select),
            "all" => match rest.to_ascii_lowercase().as_str() {
                "on" => Ok(Command::All(true)),
                "off" => Ok(Command::All(false)),
                _ => Err("usage: all on|off".into()),
            },
            "ask" => need("question").map(Command::Ask),
            "clear" => Ok(Command::Clear),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Ok(Command::Ask(line.to_string())),
        }
    }
}
