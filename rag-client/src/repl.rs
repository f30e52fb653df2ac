//! Read-eval-print loop over [`ApiClient`].

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::api_types::QueryReply;
use crate::client::ApiClient;
use crate::command::{Command, HELP};
use crate::error::ClientError;
use crate::state::UiState;

pub const EMPTY_ANSWER_HINT: &str =
    "Empty response. Try `all on` to search all documents, or re-upload to refresh metadata.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Repl<W: Write> {
    client: ApiClient,
    state: UiState,
    out: W,
}

impl<W: Write> Repl<W> {
    pub fn new(client: ApiClient, out: W) -> Self {
        Self {
            client,
            state: UiState::default(),
            out,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Read commands until EOF or `quit`.
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        writeln!(self.out, "Connected to {}. Type `help` for commands.", self.client.base_url())?;
        let mut lines = input.lines();
        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let cmd = match Command::parse(&line) {
                Ok(c) => c,
                Err(usage) => {
                    writeln!(self.out, "{usage}")?;
                    continue;
                }
            };
            match self.handle(cmd).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    warn!(error = %e, "command failed");
                    writeln!(self.out, "error: {e}")?;
                }
            }
        }
        Ok(())
    }

    pub async fn handle(&mut self, cmd: Command) -> Result<Flow, ClientError> {
        match cmd {
            Command::Empty => {}
            Command::Help => self.say(HELP)?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Clear => {
                self.state.clear();
                self.say("session cleared")?;
            }
            Command::Docs => self.list_docs()?,
            Command::Select(name) => match self.state.select(&name) {
                Ok(()) => self.say(&format!("selected {name}"))?,
                Err(msg) => self.say(&msg)?,
            },
            Command::All(on) => {
                self.state.set_search_all(on);
                let scope = if on { "all documents" } else { "selected document" };
                self.say(&format!("searching {scope}"))?;
            }
            Command::Upload(path) => {
                let reply = self.client.upload(&path).await?;
                let fallback = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let filename = reply.filename.clone().unwrap_or(fallback);
                match (&reply.doc_id, &reply.message) {
                    (Some(id), _) => self.say(&format!(
                        "uploaded & indexed: {filename} (doc_id {id}, {} chunks)",
                        reply.chunks.unwrap_or_default()
                    ))?,
                    (None, Some(msg)) => self.say(msg)?,
                    (None, None) => self.say(&format!("uploaded: {filename}"))?,
                }
                self.state.record_upload(&filename, reply.doc_id);
            }
            Command::Ask(question) => {
                if self.state.docs().is_empty() && !self.state.search_all() {
                    self.say("no uploads in this session; searching all documents")?;
                }
                let reply = self.client.query(&question, self.state.query_source()).await?;
                self.show_answer(&reply)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn say(&mut self, msg: &str) -> std::io::Result<()> {
        writeln!(self.out, "{msg}")
    }

    fn list_docs(&mut self) -> std::io::Result<()> {
        if self.state.docs().is_empty() {
            return self.say("Upload at least one PDF to start querying.");
        }
        let selected = self.state.selected();
        for d in self.state.docs() {
            let mark = if selected == Some(d.filename.as_str()) { "*" } else { " " };
            let id = d.doc_id.as_deref().unwrap_or("(queued)");
            writeln!(self.out, "{mark} {}  {id}", d.filename)?;
        }
        if self.state.search_all() {
            self.say("(searching all documents)")?;
        }
        Ok(())
    }

    fn show_answer(&mut self, reply: &QueryReply) -> std::io::Result<()> {
        if reply.answer.trim().is_empty() {
            return self.say(EMPTY_ANSWER_HINT);
        }
        writeln!(self.out, "\n{}\n", reply.answer.trim())?;
        if reply.is_empty() {
            self.say(EMPTY_ANSWER_HINT)?;
        }
        for s in &reply.sources {
            match &s.page {
                Some(p) => writeln!(self.out, "  - {} (p. {p})", s.filename)?,
                None => writeln!(self.out, "  - {}", s.filename)?,
            }
        }
        if let Some(c) = reply.confidence {
            writeln!(self.out, "  confidence {c:.2}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::SourceRef;
    use crate::client::DEFAULT_TIMEOUT;

    fn repl() -> Repl<Vec<u8>> {
        // Never contacted by these tests.
        let client = ApiClient::new("http://127.0.0.1:9", None, DEFAULT_TIMEOUT).unwrap();
        Repl::new(client, Vec::new())
    }

    fn output(r: &Repl<Vec<u8>>) -> String {
        String::from_utf8_lossy(&r.out).into_owned()
    }

    #[tokio::test]
    async fn local_commands_update_state() {
        let mut r = repl();
        r.state.record_upload("a.pdf", Some("d1".into()));
        r.state.record_upload("b.pdf", None);

        r.handle(Command::Select("a.pdf".into())).await.unwrap();
        assert_eq!(r.state().query_source(), Some("a.pdf"));

        r.handle(Command::Docs).await.unwrap();
        let out = output(&r);
        assert!(out.contains("* a.pdf  d1"));
        assert!(out.contains("  b.pdf  (queued)"));

        r.handle(Command::All(true)).await.unwrap();
        assert_eq!(r.state().query_source(), None);

        r.handle(Command::Clear).await.unwrap();
        assert!(r.state().docs().is_empty());
        assert_eq!(r.handle(Command::Quit).await.unwrap(), Flow::Quit);
    }

    #[test]
    fn empty_answers_get_the_hint() {
        let mut r = repl();
        let reply = QueryReply {
            query: "q".into(),
            answer: "No relevant information was found in the indexed documents.".into(),
            doc_id: None,
            source: Some("a.pdf".into()),
            sources: vec![],
            confidence: None,
        };
        r.show_answer(&reply).unwrap();
        assert!(output(&r).contains(EMPTY_ANSWER_HINT));

        let mut r = repl();
        let reply = QueryReply {
            answer: "Revenue grew 12%.".into(),
            sources: vec![SourceRef {
                filename: "a.pdf".into(),
                page: Some("4".into()),
            }],
            confidence: Some(0.9),
            ..reply
        };
        r.show_answer(&reply).unwrap();
        let out = output(&r);
        assert!(!out.contains(EMPTY_ANSWER_HINT));
        assert!(out.contains("a.pdf (p. 4)"));
        assert!(out.contains("confidence 0.90"));
    }

    #[tokio::test]
    async fn run_stops_at_quit_and_reports_usage() {
        let mut r = repl();
        let input: &[u8] = b"all sideways\nall on\nquit\nhelp\n";
        r.run(input).await.unwrap();
        let out = output(&r);
        assert!(out.contains("usage: all on|off"));
        assert!(out.contains("searching all documents"));
        assert!(!out.contains("commands:"));
    }
}
