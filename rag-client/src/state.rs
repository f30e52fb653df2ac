//! Session state of the REPL.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocEntry {
    pub filename: String,
    /// `None` when the upload was queued in background mode.
    pub doc_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UiState {
    docs: Vec<DocEntry>,
    selected: Option<String>,
    search_all: bool,
}

impl UiState {
    pub fn docs(&self) -> &[DocEntry] {
        &self.docs
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn search_all(&self) -> bool {
        self.search_all
    }

    /// Remember an upload and make it the selection. Re-uploading a
    /// filename replaces its entry.
    pub fn record_upload(&mut self, filename: &str, doc_id: Option<String>) {
        self.docs.retain(|d| d.filename != filename);
        self.docs.push(DocEntry {
            filename: filename.to_string(),
            doc_id,
        });
        self.selected = Some(filename.to_string());
    }

    pub fn select(&mut self, filename: &str) -> Result<(), String> {
        if self.docs.iter().any(|d| d.filename == filename) {
            self.selected = Some(filename.to_string());
            Ok(())
        } else {
            Err(format!("unknown document {filename:?}; see `docs`"))
        }
    }

    pub fn set_search_all(&mut self, on: bool) {
        self.search_all = on;
    }

    /// `source` to send with a query: the selection, unless search-all is on.
    pub fn query_source(&self) -> Option<&str> {
        if self.search_all { None } else { self.selected() }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
