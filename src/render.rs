//! Renderer seam
//!
//! The renderer turns a record set plus display configuration into visual
//! output. The panel never looks inside it; it only pushes state and asks for
//! a render.
//!
//! Two implementations ship with the crate:
//! - [`RecordingRenderer`] - remembers every call, for hosts that inspect
//!   what a panel did (and for tests)
//! - [`TextRenderer`] - writes a plain text table, used by the demo binary

use crate::config::BarPart;
use crate::types::RecordSet;
use serde_json::Value;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// UI component a panel mounts into its slot.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send {
    /// Replace the rows to display.
    fn set_dataset(&mut self, records: Arc<RecordSet>);

    /// Column holding the row title.
    fn set_title_column(&mut self, column: &str);

    /// Bar segments to draw for each row.
    fn set_bar_parts(&mut self, parts: &[BarPart]);

    /// Draw with the current state.
    fn render(&mut self);
}

/// A call observed by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    SetDataset(Arc<RecordSet>),
    SetTitleColumn(String),
    SetBarParts(Vec<BarPart>),
    Render,
}

/// Renderer that records calls into a shared log.
///
/// Clones share the log, so a host can keep one handle and mount the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<RenderCall> {
        self.log().clone()
    }

    /// Most recent dataset pushed, if any.
    pub fn last_dataset(&self) -> Option<Arc<RecordSet>> {
        self.log().iter().rev().find_map(|call| match call {
            RenderCall::SetDataset(records) => Some(Arc::clone(records)),
            _ => None,
        })
    }

    /// Number of `render()` calls.
    pub fn render_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|call| matches!(call, RenderCall::Render))
            .count()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    fn push(&self, call: RenderCall) {
        self.log().push(call);
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<RenderCall>> {
        // A poisoned log still holds every call recorded before the panic.
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Renderer for RecordingRenderer {
    fn set_dataset(&mut self, records: Arc<RecordSet>) {
        self.push(RenderCall::SetDataset(records));
    }

    fn set_title_column(&mut self, column: &str) {
        self.push(RenderCall::SetTitleColumn(column.to_string()));
    }

    fn set_bar_parts(&mut self, parts: &[BarPart]) {
        self.push(RenderCall::SetBarParts(parts.to_vec()));
    }

    fn render(&mut self) {
        self.push(RenderCall::Render);
    }
}

/// Column used as row title until one is configured
pub const DEFAULT_TITLE_COLUMN: &str = "title";

/// Renderer writing one line per row: the title followed by each bar part's
/// column value.
pub struct TextRenderer<W: Write + Send> {
    out: W,
    records: Arc<RecordSet>,
    title_column: String,
    parts: Vec<BarPart>,
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            records: Arc::new(Vec::new()),
            title_column: DEFAULT_TITLE_COLUMN.to_string(),
            parts: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn format_rows(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|row| {
                let title = row
                    .get(&self.title_column)
                    .map(display_value)
                    .unwrap_or_else(|| "-".to_string());
                let cells: Vec<String> = self
                    .parts
                    .iter()
                    .map(|part| {
                        let value = part
                            .column()
                            .and_then(|column| row.get(column))
                            .map(display_value)
                            .unwrap_or_default();
                        format!("{}={}", part.label().unwrap_or("?"), value)
                    })
                    .collect();
                format!("{:<40} {}", title, cells.join("  "))
            })
            .collect()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<W: Write + Send> Renderer for TextRenderer<W> {
    fn set_dataset(&mut self, records: Arc<RecordSet>) {
        self.records = records;
    }

    fn set_title_column(&mut self, column: &str) {
        self.title_column = column.to_string();
    }

    fn set_bar_parts(&mut self, parts: &[BarPart]) {
        self.parts = parts.to_vec();
    }

    fn render(&mut self) {
        let rows = self.format_rows();
        for row in rows {
            if let Err(e) = writeln!(self.out, "{}", row) {
                tracing::warn!("Failed to write rendered row: {}", e);
                return;
            }
        }
        tracing::debug!(rows = self.records.len(), "Rendered text table");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> crate::types::Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_recording_renderer_shares_log_between_clones() {
        let handle = RecordingRenderer::new();
        let mut mounted = handle.clone();

        mounted.set_title_column("title");
        mounted.render();

        assert_eq!(
            handle.calls(),
            vec![RenderCall::SetTitleColumn("title".into()), RenderCall::Render]
        );
        assert_eq!(handle.render_count(), 1);

        handle.clear();
        assert!(handle.calls().is_empty());
    }

    #[test]
    fn test_recording_renderer_last_dataset() {
        let mut renderer = RecordingRenderer::new();
        assert!(renderer.last_dataset().is_none());

        renderer.set_dataset(Arc::new(vec![row(json!({"a": 1}))]));
        renderer.set_dataset(Arc::new(vec![row(json!({"a": 2}))]));

        let last = renderer.last_dataset().unwrap();
        assert_eq!(last[0]["a"], json!(2));
    }

    #[test]
    fn test_text_renderer_output() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.set_bar_parts(&[
            BarPart::new("Current", 50).with_extra("colName", "cur"),
            BarPart::new("fact", 50),
        ]);
        renderer.set_dataset(Arc::new(vec![row(json!({
            "title": "Financial risks",
            "cur": -40,
            "fact": 15
        }))]));
        renderer.render();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with("Financial risks"));
        assert!(out.contains("Current=-40"));
        assert!(out.contains("fact=15"));
    }

    #[test]
    fn test_text_renderer_missing_title_column() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.set_title_column("name");
        renderer.set_dataset(Arc::new(vec![row(json!({"title": "X"}))]));
        renderer.render();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with('-'));
    }
}
