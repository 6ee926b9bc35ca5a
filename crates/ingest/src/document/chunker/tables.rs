//! Table boundary detection over the classified line stream.

use super::classifier::{ClassifiedLine, LineKind};

/// Inclusive line range of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpan {
    pub start_line: usize,
    pub end_line: usize,
    /// Line index of every row start.
    pub rows: Vec<usize>,
    /// Came from the extractor rather than from detection.
    pub pretagged: bool,
}

/// Rows needed before a run counts as a table.
const MIN_ROWS: usize = 2;
/// Gap lines tolerated between rows of an open table.
const MAX_GAP_LINES: usize = 2;
const CONTINUATION_MAX_CHARS: usize = 40;

/// Run-length table state machine.
#[derive(Debug, Default)]
pub struct TableDetector {
    rows: Vec<usize>,
    in_table: bool,
    gap_lines: usize,
    spans: Vec<TableSpan>,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a table is open; fed back to the classifier.
    pub fn is_open(&self) -> bool {
        self.in_table
    }

    pub fn observe(&mut self, idx: usize, line: &ClassifiedLine) {
        match line.kind {
            LineKind::FooterNoise => {}
            LineKind::TableRow => {
                self.rows.push(idx);
                self.gap_lines = 0;
                if self.rows.len() >= MIN_ROWS {
                    self.in_table = true;
                }
            }
            LineKind::SectionHeader => self.close(),
            _ if line.is_blank() => {
                if self.in_table {
                    self.gap_lines += 1;
                    if self.gap_lines > MAX_GAP_LINES {
                        self.close();
                    }
                }
            }
            _ if self.in_table && looks_like_continuation(&line.text) => {
                self.gap_lines += 1;
                if self.gap_lines > MAX_GAP_LINES {
                    self.close();
                }
            }
            _ => self.close(),
        }
    }

    fn close(&mut self) {
        if self.in_table {
            if let (Some(&start_line), Some(&end_line)) = (self.rows.first(), self.rows.last()) {
                self.spans.push(TableSpan {
                    start_line,
                    end_line,
                    rows: std::mem::take(&mut self.rows),
                    pretagged: false,
                });
            }
        }
        self.rows.clear();
        self.in_table = false;
        self.gap_lines = 0;
    }

    pub fn finish(mut self) -> Vec<TableSpan> {
        self.close();
        self.spans
    }
}

/// Wrapped cell text: short, numeric-heavy, or starting lowercase or `(`.
fn looks_like_continuation(text: &str) -> bool {
    let t = text.trim();
    if t.chars().count() <= CONTINUATION_MAX_CHARS {
        return true;
    }
    let visible = t.chars().filter(|c| !c.is_whitespace()).count();
    let digits = t.chars().filter(|c| c.is_ascii_digit()).count();
    if visible > 0 && digits * 10 >= visible * 3 {
        return true;
    }
    t.starts_with('(') || t.chars().next().is_some_and(char::is_lowercase)
}

/// Union overlapping or adjacent spans; rows are merged and sorted.
pub fn merge_spans(mut spans: Vec<TableSpan>) -> Vec<TableSpan> {
    spans.sort_by_key(|s| (s.start_line, s.end_line));
    let mut merged: Vec<TableSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start_line <= last.end_line + 1 => {
                last.end_line = last.end_line.max(span.end_line);
                last.rows.extend(span.rows);
                last.rows.sort_unstable();
                last.rows.dedup();
                last.pretagged |= span.pretagged;
            }
            _ => merged.push(span),
        }
    }
    merged
}
