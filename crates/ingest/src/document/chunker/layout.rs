//! Document layout: one ordered pass over the line stream that classifies
//! every line and feeds the section, list and table state machines.

use legis_core::Document;

use super::classifier::{ClassifiedLine, ClassifyContext, LineClassifier, LineKind};
use super::helpers::{char_len, split_long_line};
use super::lists::{ListBlock, ListBuilder};
use super::sections::{Section, SectionTracker};
use super::tables::{merge_spans, TableDetector, TableSpan};
use super::types::ChunkConfig;

/// Non-overlapping union of list blocks and table spans that must stay together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicBlock {
    pub start: usize,
    pub end: usize,
    /// Indices into `Layout::lists`.
    pub lists: Vec<usize>,
    /// Indices into `Layout::tables`.
    pub tables: Vec<usize>,
}

impl AtomicBlock {
    pub fn has_table(&self) -> bool {
        !self.tables.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Heading,
    Paragraph,
    /// Index into `Layout::blocks`.
    Atomic(usize),
}

/// Contiguous inclusive line range the assembler packs as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub kind: UnitKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Default)]
pub struct Layout {
    pub lines: Vec<ClassifiedLine>,
    pub sections: Vec<Section>,
    /// Section each line belongs to, by index into `sections`.
    pub line_sections: Vec<Option<usize>>,
    pub lists: Vec<ListBlock>,
    pub tables: Vec<TableSpan>,
    pub blocks: Vec<AtomicBlock>,
    pub units: Vec<Unit>,
}

impl Layout {
    pub fn meter(&self) -> RenderMeter<'_> {
        RenderMeter { lines: &self.lines }
    }

    /// Blank or footer line: carries no content of its own.
    pub fn is_gap(&self, idx: usize) -> bool {
        let line = &self.lines[idx];
        line.kind == LineKind::FooterNoise || line.is_blank()
    }

    pub fn first_content_line(&self, start: usize, end: usize) -> Option<usize> {
        (start..=end).find(|&i| !self.is_gap(i))
    }

    /// Atomic block that strictly contains `idx` (its first line excluded).
    pub fn block_interior(&self, idx: usize) -> Option<usize> {
        self.blocks.iter().position(|b| b.start < idx && idx <= b.end)
    }

    /// Line indices inside `block` where it may be cut: item and row starts.
    pub fn cut_points(&self, block: &AtomicBlock) -> Vec<usize> {
        let mut cuts: Vec<usize> = block
            .lists
            .iter()
            .flat_map(|&l| self.lists[l].tree.item_starts())
            .chain(block.tables.iter().flat_map(|&t| self.tables[t].rows.iter().copied()))
            .filter(|&c| c > block.start && c <= block.end)
            .collect();
        cuts.sort_unstable();
        cuts.dedup();
        cuts
    }
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Renders line ranges exactly as chunk content: footers dropped, blank runs
/// collapsed to one, outer blanks stripped, trailing whitespace trimmed.
#[derive(Debug, Clone, Copy)]
pub struct RenderMeter<'a> {
    lines: &'a [ClassifiedLine],
}

impl<'a> RenderMeter<'a> {
    fn visit(&self, start: usize, end: usize, mut emit: impl FnMut(&'a str, bool)) {
        let lines: &'a [ClassifiedLine] = self.lines;
        let mut any = false;
        let mut pending_blank = false;
        for line in &lines[start..=end] {
            if line.kind == LineKind::FooterNoise {
                continue;
            }
            let text = line.text.trim_end();
            if text.is_empty() {
                pending_blank = any;
                continue;
            }
            emit(text, any && pending_blank);
            any = true;
            pending_blank = false;
        }
    }

    pub fn render(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        self.visit(start, end, |text, blank_before| {
            if !out.is_empty() {
                out.push('\n');
            }
            if blank_before {
                out.push('\n');
            }
            out.push_str(text);
        });
        out
    }

    /// Character count of `render(start, end)` without building it.
    pub fn measure(&self, start: usize, end: usize) -> usize {
        let mut total = 0;
        let mut first = true;
        self.visit(start, end, |text, blank_before| {
            if !first {
                total += 1;
            }
            if blank_before {
                total += 1;
            }
            total += char_len(text);
            first = false;
        });
        total
    }
}

// ── Analysis ────────────────────────────────────────────────────────────────

struct SourceLine {
    text: String,
    page: u32,
    pretagged: bool,
}

/// Run the classifier and the three structure trackers over `doc`.
pub fn analyze(doc: &Document, classifier: &LineClassifier, config: &ChunkConfig) -> Layout {
    let mut source: Vec<SourceLine> = Vec::new();
    let mut pretagged: Vec<(usize, usize)> = Vec::new();

    for page in &doc.pages {
        // Global index of the first virtual line of each page-local line.
        let mut local_starts = Vec::new();
        for (local, raw) in page.text.lines().enumerate() {
            local_starts.push(source.len());
            let tagged = page.tables.iter().any(|r| r.contains(&local));
            for piece in split_long_line(raw, config.max_chunk_chars) {
                source.push(SourceLine {
                    text: piece,
                    page: page.number,
                    pretagged: tagged,
                });
            }
        }
        local_starts.push(source.len());
        let local_count = local_starts.len() - 1;
        for range in &page.tables {
            let end = range.end.min(local_count);
            if range.start >= end {
                continue;
            }
            pretagged.push((local_starts[range.start], local_starts[end] - 1));
        }
    }

    let mut layout = Layout::default();
    if source.is_empty() {
        return layout;
    }

    let mut sections = SectionTracker::new();
    let mut lists = ListBuilder::new();
    let mut tables = TableDetector::new();
    let mut previous = None;

    for (idx, src) in source.iter().enumerate() {
        let ctx = ClassifyContext {
            previous,
            in_table: tables.is_open() || src.pretagged,
        };
        let line = classifier.classify(&src.text, src.page, idx, &ctx);
        if !line.is_blank() && line.kind != LineKind::FooterNoise {
            previous = Some(line.kind);
        }
        layout.line_sections.push(sections.observe(idx, &line));
        lists.observe(idx, &line);
        tables.observe(idx, &line);
        layout.lines.push(line);
    }

    let last = layout.lines.len() - 1;
    layout.sections = sections.finish(last);
    for section in &layout.sections {
        tracing::trace!(
            number = %section.number,
            start_line = section.start_line,
            end_line = section.end_line.unwrap_or(last),
            "closed section"
        );
    }
    layout.lists = lists.finish();

    let mut spans = tables.finish();
    for (start, end) in pretagged {
        let rows = (start..=end)
            .filter(|&i| {
                let l = &layout.lines[i];
                !l.is_blank() && l.kind != LineKind::FooterNoise
            })
            .collect();
        spans.push(TableSpan {
            start_line: start,
            end_line: end,
            rows,
            pretagged: true,
        });
    }
    layout.tables = merge_spans(spans);
    layout.blocks = atomic_blocks(&layout.lists, &layout.tables);
    layout.units = units(&layout);

    tracing::debug!(
        document = %doc.id,
        lines = layout.lines.len(),
        sections = layout.sections.len(),
        lists = layout.lists.len(),
        tables = layout.tables.len(),
        units = layout.units.len(),
        "analyzed document layout"
    );
    layout
}

fn atomic_blocks(lists: &[ListBlock], tables: &[TableSpan]) -> Vec<AtomicBlock> {
    enum Member {
        List(usize),
        Table(usize),
    }
    let mut intervals: Vec<(usize, usize, Member)> = lists
        .iter()
        .enumerate()
        .map(|(i, l)| (l.start_line, l.end_line, Member::List(i)))
        .chain(
            tables
                .iter()
                .enumerate()
                .map(|(i, t)| (t.start_line, t.end_line, Member::Table(i))),
        )
        .collect();
    intervals.sort_by_key(|(start, end, _)| (*start, *end));

    let mut blocks: Vec<AtomicBlock> = Vec::new();
    for (start, end, member) in intervals {
        let extend = blocks.last().is_some_and(|b| start <= b.end);
        if !extend {
            blocks.push(AtomicBlock {
                start,
                end,
                lists: Vec::new(),
                tables: Vec::new(),
            });
        }
        let Some(block) = blocks.last_mut() else {
            continue;
        };
        block.end = block.end.max(end);
        match member {
            Member::List(i) => block.lists.push(i),
            Member::Table(i) => block.tables.push(i),
        }
    }
    blocks
}

/// Cut the line stream into headings, blank-separated paragraphs and atomic
/// blocks. Gap lines join the unit before them; leading gaps join the first.
fn units(layout: &Layout) -> Vec<Unit> {
    let n = layout.lines.len();
    let mut block_starts = layout.blocks.iter().enumerate().map(|(i, b)| (b.start, i)).peekable();
    let mut units: Vec<Unit> = Vec::new();
    let mut lead: Option<usize> = None;
    let mut i = 0;

    while i < n {
        while block_starts.peek().is_some_and(|&(start, _)| start < i) {
            block_starts.next();
        }
        if let Some(&(start, b)) = block_starts.peek() {
            if start == i {
                let end = layout.blocks[b].end;
                units.push(Unit {
                    kind: UnitKind::Atomic(b),
                    start: lead.take().unwrap_or(i),
                    end,
                });
                i = end + 1;
                continue;
            }
        }
        if layout.is_gap(i) {
            match units.last_mut() {
                Some(u) => u.end = i,
                None => {
                    lead.get_or_insert(i);
                }
            }
            i += 1;
            continue;
        }
        if layout.lines[i].kind == LineKind::SectionHeader {
            units.push(Unit {
                kind: UnitKind::Heading,
                start: lead.take().unwrap_or(i),
                end: i,
            });
            i += 1;
            continue;
        }
        let para_start = i;
        let next_block = block_starts.peek().map(|&(start, _)| start);
        while i < n
            && !layout.is_gap(i)
            && layout.lines[i].kind != LineKind::SectionHeader
            && next_block != Some(i)
        {
            i += 1;
        }
        units.push(Unit {
            kind: UnitKind::Paragraph,
            start: lead.take().unwrap_or(para_start),
            end: i - 1,
        });
    }
    // A document of gap lines only.
    if let (Some(start), true) = (lead, units.is_empty()) {
        units.push(Unit {
            kind: UnitKind::Paragraph,
            start,
            end: n - 1,
        });
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::rules::ClassifierRules;
    use legis_core::Page;

    fn analyze_text(text: &str) -> Layout {
        let doc = Document::from_text("t.txt", text);
        let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
        analyze(&doc, &classifier, &ChunkConfig::default())
    }

    #[test]
    fn meter_collapses_blanks_and_drops_footers() {
        let layout = analyze_text("\nFirst line   \n\n\n12\n\nSecond line\n\n");
        let meter = layout.meter();
        let last = layout.lines.len() - 1;
        assert_eq!(meter.render(0, last), "First line\n\nSecond line");
        assert_eq!(meter.measure(0, last), "First line\n\nSecond line".len());
    }

    #[test]
    fn units_cover_every_line_once() {
        let layout = analyze_text(
            "Preamble line.\n\n1 Scope\nThe scope paragraph.\n(a) first item;\n(b) second item.\n\nClosing paragraph.\n",
        );
        let mut next = 0;
        for u in &layout.units {
            assert_eq!(u.start, next);
            next = u.end + 1;
        }
        assert_eq!(next, layout.lines.len());
        let kinds: Vec<_> = layout.units.iter().map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UnitKind::Paragraph,
                UnitKind::Heading,
                UnitKind::Paragraph,
                UnitKind::Atomic(0),
                UnitKind::Paragraph,
            ]
        );
    }

    #[test]
    fn overlapping_list_and_table_merge_into_one_block() {
        let layout = analyze_text(
            "(a) the following levels apply:\n    Availability   99.5%   Monthly\n    Resolution   8 hours   Weekly\n(b) the Buyer may audit.\n\nAfter text.",
        );
        assert_eq!(layout.blocks.len(), 1);
        let block = &layout.blocks[0];
        assert_eq!((block.start, block.end), (0, 3));
        assert!(block.has_table());
        assert_eq!(block.lists, vec![0]);
        assert_eq!(layout.cut_points(block), vec![1, 2, 3]);
    }

    #[test]
    fn pretagged_ranges_become_table_spans() {
        let doc = Document::from_pages(
            legis_core::DocumentId("doc_x".into()),
            "x.pdf",
            vec![Page::new(1, "Intro text.\nName Value\nAlpha One\nOutro text.").with_tables(vec![1..3])],
        );
        let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
        let layout = analyze(&doc, &classifier, &ChunkConfig::default());
        assert_eq!(layout.tables.len(), 1);
        assert!(layout.tables[0].pretagged);
        assert_eq!((layout.tables[0].start_line, layout.tables[0].end_line), (1, 2));
    }

    #[test]
    fn long_lines_are_presplit() {
        let sentence = "The Supplier shall maintain records of all Services. ";
        let text = sentence.repeat(40);
        let doc = Document::from_text("t.txt", &text);
        let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
        let config = ChunkConfig::with_sizes(100, 300, 600);
        let layout = analyze(&doc, &classifier, &config);
        assert!(layout.lines.len() > 1);
        assert!(layout.lines.iter().all(|l| char_len(&l.text) <= 300));
    }

    #[test]
    fn sections_persist_across_pages() {
        let layout = analyze_text("2 Charges\nFirst page text.\x0CSecond page text.");
        assert_eq!(layout.line_sections, vec![Some(0), Some(0), Some(0)]);
        assert_eq!(layout.lines[2].page, 2);
    }
}
