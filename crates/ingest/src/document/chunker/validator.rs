//! Post-assembly quality pass: fallback re-split, degenerate chunk cleanup,
//! rendering and scoring.

use std::collections::{BTreeSet, VecDeque};

use legis_core::DocumentId;

use super::assembler::DraftChunk;
use super::helpers::char_len;
use super::layout::Layout;
use super::types::{Chunk, ChunkConfig, ChunkType, ListItem, QualityFlag};

/// Turn draft ranges into final chunks.
pub fn finalize(
    document_id: &DocumentId,
    layout: &Layout,
    drafts: Vec<DraftChunk>,
    config: &ChunkConfig,
) -> Vec<Chunk> {
    let drafts = fallback_resplit(layout, drafts, config);
    let drafts = drop_empty(layout, drafts);
    let drafts = merge_small(layout, drafts, config);
    drafts
        .iter()
        .enumerate()
        .map(|(n, d)| render(document_id, n, layout, d, config))
        .collect()
}

// ── Fallback ────────────────────────────────────────────────────────────────

/// Re-split oversized chunks when the document produced far fewer chunks than
/// its length calls for. Cuts never land inside an atomic block.
pub fn fallback_resplit(
    layout: &Layout,
    drafts: Vec<DraftChunk>,
    config: &ChunkConfig,
) -> Vec<DraftChunk> {
    if layout.lines.is_empty() || drafts.is_empty() {
        return drafts;
    }
    let meter = layout.meter();
    let max = config.max_chunk_chars;
    let total = meter.measure(0, layout.lines.len() - 1);
    let expected = total.div_ceil(max) as f64 * config.fallback_min_ratio;
    if drafts.len() as f64 >= expected {
        return drafts;
    }
    tracing::warn!(
        chunks = drafts.len(),
        expected,
        total_chars = total,
        "chunk count below expectation, re-splitting oversized chunks"
    );

    let mut out = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if meter.measure(draft.start, draft.end) <= max {
            out.push(draft);
            continue;
        }
        let mut piece_start = draft.start;
        let mut last_ok: Option<usize> = None;
        let cuts = (draft.start + 1..=draft.end)
            .filter(|&l| layout.block_interior(l).is_none())
            .chain(std::iter::once(draft.end + 1));
        for cut in cuts {
            if meter.measure(piece_start, cut - 1) > max {
                if let Some(k) = last_ok.filter(|&k| k > piece_start) {
                    let mut piece = DraftChunk::new(piece_start, k - 1);
                    piece.absorb_flags(&draft);
                    piece.flag(QualityFlag::FallbackSplit);
                    out.push(piece);
                    piece_start = k;
                }
            }
            last_ok = Some(cut);
        }
        let mut tail = DraftChunk::new(piece_start, draft.end);
        tail.absorb_flags(&draft);
        if piece_start > draft.start {
            tail.flag(QualityFlag::FallbackSplit);
        }
        out.push(tail);
    }
    out
}

// ── Degenerate chunks ───────────────────────────────────────────────────────

fn drop_empty(layout: &Layout, drafts: Vec<DraftChunk>) -> Vec<DraftChunk> {
    let meter = layout.meter();
    drafts
        .into_iter()
        .filter(|d| meter.measure(d.start, d.end) > 0)
        .collect()
}

/// Fold chunks below `min_chunk_chars` into the previous chunk, else the
/// next, when the result stays within `max_chunk_chars`.
fn merge_small(layout: &Layout, drafts: Vec<DraftChunk>, config: &ChunkConfig) -> Vec<DraftChunk> {
    let meter = layout.meter();
    let (min, max) = (config.min_chunk_chars, config.max_chunk_chars);
    let mut queue: VecDeque<DraftChunk> = drafts.into();
    let mut out: Vec<DraftChunk> = Vec::with_capacity(queue.len());

    while let Some(mut draft) = queue.pop_front() {
        let len = meter.measure(draft.start, draft.end);
        if len >= min {
            out.push(draft);
            continue;
        }
        if let Some(prev) = out.last_mut() {
            if meter.measure(prev.start, draft.end) <= max {
                prev.end = draft.end;
                prev.absorb_flags(&draft);
                continue;
            }
        }
        if let Some(next) = queue.front_mut() {
            if meter.measure(draft.start, next.end) <= max {
                next.start = draft.start;
                next.absorb_flags(&draft);
                continue;
            }
        }
        if len < config.min_meaningful_chars {
            tracing::warn!(
                start_line = draft.start,
                end_line = draft.end,
                chars = len,
                "chunk below minimum meaningful size with no mergeable neighbour"
            );
            draft.flag(QualityFlag::TooShort);
        }
        out.push(draft);
    }
    out
}

// ── Rendering ───────────────────────────────────────────────────────────────

fn render(
    document_id: &DocumentId,
    n: usize,
    layout: &Layout,
    draft: &DraftChunk,
    config: &ChunkConfig,
) -> Chunk {
    let (start, end) = (draft.start, draft.end);
    let content = layout.meter().render(start, end);

    let section = layout
        .first_content_line(start, end)
        .and_then(|i| layout.line_sections[i])
        .map(|s| &layout.sections[s]);

    let list_items: Vec<ListItem> = layout
        .lists
        .iter()
        .filter(|b| b.start_line <= end && start <= b.end_line)
        .flat_map(|b| b.tree.forest_within(start, end))
        .collect();
    let has_tables = layout
        .tables
        .iter()
        .any(|t| t.rows.iter().any(|&r| r >= start && r <= end));

    let mut cross_references: Vec<String> = Vec::new();
    let mut pages = BTreeSet::new();
    let mut list_chars = 0;
    let mut content_chars = 0;
    for i in start..=end {
        if layout.is_gap(i) {
            continue;
        }
        let line = &layout.lines[i];
        pages.insert(line.page);
        for r in &line.cross_references {
            if !cross_references.contains(r) {
                cross_references.push(r.clone());
            }
        }
        let chars = char_len(line.text.trim());
        content_chars += chars;
        if layout
            .lists
            .iter()
            .any(|b| b.start_line <= i && i <= b.end_line)
        {
            list_chars += chars;
        }
    }

    let has_list = !list_items.is_empty();
    let chunk_type = if has_list && has_tables {
        ChunkType::Mixed
    } else if has_tables {
        ChunkType::Table
    } else if has_list && list_chars * 2 >= content_chars {
        ChunkType::CompleteList
    } else {
        ChunkType::Plain
    };

    let char_count = char_len(&content);
    let w = config.weights;
    let mut score = 0.0;
    if section.is_some() {
        score += w.section;
    }
    if has_list {
        score += w.list;
    }
    if has_tables {
        score += w.table;
    }
    if char_count >= config.quality_length_threshold {
        score += w.length;
    }

    Chunk {
        chunk_id: format!("{document_id}_chunk_{n}"),
        document_id: document_id.to_string(),
        content,
        section_number: section.map(|s| s.number.clone()),
        section_title: section.map(|s| s.title.clone()),
        chunk_type,
        list_items,
        cross_references,
        has_tables,
        pages: pages.into_iter().collect(),
        char_count,
        quality_score: score.clamp(0.0, 1.0),
        quality_flags: draft.flags.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::classifier::LineClassifier;
    use crate::document::chunker::layout::analyze;
    use crate::document::chunker::rules::ClassifierRules;
    use legis_core::Document;

    fn layout_of(text: &str, config: &ChunkConfig) -> (Document, Layout) {
        let doc = Document::from_text("v.txt", text);
        let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
        let layout = analyze(&doc, &classifier, config);
        (doc, layout)
    }

    #[test]
    fn small_chunk_merges_into_previous() {
        let config = ChunkConfig::with_sizes(50, 500, 1000);
        let (doc, layout) = layout_of("The first paragraph is long enough to stand alone here.\n\nTiny tail.", &config);
        let drafts = vec![DraftChunk::new(0, 1), DraftChunk::new(2, 2)];
        let chunks = finalize(&doc.id, &layout, drafts, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.ends_with("Tiny tail."));
    }

    #[test]
    fn small_first_chunk_merges_into_next() {
        let config = ChunkConfig::with_sizes(50, 500, 1000);
        let (doc, layout) = layout_of("Tiny head.\n\nThe second paragraph is long enough to stand alone here.", &config);
        let drafts = vec![DraftChunk::new(0, 1), DraftChunk::new(2, 2)];
        let chunks = finalize(&doc.id, &layout, drafts, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.starts_with("Tiny head."));
    }

    #[test]
    fn unmergeable_tiny_chunk_is_flagged() {
        let config = ChunkConfig::with_sizes(50, 60, 100);
        let long = "The first paragraph is long enough to stand alone here.";
        let (doc, layout) = layout_of(&format!("{long}\n\nTiny.\n\n{long}"), &config);
        let drafts = vec![DraftChunk::new(0, 1), DraftChunk::new(2, 3), DraftChunk::new(4, 4)];
        let chunks = finalize(&doc.id, &layout, drafts, &config);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].has_flag(QualityFlag::TooShort));
        assert_eq!(chunks[1].content, "Tiny.");
    }

    #[test]
    fn footer_only_chunk_is_dropped() {
        let config = ChunkConfig::with_sizes(10, 500, 1000);
        let (doc, layout) = layout_of("A paragraph of reasonable length.\n12\nPage 3 of 9", &config);
        let drafts = vec![DraftChunk::new(0, 0), DraftChunk::new(1, 2)];
        let chunks = finalize(&doc.id, &layout, drafts, &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, format!("{}_chunk_0", doc.id));
    }

    #[test]
    fn fallback_resplits_oversized_prose() {
        let config = ChunkConfig::with_sizes(20, 100, 200);
        let text = (0..10)
            .map(|i| format!("Line {i} of a long run of prose text."))
            .collect::<Vec<_>>()
            .join("\n");
        let (doc, layout) = layout_of(&text, &config);
        let last = layout.lines.len() - 1;
        let chunks = finalize(&doc.id, &layout, vec![DraftChunk::new(0, last)], &config);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.has_flag(QualityFlag::FallbackSplit)));
        assert!(chunks.iter().all(|c| c.char_count <= 100));
    }

    #[test]
    fn score_and_type_follow_content() {
        let config = ChunkConfig::default();
        let (doc, layout) = layout_of(
            "3.2 List of Objectives\n(a) deliver the Services; and\n(b) report under clause 4.1.",
            &config,
        );
        let chunks = finalize(&doc.id, &layout, vec![DraftChunk::new(0, 2)], &config);
        let c = &chunks[0];
        assert_eq!(c.chunk_type, ChunkType::CompleteList);
        assert_eq!(c.section_number.as_deref(), Some("3.2"));
        assert_eq!(c.section_title.as_deref(), Some("List of Objectives"));
        assert_eq!(c.cross_references, vec!["clause 4.1"]);
        assert_eq!(c.pages, vec![1]);
        assert!((c.quality_score - 0.5).abs() < 1e-6);
    }
}
