//! End-to-end behavior of the structural chunker on legal documents.

use legis_core::Document;
use legis_ingest::document::chunker::{LineClassifier, LineKind};
use legis_ingest::{
    extract_text, Chunk, ChunkConfig, ChunkType, ChunkingPool, ClassifierRules, HeuristicChunker,
    ListItem, ParagraphChunker, StructuralChunker,
};

const FRAMEWORK_SCHEDULE: &[u8] = include_bytes!("fixtures/framework_schedule.txt");
const SHIPPED_RULES: &str = include_str!("../../../data/rules/legal-classifier.yml");

fn chunker(config: ChunkConfig) -> HeuristicChunker {
    let rules = ClassifierRules::from_yaml_str(SHIPPED_RULES).unwrap();
    HeuristicChunker::new(config, &rules).unwrap()
}

fn framework_schedule() -> Document {
    extract_text(FRAMEWORK_SCHEDULE, "framework_schedule.txt")
        .unwrap()
        .into_document()
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Every word of the document outside footer lines, in order.
fn expected_words(doc: &Document) -> Vec<String> {
    let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
    doc.pages
        .iter()
        .flat_map(|p| p.text.lines())
        .filter(|l| classifier.classify(l, 1, 0, &Default::default()).kind != LineKind::FooterNoise)
        .flat_map(|l| l.split_whitespace().map(str::to_string))
        .collect()
}

fn flatten(items: &[ListItem], out: &mut Vec<(String, usize)>) {
    for item in items {
        out.push((item.number.clone(), item.hierarchy_level));
        flatten(&item.children, out);
    }
}

fn sections(chunks: &[Chunk]) -> Vec<Option<&str>> {
    let mut out: Vec<Option<&str>> = chunks.iter().map(|c| c.section_number.as_deref()).collect();
    out.dedup();
    out
}

// ── Fixture: framework schedule ─────────────────────────────────────

#[test]
fn fixture_chunks_follow_sections() {
    let chunks = chunker(ChunkConfig::default()).chunk(&framework_schedule());
    assert_eq!(sections(&chunks), vec![None, Some("2"), Some("3"), Some("4"), Some("5")]);
    assert_eq!(chunks.len(), 5);
    let titles: Vec<_> = chunks.iter().map(|c| c.section_title.as_deref()).collect();
    assert_eq!(
        titles,
        vec![None, Some("Objectives"), Some("Service Levels"), Some("Service Credits"), Some("Reporting")]
    );
    let pages: Vec<_> = chunks.iter().map(|c| c.pages.clone()).collect();
    assert_eq!(pages, vec![vec![1], vec![1], vec![2], vec![2], vec![3]]);
}

#[test]
fn fixture_chunk_types_and_references() {
    let chunks = chunker(ChunkConfig::default()).chunk(&framework_schedule());
    let types: Vec<_> = chunks.iter().map(|c| c.chunk_type).collect();
    assert_eq!(
        types,
        vec![
            ChunkType::Plain,
            ChunkType::Plain,
            ChunkType::Table,
            ChunkType::CompleteList,
            ChunkType::Plain,
        ]
    );
    assert_eq!(chunks[0].cross_references, vec!["Schedule 1"]);
    assert_eq!(chunks[1].cross_references, vec!["clause 6.3"]);
    assert_eq!(chunks[2].cross_references, vec!["clause 7.1"]);
    assert_eq!(chunks[3].cross_references, vec!["Annex 2"]);
    assert_eq!(chunks[4].cross_references, vec!["clause 8"]);
}

#[test]
fn reconstruction_drops_only_footers() {
    let doc = framework_schedule();
    let chunks = chunker(ChunkConfig::default()).chunk(&doc);
    let joined: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n");
    assert_eq!(words(&joined), expected_words(&doc));
    for footer in ["Page 1 of 3", "Commercial in Confidence", "Version 3.1"] {
        assert!(!joined.contains(footer), "footer {footer:?} leaked into content");
    }
}

#[test]
fn lists_and_tables_are_atomic() {
    let chunks = chunker(ChunkConfig::default()).chunk(&framework_schedule());
    let holders = |needle: &str| chunks.iter().filter(|c| c.content.contains(needle)).count();
    for group in [
        &["1. Collaboration", "3. Continuous Improvement", "b) Risk Management", "4. Compliance"][..],
        &["Service Level   Target", "Availability", "Helpdesk answer"][..],
        &["4.1 The Supplier", "(b) Unused headroom"][..],
        &["(i) performance", "(iii) remedial"][..],
    ] {
        let owner = chunks.iter().position(|c| c.content.contains(group[0])).unwrap();
        for needle in group {
            assert_eq!(holders(needle), 1);
            assert!(chunks[owner].content.contains(needle), "{needle:?} split from {:?}", group[0]);
        }
    }
}

#[test]
fn semantic_nesting_of_objectives() {
    let chunks = chunker(ChunkConfig::default()).chunk(&framework_schedule());
    let objectives = &chunks[1].list_items;
    let roots: Vec<&str> = objectives.iter().map(|i| i.number.as_str()).collect();
    assert_eq!(roots, vec!["1", "2", "3", "4"]);
    let nested: Vec<&str> = objectives[2].children.iter().map(|i| i.number.as_str()).collect();
    assert_eq!(nested, vec!["a", "b"]);
    assert!(objectives[3].children.is_empty());

    let credits = &chunks[3].list_items;
    assert_eq!(credits.len(), 2);
    assert_eq!(credits[1].number, "4.2");
    assert_eq!(credits[1].children.len(), 2);
    assert_eq!(credits[1].children[0].text, "The cap applies per Service Period.");
}

#[test]
fn bare_numbers_are_never_list_items() {
    let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
    for text in ["1", "12", "  7  ", "100", "3.", "- 4 -"] {
        let line = classifier.classify(text, 1, 0, &Default::default());
        assert_ne!(line.kind, LineKind::ListItem, "{text:?}");
    }
    let chunks = chunker(ChunkConfig::default()).chunk(&framework_schedule());
    let mut items = Vec::new();
    for c in &chunks {
        flatten(&c.list_items, &mut items);
    }
    assert!(items.iter().all(|(n, _)| !n.is_empty()));
    assert_eq!(items.len(), 6 + 4 + 3);
}

#[test]
fn rechunking_reconstructed_text_is_stable() {
    let config = ChunkConfig::default();
    let first = chunker(config.clone()).chunk(&framework_schedule());
    let rebuilt: String = first.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n\n");
    let second = chunker(config).chunk(&Document::from_text("rebuilt.txt", &rebuilt));

    assert_eq!(sections(&first), sections(&second));
    let trees = |chunks: &[Chunk]| {
        let mut out = Vec::new();
        for c in chunks {
            flatten(&c.list_items, &mut out);
        }
        out
    };
    assert_eq!(trees(&first), trees(&second));
}

// ── Size bounds ─────────────────────────────────────────────────────

#[test]
fn chunk_sizes_stay_within_bounds() {
    let text = (0..30)
        .map(|i| format!("Recital {i:02} {}.", vec!["word"; 27].join(" ")))
        .collect::<Vec<_>>()
        .join("\n\n");
    let config = ChunkConfig::with_sizes(200, 600, 1200);
    let chunks = chunker(config.clone()).chunk(&Document::from_text("recitals.txt", &text));
    assert_eq!(chunks.len(), 8);
    for c in chunks.iter().filter(|c| !c.is_atomic_overflow()) {
        assert!(c.char_count >= config.min_chunk_chars, "{} too small", c.chunk_id);
        assert!(c.char_count <= config.max_chunk_chars, "{} too large", c.chunk_id);
        assert_eq!(c.char_count, c.content.chars().count());
    }
    assert_eq!(words(&chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join(" ")).len(), 30 * 29);
}

#[test]
fn fixture_chunks_respect_max_unless_atomic() {
    let config = ChunkConfig::with_sizes(100, 300, 600);
    let chunks = chunker(config.clone()).chunk(&framework_schedule());
    for c in &chunks {
        if !c.is_atomic_overflow() {
            assert!(c.char_count <= config.max_chunk_chars, "{}: {}", c.chunk_id, c.char_count);
        }
        assert!(c.char_count <= config.ceiling(c.has_tables), "{}: {}", c.chunk_id, c.char_count);
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn list_of_objectives_is_one_complete_list() {
    let text = "3.2 List of Objectives\n1. A\n2. B\n3. C\na) C1\nb) C2\n4. D\n";
    let config = ChunkConfig {
        max_chunk_chars: 1000,
        ..ChunkConfig::default()
    };
    let chunks = chunker(config).chunk(&Document::from_text("objectives.txt", text));
    assert_eq!(chunks.len(), 1);
    let c = &chunks[0];
    assert_eq!(c.chunk_type, ChunkType::CompleteList);
    assert_eq!(c.section_number.as_deref(), Some("3.2"));
    assert_eq!(c.list_items.len(), 4);
    assert_eq!(c.list_items[2].number, "3");
    assert_eq!(c.list_items[2].children.len(), 2);
}

#[test]
fn service_level_table_is_not_split_by_prose_packing() {
    let prose = vec!["The Supplier shall provide the Services with reasonable skill and care."; 3].join(" ");
    let rows = [
        "Platform availability during core business hours 99.5% ... monthly report",
        "Incidents resolved within the agreed resolution time 95% ... monthly report",
        "Helpdesk calls answered within thirty seconds 90% ... monthly report",
        "Change requests implemented without rollback 98% ... monthly report",
        "Nightly backups completed and verified successfully 100% ... monthly report",
        "Customer satisfaction survey responses rated good 85% ... monthly report",
    ];
    let text = format!("{prose}\n{}\n{prose}", rows.join("\n"));
    let doc = Document::from_text("levels.txt", &text);
    let config = ChunkConfig::with_sizes(100, 400, 1000);
    let owner = |chunks: &[Chunk], needle: &str| chunks.iter().position(|c| c.content.contains(needle));

    // A structure-blind splitter closes a chunk inside the table.
    let baseline = ParagraphChunker::new(config.clone()).unwrap().chunk(&doc);
    assert_ne!(owner(&baseline, "Platform"), owner(&baseline, "Customer"));

    let chunks = chunker(config).chunk(&doc);
    assert_eq!(chunks.len(), 3);
    let table = &chunks[1];
    assert_eq!(table.chunk_type, ChunkType::Table);
    assert_eq!(table.content, rows.join("\n"));
    assert_eq!(owner(&chunks, "Platform"), Some(1));
    assert_eq!(owner(&chunks, "Customer"), Some(1));
}

// ── Batch ───────────────────────────────────────────────────────────

#[test]
fn pool_matches_sequential_chunking() {
    let docs = vec![
        framework_schedule(),
        Document::from_text("empty.txt", "\n\n"),
        Document::from_text("short.txt", "1 Scope\nThis Agreement covers the Services."),
    ];
    let chunker = chunker(ChunkConfig::default());
    let pool = ChunkingPool::new(2).unwrap();
    let batch = pool.chunk_all(&chunker, &docs);
    assert_eq!(batch.len(), 3);
    for (result, doc) in batch.iter().zip(&docs) {
        assert_eq!(result.filename, doc.filename);
        assert_eq!(result.chunks, chunker.chunk(doc));
    }
    assert!(batch[1].chunks.is_empty());
    let json = serde_json::to_string(&batch[2]).unwrap();
    assert!(json.contains("\"section_number\":\"1\""));
}
