//! List block detection and hierarchy building.
//!
//! Items are collected per block while the line stream is read, then the
//! block is turned into a tree. The tree is an index arena: nodes live in a
//! flat `Vec` and refer to each other by position.

use super::classifier::{ClassifiedLine, LineKind, Marker, NumberKind};
use super::types::{ListItem, ListType};

// ── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub marker: Marker,
    pub text: String,
    pub list_type: ListType,
    pub hierarchy_level: usize,
    pub indent: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// First and last line of the item's own text.
    pub line_span: (usize, usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTree {
    pub nodes: Vec<ListNode>,
    pub roots: Vec<usize>,
}

impl ListTree {
    /// Owned forest of the whole tree.
    #[cfg(test)]
    pub fn to_items(&self) -> Vec<ListItem> {
        self.forest_within(0, usize::MAX)
    }

    /// Owned forest of the items whose first line falls in `start..=end`.
    /// An item whose parent is outside the range becomes a root; levels are
    /// renumbered from 1.
    pub fn forest_within(&self, start: usize, end: usize) -> Vec<ListItem> {
        let inside = |id: usize| {
            let first = self.nodes[id].line_span.0;
            first >= start && first <= end
        };
        let mut out = Vec::new();
        // Walk in document order so split-off subtrees keep their order.
        for id in 0..self.nodes.len() {
            if !inside(id) {
                continue;
            }
            let parent_inside = self.nodes[id].parent.is_some_and(inside);
            if !parent_inside {
                out.push(self.owned(id, 1, &inside));
            }
        }
        out
    }

    fn owned(&self, id: usize, level: usize, inside: &dyn Fn(usize) -> bool) -> ListItem {
        let node = &self.nodes[id];
        ListItem {
            number: node.marker.label.clone(),
            marker_kind: node.marker.normalized_type,
            text: node.text.clone(),
            list_type: node.list_type,
            hierarchy_level: level,
            line_span: node.line_span,
            children: node
                .children
                .iter()
                .copied()
                .filter(|&c| inside(c))
                .map(|c| self.owned(c, level + 1, inside))
                .collect(),
        }
    }

    /// Line index where every item (at any depth) starts.
    pub fn item_starts(&self) -> Vec<usize> {
        let mut starts: Vec<usize> = self.nodes.iter().map(|n| n.line_span.0).collect();
        starts.sort_unstable();
        starts
    }
}

/// A contiguous run of list items with its tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ListBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub tree: ListTree,
}

// ── Streaming block detection ───────────────────────────────────────────────

#[derive(Debug)]
struct PendingItem {
    marker: Marker,
    indent: usize,
    text: String,
    span: (usize, usize),
}

#[derive(Debug, Default)]
struct OpenBlock {
    items: Vec<PendingItem>,
    /// Non-blank non-list lines since the last item or continuation.
    stray_lines: usize,
    prev_blank: bool,
}

/// Consumes classified lines in order and collects list blocks.
#[derive(Debug, Default)]
pub struct ListBuilder {
    open: Option<OpenBlock>,
    blocks: Vec<ListBlock>,
}

/// Two stray lines end a block.
const MAX_STRAY_LINES: usize = 2;

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, idx: usize, line: &ClassifiedLine) {
        match line.kind {
            LineKind::FooterNoise => {}
            _ if line.is_blank() => {
                if let Some(block) = self.open.as_mut() {
                    block.prev_blank = true;
                }
            }
            LineKind::ListItem => {
                let Some(marker) = line.marker.clone() else {
                    return;
                };
                let text = strip_marker(&line.text, &marker);
                let block = self.open.get_or_insert_with(OpenBlock::default);
                block.items.push(PendingItem {
                    marker,
                    indent: line.indent,
                    text,
                    span: (idx, idx),
                });
                block.stray_lines = 0;
                block.prev_blank = false;
            }
            LineKind::SectionHeader => self.close(),
            _ => {
                let Some(block) = self.open.as_mut() else {
                    return;
                };
                let follows_item = block.stray_lines == 0 && !block.prev_blank;
                if let Some(item) = block.items.last_mut().filter(|_| follows_item) {
                    if line.indent > item.indent || starts_lowercase(&line.text) {
                        item.text.push(' ');
                        item.text.push_str(line.text.trim());
                        item.span.1 = idx;
                        return;
                    }
                }
                block.stray_lines += 1;
                block.prev_blank = false;
                if block.stray_lines >= MAX_STRAY_LINES {
                    self.close();
                }
            }
        }
    }

    fn close(&mut self) {
        let Some(block) = self.open.take() else {
            return;
        };
        let (Some(first), Some(last)) = (block.items.first(), block.items.last()) else {
            return;
        };
        let (start_line, end_line) = (first.span.0, last.span.1);
        self.blocks.push(ListBlock {
            start_line,
            end_line,
            tree: build_tree(block.items),
        });
    }

    pub fn finish(mut self) -> Vec<ListBlock> {
        self.close();
        self.blocks
    }
}

fn starts_lowercase(text: &str) -> bool {
    text.trim_start().chars().next().is_some_and(char::is_lowercase)
}

fn strip_marker(text: &str, marker: &Marker) -> String {
    let t = text.trim();
    t.strip_prefix(marker.raw.as_str()).unwrap_or(t).trim().to_string()
}

// ── Tree building ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Same,
    Deeper,
    Shallower,
}

/// Outline rank: lower ranks sit higher in a legal outline.
fn rank(kind: NumberKind) -> u8 {
    match kind {
        NumberKind::UpperRoman => 0,
        NumberKind::UpperAlpha => 1,
        NumberKind::Digit | NumberKind::CompactHierarchical => 2,
        NumberKind::ParentheticalDigit => 3,
        NumberKind::LowerAlpha => 4,
        NumberKind::LowerRoman => 5,
        NumberKind::Bullet => 6,
    }
}

fn relation(prev: &Marker, curr: &Marker) -> Relation {
    let (a, b) = (prev.normalized_type, curr.normalized_type);
    if a.is_numeric() && b.is_numeric() {
        let depth = |m: &Marker| m.nesting_hint.unwrap_or(1);
        return match depth(curr).cmp(&depth(prev)) {
            std::cmp::Ordering::Equal => Relation::Same,
            std::cmp::Ordering::Greater => Relation::Deeper,
            std::cmp::Ordering::Less => Relation::Shallower,
        };
    }
    if a == b {
        return Relation::Same;
    }
    match rank(b).cmp(&rank(a)) {
        std::cmp::Ordering::Greater => Relation::Deeper,
        std::cmp::Ordering::Less => Relation::Shallower,
        std::cmp::Ordering::Equal => Relation::Same,
    }
}

/// `i`, `v` and `x` (either case) are letters, not numerals, when an open
/// alphabetic peer holds the preceding letter.
fn disambiguate(marker: &mut Marker, open: &[usize], nodes: &[ListNode]) {
    let alpha = match marker.normalized_type {
        NumberKind::LowerRoman => NumberKind::LowerAlpha,
        NumberKind::UpperRoman => NumberKind::UpperAlpha,
        _ => return,
    };
    let mut chars = marker.label.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return;
    };
    let Some(preceding) = char::from_u32(c as u32 - 1) else {
        return;
    };
    let has_preceding_peer = open.iter().any(|&id| {
        let m = &nodes[id].marker;
        m.normalized_type == alpha && m.label.chars().eq(std::iter::once(preceding))
    });
    if has_preceding_peer {
        marker.normalized_type = alpha;
    }
}

fn build_tree(items: Vec<PendingItem>) -> ListTree {
    let mut tree = ListTree::default();
    // Path from a root to the most recent item.
    let mut open: Vec<usize> = Vec::new();

    for item in items {
        let mut marker = item.marker;
        disambiguate(&mut marker, &open, &tree.nodes);

        while open.last().is_some_and(|&top| tree.nodes[top].indent > item.indent) {
            open.pop();
        }

        let parent = match open.last() {
            None => None,
            Some(&top) if tree.nodes[top].indent < item.indent => Some(top),
            Some(_) => {
                // Same-indent peers on the open path, deepest first.
                let peers: Vec<usize> = open
                    .iter()
                    .rev()
                    .copied()
                    .take_while(|&id| tree.nodes[id].indent == item.indent)
                    .collect();
                let mut placed = None;
                for &peer in &peers {
                    match relation(&tree.nodes[peer].marker, &marker) {
                        Relation::Same => {
                            placed = Some((peer, tree.nodes[peer].parent));
                            break;
                        }
                        Relation::Deeper => {
                            placed = Some((peer, Some(peer)));
                            break;
                        }
                        Relation::Shallower => {}
                    }
                }
                let (anchor, parent) = match placed {
                    Some(p) => p,
                    None => {
                        let shallowest = peers[peers.len() - 1];
                        (shallowest, tree.nodes[shallowest].parent)
                    }
                };
                // Keep the anchor on the path only when it becomes the parent.
                if let Some(pos) = open.iter().position(|&id| id == anchor) {
                    let keep = if parent == Some(anchor) { pos + 1 } else { pos };
                    open.truncate(keep);
                }
                parent
            }
        };

        let id = tree.nodes.len();
        let hierarchy_level = parent.map_or(1, |p| tree.nodes[p].hierarchy_level + 1);
        let list_type = if marker.normalized_type == NumberKind::Bullet {
            ListType::Unordered
        } else {
            ListType::Ordered
        };
        tree.nodes.push(ListNode {
            marker,
            text: item.text,
            list_type,
            hierarchy_level,
            indent: item.indent,
            parent,
            children: Vec::new(),
            line_span: item.span,
        });
        match parent {
            Some(p) => tree.nodes[p].children.push(id),
            None => tree.roots.push(id),
        }
        open.push(id);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::classifier::{ClassifyContext, LineClassifier};
    use crate::document::chunker::rules::ClassifierRules;

    fn blocks(text: &str) -> Vec<ListBlock> {
        let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
        let mut builder = ListBuilder::new();
        for (i, raw) in text.lines().enumerate() {
            let line = classifier.classify(raw, 1, i, &ClassifyContext::default());
            builder.observe(i, &line);
        }
        builder.finish()
    }

    fn shape(items: &[ListItem]) -> Vec<String> {
        fn walk(items: &[ListItem], out: &mut Vec<String>) {
            for item in items {
                out.push(format!("{}:{}", item.hierarchy_level, item.number));
                walk(&item.children, out);
            }
        }
        let mut out = Vec::new();
        walk(items, &mut out);
        out
    }

    #[test]
    fn semantic_nesting_at_equal_indent() {
        let b = blocks(
            "1. The Supplier shall:\n(a) provide the Services;\n(i) on time;\n(ii) in full;\n(b) report monthly;\n2. The Buyer shall pay.",
        );
        assert_eq!(b.len(), 1);
        let items = b[0].tree.to_items();
        assert_eq!(
            shape(&items),
            vec!["1:1", "2:a", "3:i", "3:ii", "2:b", "1:2"]
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].children.len(), 2);
    }

    #[test]
    fn indentation_drives_nesting() {
        let b = blocks("1. First item here\n    a. nested item\n        i. deeper item\n2. Second item here");
        assert_eq!(
            shape(&b[0].tree.to_items()),
            vec!["1:1", "2:a", "3:i", "1:2"]
        );
    }

    #[test]
    fn compact_markers_nest_by_segment_count() {
        let b = blocks(
            "1. Services\n1.1 The Supplier shall comply.\n1.1.1 It shall also report.\n1.2 The Buyer shall cooperate.\n2. Charges apply",
        );
        assert_eq!(
            shape(&b[0].tree.to_items()),
            vec!["1:1", "2:1.1", "3:1.1.1", "2:1.2", "1:2"]
        );
    }

    #[test]
    fn letter_i_after_h_is_alphabetic() {
        let b = blocks("(g) seventh item;\n(h) eighth item;\n(i) ninth item;\n(j) tenth item.");
        let items = b[0].tree.to_items();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| i.hierarchy_level == 1));
        assert_eq!(items[2].marker_kind, NumberKind::LowerAlpha);
    }

    #[test]
    fn continuation_lines_join_their_item() {
        let b = blocks("(a) the Supplier shall provide\n    the Services in full;\n(b) and report\nwithin ten days.");
        let items = b[0].tree.to_items();
        assert_eq!(items[0].text, "the Supplier shall provide the Services in full;");
        assert_eq!(items[1].text, "and report within ten days.");
        assert_eq!(items[0].line_span, (0, 1));
        assert_eq!(b[0].end_line, 3);
    }

    #[test]
    fn two_stray_lines_close_the_block() {
        let b = blocks(
            "(a) first item;\n(b) second item.\n\nThe next paragraph starts here.\nIt continues here.\n(a) new list item",
        );
        assert_eq!(b.len(), 2);
        assert_eq!((b[0].start_line, b[0].end_line), (0, 1));
        assert_eq!(b[1].start_line, 5);
    }

    #[test]
    fn heading_closes_the_block_and_footer_is_transparent() {
        let b = blocks("(a) first item;\n12\n(b) second item.\n2 Charges\n(a) other list");
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].tree.nodes.len(), 2);
        assert_eq!(b[0].end_line, 2);
    }

    #[test]
    fn forest_within_reroots_split_subtrees() {
        let b = blocks("1. Parent item text\n(a) child one;\n(b) child two;\n2. Next item text");
        let tree = &b[0].tree;
        let part = tree.forest_within(2, 3);
        assert_eq!(shape(&part), vec!["1:b", "1:2"]);
        assert_eq!(tree.item_starts(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn bullets_are_unordered() {
        let b = blocks("• Supplier staff\n• Buyer staff");
        let items = b[0].tree.to_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].list_type, ListType::Unordered);
    }
}
