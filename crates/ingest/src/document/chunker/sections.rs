//! Section stack tracking.

use super::classifier::{ClassifiedLine, LineKind};

/// A section opened by a heading line. `end_line` is set when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub number: String,
    pub title: String,
    pub start_line: usize,
    pub end_line: Option<usize>,
    /// Dotted segment count; keyword headings ("Schedule 2") are depth 1.
    pub depth: usize,
}

/// Stack of open sections. Sections are stored in a registry in opening
/// order and referenced by index.
#[derive(Debug, Default)]
pub struct SectionTracker {
    sections: Vec<Section>,
    open: Vec<usize>,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed line `idx`. Returns the section the line belongs to; a heading
    /// belongs to the section it opens.
    pub fn observe(&mut self, idx: usize, line: &ClassifiedLine) -> Option<usize> {
        if line.kind == LineKind::SectionHeader {
            if let Some(heading) = &line.heading {
                while let Some(&top) = self.open.last() {
                    if self.sections[top].depth < heading.depth {
                        break;
                    }
                    self.open.pop();
                    self.sections[top].end_line = Some(idx.saturating_sub(1));
                }
                self.sections.push(Section {
                    number: heading.number.clone(),
                    title: heading.title.clone(),
                    start_line: idx,
                    end_line: None,
                    depth: heading.depth,
                });
                self.open.push(self.sections.len() - 1);
            }
        }
        self.current()
    }

    pub fn current(&self) -> Option<usize> {
        self.open.last().copied()
    }

    /// Close every open section at `last_line` and return the registry.
    pub fn finish(mut self, last_line: usize) -> Vec<Section> {
        for idx in self.open.drain(..) {
            self.sections[idx].end_line = Some(last_line);
        }
        self.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::classifier::{ClassifyContext, LineClassifier};
    use crate::document::chunker::rules::ClassifierRules;

    fn track(lines: &[&str]) -> (Vec<Option<usize>>, Vec<Section>) {
        let classifier = LineClassifier::new(&ClassifierRules::default()).unwrap();
        let mut tracker = SectionTracker::new();
        let tags = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let line = classifier.classify(text, 1, i, &ClassifyContext::default());
                tracker.observe(i, &line)
            })
            .collect();
        (tags, tracker.finish(lines.len() - 1))
    }

    #[test]
    fn nested_sections_close_by_depth() {
        let (tags, sections) = track(&[
            "1 Scope",
            "Intro text.",
            "1.1 Services",
            "The Supplier provides services.",
            "1.2 Exclusions",
            "2 Charges",
            "Fees apply.",
        ]);
        let numbers: Vec<_> = sections.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "1.1", "1.2", "2"]);
        assert_eq!(tags[1], Some(0));
        assert_eq!(tags[3], Some(1));
        assert_eq!(tags[4], Some(2));
        assert_eq!(tags[6], Some(3));
        assert_eq!(sections[1].end_line, Some(3));
        assert_eq!(sections[0].end_line, Some(4));
        assert_eq!(sections[3].end_line, Some(6));
    }

    #[test]
    fn lines_before_first_heading_are_untagged() {
        let (tags, sections) = track(&["Preamble text here.", "1 Definitions"]);
        assert_eq!(tags, vec![None, Some(0)]);
        assert_eq!(sections[0].title, "Definitions");
    }

    #[test]
    fn keyword_heading_is_depth_one() {
        let (tags, sections) = track(&["1.1 Overview", "Schedule 2: Charges", "Text body."]);
        assert_eq!(sections[1].depth, 1);
        assert_eq!(sections[0].end_line, Some(0));
        assert_eq!(tags[2], Some(1));
    }
}
