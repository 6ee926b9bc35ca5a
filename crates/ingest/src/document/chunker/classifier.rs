//! Line classification.
//!
//! Every physical line gets exactly one [`LineKind`], chosen by the first
//! matching rule of an ordered table. The table is data: it is compiled from
//! [`ClassifierRules`] and can be replaced wholesale with
//! [`LineClassifier::from_rules`].

use regex::Regex;

use super::error::{ChunkerError, Result};
use super::rules::{ClassifierRules, FooterPattern};

// ── Line model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    SectionHeader,
    ListItem,
    TableRow,
    FooterNoise,
    CrossReference,
    PlainText,
}

/// Normalized numbering style of a list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Digit,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
    Bullet,
    ParentheticalDigit,
    CompactHierarchical,
}

impl NumberKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, NumberKind::Digit | NumberKind::CompactHierarchical)
    }
}

/// A parsed list marker such as `(iv)`, `2.1` or `•`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Marker as written, punctuation included.
    pub raw: String,
    /// Marker without punctuation.
    pub label: String,
    pub normalized_type: NumberKind,
    /// Segment count of a compact marker (`2.1.3` → 3).
    pub nesting_hint: Option<usize>,
}

/// Number and title of a section heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub number: String,
    pub title: String,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine {
    pub text: String,
    pub page: u32,
    pub line_index: usize,
    /// Leading whitespace width; a tab counts 4.
    pub indent: usize,
    pub kind: LineKind,
    pub marker: Option<Marker>,
    pub heading: Option<Heading>,
    /// Reference targets mentioned on the line, whatever its kind.
    pub cross_references: Vec<String>,
}

impl ClassifiedLine {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// What the classifier may know about the lines before this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    pub previous: Option<LineKind>,
    pub in_table: bool,
}

// ── Rule table ──────────────────────────────────────────────────────────────

/// When a rule is allowed to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleGate {
    Always,
    InOpenTable,
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Footer(FooterMatcher),
    ListMarker(MarkerParser),
    TableRow(TableMatcher),
    SectionHeading(HeadingMatcher),
    CrossReference(CrossRefMatcher),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub kind: LineKind,
    pub gate: RuleGate,
    pub predicate: Predicate,
}

#[derive(Debug, Default)]
struct RuleMatch {
    marker: Option<Marker>,
    heading: Option<Heading>,
}

impl Rule {
    fn evaluate(&self, text: &str, ctx: &ClassifyContext) -> Option<RuleMatch> {
        if self.gate == RuleGate::InOpenTable && !ctx.in_table {
            return None;
        }
        match &self.predicate {
            Predicate::Footer(m) => m.is_match(text).then(RuleMatch::default),
            Predicate::ListMarker(p) => p.parse(text).map(|marker| RuleMatch {
                marker: Some(marker),
                heading: None,
            }),
            Predicate::TableRow(m) => m.is_row(text, ctx).then(RuleMatch::default),
            Predicate::SectionHeading(m) => m.parse(text).map(|heading| RuleMatch {
                marker: None,
                heading: Some(heading),
            }),
            Predicate::CrossReference(m) => m.is_match(text).then(RuleMatch::default),
        }
    }
}

/// Build the default ordered rule table.
pub fn rule_table(rules: &ClassifierRules) -> Result<Vec<Rule>> {
    let table = TableMatcher::new(rules)?;
    Ok(vec![
        Rule {
            name: "footer",
            kind: LineKind::FooterNoise,
            gate: RuleGate::Always,
            predicate: Predicate::Footer(FooterMatcher::new(
                &rules.footer_patterns,
                rules.max_title_words,
            )?),
        },
        Rule {
            name: "table_row_in_open_table",
            kind: LineKind::TableRow,
            gate: RuleGate::InOpenTable,
            predicate: Predicate::TableRow(table.clone()),
        },
        Rule {
            name: "list_item",
            kind: LineKind::ListItem,
            gate: RuleGate::Always,
            predicate: Predicate::ListMarker(MarkerParser::new(rules.max_title_words)?),
        },
        Rule {
            name: "table_row",
            kind: LineKind::TableRow,
            gate: RuleGate::Always,
            predicate: Predicate::TableRow(table),
        },
        Rule {
            name: "section_header",
            kind: LineKind::SectionHeader,
            gate: RuleGate::Always,
            predicate: Predicate::SectionHeading(HeadingMatcher::new(rules.max_title_words)?),
        },
        Rule {
            name: "cross_reference",
            kind: LineKind::CrossReference,
            gate: RuleGate::Always,
            predicate: Predicate::CrossReference(CrossRefMatcher::new(rules)?),
        },
    ])
}

// ── Classifier ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LineClassifier {
    rules: Vec<Rule>,
    references: CrossRefMatcher,
}

impl LineClassifier {
    pub fn new(rules: &ClassifierRules) -> Result<Self> {
        Ok(Self {
            rules: rule_table(rules)?,
            references: CrossRefMatcher::new(rules)?,
        })
    }

    /// Classifier over a caller-supplied rule order.
    pub fn from_rules(rules: Vec<Rule>, references: &ClassifierRules) -> Result<Self> {
        Ok(Self {
            rules,
            references: CrossRefMatcher::new(references)?,
        })
    }

    /// Classify one line. Pure in `text` and `ctx`.
    pub fn classify(
        &self,
        text: &str,
        page: u32,
        line_index: usize,
        ctx: &ClassifyContext,
    ) -> ClassifiedLine {
        let mut line = ClassifiedLine {
            text: text.to_string(),
            page,
            line_index,
            indent: indent_width(text),
            kind: LineKind::PlainText,
            marker: None,
            heading: None,
            cross_references: Vec::new(),
        };
        if line.is_blank() {
            return line;
        }
        line.cross_references = self.references.extract(text);

        for rule in &self.rules {
            if let Some(m) = rule.evaluate(text, ctx) {
                line.kind = rule.kind;
                line.marker = m.marker;
                line.heading = m.heading;
                break;
            }
        }
        line
    }
}

pub fn indent_width(text: &str) -> usize {
    text.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// True when `rest` reads like a heading title rather than a sentence.
fn reads_as_title(rest: &str, max_words: usize) -> bool {
    let t = rest.trim();
    let Some(first) = t.chars().next() else {
        return false;
    };
    first.is_alphabetic()
        && first.is_uppercase()
        && t.split_whitespace().count() <= max_words
        && !t.ends_with(&['.', ';', ','][..])
}

fn is_all_caps_heading(rest: &str) -> bool {
    let letters = rest.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 4 && !rest.chars().any(|c| c.is_lowercase())
}

fn compile(rule: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ChunkerError::InvalidPattern {
        rule: rule.to_string(),
        source,
    })
}

// ── Footer ──────────────────────────────────────────────────────────────────

const FOOTER_LITERAL_MAX_CHARS: usize = 120;

/// Words that may sit beside a boilerplate literal on a footer line.
const FOOTER_FILLER_WORDS: [&str; 7] = ["page", "of", "version", "ver", "rev", "revision", "issue"];

#[derive(Debug, Clone)]
pub struct FooterMatcher {
    page_number: Regex,
    page_template: Regex,
    literals: Vec<String>,
    patterns: Vec<Regex>,
    markers: MarkerParser,
}

impl FooterMatcher {
    pub fn new(patterns: &[FooterPattern], max_title_words: usize) -> Result<Self> {
        let mut literals = Vec::new();
        let mut compiled = Vec::new();
        for p in patterns {
            match p {
                FooterPattern::Literal { literal } => literals.push(literal.to_lowercase()),
                FooterPattern::Regex { regex } => compiled.push(compile("footer", regex)?),
            }
        }
        Ok(Self {
            page_number: compile("footer", r"^[\s\-–—.]*\d{1,3}[\s\-–—.]*$")?,
            page_template: compile(
                "footer",
                r"(?i)^page\s+\d{1,4}(?:\s*(?:of|/)\s*\d{1,4})?$",
            )?,
            literals,
            patterns: compiled,
            markers: MarkerParser::new(max_title_words)?,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        let t = text.trim();
        if t.is_empty() {
            return false;
        }
        if self.page_number.is_match(t) || self.page_template.is_match(t) {
            return true;
        }
        if self.is_literal_line(t) {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(t))
    }

    /// A boilerplate literal counts only when it is the whole line, give or
    /// take page numbers, version tokens and punctuation. List items never
    /// match.
    fn is_literal_line(&self, t: &str) -> bool {
        if t.chars().count() > FOOTER_LITERAL_MAX_CHARS || self.markers.parse(t).is_some() {
            return false;
        }
        let mut residue = t.to_lowercase();
        let mut found = false;
        for lit in &self.literals {
            if residue.contains(lit.as_str()) {
                residue = residue.replace(lit.as_str(), " ");
                found = true;
            }
        }
        found
            && residue
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .all(is_footer_filler)
    }
}

fn is_footer_filler(word: &str) -> bool {
    let version = word.strip_prefix('v').unwrap_or(word);
    (!version.is_empty() && version.chars().all(|c| c.is_ascii_digit()))
        || FOOTER_FILLER_WORDS.contains(&word)
}

// ── List markers ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MarkerParser {
    marker: Regex,
    max_title_words: usize,
}

impl MarkerParser {
    pub fn new(max_title_words: usize) -> Result<Self> {
        let marker = compile(
            "list_item",
            r"^(?:\((?P<paren>\d{1,3}|[A-Za-z]{1,5})\)|(?P<compact>\d{1,3}(?:\.\d{1,3})+)(?P<cdelim>[.)])?|(?P<plain>\d{1,3}|[A-Za-z]{1,5})(?P<pdelim>[.)])|(?P<bullet>[•●▪◦‣∙·*\-–—]))(?P<rest>.*)$",
        )?;
        Ok(Self {
            marker,
            max_title_words,
        })
    }

    /// Parse a list marker at the start of the line, if the line is a list item.
    pub fn parse(&self, text: &str) -> Option<Marker> {
        let t = text.trim_start();
        let caps = self.marker.captures(t)?;
        let rest = caps.name("rest").map_or("", |m| m.as_str());
        let content = rest.trim();

        let starts_with_space = rest.starts_with(char::is_whitespace);
        let has_word = content.starts_with('(')
            || content
                .split_whitespace()
                .any(|w| w.chars().any(char::is_alphabetic));
        if content.is_empty() || !has_word {
            return None;
        }

        let marker = if let Some(p) = caps.name("paren") {
            let label = p.as_str();
            let kind = if label.chars().all(|c| c.is_ascii_digit()) {
                NumberKind::ParentheticalDigit
            } else {
                letter_kind(label)?
            };
            Marker {
                raw: format!("({label})"),
                label: label.to_string(),
                normalized_type: kind,
                nesting_hint: None,
            }
        } else if let Some(c) = caps.name("compact") {
            let delim = caps.name("cdelim").map(|d| d.as_str());
            if (delim != Some(")") && !starts_with_space)
                || reads_as_title(content, self.max_title_words)
            {
                return None;
            }
            if delim.is_none() && !content.starts_with(|ch: char| ch.is_uppercase() || ch == '(') {
                return None;
            }
            let label = c.as_str();
            Marker {
                raw: format!("{label}{}", delim.unwrap_or("")),
                label: label.to_string(),
                normalized_type: NumberKind::CompactHierarchical,
                nesting_hint: Some(label.split('.').count()),
            }
        } else if let Some(p) = caps.name("plain") {
            let delim = caps.name("pdelim").map_or("", |d| d.as_str());
            let label = p.as_str();
            if delim == "." && !starts_with_space {
                return None;
            }
            let kind = if label.chars().all(|c| c.is_ascii_digit()) {
                if delim == "." && is_all_caps_heading(content) {
                    return None;
                }
                NumberKind::Digit
            } else {
                letter_kind(label)?
            };
            Marker {
                raw: format!("{label}{delim}"),
                label: label.to_string(),
                normalized_type: kind,
                nesting_hint: None,
            }
        } else {
            let bullet = caps.name("bullet")?.as_str();
            if !starts_with_space {
                return None;
            }
            Marker {
                raw: bullet.to_string(),
                label: bullet.to_string(),
                normalized_type: NumberKind::Bullet,
                nesting_hint: None,
            }
        };
        Some(marker)
    }
}

/// Kind of an alphabetic marker label. Single `i`/`v`/`x` read as roman,
/// other single letters as alphabetic; longer labels must be valid romans.
fn letter_kind(label: &str) -> Option<NumberKind> {
    let lower = label.chars().all(|c| c.is_ascii_lowercase());
    let upper = label.chars().all(|c| c.is_ascii_uppercase());
    if !lower && !upper {
        return None;
    }
    let roman = if label.len() == 1 {
        matches!(label.to_ascii_lowercase().as_str(), "i" | "v" | "x")
    } else if roman_value(label).is_some() {
        true
    } else {
        return None;
    };
    Some(match (roman, lower) {
        (true, true) => NumberKind::LowerRoman,
        (true, false) => NumberKind::UpperRoman,
        (false, true) => NumberKind::LowerAlpha,
        (false, false) => NumberKind::UpperAlpha,
    })
}

/// Value of a canonical roman numeral below 400, or `None`.
pub(crate) fn roman_value(s: &str) -> Option<u32> {
    let digit = |c: char| match c.to_ascii_lowercase() {
        'i' => Some(1),
        'v' => Some(5),
        'x' => Some(10),
        'l' => Some(50),
        'c' => Some(100),
        _ => None,
    };
    let values: Vec<u32> = s.chars().map(digit).collect::<Option<_>>()?;
    let mut total = 0;
    for (i, v) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(next) if next > v => total -= *v as i32,
            _ => total += *v as i32,
        }
    }
    let total = u32::try_from(total).ok().filter(|t| (1..400).contains(t))?;
    (to_roman(total) == s.to_ascii_lowercase()).then_some(total)
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 9] = [
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, glyph) in TABLE {
        while n >= value {
            out.push_str(glyph);
            n -= value;
        }
    }
    out
}

// ── Table rows ──────────────────────────────────────────────────────────────

const TABLE_ROW_MAX_WORDS: usize = 40;
const TABLE_HEADER_MAX_WORDS: usize = 10;

#[derive(Debug, Clone)]
pub struct TableMatcher {
    unit_value: Regex,
    delimiter: Regex,
    sentence_gap: Regex,
    numbered: Regex,
    keywords: Vec<Regex>,
}

impl TableMatcher {
    pub fn new(rules: &ClassifierRules) -> Result<Self> {
        let mut symbols = Vec::new();
        let mut words = Vec::new();
        for unit in &rules.table_units {
            if unit.chars().any(char::is_alphanumeric) {
                words.push(unit.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"));
            } else {
                symbols.push(regex::escape(unit));
            }
        }
        words.sort_by_key(|w| std::cmp::Reverse(w.len()));
        let mut alternatives = symbols;
        if !words.is_empty() {
            alternatives.push(format!(r"(?:{})\b", words.join("|")));
        }
        let unit_value = if alternatives.is_empty() {
            r"(?i)[£$€]\s?\d[\d,]*(?:\.\d+)?".to_string()
        } else {
            format!(
                r"(?i)(?:[£$€]\s?\d[\d,]*(?:\.\d+)?|\d[\d,]*(?:\.\d+)?\s?(?:{}))",
                alternatives.join("|")
            )
        };
        let keywords = rules
            .table_header_keywords
            .iter()
            .map(|k| {
                let words: Vec<String> = k.split_whitespace().map(regex::escape).collect();
                compile("table_row", &format!(r"(?i)\b{}s?\b", words.join(r"\s+")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            unit_value: compile("table_row", &unit_value)?,
            delimiter: compile("table_row", r"\t|\s*\|\s*|\s{2,}|\s*(?:\.{3,}|…)\s*")?,
            sentence_gap: compile("table_row", r"([.;:!?]) {2,}(\p{Lu})")?,
            numbered: compile("table_row", r"^\d{1,3}(?:\.\d{1,3})*\.?\s")?,
            keywords,
        })
    }

    /// Number of non-empty delimiter-separated fields on the line. Spaces
    /// after a sentence terminal separate sentences, not fields.
    pub fn field_count(&self, text: &str) -> usize {
        let joined = self.sentence_gap.replace_all(text.trim(), "$1 $2");
        self.delimiter
            .split(&joined)
            .filter(|f| !f.trim().is_empty())
            .count()
    }

    pub fn is_row(&self, text: &str, ctx: &ClassifyContext) -> bool {
        let t = text.trim();
        let words = t.split_whitespace().count();
        if words > TABLE_ROW_MAX_WORDS {
            return false;
        }
        let fields = self.field_count(t);
        if fields >= 2 && self.unit_value.is_match(t) {
            return true;
        }

        let hits = self.keywords.iter().filter(|k| k.is_match(t)).count();
        if hits >= 1 && fields >= 2 {
            return true;
        }
        if hits >= 2
            && words <= TABLE_HEADER_MAX_WORDS
            && !t.ends_with('.')
            && !self.numbered.is_match(t)
        {
            return true;
        }

        let continues_table = ctx.in_table || ctx.previous == Some(LineKind::TableRow);
        continues_table && fields >= 2 && t.chars().any(|c| c.is_ascii_digit())
    }
}

// ── Section headings ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeadingMatcher {
    numbered: Regex,
    keyword: Regex,
    max_title_words: usize,
}

impl HeadingMatcher {
    pub fn new(max_title_words: usize) -> Result<Self> {
        Ok(Self {
            numbered: compile(
                "section_header",
                r"^(?P<num>\d{1,3}(?:\.\d{1,3})*)\.?\s+(?P<title>\S.*)$",
            )?,
            keyword: compile(
                "section_header",
                r"^(?P<kw>(?i:section|clause|schedule|annex|appendix|part|article))\s+(?P<num>\d{1,3}(?:\.\d{1,3})*|[IVXLC]{1,6}|[A-Z])\b\.?\s*(?:[:.\-–—]\s*)?(?P<title>.*)$",
            )?,
            max_title_words,
        })
    }

    pub fn parse(&self, text: &str) -> Option<Heading> {
        let t = text.trim();
        if let Some(caps) = self.numbered.captures(t) {
            let title = caps.name("title").map_or("", |m| m.as_str()).trim();
            if !reads_as_title(title, self.max_title_words) {
                return None;
            }
            let number = caps.name("num").map_or("", |m| m.as_str());
            return Some(Heading {
                number: number.to_string(),
                title: title.to_string(),
                depth: number.split('.').count(),
            });
        }
        let caps = self.keyword.captures(t)?;
        let title = caps.name("title").map_or("", |m| m.as_str()).trim();
        if !title.is_empty() && !reads_as_title(title, self.max_title_words) {
            return None;
        }
        let kw = caps.name("kw").map_or("", |m| m.as_str());
        let num = caps.name("num").map_or("", |m| m.as_str());
        Some(Heading {
            number: format!("{kw} {num}"),
            title: title.to_string(),
            depth: 1,
        })
    }
}

// ── Cross-references ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CrossRefMatcher {
    pattern: Option<Regex>,
}

impl CrossRefMatcher {
    pub fn new(rules: &ClassifierRules) -> Result<Self> {
        let alternation = |items: &[String]| {
            let mut parts: Vec<String> = items
                .iter()
                .map(|p| p.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
                .filter(|p| !p.is_empty())
                .collect();
            parts.sort_by_key(|p| std::cmp::Reverse(p.len()));
            parts.join("|")
        };
        let phrases = alternation(&rules.cross_reference_phrases);
        let targets = alternation(&rules.cross_reference_targets);
        // An empty alternation would match everywhere.
        if phrases.is_empty() || targets.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = format!(
            r"(?i)\b(?:{phrases})\s+(?P<target>(?:{targets})s?\s+(?-i:\d{{1,3}}(?:\.\d{{1,3}})*(?:\s?\([A-Za-z0-9]{{1,4}}\))*|[IVXLC]{{1,6}}\b|[A-Z]\b))"
        );
        Ok(Self {
            pattern: Some(compile("cross_reference", &pattern)?),
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Reference targets on the line, whitespace-normalized, in order.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let Some(re) = &self.pattern else {
            return Vec::new();
        };
        re.captures_iter(text)
            .filter_map(|c| c.name("target"))
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }
}
