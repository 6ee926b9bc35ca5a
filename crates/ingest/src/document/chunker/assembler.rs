//! Greedy chunk assembly over layout units.
//!
//! Chunks are contiguous line ranges. Prose is packed up to
//! `max_chunk_chars`; an atomic block is only ever cut when it alone exceeds
//! its ceiling, and then only at item or row starts.

use std::collections::VecDeque;

use super::layout::{Layout, RenderMeter, Unit, UnitKind};
use super::types::{ChunkConfig, QualityFlag};

/// Inclusive line range of a chunk before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftChunk {
    pub start: usize,
    pub end: usize,
    pub flags: Vec<QualityFlag>,
}

impl DraftChunk {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            flags: Vec::new(),
        }
    }

    pub fn flag(&mut self, flag: QualityFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    pub fn absorb_flags(&mut self, other: &DraftChunk) {
        for &f in &other.flags {
            self.flag(f);
        }
    }
}

/// Pack the layout's units into draft chunks.
pub fn assemble(layout: &Layout, config: &ChunkConfig) -> Vec<DraftChunk> {
    let mut packer = Packer {
        layout,
        meter: layout.meter(),
        config,
        out: Vec::new(),
        current: None,
        heading_tail: None,
    };
    let mut queue: VecDeque<Unit> = layout.units.iter().copied().collect();
    while let Some(unit) = queue.pop_front() {
        packer.place(unit, &mut queue);
    }
    packer.emit();
    packer.out
}

struct Packer<'a> {
    layout: &'a Layout,
    meter: RenderMeter<'a>,
    config: &'a ChunkConfig,
    out: Vec<DraftChunk>,
    current: Option<DraftChunk>,
    /// First line of the headings that end the current chunk.
    heading_tail: Option<usize>,
}

impl Packer<'_> {
    fn current_len(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |c| self.meter.measure(c.start, c.end))
    }

    fn ceiling_for(&self, unit: &Unit) -> usize {
        match unit.kind {
            UnitKind::Atomic(b) => self.config.ceiling(self.layout.blocks[b].has_table()),
            _ => self.config.hard_ceiling_chars,
        }
    }

    fn place(&mut self, unit: Unit, queue: &mut VecDeque<Unit>) {
        let (min, max) = (self.config.min_chunk_chars, self.config.max_chunk_chars);
        let unit_len = self.meter.measure(unit.start, unit.end);
        if unit_len == 0 {
            self.append(unit, unit_len);
            return;
        }
        if unit.kind == UnitKind::Heading && self.current_len() >= min {
            self.flush();
        }
        let Some(start) = self.current.as_ref().map(|c| c.start) else {
            self.open(unit, unit_len, queue);
            return;
        };

        let combined = self.meter.measure(start, unit.end);
        if combined <= max {
            self.append(unit, unit_len);
            return;
        }
        if self.current_len() >= min {
            self.flush();
            queue.push_front(unit);
            return;
        }

        // The current chunk is still short and the unit does not fit.
        match unit.kind {
            UnitKind::Atomic(b) => {
                let ceiling = self.ceiling_for(&unit);
                if combined <= ceiling {
                    self.append(unit, unit_len);
                    if let Some(c) = self.current.as_mut() {
                        c.flag(QualityFlag::AtomicOverflow);
                    }
                } else if unit_len > ceiling {
                    self.force_split(unit, b);
                } else {
                    self.flush();
                    queue.push_front(unit);
                }
            }
            UnitKind::Paragraph => {
                let fit = (unit.start..=unit.end)
                    .take_while(|&e| self.meter.measure(start, e) <= max)
                    .last()
                    .filter(|&e| self.meter.measure(unit.start, e) > 0);
                match fit {
                    Some(e) => {
                        if let Some(c) = self.current.as_mut() {
                            c.end = e;
                        }
                        self.heading_tail = None;
                        self.emit();
                        if e < unit.end {
                            queue.push_front(Unit {
                                start: e + 1,
                                ..unit
                            });
                        }
                    }
                    None => {
                        self.flush();
                        queue.push_front(unit);
                    }
                }
            }
            UnitKind::Heading => {
                self.flush();
                queue.push_front(unit);
            }
        }
    }

    /// Start a new chunk with `unit`, splitting it first if it cannot fit.
    fn open(&mut self, unit: Unit, unit_len: usize, queue: &mut VecDeque<Unit>) {
        match unit.kind {
            UnitKind::Atomic(b) if unit_len > self.ceiling_for(&unit) => self.force_split(unit, b),
            UnitKind::Paragraph if unit_len > self.config.max_chunk_chars => {
                let max = self.config.max_chunk_chars;
                let end = (unit.start..=unit.end)
                    .take_while(|&e| self.meter.measure(unit.start, e) <= max)
                    .last()
                    .unwrap_or(unit.start);
                self.out.push(DraftChunk::new(unit.start, end));
                if end < unit.end {
                    queue.push_front(Unit {
                        start: end + 1,
                        ..unit
                    });
                }
            }
            UnitKind::Atomic(_) if unit_len > self.config.max_chunk_chars => {
                self.append(unit, unit_len);
                if let Some(c) = self.current.as_mut() {
                    c.flag(QualityFlag::AtomicOverflow);
                }
            }
            _ => self.append(unit, unit_len),
        }
    }

    fn append(&mut self, unit: Unit, unit_len: usize) {
        match self.current.as_mut() {
            Some(c) => c.end = unit.end,
            None => self.current = Some(DraftChunk::new(unit.start, unit.end)),
        }
        if unit.kind == UnitKind::Heading {
            self.heading_tail.get_or_insert(unit.start);
        } else if unit_len > 0 {
            self.heading_tail = None;
        }
    }

    /// Close the current chunk. Headings at its end move on to start the
    /// next chunk unless they are all it holds.
    fn flush(&mut self) {
        let Some(mut current) = self.current.take() else {
            return;
        };
        if let Some(h) = self.heading_tail.take() {
            if h > current.start && self.meter.measure(current.start, h - 1) > 0 {
                let carried = DraftChunk::new(h, current.end);
                current.end = h - 1;
                self.out.push(current);
                self.current = Some(carried);
                self.heading_tail = Some(h);
                return;
            }
        }
        self.out.push(current);
    }

    /// Close the current chunk as is.
    fn emit(&mut self) {
        self.heading_tail = None;
        if let Some(current) = self.current.take() {
            self.out.push(current);
        }
    }

    /// Cut an atomic unit above its ceiling at item and row starts. The
    /// current chunk, if any, becomes the head of the first piece.
    fn force_split(&mut self, unit: Unit, block_idx: usize) {
        let layout = self.layout;
        let block = &layout.blocks[block_idx];
        let ceiling = self.ceiling_for(&unit);
        let head = self.current.take();
        self.heading_tail = None;
        let start = head.as_ref().map_or(unit.start, |c| c.start);

        let mut cuts = layout.cut_points(block);
        if block.start > start {
            cuts.push(block.start);
        }
        cuts.push(unit.end + 1);
        cuts.sort_unstable();
        cuts.dedup();
        let cuts = self.refine_cuts(start, cuts, ceiling);

        let mut pieces: Vec<DraftChunk> = Vec::new();
        let mut piece_start = start;
        let mut last_ok: Option<usize> = None;
        for &cut in &cuts {
            if self.meter.measure(piece_start, cut - 1) > ceiling {
                if let Some(k) = last_ok.filter(|&k| k > piece_start) {
                    pieces.push(DraftChunk::new(piece_start, k - 1));
                    piece_start = k;
                }
            }
            last_ok = Some(cut);
        }
        pieces.push(DraftChunk::new(piece_start, unit.end));

        if let (Some(head), Some(first)) = (head.as_ref(), pieces.first_mut()) {
            first.absorb_flags(head);
        }
        for piece in pieces.iter_mut() {
            piece.flag(QualityFlag::ForcedSplit);
        }
        tracing::info!(
            block_start = block.start,
            block_end = block.end,
            ceiling,
            pieces = pieces.len(),
            "force-split atomic block above ceiling"
        );
        self.current = pieces.pop();
        self.out.extend(pieces);
    }

    /// Add every line of a segment as a cut when the segment between two
    /// structural cuts is itself above the ceiling.
    fn refine_cuts(&self, start: usize, cuts: Vec<usize>, ceiling: usize) -> Vec<usize> {
        let mut refined = Vec::with_capacity(cuts.len());
        let mut prev = start;
        for cut in cuts {
            if cut > prev + 1 && self.meter.measure(prev, cut - 1) > ceiling {
                refined.extend(prev + 1..cut);
            }
            refined.push(cut);
            prev = cut;
        }
        refined
    }
}
