use crate::error::{LayoutError, Result};

use super::store::{Block, TextStore};

/// A shaped glyph scaled to the requested font size.
///
/// `cluster` indexes the owning run's local text range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Glyph {
    pub codepoint: u32,
    pub cluster: i32,
    pub x_advance: f32,
    pub y_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// A contiguous shaped span of one block.
///
/// Text and glyph ranges are local to the block. `split_char` is `\n` or `\t`
/// when the run ends with that control byte, `0` otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Run {
    pub block: usize,
    pub text_offset: usize,
    pub text_len: usize,
    pub glyph_offset: usize,
    pub glyph_len: usize,
    pub split_char: u8,
    pub next: Option<usize>,
    /// Line-relative pen position, filled in by the rect pass.
    pub x: f32,
}

impl Run {
    pub fn glyphs<'a>(&self, blocks: &'a [Block]) -> &'a [Glyph] {
        &blocks[self.block].glyphs[self.glyph_offset..self.glyph_offset + self.glyph_len]
    }

    pub fn text<'a>(&self, blocks: &[Block], store: &'a TextStore) -> &'a [u8] {
        let start = blocks[self.block].text_offset + self.text_offset;
        &store.bytes()[start..start + self.text_len]
    }

    /// Offset of the run's first byte in the text store.
    pub fn global_offset(&self, blocks: &[Block]) -> usize {
        blocks[self.block].text_offset + self.text_offset
    }
}

/// Arena of runs chained in logical order.
///
/// Splitting pushes the tail run to the end of the arena and splices it into
/// the chain, so arena order and chain order may differ.
#[derive(Default)]
pub(crate) struct Runs {
    runs: Vec<Run>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Runs {
    pub fn clear(&mut self) {
        self.runs.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn get(&self, index: usize) -> &Run {
        &self.runs[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Run {
        &mut self.runs[index]
    }

    /// Walks the chain from `begin` up to, but not including, `end`.
    pub fn iter_range(&self, begin: Option<usize>, end: Option<usize>) -> RunIter<'_> {
        RunIter {
            runs: self,
            current: begin,
            end,
        }
    }

    fn push_back(&mut self, mut run: Run) -> Result<usize> {
        self.runs.try_reserve(1)?;
        run.next = None;

        let index = self.runs.len();
        self.runs.push(run);
        match self.tail {
            Some(tail) => self.runs[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        Ok(index)
    }

    /// Splits `run` at `local_index`, returning the index of the new tail run.
    ///
    /// The byte at `local_index` becomes the first byte of the tail. Glyphs
    /// whose cluster starts before `local_index` stay with the head; the tail's
    /// clusters are re-based to its own text range.
    ///
    /// # Panics
    /// Panics unless `0 < local_index < run.text_len`.
    pub fn split(&mut self, blocks: &mut [Block], run: usize, local_index: usize) -> Result<usize> {
        let head = self.runs[run];
        assert!(
            local_index > 0 && local_index < head.text_len,
            "split index {local_index} out of range for run of {} bytes",
            head.text_len
        );
        self.runs.try_reserve(1)?;

        let glyphs = &mut blocks[head.block].glyphs
            [head.glyph_offset..head.glyph_offset + head.glyph_len];
        let boundary = cluster_boundary(glyphs, local_index as i32);
        for glyph in &mut glyphs[boundary..] {
            glyph.cluster -= local_index as i32;
        }

        let tail = Run {
            block: head.block,
            text_offset: head.text_offset + local_index,
            text_len: head.text_len - local_index,
            glyph_offset: head.glyph_offset + boundary,
            glyph_len: head.glyph_len - boundary,
            split_char: head.split_char,
            next: head.next,
            x: 0.0,
        };
        let tail_index = self.runs.len();
        self.runs.push(tail);

        let head = &mut self.runs[run];
        head.text_len = local_index;
        head.glyph_len = boundary;
        head.split_char = 0;
        head.next = Some(tail_index);

        if self.tail == Some(run) {
            self.tail = Some(tail_index);
        }
        Ok(tail_index)
    }
}

pub(crate) struct RunIter<'a> {
    runs: &'a Runs,
    current: Option<usize>,
    end: Option<usize>,
}

impl Iterator for RunIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.current?;
        if Some(current) == self.end {
            return None;
        }
        self.current = self.runs.get(current).next;
        Some(current)
    }
}

/// Index of the first glyph belonging to text at or after `target`.
///
/// Starts from the glyph at `target` (clamped), scans forward past clusters
/// below `target`, then backward while the previous glyph still starts at or
/// after `target`. An exact cluster match therefore keeps all of its glyphs
/// together.
fn cluster_boundary(glyphs: &[Glyph], target: i32) -> usize {
    let mut index = (target.max(0) as usize).min(glyphs.len());

    if index < glyphs.len() && glyphs[index].cluster < target {
        while index < glyphs.len() && glyphs[index].cluster < target {
            index += 1;
        }
    } else {
        while index > 0 && glyphs[index - 1].cluster >= target {
            index -= 1;
        }
    }
    index
}

/// Shapes every block into runs, in block order.
///
/// Each block is cut after every `\n` and `\t`; each piece becomes one run.
/// The control byte is kept as the run's last byte but is not shaped. A block
/// whose face cannot shape is skipped as a whole and contributes no runs.
pub(crate) fn shape_blocks(
    blocks: &mut [Block],
    store: &TextStore,
    font_size: f32,
    runs: &mut Runs,
) -> Result<()> {
    let mut pending: Vec<Run> = Vec::new();

    for (block_index, block) in blocks.iter_mut().enumerate() {
        block.glyphs.clear();
        block.shaped = false;
        pending.clear();

        match shape_block(block_index, block, store, font_size, &mut pending) {
            Ok(()) => {}
            Err(LayoutError::ResourceUnavailable { face, reason }) => {
                log::warn!("Skipping text block {block_index}: face {face:?} {reason}");
                block.glyphs.clear();
                continue;
            }
            Err(e) => return Err(e),
        }

        for run in pending.drain(..) {
            runs.push_back(run)?;
        }
        block.shaped = true;
    }

    Ok(())
}

fn shape_block(
    block_index: usize,
    block: &mut Block,
    store: &TextStore,
    font_size: f32,
    pending: &mut Vec<Run>,
) -> Result<()> {
    if !block.face.can_shape() {
        return Err(LayoutError::ResourceUnavailable {
            face: block.face.id(),
            reason: "face has no shaping support",
        });
    }

    let text = &store.bytes()[block.text_range()];
    let scale = font_size / block.face.units_per_em();

    let mut start = 0;
    while start < text.len() {
        let (end, split_char) = match text[start..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\t')
        {
            Some(pos) => (start + pos + 1, text[start + pos]),
            None => (text.len(), 0),
        };
        let shaped_end = if split_char == 0 { end } else { end - 1 };

        let glyph_offset = block.glyphs.len();
        if shaped_end > start {
            // control bytes are ASCII, so the segment stays on char boundaries
            let segment = std::str::from_utf8(&text[start..shaped_end]).map_err(|_| {
                LayoutError::ResourceUnavailable {
                    face: block.face.id(),
                    reason: "text is not valid UTF-8",
                }
            })?;
            let shaped = block.face.shape(segment)?;

            block.glyphs.try_reserve(shaped.len())?;
            block.glyphs.extend(shaped.iter().map(|glyph| Glyph {
                codepoint: glyph.codepoint,
                cluster: glyph.cluster as i32,
                x_advance: glyph.x_advance * scale,
                y_advance: glyph.y_advance * scale,
                x_offset: glyph.x_offset * scale,
                y_offset: glyph.y_offset * scale,
            }));
        }

        pending.try_reserve(1)?;
        pending.push(Run {
            block: block_index,
            text_offset: start,
            text_len: end - start,
            glyph_offset,
            glyph_len: block.glyphs.len() - glyph_offset,
            split_char,
            next: None,
            x: 0.0,
        });
        start = end;
    }

    Ok(())
}

/// Advance of every byte of a run, in local text order.
///
/// A byte's width is the sum of the advances of all glyphs whose cluster is
/// at or before it and which were not counted for an earlier byte. Bytes in
/// the middle of a cluster (UTF-8 continuation bytes, ligature tails) get 0.
pub(crate) struct CharWidths<'a> {
    glyphs: &'a [Glyph],
    glyph: usize,
    position: usize,
    text_len: usize,
}

impl<'a> CharWidths<'a> {
    pub fn new(glyphs: &'a [Glyph], text_len: usize) -> Self {
        Self {
            glyphs,
            glyph: 0,
            position: 0,
            text_len,
        }
    }
}

impl Iterator for CharWidths<'_> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.text_len {
            return None;
        }

        let mut width = 0.0;
        while self.glyph < self.glyphs.len()
            && self.glyphs[self.glyph].cluster <= self.position as i32
        {
            width += self.glyphs[self.glyph].x_advance;
            self.glyph += 1;
        }
        self.position += 1;
        Some(width)
    }
}

/// Final advance of one byte once control characters are resolved.
///
/// Newlines never take space. Tabs take none either unless `tab_stop` is
/// set, in which case they move the pen to the next multiple of it.
pub(crate) fn resolve_advance(byte: u8, shaped: f32, pen_x: f32, tab_stop: Option<f32>) -> f32 {
    match byte {
        b'\n' => 0.0,
        b'\t' => match tab_stop {
            Some(stop) if stop > 0.0 => ((pen_x / stop).floor() + 1.0) * stop - pen_x,
            _ => 0.0,
        },
        _ => shaped,
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::testing::{COMBINING_MARK, LIGATURE_FI, TestFace};

    fn build(parts: &[(crate::face::FaceHandle, &str)]) -> (TextStore, Vec<Block>, Runs) {
        let mut store = TextStore::default();
        let mut blocks = Vec::new();
        for (face, text) in parts {
            let offset = store.append(text.as_bytes()).unwrap();
            blocks.push(Block::new(face.clone(), offset, text.len()));
        }
        let mut runs = Runs::default();
        shape_blocks(&mut blocks, &store, 20.0, &mut runs).unwrap();
        (store, blocks, runs)
    }

    fn chain(runs: &Runs) -> Vec<Run> {
        runs.iter_range(runs.head(), None)
            .map(|index| *runs.get(index))
            .collect()
    }

    #[test]
    fn control_bytes_end_runs() {
        let face = TestFace::new().handle();
        let (store, blocks, runs) = build(&[(face, "ab\ncd\tef")]);
        let chain = chain(&runs);

        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].text(&blocks, &store), b"ab\n");
        assert_eq!(chain[0].split_char, b'\n');
        assert_eq!(chain[0].glyph_len, 2);
        assert_eq!(chain[1].text(&blocks, &store), b"cd\t");
        assert_eq!(chain[1].split_char, b'\t');
        assert_eq!(chain[2].text(&blocks, &store), b"ef");
        assert_eq!(chain[2].split_char, 0);

        // clusters are local to each run
        assert_eq!(chain[1].glyphs(&blocks)[0].cluster, 0);
        assert_eq!(chain[1].glyphs(&blocks)[1].cluster, 1);
    }

    #[test]
    fn runs_partition_each_block() {
        let a = TestFace::new().handle();
        let b = TestFace::new().handle();
        let (_, blocks, runs) = build(&[(a, "one\ntwo"), (b, "\n\nthree")]);

        for (index, block) in blocks.iter().enumerate() {
            let mut expected = 0;
            for run in chain(&runs).iter().filter(|run| run.block == index) {
                assert_eq!(run.text_offset, expected);
                expected += run.text_len;
            }
            assert_eq!(expected, block.text_len);
        }
        assert_eq!(chain(&runs).len(), 5);
    }

    #[test]
    fn advances_are_scaled_to_font_size() {
        let face = TestFace::new().handle();
        let (_, blocks, runs) = build(&[(face, "x")]);
        let glyph = runs.get(0).glyphs(&blocks)[0];
        // 500 units of a 1000 unit em at 20px
        assert_eq!(glyph.x_advance, 10.0);
    }

    #[test]
    fn unshapeable_block_is_skipped() {
        let good = TestFace::new().handle();
        let bad = TestFace::new().unshapeable().handle();
        let (_, blocks, runs) = build(&[(good.clone(), "ab"), (bad, "cd"), (good, "ef")]);

        let chain = chain(&runs);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].block, 0);
        assert_eq!(chain[1].block, 2);
        assert!(!blocks[1].shaped);
        assert!(blocks[1].glyphs.is_empty());
    }

    #[test]
    fn split_rebases_tail_clusters() {
        let face = TestFace::new().handle();
        let (store, mut blocks, mut runs) = build(&[(face, "hello\n")]);

        let tail = runs.split(&mut blocks, 0, 2).unwrap();
        let head = *runs.get(0);
        let tail_run = *runs.get(tail);

        assert_eq!(head.text(&blocks, &store), b"he");
        assert_eq!(head.glyph_len, 2);
        assert_eq!(head.split_char, 0);
        assert_eq!(head.next, Some(tail));

        assert_eq!(tail_run.text(&blocks, &store), b"llo\n");
        assert_eq!(tail_run.split_char, b'\n');
        assert_eq!(tail_run.glyph_offset, 2);
        assert_eq!(tail_run.glyph_len, 3);
        let clusters: Vec<i32> = tail_run.glyphs(&blocks).iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![0, 1, 2]);
    }

    #[test]
    fn split_keeps_chain_order() {
        let face = TestFace::new().handle();
        let (_, mut blocks, mut runs) = build(&[(face, "abcd\nef")]);

        let tail = runs.split(&mut blocks, 0, 1).unwrap();
        let order: Vec<usize> = runs.iter_range(runs.head(), None).collect();
        assert_eq!(order, vec![0, tail, 1]);
    }

    #[test]
    fn split_inside_ligature_keeps_glyph_with_head() {
        let face = TestFace::new().with_ligatures().handle();
        let (store, mut blocks, mut runs) = build(&[(face, "afix")]);
        assert_eq!(runs.get(0).glyph_len, 3);

        // byte 2 is the 'i' folded into the ligature starting at byte 1
        let tail = runs.split(&mut blocks, 0, 2).unwrap();
        let head = *runs.get(0);
        assert_eq!(head.glyph_len, 2);
        assert_eq!(head.glyphs(&blocks)[1].codepoint, LIGATURE_FI);

        let tail_run = *runs.get(tail);
        assert_eq!(tail_run.text(&blocks, &store), b"ix");
        assert_eq!(tail_run.glyph_len, 1);
        assert_eq!(tail_run.glyphs(&blocks)[0].cluster, 1);
    }

    fn codepoints(run: &Run, blocks: &[Block]) -> Vec<u32> {
        run.glyphs(blocks).iter().map(|g| g.codepoint).collect()
    }

    #[test]
    fn split_after_multibyte_char_scans_back() {
        let face = TestFace::new().handle();
        // 'é' is two bytes, so glyph 2 starts at byte 3
        let (store, mut blocks, mut runs) = build(&[(face, "éab")]);

        let tail = runs.split(&mut blocks, 0, 2).unwrap();
        assert_eq!(runs.get(0).glyph_len, 1);
        let tail_run = *runs.get(tail);
        assert_eq!(tail_run.text(&blocks, &store), b"ab");
        assert_eq!(codepoints(&tail_run, &blocks), vec!['a' as u32, 'b' as u32]);
        let clusters: Vec<i32> = tail_run.glyphs(&blocks).iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![0, 1]);
    }

    #[test]
    fn split_after_marked_char_scans_forward() {
        let face = TestFace::new().with_mark_on('x').handle();
        let (store, mut blocks, mut runs) = build(&[(face, "xab")]);
        assert_eq!(runs.get(0).glyph_len, 4);

        let tail = runs.split(&mut blocks, 0, 1).unwrap();
        let head = *runs.get(0);
        assert_eq!(codepoints(&head, &blocks), vec!['x' as u32, COMBINING_MARK]);

        let tail_run = *runs.get(tail);
        assert_eq!(tail_run.text(&blocks, &store), b"ab");
        assert_eq!(codepoints(&tail_run, &blocks), vec!['a' as u32, 'b' as u32]);
    }

    #[test]
    fn split_at_shared_cluster_keeps_it_whole() {
        let face = TestFace::new().with_mark_on('x').handle();
        // clusters are [0, 2, 2, 3]: the mark shares the cluster of 'x'
        let (_, mut blocks, mut runs) = build(&[(face, "éxb")]);

        let tail = runs.split(&mut blocks, 0, 2).unwrap();
        assert_eq!(codepoints(runs.get(0), &blocks), vec!['é' as u32]);

        let tail_run = *runs.get(tail);
        assert_eq!(
            codepoints(&tail_run, &blocks),
            vec!['x' as u32, COMBINING_MARK, 'b' as u32]
        );
        let clusters: Vec<i32> = tail_run.glyphs(&blocks).iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![0, 0, 1]);
    }

    #[test]
    fn unshapeable_block_of_control_bytes_is_skipped() {
        let good = TestFace::new().handle();
        let bad = TestFace::new().unshapeable().handle();
        let (_, blocks, runs) = build(&[(good.clone(), "a"), (bad, "\n\t"), (good, "b")]);

        let chain = chain(&runs);
        assert_eq!(chain.len(), 2);
        assert!(chain.iter().all(|run| run.block != 1));
        assert!(!blocks[1].shaped);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn split_at_zero_panics() {
        let face = TestFace::new().handle();
        let (_, mut blocks, mut runs) = build(&[(face, "abc")]);
        let _ = runs.split(&mut blocks, 0, 0);
    }

    #[test]
    fn char_widths_follow_clusters() {
        let face = TestFace::new().with_ligatures().handle();
        let (_, blocks, runs) = build(&[(face, "fié")]);
        let run = runs.get(0);
        let widths: Vec<f32> = CharWidths::new(run.glyphs(&blocks), run.text_len).collect();
        // "fi" ligature, then 'é' as two UTF-8 bytes
        assert_eq!(widths, vec![10.0, 0.0, 10.0, 0.0]);
    }

    #[test]
    fn tabs_expand_to_next_stop() {
        assert_eq!(resolve_advance(b'\t', 0.0, 15.0, Some(40.0)), 25.0);
        assert_eq!(resolve_advance(b'\t', 0.0, 40.0, Some(40.0)), 40.0);
        assert_eq!(resolve_advance(b'\t', 3.0, 15.0, None), 0.0);
        assert_eq!(resolve_advance(b'\n', 3.0, 15.0, Some(40.0)), 0.0);
        assert_eq!(resolve_advance(b'a', 3.0, 15.0, Some(40.0)), 3.0);
    }
}
