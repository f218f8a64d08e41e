use std::collections::HashSet;

use crate::error::Result;

use super::run::{CharWidths, Runs, resolve_advance};
use super::store::{Block, TextStore};

/// A row of runs: `begin` up to, but not including, `end`.
///
/// `begin` is `None` only for the single empty line of a layout without runs.
/// Lines are kept in a vector in top to bottom order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Line {
    pub begin: Option<usize>,
    pub end: Option<usize>,
    /// Rendered width, filled in by the rect pass.
    pub width: f32,
}

impl Line {
    fn new(begin: Option<usize>, end: Option<usize>) -> Self {
        Self {
            begin,
            end,
            width: 0.0,
        }
    }
}

/// Where a too-long line may be cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BreakPolicy {
    /// Only after a word separator, or between runs.
    Word,
    /// Before any character.
    Char,
}

/// Cuts the run chain into lines.
///
/// In single-line mode everything is one line. Otherwise a line ends after
/// every run terminated by a newline.
pub(crate) fn partition_paragraphs(
    runs: &Runs,
    single_line: bool,
    lines: &mut Vec<Line>,
) -> Result<()> {
    lines.clear();

    let Some(head) = runs.head() else {
        lines.try_reserve(1)?;
        lines.push(Line::new(None, None));
        return Ok(());
    };

    if single_line {
        lines.try_reserve(1)?;
        lines.push(Line::new(Some(head), None));
        return Ok(());
    }

    let mut begin = head;
    for index in runs.iter_range(Some(head), None) {
        let run = runs.get(index);
        if run.split_char == b'\n'
            && let Some(next) = run.next
        {
            lines.try_reserve(1)?;
            lines.push(Line::new(Some(begin), Some(next)));
            begin = next;
        }
    }
    lines.try_reserve(1)?;
    lines.push(Line::new(Some(begin), None));
    Ok(())
}

/// Splits lines whose content is wider than `max_width`.
pub(crate) struct LineBreaker<'a> {
    pub runs: &'a mut Runs,
    pub blocks: &'a mut [Block],
    pub store: &'a TextStore,
    pub max_width: f32,
    pub policy: BreakPolicy,
    pub word_separators: &'a HashSet<u8, fxhash::FxBuildHasher>,
    pub tab_stop: Option<f32>,
}

impl LineBreaker<'_> {
    /// Replaces `lines` with the wrapped result.
    pub fn break_lines(&mut self, lines: &mut Vec<Line>) -> Result<()> {
        let paragraphs = std::mem::take(lines);
        lines.try_reserve(paragraphs.len())?;

        for paragraph in paragraphs {
            match paragraph.begin {
                Some(begin) => self.wrap_paragraph(begin, paragraph.end, lines)?,
                None => lines.push(paragraph),
            }
        }
        Ok(())
    }

    /// Walks one paragraph byte by byte and emits as many lines as needed.
    ///
    /// A cut is only taken when at least one character already sits on the
    /// current line, so no line is ever empty.
    fn wrap_paragraph(
        &mut self,
        begin: usize,
        end: Option<usize>,
        lines: &mut Vec<Line>,
    ) -> Result<()> {
        let store = self.store;
        let mut widths: Vec<f32> = Vec::new();
        let mut line_begin = begin;
        let mut current = Some(begin);
        let mut pen_x = 0.0f32;
        let mut placed = 0usize;
        // (run, local index) just past the last word separator
        let mut last_break: Option<(usize, usize)> = None;

        'runs: while let Some(run_index) = current {
            if current == end {
                break;
            }

            let run = *self.runs.get(run_index);
            let text = run.text(self.blocks, store);
            widths.clear();
            widths.try_reserve(run.text_len)?;
            widths.extend(CharWidths::new(run.glyphs(self.blocks), run.text_len));

            for (local, &shaped) in widths.iter().enumerate() {
                let byte = text[local];
                if byte == b'\n' {
                    continue;
                }
                let advance = resolve_advance(byte, shaped, pen_x, self.tab_stop);

                if advance > 0.0 && pen_x + advance > self.max_width && placed > 0 {
                    let cut = match self.policy {
                        BreakPolicy::Word => last_break
                            .or((run_index != line_begin).then_some((run_index, 0))),
                        BreakPolicy::Char => Some((run_index, local)),
                    };

                    if let Some((cut_run, cut_index)) = cut
                        && let Some(next_begin) = self.cut(cut_run, cut_index)?
                    {
                        lines.try_reserve(1)?;
                        lines.push(Line::new(Some(line_begin), Some(next_begin)));
                        log::trace!("line break before run {next_begin}");

                        line_begin = next_begin;
                        current = Some(next_begin);
                        pen_x = 0.0;
                        placed = 0;
                        last_break = None;
                        continue 'runs;
                    }
                }

                pen_x += advance;
                placed += 1;
                if self.policy == BreakPolicy::Word && self.word_separators.contains(&byte) {
                    last_break = Some((run_index, local + 1));
                }
            }

            current = run.next;
        }

        lines.try_reserve(1)?;
        lines.push(Line::new(Some(line_begin), end));
        Ok(())
    }

    /// Resolves a cut position to the run that starts the next line,
    /// splitting a run when the cut falls inside it.
    fn cut(&mut self, run: usize, local_index: usize) -> Result<Option<usize>> {
        let run_ref = *self.runs.get(run);
        if local_index == 0 {
            Ok(Some(run))
        } else if local_index >= run_ref.text_len {
            Ok(run_ref.next)
        } else {
            self.runs.split(self.blocks, run, local_index).map(Some)
        }
    }
}
