use std::collections::VecDeque;

use log::{debug, warn};

/// Counters and reference queues shared by every string of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningState {
    pub report_number: u32,
    pub section_number: u32,
    pub equation_number: u32,
    pub table_number: u32,
    pub figure_number: u32,
    /// Declared footnote numbers not yet bound to a footnote text.
    pub footnote_queue: VecDeque<u32>,
    pub citation_queue: VecDeque<u32>,
    pub(crate) last_footnote: u32,
    pub(crate) last_citation: u32,
    /// Output line width used for justification and rules.
    pub section_width: usize,
}

impl Default for RunningState {
    fn default() -> Self {
        RunningState {
            report_number: 1,
            section_number: 1,
            equation_number: 0,
            table_number: 0,
            figure_number: 0,
            footnote_queue: VecDeque::new(),
            citation_queue: VecDeque::new(),
            last_footnote: 0,
            last_citation: 0,
            section_width: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Footnote,
    Citation,
}

impl RunningState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start section `number`; equation, table and figure numbering restarts.
    pub fn begin_section(&mut self, number: u32) {
        debug!("section {} begins", number);
        self.section_number = number;
        self.equation_number = 0;
        self.table_number = 0;
        self.figure_number = 0;
    }

    pub fn next_equation(&mut self) -> u32 {
        self.equation_number += 1;
        self.equation_number
    }

    pub fn next_table(&mut self) -> u32 {
        self.table_number += 1;
        self.table_number
    }

    pub fn next_figure(&mut self) -> u32 {
        self.figure_number += 1;
        self.figure_number
    }

    /// `R.S.N`
    pub fn report_label(&self, n: u32) -> String {
        format!("{}.{}.{}", self.report_number, self.section_number, n)
    }

    /// `S.N`
    pub fn section_label(&self, n: u32) -> String {
        format!("{}.{}", self.section_number, n)
    }

    fn queue(&mut self, kind: Reference) -> (&mut VecDeque<u32>, &mut u32) {
        match kind {
            Reference::Footnote => (&mut self.footnote_queue, &mut self.last_footnote),
            Reference::Citation => (&mut self.citation_queue, &mut self.last_citation),
        }
    }

    /// Declare the next reference number and queue it.
    pub fn declare(&mut self, kind: Reference) -> u32 {
        let (queue, last) = self.queue(kind);
        *last += 1;
        queue.push_back(*last);
        *last
    }

    /// Bind the oldest declared reference. With nothing pending, a number is
    /// declared and bound at once so numbering stays monotonic.
    pub fn take(&mut self, kind: Reference) -> u32 {
        if let Some(n) = self.queue(kind).0.pop_front() {
            return n;
        }
        warn!("no pending {:?} reference; numbering it on the spot", kind);
        self.declare(kind);
        self.queue(kind).0.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_bind_in_declaration_order() {
        let mut state = RunningState::new();
        assert_eq!(state.declare(Reference::Footnote), 1);
        assert_eq!(state.declare(Reference::Footnote), 2);
        assert_eq!(state.take(Reference::Footnote), 1);
        assert_eq!(state.declare(Reference::Footnote), 3);
        assert_eq!(state.take(Reference::Footnote), 2);
        assert_eq!(state.take(Reference::Footnote), 3);
    }

    #[test]
    fn empty_queue_still_numbers_monotonically() {
        let mut state = RunningState::new();
        assert_eq!(state.take(Reference::Citation), 1);
        assert_eq!(state.take(Reference::Citation), 2);
        assert!(state.citation_queue.is_empty());
        // footnotes are numbered independently
        assert_eq!(state.declare(Reference::Footnote), 1);
    }

    #[test]
    fn sections_reset_counters() {
        let mut state = RunningState::new();
        state.next_equation();
        state.next_table();
        assert_eq!(state.next_equation(), 2);
        state.begin_section(3);
        assert_eq!(state.next_equation(), 1);
        assert_eq!(state.report_label(1), "1.3.1");
        assert_eq!(state.section_label(4), "3.4");
    }
}
