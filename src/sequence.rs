//! Packet sequence tracking
//!
//! Observes header sequence numbers and classifies each packet. Gaps are only
//! counted here; nothing is re-requested.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    First,
    InOrder,
    /// Inclusive range of sequence numbers never seen
    Gap { start: u32, end: u32 },
    /// At or behind the last sequence seen
    Duplicate,
}

#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last_sequence: Option<u32>,
    missing: u64,
    gap_count: u64,
    duplicates: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, seq_num: u32) -> SequenceCheck {
        let last = match self.last_sequence {
            None => {
                self.last_sequence = Some(seq_num);
                return SequenceCheck::First;
            }
            Some(last) => last,
        };

        let expected_next = last.wrapping_add(1);
        if seq_num == expected_next {
            self.last_sequence = Some(seq_num);
            return SequenceCheck::InOrder;
        }

        // distance ahead of `last`, modulo wrap; the upper half counts as behind
        let ahead = seq_num.wrapping_sub(last);
        if ahead == 0 || ahead > u32::MAX / 2 {
            self.duplicates += 1;
            return SequenceCheck::Duplicate;
        }

        let missing = seq_num.wrapping_sub(expected_next);
        self.missing += u64::from(missing);
        self.gap_count += 1;
        self.last_sequence = Some(seq_num);
        SequenceCheck::Gap {
            start: expected_next,
            end: seq_num.wrapping_sub(1),
        }
    }

    /// Total number of missing sequence numbers
    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn gap_count(&self) -> u64 {
        self.gap_count
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}
