/// Answers whether a row is currently excluded by the dataset's filters.
///
/// The column write path consults this on every level-tracked integer write
/// and during count reconciliation to maintain `count_ex_filtered`.
pub trait RowFilter {
    fn is_row_filtered(&self, row: usize) -> bool;
}

/// No row is ever filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl RowFilter for NoFilter {
    fn is_row_filtered(&self, _row: usize) -> bool {
        false
    }
}

impl<F> RowFilter for F
where
    F: Fn(usize) -> bool,
{
    fn is_row_filtered(&self, row: usize) -> bool {
        self(row)
    }
}

/// Per-row filter state as a compact bit vector (set bit = filtered).
///
/// Bits are stored little-endian within each `u64` word. Rows past the end of
/// the mask are treated as not filtered, so a mask built for an older row
/// count stays usable after rows are appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterMask {
    words: Vec<u64>,
    len: usize,
    filtered: usize,
}

impl FilterMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mask of `rows` rows, none filtered.
    pub fn with_len(rows: usize) -> Self {
        Self {
            words: vec![0u64; rows.div_ceil(64)],
            len: rows,
            filtered: 0,
        }
    }

    /// Reconstruct a mask from raw words, e.g. as shared by the filter evaluator.
    pub fn from_words(mut words: Vec<u64>, len: usize) -> Self {
        words.resize(len.div_ceil(64), 0);
        let rem = len % 64;
        if rem != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
        let filtered = words.iter().map(|w| w.count_ones() as usize).sum();
        Self {
            words,
            len,
            filtered,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of rows marked filtered.
    pub fn filtered_count(&self) -> usize {
        self.filtered
    }

    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    pub fn push(&mut self, filtered: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }
        if filtered {
            self.words[self.len / 64] |= 1u64 << bit;
            self.filtered += 1;
        }
        self.len += 1;
    }

    /// Mark `row` as filtered or not, extending the mask if needed.
    pub fn set(&mut self, row: usize, filtered: bool) {
        while self.len <= row {
            self.push(false);
        }

        let word = &mut self.words[row / 64];
        let mask = 1u64 << (row % 64);
        let was = (*word & mask) != 0;
        match (was, filtered) {
            (false, true) => {
                *word |= mask;
                self.filtered += 1;
            }
            (true, false) => {
                *word &= !mask;
                self.filtered -= 1;
            }
            _ => {}
        }
    }

    /// Rows marked filtered, in increasing order.
    pub fn iter_filtered(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(word_idx * 64 + bit)
            })
        })
    }
}

impl RowFilter for FilterMask {
    fn is_row_filtered(&self, row: usize) -> bool {
        if row >= self.len {
            return false;
        }
        (self.words[row / 64] >> (row % 64)) & 1 == 1
    }
}
