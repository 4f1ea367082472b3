use crate::buffer::PixelBuffer;

/// Label of the record every history starts with.
pub const ORIGINAL_LABEL: &str = "Original Image";

/// One committed edit.
#[derive(Clone, Debug, PartialEq)]
pub struct EditRecord {
    pub buffer: PixelBuffer,
    pub label: String,
}

// ============================================================================
// EDIT HISTORY - linear, append-only list of committed images
// ============================================================================

/// Linear edit history. Index 0 is always the untouched original and cannot
/// be deleted; every commit appends and becomes the displayed record.
#[derive(Clone, Debug)]
pub struct EditHistory {
    records: Vec<EditRecord>,
    selected: usize,
    /// Running byte total across all records.
    total_memory: usize,
}

impl EditHistory {
    pub fn new(original: PixelBuffer) -> Self {
        let total_memory = original.memory_size();
        Self {
            records: vec![EditRecord { buffer: original, label: ORIGINAL_LABEL.to_string() }],
            selected: 0,
            total_memory,
        }
    }

    /// Drop everything and start again from a new original.
    pub fn clear_with(&mut self, original: PixelBuffer) {
        *self = Self::new(original);
    }

    /// Append a confirmed edit; returns its index.
    pub fn commit(&mut self, buffer: PixelBuffer, label: impl Into<String>) -> usize {
        self.total_memory += buffer.memory_size();
        self.records.push(EditRecord { buffer, label: label.into() });
        self.selected = self.records.len() - 1;
        self.selected
    }

    /// Make record `index` the displayed one.
    pub fn select(&mut self, index: usize) -> Option<&PixelBuffer> {
        let record = self.records.get(index)?;
        self.selected = index;
        Some(&record.buffer)
    }

    /// Remove record `index`. Returns the index to display next: the record
    /// that moved into its place, or the preceding one when the last record
    /// was removed. Index 0 and out-of-range indices are refused.
    pub fn delete(&mut self, index: usize) -> Option<usize> {
        if index == 0 || index >= self.records.len() {
            return None;
        }
        let removed = self.records.remove(index);
        self.total_memory = self.total_memory.saturating_sub(removed.buffer.memory_size());
        self.selected = if index < self.records.len() { index } else { index - 1 };
        Some(self.selected)
    }

    pub fn get(&self, index: usize) -> Option<&EditRecord> {
        self.records.get(index)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_record(&self) -> &EditRecord {
        // `selected` is kept in range by every mutation.
        &self.records[self.selected.min(self.records.len() - 1)]
    }

    pub fn original(&self) -> &PixelBuffer {
        &self.records[0].buffer
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Never true: the original record is always present.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.label.as_str()).collect()
    }

    /// Bytes of pixel data held by all records.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }
}
