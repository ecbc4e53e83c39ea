use std::collections::VecDeque;

/// Bounded, most-recent-last series
///
/// Once `capacity` is reached every push evicts the oldest entry, so the
/// length never exceeds the capacity.
#[derive(Debug, Clone)]
pub struct RollingSeries<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingSeries<T> {
    /// Create an empty series
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries to keep (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a series pre-filled with `values` (oldest first)
    pub fn seeded(capacity: usize, values: impl IntoIterator<Item = T>) -> Self {
        let mut series = Self::new(capacity);
        series.extend(values);
        series
    }

    /// Append a value, returning the evicted oldest entry if the series was full
    pub fn push(&mut self, value: T) -> Option<T> {
        self.data.push_back(value);

        if self.data.len() > self.capacity {
            self.data.pop_front()
        } else {
            None
        }
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.push(value);
        }
    }

    /// Replace the whole content with `values`
    pub fn reset_with(&mut self, values: impl IntoIterator<Item = T>) {
        self.data.clear();
        self.extend(values);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Entry by index, 0 = oldest
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Entry by offset from the end, 1 = most recent
    pub fn from_end(&self, offset: usize) -> Option<&T> {
        if offset == 0 || offset > self.data.len() {
            return None;
        }
        self.data.get(self.data.len() - offset)
    }

    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }

    /// The `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<T> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
