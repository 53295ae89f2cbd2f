use heapless::Deque;

/// Hard upper bound on the runtime window capacity.
pub const MAX_WINDOW_SAMPLES: usize = 512;

/// Fixed-capacity FIFO of user-acceleration magnitudes.
///
/// The count of samples strictly above the threshold is maintained on every
/// push and eviction, so the high-energy ratio is O(1) per sample.
#[derive(Clone, Debug)]
pub struct MagnitudeWindow {
    samples: Deque<f64, MAX_WINDOW_SAMPLES>,
    capacity: usize,
    threshold: f64,
    exceeding: usize,
}

impl MagnitudeWindow {
    /// Creates an empty window; `capacity` is clamped to `1..=MAX_WINDOW_SAMPLES`.
    #[must_use]
    pub fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            samples: Deque::new(),
            capacity: capacity.clamp(1, MAX_WINDOW_SAMPLES),
            threshold,
            exceeding: 0,
        }
    }

    /// Appends a magnitude, evicting the oldest entry when the window is full.
    pub fn push(&mut self, magnitude: f64) {
        if self.samples.len() >= self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                if evicted > self.threshold {
                    self.exceeding -= 1;
                }
            }
        }

        if self.samples.push_back(magnitude).is_ok() && magnitude > self.threshold {
            self.exceeding += 1;
        }
    }

    /// Empties the window.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.exceeding = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples strictly greater than the threshold.
    pub fn exceeding(&self) -> usize {
        self.exceeding
    }

    /// Fraction of samples above the threshold, available once the window is full.
    pub fn ratio(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(as_f64(self.exceeding) / as_f64(self.capacity))
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }
}

fn as_f64(count: usize) -> f64 {
    // Window sizes are bounded by MAX_WINDOW_SAMPLES so the u32 conversion is exact.
    f64::from(u32::try_from(count).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_equal_to_threshold_does_not_count() {
        let mut window = MagnitudeWindow::new(4, 2.0);
        for value in [2.0, 2.0, 2.000_001, 1.0] {
            window.push(value);
        }

        assert_eq!(window.exceeding(), 1);
        assert_eq!(window.ratio(), Some(0.25));
    }

    #[test]
    fn ratio_is_withheld_until_full() {
        let mut window = MagnitudeWindow::new(3, 2.0);
        window.push(5.0);
        window.push(5.0);
        assert_eq!(window.ratio(), None);

        window.push(5.0);
        assert_eq!(window.ratio(), Some(1.0));
    }

    #[test]
    fn eviction_is_fifo_and_updates_count() {
        let mut window = MagnitudeWindow::new(3, 2.0);
        for value in [3.0, 0.5, 0.5, 0.5] {
            window.push(value);
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.exceeding(), 0);
        let contents: heapless::Vec<f64, 3> = window.iter().copied().collect();
        assert_eq!(contents.as_slice(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn incremental_count_matches_recount() {
        let mut window = MagnitudeWindow::new(7, 2.0);
        let pattern = [0.1, 2.5, 2.0, 3.3, 0.0, 9.0, 2.1, 1.9, 4.0, 2.0, 0.2, 7.5];
        for (index, value) in pattern.iter().cycle().take(60).enumerate() {
            window.push(*value);
            let recount = window.iter().filter(|sample| **sample > 2.0).count();
            assert_eq!(window.exceeding(), recount, "mismatch after push {index}");
            assert!(window.len() <= window.capacity());
        }
    }

    #[test]
    fn clear_resets_state() {
        let mut window = MagnitudeWindow::new(2, 1.0);
        window.push(4.0);
        window.push(4.0);
        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.exceeding(), 0);
        assert_eq!(window.ratio(), None);
    }
}
