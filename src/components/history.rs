use std::collections::VecDeque;

/// Default number of snapshots kept on the timeline.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

// ============================================================================
// HISTORY MANAGER – bounded linear timeline of full snapshots
// ============================================================================

/// Linear undo/redo over full snapshots of `T`.
///
/// `state` is the live value the rest of the engine reads. Recorded writes
/// append to `timeline` and move `cursor`; silent writes replace only `state`.
/// Whenever no silent write is outstanding, `state == timeline[cursor]`.
#[derive(Debug, Clone)]
pub struct HistoryManager<T> {
    state: T,
    timeline: VecDeque<T>,
    cursor: usize,
    max_history_size: usize,
    /// Bumped whenever the live state is replaced.
    generation: u64,
}

impl<T: Clone> HistoryManager<T> {
    pub fn new(initial: T, max_history_size: usize) -> Self {
        let mut timeline = VecDeque::with_capacity(max_history_size.max(1));
        timeline.push_back(initial.clone());
        Self {
            state: initial,
            timeline,
            cursor: 0,
            max_history_size: max_history_size.max(1),
            generation: 0,
        }
    }

    /// The live state.
    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Snapshot under the cursor (the last committed state).
    pub fn committed(&self) -> &T {
        &self.timeline[self.cursor]
    }

    /// Commit `new_state` as a new timeline entry. Any redo branch is dropped;
    /// once the capacity is exceeded the oldest entry is evicted and the cursor
    /// stays on the last index.
    pub fn record(&mut self, new_state: T) {
        self.timeline.truncate(self.cursor + 1);
        self.timeline.push_back(new_state.clone());
        if self.timeline.len() > self.max_history_size {
            self.timeline.pop_front();
        } else {
            self.cursor += 1;
        }
        self.state = new_state;
        self.generation += 1;
    }

    /// Replace the live state without touching the timeline.
    pub fn silent_set(&mut self, new_state: T) {
        self.state = new_state;
        self.generation += 1;
    }

    /// Step back one entry. Returns `false` when already at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.state = self.timeline[self.cursor].clone();
        self.generation += 1;
        true
    }

    /// Step forward one entry. Returns `false` when already at the newest entry.
    pub fn redo(&mut self) -> bool {
        if self.cursor + 1 >= self.timeline.len() {
            return false;
        }
        self.cursor += 1;
        self.state = self.timeline[self.cursor].clone();
        self.generation += 1;
        true
    }

    /// Collapse the timeline to the live state alone.
    pub fn clear(&mut self) {
        self.timeline.clear();
        self.timeline.push_back(self.state.clone());
        self.cursor = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.timeline.len()
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.timeline.len() - 1 - self.cursor
    }

    /// Number of snapshots on the timeline.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }
}
