//! Cooperative stand-in for a periodic timer interrupt.
//!
//! Each task holds at most one pending fire time, like a one-shot hardware
//! timer that its handler re-arms. The main flow polls `take_due` between
//! its own bus transactions; masking defers every task until unmasked.

/// Handle to a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

#[derive(Debug)]
struct Task {
    name: &'static str,
    next_fire_us: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
    mask_depth: u32,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str) -> TaskId {
        self.tasks.push(Task {
            name,
            next_fire_us: None,
        });
        TaskId(self.tasks.len() - 1)
    }

    /// Arm `task` to fire at `at_us`, replacing any pending time.
    pub fn schedule(&mut self, task: TaskId, at_us: u64) {
        self.tasks[task.0].next_fire_us = Some(at_us);
    }

    pub fn cancel(&mut self, task: TaskId) {
        let task = &mut self.tasks[task.0];
        if task.next_fire_us.take().is_some() {
            log::debug!("cancelled {}", task.name);
        }
    }

    #[must_use]
    pub fn next_fire(&self, task: TaskId) -> Option<u64> {
        self.tasks[task.0].next_fire_us
    }

    /// Masks nest; each `mask` needs its `unmask`.
    pub fn mask(&mut self) {
        self.mask_depth += 1;
    }

    pub fn unmask(&mut self) {
        self.mask_depth = self.mask_depth.saturating_sub(1);
    }

    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.mask_depth > 0
    }

    /// Disarm and return the earliest task due at `now_us`, together with
    /// the time it was scheduled for.
    pub fn take_due(&mut self, now_us: u64) -> Option<(TaskId, u64)> {
        if self.is_masked() {
            return None;
        }
        let (index, at) = self
            .tasks
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.next_fire_us.map(|at| (i, at)))
            .filter(|&(_, at)| at <= now_us)
            .min_by_key(|&(_, at)| at)?;
        self.tasks[index].next_fire_us = None;
        Some((TaskId(index), at))
    }
}
