//! Ordered registry of frame tasks driven by one external tick per frame.

use std::panic::{self, AssertUnwindSafe};

use rustc_hash::FxHashMap;

use crate::error::{ScheduleError, TaskError};
use crate::priority::Priority;
use crate::task::{FrameContext, FrameTask, FrameTime};

/// Details of one isolated task failure, passed to the failure hook.
#[derive(Debug)]
pub struct TaskFailure<'a> {
    pub id: &'a str,
    pub frame: u64,
    pub error: &'a TaskError,
    /// Failures of this task so far, including this one.
    pub count: u64,
}

/// Observer for task failures, e.g. to surface frozen animations in a HUD.
pub type FailureHook = Box<dyn FnMut(&TaskFailure<'_>)>;

struct Entry<C> {
    id: String,
    priority: Priority,
    /// Registration sequence; breaks priority ties.
    seq: u64,
    task: Box<dyn FrameTask<C>>,
    failures: u64,
}

/// Runs registered [`FrameTask`]s once per frame in priority order.
///
/// The sorted order is derived lazily: structural changes (register,
/// unregister) mark it dirty and the next read rebuilds it. Swapping a task
/// with [`replace_task`](Self::replace_task) leaves the order alone.
///
/// Owned by the render session; not thread-safe.
pub struct FrameScheduler<C> {
    slots: Vec<Option<Entry<C>>>,
    free: Vec<usize>,
    index: FxHashMap<String, usize>,
    order: Vec<usize>,
    order_dirty: bool,
    order_rebuilds: u64,
    next_seq: u64,
    frame: u64,
    total_failures: u64,
    failure_hook: Option<FailureHook>,
}

impl<C> FrameScheduler<C> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: FxHashMap::default(),
            order: Vec::new(),
            order_dirty: false,
            order_rebuilds: 0,
            next_seq: 0,
            frame: 0,
            total_failures: 0,
            failure_hook: None,
        }
    }

    /// Register `task` under `id`, or replace the task and priority of an
    /// existing `id`. A replaced entry keeps its original registration
    /// position among equal priorities.
    ///
    /// Empty or blank ids are rejected and nothing is registered.
    pub fn register<T>(
        &mut self,
        id: &str,
        task: T,
        priority: impl Into<Priority>,
    ) -> Result<(), ScheduleError>
    where
        T: FrameTask<C> + 'static,
    {
        if id.trim().is_empty() {
            log::warn!("rejected frame task with empty id");
            return Err(ScheduleError::EmptyId);
        }
        let priority = priority.into();
        let task: Box<dyn FrameTask<C>> = Box::new(task);

        if let Some(&slot) = self.index.get(id)
            && let Some(entry) = self.slots[slot].as_mut()
        {
            log::debug!("re-registering frame task `{id}` at {}", priority.value());
            entry.task = task;
            entry.priority = priority;
            self.order_dirty = true;
            return Ok(());
        }

        let entry = Entry {
            id: id.to_owned(),
            priority,
            seq: self.next_seq,
            task,
            failures: 0,
        };
        self.next_seq += 1;

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.index.insert(id.to_owned(), slot);
        self.order_dirty = true;
        log::debug!("registered frame task `{id}` at {}", priority.value());
        Ok(())
    }

    /// Remove the task registered under `id`. Unknown ids are ignored.
    /// Returns whether anything was removed.
    pub fn unregister(&mut self, id: &str) -> bool {
        let Some(slot) = self.index.remove(id) else {
            return false;
        };
        self.slots[slot] = None;
        self.free.push(slot);
        self.order_dirty = true;
        log::debug!("unregistered frame task `{id}`");
        true
    }

    /// Swap the task for an existing `id` without touching its priority or
    /// the derived order. Returns `false` if `id` is not registered.
    pub fn replace_task<T>(&mut self, id: &str, task: T) -> bool
    where
        T: FrameTask<C> + 'static,
    {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.task = Box::new(task);
                true
            }
            None => false,
        }
    }

    /// Install an observer called for every isolated task failure.
    pub fn set_failure_hook(&mut self, hook: impl FnMut(&TaskFailure<'_>) + 'static) {
        self.failure_hook = Some(Box::new(hook));
    }

    pub fn clear_failure_hook(&mut self) {
        self.failure_hook = None;
    }

    /// Run one frame: rebuild the order if dirty, reset the context's
    /// scratch state, then run every task in order.
    ///
    /// A task that returns an error or panics is reported and skipped for the
    /// rest of this frame; the remaining tasks still run. Failing tasks stay
    /// registered. A panicking task may leave `ctx` partially updated.
    pub fn tick(&mut self, ctx: &mut C, elapsed: f64, delta: f64)
    where
        C: FrameContext,
    {
        self.ensure_order();
        ctx.reset_scratch();

        let time = FrameTime {
            elapsed,
            delta,
            frame: self.frame,
        };

        for &slot in &self.order {
            let Some(entry) = self.slots[slot].as_mut() else {
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.task.on_tick(ctx, time)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => TaskError::Panicked(panic_message(payload.as_ref())),
            };

            entry.failures += 1;
            self.total_failures += 1;
            log::warn!(
                "frame task `{}` failed on frame {} ({} total): {}",
                entry.id,
                time.frame,
                entry.failures,
                error
            );
            if let Some(hook) = self.failure_hook.as_mut() {
                hook(&TaskFailure {
                    id: &entry.id,
                    frame: time.frame,
                    error: &error,
                    count: entry.failures,
                });
            }
        }

        self.frame += 1;
    }

    fn ensure_order(&mut self) {
        if !self.order_dirty {
            return;
        }
        let slots = &self.slots;
        self.order.clear();
        self.order.extend(
            slots
                .iter()
                .enumerate()
                .filter_map(|(i, entry)| entry.as_ref().map(|_| i)),
        );
        // (priority, seq) is unique per entry, so an unstable sort is stable here.
        self.order.sort_unstable_by_key(|&i| {
            slots[i]
                .as_ref()
                .map(|e| (e.priority, e.seq))
                .unwrap_or((Priority(i32::MAX), u64::MAX))
        });
        self.order_dirty = false;
        self.order_rebuilds += 1;
    }

    /// Registered ids in the order the next tick will run them.
    pub fn ordered_ids(&mut self) -> impl Iterator<Item = &str> + '_ {
        self.ensure_order();
        let slots = &self.slots;
        self.order
            .iter()
            .filter_map(move |&i| slots[i].as_ref().map(|e| e.id.as_str()))
    }

    fn entry(&self, id: &str) -> Option<&Entry<C>> {
        self.index
            .get(id)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut Entry<C>> {
        let slot = *self.index.get(id)?;
        self.slots[slot].as_mut()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn priority_of(&self, id: &str) -> Option<Priority> {
        self.entry(id).map(|e| e.priority)
    }

    /// Failures recorded for `id` since it was first registered.
    pub fn failure_count(&self, id: &str) -> Option<u64> {
        self.entry(id).map(|e| e.failures)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ticks run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// How many times the sorted order has been rebuilt.
    pub fn order_rebuilds(&self) -> u64 {
        self.order_rebuilds
    }
}

impl<C> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::Phase;
    use crate::task::FnTask;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        calls: Vec<&'static str>,
        resets: u32,
        seen_time: Vec<FrameTime>,
    }

    impl FrameContext for Log {
        fn reset_scratch(&mut self) {
            self.resets += 1;
            self.calls.push("reset");
        }
    }

    fn push(name: &'static str) -> FnTask<impl FnMut(&mut Log, FrameTime) -> Result<(), TaskError>> {
        FnTask(move |log: &mut Log, _time: FrameTime| -> Result<(), TaskError> {
            log.calls.push(name);
            Ok(())
        })
    }

    fn calls_after_reset(log: &Log) -> Vec<&'static str> {
        log.calls.iter().copied().filter(|c| *c != "reset").collect()
    }

    #[test]
    fn test_priority_then_registration_order() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("A", push("A"), 5).unwrap();
        scheduler.register("B", push("B"), 1).unwrap();
        scheduler.register("C", push("C"), 1).unwrap();

        let mut log = Log::default();
        scheduler.tick(&mut log, 0.0, 0.016);
        assert_eq!(calls_after_reset(&log), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_phases_order_tasks() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("stats", push("stats"), Phase::PostFrame).unwrap();
        scheduler.register("anim", push("anim"), Phase::Presentation).unwrap();
        scheduler.register("camera", push("camera"), Phase::PreFrame).unwrap();
        scheduler.register("move", push("move"), Phase::Simulation.offset(1)).unwrap();
        scheduler.register("path", push("path"), Phase::Simulation).unwrap();

        let ids: Vec<&str> = scheduler.ordered_ids().collect();
        assert_eq!(ids, vec!["camera", "path", "move", "anim", "stats"]);
    }

    #[test]
    fn test_reset_runs_before_tasks_every_tick() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("a", push("a"), 0).unwrap();
        let mut log = Log::default();
        scheduler.tick(&mut log, 0.0, 0.016);
        scheduler.tick(&mut log, 0.016, 0.016);
        assert_eq!(log.calls, vec!["reset", "a", "reset", "a"]);
        assert_eq!(log.resets, 2);
    }

    #[test]
    fn test_tasks_receive_elapsed_and_delta() {
        let mut scheduler = FrameScheduler::new();
        scheduler
            .register(
                "t",
                FnTask(|log: &mut Log, time: FrameTime| -> Result<(), TaskError> {
                    log.seen_time.push(time);
                    Ok(())
                }),
                0,
            )
            .unwrap();
        let mut log = Log::default();
        scheduler.tick(&mut log, 1.5, 0.02);
        scheduler.tick(&mut log, 1.52, 0.02);
        assert_eq!(log.seen_time[0].elapsed, 1.5);
        assert_eq!(log.seen_time[0].delta, 0.02);
        assert_eq!(log.seen_time[0].frame, 0);
        assert_eq!(log.seen_time[1].frame, 1);
        assert_eq!(scheduler.frame_count(), 2);
    }

    #[test]
    fn test_unregister_stops_invocation() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("a", push("a"), 0).unwrap();
        scheduler.register("b", push("b"), 0).unwrap();
        assert!(scheduler.unregister("a"));
        assert!(!scheduler.unregister("a"));
        assert!(!scheduler.unregister("never-registered"));

        let mut log = Log::default();
        for _ in 0..3 {
            scheduler.tick(&mut log, 0.0, 0.016);
        }
        assert_eq!(calls_after_reset(&log), vec!["b", "b", "b"]);
        assert!(!scheduler.contains("a"));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut scheduler: FrameScheduler<Log> = FrameScheduler::new();
        assert_eq!(
            scheduler.register("", push("x"), 0),
            Err(ScheduleError::EmptyId)
        );
        assert_eq!(
            scheduler.register("   ", push("x"), 0),
            Err(ScheduleError::EmptyId)
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_replace_task_keeps_order_clean() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("a", push("a"), 2).unwrap();
        scheduler.register("b", push("b"), 1).unwrap();
        let mut log = Log::default();
        scheduler.tick(&mut log, 0.0, 0.016);
        assert_eq!(scheduler.order_rebuilds(), 1);

        assert!(scheduler.replace_task("a", push("a2")));
        assert!(!scheduler.replace_task("missing", push("x")));
        scheduler.tick(&mut log, 0.0, 0.016);
        assert_eq!(scheduler.order_rebuilds(), 1);
        assert_eq!(calls_after_reset(&log), vec!["b", "a", "b", "a2"]);
    }

    #[test]
    fn test_order_rebuilt_only_on_structural_change() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("a", push("a"), 0).unwrap();
        let mut log = Log::default();
        for _ in 0..5 {
            scheduler.tick(&mut log, 0.0, 0.016);
        }
        assert_eq!(scheduler.order_rebuilds(), 1);
        scheduler.register("b", push("b"), 0).unwrap();
        scheduler.tick(&mut log, 0.0, 0.016);
        assert_eq!(scheduler.order_rebuilds(), 2);
    }

    #[test]
    fn test_reregister_overwrites_priority_and_keeps_position() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("a", push("a"), 1).unwrap();
        scheduler.register("b", push("b"), 1).unwrap();
        scheduler.register("c", push("c"), 0).unwrap();
        // Move `c` into the same band as `a` and `b`; it was registered last.
        scheduler.register("c", push("c2"), 1).unwrap();
        // Re-register `a` with a new task; it keeps its place ahead of `b`.
        scheduler.register("a", push("a2"), 1).unwrap();
        assert_eq!(scheduler.len(), 3);
        assert_eq!(scheduler.priority_of("c"), Some(Priority(1)));

        let mut log = Log::default();
        scheduler.tick(&mut log, 0.0, 0.016);
        assert_eq!(calls_after_reset(&log), vec!["a2", "b", "c2"]);
    }

    #[test]
    fn test_failing_task_is_isolated_and_reported() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("first", push("first"), 0).unwrap();
        scheduler
            .register(
                "broken",
                FnTask(|_: &mut Log, _: FrameTime| -> Result<(), TaskError> {
                    Err(TaskError::failed("rig missing"))
                }),
                1,
            )
            .unwrap();
        scheduler
            .register(
                "panics",
                FnTask(|_: &mut Log, _: FrameTime| -> Result<(), TaskError> {
                    panic!("bad bone index")
                }),
                2,
            )
            .unwrap();
        scheduler.register("last", push("last"), 3).unwrap();

        let reports: Rc<RefCell<Vec<(String, TaskError, u64)>>> = Rc::default();
        let sink = Rc::clone(&reports);
        scheduler.set_failure_hook(move |failure| {
            sink.borrow_mut()
                .push((failure.id.to_owned(), failure.error.clone(), failure.count));
        });

        let mut log = Log::default();
        scheduler.tick(&mut log, 0.0, 0.016);
        scheduler.tick(&mut log, 0.016, 0.016);

        assert_eq!(
            calls_after_reset(&log),
            vec!["first", "last", "first", "last"]
        );
        let reports = reports.borrow();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].0, "broken");
        assert_eq!(reports[0].1, TaskError::Failed("rig missing".into()));
        assert_eq!(reports[1].0, "panics");
        assert_eq!(reports[1].1, TaskError::Panicked("bad bone index".into()));
        assert_eq!(reports[2].2, 2, "each failure counted individually");

        // Not auto-unregistered.
        assert!(scheduler.contains("broken"));
        assert_eq!(scheduler.failure_count("broken"), Some(2));
        assert_eq!(scheduler.failure_count("panics"), Some(2));
        assert_eq!(scheduler.total_failures(), 4);
    }

    #[test]
    fn test_free_slots_reused_without_reordering_bugs() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register("a", push("a"), 0).unwrap();
        scheduler.register("b", push("b"), 0).unwrap();
        scheduler.unregister("a");
        scheduler.register("c", push("c"), 0).unwrap();
        let ids: Vec<&str> = scheduler.ordered_ids().collect();
        // `c` reuses a's slot but registered after `b`.
        assert_eq!(ids, vec!["b", "c"]);
    }
}
