//! Repeating host timers owned by the plugin.
//!
//! Two tasks exist: the ambient-spawn sweep and the behaviour pulse that walks
//! every tracked rat. Starting a task always cancels the previous instance, so
//! repeated starts never leave two timers running. Stopping an idle task does
//! nothing.

use mc_rats_plugin_api::ServerApi;
use tracing::debug;

use crate::config::Settings;
use crate::PLUGIN_NAME;

/// Task id of the ambient-spawn sweep.
pub const SWEEP_TASK: u32 = 1;
/// Task id of the per-rat behaviour pulse.
pub const PULSE_TASK: u32 = 2;

/// One host task, tracked by whether it is currently scheduled.
#[derive(Debug)]
pub struct TaskHandle {
    task_id: u32,
    running: bool,
}

impl TaskHandle {
    pub const fn new(task_id: u32) -> Self {
        Self {
            task_id,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self, delay: u64, interval: u64, api: &mut dyn ServerApi) {
        self.stop(api);
        let interval = interval.max(1);
        api.schedule_repeating(PLUGIN_NAME, delay, interval, self.task_id);
        self.running = true;
        debug!(
            "Scheduled task {} (delay {delay}, every {interval} ticks)",
            self.task_id
        );
    }

    pub fn stop(&mut self, api: &mut dyn ServerApi) {
        if std::mem::take(&mut self.running) {
            api.cancel_task(PLUGIN_NAME, self.task_id);
            debug!("Cancelled task {}", self.task_id);
        }
    }
}

#[derive(Debug)]
pub struct Scheduler {
    sweep: TaskHandle,
    pulse: TaskHandle,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            sweep: TaskHandle::new(SWEEP_TASK),
            pulse: TaskHandle::new(PULSE_TASK),
        }
    }

    pub fn sweep_running(&self) -> bool {
        self.sweep.is_running()
    }

    pub fn pulse_running(&self) -> bool {
        self.pulse.is_running()
    }

    /// Bring both timers in line with a (possibly new) settings snapshot.
    /// Running timers are restarted so new periods take effect.
    pub fn sync(&mut self, settings: &Settings, api: &mut dyn ServerApi) {
        if settings.enabled && settings.spawning.natural {
            self.sweep.start(
                settings.spawning.initial_delay,
                settings.spawning.interval,
                api,
            );
        } else {
            self.sweep.stop(api);
        }

        if settings.enabled {
            let every = settings.rat.behavior_interval;
            self.pulse.start(every, every, api);
        } else {
            self.pulse.stop(api);
        }
    }

    pub fn stop_all(&mut self, api: &mut dyn ServerApi) {
        self.sweep.stop(api);
        self.pulse.stop(api);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, ScheduledTask};

    #[test]
    fn handle_tracks_running_across_start_and_stop() {
        let mut api = MockApi::new();
        let mut handle = TaskHandle::new(SWEEP_TASK);
        assert!(!handle.is_running());

        handle.start(5, 0, &mut api);
        assert!(handle.is_running());
        assert_eq!(
            api.tasks,
            vec![ScheduledTask {
                task_id: SWEEP_TASK,
                delay: 5,
                interval: 1
            }]
        );

        handle.stop(&mut api);
        assert!(!handle.is_running());
        assert!(api.tasks.is_empty());
    }

    #[test]
    fn sync_starts_both_timers() {
        let mut api = MockApi::new();
        let mut sched = Scheduler::new();
        sched.sync(&Settings::default(), &mut api);

        assert!(sched.sweep_running() && sched.pulse_running());
        assert_eq!(
            api.tasks,
            vec![
                ScheduledTask {
                    task_id: SWEEP_TASK,
                    delay: 200,
                    interval: 600
                },
                ScheduledTask {
                    task_id: PULSE_TASK,
                    delay: 20,
                    interval: 20
                },
            ]
        );
    }

    #[test]
    fn repeated_starts_never_duplicate() {
        let mut api = MockApi::new();
        let mut sched = Scheduler::new();
        let settings = Settings::default();
        for _ in 0..5 {
            sched.sync(&settings, &mut api);
        }
        assert_eq!(api.active_tasks(SWEEP_TASK), 1);
        assert_eq!(api.active_tasks(PULSE_TASK), 1);
    }

    #[test]
    fn disabling_natural_spawning_stops_only_the_sweep() {
        let mut api = MockApi::new();
        let mut sched = Scheduler::new();
        let mut settings = Settings::default();
        sched.sync(&settings, &mut api);

        settings.spawning.natural = false;
        sched.sync(&settings, &mut api);
        assert!(!sched.sweep_running());
        assert_eq!(api.active_tasks(SWEEP_TASK), 0);
        assert_eq!(api.active_tasks(PULSE_TASK), 1);

        settings.spawning.natural = true;
        settings.spawning.interval = 100;
        sched.sync(&settings, &mut api);
        assert_eq!(api.active_tasks(SWEEP_TASK), 1);
        assert!(api
            .tasks
            .iter()
            .any(|t| t.task_id == SWEEP_TASK && t.interval == 100));
    }

    #[test]
    fn disabled_plugin_runs_no_timers() {
        let mut api = MockApi::new();
        let mut sched = Scheduler::new();
        let mut settings = Settings::default();
        settings.enabled = false;
        sched.sync(&settings, &mut api);
        assert!(api.tasks.is_empty());
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let mut api = MockApi::new();
        let mut sched = Scheduler::new();
        sched.stop_all(&mut api);
        sched.stop_all(&mut api);
        assert!(api.tasks.is_empty());

        sched.sync(&Settings::default(), &mut api);
        sched.stop_all(&mut api);
        sched.stop_all(&mut api);
        assert!(api.tasks.is_empty());
        assert!(!sched.sweep_running() && !sched.pulse_running());
    }
}
