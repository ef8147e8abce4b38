//! The run lifecycle: `Ready` → `Playing` → `Ended`, and back to `Ready` on
//! restart.
//!
//! [`RunState`] is the single source of truth for the phase. Transitions are
//! methods that return the [`PhaseChanged`] they caused (or `None` when the
//! call is ignored); systems forward that value as an event, so observers
//! always run in a later system and can never re-enter a transition.

use std::time::Duration;

use bevy::prelude::*;

use crate::level::LevelConfig;
use crate::GameSet;

/// Plugin for this module.
pub struct RunPlugin;

impl Plugin for RunPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RunState>()
            .add_event::<PhaseChanged>()
            .add_systems(Startup, begin_session)
            .add_systems(
                Update,
                (
                    restart_on_config_change.in_set(GameSet::Outcome),
                    log_phase_changes.after(GameSet::Lifecycle),
                ),
            );
    }
}

/// The stage of a single attempt at the course.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting at the spawn point for the first input.
    #[default]
    Ready,
    /// The timer is running.
    Playing,
    /// The goal was reached; the timer is frozen.
    Ended,
}

/// Sent whenever [`RunState`] changes phase.
///
/// `Ready → Ready` is a valid change: a restart from `Ready` still rebuilds
/// the level and resets the player.
#[derive(Clone, Copy, Debug, Event, PartialEq, Eq)]
pub struct PhaseChanged {
    pub from: Phase,
    pub to: Phase,
}

impl PhaseChanged {
    /// Whether this change (re-)enters [`Phase::Ready`].
    pub fn is_reset(&self) -> bool {
        self.to == Phase::Ready
    }
}

/// The run state shared by the controller, the level and the HUD.
#[derive(Clone, Debug, Default, Resource)]
pub struct RunState {
    phase: Phase,
    start_time: Option<Duration>,
    end_time: Option<Duration>,
    segment_count: usize,
    attempts: u32,
}

impl RunState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_time(&self) -> Option<Duration> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Duration> {
        self.end_time
    }

    /// Number of obstacle segments in the active level.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Number of restarts this session, including the initial one.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Starts the timer. Only valid from [`Phase::Ready`].
    pub fn start(&mut self, now: Duration) -> Option<PhaseChanged> {
        if self.phase != Phase::Ready {
            return None;
        }

        self.start_time = Some(now);
        self.end_time = None;
        Some(self.set_phase(Phase::Playing))
    }

    /// Stops the timer. Only valid from [`Phase::Playing`].
    pub fn end(&mut self, now: Duration) -> Option<PhaseChanged> {
        if self.phase != Phase::Playing {
            return None;
        }

        self.end_time = Some(now);
        Some(self.set_phase(Phase::Ended))
    }

    /// Returns to [`Phase::Ready`] with a level of `segment_count` segments.
    ///
    /// Valid from every phase. Level regeneration and the player reset are
    /// driven by the returned [`PhaseChanged`].
    pub fn restart(&mut self, segment_count: usize) -> Option<PhaseChanged> {
        self.start_time = None;
        self.end_time = None;
        self.segment_count = segment_count;
        self.attempts += 1;
        Some(self.set_phase(Phase::Ready))
    }

    /// The time the HUD displays at `now`.
    pub fn elapsed(&self, now: Duration) -> Duration {
        match (self.phase, self.start_time, self.end_time) {
            (Phase::Playing, Some(start), _) => now.saturating_sub(start),
            (Phase::Ended, Some(start), Some(end)) => end.saturating_sub(start),
            _ => Duration::ZERO,
        }
    }

    fn set_phase(&mut self, to: Phase) -> PhaseChanged {
        let from = std::mem::replace(&mut self.phase, to);
        PhaseChanged { from, to }
    }
}

/// Run condition: the run is in `phase`.
pub fn in_phase(phase: Phase) -> impl Fn(Res<RunState>) -> bool + Clone {
    move |run: Res<RunState>| run.phase == phase
}

/// Builds the first level through the regular restart path.
pub fn begin_session(
    mut run: ResMut<RunState>,
    config: Res<LevelConfig>,
    mut changes: EventWriter<PhaseChanged>,
) {
    if let Some(change) = run.restart(config.segment_count()) {
        changes.send(change);
    }
}

/// Restarts the run when the level configuration is edited at runtime.
pub fn restart_on_config_change(
    mut run: ResMut<RunState>,
    config: Res<LevelConfig>,
    mut changes: EventWriter<PhaseChanged>,
) {
    if !config.is_changed() || config.is_added() {
        return;
    }

    info!("level config changed, restarting");
    if let Some(change) = run.restart(config.segment_count()) {
        changes.send(change);
    }
}

fn log_phase_changes(run: Res<RunState>, mut changes: EventReader<PhaseChanged>) {
    for change in changes.read() {
        match change.to {
            Phase::Ready => info!(
                "attempt {} ready ({} segments)",
                run.attempts(),
                run.segment_count()
            ),
            Phase::Playing => info!("run started"),
            Phase::Ended => {
                if let (Some(start), Some(end)) = (run.start_time(), run.end_time()) {
                    info!("run finished in {:.2}s", (end - start).as_secs_f32());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    fn ready_run() -> RunState {
        let mut run = RunState::default();
        run.restart(3);
        run
    }

    #[test]
    fn start_from_ready_sets_start_time() {
        let mut run = ready_run();

        let change = run.start(secs(1.5));

        assert_eq!(
            change,
            Some(PhaseChanged {
                from: Phase::Ready,
                to: Phase::Playing
            })
        );
        assert_eq!(run.phase(), Phase::Playing);
        assert_eq!(run.start_time(), Some(secs(1.5)));
    }

    #[test]
    fn start_while_playing_is_ignored() {
        let mut run = ready_run();
        run.start(secs(1.0));

        assert_eq!(run.start(secs(2.0)), None);
        assert_eq!(run.phase(), Phase::Playing);
        assert_eq!(run.start_time(), Some(secs(1.0)));
    }

    #[test]
    fn end_only_from_playing() {
        let mut run = ready_run();
        assert_eq!(run.end(secs(1.0)), None);
        assert_eq!(run.phase(), Phase::Ready);

        run.start(secs(1.0));
        run.end(secs(4.0));
        assert_eq!(run.phase(), Phase::Ended);
        assert!(run.end_time() >= run.start_time());

        assert_eq!(run.end(secs(5.0)), None);
        assert_eq!(run.end_time(), Some(secs(4.0)));
    }

    fn playing_run() -> RunState {
        let mut run = ready_run();
        run.start(secs(1.0));
        run
    }

    fn ended_run() -> RunState {
        let mut run = playing_run();
        run.end(secs(2.0));
        run
    }

    #[test]
    fn restart_from_any_phase() {
        for mut run in [ready_run(), playing_run(), ended_run()] {
            let from = run.phase();

            let change = run.restart(7).unwrap();

            assert_eq!(change.from, from);
            assert!(change.is_reset());
            assert_eq!(run.phase(), Phase::Ready);
            assert_eq!(run.segment_count(), 7);
            assert_eq!(run.start_time(), None);
            assert_eq!(run.end_time(), None);
        }
    }

    #[test]
    fn restart_counts_attempts() {
        let mut run = RunState::default();
        run.restart(1);
        run.restart(1);
        assert_eq!(run.attempts(), 2);
    }

    #[test]
    fn elapsed_follows_phase() {
        let mut run = ready_run();
        assert_eq!(run.elapsed(secs(10.0)), Duration::ZERO);

        run.start(secs(2.0));
        assert_eq!(run.elapsed(secs(5.0)), secs(5.0) - secs(2.0));

        run.end(secs(6.0));
        assert_eq!(run.elapsed(secs(100.0)), secs(6.0) - secs(2.0));

        run.restart(3);
        assert_eq!(run.elapsed(secs(100.0)), Duration::ZERO);
    }

    #[test]
    fn editing_level_config_restarts() {
        let mut world = World::new();
        world.init_resource::<LevelConfig>();
        world.init_resource::<Events<PhaseChanged>>();
        world.insert_resource(playing_run());

        let mut schedule = Schedule::default();
        schedule.add_systems(restart_on_config_change);

        // freshly inserted config is not an edit
        schedule.run(&mut world);
        assert_eq!(world.resource::<RunState>().phase(), Phase::Playing);

        world.resource_mut::<LevelConfig>().set_segment_count(6);
        schedule.run(&mut world);

        let run = world.resource::<RunState>();
        assert_eq!(run.phase(), Phase::Ready);
        assert_eq!(run.segment_count(), 6);
        assert_eq!(world.resource::<Events<PhaseChanged>>().len(), 1);
    }
}
