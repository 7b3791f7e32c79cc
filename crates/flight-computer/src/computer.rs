//! Delayed-action queue
//!
//! Command lifecycle: pending -> due -> active -> retired.
//!
//! - `enqueue` stamps the command with the current signal delay and the
//!   operator extra delay, then inserts it in wait order
//! - `tick` pops every command whose waits have run out; a powered craft
//!   runs the one-shot transition and installs persistent commands into
//!   their category slot, an unpowered craft loses the command
//! - `execute_active` lets every active command shape the control signal
//!
//! There is no blocking anywhere; a waiting command is just a stored
//! instant that each tick compares against the clock.

use crate::{
    Command, CommandCategory, CommandId, ControlInput, DelayLine, DropReason, ExecutionContext,
    FlightComputerSettings, PendingQueue, PopOutcome, RetireReason, SchedulerEvent, VesselHost,
};
use relay_network::{EventRing, NodeId, SignalStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Flags for how `enqueue` treats a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Queue even when input is currently not allowed
    pub ignore_gate: bool,
    /// Keep the command's timestamp instead of adding the signal delay
    pub ignore_delay: bool,
    /// Do not add the operator extra delay
    pub ignore_extra: bool,
}

impl EnqueueOptions {
    /// Bypass every check; used when restoring or injecting commands.
    pub fn immediate() -> Self {
        Self {
            ignore_gate: true,
            ignore_delay: true,
            ignore_extra: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnqueueOutcome {
    Queued { id: CommandId, due: f64 },
    /// Input not allowed; nothing queued
    Denied,
    /// Time-critical command would land after its deadline; nothing queued
    TooLate { due: f64, deadline: f64 },
}

/// Display flags for a flight computer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightStatus {
    pub no_connection: bool,
    pub out_of_power: bool,
    pub local_control: bool,
}

impl FlightStatus {
    pub fn is_nominal(&self) -> bool {
        !self.no_connection && !self.out_of_power
    }
}

pub struct FlightComputer {
    node: NodeId,
    settings: FlightComputerSettings,
    pub(crate) active: BTreeMap<CommandCategory, Command>,
    pub(crate) pending: PendingQueue,
    delay_line: DelayLine,
    /// Operator extra delay (s)
    pub(crate) total_delay: f64,
    /// Reachability seen on the previous tick
    connected: bool,
    events: EventRing<SchedulerEvent>,
}

impl FlightComputer {
    pub fn new(node: NodeId, settings: FlightComputerSettings) -> Self {
        let delay_line = DelayLine::new(settings.throttle_on_connection_loss);
        let events = EventRing::new(settings.event_capacity);
        Self {
            node,
            settings,
            active: BTreeMap::new(),
            pending: PendingQueue::new(),
            delay_line,
            total_delay: 0.0,
            connected: true,
            events,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn settings(&self) -> &FlightComputerSettings {
        &self.settings
    }

    pub fn total_delay(&self) -> f64 {
        self.total_delay
    }

    /// Operator extra delay added to future commands.
    pub fn set_total_delay(&mut self, seconds: f64) {
        self.total_delay = seconds.max(0.0);
    }

    pub fn active(&self) -> &BTreeMap<CommandCategory, Command> {
        &self.active
    }

    pub fn active_command(&self, category: CommandCategory) -> Option<&Command> {
        self.active.get(&category)
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    pub fn delay_line(&self) -> &DelayLine {
        &self.delay_line
    }

    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        self.events.drain()
    }

    pub(crate) fn emit(&mut self, event: SchedulerEvent) {
        if !self.events.push(event) {
            debug!("Scheduler event ring full for {}", self.node);
        }
    }

    pub(crate) fn notice(&mut self, message: String) {
        warn!("{}: {}", self.node, message);
        self.emit(SchedulerEvent::Notice { message });
    }

    /// Whether operator input may be accepted right now.
    pub fn input_allowed(&self, status: &SignalStatus) -> bool {
        status.input_allowed()
    }

    pub fn status(&self, signal: &SignalStatus) -> FlightStatus {
        FlightStatus {
            no_connection: !signal.local_control && !signal.connected,
            out_of_power: !signal.powered,
            local_control: signal.local_control,
        }
    }

    /// Stamp and queue a command.
    pub fn enqueue(
        &mut self,
        mut command: Command,
        options: EnqueueOptions,
        now: f64,
        status: &SignalStatus,
    ) -> EnqueueOutcome {
        if !options.ignore_gate && !self.input_allowed(status) {
            debug!("{}: input denied for {}", self.node, command.kind);
            return EnqueueOutcome::Denied;
        }

        let delay = if status.local_control { 0.0 } else { status.delay };
        if !options.ignore_delay {
            command.timestamp = now + delay;
        }
        if !options.ignore_extra {
            command.extra_delay += (self.total_delay - delay).max(0.0);
            command.extra_deadline = command.timestamp + command.extra_delay;
        }

        if let Some(deadline) = command.kind.deadline() {
            let due = command.due_instant();
            if due > deadline {
                self.notice(format!("Signal delay too high for {}", command.kind));
                return EnqueueOutcome::TooLate { due, deadline };
            }
        }

        let id = command.id;
        let due = command.due_instant();
        debug!("{}: queued {} due at {:.3}", self.node, command.kind, due);
        self.pending.insert(command, now);
        self.emit(SchedulerEvent::Queued { id, due });
        EnqueueOutcome::Queued { id, due }
    }

    /// Advance the queue by one simulation step.
    pub fn tick(&mut self, now: f64, delta_time: f64, status: &SignalStatus, host: &mut dyn VesselHost) {
        let connected = status.local_control || status.connected;
        if connected != self.connected {
            if connected {
                info!("{}: connection restored", self.node);
            } else {
                self.notice("Connection lost".to_string());
            }
            self.connected = connected;
        }

        if self.settings.throttle_time_warp {
            self.throttle_time_warp(now, delta_time, host);
        }

        let due: Vec<CommandId> = self
            .pending
            .iter()
            .filter(|c| c.base_wait(now) <= 0.0)
            .map(|c| c.id)
            .collect();

        for id in due {
            let Some(command) = self.pending.get_mut(id) else {
                // Cancelled by an earlier command this tick
                continue;
            };
            if command.extra_delay > 0.0 {
                command.extra_delay = if command.extra_deadline > now {
                    command.extra_deadline - now
                } else {
                    command.extra_delay - delta_time
                };
                if command.extra_delay > 0.0 {
                    continue;
                }
                command.extra_delay = 0.0;
            }

            let Some(command) = self.pending.remove(id) else {
                continue;
            };
            if status.powered {
                self.pop(command, now, delta_time, host);
            } else {
                self.notice(format!("Command missed, no power: {}", command.kind));
                self.emit(SchedulerEvent::Dropped {
                    id,
                    reason: DropReason::NoPower,
                });
            }
        }

        self.pending.sort(now);
    }

    /// Request lower time warp while a command is about to come due.
    fn throttle_time_warp(&mut self, now: f64, delta_time: f64, host: &mut dyn VesselHost) {
        let horizon = now + 2.0 * delta_time + self.settings.time_warp_lookahead_s;
        let imminent = self.pending.iter().any(|c| c.due_instant() <= horizon);
        if !imminent || host.time_warp_rate() <= self.settings.time_warp_threshold {
            return;
        }
        while host.time_warp_rate() > self.settings.time_warp_threshold {
            if !host.reduce_time_warp() {
                break;
            }
        }
        self.notice(format!(
            "Time warp reduced to {:.1}x for an upcoming command",
            host.time_warp_rate()
        ));
    }

    /// Run the one-shot transition and act on its outcome.
    fn pop(&mut self, mut command: Command, now: f64, delta_time: f64, host: &mut dyn VesselHost) {
        let outcome = {
            let mut ctx = ExecutionContext::new(now, delta_time, host);
            command.kind.pop(&mut ctx)
        };
        match outcome {
            PopOutcome::Install => self.install(command),
            PopOutcome::Discard => {
                info!("{}: executed {}", self.node, command.kind);
                self.emit(SchedulerEvent::Retired {
                    id: command.id,
                    reason: RetireReason::Completed,
                });
            }
            PopOutcome::Cancel(Some(target)) => {
                if !self.remove(target, host) {
                    debug!("{}: cancel target {} already gone", self.node, target);
                }
                self.emit(SchedulerEvent::Retired {
                    id: command.id,
                    reason: RetireReason::Completed,
                });
            }
            PopOutcome::Cancel(None) => {
                self.reset(host);
                self.emit(SchedulerEvent::Retired {
                    id: command.id,
                    reason: RetireReason::Completed,
                });
            }
        }
    }

    /// Put a command into its category slot, retiring the previous occupant.
    pub(crate) fn install(&mut self, command: Command) {
        let id = command.id;
        let category = command.category();
        info!("{}: activated {}", self.node, command.kind);
        if let Some(previous) = self.active.insert(category, command) {
            self.emit(SchedulerEvent::Retired {
                id: previous.id,
                reason: RetireReason::Replaced,
            });
        }
        self.emit(SchedulerEvent::Activated { id, category });
    }

    /// Let every active command shape the control signal; finished ones retire.
    pub fn execute_active(
        &mut self,
        input: &mut ControlInput,
        now: f64,
        delta_time: f64,
        host: &mut dyn VesselHost,
    ) {
        let mut finished = Vec::new();
        {
            let mut ctx = ExecutionContext::new(now, delta_time, host);
            for (category, command) in self.active.iter_mut() {
                if command.kind.execute(&mut ctx, input) {
                    finished.push(*category);
                }
            }
        }
        for category in finished {
            if let Some(command) = self.active.remove(&category) {
                debug!("{}: completed {}", self.node, command.kind);
                self.emit(SchedulerEvent::Retired {
                    id: command.id,
                    reason: RetireReason::Completed,
                });
            }
        }
    }

    /// Control step: route raw input through the delay line, then apply active commands.
    pub fn control_step(
        &mut self,
        raw: ControlInput,
        now: f64,
        delta_time: f64,
        status: &SignalStatus,
        host: &mut dyn VesselHost,
    ) -> ControlInput {
        let mut output = if status.local_control {
            self.delay_line.clear();
            raw
        } else {
            if self.input_allowed(status) {
                self.delay_line
                    .submit(raw, now, status.delay, host.autopilot_engaged());
            }
            self.delay_line.drain_due(now, status.connected)
        };
        self.execute_active(&mut output, now, delta_time, host);
        output
    }

    /// Abort and retire every active command.
    pub fn reset(&mut self, host: &mut dyn VesselHost) {
        let active = std::mem::take(&mut self.active);
        for (_, mut command) in active {
            command.kind.abort(host);
            info!("{}: cancelled {}", self.node, command.kind);
            self.emit(SchedulerEvent::Retired {
                id: command.id,
                reason: RetireReason::Cancelled,
            });
        }
    }

    /// Remove a command from pending, or retire it if active.
    pub fn remove(&mut self, id: CommandId, host: &mut dyn VesselHost) -> bool {
        if self.pending.remove(id).is_some() {
            self.emit(SchedulerEvent::Dropped {
                id,
                reason: DropReason::Cancelled,
            });
            return true;
        }
        let category = self
            .active
            .iter()
            .find(|(_, c)| c.id == id)
            .map(|(category, _)| *category);
        match category.and_then(|c| self.active.remove(&c)) {
            Some(mut command) => {
                command.kind.abort(host);
                self.emit(SchedulerEvent::Retired {
                    id,
                    reason: RetireReason::Cancelled,
                });
                true
            }
            None => false,
        }
    }

    /// Drop every command that points at a node that no longer exists.
    pub fn cancel_referencing(&mut self, target: NodeId, host: &mut dyn VesselHost) -> usize {
        let dropped = self.pending.remove_where(|c| c.kind.references(target));
        let mut count = dropped.len();
        for command in dropped {
            self.emit(SchedulerEvent::Dropped {
                id: command.id,
                reason: DropReason::StaleReference,
            });
        }

        let stale: Vec<CommandCategory> = self
            .active
            .iter()
            .filter(|(_, c)| c.kind.references(target))
            .map(|(category, _)| *category)
            .collect();
        for category in stale {
            if let Some(mut command) = self.active.remove(&category) {
                command.kind.abort(host);
                self.emit(SchedulerEvent::Retired {
                    id: command.id,
                    reason: RetireReason::Cancelled,
                });
                count += 1;
            }
        }
        if count > 0 {
            self.notice(format!("{} command(s) cancelled, target {} lost", count, target));
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttitudeMode, CommandKind, HibernationCommand, ManeuverCommand, RecordingHost};

    fn computer() -> FlightComputer {
        FlightComputer::new(uuid::Uuid::new_v4(), FlightComputerSettings::default())
    }

    fn queued_id(outcome: EnqueueOutcome) -> CommandId {
        match outcome {
            EnqueueOutcome::Queued { id, .. } => id,
            other => panic!("expected queued, got {:?}", other),
        }
    }

    #[test]
    fn test_enqueue_applies_delay() {
        let mut fc = computer();
        let outcome = fc.enqueue(
            Command::burn(1.0, 5.0, 10.0),
            EnqueueOptions::default(),
            10.0,
            &SignalStatus::remote(3.0),
        );
        assert!(matches!(outcome, EnqueueOutcome::Queued { due, .. } if due == 13.0));
        assert_eq!(fc.pending().iter().next().map(|c| c.timestamp), Some(13.0));
    }

    #[test]
    fn test_enqueue_denied_without_connection() {
        let mut fc = computer();
        let outcome = fc.enqueue(
            Command::burn(1.0, 5.0, 0.0),
            EnqueueOptions::default(),
            0.0,
            &SignalStatus::disconnected(),
        );
        assert_eq!(outcome, EnqueueOutcome::Denied);
        assert!(fc.pending().is_empty());

        let unpowered = SignalStatus::remote(1.0).with_power(false);
        assert_eq!(
            fc.enqueue(Command::burn(1.0, 5.0, 0.0), EnqueueOptions::default(), 0.0, &unpowered),
            EnqueueOutcome::Denied
        );
    }

    #[test]
    fn test_local_control_bypasses_gate_and_delay() {
        let mut fc = computer();
        let mut status = SignalStatus::local();
        status.powered = false;
        let outcome = fc.enqueue(Command::burn(1.0, 5.0, 4.0), EnqueueOptions::default(), 4.0, &status);
        assert!(matches!(outcome, EnqueueOutcome::Queued { due, .. } if due == 4.0));
    }

    #[test]
    fn test_extra_delay_tops_up_to_total() {
        let mut fc = computer();
        fc.set_total_delay(10.0);
        fc.enqueue(
            Command::burn(1.0, 5.0, 0.0),
            EnqueueOptions::default(),
            0.0,
            &SignalStatus::remote(3.0),
        );
        let cmd = fc.pending().iter().next().unwrap();
        assert_eq!(cmd.timestamp, 3.0);
        assert_eq!(cmd.extra_delay, 7.0);
        assert_eq!(cmd.extra_deadline, 10.0);

        let mut fc = computer();
        fc.set_total_delay(1.0);
        fc.enqueue(
            Command::burn(1.0, 5.0, 0.0),
            EnqueueOptions::default(),
            0.0,
            &SignalStatus::remote(3.0),
        );
        assert_eq!(fc.pending().iter().next().unwrap().extra_delay, 0.0);
    }

    #[test]
    fn test_extra_wait_holds_until_deadline() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(1.0);
        fc.set_total_delay(3.0);
        fc.enqueue(Command::burn(1.0, 5.0, 0.0), EnqueueOptions::default(), 0.0, &status);

        fc.tick(1.0, 0.5, &status, &mut host);
        assert_eq!(fc.pending().len(), 1);
        assert_eq!(fc.pending().iter().next().unwrap().extra_delay, 2.0);

        fc.tick(2.5, 0.5, &status, &mut host);
        assert_eq!(fc.pending().len(), 1);

        fc.tick(3.0, 0.5, &status, &mut host);
        assert!(fc.pending().is_empty());
        assert!(fc.active_command(CommandCategory::Throttle).is_some());
    }

    #[test]
    fn test_extra_wait_step_fallback_after_deadline() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        let mut cmd = Command::burn(1.0, 5.0, 0.0);
        cmd.extra_delay = 1.0;
        cmd.extra_deadline = 0.0;
        fc.enqueue(cmd, EnqueueOptions::immediate(), 0.0, &status);

        fc.tick(5.0, 0.4, &status, &mut host);
        let remaining = fc.pending().iter().next().unwrap().extra_delay;
        assert!((remaining - 0.6).abs() < 1e-12);
        fc.tick(5.4, 0.4, &status, &mut host);
        fc.tick(5.8, 0.4, &status, &mut host);
        assert!(fc.pending().is_empty());
    }

    #[test]
    fn test_tick_installs_and_replaces() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        let first = queued_id(fc.enqueue(
            Command::attitude(AttitudeMode::Prograde, 0.0),
            EnqueueOptions::default(),
            0.0,
            &status,
        ));
        fc.tick(0.0, 0.1, &status, &mut host);
        assert_eq!(fc.active_command(CommandCategory::Attitude).map(|c| c.id), Some(first));

        let second = queued_id(fc.enqueue(
            Command::attitude(AttitudeMode::Retrograde, 0.1),
            EnqueueOptions::default(),
            0.1,
            &status,
        ));
        fc.drain_events();
        fc.tick(0.1, 0.1, &status, &mut host);
        assert_eq!(fc.active().len(), 1);
        assert_eq!(fc.active_command(CommandCategory::Attitude).map(|c| c.id), Some(second));
        assert!(fc.drain_events().contains(&SchedulerEvent::Retired {
            id: first,
            reason: RetireReason::Replaced
        }));
    }

    #[test]
    fn test_unpowered_drop_is_final() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(1.0);
        let id = queued_id(fc.enqueue(Command::burn(1.0, 5.0, 0.0), EnqueueOptions::default(), 0.0, &status));

        fc.tick(1.0, 0.1, &status.with_power(false), &mut host);
        assert!(fc.pending().is_empty());
        assert!(fc.active().is_empty());
        let events = fc.drain_events();
        assert!(events.contains(&SchedulerEvent::Dropped {
            id,
            reason: DropReason::NoPower
        }));
        assert!(events.iter().any(|e| matches!(e, SchedulerEvent::Notice { .. })));

        fc.tick(2.0, 0.1, &status, &mut host);
        assert!(fc.active().is_empty());
    }

    #[test]
    fn test_one_shot_never_installs() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        fc.enqueue(Command::action_group("Stage", 0.0), EnqueueOptions::default(), 0.0, &status);
        fc.tick(0.0, 0.1, &status, &mut host);
        assert!(fc.active().is_empty());
        assert_eq!(host.action_groups_fired(), vec!["Stage"]);
    }

    #[test]
    fn test_cancel_command_removes_target() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        let burn = queued_id(fc.enqueue(Command::burn(1.0, 50.0, 0.0), EnqueueOptions::default(), 0.0, &status));
        fc.tick(0.0, 0.1, &status, &mut host);
        assert!(fc.active_command(CommandCategory::Throttle).is_some());

        fc.enqueue(Command::cancel(Some(burn), 0.1), EnqueueOptions::default(), 0.1, &status);
        fc.tick(0.1, 0.1, &status, &mut host);
        assert!(fc.active().is_empty());
    }

    #[test]
    fn test_cancel_all_resets_active() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        fc.enqueue(Command::burn(1.0, 50.0, 0.0), EnqueueOptions::default(), 0.0, &status);
        fc.enqueue(
            Command::new(CommandKind::Hibernation(HibernationCommand { enabled: true }), 0.0),
            EnqueueOptions::default(),
            0.0,
            &status,
        );
        fc.tick(0.0, 0.1, &status, &mut host);
        assert_eq!(fc.active().len(), 2);
        assert!(host.hibernating);

        fc.enqueue(Command::cancel(None, 0.1), EnqueueOptions::default(), 0.1, &status);
        fc.tick(0.1, 0.1, &status, &mut host);
        assert!(fc.active().is_empty());
        assert!(!host.hibernating);
    }

    #[test]
    fn test_remove_pending_and_active() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(5.0);
        let id = queued_id(fc.enqueue(Command::burn(1.0, 5.0, 0.0), EnqueueOptions::default(), 0.0, &status));
        assert!(fc.remove(id, &mut host));
        assert!(fc.pending().is_empty());
        assert!(!fc.remove(id, &mut host));
    }

    #[test]
    fn test_execute_active_retires_finished() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        fc.enqueue(Command::burn(0.5, 0.15, 0.0), EnqueueOptions::default(), 0.0, &status);
        fc.tick(0.0, 0.1, &status, &mut host);

        let mut input = ControlInput::default();
        fc.execute_active(&mut input, 0.0, 0.1, &mut host);
        assert_eq!(input.throttle, 0.5);
        assert_eq!(fc.active().len(), 1);

        fc.execute_active(&mut input, 0.1, 0.1, &mut host);
        assert!(fc.active().is_empty());
        assert_eq!(input.throttle, 0.0);
    }

    #[test]
    fn test_maneuver_too_late() {
        let mut fc = computer();
        let cmd = Command::new(
            CommandKind::Maneuver(ManeuverCommand {
                node_time: 12.0,
                delta_v: 100.0,
                burn_duration_s: 4.0,
            }),
            10.0,
        );
        let outcome = fc.enqueue(cmd, EnqueueOptions::default(), 10.0, &SignalStatus::remote(3.0));
        assert_eq!(outcome, EnqueueOutcome::TooLate { due: 13.0, deadline: 12.0 });
        assert!(fc.pending().is_empty());
        assert!(fc
            .drain_events()
            .iter()
            .any(|e| matches!(e, SchedulerEvent::Notice { message } if message.contains("delay too high"))));
    }

    #[test]
    fn test_time_warp_throttled_before_due() {
        let mut fc = computer();
        let mut host = RecordingHost {
            time_warp_rate: 100.0,
            ..Default::default()
        };
        let status = SignalStatus::remote(2.0);
        fc.enqueue(Command::burn(1.0, 5.0, 0.0), EnqueueOptions::default(), 0.0, &status);

        fc.tick(0.0, 0.1, &status, &mut host);
        assert_eq!(host.time_warp_rate, 100.0);

        fc.tick(1.5, 0.1, &status, &mut host);
        assert!(host.time_warp_rate <= 4.0);
    }

    #[test]
    fn test_cancel_referencing() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        let target = uuid::Uuid::new_v4();
        let mut hold = Command::attitude(AttitudeMode::TargetPrograde, 0.0);
        if let CommandKind::Attitude(a) = &mut hold.kind {
            a.target = Some(target);
        }
        fc.enqueue(hold, EnqueueOptions::default(), 0.0, &status);
        fc.tick(0.0, 0.1, &status, &mut host);
        fc.enqueue(Command::burn(1.0, 5.0, 1.0), EnqueueOptions::default(), 1.0, &SignalStatus::remote(9.0));

        assert_eq!(fc.cancel_referencing(target, &mut host), 1);
        assert!(fc.active().is_empty());
        assert_eq!(fc.pending().len(), 1);
    }

    #[test]
    fn test_status_flags() {
        let fc = computer();
        let status = fc.status(&SignalStatus::disconnected().with_power(false));
        assert!(status.no_connection && status.out_of_power);
        assert!(!status.is_nominal());
        assert!(fc.status(&SignalStatus::local()).is_nominal());
    }

    #[test]
    fn test_connection_loss_notified_once() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let lost = |events: Vec<SchedulerEvent>| {
            events
                .iter()
                .filter(|e| matches!(e, SchedulerEvent::Notice { message } if message == "Connection lost"))
                .count()
        };

        fc.tick(0.0, 0.1, &SignalStatus::remote(1.0), &mut host);
        assert_eq!(lost(fc.drain_events()), 0);

        fc.tick(0.1, 0.1, &SignalStatus::disconnected(), &mut host);
        fc.tick(0.2, 0.1, &SignalStatus::disconnected(), &mut host);
        assert_eq!(lost(fc.drain_events()), 1);

        fc.tick(0.3, 0.1, &SignalStatus::remote(1.0), &mut host);
        fc.tick(0.4, 0.1, &SignalStatus::disconnected(), &mut host);
        assert_eq!(lost(fc.drain_events()), 1);
    }

    #[test]
    fn test_control_step_delays_input() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(1.0);
        let raw = ControlInput::with_throttle(0.7);

        let out = fc.control_step(raw, 0.0, 0.5, &status, &mut host);
        assert_eq!(out.throttle, 0.0);
        let out = fc.control_step(raw, 1.0, 0.5, &status, &mut host);
        assert_eq!(out.throttle, 0.7);

        let out = fc.control_step(ControlInput::with_throttle(0.2), 1.5, 0.5, &SignalStatus::local(), &mut host);
        assert_eq!(out.throttle, 0.2);
        assert!(fc.delay_line().is_empty());
    }
}
