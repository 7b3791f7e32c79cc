//! Command model
//!
//! A command is a timestamped envelope around a `CommandKind`. The kind
//! decides the category slot it occupies once active, what happens the
//! moment it pops off the queue, and how it shapes the control signal on
//! every control step afterwards.

use crate::{AttitudeRequest, ControlInput, ExecutionContext, VesselHost};
use relay_network::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type CommandId = Uuid;

/// Mutually exclusive slot in the active map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommandCategory {
    Attitude,
    Throttle,
    Drive,
    Power,
    Target,
    /// One-shot commands that never install
    Discrete,
}

/// What the queue does with a command after it pops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    /// Install into the active map under its category
    Install,
    /// Side effect done, nothing to keep
    Discard,
    /// Cancel one command by id, or reset every active command
    Cancel(Option<CommandId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttitudeMode {
    Off,
    KillRotation,
    Prograde,
    Retrograde,
    NormalPlus,
    NormalMinus,
    RadialPlus,
    RadialMinus,
    TargetPrograde,
    TargetRetrograde,
    ManeuverNode,
    Surface {
        heading_deg: f64,
        pitch_deg: f64,
        roll_deg: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttitudeCommand {
    pub mode: AttitudeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
}

/// Fixed throttle until the duration or delta-v runs out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnCommand {
    pub throttle: f64,
    /// Remaining burn time (s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    /// Remaining delta-v (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_v: Option<f64>,
}

/// Full-throttle burn centred on a node time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManeuverCommand {
    pub node_time: f64,
    /// Remaining delta-v (m/s)
    pub delta_v: f64,
    /// Remaining estimated burn time (s), used when thrust is unknown
    pub burn_duration_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub steering: f64,
    pub throttle: f64,
    /// Remaining drive time (s)
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HibernationCommand {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionGroupCommand {
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEventCommand {
    pub part: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCommand {
    pub target: Option<NodeId>,
}

/// Cancel one command, or every active command when `command` is None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelCommand {
    #[serde(default)]
    pub command: Option<CommandId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandKind {
    Attitude(AttitudeCommand),
    Burn(BurnCommand),
    Maneuver(ManeuverCommand),
    Drive(DriveCommand),
    Hibernation(HibernationCommand),
    ActionGroup(ActionGroupCommand),
    PartEvent(PartEventCommand),
    Target(TargetCommand),
    Cancel(CancelCommand),
}

impl CommandKind {
    pub fn category(&self) -> CommandCategory {
        match self {
            CommandKind::Attitude(_) => CommandCategory::Attitude,
            CommandKind::Burn(_) | CommandKind::Maneuver(_) => CommandCategory::Throttle,
            CommandKind::Drive(_) => CommandCategory::Drive,
            CommandKind::Hibernation(_) => CommandCategory::Power,
            CommandKind::Target(_) => CommandCategory::Target,
            CommandKind::ActionGroup(_) | CommandKind::PartEvent(_) | CommandKind::Cancel(_) => {
                CommandCategory::Discrete
            }
        }
    }

    /// Must not fire late or out of order with its node time.
    pub fn is_time_critical(&self) -> bool {
        matches!(self, CommandKind::Maneuver(_))
    }

    /// Latest instant the command may still start, if it has one.
    pub fn deadline(&self) -> Option<f64> {
        match self {
            CommandKind::Maneuver(m) => Some(m.node_time),
            _ => None,
        }
    }

    /// Whether the command points at the given node.
    pub fn references(&self, node: NodeId) -> bool {
        match self {
            CommandKind::Attitude(a) => a.target == Some(node),
            CommandKind::Target(t) => t.target == Some(node),
            _ => false,
        }
    }

    /// One-shot transition when the command leaves the queue.
    pub fn pop(&mut self, ctx: &mut ExecutionContext<'_>) -> PopOutcome {
        match self {
            CommandKind::Attitude(_)
            | CommandKind::Burn(_)
            | CommandKind::Maneuver(_)
            | CommandKind::Drive(_) => PopOutcome::Install,
            CommandKind::Hibernation(h) => {
                ctx.host.set_hibernation(h.enabled);
                PopOutcome::Install
            }
            CommandKind::ActionGroup(a) => {
                ctx.host.fire_action_group(&a.group);
                PopOutcome::Discard
            }
            CommandKind::PartEvent(p) => {
                ctx.host.invoke_part_event(&p.part, &p.event);
                PopOutcome::Discard
            }
            CommandKind::Target(t) => {
                ctx.host.set_target(t.target);
                PopOutcome::Discard
            }
            CommandKind::Cancel(c) => PopOutcome::Cancel(c.command),
        }
    }

    /// Shape the control signal for one step. Returns true when finished.
    pub fn execute(&mut self, ctx: &mut ExecutionContext<'_>, input: &mut ControlInput) -> bool {
        let dt = ctx.delta_time;
        match self {
            CommandKind::Attitude(a) => {
                if a.mode == AttitudeMode::Off {
                    input.attitude = None;
                    return true;
                }
                input.attitude = Some(AttitudeRequest {
                    mode: a.mode,
                    target: a.target,
                });
                false
            }
            CommandKind::Burn(b) => {
                if b.duration_s.is_none() && b.delta_v.is_none() {
                    input.throttle = 0.0;
                    return true;
                }
                input.throttle = b.throttle;
                let mut done = false;
                if let Some(remaining) = b.duration_s.as_mut() {
                    *remaining -= dt;
                    done |= *remaining <= 0.0;
                }
                if let Some(remaining) = b.delta_v.as_mut() {
                    let accel = ctx.host.thrust_acceleration() * b.throttle;
                    *remaining -= accel * dt;
                    done |= accel <= 0.0 || *remaining <= 0.0;
                }
                if done {
                    input.throttle = 0.0;
                }
                done
            }
            CommandKind::Maneuver(m) => {
                input.attitude = Some(AttitudeRequest {
                    mode: AttitudeMode::ManeuverNode,
                    target: None,
                });
                if ctx.now < m.node_time - m.burn_duration_s / 2.0 {
                    input.throttle = 0.0;
                    return false;
                }
                input.throttle = 1.0;
                let accel = ctx.host.thrust_acceleration();
                let done = if accel > 0.0 {
                    m.delta_v -= accel * dt;
                    m.delta_v <= 0.0
                } else {
                    m.burn_duration_s -= dt;
                    m.burn_duration_s <= 0.0
                };
                if done {
                    input.throttle = 0.0;
                }
                done
            }
            CommandKind::Drive(d) => {
                d.duration_s -= dt;
                if d.duration_s <= 0.0 {
                    input.wheel_steer = 0.0;
                    input.wheel_throttle = 0.0;
                    return true;
                }
                input.wheel_steer = d.steering;
                input.wheel_throttle = d.throttle;
                false
            }
            CommandKind::Hibernation(_) => false,
            CommandKind::ActionGroup(_)
            | CommandKind::PartEvent(_)
            | CommandKind::Target(_)
            | CommandKind::Cancel(_) => true,
        }
    }

    /// Undo lasting side effects when cancelled while active.
    pub fn abort(&mut self, host: &mut dyn VesselHost) {
        if let CommandKind::Hibernation(h) = self {
            if h.enabled {
                host.set_hibernation(false);
            }
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Attitude(a) => write!(f, "attitude {:?}", a.mode),
            CommandKind::Burn(b) => write!(f, "burn at {:.0}%", b.throttle * 100.0),
            CommandKind::Maneuver(m) => write!(f, "maneuver {:.1} m/s at T={:.1}", m.delta_v, m.node_time),
            CommandKind::Drive(d) => write!(f, "drive for {:.1}s", d.duration_s),
            CommandKind::Hibernation(h) => write!(f, "hibernation {}", if h.enabled { "on" } else { "off" }),
            CommandKind::ActionGroup(a) => write!(f, "action group {}", a.group),
            CommandKind::PartEvent(p) => write!(f, "{} on {}", p.event, p.part),
            CommandKind::Target(_) => write!(f, "set target"),
            CommandKind::Cancel(c) => match c.command {
                Some(id) => write!(f, "cancel {}", id),
                None => write!(f, "cancel all"),
            },
        }
    }
}

/// A queued or active command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    /// Instant the propagation wait ends
    pub timestamp: f64,
    /// Remaining operator extra wait (s)
    pub extra_delay: f64,
    /// Instant the extra wait ends, as resolved when it was added
    pub extra_deadline: f64,
    pub kind: CommandKind,
}

impl Command {
    /// A command issued at `now`, before any delay is applied.
    pub fn new(kind: CommandKind, now: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            extra_delay: 0.0,
            extra_deadline: now,
            kind,
        }
    }

    pub fn attitude(mode: AttitudeMode, now: f64) -> Self {
        Self::new(CommandKind::Attitude(AttitudeCommand { mode, target: None }), now)
    }

    pub fn burn(throttle: f64, duration_s: f64, now: f64) -> Self {
        Self::new(
            CommandKind::Burn(BurnCommand {
                throttle,
                duration_s: Some(duration_s),
                delta_v: None,
            }),
            now,
        )
    }

    pub fn action_group(group: impl Into<String>, now: f64) -> Self {
        Self::new(CommandKind::ActionGroup(ActionGroupCommand { group: group.into() }), now)
    }

    pub fn cancel(command: Option<CommandId>, now: f64) -> Self {
        Self::new(CommandKind::Cancel(CancelCommand { command }), now)
    }

    pub fn category(&self) -> CommandCategory {
        self.kind.category()
    }

    /// Remaining propagation wait at `now`.
    pub fn base_wait(&self, now: f64) -> f64 {
        (self.timestamp - now).max(0.0)
    }

    /// Propagation wait plus extra wait; the pending queue sorts by this.
    pub fn total_wait(&self, now: f64) -> f64 {
        self.base_wait(now) + self.extra_delay.max(0.0)
    }

    /// Instant the command would pop if nothing changed.
    pub fn due_instant(&self) -> f64 {
        self.timestamp + self.extra_delay.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingHost;

    fn ctx(host: &mut RecordingHost, now: f64, dt: f64) -> ExecutionContext<'_> {
        ExecutionContext::new(now, dt, host)
    }

    #[test]
    fn test_categories() {
        assert_eq!(Command::burn(1.0, 5.0, 0.0).category(), CommandCategory::Throttle);
        assert_eq!(Command::attitude(AttitudeMode::Prograde, 0.0).category(), CommandCategory::Attitude);
        assert_eq!(Command::action_group("Stage", 0.0).category(), CommandCategory::Discrete);
    }

    #[test]
    fn test_total_wait() {
        let mut cmd = Command::burn(1.0, 5.0, 0.0);
        cmd.timestamp = 13.0;
        cmd.extra_delay = 2.0;
        assert_eq!(cmd.total_wait(10.0), 5.0);
        assert_eq!(cmd.total_wait(20.0), 2.0);
        assert_eq!(cmd.due_instant(), 15.0);
    }

    #[test]
    fn test_burn_runs_for_duration() {
        let mut host = RecordingHost::new();
        let mut kind = Command::burn(0.5, 1.0, 0.0).kind;
        let mut input = ControlInput::default();

        assert!(!kind.execute(&mut ctx(&mut host, 0.0, 0.4), &mut input));
        assert_eq!(input.throttle, 0.5);
        assert!(!kind.execute(&mut ctx(&mut host, 0.4, 0.4), &mut input));
        assert!(kind.execute(&mut ctx(&mut host, 0.8, 0.4), &mut input));
        assert_eq!(input.throttle, 0.0);
    }

    #[test]
    fn test_burn_by_delta_v() {
        let mut host = RecordingHost {
            thrust_acceleration: 10.0,
            ..Default::default()
        };
        let mut kind = CommandKind::Burn(BurnCommand {
            throttle: 1.0,
            duration_s: None,
            delta_v: Some(15.0),
        });
        let mut input = ControlInput::default();
        assert!(!kind.execute(&mut ctx(&mut host, 0.0, 1.0), &mut input));
        assert!(kind.execute(&mut ctx(&mut host, 1.0, 1.0), &mut input));
    }

    #[test]
    fn test_attitude_off_completes() {
        let mut host = RecordingHost::new();
        let mut input = ControlInput::default();
        let mut hold = Command::attitude(AttitudeMode::Prograde, 0.0).kind;
        assert!(!hold.execute(&mut ctx(&mut host, 0.0, 0.1), &mut input));
        assert_eq!(input.attitude.map(|a| a.mode), Some(AttitudeMode::Prograde));

        let mut off = Command::attitude(AttitudeMode::Off, 0.0).kind;
        assert!(off.execute(&mut ctx(&mut host, 0.0, 0.1), &mut input));
        assert!(input.attitude.is_none());
    }

    #[test]
    fn test_maneuver_waits_for_half_burn() {
        let mut host = RecordingHost::new();
        let mut input = ControlInput::default();
        let mut kind = CommandKind::Maneuver(ManeuverCommand {
            node_time: 100.0,
            delta_v: 50.0,
            burn_duration_s: 10.0,
        });
        assert!(!kind.execute(&mut ctx(&mut host, 90.0, 1.0), &mut input));
        assert_eq!(input.throttle, 0.0);
        assert!(!kind.execute(&mut ctx(&mut host, 95.0, 1.0), &mut input));
        assert_eq!(input.throttle, 1.0);
        assert_eq!(kind.deadline(), Some(100.0));
        assert!(kind.is_time_critical());
    }

    #[test]
    fn test_pop_outcomes() {
        let mut host = RecordingHost::new();
        let target = Uuid::new_v4();
        let mut c = ctx(&mut host, 0.0, 0.1);

        assert_eq!(Command::action_group("Lights", 0.0).kind.pop(&mut c), PopOutcome::Discard);
        assert_eq!(Command::burn(1.0, 1.0, 0.0).kind.pop(&mut c), PopOutcome::Install);
        assert_eq!(Command::cancel(Some(target), 0.0).kind.pop(&mut c), PopOutcome::Cancel(Some(target)));
        let mut set_target = CommandKind::Target(TargetCommand { target: Some(target) });
        assert_eq!(set_target.pop(&mut c), PopOutcome::Discard);
        drop(c);

        assert_eq!(host.target, Some(target));
        assert_eq!(host.action_groups_fired(), vec!["Lights"]);
        assert!(set_target.references(target));
    }

    #[test]
    fn test_kind_tagged_json() {
        let kind = CommandKind::Drive(DriveCommand {
            steering: -0.2,
            throttle: 0.8,
            duration_s: 4.0,
        });
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], "drive");
        let back: CommandKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }
}
