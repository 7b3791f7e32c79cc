//! Scheduler persistence
//!
//! Saved state is a versioned document with the operator delay, the active
//! map and the pending queue. Each record carries the command kind as a
//! tag plus its kind-specific fields. On load, active commands run their
//! one-shot transition again and extra-wait deadlines are re-resolved
//! against the restore instant.

use crate::{
    Command, CommandId, CommandKind, DropReason, ExecutionContext, FlightComputer,
    FlightComputerError, PopOutcome, Result, SchedulerEvent, VesselHost,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const DOCUMENT_VERSION: u32 = 1;

/// Section name of the scheduler inside a save tree
pub const SCHEDULER_SECTION: &str = "Scheduler";

/// Instants that may be infinite; JSON numbers cannot carry them, so
/// non-finite values are written as the strings `"inf"`, `"-inf"` and `"nan"`.
mod instant {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"inf\", \"-inf\" or \"nan\"",
                )),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: CommandId,
    /// End of the propagation wait; infinite for a command queued without a route
    #[serde(with = "instant")]
    pub due: f64,
    /// Extra wait still outstanding at save time
    #[serde(default, with = "instant")]
    pub extra_delay: f64,
    pub command: CommandKind,
}

impl CommandRecord {
    fn from_command(command: &Command) -> Self {
        Self {
            id: command.id,
            due: command.timestamp,
            extra_delay: command.extra_delay.max(0.0),
            command: command.kind.clone(),
        }
    }

    fn to_command(&self, extra_deadline: f64) -> Command {
        Command {
            id: self.id,
            timestamp: self.due,
            extra_delay: self.extra_delay.max(0.0),
            extra_deadline,
            kind: self.command.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerDocument {
    pub version: u32,
    #[serde(default, with = "instant")]
    pub total_delay: f64,
    #[serde(default)]
    pub active: Vec<CommandRecord>,
    #[serde(default)]
    pub pending: Vec<CommandRecord>,
}

impl SchedulerDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Wrap the document under its section name.
    pub fn to_tree(&self) -> Result<Value> {
        let mut tree = serde_json::Map::new();
        tree.insert(SCHEDULER_SECTION.to_string(), serde_json::to_value(self)?);
        Ok(Value::Object(tree))
    }

    /// Read the document from its section of a save tree.
    pub fn from_tree(tree: &Value) -> Result<Self> {
        let section = tree
            .get(SCHEDULER_SECTION)
            .ok_or(FlightComputerError::MissingSection(SCHEDULER_SECTION))?;
        Ok(serde_json::from_value(section.clone())?)
    }
}

impl FlightComputer {
    pub fn save(&self) -> SchedulerDocument {
        SchedulerDocument {
            version: DOCUMENT_VERSION,
            total_delay: self.total_delay,
            active: self.active.values().map(CommandRecord::from_command).collect(),
            pending: self.pending.iter().map(CommandRecord::from_command).collect(),
        }
    }

    /// Replace the scheduler state with a saved document.
    ///
    /// An unsupported version is rejected before anything changes.
    pub fn load(&mut self, doc: &SchedulerDocument, now: f64, host: &mut dyn VesselHost) -> Result<()> {
        if doc.version != DOCUMENT_VERSION {
            return Err(FlightComputerError::UnsupportedVersion(doc.version));
        }

        self.total_delay = doc.total_delay.max(0.0);
        self.active.clear();
        self.pending.clear();

        for record in &doc.active {
            let mut command = record.to_command(now);
            let outcome = {
                let mut ctx = ExecutionContext::new(now, 0.0, host);
                command.kind.pop(&mut ctx)
            };
            if outcome == PopOutcome::Install {
                self.install(command);
            } else {
                debug!("{}: saved active {} does not install, skipped", self.node(), command.kind);
            }
        }

        for record in &doc.pending {
            let extra = record.extra_delay.max(0.0);
            let extra_deadline = if record.due > now {
                record.due + extra
            } else {
                now + extra
            };
            let command = record.to_command(extra_deadline);

            let wait_elapsed = record.due <= now && extra <= 0.0;
            let deadline_passed = command.kind.deadline().map_or(false, |d| d < now);
            if command.kind.is_time_critical() && (wait_elapsed || deadline_passed) {
                self.notice(format!("Command missed during reload: {}", command.kind));
                self.emit(SchedulerEvent::Dropped {
                    id: command.id,
                    reason: DropReason::Missed,
                });
                continue;
            }
            self.pending.insert(command, now);
        }

        info!(
            "{}: restored {} active, {} pending",
            self.node(),
            self.active.len(),
            self.pending.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AttitudeMode, CommandCategory, EnqueueOptions, EnqueueOutcome, FlightComputerSettings,
        HibernationCommand,
        ManeuverCommand, RecordingHost,
    };
    use relay_network::SignalStatus;

    fn computer() -> FlightComputer {
        FlightComputer::new(uuid::Uuid::new_v4(), FlightComputerSettings::default())
    }

    #[test]
    fn test_document_shape() {
        let mut fc = computer();
        fc.set_total_delay(4.0);
        fc.enqueue(
            Command::burn(1.0, 5.0, 0.0),
            EnqueueOptions::default(),
            0.0,
            &SignalStatus::remote(1.0),
        );
        let tree = fc.save().to_tree().unwrap();
        let section = &tree["Scheduler"];
        assert_eq!(section["version"], 1);
        assert_eq!(section["total_delay"], 4.0);
        assert_eq!(section["pending"][0]["due"], 1.0);
        assert_eq!(section["pending"][0]["extra_delay"], 3.0);
        assert_eq!(section["pending"][0]["command"]["kind"], "burn");

        let doc = SchedulerDocument::from_tree(&tree).unwrap();
        assert_eq!(doc.pending.len(), 1);
    }

    #[test]
    fn test_load_reinstalls_active() {
        let mut fc = computer();
        let mut host = RecordingHost::new();
        let status = SignalStatus::remote(0.0);
        fc.enqueue(
            Command::new(CommandKind::Hibernation(HibernationCommand { enabled: true }), 0.0),
            EnqueueOptions::default(),
            0.0,
            &status,
        );
        fc.enqueue(Command::attitude(AttitudeMode::Prograde, 0.0), EnqueueOptions::default(), 0.0, &status);
        fc.tick(0.0, 0.1, &status, &mut host);
        let doc = fc.save();

        let mut restored = computer();
        let mut fresh_host = RecordingHost::new();
        restored.load(&doc, 50.0, &mut fresh_host).unwrap();
        assert_eq!(restored.active().len(), 2);
        assert!(fresh_host.hibernating);
        assert_eq!(
            restored.active_command(CommandCategory::Attitude).map(|c| c.id),
            fc.active_command(CommandCategory::Attitude).map(|c| c.id)
        );
    }

    #[test]
    fn test_load_reports_activations() {
        let mut fc = computer();
        let status = SignalStatus::remote(0.0);
        fc.enqueue(Command::attitude(AttitudeMode::Prograde, 0.0), EnqueueOptions::default(), 0.0, &status);
        fc.tick(0.0, 0.1, &status, &mut RecordingHost::new());
        let id = fc.active_command(CommandCategory::Attitude).unwrap().id;

        let mut restored = computer();
        restored.load(&fc.save(), 10.0, &mut RecordingHost::new()).unwrap();
        let events = restored.drain_events();
        assert!(events.contains(&SchedulerEvent::Activated {
            id,
            category: CommandCategory::Attitude,
        }));
    }

    #[test]
    fn test_unrouted_command_survives_reload() {
        let mut fc = computer();
        let forced = EnqueueOptions {
            ignore_gate: true,
            ..Default::default()
        };
        let outcome = fc.enqueue(
            Command::action_group("Stage", 0.0),
            forced,
            0.0,
            &SignalStatus::disconnected(),
        );
        assert!(matches!(outcome, EnqueueOutcome::Queued { due, .. } if due.is_infinite()));

        let json = fc.save().to_json().unwrap();
        assert!(json.contains("\"inf\""));
        let doc = SchedulerDocument::from_json(&json).unwrap();
        assert_eq!(doc, fc.save());
        let tree_doc = SchedulerDocument::from_tree(&fc.save().to_tree().unwrap()).unwrap();
        assert_eq!(tree_doc, doc);

        let mut restored = computer();
        restored.load(&doc, 5.0, &mut RecordingHost::new()).unwrap();
        assert_eq!(restored.pending().len(), 1);
        assert!(restored.pending().iter().all(|c| c.timestamp.is_infinite()));
        assert_eq!(restored.save(), doc);
    }

    #[test]
    fn test_instant_rejects_unknown_text() {
        let json = r#"{"version": 1, "pending": [{"id": "00000000-0000-0000-0000-000000000001",
            "due": "soon", "command": {"kind": "action_group", "group": "Stage"}}]}"#;
        assert!(matches!(
            SchedulerDocument::from_json(json),
            Err(FlightComputerError::SerializationError(_))
        ));
    }

    #[test]
    fn test_load_resolves_extra_deadline() {
        let doc = SchedulerDocument {
            version: DOCUMENT_VERSION,
            total_delay: 0.0,
            active: Vec::new(),
            pending: vec![
                CommandRecord {
                    id: uuid::Uuid::new_v4(),
                    due: 120.0,
                    extra_delay: 5.0,
                    command: Command::action_group("Future", 0.0).kind,
                },
                CommandRecord {
                    id: uuid::Uuid::new_v4(),
                    due: 80.0,
                    extra_delay: 5.0,
                    command: Command::action_group("Elapsed", 0.0).kind,
                },
            ],
        };
        let mut fc = computer();
        fc.load(&doc, 100.0, &mut RecordingHost::new()).unwrap();
        let deadlines: Vec<f64> = fc.pending().iter().map(|c| c.extra_deadline).collect();
        assert_eq!(deadlines, vec![105.0, 125.0]);
    }

    #[test]
    fn test_elapsed_maneuver_dropped_on_load() {
        let doc = SchedulerDocument {
            version: DOCUMENT_VERSION,
            total_delay: 0.0,
            active: Vec::new(),
            pending: vec![CommandRecord {
                id: uuid::Uuid::new_v4(),
                due: 90.0,
                extra_delay: 0.0,
                command: CommandKind::Maneuver(ManeuverCommand {
                    node_time: 200.0,
                    delta_v: 10.0,
                    burn_duration_s: 2.0,
                }),
            }],
        };
        let mut fc = computer();
        fc.load(&doc, 100.0, &mut RecordingHost::new()).unwrap();
        assert!(fc.pending().is_empty());
        assert!(fc
            .drain_events()
            .iter()
            .any(|e| matches!(e, SchedulerEvent::Dropped { reason: DropReason::Missed, .. })));
    }

    #[test]
    fn test_bad_version_leaves_state() {
        let mut fc = computer();
        fc.set_total_delay(2.0);
        fc.enqueue(
            Command::burn(1.0, 5.0, 0.0),
            EnqueueOptions::default(),
            0.0,
            &SignalStatus::remote(1.0),
        );
        let mut doc = fc.save();
        doc.version = 7;
        doc.pending.clear();

        let err = fc.load(&doc, 0.0, &mut RecordingHost::new()).unwrap_err();
        assert!(matches!(err, FlightComputerError::UnsupportedVersion(7)));
        assert_eq!(fc.pending().len(), 1);
        assert_eq!(fc.total_delay(), 2.0);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            SchedulerDocument::from_json("{\"version\": \"one\"}"),
            Err(FlightComputerError::SerializationError(_))
        ));
        assert!(matches!(
            SchedulerDocument::from_tree(&serde_json::json!({})),
            Err(FlightComputerError::MissingSection("Scheduler"))
        ));
    }
}
