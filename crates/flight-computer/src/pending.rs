//! Pending command sequence
//!
//! Kept sorted ascending by remaining total wait at the instant of the last
//! mutation. Sorting is stable so equal waits keep their queue order.

use crate::{Command, CommandId};

#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    commands: Vec<Command>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the sorted position, after any command with an equal wait.
    pub fn insert(&mut self, command: Command, now: f64) {
        let wait = command.total_wait(now);
        let at = self.commands.partition_point(|c| c.total_wait(now) <= wait);
        self.commands.insert(at, command);
        self.sort(now);
    }

    /// Re-sort by remaining total wait at `now`.
    pub fn sort(&mut self, now: f64) {
        self.commands
            .sort_by(|a, b| a.total_wait(now).total_cmp(&b.total_wait(now)));
    }

    pub fn remove(&mut self, id: CommandId) -> Option<Command> {
        let at = self.commands.iter().position(|c| c.id == id)?;
        Some(self.commands.remove(at))
    }

    /// Remove every command matching the predicate, in queue order.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<Command>
    where
        F: FnMut(&Command) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.commands.len());
        for command in self.commands.drain(..) {
            if predicate(&command) {
                removed.push(command);
            } else {
                kept.push(command);
            }
        }
        self.commands = kept;
        removed
    }

    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.commands.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: CommandId) -> Option<&mut Command> {
        self.commands.iter_mut().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// True when waits are non-decreasing at `now`.
    pub fn is_sorted(&self, now: f64) -> bool {
        self.commands
            .windows(2)
            .all(|w| w[0].total_wait(now) <= w[1].total_wait(now))
    }
}
