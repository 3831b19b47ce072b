//! Mutation of in-progress workout instances.
//!
//! Leaves are updated independently; nothing on a parent caches totals, so
//! there is no derived state to keep in sync. Once an instance has an end
//! timestamp it is treated as history and further mutation is refused.

use crate::{
    Error, ExerciseInstanceId, InstanceId, Performance, Result, UserId,
    WorkoutBlockExerciseInstance, WorkoutBlockInstance, WorkoutInstance,
};
use chrono::{DateTime, Utc};

impl WorkoutInstance {
    /// Empty session not derived from any protocol
    pub fn freeform(user: UserId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: InstanceId::new(),
            user_id: user,
            template_id: None,
            name: name.into(),
            started_at: now,
            ended_at: None,
            blocks: Vec::new(),
        }
    }

    /// Append an already-instantiated block (ad-hoc sessions)
    pub fn push_block_instance(&mut self, block: WorkoutBlockInstance) -> Result<()> {
        self.ensure_open()?;
        self.blocks.push(block);
        Ok(())
    }

    pub fn find_exercise(&self, id: ExerciseInstanceId) -> Option<&WorkoutBlockExerciseInstance> {
        self.leaves().find(|e| e.id == id)
    }

    /// Log what was done for one exercise and mark it complete.
    ///
    /// The owning block is stamped as started on its first logged exercise and
    /// as ended once every exercise in it is complete.
    pub fn record_exercise(
        &mut self,
        id: ExerciseInstanceId,
        performance: Performance,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_open()?;

        let block = self.block_containing_mut(id)?;
        if let Some(exercise) = block.exercises.iter_mut().find(|e| e.id == id) {
            exercise.actual_reps = performance.reps;
            exercise.actual_duration = performance.duration;
            exercise.actual_rest = performance.rest;
            exercise.completed = true;
            exercise.completed_at = Some(now);
        }

        block.started_at.get_or_insert(now);
        if block.exercises.iter().all(|e| e.completed) {
            block.ended_at = Some(now);
        }

        tracing::debug!("Recorded exercise instance {} in block '{}'", id, block.name);
        Ok(())
    }

    /// Return an exercise to the "not yet performed" state
    pub fn reset_exercise(&mut self, id: ExerciseInstanceId) -> Result<()> {
        self.ensure_open()?;

        let block = self.block_containing_mut(id)?;
        if let Some(exercise) = block.exercises.iter_mut().find(|e| e.id == id) {
            exercise.actual_reps = 0;
            exercise.actual_duration = None;
            exercise.actual_rest = None;
            exercise.completed = false;
            exercise.completed_at = None;
        }
        block.ended_at = None;
        Ok(())
    }

    /// Stamp the end of the session. Incomplete exercises stay incomplete.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        self.ended_at = Some(now);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_completed() {
            return Err(Error::Validation(format!(
                "instance {} is already completed",
                self.id
            )));
        }
        Ok(())
    }

    fn block_containing_mut(&mut self, id: ExerciseInstanceId) -> Result<&mut WorkoutBlockInstance> {
        self.blocks
            .iter_mut()
            .find(|b| b.exercises.iter().any(|e| e.id == id))
            .ok_or_else(|| Error::not_found("exercise instance", id))
    }
}
