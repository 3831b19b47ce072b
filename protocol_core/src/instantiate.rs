//! Instantiation of protocol templates into workout instances.
//!
//! Instances are deep copies: display fields (names, prescriptions) are copied
//! out of the template when the session starts, and the only link back is an
//! optional template id. Later template edits or deletions never reach an
//! existing instance.
//!
//! Every tier goes through [`instantiate_children`], so the rule that an
//! instance mirrors its template's shape and order lives in one place.

use crate::{
    BlockInstanceId, Error, ExerciseInstanceId, InstanceId, Protocol, Result, UserId,
    WorkoutBlock, WorkoutBlockExercise, WorkoutBlockExerciseInstance, WorkoutBlockInstance,
    WorkoutInstance,
};
use chrono::{DateTime, Utc};

/// A template node that can produce its instance counterpart
pub trait Instantiate {
    type Instance;

    /// Position of this node within its parent sequence
    fn position(&self) -> u32;

    fn instantiate_node(&self) -> Result<Self::Instance>;
}

impl Instantiate for WorkoutBlockExercise {
    type Instance = WorkoutBlockExerciseInstance;

    fn position(&self) -> u32 {
        self.position
    }

    fn instantiate_node(&self) -> Result<WorkoutBlockExerciseInstance> {
        Ok(WorkoutBlockExerciseInstance {
            id: ExerciseInstanceId::new(),
            template_id: Some(self.id),
            exercise_id: self.exercise_id.clone(),
            prescribed: self.prescription.clone(),
            actual_reps: 0,
            actual_duration: None,
            actual_rest: None,
            completed: false,
            completed_at: None,
        })
    }
}

impl Instantiate for WorkoutBlock {
    type Instance = WorkoutBlockInstance;

    fn position(&self) -> u32 {
        self.position
    }

    fn instantiate_node(&self) -> Result<WorkoutBlockInstance> {
        Ok(WorkoutBlockInstance {
            id: BlockInstanceId::new(),
            template_id: Some(self.id),
            name: self.name.clone(),
            prescribed_rest: self.rest,
            started_at: None,
            ended_at: None,
            exercises: instantiate_children(&self.exercises)?,
        })
    }
}

/// Instantiate an ordered sequence of template children.
///
/// Positions must strictly increase; the output has exactly one instance per
/// child, in the same order.
pub fn instantiate_children<T: Instantiate>(children: &[T]) -> Result<Vec<T::Instance>> {
    if let Some(pair) = children
        .windows(2)
        .find(|pair| pair[0].position() >= pair[1].position())
    {
        return Err(Error::Validation(format!(
            "template sequence is not strictly ordered: position {} followed by {}",
            pair[0].position(),
            pair[1].position()
        )));
    }

    children.iter().map(Instantiate::instantiate_node).collect()
}

/// Start a new session for `user` from `protocol`.
///
/// A protocol without blocks yields a valid, empty session.
pub fn instantiate(protocol: &Protocol, user: UserId, now: DateTime<Utc>) -> Result<WorkoutInstance> {
    protocol.check_structure()?;

    let instance = WorkoutInstance {
        id: InstanceId::new(),
        user_id: user,
        template_id: Some(protocol.id),
        name: protocol.name.clone(),
        started_at: now,
        ended_at: None,
        blocks: instantiate_children(&protocol.blocks)?,
    };

    tracing::info!(
        "Instantiated protocol '{}' ({}) as instance {} with {} blocks",
        protocol.name,
        protocol.id,
        instance.id,
        instance.blocks.len()
    );

    Ok(instance)
}

/// Instantiate a single block outside of a full protocol
pub fn instantiate_block(block: &WorkoutBlock) -> Result<WorkoutBlockInstance> {
    block.check_structure()?;
    block.instantiate_node()
}
