//! Protocol template construction and validation.
//!
//! Templates carry no behavior beyond structure: names must be present,
//! positions must be strictly increasing within each sequence, and every
//! exercise must reference something in the catalog. Edits are applied to a
//! copy and only committed once the result validates.

use crate::catalog::Catalog;
use crate::duration::{to_seconds, DurationValue};
use crate::{
    BlockExerciseId, BlockId, Error, Prescription, Protocol, ProtocolId, Result, WorkoutBlock,
    WorkoutBlockExercise,
};

impl Prescription {
    /// Rep-based work: `sets` x `reps` with `rest` after each exercise
    pub fn reps(sets: u32, reps: u32, rest: DurationValue) -> Self {
        Self {
            sets,
            reps: Some(reps),
            duration: None,
            rest,
        }
    }

    /// Time-based work lasting `duration` in total
    pub fn timed(sets: u32, duration: DurationValue, rest: DurationValue) -> Self {
        Self {
            sets,
            reps: None,
            duration: Some(duration),
            rest,
        }
    }

    /// Prescribed work plus rest, in seconds
    pub fn total_seconds(&self) -> f64 {
        to_seconds(self.duration.as_ref()) + self.rest.as_seconds()
    }
}

impl WorkoutBlockExercise {
    /// New exercise slot; its position is assigned when pushed into a block
    pub fn new(exercise_id: impl Into<String>, prescription: Prescription) -> Self {
        Self {
            id: BlockExerciseId::new(),
            position: 0,
            exercise_id: exercise_id.into(),
            prescription,
        }
    }
}

impl WorkoutBlock {
    pub fn new(name: impl Into<String>, rest: Option<DurationValue>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Validation("block name must not be empty".into()));
        }
        Ok(Self {
            id: BlockId::new(),
            position: 0,
            name,
            rest,
            exercises: Vec::new(),
        })
    }

    /// Append an exercise after the current last one
    pub fn push_exercise(&mut self, mut exercise: WorkoutBlockExercise) -> BlockExerciseId {
        exercise.position = next_position(self.exercises.iter().map(|e| e.position));
        let id = exercise.id;
        self.exercises.push(exercise);
        id
    }

    pub fn with_exercise(mut self, exercise: WorkoutBlockExercise) -> Self {
        self.push_exercise(exercise);
        self
    }

    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(format!("Block {} has empty name", self.id));
        }

        errors.extend(position_errors(
            &format!("Block '{}'", self.name),
            self.exercises.iter().map(|e| e.position),
        ));

        for exercise in &self.exercises {
            if exercise.exercise_id.trim().is_empty() {
                errors.push(format!(
                    "Block '{}': exercise {} has empty exercise reference",
                    self.name, exercise.id
                ));
            }
            if exercise.prescription.sets == 0 {
                errors.push(format!(
                    "Block '{}': exercise '{}' prescribes zero sets",
                    self.name, exercise.exercise_id
                ));
            }
        }

        errors
    }

    fn reference_errors(&self, catalog: &Catalog) -> Vec<String> {
        self.exercises
            .iter()
            .filter(|e| !catalog.contains(&e.exercise_id))
            .map(|e| {
                format!(
                    "Block '{}' references non-existent exercise '{}'",
                    self.name, e.exercise_id
                )
            })
            .collect()
    }

    pub fn check_structure(&self) -> Result<()> {
        into_result(self.structural_errors())
    }

    /// Structure plus exercise references
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        let mut errors = self.structural_errors();
        errors.extend(self.reference_errors(catalog));
        into_result(errors)
    }

    pub fn prescribed_seconds(&self) -> f64 {
        self.exercises
            .iter()
            .map(|e| e.prescription.total_seconds())
            .sum::<f64>()
            + to_seconds(self.rest.as_ref())
    }
}

impl Protocol {
    /// Build a protocol, rejecting it outright if the structure is invalid
    pub fn new(name: impl Into<String>, blocks: Vec<WorkoutBlock>) -> Result<Self> {
        let protocol = Self {
            id: ProtocolId::new(),
            name: name.into(),
            blocks,
        };
        protocol.check_structure()?;
        Ok(protocol)
    }

    pub fn block(&self, id: BlockId) -> Option<&WorkoutBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.edit(|p| {
            p.name = name;
            Ok(())
        })
    }

    /// Append a block after the current last one
    pub fn push_block(&mut self, block: WorkoutBlock) -> Result<BlockId> {
        self.edit(|p| {
            let mut block = block;
            block.position = next_position(p.blocks.iter().map(|b| b.position));
            let id = block.id;
            p.blocks.push(block);
            Ok(id)
        })
    }

    pub fn with_block(mut self, block: WorkoutBlock) -> Result<Self> {
        self.push_block(block)?;
        Ok(self)
    }

    pub fn remove_block(&mut self, id: BlockId) -> Result<WorkoutBlock> {
        self.edit(|p| {
            let idx = p
                .blocks
                .iter()
                .position(|b| b.id == id)
                .ok_or_else(|| Error::not_found("block", id))?;
            Ok(p.blocks.remove(idx))
        })
    }

    /// Swap in a new version of an existing block (matched by id)
    pub fn replace_block(&mut self, block: WorkoutBlock) -> Result<()> {
        self.edit(|p| {
            let slot = p
                .blocks
                .iter_mut()
                .find(|b| b.id == block.id)
                .ok_or_else(|| Error::not_found("block", block.id))?;
            *slot = block;
            Ok(())
        })
    }

    /// Apply `f` to a copy and commit only if the result is structurally valid
    fn edit<T>(&mut self, f: impl FnOnce(&mut Protocol) -> Result<T>) -> Result<T> {
        let mut draft = self.clone();
        let out = f(&mut draft)?;
        draft.check_structure()?;
        *self = draft;
        Ok(out)
    }

    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(format!("Protocol {} has empty name", self.id));
        }

        errors.extend(position_errors(
            &format!("Protocol '{}'", self.name),
            self.blocks.iter().map(|b| b.position),
        ));

        for block in &self.blocks {
            errors.extend(block.structural_errors());
        }

        errors
    }

    pub fn check_structure(&self) -> Result<()> {
        into_result(self.structural_errors())
    }

    /// Structure plus exercise references against `catalog`
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        let mut errors = self.structural_errors();
        for block in &self.blocks {
            errors.extend(block.reference_errors(catalog));
        }
        into_result(errors)
    }

    pub fn prescribed_seconds(&self) -> f64 {
        self.blocks.iter().map(WorkoutBlock::prescribed_seconds).sum()
    }
}

fn next_position(existing: impl Iterator<Item = u32>) -> u32 {
    existing.max().map_or(0, |p| p + 1)
}

/// Positions must strictly increase along the sequence
fn position_errors(owner: &str, positions: impl Iterator<Item = u32>) -> Vec<String> {
    let mut errors = Vec::new();
    let mut previous: Option<u32> = None;

    for (idx, position) in positions.enumerate() {
        if let Some(prev) = previous {
            if position == prev {
                errors.push(format!(
                    "{}: duplicate position {} at index {}",
                    owner, position, idx
                ));
            } else if position < prev {
                errors.push(format!(
                    "{}: position {} at index {} is out of order (follows {})",
                    owner, position, idx, prev
                ));
            }
        }
        previous = Some(position);
    }

    errors
}

fn into_result(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors.join("; ")))
    }
}
