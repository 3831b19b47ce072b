//! Exercise catalog and built-in protocols.
//!
//! The catalog is the authority on which exercise identities exist. Protocol
//! templates reference exercises by their catalog id.

use crate::config::CustomExercise;
use crate::duration::DurationValue;
use crate::{Prescription, Protocol, Result, WorkoutBlock, WorkoutBlockExercise};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Broad family of an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Strength,
    Conditioning,
    Mobility,
    Bodyweight,
}

/// A movement that protocol blocks can prescribe
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub kind: ExerciseKind,
    pub tags: Vec<String>,
    pub reference_url: Option<String>,
}

/// All known exercises, keyed by id
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: HashMap<String, Exercise>,
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the catalog of built-in exercises
pub fn build_default_catalog() -> Catalog {
    let entries = [
        (
            "kb_swing_2h",
            "Kettlebell Swing (2-hand)",
            ExerciseKind::Conditioning,
            &["hinge", "posterior_chain"][..],
            Some("https://www.youtube.com/watch?v=YSxHifyI6s8"),
        ),
        (
            "goblet_squat",
            "Goblet Squat",
            ExerciseKind::Strength,
            &["squat", "lower_body"][..],
            None,
        ),
        (
            "burpee",
            "Burpee",
            ExerciseKind::Bodyweight,
            &["full_body", "conditioning"][..],
            Some("https://www.youtube.com/watch?v=TU8QYVW0gDU"),
        ),
        (
            "pullup",
            "Pull-up",
            ExerciseKind::Bodyweight,
            &["upper_body", "pull"][..],
            Some("https://www.youtube.com/watch?v=eGo4IYlbE5g"),
        ),
        (
            "pushup",
            "Push-up",
            ExerciseKind::Bodyweight,
            &["upper_body", "push"][..],
            None,
        ),
        (
            "plank",
            "Front Plank",
            ExerciseKind::Bodyweight,
            &["core", "isometric"][..],
            None,
        ),
        (
            "rower",
            "Rowing Machine",
            ExerciseKind::Conditioning,
            &["cardio", "full_body"][..],
            None,
        ),
        (
            "hip_cars",
            "Hip Controlled Articular Rotations (CARs)",
            ExerciseKind::Mobility,
            &["hip"][..],
            Some("https://www.youtube.com/watch?v=mJRXBZGRzKg"),
        ),
        (
            "shoulder_cars",
            "Shoulder Controlled Articular Rotations (CARs)",
            ExerciseKind::Mobility,
            &["shoulder"][..],
            Some("https://www.youtube.com/watch?v=f9y1lOJ0v4A"),
        ),
    ];

    let exercises = entries
        .into_iter()
        .map(|(id, name, kind, tags, url)| {
            let exercise = Exercise {
                id: id.into(),
                name: name.into(),
                kind,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                reference_url: url.map(Into::into),
            };
            (exercise.id.clone(), exercise)
        })
        .collect();

    Catalog { exercises }
}

impl Catalog {
    /// Default catalog extended with user-defined exercises from config.
    ///
    /// A custom entry with the same id as a built-in one replaces it.
    pub fn with_custom(custom: &[CustomExercise]) -> Catalog {
        let mut catalog = get_default_catalog().clone();
        for entry in custom {
            catalog.exercises.insert(
                entry.id.clone(),
                Exercise {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    kind: entry.kind.clone(),
                    tags: vec!["custom".into()],
                    reference_url: entry.url.clone(),
                },
            );
        }
        catalog
    }

    pub fn contains(&self, id: &str) -> bool {
        self.exercises.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    /// Display name for an exercise id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |e| e.name.as_str())
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if id != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    id, exercise.id
                ));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
        }

        errors
    }
}

/// Built-in protocol templates, checked against `catalog`
pub fn build_default_protocols(catalog: &Catalog) -> Result<Vec<Protocol>> {
    let secs = DurationValue::seconds;
    let mins = DurationValue::minutes;

    let kb_emom = Protocol::new("Kettlebell EMOM", vec![])?
        .with_block(
            WorkoutBlock::new("Warm-up", Some(secs(30.0)?))?
                .with_exercise(WorkoutBlockExercise::new(
                    "hip_cars",
                    Prescription::timed(1, mins(2.0)?, secs(0.0)?),
                ))
                .with_exercise(WorkoutBlockExercise::new(
                    "goblet_squat",
                    Prescription::reps(2, 8, secs(30.0)?),
                )),
        )?
        .with_block(
            WorkoutBlock::new("Swing EMOM", None)?.with_exercise(WorkoutBlockExercise::new(
                "kb_swing_2h",
                Prescription::timed(10, mins(10.0)?, secs(0.0)?),
            )),
        )?;

    let bodyweight = Protocol::new("Bodyweight Circuit", vec![])?
        .with_block(
            WorkoutBlock::new("Circuit", Some(mins(2.0)?))?
                .with_exercise(WorkoutBlockExercise::new(
                    "pushup",
                    Prescription::reps(3, 12, secs(45.0)?),
                ))
                .with_exercise(WorkoutBlockExercise::new(
                    "pullup",
                    Prescription::reps(3, 5, secs(60.0)?),
                ))
                .with_exercise(WorkoutBlockExercise::new(
                    "plank",
                    Prescription::timed(3, secs(90.0)?, secs(30.0)?),
                )),
        )?
        .with_block(
            WorkoutBlock::new("Finisher", None)?.with_exercise(WorkoutBlockExercise::new(
                "burpee",
                Prescription::timed(1, mins(3.0)?, secs(0.0)?),
            )),
        )?;

    let mobility = Protocol::new("Daily Mobility", vec![])?.with_block(
        WorkoutBlock::new("CARs", None)?
            .with_exercise(WorkoutBlockExercise::new(
                "hip_cars",
                Prescription::reps(1, 3, secs(0.0)?),
            ))
            .with_exercise(WorkoutBlockExercise::new(
                "shoulder_cars",
                Prescription::reps(1, 3, secs(0.0)?),
            )),
    )?;

    let protocols = vec![kb_emom, bodyweight, mobility];
    for protocol in &protocols {
        protocol.validate(catalog)?;
    }

    Ok(protocols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomExercise;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.exercises.len(), 9);
        assert!(catalog.contains("kb_swing_2h"));
    }

    #[test]
    fn test_default_catalog_validates() {
        let errors = get_default_catalog().validate();
        assert!(errors.is_empty(), "Default catalog errors: {:?}", errors);
    }

    #[test]
    fn test_custom_exercises_merge() {
        let custom = vec![CustomExercise {
            id: "sled_push".into(),
            name: "Sled Push".into(),
            kind: ExerciseKind::Conditioning,
            url: None,
        }];
        let catalog = Catalog::with_custom(&custom);
        assert!(catalog.contains("sled_push"));
        assert!(catalog.contains("burpee"));
        assert_eq!(catalog.display_name("sled_push"), "Sled Push");
        assert_eq!(catalog.display_name("nope"), "nope");
    }

    #[test]
    fn test_default_protocols_validate() {
        let catalog = build_default_catalog();
        let protocols = build_default_protocols(&catalog).unwrap();
        assert_eq!(protocols.len(), 3);

        for protocol in &protocols {
            assert!(protocol.validate(&catalog).is_ok());
            assert!(!protocol.blocks.is_empty());
        }
    }
}
