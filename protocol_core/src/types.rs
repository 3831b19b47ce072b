//! Core domain types for trainlog.
//!
//! Two tiers of records live here:
//! - Templates: protocols, blocks, and block exercises authored once and reused
//! - Instances: the mutable, time-stamped record of one performed session
//!
//! Each tier has its own identity type, so an instance can only point back at
//! a template of the matching tier.

use crate::duration::{self, DurationValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identity Types
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random identity
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::convert::From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Debug::fmt(&self.0, f)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

define_id!(
    /// Identity of a [`Protocol`]
    ProtocolId
);
define_id!(
    /// Identity of a [`WorkoutBlock`]
    BlockId
);
define_id!(
    /// Identity of a [`WorkoutBlockExercise`]
    BlockExerciseId
);
define_id!(
    /// Identity of a [`WorkoutInstance`]
    InstanceId
);
define_id!(
    /// Identity of a [`WorkoutBlockInstance`]
    BlockInstanceId
);
define_id!(
    /// Identity of a [`WorkoutBlockExerciseInstance`]
    ExerciseInstanceId
);
define_id!(
    /// Identity of the user owning an instance
    UserId
);

impl UserId {
    /// The single local user of a personal install
    pub fn local() -> Self {
        Self(Uuid::nil())
    }
}

// ============================================================================
// Template Types
// ============================================================================

/// Prescribed work for one exercise slot.
///
/// Shared verbatim between a template leaf and every instance made from it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub sets: u32,
    /// Target reps per set; `None` for time-based work
    pub reps: Option<u32>,
    /// Target duration; `None` for rep-based work
    #[serde(deserialize_with = "duration::required_nullable")]
    pub duration: Option<DurationValue>,
    pub rest: DurationValue,
}

/// One prescribed movement inside a block (template leaf)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutBlockExercise {
    pub id: BlockExerciseId,
    pub position: u32,
    /// Catalog identity of the movement, e.g. `kb_swing_2h`
    pub exercise_id: String,
    pub prescription: Prescription,
}

/// Named, ordered group of exercises
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutBlock {
    pub id: BlockId,
    pub position: u32,
    pub name: String,
    #[serde(deserialize_with = "duration::required_nullable")]
    pub rest: Option<DurationValue>,
    pub exercises: Vec<WorkoutBlockExercise>,
}

/// Reusable authored workout template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Protocol {
    pub id: ProtocolId,
    pub name: String,
    pub blocks: Vec<WorkoutBlock>,
}

// ============================================================================
// Instance Types
// ============================================================================

/// What the user actually did for one exercise
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Performance {
    pub reps: u32,
    pub duration: Option<DurationValue>,
    pub rest: Option<DurationValue>,
}

/// Performed exercise (instance leaf)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutBlockExerciseInstance {
    pub id: ExerciseInstanceId,
    pub template_id: Option<BlockExerciseId>,
    pub exercise_id: String,
    /// Copied from the template at instantiation
    pub prescribed: Prescription,
    pub actual_reps: u32,
    #[serde(deserialize_with = "duration::required_nullable")]
    pub actual_duration: Option<DurationValue>,
    #[serde(deserialize_with = "duration::required_nullable")]
    pub actual_rest: Option<DurationValue>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Performed block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutBlockInstance {
    pub id: BlockInstanceId,
    pub template_id: Option<BlockId>,
    pub name: String,
    #[serde(deserialize_with = "duration::required_nullable")]
    pub prescribed_rest: Option<DurationValue>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub exercises: Vec<WorkoutBlockExerciseInstance>,
}

/// One performed session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutInstance {
    pub id: InstanceId,
    pub user_id: UserId,
    /// Source protocol; `None` for freeform sessions
    pub template_id: Option<ProtocolId>,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub blocks: Vec<WorkoutBlockInstance>,
}

impl WorkoutInstance {
    /// Iterate every leaf in block order, then exercise order
    pub fn leaves(&self) -> impl Iterator<Item = &WorkoutBlockExerciseInstance> {
        self.blocks.iter().flat_map(|b| b.exercises.iter())
    }

    pub fn is_completed(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_and_parse_back() {
        let a = InstanceId::new();
        let b = InstanceId::new();
        assert_ne!(a, b);

        let parsed: InstanceId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn test_ids_serialize_as_plain_uuid() {
        let id = BlockId::from(Uuid::nil());
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"00000000-0000-0000-0000-000000000000\""
        );
    }

    #[test]
    fn test_absent_duration_serializes_as_null() {
        let prescription = Prescription {
            sets: 3,
            reps: Some(5),
            duration: None,
            rest: DurationValue::seconds(60.0).unwrap(),
        };
        let json = serde_json::to_value(&prescription).unwrap();
        assert!(json.get("duration").unwrap().is_null());
    }

    #[test]
    fn test_missing_nullable_duration_is_rejected() {
        let with_null = r#"{"sets":1,"reps":null,"duration":null,"rest":{"value":30,"unit":"s"}}"#;
        assert!(serde_json::from_str::<Prescription>(with_null).is_ok());

        let omitted = r#"{"sets":1,"reps":null,"rest":{"value":30,"unit":"s"}}"#;
        let err = serde_json::from_str::<Prescription>(omitted).unwrap_err();
        assert!(err.to_string().contains("duration"));
    }
}
