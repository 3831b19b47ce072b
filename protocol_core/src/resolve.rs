//! On-demand resolution of instance back-references.
//!
//! Instances never embed their template. When a caller wants the live
//! template it is looked up through the store, and a reference that no longer
//! resolves is reported rather than treated as fatal: the instance still has
//! its own copy of everything it needs to render.

use crate::store::Store;
use crate::{Error, Protocol, Result, WorkoutBlock, WorkoutBlockInstance, WorkoutInstance};

/// Outcome of following a template reference
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateLookup<T, Id> {
    /// The template still exists
    Resolved(T),
    /// The instance was never linked to a template
    Freeform,
    /// The template was deleted after instantiation
    Dangling(Id),
}

impl<T, Id> TemplateLookup<T, Id> {
    pub fn resolved(&self) -> Option<&T> {
        match self {
            TemplateLookup::Resolved(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_dangling(&self) -> bool {
        matches!(self, TemplateLookup::Dangling(_))
    }
}

fn lookup<T, Id>(
    kind: &'static str,
    id: Option<Id>,
    load: impl FnOnce(Id) -> Result<Option<T>>,
) -> Result<TemplateLookup<T, Id>>
where
    Id: Copy + std::fmt::Display,
{
    let Some(id) = id else {
        return Ok(TemplateLookup::Freeform);
    };

    match load(id)? {
        Some(template) => Ok(TemplateLookup::Resolved(template)),
        None => {
            tracing::warn!(
                "{} template {} no longer exists; using the instance's own copy",
                kind,
                id
            );
            Ok(TemplateLookup::Dangling(id))
        }
    }
}

/// Follow an instance's protocol reference
pub fn resolve_protocol(
    store: &impl Store,
    instance: &WorkoutInstance,
) -> Result<TemplateLookup<Protocol, crate::ProtocolId>> {
    lookup("protocol", instance.template_id, |id| store.load_protocol(id))
}

/// Follow a block instance's block reference
pub fn resolve_block(
    store: &impl Store,
    block: &WorkoutBlockInstance,
) -> Result<TemplateLookup<WorkoutBlock, crate::BlockId>> {
    lookup("block", block.template_id, |id| store.load_block(id))
}

/// Strict variant: a dangling reference is an error
pub fn require_protocol(store: &impl Store, instance: &WorkoutInstance) -> Result<Option<Protocol>> {
    match resolve_protocol(store, instance)? {
        TemplateLookup::Resolved(protocol) => Ok(Some(protocol)),
        TemplateLookup::Freeform => Ok(None),
        TemplateLookup::Dangling(id) => Err(Error::DanglingTemplateReference {
            kind: "protocol",
            id: id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::DurationValue;
    use crate::instantiate::instantiate;
    use crate::store::MemoryStore;
    use crate::{Prescription, UserId, WorkoutBlockExercise};
    use chrono::Utc;

    fn stored_protocol(store: &mut MemoryStore) -> Protocol {
        let block = WorkoutBlock::new("Only", None)
            .unwrap()
            .with_exercise(WorkoutBlockExercise::new(
                "pullup",
                Prescription::reps(3, 5, DurationValue::minutes(1.0).unwrap()),
            ));
        let protocol = Protocol::new("Pull Day", vec![block]).unwrap();
        store.save_protocol(&protocol).unwrap();
        protocol
    }

    #[test]
    fn test_resolves_live_templates() {
        let mut store = MemoryStore::default();
        let protocol = stored_protocol(&mut store);
        let instance = instantiate(&protocol, UserId::local(), Utc::now()).unwrap();

        let found = resolve_protocol(&store, &instance).unwrap();
        assert_eq!(found.resolved(), Some(&protocol));

        let block = resolve_block(&store, &instance.blocks[0]).unwrap();
        assert_eq!(block.resolved(), Some(&protocol.blocks[0]));
    }

    #[test]
    fn test_dangling_after_delete_is_tolerated() {
        let mut store = MemoryStore::default();
        let protocol = stored_protocol(&mut store);
        let instance = instantiate(&protocol, UserId::local(), Utc::now()).unwrap();
        store.remove_protocol(protocol.id).unwrap();

        let found = resolve_protocol(&store, &instance).unwrap();
        assert_eq!(found, TemplateLookup::Dangling(protocol.id));
        assert!(resolve_block(&store, &instance.blocks[0])
            .unwrap()
            .is_dangling());

        assert!(matches!(
            require_protocol(&store, &instance),
            Err(Error::DanglingTemplateReference { kind: "protocol", .. })
        ));
    }

    #[test]
    fn test_freeform_has_no_template() {
        let store = MemoryStore::default();
        let instance = WorkoutInstance::freeform(UserId::local(), "Loose", Utc::now());
        assert_eq!(
            resolve_protocol(&store, &instance).unwrap(),
            TemplateLookup::Freeform
        );
        assert_eq!(require_protocol(&store, &instance).unwrap(), None);
    }
}
