//! Session lifecycle on top of a [`Store`].
//!
//! These are the operations the front ends call: start a session from a
//! protocol or a single block, log exercises, finish, and delete templates.
//! Every write hands the store a fully built record, so a reader never sees a
//! half-populated instance.

use crate::instantiate::{instantiate, instantiate_block};
use crate::journal::InstanceSink;
use crate::store::Store;
use crate::{
    BlockId, Error, ExerciseInstanceId, InstanceId, Performance, Protocol, ProtocolId, Result,
    UserId, WorkoutInstance,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What to do with a protocol that still has sessions pointing at it
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Delete anyway; sessions keep their own copy of the template data
    #[default]
    Detach,
    /// Refuse while any unfinished session references the protocol
    RejectIfOpen,
}

/// Instantiate a stored protocol and persist the new session
pub fn start_session(
    store: &mut impl Store,
    protocol_id: ProtocolId,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<WorkoutInstance> {
    let protocol = store
        .load_protocol(protocol_id)?
        .ok_or_else(|| Error::not_found("protocol", protocol_id))?;

    let instance = instantiate(&protocol, user, now)?;
    store.insert_instance(&instance)?;
    Ok(instance)
}

/// Start an ad-hoc session containing a single block
pub fn start_block_session(
    store: &mut impl Store,
    block_id: BlockId,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<WorkoutInstance> {
    let block = store
        .load_block(block_id)?
        .ok_or_else(|| Error::not_found("block", block_id))?;

    let mut instance = WorkoutInstance::freeform(user, block.name.clone(), now);
    instance.push_block_instance(instantiate_block(&block)?)?;
    store.insert_instance(&instance)?;

    tracing::info!(
        "Started ad-hoc session {} from block '{}'",
        instance.id,
        block.name
    );
    Ok(instance)
}

/// Log one exercise of a session
pub fn record_performance(
    store: &mut impl Store,
    instance_id: InstanceId,
    exercise_id: ExerciseInstanceId,
    performance: Performance,
    now: DateTime<Utc>,
) -> Result<WorkoutInstance> {
    store.modify_instance(instance_id, |instance| {
        instance.record_exercise(exercise_id, performance, now)?;
        Ok(instance.clone())
    })
}

/// Mark a session finished and append it to the journal.
///
/// The journal entry is written before the store records the session as
/// finished. If the append fails the session stays open and can be finished
/// again.
pub fn finish_session(
    store: &mut impl Store,
    sink: &mut impl InstanceSink,
    instance_id: InstanceId,
    now: DateTime<Utc>,
) -> Result<WorkoutInstance> {
    let instance = store.modify_instance(instance_id, |instance| {
        instance.complete(now)?;
        sink.append(instance)?;
        Ok(instance.clone())
    })?;

    tracing::info!("Finished session {} ('{}')", instance.id, instance.name);
    Ok(instance)
}

/// Delete a protocol template according to `policy`.
///
/// Existing sessions are never modified: they already hold everything they
/// need to display, and their template reference simply stops resolving.
pub fn delete_protocol(
    store: &mut impl Store,
    protocol_id: ProtocolId,
    policy: DeletePolicy,
) -> Result<Protocol> {
    let mut referenced = 0;
    let mut open = 0;

    let removed = store
        .remove_protocol_if(protocol_id, |referencing| {
            referenced = referencing.len();
            open = referencing.iter().filter(|i| !i.is_completed()).count();

            if policy == DeletePolicy::RejectIfOpen && open > 0 {
                return Err(Error::Conflict(format!(
                    "protocol {} is referenced by {} unfinished session(s)",
                    protocol_id, open
                )));
            }
            Ok(())
        })?
        .ok_or_else(|| Error::not_found("protocol", protocol_id))?;

    if referenced > 0 {
        tracing::warn!(
            "Deleted protocol '{}' still referenced by {} session(s) ({} unfinished)",
            removed.name,
            referenced,
            open
        );
    } else {
        tracing::info!("Deleted protocol '{}'", removed.name);
    }

    Ok(removed)
}
