use crate::store::operations::jobs::TrackedJob;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_tracked_job_templates", m002_tracked_job_templates),
    ]
}

/// Apply every migration newer than the persisted version.
///
/// Each migration must be idempotent: the process can die after a migration
/// body succeeds but before its version is recorded, and it will run again on
/// the next start. Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("corrupt version marker ({} bytes)", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Normalize stored template code names so residual-click lookups match.
fn m002_tracked_job_templates(store: &Store) -> Result<(), StoreError> {
    for item in store.tracked_jobs.iter() {
        let (key, value) = item?;
        let mut job: TrackedJob = Store::deserialize(&value)?;
        let normalized = TrackedJob::normalize_template(&job.template);
        if normalized == job.template {
            continue;
        }
        job.template = normalized;
        store.tracked_jobs.insert(key, Store::serialize(&job)?)?;
    }
    Ok(())
}
