//! The save (upsert) algorithm.
//!
//! A save first tries `UPDATE ... WHERE <primary key>`. When no row matched,
//! or the table has no primary key, it inserts. If that insert hits a
//! constraint violation after an update was attempted, another writer may
//! have inserted the same row in between; the update is retried once. When
//! the retry still matches no row, the insert's violation is reported.

use objectsql_core::{Mapped, ModelError, ObjectTable, SavePlan, SaveOptions};
use tracing::{debug, warn};

use crate::error::{Result, is_constraint_violation};
use crate::executor::{Executor, in_savepoint};

const SAVEPOINT: &str = "objectsql_save";

/// Saves `instance` and reports whether any row changed.
///
/// Automatic values and an engine-assigned row identifier are written back
/// onto `instance`.
///
/// # Errors
///
/// Returns [`SqliteError::DatabaseError`](crate::SqliteError::DatabaseError)
/// when a statement fails for any other reason than the tolerated race, and
/// [`SqliteError::Model`](crate::SqliteError::Model) when an automatic value
/// does not fit its property.
pub fn save<T, E>(
    executor: &E,
    table: &ObjectTable<T>,
    instance: &mut T,
    options: &SaveOptions,
) -> Result<bool>
where
    T: Mapped,
    E: Executor + ?Sized,
{
    if !options.object_events_disabled && !instance.on_saving() {
        debug!(table = table.name(), "save cancelled by object event");
        return Ok(false);
    }

    table
        .apply_automatic_values(instance)
        .map_err(ModelError::from)?;
    let plan = table.save_plan(instance, options);

    let changed = if options.use_transaction {
        in_savepoint(executor, SAVEPOINT, || execute_plan(executor, table, instance, &plan))?
    } else {
        execute_plan(executor, table, instance, &plan)?
    };

    if !options.object_events_disabled {
        instance.on_saved();
    }
    Ok(changed)
}

fn execute_plan<T, E>(
    executor: &E,
    table: &ObjectTable<T>,
    instance: &mut T,
    plan: &SavePlan,
) -> Result<bool>
where
    E: Executor + ?Sized,
{
    if let Some(update) = &plan.update_sql {
        let updated = executor.execute(update, &plan.update_values)?;
        if updated > 0 {
            return Ok(true);
        }
    }

    match executor.execute(&plan.insert_sql, &plan.insert_values) {
        Ok(inserted) => {
            if inserted > 0 {
                table.set_row_id(instance, executor.last_insert_rowid());
            }
            Ok(inserted > 0)
        }
        Err(err) if is_constraint_violation(&err) => match &plan.update_sql {
            Some(update) => {
                warn!(table = table.name(), error = %err, "row inserted concurrently, retrying update");
                if executor.execute(update, &plan.update_values)? > 0 {
                    Ok(true)
                } else {
                    // No row with this key exists, so the insert failed on another constraint.
                    Err(err.into())
                }
            }
            None => Err(err.into()),
        },
        Err(err) => Err(err.into()),
    }
}
