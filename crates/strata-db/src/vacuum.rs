//! Orphan-row cleanup followed by file compaction.
//!
//! Deleting a user or memo leaves rows in other tables pointing at it.
//! [`vacuum`] deletes those rows inside one transaction, then asks the
//! adapter to reclaim the freed space.

use crate::error::{DbError, DbResult};
use crate::traits::{with_transaction, Database};
use std::fmt;
use strata_core::Context;

/// Rows of `table` whose `column` has no match in `parent_table.parent_column`
/// are orphans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanRule {
    pub table: &'static str,
    pub column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
    /// NULL in `column` means "no parent" rather than "orphan"
    pub nullable: bool,
}

impl OrphanRule {
    /// Rule against `parent_table.id`.
    pub const fn new(table: &'static str, column: &'static str, parent_table: &'static str) -> Self {
        Self {
            table,
            column,
            parent_table,
            parent_column: "id",
            nullable: false,
        }
    }

    pub const fn parent_column(self, parent_column: &'static str) -> Self {
        Self {
            parent_column,
            ..self
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// The DELETE statement for this rule.
    pub fn delete_sql(&self) -> String {
        let null_guard = if self.nullable {
            format!("{} IS NOT NULL AND ", quote(self.column))
        } else {
            String::new()
        };
        format!(
            "DELETE FROM {table} WHERE {null_guard}{column} NOT IN (SELECT {parent_column} FROM {parent_table})",
            table = quote(self.table),
            column = quote(self.column),
            parent_column = quote(self.parent_column),
            parent_table = quote(self.parent_table),
        )
    }
}

impl fmt::Display for OrphanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.table, self.column, self.parent_table, self.parent_column
        )
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Rules for the bundled schema.
///
/// Parents are pruned before their children: memos of deleted users go
/// first, so rules keyed on `memo.id` also catch rows of those memos.
pub const DEFAULT_ORPHAN_RULES: &[OrphanRule] = &[
    OrphanRule::new("memo", "creator_id", "user"),
    OrphanRule::new("resource", "creator_id", "user"),
    OrphanRule::new("resource", "memo_id", "memo").nullable(),
    OrphanRule::new("user_setting", "user_id", "user"),
    OrphanRule::new("memo_organizer", "memo_id", "memo"),
    OrphanRule::new("memo_organizer", "user_id", "user"),
    OrphanRule::new("memo_relation", "memo_id", "memo"),
    OrphanRule::new("memo_relation", "related_memo_id", "memo"),
    OrphanRule::new("tag", "creator_id", "user"),
    OrphanRule::new("memo_tag", "memo_id", "memo"),
    OrphanRule::new("memo_tag", "tag_name", "tag").parent_column("name"),
];

/// Rows removed per rule, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VacuumReport {
    pub removed: Vec<(OrphanRule, usize)>,
}

impl VacuumReport {
    pub fn total(&self) -> usize {
        self.removed.iter().map(|(_, n)| n).sum()
    }
}

/// Delete orphans per `rules` in one transaction, then compact.
///
/// A compaction failure is reported as [`DbError::CompactionFailure`]; the
/// deletes are already committed at that point.
pub fn vacuum(ctx: &Context, db: &dyn Database, rules: &[OrphanRule]) -> DbResult<VacuumReport> {
    ctx.check()?;

    let report = with_transaction(db, |tx| {
        let mut report = VacuumReport::default();
        for rule in rules {
            ctx.check()?;
            let removed = tx.execute(&rule.delete_sql())?;
            if removed > 0 {
                log::debug!("Vacuum removed {removed} orphan rows ({rule})");
            }
            report.removed.push((*rule, removed));
        }
        Ok::<_, DbError>(report)
    })?;

    db.compact().map_err(|e| match e {
        DbError::CompactionFailure(_) => e,
        other => DbError::CompactionFailure(other.to_string()),
    })?;

    log::info!(
        "Vacuum complete: {} orphan rows removed from {} database",
        report.total(),
        db.db_type()
    );
    Ok(report)
}

#[cfg(test)]
#[path = "vacuum_test.rs"]
mod tests;
