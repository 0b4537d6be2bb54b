//! Foreign-key driven relationship inference.
//!
//! Each foreign key becomes a pair: a belongs-to on the table holding the
//! key and a has-many on the table it references. A pair is declared whole
//! or not at all, and one bad constraint never stops the others.

use std::collections::HashMap;

use log::{debug, warn};

use crate::db::CatalogReader;
use crate::errors::{LoadWarning, LoaderError};
use crate::models::entity::{JoinColumn, RelationKind, Relationship};
use crate::models::schema::{ColumnPair, ForeignKeyColumn, ForeignKeyConstraint, TableId};
use crate::naming::Namer;
use crate::registry::EntityRegistry;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InferenceReport {
    pub declared: usize,
    /// Constraints whose child or parent table is not in the registry.
    pub skipped: usize,
    pub failed: usize,
}

/// Catalog rows sharing one constraint identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGroup {
    pub name: String,
    pub rows: Vec<ForeignKeyColumn>,
}

impl ConstraintGroup {
    /// Reassembles the foreign key. Fails when the rows disagree on the
    /// parent table or repeat a child column.
    pub fn assemble(self, child: &TableId) -> Result<ForeignKeyConstraint, String> {
        let parent = match self.rows.first() {
            Some(row) => row.referenced_table.clone(),
            None => return Err("constraint has no columns".to_string()),
        };

        let mut pairs: Vec<ColumnPair> = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            if row.referenced_table != parent {
                return Err(format!(
                    "rows reference both {} and {}",
                    parent, row.referenced_table
                ));
            }
            if pairs
                .iter()
                .any(|pair| pair.child.eq_ignore_ascii_case(&row.column))
            {
                return Err(format!("column {} appears twice", row.column));
            }
            pairs.push(ColumnPair {
                child: row.column,
                parent: row.referenced_column,
            });
        }

        Ok(ForeignKeyConstraint {
            name: self.name,
            child: child.clone(),
            parent,
            pairs,
        })
    }
}

/// Groups rows by constraint identifier, keeping groups in the order their
/// first row appeared.
pub fn group_constraints(rows: Vec<ForeignKeyColumn>) -> Vec<ConstraintGroup> {
    let mut groups: Vec<ConstraintGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match index.get(&row.constraint) {
            Some(&position) => groups[position].rows.push(row),
            None => {
                index.insert(row.constraint.clone(), groups.len());
                groups.push(ConstraintGroup {
                    name: row.constraint.clone(),
                    rows: vec![row],
                });
            }
        }
    }

    groups
}

enum Inferred {
    Declared,
    Unreachable,
}

#[derive(Debug, Clone)]
pub struct RelationshipInference {
    namer: Namer,
    debug: bool,
}

impl RelationshipInference {
    pub fn new(namer: Namer, debug: bool) -> Self {
        Self { namer, debug }
    }

    /// Walks registered tables in registration order. Only catalog failures
    /// are returned as errors; everything else is counted and logged.
    pub async fn infer_all(
        &self,
        catalog: &dyn CatalogReader,
        registry: &mut EntityRegistry,
    ) -> Result<InferenceReport, LoaderError> {
        let tables: Vec<TableId> = registry.iter().map(|entity| entity.table.clone()).collect();
        let mut report = InferenceReport::default();

        for table in &tables {
            let rows = catalog.foreign_key_columns(table).await?;
            for group in group_constraints(rows) {
                let constraint = group.name.clone();
                match self.infer_one(table, group, registry) {
                    Ok(Inferred::Declared) => report.declared += 1,
                    Ok(Inferred::Unreachable) => report.skipped += 1,
                    Err(err) => {
                        warn!("{}", err);
                        let reason = match err {
                            LoaderError::RelationshipInference { reason, .. } => reason,
                            other => other.to_string(),
                        };
                        registry.warn(LoadWarning::RelationshipFailed {
                            constraint,
                            table: table.to_string(),
                            reason,
                        });
                        report.failed += 1;
                    }
                }
            }
        }

        debug!(
            "relationship inference: {} declared, {} skipped, {} failed",
            report.declared, report.skipped, report.failed
        );
        Ok(report)
    }

    fn infer_one(
        &self,
        table: &TableId,
        group: ConstraintGroup,
        registry: &mut EntityRegistry,
    ) -> Result<Inferred, LoaderError> {
        let failure = |constraint: &str, reason: String| LoaderError::RelationshipInference {
            constraint: constraint.to_string(),
            table: table.to_string(),
            reason,
        };

        let name = group.name.clone();
        let constraint = group
            .assemble(table)
            .map_err(|reason| failure(&name, reason))?;

        let child_key = constraint.child.key();
        let parent_key = constraint.parent.key();
        let (child_moniker, parent_moniker) = match (
            registry.moniker_for_table(&child_key),
            registry.moniker_for_table(&parent_key),
        ) {
            (Some(child), Some(parent)) => (child.to_string(), parent.to_string()),
            _ => {
                debug!(
                    "skipping constraint {} on {}: {} is not loaded",
                    constraint.name, constraint.child, constraint.parent
                );
                return Ok(Inferred::Unreachable);
            }
        };

        let belongs_to_name = match constraint.pairs.as_slice() {
            [single] => single.child.to_lowercase(),
            _ => constraint.parent.name.to_lowercase(),
        };
        let has_many_name = self.namer.relation_name_for(&constraint.child.name);

        let belongs_to = Relationship {
            name: belongs_to_name,
            kind: RelationKind::BelongsTo,
            foreign_moniker: parent_moniker,
            foreign_table: constraint.parent.clone(),
            constraint: constraint.name.clone(),
            join: constraint
                .pairs
                .iter()
                .map(|pair| JoinColumn {
                    local: pair.child.clone(),
                    foreign: pair.parent.clone(),
                })
                .collect(),
        };
        let has_many = Relationship {
            name: has_many_name,
            kind: RelationKind::HasMany,
            foreign_moniker: child_moniker,
            foreign_table: constraint.child.clone(),
            constraint: constraint.name.clone(),
            join: constraint
                .pairs
                .iter()
                .map(|pair| JoinColumn {
                    local: pair.parent.clone(),
                    foreign: pair.child.clone(),
                })
                .collect(),
        };

        if self.debug {
            trace_pair(&has_many.foreign_moniker, &belongs_to);
            trace_pair(&belongs_to.foreign_moniker, &has_many);
        }

        registry
            .declare_pair(&child_key, belongs_to, &parent_key, has_many)
            .map_err(|reason| failure(&name, reason))?;
        Ok(Inferred::Declared)
    }
}

fn trace_pair(owner: &str, relationship: &Relationship) {
    let verb = match relationship.kind {
        RelationKind::BelongsTo => "belongs_to",
        RelationKind::HasMany => "has_many",
    };
    let condition: Vec<String> = relationship
        .join
        .iter()
        .map(|join| format!("foreign.{} = self.{}", join.foreign, join.local))
        .collect();
    debug!(
        "{}->{}({} => {}, {{ {} }})",
        owner,
        verb,
        relationship.name,
        relationship.foreign_moniker,
        condition.join(", ")
    );
}
