//! Per-cell evaluation of computed fields.

use cellgraph_common::{
    CalcError, CalcResult, CellChange, CellValue, Field, FieldId, FieldKind, LinkRef, LookupOptions,
    RecordId, TableId, VALUES_SLOT,
};
use cellgraph_parse::{ASTNode, ASTNodeType};
use rustc_hash::FxHashMap;

use crate::engine::CalcConfig;
use crate::engine::link::LinkIndex;
use crate::interpreter::{FieldValues, Interpreter, ValuesSlot};
use crate::record::{Record, RecordMap};

pub struct FieldEvaluator<'c> {
    config: &'c CalcConfig,
    /// Parsed expressions by field id.
    parsed: FxHashMap<FieldId, ASTNode>,
    passthrough: ASTNode,
}

impl<'c> FieldEvaluator<'c> {
    pub fn new(config: &'c CalcConfig) -> Self {
        let slot = FieldId::new(VALUES_SLOT);
        Self {
            config,
            parsed: FxHashMap::default(),
            passthrough: ASTNode::new(
                ASTNodeType::Reference {
                    original: format!("{{{slot}}}"),
                    field_id: slot,
                },
                None,
            ),
        }
    }

    /// Compute `field` for one record against the current projection.
    /// The returned change's old value is what the projection held.
    pub fn evaluate(
        &mut self,
        field: &Field,
        record_id: &RecordId,
        records: &RecordMap,
        links: &LinkIndex,
    ) -> CalcResult<CellChange> {
        let empty = Record::new(record_id.clone());
        let record = records.get(&field.table_id, record_id).unwrap_or(&empty);

        let value = match &field.kind {
            FieldKind::Formula(opts) => {
                let ast = self.parsed_expression(field, &opts.expression)?;
                let value = run(field, ast, record);
                self.shape(field, value)
            }
            FieldKind::Link(opts) => {
                let foreign = self.associated(field, &field.id, record_id, links)?;
                let mut ends = Vec::with_capacity(foreign.len());
                for id in foreign {
                    let target = self.foreign_record(field, record_id, &opts.foreign_table_id, id, records)?;
                    let title = target.value(&opts.lookup_field_id);
                    let end = LinkRef::new(id.clone());
                    ends.push(if title.is_null() {
                        end
                    } else {
                        end.with_title(title.to_string())
                    });
                }
                CellValue::from_links(ends, field.is_multiple)
            }
            FieldKind::Lookup(opts) => {
                let values = self.lookup_values(field, opts, record_id, records, links)?;
                let value = run(field, &self.passthrough, &ValuesSlot::new(values));
                self.shape(field, value)
            }
            FieldKind::Rollup(opts) => {
                let values = self.lookup_values(field, &opts.lookup, record_id, records, links)?;
                let ast = self.parsed_expression(field, &opts.expression)?;
                let value = run(field, ast, &ValuesSlot::new(values));
                self.shape(field, value)
            }
            FieldKind::Text | FieldKind::Number | FieldKind::Checkbox => {
                return Err(CalcError::UnsupportedFieldType {
                    field_id: field.id.clone(),
                    kind: field.kind.name(),
                });
            }
        };

        Ok(CellChange {
            table_id: field.table_id.clone(),
            record_id: record_id.clone(),
            field_id: field.id.clone(),
            old_value: record.value(&field.id),
            new_value: value,
        })
    }

    fn parsed_expression(&mut self, field: &Field, expression: &str) -> CalcResult<&ASTNode> {
        if !self.parsed.contains_key(&field.id) {
            let ast = cellgraph_parse::parse(expression).map_err(|e| CalcError::InvalidFormula {
                field_id: field.id.clone(),
                message: e.to_string(),
            })?;
            self.parsed.insert(field.id.clone(), ast);
        }
        self.parsed
            .get(&field.id)
            .ok_or_else(|| CalcError::FieldNotFound(field.id.clone()))
    }

    fn associated<'l>(
        &self,
        field: &Field,
        link_id: &FieldId,
        record_id: &RecordId,
        links: &'l LinkIndex,
    ) -> CalcResult<&'l [RecordId]> {
        links
            .get(link_id, record_id)
            .ok_or_else(|| CalcError::UnresolvedDependency {
                field_id: field.id.clone(),
                record_id: record_id.clone(),
                missing: record_id.clone(),
            })
    }

    fn foreign_record<'r>(
        &self,
        field: &Field,
        record_id: &RecordId,
        table: &TableId,
        foreign: &RecordId,
        records: &'r RecordMap,
    ) -> CalcResult<&'r Record> {
        records
            .get(table, foreign)
            .ok_or_else(|| CalcError::UnresolvedDependency {
                field_id: field.id.clone(),
                record_id: record_id.clone(),
                missing: foreign.clone(),
            })
    }

    /// Values of the foreign lookup field across the linked records,
    /// flattened into the `{values}` slot.
    fn lookup_values(
        &self,
        field: &Field,
        opts: &LookupOptions,
        record_id: &RecordId,
        records: &RecordMap,
        links: &LinkIndex,
    ) -> CalcResult<CellValue> {
        let foreign = self.associated(field, &opts.link_field_id, record_id, links)?;
        let mut values = Vec::with_capacity(foreign.len());
        for id in foreign {
            let target = self.foreign_record(field, record_id, &opts.foreign_table_id, id, records)?;
            values.extend(target.value(&opts.lookup_field_id).flatten());
        }
        values.retain(|v| !v.is_null());
        Ok(CellValue::Array(values))
    }

    /// Fit a result to the field's cardinality.
    fn shape(&self, field: &Field, value: CellValue) -> CellValue {
        match (field.is_multiple, value) {
            (_, v) if v.is_null() => CellValue::Null,
            (true, CellValue::Array(items)) => CellValue::Array(items),
            (true, scalar) => CellValue::Array(vec![scalar]),
            (false, CellValue::Array(mut items)) if items.len() == 1 => items.remove(0),
            (false, CellValue::Array(items)) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
                    .collect();
                CellValue::Text(parts.join(&self.config.array_join_separator))
            }
            (false, scalar) => scalar,
        }
    }
}

/// Evaluate an expression; value-level faults become a null cell.
fn run(field: &Field, ast: &ASTNode, values: &dyn FieldValues) -> CellValue {
    match Interpreter::new(values).evaluate_ast(ast) {
        Ok(value) => value,
        Err(fault) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(field = %field.id, %fault, "formula fault, writing null");
            #[cfg(not(feature = "tracing"))]
            let _ = (field, fault);
            CellValue::Null
        }
    }
}
