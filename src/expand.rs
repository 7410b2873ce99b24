use std::collections::HashMap;

use crate::schema::Field;

/// Alias given to the flattened table in the `FROM` clause.
///
/// Root-level expansion must start from this reference, and aliases starting
/// with `t_` lose that prefix.
pub const ROOT_ALIAS: &str = "t";

const ROOT_ALIAS_PREFIX: &str = "t_";

/// Select columns and unnest joins produced by expanding a field tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattening {
    pub selects: Vec<String>,
    pub joins: Vec<String>,
    join_targets: Vec<JoinTarget>,
}

/// A repeated field that is unnested by a `LEFT JOIN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    pub field_path: String,
    pub alias: String,
}

impl Flattening {
    pub fn join_targets(&self) -> &[JoinTarget] {
        &self.join_targets
    }

    pub fn is_empty(&self) -> bool {
        self.selects.is_empty()
    }

    /// Output column names, in select order.
    pub fn column_names(&self) -> Vec<&str> {
        self.selects
            .iter()
            .map(|select| match select.rsplit_once(" AS ") {
                Some((_, alias)) => alias,
                None => select.as_str(),
            })
            .collect()
    }

    /// Column names produced by more than one select, in first-seen order.
    pub fn alias_collisions(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut collisions = vec![];
        for name in self.column_names() {
            let count = counts.entry(name).or_default();
            *count += 1;
            if *count == 2 {
                collisions.push(name.to_owned());
            }
        }
        collisions
    }

    fn extend(&mut self, other: Flattening) {
        self.selects.extend(other.selects);
        self.joins.extend(other.joins);
        self.join_targets.extend(other.join_targets);
    }

    fn push_join(&mut self, field_path: &str, alias: &str) {
        self.joins.push(join_clause(field_path, alias));
        self.join_targets.push(JoinTarget {
            field_path: field_path.to_owned(),
            alias: alias.to_owned(),
        });
    }
}

fn join_clause(field_path: &str, alias: &str) -> String {
    format!(" LEFT JOIN\n    {} AS {}", field_path, alias)
}

fn select_clause(field_path: &str, alias: &str) -> String {
    format!("{} AS {}", field_path, alias)
}

/// Flattened column name for a qualified field path.
///
/// Only the literal `t_` prefix is removed, wherever the path comes from: a
/// repeated record named e.g. `t_items` makes its children lose the prefix too.
pub fn field_alias(field_path: &str) -> String {
    let alias = field_path.replace('.', "_");
    match alias.strip_prefix(ROOT_ALIAS_PREFIX) {
        Some(stripped) => stripped.to_owned(),
        None => alias,
    }
}

/// Expands `fields` into select and join clauses, depth-first and in
/// declaration order.
///
/// `parent` is the reference the fields are qualified with: [`ROOT_ALIAS`] for
/// a table's top-level columns.
pub fn expand_fields(parent: &str, fields: &[Field]) -> Flattening {
    let mut flattening = Flattening::default();
    for field in fields {
        let field_path = format!("{}.{}", parent, field.name);
        let alias = field_alias(&field_path);
        match (field.is_record(), field.is_repeated()) {
            (true, true) => {
                flattening.push_join(&field_path, &alias);
                flattening.extend(expand_fields(&alias, &field.fields));
            }
            (true, false) => {
                flattening.extend(expand_fields(&field_path, &field.fields));
            }
            (false, true) => {
                flattening.push_join(&field_path, &alias);
                flattening.selects.push(alias);
            }
            (false, false) => {
                flattening.selects.push(select_clause(&field_path, &alias));
            }
        }
    }
    flattening
}

/// Expands the top-level columns of a table.
pub fn expand_table(fields: &[Field]) -> Flattening {
    let flattening = expand_fields(ROOT_ALIAS, fields);
    log::debug!(
        "Expanded {} fields into {} columns and {} joins",
        fields.len(),
        flattening.selects.len(),
        flattening.joins.len()
    );
    flattening
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldMode, FieldType};

    fn string(name: &str) -> Field {
        Field::new(name, FieldType::String, FieldMode::Nullable)
    }

    #[test]
    fn test_field_alias() {
        assert_eq!(field_alias("t.id"), "id");
        assert_eq!(field_alias("t.addr.city"), "addr_city");
        assert_eq!(field_alias("items.sku"), "items_sku");
        assert_eq!(field_alias("t.t_count"), "t_count");
        assert_eq!(field_alias("t_items.sku"), "items_sku");
    }

    #[test]
    fn test_empty_record() {
        let fields = vec![
            Field::record("empty", FieldMode::Nullable, vec![]),
            Field::record("empty_list", FieldMode::Repeated, vec![]),
            string("name"),
        ];
        let flattening = expand_table(&fields);
        assert_eq!(flattening.selects, vec!["t.name AS name"]);
        assert_eq!(flattening.joins, vec![" LEFT JOIN\n    t.empty_list AS empty_list"]);
    }

    #[test]
    fn test_join_targets() {
        let fields = vec![Field::record(
            "orders",
            FieldMode::Repeated,
            vec![
                Field::new("tags", FieldType::String, FieldMode::Repeated),
                string("id"),
            ],
        )];
        let flattening = expand_table(&fields);
        let targets: Vec<_> = flattening
            .join_targets()
            .iter()
            .map(|target| (target.field_path.as_str(), target.alias.as_str()))
            .collect();
        assert_eq!(
            targets,
            vec![("t.orders", "orders"), ("orders.tags", "orders_tags")]
        );
        assert_eq!(flattening.column_names(), vec!["orders_tags", "orders_id"]);
    }

    #[test]
    fn test_alias_collisions() {
        let fields = vec![
            Field::record("a", FieldMode::Nullable, vec![string("b")]),
            string("a_b"),
            string("c"),
        ];
        let flattening = expand_table(&fields);
        assert_eq!(flattening.alias_collisions(), vec!["a_b".to_owned()]);
        assert!(expand_table(&[string("c")]).alias_collisions().is_empty());
    }
}
