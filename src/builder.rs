//! Parameterized INSERT/UPDATE statement builder.
//!
//! Every builder returns SQL text with `?` placeholders plus the positional
//! arguments in placeholder order. Identifiers are backtick-quoted, which
//! MySQL, SQLite and ClickHouse all accept.
//!
//! Bulk shapes derive their column set once, from the caller's `fields` or from
//! the keys of the first row. Later rows are read through that column set only:
//! extra keys are ignored and missing keys are written as `NULL`.

use crate::error::{Error, Result};
use crate::traits::{UnsavedRow, Value};

/// SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: String, args: Vec<Value>) -> Self {
        Self { sql, args }
    }
}

/// Quote an identifier with backticks, doubling any embedded backtick.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a table name, quoting each part of a `schema.table` name separately.
pub fn quote_table(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

/// Split `schema.table` into its schema and bare table name.
pub fn split_table(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

fn quoted_field_list<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| quote_ident(f.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(?,?,?)` for `width` columns
fn placeholder_group(width: usize) -> String {
    format!("({})", vec!["?"; width].join(","))
}

fn insert_prefix<S: AsRef<str>>(table: &str, fields: &[S]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_table(table),
        quoted_field_list(fields)
    )
}

/// Single-row insert from parallel fields and values.
pub fn insert(table: &str, fields: &[&str], values: &[Value]) -> Result<Statement> {
    if fields.is_empty() {
        return Err(Error::validation(format!(
            "table[{}] insert needs at least one field",
            table
        )));
    }
    if fields.len() != values.len() {
        return Err(Error::validation(format!(
            "table[{}] insert has {} fields but {} values",
            table,
            fields.len(),
            values.len()
        )));
    }

    let sql = insert_prefix(table, fields) + &placeholder_group(fields.len());
    Ok(Statement::new(sql, values.to_vec()))
}

/// Single-row insert from a name→value mapping, fields in map order.
pub fn insert_from_map(table: &str, row: &UnsavedRow) -> Result<Statement> {
    let fields: Vec<&str> = row.keys().map(String::as_str).collect();
    let values: Vec<Value> = row.values().cloned().collect();
    insert(table, &fields, &values)
}

fn bulk_insert_sql<S: AsRef<str>>(table: &str, fields: &[S], rows: usize) -> String {
    let group = placeholder_group(fields.len());
    let mut sql = insert_prefix(table, fields);
    sql.reserve((group.len() + 1) * rows);
    for i in 0..rows {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(&group);
    }
    sql
}

/// Multi-row insert from value slices sharing one `fields` header.
pub fn bulk_insert_from_slices(
    table: &str,
    fields: &[&str],
    rows: &[Vec<Value>],
) -> Result<Statement> {
    if rows.is_empty() {
        return Err(Error::empty_batch(table, "insert"));
    }
    if fields.is_empty() {
        return Err(Error::validation(format!(
            "table[{}] bulk insert needs at least one field",
            table
        )));
    }

    let mut args = Vec::with_capacity(rows.len() * fields.len());
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != fields.len() {
            return Err(Error::validation(format!(
                "table[{}] row {} has {} values for {} fields",
                table,
                idx,
                row.len(),
                fields.len()
            )));
        }
        args.extend(row.iter().cloned());
    }

    Ok(Statement::new(
        bulk_insert_sql(table, fields, rows.len()),
        args,
    ))
}

/// Multi-row insert from mappings; the column set comes from the first row.
pub fn bulk_insert_from_maps(table: &str, rows: &[UnsavedRow]) -> Result<Statement> {
    let Some(first) = rows.first() else {
        return Err(Error::empty_batch(table, "insert"));
    };
    if first.is_empty() {
        return Err(Error::validation(format!(
            "table[{}] bulk insert needs at least one field",
            table
        )));
    }

    let fields: Vec<&String> = first.keys().collect();
    let mut args = Vec::with_capacity(rows.len() * fields.len());
    for row in rows {
        for field in &fields {
            args.push(row.get(*field).cloned().unwrap_or(Value::Null));
        }
    }

    Ok(Statement::new(
        bulk_insert_sql(table, &fields[..], rows.len()),
        args,
    ))
}

/// An `UPDATE ... WHERE key = ?` statement shaped by the first row of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    table: String,
    key: String,
    fields: Vec<String>,
    sql: String,
}

impl UpdatePlan {
    /// Build the plan from the row that fixes the batch's field set.
    pub fn new(table: &str, key: &str, first_row: &UnsavedRow) -> Result<Self> {
        Self::validate_row(table, key, first_row)?;

        let fields: Vec<String> = first_row.keys().filter(|k| *k != key).cloned().collect();
        let assignments = fields
            .iter()
            .map(|f| format!("{} = ?", quote_ident(f)))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_table(table),
            assignments,
            quote_ident(key)
        );

        Ok(Self {
            table: table.to_string(),
            key: key.to_string(),
            fields,
            sql,
        })
    }

    fn validate_row(table: &str, key: &str, row: &UnsavedRow) -> Result<()> {
        if row.len() < 2 {
            return Err(Error::validation(format!(
                "table[{}] update row needs the key and at least one field, got {} entries",
                table,
                row.len()
            )));
        }
        if !row.contains_key(key) {
            return Err(Error::validation(format!(
                "table[{}] [{}] not found in row",
                table, key
            )));
        }
        Ok(())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Fields assigned by the SET clause, in placeholder order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Arguments for one row: SET values in plan order, then the key value.
    pub fn bind(&self, row: &UnsavedRow) -> Result<Vec<Value>> {
        Self::validate_row(&self.table, &self.key, row)?;

        let mut args = Vec::with_capacity(self.fields.len() + 1);
        for field in &self.fields {
            args.push(row.get(field).cloned().unwrap_or(Value::Null));
        }
        args.push(row[&self.key].clone());
        Ok(args)
    }

    /// Full statement for a single row.
    pub fn statement(&self, row: &UnsavedRow) -> Result<Statement> {
        Ok(Statement::new(self.sql.clone(), self.bind(row)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> UnsavedRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "`users`");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_qualified_table_names() {
        assert_eq!(quote_table("users"), "`users`");
        assert_eq!(quote_table("analytics.events"), "`analytics`.`events`");
        assert_eq!(split_table("analytics.events"), (Some("analytics"), "events"));
        assert_eq!(split_table("events"), (None, "events"));

        let stmt = insert("analytics.events", &["id"], &[Value::Int64(1)]).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO `analytics`.`events` (`id`) VALUES (?)");

        let mut row = UnsavedRow::new();
        row.insert("id".to_string(), Value::Int64(1));
        row.insert("name".to_string(), Value::from("a"));
        let plan = UpdatePlan::new("analytics.events", "id", &row).unwrap();
        assert_eq!(plan.sql(), "UPDATE `analytics`.`events` SET `name` = ? WHERE `id` = ?");
    }

    #[test]
    fn test_single_insert() {
        let stmt = insert(
            "users",
            &["name", "value"],
            &[Value::from("a"), Value::Int64(1)],
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO `users` (`name`, `value`) VALUES (?,?)"
        );
        assert_eq!(stmt.args, vec![Value::from("a"), Value::Int64(1)]);
    }

    #[test]
    fn test_single_insert_rejects_mismatch() {
        let err = insert("users", &["name", "value"], &[Value::from("a")]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = insert("users", &[], &[]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_insert_from_map_uses_key_order() {
        let stmt = insert_from_map(
            "users",
            &row(&[("value", Value::Int64(1)), ("name", Value::from("a"))]),
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO `users` (`name`, `value`) VALUES (?,?)"
        );
        assert_eq!(stmt.args, vec![Value::from("a"), Value::Int64(1)]);
    }

    #[test]
    fn test_bulk_insert_from_slices_is_one_statement() {
        let fields = ["a", "b", "c"];
        let rows: Vec<Vec<Value>> = (0..1000)
            .map(|i| vec![Value::Int64(i), Value::Int64(i * 2), Value::from("x")])
            .collect();

        let stmt = bulk_insert_from_slices("t", &fields, &rows).unwrap();

        assert_eq!(stmt.args.len(), 1000 * fields.len());
        assert_eq!(stmt.sql.matches("(?,?,?)").count(), 1000);
        assert!(stmt.sql.starts_with("INSERT INTO `t` (`a`, `b`, `c`) VALUES (?,?,?),(?,?,?)"));
        assert_eq!(stmt.args[3], Value::Int64(1));
        assert_eq!(stmt.args[4], Value::Int64(2));
    }

    #[test]
    fn test_bulk_insert_from_slices_rejects_ragged_rows() {
        let rows = vec![vec![Value::Int64(1)], vec![Value::Int64(2), Value::Int64(3)]];
        let err = bulk_insert_from_slices("t", &["a"], &rows).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_bulk_insert_empty_batch() {
        let err = bulk_insert_from_slices("t", &["a"], &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyBatch { .. }));

        let err = bulk_insert_from_maps("t", &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyBatch { ref table, .. } if table == "t"));
    }

    #[test]
    fn test_bulk_insert_from_maps_uses_first_row_fields() {
        let rows = vec![
            row(&[("name", Value::from("a")), ("value", Value::Int64(1))]),
            // extra key ignored, missing key written as NULL
            row(&[("name", Value::from("b")), ("extra", Value::Int64(9))]),
        ];

        let stmt = bulk_insert_from_maps("t", &rows).unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO `t` (`name`, `value`) VALUES (?,?),(?,?)"
        );
        assert_eq!(
            stmt.args,
            vec![
                Value::from("a"),
                Value::Int64(1),
                Value::from("b"),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_update_plan() {
        let first = row(&[
            ("id", Value::Int64(1)),
            ("name", Value::from("a")),
            ("value", Value::Int64(10)),
        ]);

        let plan = UpdatePlan::new("t", "id", &first).unwrap();
        assert_eq!(
            plan.sql(),
            "UPDATE `t` SET `name` = ?, `value` = ? WHERE `id` = ?"
        );
        assert_eq!(plan.fields(), &["name".to_string(), "value".to_string()]);
        assert_eq!(
            plan.bind(&first).unwrap(),
            vec![Value::from("a"), Value::Int64(10), Value::Int64(1)]
        );
    }

    #[test]
    fn test_update_plan_binds_later_rows_through_first_row_fields() {
        let first = row(&[("id", Value::Int64(1)), ("name", Value::from("a"))]);
        let plan = UpdatePlan::new("t", "id", &first).unwrap();

        let later = row(&[("id", Value::Int64(2)), ("value", Value::Int64(5))]);
        assert_eq!(
            plan.bind(&later).unwrap(),
            vec![Value::Null, Value::Int64(2)]
        );
    }

    #[test]
    fn test_update_plan_validation() {
        let only_key = row(&[("id", Value::Int64(1))]);
        assert!(matches!(
            UpdatePlan::new("t", "id", &only_key),
            Err(Error::Validation(_))
        ));

        let no_key = row(&[("name", Value::from("a")), ("value", Value::Int64(1))]);
        assert!(matches!(
            UpdatePlan::new("t", "id", &no_key),
            Err(Error::Validation(_))
        ));

        let first = row(&[("id", Value::Int64(1)), ("name", Value::from("a"))]);
        let plan = UpdatePlan::new("t", "id", &first).unwrap();
        assert!(matches!(plan.bind(&no_key), Err(Error::Validation(_))));
    }
}
