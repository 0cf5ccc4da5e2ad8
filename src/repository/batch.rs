//! Multi-row insert statements built from typed rows.
//!
//! Diesel's batch inserts do not cover upserts whose values contain
//! subqueries, so statements are rendered here with one bound parameter per
//! value and executed through `sql_query`. Placeholder syntax is chosen per
//! backend by [`BatchBackend`].

use diesel::backend::Backend;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::serialize::ToSql;
use diesel::sql_types::{BigInt, Bool, Double, HasSqlType, Integer, Text};

/// Upper bound on bound parameters per statement (SQLite's default limit is
/// 32766; PostgreSQL allows 65535).
pub const MAX_BIND_PARAMS: usize = 32_000;

/// Largest number of `R` rows that fit in one statement.
pub fn rows_per_statement<R: BatchRow>() -> usize {
    (MAX_BIND_PARAMS / R::columns().len().max(1)).max(1)
}

/// A value bound to one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    BigInt(i64),
    Integer(i32),
    Text(String),
    Double(f64),
    Bool(bool),
}

/// One column of a batch row.
///
/// `expr` wraps the placeholder in a SQL expression, with `{}` marking where
/// the placeholder goes.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub expr: Option<&'static str>,
}

impl Column {
    pub const fn param(name: &'static str) -> Self {
        Self { name, expr: None }
    }

    pub const fn expr(name: &'static str, expr: &'static str) -> Self {
        Self {
            name,
            expr: Some(expr),
        }
    }
}

/// A row type that can be written by [`BatchInsert`].
pub trait BatchRow {
    /// Target table.
    const TABLE: &'static str;

    /// Columns in bind order.
    fn columns() -> &'static [Column];

    /// Push this row's values, one per column.
    fn push_binds(&self, binds: &mut Vec<BindValue>);
}

/// Conflict handling for a batch insert.
#[derive(Debug, Clone, Copy)]
pub enum OnConflict {
    /// `ON CONFLICT (target) DO NOTHING`
    DoNothing { target: &'static [&'static str] },
    /// `ON CONFLICT (target) DO UPDATE SET col = excluded.col, ...`
    DoUpdate {
        target: &'static [&'static str],
        update: &'static [&'static str],
    },
}

/// Backends that can run rendered batch statements.
pub trait BatchBackend:
    Backend
    + HasSqlType<BigInt>
    + HasSqlType<Integer>
    + HasSqlType<Text>
    + HasSqlType<Double>
    + HasSqlType<Bool>
{
    /// Placeholder for the 1-based parameter `index`.
    fn placeholder(index: usize) -> String;
}

impl BatchBackend for diesel::sqlite::Sqlite {
    fn placeholder(_index: usize) -> String {
        "?".to_string()
    }
}

#[cfg(feature = "postgres")]
impl BatchBackend for diesel::pg::Pg {
    fn placeholder(index: usize) -> String {
        format!("${index}")
    }
}

/// A multi-row `INSERT ... ON CONFLICT` statement over typed rows.
pub struct BatchInsert<'a, R: BatchRow> {
    rows: &'a [R],
    on_conflict: OnConflict,
}

impl<'a, R: BatchRow> BatchInsert<'a, R> {
    pub fn new(rows: &'a [R], on_conflict: OnConflict) -> Self {
        Self { rows, on_conflict }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of bound parameters the statement will carry.
    pub fn param_count(&self) -> usize {
        self.rows.len() * R::columns().len()
    }

    /// Render the SQL text and the ordered bind values.
    pub fn render(&self, placeholder: fn(usize) -> String) -> (String, Vec<BindValue>) {
        let columns = R::columns();
        let mut binds = Vec::with_capacity(self.param_count());
        let mut tuples = Vec::with_capacity(self.rows.len());

        for row in self.rows {
            let start = binds.len();
            row.push_binds(&mut binds);
            debug_assert_eq!(binds.len() - start, columns.len());

            let values: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(offset, column)| {
                    let param = placeholder(start + offset + 1);
                    match column.expr {
                        Some(expr) => expr.replace("{}", &param),
                        None => param,
                    }
                })
                .collect();
            tuples.push(format!("({})", values.join(", ")));
        }

        let column_list = columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");

        let conflict = match self.on_conflict {
            OnConflict::DoNothing { target } => {
                format!("ON CONFLICT ({}) DO NOTHING", target.join(", "))
            }
            OnConflict::DoUpdate { target, update } => {
                let assignments = update
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "ON CONFLICT ({}) DO UPDATE SET {}",
                    target.join(", "),
                    assignments
                )
            }
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} {}",
            R::TABLE,
            column_list,
            tuples.join(", "),
            conflict
        );
        (sql, binds)
    }

    /// Build an executable query for backend `DB`.
    pub fn into_query<DB>(self) -> BoxedSqlQuery<'static, DB, SqlQuery>
    where
        DB: BatchBackend,
        i64: ToSql<BigInt, DB>,
        i32: ToSql<Integer, DB>,
        String: ToSql<Text, DB>,
        f64: ToSql<Double, DB>,
        bool: ToSql<Bool, DB>,
    {
        let (sql, binds) = self.render(DB::placeholder);
        let mut query = diesel::sql_query(sql).into_boxed::<DB>();
        for value in binds {
            query = match value {
                BindValue::BigInt(v) => query.bind::<BigInt, _>(v),
                BindValue::Integer(v) => query.bind::<Integer, _>(v),
                BindValue::Text(v) => query.bind::<Text, _>(v),
                BindValue::Double(v) => query.bind::<Double, _>(v),
                BindValue::Bool(v) => query.bind::<Bool, _>(v),
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        product_id: i64,
        category: String,
    }

    impl BatchRow for Pair {
        const TABLE: &'static str = "product_categories";

        fn columns() -> &'static [Column] {
            const COLUMNS: &[Column] = &[
                Column::param("product_id"),
                Column::expr(
                    "category_id",
                    "(SELECT id FROM categories WHERE name = {})",
                ),
            ];
            COLUMNS
        }

        fn push_binds(&self, binds: &mut Vec<BindValue>) {
            binds.push(BindValue::BigInt(self.product_id));
            binds.push(BindValue::Text(self.category.clone()));
        }
    }

    fn pairs() -> Vec<Pair> {
        vec![
            Pair {
                product_id: 1,
                category: "Rødvin".to_string(),
            },
            Pair {
                product_id: 2,
                category: "Hvitvin".to_string(),
            },
        ]
    }

    fn numbered(index: usize) -> String {
        format!("${index}")
    }

    #[test]
    fn renders_subquery_columns_with_numbered_placeholders() {
        let rows = pairs();
        let insert = BatchInsert::new(
            &rows,
            OnConflict::DoNothing {
                target: &["product_id", "category_id"],
            },
        );
        let (sql, binds) = insert.render(numbered);

        assert_eq!(
            sql,
            "INSERT INTO product_categories (product_id, category_id) VALUES \
             ($1, (SELECT id FROM categories WHERE name = $2)), \
             ($3, (SELECT id FROM categories WHERE name = $4)) \
             ON CONFLICT (product_id, category_id) DO NOTHING"
        );
        assert_eq!(binds.len(), 4);
        assert_eq!(binds[3], BindValue::Text("Hvitvin".to_string()));
    }

    #[test]
    fn renders_update_assignments() {
        let rows = pairs();
        let insert = BatchInsert::new(
            &rows,
            OnConflict::DoUpdate {
                target: &["product_id"],
                update: &["category_id"],
            },
        );
        let (sql, _) = insert.render(diesel::sqlite::Sqlite::placeholder);
        assert!(sql.ends_with("ON CONFLICT (product_id) DO UPDATE SET category_id = excluded.category_id"));
        assert!(sql.contains("(?, (SELECT id FROM categories WHERE name = ?))"));
    }

    #[test]
    fn counts_params() {
        let rows = pairs();
        let insert = BatchInsert::new(&rows, OnConflict::DoNothing { target: &["product_id"] });
        assert_eq!(insert.param_count(), 4);
        assert!(!insert.is_empty());
        assert_eq!(rows_per_statement::<Pair>(), MAX_BIND_PARAMS / 2);
    }
}
