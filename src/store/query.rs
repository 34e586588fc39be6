//! Filtered, paginated list queries
//!
//! `ListQuery` composes a namespace-scoped `SELECT` from optional filters
//! and appends stable ordering plus `LIMIT`/`OFFSET`. Every value is bound,
//! never interpolated.

use sqlx::{QueryBuilder, Sqlite};

/// A validated window into an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of rows to return
    pub limit: u32,
    /// Number of leading rows to skip
    pub offset: u64,
}

/// Builder for a filtered list query
pub struct ListQuery<'args> {
    builder: QueryBuilder<'args, Sqlite>,
    has_where: bool,
}

impl<'args> ListQuery<'args> {
    /// Start a query from its `SELECT ... FROM ...` head
    pub fn new(select: &str) -> Self {
        Self {
            builder: QueryBuilder::new(select),
            has_where: false,
        }
    }

    /// Open a new predicate, joined to earlier ones with `AND`
    fn condition(&mut self) -> &mut QueryBuilder<'args, Sqlite> {
        self.builder
            .push(if self.has_where { " AND " } else { " WHERE " });
        self.has_where = true;
        &mut self.builder
    }

    /// `column = value`, skipped when `value` is `None`
    pub fn filter_eq(&mut self, column: &str, value: Option<String>) -> &mut Self {
        if let Some(value) = value {
            self.condition().push(column).push(" = ").push_bind(value);
        }
        self
    }

    /// `column IN (values...)`, skipped when `values` is empty
    pub fn filter_in(&mut self, column: &str, values: &[String]) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        let builder = self.condition();
        builder.push(column).push(" IN (");
        let mut bound = builder.separated(", ");
        for value in values {
            bound.push_bind(value.clone());
        }
        builder.push(")");
        self
    }

    /// ASCII case-insensitive substring match against any of `columns`
    ///
    /// A missing or empty needle matches everything.
    pub fn filter_contains_any(&mut self, columns: &[&str], needle: Option<&str>) -> &mut Self {
        let Some(needle) = needle.filter(|n| !n.is_empty()) else {
            return self;
        };
        let needle = needle.to_ascii_lowercase();

        let builder = self.condition();
        builder.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push("instr(lower(")
                .push(column)
                .push("), ")
                .push_bind(needle.clone())
                .push(") > 0");
        }
        builder.push(")");
        self
    }

    /// `column IN (<subquery> ?)`, where the subquery ends in a comparison
    /// against the bound value; skipped when `value` is `None`
    pub fn filter_in_subquery(
        &mut self,
        column: &str,
        subquery: &str,
        value: Option<String>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.condition()
                .push(column)
                .push(" IN (")
                .push(subquery)
                .push_bind(value)
                .push(")");
        }
        self
    }

    /// A fixed predicate with no bound values
    pub fn filter_raw(&mut self, predicate: &str) -> &mut Self {
        self.condition().push(predicate);
        self
    }

    /// Append ordering and the page window
    pub fn paginate(&mut self, order_by: &str, page: Page) -> &mut Self {
        self.builder
            .push(" ORDER BY ")
            .push(order_by)
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            // SQLite takes a signed 64-bit offset; anything larger is past the end anyway
            .push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));
        self
    }

    #[cfg(test)]
    fn sql(&self) -> &str {
        self.builder.sql()
    }

    /// Access the underlying builder to execute the query
    pub fn builder(&mut self) -> &mut QueryBuilder<'args, Sqlite> {
        &mut self.builder
    }
}
