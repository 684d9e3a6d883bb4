//! Default dialect builder.
//!
//! Renders PostgreSQL/SQLite-flavoured SQL:
//!
//! ```text
//! SELECT COUNT(*) AS "CountValue" FROM "people" WHERE "Age" > @_Age;
//! INSERT INTO "people" ("Name") VALUES (@Name) RETURNING "Id" AS "Result";
//! INSERT INTO "people" ("Name") VALUES (@Name_0) RETURNING "Id" AS "Result", 0 AS "__OrderColumn"; ...
//! INSERT INTO "people" ("Id", "Name") VALUES (@Id, @Name) ON CONFLICT ("Id") DO UPDATE SET "Name" = EXCLUDED."Name";
//! UPDATE "people" SET "Name" = @Name WHERE "Id" = @Id;
//! ```

use crate::config::DbSetting;
use crate::filter::{Comparison, FilterNode, Operator, ParameterNamer};
use crate::schema::{self, SchemaField};

use super::builder::{ORDER_COLUMN, RESULT_COLUMN, StatementBuilder, parameter_name, row_suffix};
use super::error::StatementError;
use super::request::{Aggregate, OperationKind, OperationRequest, Order};

/// ANSI-style builder with `RETURNING`, `ON CONFLICT` and `LIMIT`.
#[derive(Debug, Clone)]
pub struct AnsiStatementBuilder {
    name: String,
    prefix: String,
    opening_quote: String,
    closing_quote: String,
    order_column: bool,
}

impl AnsiStatementBuilder {
    /// Creates a builder using the quoting and parameter prefix of `setting`.
    pub fn new(setting: &DbSetting) -> Self {
        Self::from_parts(
            &setting.parameter_prefix,
            &setting.opening_quote,
            &setting.closing_quote,
            true,
        )
    }

    /// Disables the explicit row-index column on identity-returning batches.
    /// Returned keys are then correlated by position.
    pub fn without_order_column(self) -> Self {
        Self::from_parts(&self.prefix, &self.opening_quote, &self.closing_quote, false)
    }

    fn from_parts(prefix: &str, opening: &str, closing: &str, order_column: bool) -> Self {
        let name = format!(
            "ansi[{prefix}{opening}{closing}{}]",
            if order_column { "+order" } else { "" }
        );
        Self {
            name,
            prefix: prefix.to_string(),
            opening_quote: opening.to_string(),
            closing_quote: closing.to_string(),
            order_column,
        }
    }

    fn quote(&self, identifier: &str) -> String {
        if identifier.starts_with(&self.opening_quote) {
            return identifier.to_string();
        }
        format!("{}{}{}", self.opening_quote, identifier, self.closing_quote)
    }

    /// Quotes each part of a possibly schema-qualified table name.
    fn table(&self, request: &OperationRequest) -> String {
        let mut out = request
            .table
            .split('.')
            .map(|part| self.quote(part))
            .collect::<Vec<_>>()
            .join(".");
        if let Some(hints) = request.hints.as_deref().filter(|h| !h.trim().is_empty()) {
            out.push(' ');
            out.push_str(hints.trim());
        }
        out
    }

    fn param(&self, field: &str, row: Option<usize>) -> String {
        format!("{}{}", self.prefix, parameter_name(field, row))
    }

    fn resolve<'a>(
        &self,
        fields: &'a [SchemaField],
        names: &[String],
    ) -> Result<Vec<&'a SchemaField>, StatementError> {
        names.iter().map(|name| column(fields, name)).collect()
    }

    fn qualifiers<'a>(
        &self,
        request: &OperationRequest,
        fields: &'a [SchemaField],
    ) -> Result<Vec<&'a SchemaField>, StatementError> {
        let names = schema::resolve_qualifiers(&request.qualifiers, fields)
            .ok_or(StatementError::PrimaryKeyRequired)?;
        self.resolve(fields, &names)
    }

    fn where_clause(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        match &request.filter {
            Some(filter) => {
                let mut namer = ParameterNamer::new();
                let text = self.render_filter(filter, fields, &mut namer, false)?;
                Ok(format!(" WHERE {text}"))
            }
            None => Ok(String::new()),
        }
    }

    fn render_filter(
        &self,
        node: &FilterNode,
        fields: &[SchemaField],
        namer: &mut ParameterNamer,
        nested: bool,
    ) -> Result<String, StatementError> {
        match node {
            FilterNode::Comparison(comparison) => {
                self.render_comparison(comparison, fields, namer)
            }
            FilterNode::Group {
                conjunction,
                children,
            } => {
                let parts = children
                    .iter()
                    .map(|child| self.render_filter(child, fields, namer, true))
                    .collect::<Result<Vec<_>, _>>()?;
                let joined = parts.join(&format!(" {} ", conjunction.text()));
                if nested && parts.len() > 1 {
                    Ok(format!("({joined})"))
                } else {
                    Ok(joined)
                }
            }
        }
    }

    fn render_comparison(
        &self,
        comparison: &Comparison,
        fields: &[SchemaField],
        namer: &mut ParameterNamer,
    ) -> Result<String, StatementError> {
        let field = column(fields, comparison.field())?;
        let names = namer.names(comparison);
        let mut left = self.quote(&field.name);
        if comparison.ignore_case() {
            left = format!("LOWER({left})");
        }
        let right = |name: &String| {
            let param = format!("{}{}", self.prefix, name);
            if comparison.ignore_case() {
                format!("LOWER({param})")
            } else {
                param
            }
        };

        let operator = comparison.operator();
        let text = if comparison.is_null_check() {
            match operator {
                Operator::NotEqual => format!("{left} IS NOT NULL"),
                _ => format!("{left} IS NULL"),
            }
        } else if operator.is_list() {
            let list = names.iter().map(right).collect::<Vec<_>>().join(", ");
            format!("{left} {operator} ({list})")
        } else if operator.is_range() {
            let bounds: Vec<String> = names.iter().map(right).collect();
            format!("{left} {operator} {} AND {}", bounds[0], bounds[1])
        } else {
            let value: Vec<String> = names.iter().map(right).collect();
            format!("{left} {operator} {}", value.join(""))
        };
        Ok(text)
    }

    fn returning(&self, identity: Option<&SchemaField>, batch_size: usize, row: usize) -> String {
        match identity {
            Some(identity) => {
                let mut out = format!(
                    " RETURNING {} AS {}",
                    self.quote(&identity.name),
                    self.quote(RESULT_COLUMN)
                );
                if batch_size > 1 && self.order_column {
                    out.push_str(&format!(", {row} AS {}", self.quote(ORDER_COLUMN)));
                }
                out
            }
            None => String::new(),
        }
    }

    fn insert_columns<'a>(
        &self,
        request: &OperationRequest,
        fields: &'a [SchemaField],
    ) -> Result<Vec<&'a SchemaField>, StatementError> {
        Ok(self
            .resolve(fields, &request.fields)?
            .into_iter()
            .filter(|f| f.is_insertable())
            .collect())
    }

    /// Written columns of an upsert, qualifiers last, and the qualifiers.
    fn merge_columns<'a>(
        &self,
        request: &OperationRequest,
        fields: &'a [SchemaField],
    ) -> Result<(Vec<&'a SchemaField>, Vec<&'a SchemaField>), StatementError> {
        let qualifiers = self.qualifiers(request, fields)?;
        let mut columns: Vec<&SchemaField> = self
            .resolve(fields, &request.fields)?
            .into_iter()
            .filter(|f| !f.is_generated && (!f.is_identity || contains(&qualifiers, f)))
            .collect();
        for &qualifier in &qualifiers {
            if !contains(&columns, qualifier) {
                columns.push(qualifier);
            }
        }
        Ok((columns, qualifiers))
    }

    /// `SET` columns of a filtered update.
    fn filtered_update_set<'a>(
        &self,
        request: &OperationRequest,
        fields: &'a [SchemaField],
    ) -> Result<Vec<&'a SchemaField>, StatementError> {
        let set: Vec<&SchemaField> = self
            .resolve(fields, &request.fields)?
            .into_iter()
            .filter(|f| f.is_updatable())
            .collect();
        if set.is_empty() {
            return Err(StatementError::NoWritableFields { kind: request.kind });
        }
        Ok(set)
    }

    /// `SET` columns and qualifiers of an update by key.
    fn keyed_update_columns<'a>(
        &self,
        request: &OperationRequest,
        fields: &'a [SchemaField],
    ) -> Result<(Vec<&'a SchemaField>, Vec<&'a SchemaField>), StatementError> {
        let qualifiers = self.qualifiers(request, fields)?;
        let set: Vec<&SchemaField> = self
            .resolve(fields, &request.fields)?
            .into_iter()
            .filter(|f| !f.is_identity && !f.is_generated && !contains(&qualifiers, f))
            .collect();
        if set.is_empty() {
            return Err(StatementError::NoWritableFields { kind: request.kind });
        }
        Ok((set, qualifiers))
    }

    fn values(&self, columns: &[&SchemaField], row: Option<usize>) -> String {
        columns
            .iter()
            .map(|c| self.param(&c.name, row))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_list(&self, columns: &[&SchemaField]) -> String {
        columns
            .iter()
            .map(|c| self.quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Finds `name` among `fields` or reports it as unqualified.
fn column<'a>(fields: &'a [SchemaField], name: &str) -> Result<&'a SchemaField, StatementError> {
    schema::find(fields, name).ok_or_else(|| StatementError::UnqualifiedField {
        field: name.to_string(),
    })
}

fn contains(columns: &[&SchemaField], field: &SchemaField) -> bool {
    columns.iter().any(|c| c.is_named(&field.name))
}

/// Joins one statement per row.
fn join_rows(rows: Vec<String>) -> String {
    let mut text = rows.join("; ");
    text.push(';');
    text
}

impl StatementBuilder for AnsiStatementBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_query(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        let columns = if request.fields.is_empty() {
            let mut all: Vec<&SchemaField> = fields.iter().collect();
            all.sort_by_key(|f| f.ordinal);
            all
        } else {
            self.resolve(fields, &request.fields)?
        };

        let mut text = format!(
            "SELECT {} FROM {}",
            self.column_list(&columns),
            self.table(request)
        );
        text.push_str(&self.where_clause(request, fields)?);

        if !request.order_by.is_empty() {
            let terms = request
                .order_by
                .iter()
                .map(|o| {
                    let field = column(fields, &o.name)?;
                    let direction = match o.order {
                        Order::Ascending => "ASC",
                        Order::Descending => "DESC",
                    };
                    Ok(format!("{} {direction}", self.quote(&field.name)))
                })
                .collect::<Result<Vec<_>, StatementError>>()?;
            text.push_str(" ORDER BY ");
            text.push_str(&terms.join(", "));
        }
        if let Some(top) = request.top {
            text.push_str(&format!(" LIMIT {top}"));
        }
        text.push(';');
        Ok(text)
    }

    fn build_aggregate(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        let aggregate = request
            .kind
            .aggregate()
            .ok_or_else(|| StatementError::Unsupported {
                kind: request.kind,
                builder: self.name.clone(),
            })?;
        let argument = match aggregate {
            Aggregate::Count => "*".to_string(),
            _ => match request.fields.as_slice() {
                [field] => self.quote(&column(fields, field)?.name),
                _ => return Err(StatementError::AggregateField { kind: request.kind }),
            },
        };
        Ok(format!(
            "SELECT {}({argument}) AS {} FROM {}{};",
            aggregate.function(),
            self.quote(aggregate.alias()),
            self.table(request),
            self.where_clause(request, fields)?
        ))
    }

    fn build_exists(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        Ok(format!(
            "SELECT 1 AS {} FROM {}{} LIMIT 1;",
            self.quote("ExistsValue"),
            self.table(request),
            self.where_clause(request, fields)?
        ))
    }

    fn build_insert(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        let columns = self.insert_columns(request, fields)?;
        let identity = schema::identity(fields);
        let table = self.table(request);

        let rows = (0..request.batch_size)
            .map(|i| {
                let row = row_suffix(request.batch_size, i);
                let body = if columns.is_empty() {
                    format!("INSERT INTO {table} DEFAULT VALUES")
                } else {
                    format!(
                        "INSERT INTO {table} ({}) VALUES ({})",
                        self.column_list(&columns),
                        self.values(&columns, row)
                    )
                };
                format!("{body}{}", self.returning(identity, request.batch_size, i))
            })
            .collect();
        Ok(join_rows(rows))
    }

    fn build_merge(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        let (columns, qualifiers) = self.merge_columns(request, fields)?;
        let updates: Vec<&SchemaField> = columns
            .iter()
            .copied()
            .filter(|f| !f.is_identity && !contains(&qualifiers, f))
            .collect();
        let identity = schema::identity(fields);
        let table = self.table(request);

        let conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let set = updates
                .iter()
                .map(|f| {
                    let name = self.quote(&f.name);
                    format!("{name} = EXCLUDED.{name}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET {set}")
        };

        let rows = (0..request.batch_size)
            .map(|i| {
                let row = row_suffix(request.batch_size, i);
                format!(
                    "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT ({}) {conflict}{}",
                    self.column_list(&columns),
                    self.values(&columns, row),
                    self.column_list(&qualifiers),
                    self.returning(identity, request.batch_size, i)
                )
            })
            .collect();
        Ok(join_rows(rows))
    }

    fn build_update(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        let table = self.table(request);

        if request.filter.is_some() {
            let set = self.filtered_update_set(request, fields)?;
            let assignments = set
                .iter()
                .map(|f| format!("{} = {}", self.quote(&f.name), self.param(&f.name, None)))
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(format!(
                "UPDATE {table} SET {assignments}{};",
                self.where_clause(request, fields)?
            ));
        }

        let (set, qualifiers) = self.keyed_update_columns(request, fields)?;

        let rows = (0..request.batch_size)
            .map(|i| {
                let row = row_suffix(request.batch_size, i);
                let assignments = set
                    .iter()
                    .map(|f| format!("{} = {}", self.quote(&f.name), self.param(&f.name, row)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let conditions = qualifiers
                    .iter()
                    .map(|q| format!("{} = {}", self.quote(&q.name), self.param(&q.name, row)))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                format!("UPDATE {table} SET {assignments} WHERE {conditions}")
            })
            .collect();
        Ok(join_rows(rows))
    }

    fn bound_columns(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<Vec<String>, StatementError> {
        let columns = match request.kind {
            OperationKind::Insert | OperationKind::InsertAll => {
                self.insert_columns(request, fields)?
            }
            OperationKind::Merge | OperationKind::MergeAll => self.merge_columns(request, fields)?.0,
            OperationKind::Update | OperationKind::UpdateAll if request.filter.is_some() => {
                self.filtered_update_set(request, fields)?
            }
            OperationKind::Update | OperationKind::UpdateAll => {
                let (set, qualifiers) = self.keyed_update_columns(request, fields)?;
                set.into_iter().chain(qualifiers).collect()
            }
            _ => Vec::new(),
        };
        Ok(columns.into_iter().map(|c| c.name.clone()).collect())
    }

    fn build_delete(
        &self,
        request: &OperationRequest,
        fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        Ok(format!(
            "DELETE FROM {}{};",
            self.table(request),
            self.where_clause(request, fields)?
        ))
    }

    fn build_truncate(
        &self,
        request: &OperationRequest,
        _fields: &[SchemaField],
    ) -> Result<String, StatementError> {
        Ok(format!("TRUNCATE TABLE {};", self.table(request)))
    }
}
