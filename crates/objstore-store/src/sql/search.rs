//! Search query builder.
//!
//! Pages are ordered by OID. One row more than the page size is fetched; if
//! it comes back, its OID is the next page token and the following page
//! starts at (and includes) that OID.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::{decode_error, parse_oid};
use crate::error::{StoreError, StoreResult};
use crate::model::{ObjectSearchRequest, ObjectSearchResponse, ObjectSearchResult};
use crate::validate::SearchPlan;

/// A SELECT statement under construction with positional parameters.
#[derive(Debug, Default)]
struct SelectQuery {
    columns: Vec<&'static str>,
    table: &'static str,
    conditions: Vec<String>,
    args: Vec<Value>,
    order_by: &'static str,
    limit: usize,
}

impl SelectQuery {
    fn add_where(&mut self, condition: &str, arg: Value) {
        self.args.push(arg);
        self.conditions
            .push(condition.replace('?', &format!("?{}", self.args.len())));
    }

    fn add_where_in(&mut self, column: &str, values: &[String]) {
        let mut placeholders = Vec::with_capacity(values.len());
        for value in values {
            self.args.push(Value::Text(value.clone()));
            placeholders.push(format!("?{}", self.args.len()));
        }
        self.conditions
            .push(format!("{column} IN ({})", placeholders.join(", ")));
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(self.order_by);
        }
        if self.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }
        sql
    }
}

const BASE_COLUMNS: [&str; 10] = [
    "oid",
    "version",
    "name",
    "description",
    "slug",
    "folder",
    "size",
    "updated_at",
    "updated_by",
    "errors",
];

fn build(tenant_id: i64, req: &ObjectSearchRequest, plan: &SearchPlan) -> SelectQuery {
    let mut query = SelectQuery {
        columns: BASE_COLUMNS.to_vec(),
        table: "object",
        order_by: "oid ASC",
        limit: plan.limit + 1,
        ..Default::default()
    };
    if req.with_body {
        query.columns.push("body");
    }
    if req.with_labels {
        query.columns.push("labels");
    }
    if req.with_fields {
        query.columns.push("fields");
    }

    query.add_where("tenant_id = ?", Value::Integer(tenant_id));
    if !plan.kinds.is_empty() {
        query.add_where_in("kind", &plan.kinds);
    }
    if let Some(folder) = &req.folder {
        query.add_where("folder = ?", Value::Text(folder.clone()));
    }
    if let Some(start) = &plan.start_oid {
        query.add_where("oid >= ?", Value::Text(start.clone()));
    }
    query
}

/// Raw result row before JSON columns are decoded.
struct SearchRow {
    oid: String,
    result: ObjectSearchResult,
    errors: Option<String>,
    labels: Option<String>,
    fields: Option<String>,
}

pub(super) fn run(
    conn: &Connection,
    tenant_id: i64,
    req: &ObjectSearchRequest,
    plan: &SearchPlan,
) -> StoreResult<ObjectSearchResponse> {
    let query = build(tenant_id, req, plan);
    let mut stmt = conn.prepare(&query.to_sql())?;

    let rows = stmt.query_map(params_from_iter(query.args.iter()), |row| {
        let mut idx = BASE_COLUMNS.len();
        let mut next = || {
            let i = idx;
            idx += 1;
            i
        };
        let body = if req.with_body { Some(row.get::<_, Vec<u8>>(next())?) } else { None };
        let labels = if req.with_labels { Some(row.get::<_, String>(next())?) } else { None };
        let fields = if req.with_fields { Some(row.get::<_, String>(next())?) } else { None };
        Ok(SearchRow {
            oid: row.get(0)?,
            result: ObjectSearchResult {
                version: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                slug: row.get(4)?,
                folder: row.get(5)?,
                size: row.get(6)?,
                updated_at: row.get(7)?,
                updated_by: row.get(8)?,
                body,
                ..Default::default()
            },
            errors: row.get(9)?,
            labels,
            fields,
        })
    })?;

    let mut results = Vec::with_capacity(plan.limit);
    let mut next_page_token = None;
    for row in rows {
        let row = row?;
        if results.len() == plan.limit {
            next_page_token = Some(row.oid);
            break;
        }
        results.push(decode(row)?);
    }

    Ok(ObjectSearchResponse {
        results,
        next_page_token,
    })
}

fn decode(row: SearchRow) -> StoreResult<ObjectSearchResult> {
    let corrupt = |e: serde_json::Error| StoreError::Corrupt {
        oid: row.oid.clone(),
        reason: e.to_string(),
    };
    let mut result = row.result;
    result.grn = parse_oid(&row.oid)?;
    result.error = decode_error(&row.oid, row.errors.as_deref())?;
    result.labels = row
        .labels
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(corrupt)?;
    result.fields = row
        .fields
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(corrupt)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(kinds: &[&str], start: Option<&str>) -> SearchPlan {
        SearchPlan {
            limit: 10,
            start_oid: start.map(str::to_string),
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn minimal_query_is_tenant_scoped() {
        let q = build(1, &ObjectSearchRequest::default(), &plan(&[], None));
        assert_eq!(
            q.to_sql(),
            "SELECT oid, version, name, description, slug, folder, size, updated_at, updated_by, errors \
             FROM object WHERE tenant_id = ?1 ORDER BY oid ASC LIMIT 11"
        );
        assert_eq!(q.args, vec![Value::Integer(1)]);
    }

    #[test]
    fn filters_number_parameters_in_order() {
        let req = ObjectSearchRequest {
            folder: Some("team".into()),
            with_labels: true,
            ..Default::default()
        };
        let q = build(3, &req, &plan(&["dashboard", "folder"], Some("3/dashboard/b")));
        let sql = q.to_sql();
        assert!(sql.contains("kind IN (?2, ?3)"));
        assert!(sql.contains("folder = ?4"));
        assert!(sql.contains("oid >= ?5"));
        assert!(sql.starts_with("SELECT oid, version, name, description, slug, folder, size, updated_at, updated_by, errors, labels "));
        assert_eq!(q.args.len(), 5);
    }
}
