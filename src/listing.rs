//! Shared paging, sorting and filtering for collection listings.
//!
//! Listing endpoints accept `page`, `limit`, `sortBy` and `sortOrder`, plus
//! per-collection filters that are folded into a [`Filter`]. Sort keys are
//! resolved against a whitelist, so only known column names ever reach SQL.

use chrono::{Datelike, Duration, NaiveDate};
use rocket::FromForm;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::PaginationConfig;
use crate::data::text_enum;
use crate::internal_error::{InternalError, InternalResult};
use crate::validation::Violations;

/// Query string of every listing route. Each collection reads the filters
/// it knows and ignores the rest.
#[derive(FromForm, Debug, Default, Clone)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[field(name = "sortBy")]
    pub sort_by: Option<String>,
    #[field(name = "sortOrder")]
    pub sort_order: Option<String>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub due: Option<String>,
    #[field(name = "type")]
    pub kind: Option<String>,
    pub range: Option<String>,
    #[field(name = "paymentMethod")]
    pub payment_method: Option<String>,
    pub completed: Option<String>,
}

impl ListQuery {
    /// Trimmed `q`, if it has any content.
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|term| !term.is_empty())
    }
}

/// Maps a public sort key onto a column.
pub struct SortKey {
    pub name: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
    pub order_by: String,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn resolve(
        query: &ListQuery,
        config: &PaginationConfig,
        sort_keys: &[SortKey],
        default_sort: &str,
        default_descending: bool,
    ) -> InternalResult<Page> {
        let mut violations = Violations::new();

        let page = query.page.unwrap_or(1);
        if page < 1 {
            violations.push("page", "Page must be a positive integer", Some(JsonValue::from(page)));
        }

        let max_limit = i64::from(config.max_limit.max(1));
        let limit = query
            .limit
            .unwrap_or_else(|| i64::from(config.default_limit).clamp(1, max_limit));
        if limit < 1 || limit > max_limit {
            violations.push(
                "limit",
                format!("Limit must be between 1 and {}", max_limit),
                Some(JsonValue::from(limit)),
            );
        }
        if page >= 1 && limit >= 1 && (page - 1).checked_mul(limit).is_none() {
            violations.push("page", "Page is out of range", Some(JsonValue::from(page)));
        }

        let sort_name = query.sort_by.as_deref().unwrap_or(default_sort);
        let column = sort_keys
            .iter()
            .find(|key| key.name == sort_name)
            .map(|key| key.column);
        if column.is_none() {
            let allowed: Vec<_> = sort_keys.iter().map(|key| key.name).collect();
            violations.push(
                "sortBy",
                format!("sortBy must be one of: {}", allowed.join(", ")),
                Some(JsonValue::from(sort_name)),
            );
        }

        let descending = match query.sort_order.as_deref() {
            None => default_descending,
            Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                violations.push(
                    "sortOrder",
                    "Sort order must be either asc or desc",
                    Some(JsonValue::from(other)),
                );
                false
            }
        };

        violations.finish()?;

        let direction = if descending { "DESC" } else { "ASC" };
        // NULLs last keeps undated records out of the way in both directions.
        let column = column.unwrap_or("id");
        let order_by = format!(
            "{column} IS NULL, {column} {direction}, id {direction}",
            column = column,
            direction = direction
        );

        Ok(Page {
            page,
            limit,
            order_by,
        })
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: &Page, total: i64) -> Pagination {
        Pagination {
            page: page.page,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
        }
    }
}

/// Conjunction of SQL predicates with their bound values.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Filter {
        self.clauses.push(format!("{} = ?", column));
        self.values.push(value.into());
        self
    }

    pub fn clause(&mut self, clause: &str, values: Vec<Value>) -> &mut Filter {
        self.clauses.push(format!("({})", clause));
        self.values.extend(values);
        self
    }

    /// Case-insensitive substring match over any of `columns`.
    pub fn contains(&mut self, columns: &[&str], term: &str) -> &mut Filter {
        let predicates: Vec<_> = columns
            .iter()
            .map(|column| format!("{} LIKE ? ESCAPE '\\'", column))
            .collect();
        self.matches_any(&predicates[..], term)
    }

    /// Any of `predicates`, each binding the escaped `%term%` pattern to its one `?`.
    pub fn matches_any<S: AsRef<str>>(&mut self, predicates: &[S], term: &str) -> &mut Filter {
        let pattern = format!("%{}%", escape_like(term));
        let clause = predicates
            .iter()
            .map(|predicate| predicate.as_ref())
            .collect::<Vec<&str>>()
            .join(" OR ");
        let values = predicates.iter().map(|_| Value::Text(pattern.clone())).collect();
        self.clause(&clause, values)
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Runs one page of `SELECT {columns} FROM {table}` plus the matching count.
pub fn query_page<T>(
    db_connection: &Connection,
    table: &str,
    columns: &str,
    filter: &Filter,
    page: &Page,
    map_row: impl FnMut(&Row) -> rusqlite::Result<T>,
) -> InternalResult<(Vec<T>, i64)> {
    let where_sql = filter.where_sql();

    let total: i64 = db_connection.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", table, where_sql),
        params_from_iter(filter.values()),
        |row| row.get(0),
    )?;

    let mut values = filter.values().to_vec();
    values.push(Value::Integer(page.limit));
    values.push(Value::Integer(page.offset()));

    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
        columns, table, where_sql, page.order_by
    ))?;
    let records = statement
        .query_map(params_from_iter(values), map_row)?
        .collect::<rusqlite::Result<Vec<T>>>()?;

    Ok((records, total))
}

text_enum!(
    /// `range` filter of dated collections.
    Period {
        Today => "today",
        Week => "week",
        Month => "month",
        Quarter => "quarter",
        Year => "year",
    }
);

impl Period {
    /// First day of the period that ends today. A week is the last seven
    /// days; the others are calendar periods.
    pub fn start(&self, today: NaiveDate) -> NaiveDate {
        let first_of = |month: u32| NaiveDate::from_ymd_opt(today.year(), month, 1).unwrap_or(today);
        match self {
            Period::Today => today,
            Period::Week => today - Duration::days(6),
            Period::Month => first_of(today.month()),
            Period::Quarter => first_of((today.month0() / 3) * 3 + 1),
            Period::Year => first_of(1),
        }
    }

    pub fn filter(&self, filter: &mut Filter, column: &str, today: NaiveDate) {
        filter.clause(
            &format!("{column} >= ? AND {column} <= ?", column = column),
            vec![
                Value::Text(self.start(today).to_string()),
                Value::Text(today.to_string()),
            ],
        );
    }
}

/// Parses an optional enum-valued query parameter.
pub fn parse_filter<T>(
    field: &'static str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> InternalResult<Option<T>> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(text) => parse(text).map(Some).ok_or_else(|| {
            InternalError::Validation(vec![crate::validation::FieldError {
                field,
                message: format!("Invalid {} value", field),
                value: Some(JsonValue::from(text)),
            }])
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    const KEYS: &[SortKey] = &[
        SortKey {
            name: "createdAt",
            column: "created_at",
        },
        SortKey {
            name: "title",
            column: "title",
        },
    ];

    fn resolve(query: ListQuery) -> InternalResult<Page> {
        Page::resolve(&query, &PaginationConfig::default(), KEYS, "createdAt", true)
    }

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let page = resolve(ListQuery::default()).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset(), 0);
        assert_eq!(page.order_by, "created_at IS NULL, created_at DESC, id DESC");
    }

    #[test]
    fn explicit_sort_and_page_are_honoured() {
        let page = resolve(ListQuery {
            page: Some(3),
            limit: Some(10),
            sort_by: Some(String::from("title")),
            sort_order: Some(String::from("asc")),
            ..ListQuery::default()
        })
        .unwrap();
        assert_eq!(page.offset(), 20);
        assert_eq!(page.order_by, "title IS NULL, title ASC, id ASC");
    }

    #[test]
    fn invalid_parameters_are_reported_together() {
        let result = resolve(ListQuery {
            page: Some(0),
            limit: Some(500),
            sort_by: Some(String::from("password")),
            sort_order: Some(String::from("sideways")),
            ..ListQuery::default()
        });

        match result {
            Err(InternalError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["page", "limit", "sortBy", "sortOrder"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn page_whose_offset_overflows_is_rejected() {
        let result = resolve(ListQuery {
            page: Some(i64::MAX),
            limit: Some(100),
            ..ListQuery::default()
        });

        match result {
            Err(InternalError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "page");
                assert_eq!(errors[0].value, Some(JsonValue::from(i64::MAX)));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }

        let last = resolve(ListQuery {
            page: Some(i64::MAX),
            limit: Some(1),
            ..ListQuery::default()
        })
        .unwrap();
        assert_eq!(last.offset(), i64::MAX - 1);
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let page = resolve(ListQuery {
            limit: Some(20),
            ..ListQuery::default()
        })
        .unwrap();
        assert_eq!(Pagination::new(&page, 0).pages, 0);
        assert_eq!(Pagination::new(&page, 20).pages, 1);
        assert_eq!(Pagination::new(&page, 21).pages, 2);
    }

    #[test]
    fn filter_builds_where_clause_and_escapes_like() {
        let mut filter = Filter::new();
        filter.eq("status", String::from("pending")).contains(&["title", "description"], "50%_off");

        assert_eq!(
            filter.where_sql(),
            " WHERE status = ? AND (title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')"
        );
        assert_eq!(filter.values()[1], Value::Text(String::from("%50\\%\\_off%")));
        assert_eq!(Filter::new().where_sql(), "");
    }

    #[test]
    fn query_page_counts_all_matches_but_returns_one_page() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, title TEXT, created_at TEXT)")
            .unwrap();
        for n in 0..5 {
            connection
                .execute(
                    "INSERT INTO items (title, created_at) VALUES (?1, ?2)",
                    params![format!("item {}", n), format!("2024-01-0{}", n + 1)],
                )
                .unwrap();
        }

        let page = resolve(ListQuery {
            page: Some(2),
            limit: Some(2),
            ..ListQuery::default()
        })
        .unwrap();
        let (titles, total) = query_page(
            &connection,
            "items",
            "title",
            &Filter::new(),
            &page,
            |row| row.get::<_, String>(0),
        )
        .unwrap();

        assert_eq!(total, 5);
        assert_eq!(titles, vec!["item 2", "item 1"]);
    }

    #[test]
    fn periods_start_on_calendar_boundaries() {
        let today = NaiveDate::from_ymd_opt(2024, 8, 14).unwrap();
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();

        assert_eq!(Period::Today.start(today), today);
        assert_eq!(Period::Week.start(today), day(8, 8));
        assert_eq!(Period::Month.start(today), day(8, 1));
        assert_eq!(Period::Quarter.start(today), day(7, 1));
        assert_eq!(Period::Year.start(today), day(1, 1));
    }

    #[test]
    fn period_filter_bounds_both_ends() {
        let mut filter = Filter::new();
        Period::Month.filter(&mut filter, "date", NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());

        assert_eq!(filter.where_sql(), " WHERE (date >= ? AND date <= ?)");
        assert_eq!(
            filter.values(),
            &[
                Value::Text(String::from("2024-02-01")),
                Value::Text(String::from("2024-02-10"))
            ]
        );
    }

    #[test]
    fn search_term_ignores_blank_queries() {
        let query = |q: &str| ListQuery {
            q: Some(q.to_string()),
            ..ListQuery::default()
        };
        assert_eq!(query("  gym ").search_term(), Some("gym"));
        assert_eq!(query("   ").search_term(), None);
        assert_eq!(ListQuery::default().search_term(), None);
    }

    #[test]
    fn parse_filter_treats_all_as_absent() {
        let parse = |text: &str| if text == "open" { Some(1) } else { None };
        assert_eq!(parse_filter("status", Some("all"), parse).unwrap(), None);
        assert_eq!(parse_filter("status", None, parse).unwrap(), None);
        assert_eq!(parse_filter("status", Some("open"), parse).unwrap(), Some(1));
        assert!(parse_filter("status", Some("closed"), parse).is_err());
    }
}
