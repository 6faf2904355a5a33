//! Listing query construction.
//!
//! A [`QueryBuilder`] holds a list of predicates that are joined with `AND`.
//! The same list renders both the `COUNT(*)` statement and the paginated
//! fetch statement, so the reported total always describes the same row set
//! the pages are cut from.

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// A bind parameter for a rendered statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

/// Optional constraints for one listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub category: Option<String>,
    pub search_term: Option<String>,
    pub status: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            category: None,
            search_term: None,
            status: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl FilterSpec {
    /// Normalizes raw request values. Blank strings become "no filter",
    /// a missing or non-positive limit becomes the default, and negative
    /// offsets are clamped to zero.
    pub fn from_params(
        category: Option<String>,
        search_term: Option<String>,
        status: Option<String>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Self {
        Self {
            category: non_blank(category),
            search_term: non_blank(search_term),
            status: non_blank(status),
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(DEFAULT_LIMIT)
                .min(MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Escapes LIKE metacharacters so the term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Shape of a table the listing endpoints page over.
#[derive(Debug, Clone, Copy)]
pub struct ListingTable {
    pub name: &'static str,
    pub columns: &'static str,
    pub category_column: &'static str,
    pub search_columns: &'static [&'static str],
    /// Tables without a status column ignore `FilterSpec::status`.
    pub status_column: Option<&'static str>,
    /// Must be a total order, otherwise pages can overlap.
    pub order_by: &'static str,
}

pub const BUSINESSES: ListingTable = ListingTable {
    name: "businesses",
    columns: "id, business_name, category, location, contact_name, tel, email, website, \
              description, image_url, featured, created_at",
    category_column: "category",
    search_columns: &["business_name", "description"],
    status_column: None,
    order_by: "business_name ASC, id ASC",
};

pub const APPLICATIONS: ListingTable = ListingTable {
    name: "business_applications",
    columns: "id, business_name, location, category, contact_name, tel, email, website, \
              description, image_url, status, application_type, business_id, submitted_at",
    category_column: "category",
    search_columns: &["business_name", "description"],
    status_column: Some("status"),
    order_by: "submitted_at DESC, id DESC",
};

/// One `AND` term. Placeholders are written as `?` and numbered on render.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    clause: String,
    params: Vec<SqlParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub count: BuiltQuery,
    pub fetch: BuiltQuery,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: ListingTable,
    predicates: Vec<Predicate>,
}

impl QueryBuilder {
    pub fn new(table: ListingTable) -> Self {
        Self {
            table,
            predicates: Vec::new(),
        }
    }

    /// Adds a raw predicate. Each `?` in `clause` consumes one entry of `params`.
    pub fn and_where(mut self, clause: impl Into<String>, params: Vec<SqlParam>) -> Self {
        let clause = clause.into();
        debug_assert_eq!(clause.matches('?').count(), params.len());
        self.predicates.push(Predicate { clause, params });
        self
    }

    pub fn category(self, category: Option<&str>) -> Self {
        match category {
            Some(category) => {
                let clause = format!("{} = ?", self.table.category_column);
                self.and_where(clause, vec![SqlParam::Text(category.to_string())])
            }
            None => self,
        }
    }

    pub fn search(self, term: Option<&str>) -> Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        if self.table.search_columns.is_empty() {
            return self;
        }

        let pattern = format!("%{}%", escape_like(term));
        let tests: Vec<String> = self
            .table
            .search_columns
            .iter()
            .map(|column| format!("{column} ILIKE ?"))
            .collect();
        let params = vec![SqlParam::Text(pattern); tests.len()];
        let clause = format!("({})", tests.join(" OR "));
        self.and_where(clause, params)
    }

    pub fn status(self, status: Option<&str>) -> Self {
        match (self.table.status_column, status) {
            (Some(column), Some(status)) => {
                let clause = format!("{column} = ?");
                self.and_where(clause, vec![SqlParam::Text(status.to_string())])
            }
            _ => self,
        }
    }

    pub fn filter(self, spec: &FilterSpec) -> Self {
        self.category(spec.category.as_deref())
            .search(spec.search_term.as_deref())
            .status(spec.status.as_deref())
    }

    /// Renders the shared `WHERE` clause with placeholders starting at `$1`.
    fn render_where(&self) -> (String, Vec<SqlParam>) {
        if self.predicates.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut params = Vec::new();
        let mut next_index = 1;
        let mut rendered = Vec::with_capacity(self.predicates.len());

        for predicate in &self.predicates {
            let mut clause = String::with_capacity(predicate.clause.len() + 4);
            for ch in predicate.clause.chars() {
                if ch == '?' {
                    clause.push_str(&format!("${next_index}"));
                    next_index += 1;
                } else {
                    clause.push(ch);
                }
            }
            rendered.push(clause);
            params.extend(predicate.params.iter().cloned());
        }

        (format!(" WHERE {}", rendered.join(" AND ")), params)
    }

    pub fn build_count(&self) -> BuiltQuery {
        let (where_clause, params) = self.render_where();
        BuiltQuery {
            sql: format!("SELECT COUNT(*) FROM {}{}", self.table.name, where_clause),
            params,
        }
    }

    pub fn build_fetch(&self, limit: i64, offset: i64) -> BuiltQuery {
        let (where_clause, mut params) = self.render_where();
        let limit_index = params.len() + 1;
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ${} OFFSET ${}",
            self.table.columns,
            self.table.name,
            where_clause,
            self.table.order_by,
            limit_index,
            limit_index + 1,
        );
        params.push(SqlParam::Int(limit));
        params.push(SqlParam::Int(offset));
        BuiltQuery { sql, params }
    }

    pub fn build(&self, limit: i64, offset: i64) -> ListingQuery {
        ListingQuery {
            count: self.build_count(),
            fetch: self.build_fetch(limit, offset),
        }
    }
}

/// Builds the count/fetch pair for `spec` against `table`.
pub fn listing_query(table: ListingTable, spec: &FilterSpec) -> ListingQuery {
    QueryBuilder::new(table)
        .filter(spec)
        .build(spec.limit, spec.offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> SqlParam {
        SqlParam::Text(value.to_string())
    }

    #[test]
    fn unfiltered_listing_has_no_where_clause() {
        let query = listing_query(BUSINESSES, &FilterSpec::default());

        assert_eq!(query.count.sql, "SELECT COUNT(*) FROM businesses");
        assert!(query.count.params.is_empty());
        assert!(query
            .fetch
            .sql
            .ends_with("FROM businesses ORDER BY business_name ASC, id ASC LIMIT $1 OFFSET $2"));
        assert_eq!(query.fetch.params, vec![SqlParam::Int(20), SqlParam::Int(0)]);
    }

    #[test]
    fn category_and_search_compose_with_and() {
        let spec = FilterSpec::from_params(
            Some("Retail & Shopping".into()),
            Some("bakery".into()),
            None,
            Some(2),
            Some(0),
        );
        let query = listing_query(BUSINESSES, &spec);

        assert_eq!(
            query.count.sql,
            "SELECT COUNT(*) FROM businesses WHERE category = $1 AND \
             (business_name ILIKE $2 OR description ILIKE $3)"
        );
        assert_eq!(
            query.count.params,
            vec![text("Retail & Shopping"), text("%bakery%"), text("%bakery%")]
        );
        assert!(query.fetch.sql.contains(
            "WHERE category = $1 AND (business_name ILIKE $2 OR description ILIKE $3) \
             ORDER BY business_name ASC, id ASC LIMIT $4 OFFSET $5"
        ));
        assert_eq!(&query.fetch.params[..3], &query.count.params[..]);
        assert_eq!(&query.fetch.params[3..], &[SqlParam::Int(2), SqlParam::Int(0)]);
    }

    #[test]
    fn count_and_fetch_share_the_predicate_for_every_window() {
        let spec = FilterSpec::from_params(
            Some("Food & Dining".into()),
            Some("cafe".into()),
            None,
            Some(10),
            None,
        );
        let builder = QueryBuilder::new(BUSINESSES).filter(&spec);
        let count = builder.build_count();
        let where_clause = count.sql.trim_start_matches("SELECT COUNT(*) FROM businesses");

        for page in 0..5 {
            let fetch = builder.build_fetch(10, page * 10);
            assert!(fetch.sql.contains(where_clause));
            assert_eq!(&fetch.params[..count.params.len()], &count.params[..]);
            assert_eq!(
                &fetch.params[count.params.len()..],
                &[SqlParam::Int(10), SqlParam::Int(page * 10)]
            );
        }
    }

    #[test]
    fn blank_search_term_is_the_same_as_no_search() {
        let blank = FilterSpec::from_params(None, Some("   ".into()), None, None, None);
        let omitted = FilterSpec::from_params(None, None, None, None, None);

        assert_eq!(blank, omitted);
        assert_eq!(
            listing_query(BUSINESSES, &blank),
            listing_query(BUSINESSES, &omitted)
        );

        let direct = QueryBuilder::new(BUSINESSES).search(Some("")).build_count();
        assert_eq!(direct.sql, "SELECT COUNT(*) FROM businesses");
    }

    #[test]
    fn predicate_order_does_not_change_the_parameter_set() {
        let a = QueryBuilder::new(APPLICATIONS)
            .status(Some("pending"))
            .category(Some("Legal Services"))
            .build_count();
        let b = QueryBuilder::new(APPLICATIONS)
            .category(Some("Legal Services"))
            .status(Some("pending"))
            .build_count();

        let mut a_params = a.params.clone();
        let mut b_params = b.params.clone();
        a_params.sort_by_key(|p| format!("{p:?}"));
        b_params.sort_by_key(|p| format!("{p:?}"));
        assert_eq!(a_params, b_params);
        assert!(a.sql.contains("status = $1 AND category = $2"));
        assert!(b.sql.contains("category = $1 AND status = $2"));
    }

    #[test]
    fn status_is_ignored_for_tables_without_a_status_column() {
        let spec = FilterSpec::from_params(None, None, Some("pending".into()), None, None);

        let businesses = listing_query(BUSINESSES, &spec);
        assert_eq!(businesses.count.sql, "SELECT COUNT(*) FROM businesses");

        let applications = listing_query(APPLICATIONS, &spec);
        assert_eq!(
            applications.count.sql,
            "SELECT COUNT(*) FROM business_applications WHERE status = $1"
        );
        assert!(applications
            .fetch
            .sql
            .contains("ORDER BY submitted_at DESC, id DESC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn window_values_are_normalized() {
        let spec = FilterSpec::from_params(None, None, None, Some(0), Some(-5));
        assert_eq!(spec.limit, DEFAULT_LIMIT);
        assert_eq!(spec.offset, 0);

        let spec = FilterSpec::from_params(None, None, None, Some(5_000), Some(40));
        assert_eq!(spec.limit, MAX_LIMIT);
        assert_eq!(spec.offset, 40);
    }

    #[test]
    fn search_term_is_trimmed_and_like_escaped() {
        let query = QueryBuilder::new(BUSINESSES)
            .search(Some("  100%_off\\ "))
            .build_count();
        assert_eq!(
            query.params,
            vec![text("%100\\%\\_off\\\\%"), text("%100\\%\\_off\\\\%")]
        );
    }
}
