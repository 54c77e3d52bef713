//! PostgreSQL data source
//!
//! [`PgSource`] renders the accumulated predicates, ordering and window into a
//! single parameterised `SELECT` built with `sqlx::QueryBuilder`. Values are
//! always bound, never interpolated. Field, column and table names are checked
//! against a plain identifier grammar and double-quoted; anything else is
//! rejected as a validation failure before a statement is sent.
//!
//! Every `SELECT` ends with the table's key column as the last `ORDER BY`
//! term, so pages are stable even when the requested key has duplicates or no
//! ordering was requested.
//!
//! Expansions are handled by [`ExpansionLoader`]s registered per include path.
//! Loaders run after the main query, on the same connection, in the order the
//! evaluator applied the paths.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use super::{DataSource, SourceError, SourceOperation, SourceResult, Window};
use crate::config::DatabaseConfig;
use crate::predicate::{and, FilterCondition, FilterOperator, FilterValue, Predicate};
use crate::specification::{ExpansionPath, OrderBy, OrderDirection};

const DEFAULT_KEY: &str = "id";

/// Loads related rows for one include path
///
/// # Example
///
/// ```rust,ignore
/// struct CategoryImages;
///
/// impl ExpansionLoader<Category> for CategoryImages {
///     fn load<'a>(
///         &'a self,
///         conn: &'a mut PgConnection,
///         items: &'a mut Vec<Category>,
///     ) -> BoxFuture<'a, SourceResult<()>> {
///         Box::pin(async move {
///             let ids: Vec<String> = items.iter().map(|c| c.id.clone()).collect();
///             let images: Vec<Image> =
///                 sqlx::query_as("SELECT * FROM images WHERE category_id = ANY($1)")
///                     .bind(&ids)
///                     .fetch_all(&mut *conn)
///                     .await?;
///             attach(items, images);
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait ExpansionLoader<T>: Send + Sync {
    /// Attach related data to `items`
    fn load<'a>(
        &'a self,
        conn: &'a mut PgConnection,
        items: &'a mut Vec<T>,
    ) -> BoxFuture<'a, SourceResult<()>>;
}

/// Lazy query over one PostgreSQL table
pub struct PgSource<T> {
    pool: PgPool,
    table: String,
    key: String,
    predicates: Vec<Predicate>,
    expansions: Vec<ExpansionPath>,
    order: Option<OrderBy>,
    window: Window,
    loaders: Arc<HashMap<String, Arc<dyn ExpansionLoader<T>>>>,
    consistent_reads: bool,
}

impl<T> PgSource<T> {
    /// Query `table`; the name may be schema-qualified (`catalog.categories`)
    ///
    /// The key column defaults to `id`; see [`with_key`](Self::with_key).
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            key: DEFAULT_KEY.to_string(),
            predicates: Vec::new(),
            expansions: Vec::new(),
            order: None,
            window: Window::default(),
            loaders: Arc::new(HashMap::new()),
            consistent_reads: true,
        }
    }

    /// Unique column used to break ordering ties
    #[must_use]
    pub fn with_key(mut self, column: impl Into<String>) -> Self {
        self.key = column.into();
        self
    }

    /// Register the loader for a dotted include path
    #[must_use]
    pub fn with_loader(mut self, path: &str, loader: impl ExpansionLoader<T> + 'static) -> Self {
        let mut loaders: HashMap<String, Arc<dyn ExpansionLoader<T>>> = self
            .loaders
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        loaders.insert(ExpansionPath::parse(path).to_string(), Arc::new(loader));
        self.loaders = Arc::new(loaders);
        self
    }

    /// Whether `fetch_page` reads count and rows inside one snapshot transaction
    #[must_use]
    pub fn consistent_reads(mut self, enabled: bool) -> Self {
        self.consistent_reads = enabled;
        self
    }

    fn check_expansions(&self) -> SourceResult<()> {
        for path in &self.expansions {
            if !self.loaders.contains_key(&path.to_string()) {
                return Err(SourceError::validation_failed(
                    SourceOperation::Expand,
                    format!("Unknown include path '{}'", path),
                )
                .with_context(path.to_string()));
            }
        }
        Ok(())
    }

    /// The `SELECT` for the current query
    pub fn select_query(&self) -> SourceResult<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new("SELECT * FROM ");
        self.push_body(&mut qb, true)?;
        Ok(qb)
    }

    /// The `COUNT(*)` over the current query, window included
    pub fn count_query(&self) -> SourceResult<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM (SELECT 1 FROM ");
        self.push_body(&mut qb, false)?;
        qb.push(") AS counted");
        Ok(qb)
    }

    fn push_body(
        &self,
        qb: &mut QueryBuilder<'static, Postgres>,
        ordered: bool,
    ) -> SourceResult<()> {
        qb.push(quote_table(&self.table)?);

        if !self.predicates.is_empty() {
            qb.push(" WHERE ");
            push_predicate(qb, &and(self.predicates.iter().cloned()))?;
        }

        if ordered {
            let key = quote_ident(&self.key)?;
            qb.push(" ORDER BY ");
            match &self.order {
                Some(order) => {
                    qb.push(quote_ident(&order.key)?);
                    qb.push(match order.direction {
                        OrderDirection::Ascending => " ASC NULLS FIRST",
                        OrderDirection::Descending => " DESC NULLS LAST",
                    });
                    if order.key != self.key {
                        qb.push(", ");
                        qb.push(key);
                        qb.push(" ASC");
                    }
                }
                None => {
                    qb.push(key);
                    qb.push(" ASC");
                }
            }
        }

        if let Some(limit) = self.window.limit {
            qb.push(" LIMIT ");
            qb.push_bind(to_i64(limit));
        }
        if self.window.offset > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(to_i64(self.window.offset));
        }
        Ok(())
    }
}

impl<T> PgSource<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    async fn count_on(&self, conn: &mut PgConnection) -> SourceResult<u64> {
        let mut qb = self.count_query()?;
        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| SourceError::from(e).with_operation(SourceOperation::Count))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn load_on(&self, conn: &mut PgConnection) -> SourceResult<Vec<T>> {
        let mut qb = self.select_query()?;
        let mut items: Vec<T> = qb
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| SourceError::from(e).with_operation(SourceOperation::Fetch))?;

        for path in &self.expansions {
            if let Some(loader) = self.loaders.get(&path.to_string()) {
                tracing::debug!(table = %self.table, path = %path, "Loading expansion");
                loader
                    .load(&mut *conn, &mut items)
                    .await
                    .map_err(|e| e.with_operation(SourceOperation::Expand))?;
            }
        }
        Ok(items)
    }
}

impl<T> Clone for PgSource<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            table: self.table.clone(),
            key: self.key.clone(),
            predicates: self.predicates.clone(),
            expansions: self.expansions.clone(),
            order: self.order.clone(),
            window: self.window,
            loaders: Arc::clone(&self.loaders),
            consistent_reads: self.consistent_reads,
        }
    }
}

impl<T> fmt::Debug for PgSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSource")
            .field("table", &self.table)
            .field("key", &self.key)
            .field("predicates", &self.predicates)
            .field("expansions", &self.expansions)
            .field("order", &self.order)
            .field("window", &self.window)
            .field("consistent_reads", &self.consistent_reads)
            .finish()
    }
}

impl<T> DataSource<T> for PgSource<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    fn filter(mut self, predicate: Predicate) -> Self {
        if !predicate.is_always() {
            self.predicates.push(predicate);
        }
        self
    }

    fn expand(mut self, path: ExpansionPath) -> Self {
        if !path.is_empty() {
            self.expansions.push(path);
        }
        self
    }

    fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    fn skip(mut self, n: u64) -> Self {
        self.window = self.window.skip(n);
        self
    }

    fn take(mut self, n: u64) -> Self {
        self.window = self.window.take(n);
        self
    }

    fn count(&self) -> impl Future<Output = SourceResult<u64>> + Send {
        let query = self.check_expansions().and_then(|()| self.count_query());
        let pool = self.pool.clone();
        async move {
            let mut qb = query?;
            let total: i64 = qb
                .build_query_scalar()
                .fetch_one(&pool)
                .await
                .map_err(|e| SourceError::from(e).with_operation(SourceOperation::Count))?;
            Ok(u64::try_from(total).unwrap_or(0))
        }
    }

    fn materialize(self) -> impl Future<Output = SourceResult<Vec<T>>> + Send {
        async move {
            self.check_expansions()?;
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| SourceError::from(e).with_operation(SourceOperation::Fetch))?;
            self.load_on(&mut conn).await
        }
    }

    fn fetch_page(
        self,
        skip: u64,
        take: u64,
    ) -> impl Future<Output = SourceResult<(u64, Vec<T>)>> + Send {
        async move {
            self.check_expansions()?;

            if !self.consistent_reads {
                let total = self.count().await?;
                let items = self.skip(skip).take(take).materialize().await?;
                return Ok((total, items));
            }

            let snapshot_error =
                |e: sqlx::Error| SourceError::from(e).with_operation(SourceOperation::Snapshot);

            let mut tx = self.pool.begin().await.map_err(snapshot_error)?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(snapshot_error)?;

            let total = self.count_on(&mut tx).await?;
            let page = self.skip(skip).take(take);
            let items = page.load_on(&mut tx).await?;

            tx.commit().await.map_err(snapshot_error)?;
            Ok((total, items))
        }
    }
}

/// Create a PostgreSQL connection pool from configuration
pub async fn create_pool(config: &DatabaseConfig) -> crate::error::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| {
            tracing::error!(
                url = %sanitize_connection_url(&config.url),
                "Failed to connect to database: {}",
                e
            );
            crate::error::Error::from(
                SourceError::from(e)
                    .with_operation(SourceOperation::Snapshot)
                    .with_context(sanitize_connection_url(&config.url)),
            )
        })?;

    tracing::info!(
        "Database connection pool created: max={}, min={}",
        config.max_connections,
        config.min_connections
    );
    Ok(pool)
}

/// Remove the password from a connection URL for logging
fn sanitize_connection_url(url: &str) -> String {
    if let (Some(scheme_end), Some(at_pos)) = (url.find("://"), url.rfind('@')) {
        let credentials = &url[scheme_end + 3..at_pos];
        if let Some(colon) = credentials.find(':') {
            return format!(
                "{}{}:***{}",
                &url[..scheme_end + 3],
                &credentials[..colon],
                &url[at_pos..]
            );
        }
    }
    url.to_string()
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_ident(name: &str) -> SourceResult<String> {
    if is_identifier(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(SourceError::validation_failed(
            SourceOperation::Translate,
            format!("'{}' is not a valid field name", name),
        )
        .with_context(name.to_string()))
    }
}

fn quote_table(name: &str) -> SourceResult<String> {
    let parts = name
        .split('.')
        .map(quote_ident)
        .collect::<SourceResult<Vec<_>>>()?;
    Ok(parts.join("."))
}

fn push_predicate(
    qb: &mut QueryBuilder<'static, Postgres>,
    predicate: &Predicate,
) -> SourceResult<()> {
    match predicate {
        Predicate::Condition(condition) => push_condition(qb, condition),
        Predicate::NotDeleted { column } => {
            qb.push(quote_ident(column)?);
            qb.push(" = FALSE");
            Ok(())
        }
        Predicate::All(members) if members.is_empty() => {
            qb.push("TRUE");
            Ok(())
        }
        Predicate::All(members) => {
            qb.push("(");
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_predicate(qb, member)?;
            }
            qb.push(")");
            Ok(())
        }
    }
}

fn push_condition(
    qb: &mut QueryBuilder<'static, Postgres>,
    condition: &FilterCondition,
) -> SourceResult<()> {
    qb.push(quote_ident(&condition.field)?);

    let operator = match condition.operator {
        FilterOperator::IsNull => {
            qb.push(" IS NULL");
            return Ok(());
        }
        FilterOperator::IsNotNull => {
            qb.push(" IS NOT NULL");
            return Ok(());
        }
        FilterOperator::Contains => {
            let FilterValue::String(needle) = &condition.value else {
                return Err(type_mismatch(condition));
            };
            qb.push(" ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(needle)));
            return Ok(());
        }
        FilterOperator::In => {
            qb.push(" = ANY(");
            match &condition.value {
                FilterValue::StringList(list) => qb.push_bind(list.clone()),
                FilterValue::IntegerList(list) => qb.push_bind(list.clone()),
                _ => return Err(type_mismatch(condition)),
            };
            qb.push(")");
            return Ok(());
        }
        FilterOperator::Equal => " = ",
        FilterOperator::NotEqual => " <> ",
        FilterOperator::GreaterThan => " > ",
        FilterOperator::GreaterThanOrEqual => " >= ",
        FilterOperator::LessThan => " < ",
        FilterOperator::LessThanOrEqual => " <= ",
        FilterOperator::Like => " LIKE ",
    };

    qb.push(operator);
    match &condition.value {
        FilterValue::String(s) => qb.push_bind(s.clone()),
        FilterValue::Integer(n) => qb.push_bind(*n),
        FilterValue::Float(n) => qb.push_bind(*n),
        FilterValue::Boolean(b) => qb.push_bind(*b),
        FilterValue::Null => qb.push("NULL"),
        FilterValue::StringList(_) | FilterValue::IntegerList(_) => {
            return Err(type_mismatch(condition))
        }
    };
    Ok(())
}

fn type_mismatch(condition: &FilterCondition) -> SourceError {
    SourceError::validation_failed(
        SourceOperation::Translate,
        format!(
            "Operator {} cannot take value {:?}",
            condition.operator, condition.value
        ),
    )
    .with_context(condition.field.clone())
}

/// Escape LIKE metacharacters so `needle` matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
