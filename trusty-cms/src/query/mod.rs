//! Generic list engine
//!
//! A list request flows through four steps:
//!
//! 1. [`QueryParams`] decodes the query string into a parameter tree
//! 2. [`ListQuery::compile`] builds the filter, sort, projection and page
//! 3. [`execute`] fetches the page and the filtered total concurrently
//! 4. [`paginate`] derives the next/prev links from the total
//!
//! Each resource describes its listing with [`ListRules`]:
//!
//! ```rust
//! use trusty_cms::query::{AdHocFilter, ListQuery, ListRules, QueryParams};
//!
//! const CONTACTS: ListRules = ListRules {
//!     default_sort: "-createdAt",
//!     ad_hoc: &[AdHocFilter::Exact { param: "status", field: "status" }],
//! };
//!
//! let params = QueryParams::parse("status=unread&page=2").unwrap();
//! let query = ListQuery::compile(&params, &CONTACTS, 10).unwrap();
//! assert_eq!(query.page.page, 2);
//! assert_eq!(query.sort.to_string(), "-createdAt");
//! ```

mod compiler;
mod executor;
mod pagination;
mod params;

pub use compiler::{compile, compile_with, AdHocFilter, RESERVED_KEYS};
pub use executor::{enrich, execute, Enrichment, QueryOutcome};
pub use pagination::{paginate, PageLink, PageSpec, PaginationResult};
pub use params::QueryParams;

use crate::repository::{
    Document, DocumentStore, FilterDescriptor, FilterError, FindOptions, Projection,
    ProjectionError, RelationLoader, RepositoryResult, SortSpec,
};

/// Reasons a list request's query string is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Query string could not be decoded
    #[error("Malformed query string: {0}")]
    Malformed(String),

    /// Same parameter used as both a value and a nested map
    #[error("Conflicting values for query parameter '{0}'")]
    Conflict(String),

    /// Bracket nesting deeper than supported
    #[error("Query parameter '{0}' is nested too deeply")]
    TooDeep(String),

    /// Filter could not be compiled
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// `select` could not be parsed
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// How a resource's list endpoint behaves
#[derive(Debug, Clone, Copy)]
pub struct ListRules {
    /// Sort used when `sort` is absent, e.g. `-createdAt`
    pub default_sort: &'static str,
    /// Resource-specific filter parameters
    pub ad_hoc: &'static [AdHocFilter],
}

/// Everything needed to run one list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Compiled filter
    pub filter: FilterDescriptor,
    /// Sort order
    pub sort: SortSpec,
    /// Returned fields
    pub projection: Projection,
    /// Requested page
    pub page: PageSpec,
}

impl ListQuery {
    /// Compiles query parameters under a resource's rules
    pub fn compile(params: &QueryParams, rules: &ListRules, default_limit: u64) -> Result<Self, QueryError> {
        let filter = compile_with(params, rules.ad_hoc)?;

        let sort = params
            .text("sort")
            .map(|raw| SortSpec::parse(&raw))
            .filter(|sort| !sort.is_empty())
            .unwrap_or_else(|| SortSpec::parse(rules.default_sort));

        let projection = match params.text("select") {
            Some(raw) => Projection::parse(&raw)?,
            None => Projection::All,
        };

        let page = PageSpec::parse(
            params.text("page").as_deref(),
            params.text("limit").as_deref(),
            default_limit,
        );

        Ok(Self {
            filter,
            sort,
            projection,
            page,
        })
    }

    /// Store options for this query's page
    pub fn find_options(&self) -> FindOptions {
        FindOptions::new()
            .with_sort(self.sort.clone())
            .with_projection(self.projection.clone())
            .with_window(self.page.skip(), Some(self.page.limit))
    }
}

/// One listed page, ready for the response envelope
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Documents on this page
    pub items: Vec<Document>,
    /// Documents matching the filter
    pub total: u64,
    /// Neighbouring pages
    pub pagination: PaginationResult,
    /// Result of relation expansion
    pub enrichment: Enrichment,
}

/// Runs a list query end to end
pub async fn list(
    store: &dyn DocumentStore,
    collection: &str,
    query: &ListQuery,
    loader: Option<&dyn RelationLoader>,
) -> RepositoryResult<ListPage> {
    let outcome = execute(store, collection, &query.filter, &query.find_options(), loader).await?;
    let (_, pagination) = paginate(outcome.total, &query.page);
    Ok(ListPage {
        items: outcome.items,
        total: outcome.total,
        pagination,
        enrichment: outcome.enrichment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use serde_json::json;

    const BLOG: ListRules = ListRules {
        default_sort: "-createdAt",
        ad_hoc: &[
            AdHocFilter::Exact { param: "category", field: "category" },
            AdHocFilter::AnyOf { param: "tags", field: "tags" },
        ],
    };

    #[test]
    fn test_compile_defaults() {
        let query = ListQuery::compile(&QueryParams::default(), &BLOG, 10).unwrap();
        assert!(query.filter.is_empty());
        assert_eq!(query.sort, SortSpec::parse("-createdAt"));
        assert_eq!(query.projection, Projection::All);
        assert_eq!(query.page, PageSpec::new(1, 10));
    }

    #[test]
    fn test_explicit_sort_and_select() {
        let params = QueryParams::parse("sort=title&select=title,slug&limit=abc").unwrap();
        let query = ListQuery::compile(&params, &BLOG, 10).unwrap();
        assert_eq!(query.sort.to_string(), "title");
        assert_eq!(query.projection, Projection::Include(vec!["title".into(), "slug".into()]));
        assert_eq!(query.page.limit, 10);
    }

    #[test]
    fn test_bad_filter_is_a_query_error() {
        let params = QueryParams::parse("author[name]=x").unwrap();
        let err = ListQuery::compile(&params, &BLOG, 10).unwrap_err();
        assert!(matches!(err, QueryError::Filter(FilterError::UnsupportedOperator { .. })));
    }

    #[tokio::test]
    async fn test_second_page_of_a_category() {
        let store = MemoryStore::new();
        for i in 0..15 {
            let category = if i % 5 == 4 { "tech" } else { "design" };
            let doc = json!({
                "id": format!("blog_{i:02}"),
                "category": category,
                "createdAt": format!("2024-01-{:02}T00:00:00.000Z", i + 1)
            });
            store.insert("blog_posts", doc.as_object().cloned().unwrap()).await.unwrap();
        }

        let params = QueryParams::parse("category=design&page=2&limit=5").unwrap();
        let query = ListQuery::compile(&params, &BLOG, 10).unwrap();
        let page = list(&store, "blog_posts", &query, None).await.unwrap();

        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.pagination.next, Some(PageLink { page: 3, limit: 5 }));
        assert_eq!(page.pagination.prev, Some(PageLink { page: 1, limit: 5 }));
        // newest first: design posts sorted descending, sixth through tenth
        let ids: Vec<_> = page.items.iter().map(|d| d["id"].as_str().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["blog_07", "blog_06", "blog_05", "blog_03", "blog_02"]);
    }
}
