use std::fmt::{Display, Formatter};

use crate::error::{invalid_argument, FirestoreResult};
use crate::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::value::{FirestoreValue, ValueKind};

use super::snapshot::DocumentSnapshot;
use super::Firestore;

/// Comparison applied by a field filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl FilterOperator {
    /// Parses the symbolic form used by callers (`=`, `==`, `!=`, `<`, `<=`,
    /// `>`, `>=`).
    pub fn parse(symbol: &str) -> FirestoreResult<Self> {
        match symbol.trim() {
            "=" | "==" => Ok(FilterOperator::Equal),
            "!=" | "<>" => Ok(FilterOperator::NotEqual),
            "<" => Ok(FilterOperator::LessThan),
            "<=" => Ok(FilterOperator::LessThanOrEqual),
            ">" => Ok(FilterOperator::GreaterThan),
            ">=" => Ok(FilterOperator::GreaterThanOrEqual),
            other => Err(invalid_argument(format!(
                "Unsupported filter operator '{other}'"
            ))),
        }
    }

    /// Wire name of the operator in a structured query.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "EQUAL",
            FilterOperator::NotEqual => "NOT_EQUAL",
            FilterOperator::LessThan => "LESS_THAN",
            FilterOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            FilterOperator::GreaterThan => "GREATER_THAN",
            FilterOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        }
    }

    pub(crate) fn is_range(&self) -> bool {
        !matches!(self, FilterOperator::Equal | FilterOperator::NotEqual)
    }
}

/// Accepts either a [`FilterOperator`] or its symbolic string form.
pub trait IntoFilterOperator {
    fn into_filter_operator(self) -> FirestoreResult<FilterOperator>;
}

impl IntoFilterOperator for FilterOperator {
    fn into_filter_operator(self) -> FirestoreResult<FilterOperator> {
        Ok(self)
    }
}

impl<'a> IntoFilterOperator for &'a str {
    fn into_filter_operator(self) -> FirestoreResult<FilterOperator> {
        FilterOperator::parse(self)
    }
}

impl IntoFilterOperator for String {
    fn into_filter_operator(self) -> FirestoreResult<FilterOperator> {
        FilterOperator::parse(&self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderDirection {
    /// Case-insensitive: `desc` and `descending` select descending order,
    /// anything else ascending.
    pub fn parse(direction: &str) -> Self {
        let normalized = direction.trim().to_ascii_lowercase();
        if normalized == "desc" || normalized == "descending" {
            OrderDirection::Descending
        } else {
            OrderDirection::Ascending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASCENDING",
            OrderDirection::Descending => "DESCENDING",
        }
    }
}

impl From<&str> for OrderDirection {
    fn from(value: &str) -> Self {
        OrderDirection::parse(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn new(field: FieldPath, operator: FilterOperator, value: FirestoreValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: FieldPath, direction: OrderDirection) -> Self {
        Self { field, direction }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// Everything a backend needs to run a query: target collection, filters
/// (combined with AND), an optional ordering and an optional limit.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    collection_path: ResourcePath,
    filters: Vec<FieldFilter>,
    order_by: Option<OrderBy>,
    limit: Option<u32>,
}

impl QueryDefinition {
    pub fn new(collection_path: ResourcePath) -> Self {
        Self {
            collection_path,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Replaces any previous ordering.
    pub fn with_order_by(mut self, field: FieldPath, direction: OrderDirection) -> Self {
        self.order_by = Some(OrderBy::new(field, direction));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn collection_id(&self) -> &str {
        self.collection_path.last_segment().unwrap_or_default()
    }

    /// Path of the document owning the collection; empty for root collections.
    pub fn parent_path(&self) -> ResourcePath {
        self.collection_path.without_last()
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub(crate) fn matches_collection(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }
}

/// A query against one collection.
///
/// Queries are immutable: `where_field`, `order_by` and `limit` return a new
/// query and leave the receiver untouched, so a query (or the collection it
/// came from) can be reused freely and shared between threads.
#[derive(Clone)]
pub struct Query {
    firestore: Firestore,
    definition: QueryDefinition,
}

impl Query {
    /// `collection_path` is already validated by the collection reference.
    pub(crate) fn new(firestore: Firestore, collection_path: ResourcePath) -> Self {
        Self {
            firestore,
            definition: QueryDefinition::new(collection_path),
        }
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn collection_path(&self) -> &ResourcePath {
        self.definition.collection_path()
    }

    pub fn collection_id(&self) -> &str {
        self.definition.collection_id()
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    /// Adds a filter. Several filters must all match.
    ///
    /// ```
    /// # use firestore_rest_lite::api::{Firestore, FilterOperator};
    /// let firestore = Firestore::in_memory("demo");
    /// let products = firestore.collection("products").unwrap();
    /// let query = products
    ///     .where_field("category", "==", "cardiology")
    ///     .unwrap()
    ///     .where_field("price", FilterOperator::GreaterThanOrEqual, 1000)
    ///     .unwrap();
    /// assert_eq!(query.definition().filters().len(), 2);
    /// ```
    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: impl IntoFilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Query> {
        let field = field.into_field_path()?;
        let operator = operator.into_filter_operator()?;
        let value = value.into();
        if operator.is_range() && is_null_or_nan(&value) {
            return Err(invalid_argument(format!(
                "Range filter on '{field}' cannot compare against null or NaN"
            )));
        }
        Ok(self.with_definition(
            self.definition
                .clone()
                .with_filter(FieldFilter::new(field, operator, value)),
        ))
    }

    /// Orders results by `field`. Only one ordering is kept: calling this again
    /// replaces it. Documents that lack `field` are left out of the results.
    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: impl Into<OrderDirection>,
    ) -> FirestoreResult<Query> {
        let field = field.into_field_path()?;
        Ok(self.with_definition(
            self.definition
                .clone()
                .with_order_by(field, direction.into()),
        ))
    }

    pub fn limit(&self, limit: u32) -> FirestoreResult<Query> {
        if limit == 0 {
            return Err(invalid_argument("limit must be greater than zero"));
        }
        Ok(self.with_definition(self.definition.clone().with_limit(limit)))
    }

    /// Runs the query and returns matching documents in result order.
    ///
    /// An empty vector means nothing matched; backend failures are errors.
    pub fn documents(&self) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let documents = self.firestore.datastore().run_query(&self.definition)?;
        log::debug!(
            "query on {} returned {} document(s)",
            self.collection_path(),
            documents.len()
        );
        Ok(documents)
    }

    fn with_definition(&self, definition: QueryDefinition) -> Query {
        Query {
            firestore: self.firestore.clone(),
            definition,
        }
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("definition", &self.definition)
            .finish()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Query({})", self.collection_path().canonical_string())
    }
}

pub(crate) fn is_null_or_nan(value: &FirestoreValue) -> bool {
    match value.kind() {
        ValueKind::Null => true,
        ValueKind::Double(number) => number.is_nan(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirestoreErrorCode;

    fn products() -> Query {
        Firestore::in_memory("query-tests")
            .collection("products")
            .unwrap()
            .query()
    }

    #[test]
    fn parses_operator_symbols() {
        assert_eq!(FilterOperator::parse("=").unwrap(), FilterOperator::Equal);
        assert_eq!(FilterOperator::parse("==").unwrap(), FilterOperator::Equal);
        assert_eq!(FilterOperator::parse(">=").unwrap(), FilterOperator::GreaterThanOrEqual);
        let err = FilterOperator::parse("array-contains").unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::InvalidArgument);
    }

    #[test]
    fn parses_direction_case_insensitively() {
        assert_eq!(OrderDirection::parse("DESC"), OrderDirection::Descending);
        assert_eq!(OrderDirection::parse("Descending"), OrderDirection::Descending);
        assert_eq!(OrderDirection::parse("asc"), OrderDirection::Ascending);
        assert_eq!(OrderDirection::parse("sideways"), OrderDirection::Ascending);
    }

    #[test]
    fn builders_leave_receiver_untouched() {
        let base = products();
        let filtered = base.where_field("price", ">", 10).unwrap();
        let ordered = filtered.order_by("price", "desc").unwrap().limit(3).unwrap();

        assert!(base.definition().filters().is_empty());
        assert_eq!(filtered.definition().filters().len(), 1);
        assert!(filtered.definition().order_by().is_none());
        assert_eq!(ordered.definition().limit(), Some(3));
        assert_eq!(
            ordered.definition().order_by().map(|order| order.direction()),
            Some(OrderDirection::Descending)
        );
    }

    #[test]
    fn later_order_by_replaces_earlier() {
        let query = products()
            .order_by("price", "asc")
            .unwrap()
            .order_by("name", "desc")
            .unwrap();
        let order = query.definition().order_by().unwrap();
        assert_eq!(order.field().canonical_string(), "name");
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert_eq!(
            products().limit(0).unwrap_err().code,
            FirestoreErrorCode::InvalidArgument
        );
        assert_eq!(
            products()
                .where_field("price", "<", FirestoreValue::null())
                .unwrap_err()
                .code,
            FirestoreErrorCode::InvalidArgument
        );
        assert_eq!(
            products().where_field("", "==", 1).unwrap_err().code,
            FirestoreErrorCode::InvalidArgument
        );
    }

    #[test]
    fn subcollection_parent_path() {
        let query = Firestore::in_memory("query-tests")
            .collection("users/u1/orders")
            .unwrap()
            .query();
        assert_eq!(query.collection_id(), "orders");
        assert_eq!(query.definition().parent_path().canonical_string(), "users/u1");
    }
}
