use serde_json::{json, Value as JsonValue};

use crate::api::query::{FieldFilter, FilterOperator, QueryDefinition};
use crate::remote::serializer::JsonProtoSerializer;
use crate::value::ValueKind;

/// Encodes the `runQuery` request body for `definition`.
pub(crate) fn encode_run_query_body(
    serializer: &JsonProtoSerializer,
    definition: &QueryDefinition,
) -> JsonValue {
    json!({ "structuredQuery": encode_structured_query(serializer, definition) })
}

pub(crate) fn encode_structured_query(
    serializer: &JsonProtoSerializer,
    definition: &QueryDefinition,
) -> JsonValue {
    let mut structured = serde_json::Map::new();

    structured.insert(
        "from".to_string(),
        json!([{
            "collectionId": definition.collection_id(),
            "allDescendants": false
        }]),
    );

    if !definition.filters().is_empty() {
        structured.insert(
            "where".to_string(),
            encode_filters(serializer, definition.filters()),
        );
    }

    if let Some(order) = definition.order_by() {
        structured.insert(
            "orderBy".to_string(),
            json!([{
                "field": { "fieldPath": order.field().canonical_string() },
                "direction": order.direction().as_str(),
            }]),
        );
    }

    if let Some(limit) = definition.limit() {
        structured.insert("limit".to_string(), json!(limit));
    }

    JsonValue::Object(structured)
}

fn encode_filters(serializer: &JsonProtoSerializer, filters: &[FieldFilter]) -> JsonValue {
    if let [single] = filters {
        return encode_field_filter(serializer, single);
    }

    let nested: Vec<_> = filters
        .iter()
        .map(|filter| encode_field_filter(serializer, filter))
        .collect();

    json!({
        "compositeFilter": {
            "op": "AND",
            "filters": nested
        }
    })
}

fn encode_field_filter(serializer: &JsonProtoSerializer, filter: &FieldFilter) -> JsonValue {
    if let Some(op) = unary_operator(filter) {
        return json!({
            "unaryFilter": {
                "field": { "fieldPath": filter.field().canonical_string() },
                "op": op
            }
        });
    }
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field().canonical_string() },
            "op": filter.operator().as_str(),
            "value": serializer.encode_value(filter.value())
        }
    })
}

// The backend rejects equality against null or NaN in a field filter.
fn unary_operator(filter: &FieldFilter) -> Option<&'static str> {
    let is_nan = matches!(filter.value().kind(), ValueKind::Double(number) if number.is_nan());
    let is_null = filter.value().is_null();
    match (filter.operator(), is_null, is_nan) {
        (FilterOperator::Equal, true, _) => Some("IS_NULL"),
        (FilterOperator::Equal, _, true) => Some("IS_NAN"),
        (FilterOperator::NotEqual, true, _) => Some("IS_NOT_NULL"),
        (FilterOperator::NotEqual, _, true) => Some("IS_NOT_NAN"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::{OrderDirection, QueryDefinition};
    use crate::model::{DatabaseId, FieldPath, ResourcePath};
    use crate::value::FirestoreValue;

    fn definition() -> QueryDefinition {
        QueryDefinition::new(ResourcePath::from_string("products").unwrap())
    }

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dot_separated(path).unwrap()
    }

    fn serializer() -> JsonProtoSerializer {
        JsonProtoSerializer::new(DatabaseId::default("shop"))
    }

    #[test]
    fn empty_query_has_no_where_clause() {
        let body = encode_run_query_body(&serializer(), &definition());
        assert_eq!(
            body,
            json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "products", "allDescendants": false }]
                }
            })
        );
    }

    #[test]
    fn single_filter_is_not_wrapped() {
        let definition = definition().with_filter(FieldFilter::new(
            field("category"),
            FilterOperator::Equal,
            FirestoreValue::from_string("cardiology"),
        ));
        let encoded = encode_structured_query(&serializer(), &definition);
        assert_eq!(
            encoded["where"],
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": "category" },
                    "op": "EQUAL",
                    "value": { "stringValue": "cardiology" }
                }
            })
        );
    }

    #[test]
    fn several_filters_become_and() {
        let definition = definition()
            .with_filter(FieldFilter::new(
                field("category"),
                FilterOperator::Equal,
                FirestoreValue::from_string("cardiology"),
            ))
            .with_filter(FieldFilter::new(
                field("price"),
                FilterOperator::GreaterThanOrEqual,
                FirestoreValue::from_integer(1000),
            ))
            .with_order_by(field("price"), OrderDirection::Descending)
            .with_limit(5);
        let encoded = encode_structured_query(&serializer(), &definition);
        let filters = encoded["where"]["compositeFilter"]["filters"]
            .as_array()
            .unwrap();
        assert_eq!(encoded["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1]["fieldFilter"]["op"], "GREATER_THAN_OR_EQUAL");
        assert_eq!(
            filters[1]["fieldFilter"]["value"],
            json!({ "integerValue": "1000" })
        );
        assert_eq!(
            encoded["orderBy"],
            json!([{ "field": { "fieldPath": "price" }, "direction": "DESCENDING" }])
        );
        assert_eq!(encoded["limit"], 5);
    }

    #[test]
    fn subcollection_uses_last_segment() {
        let definition =
            QueryDefinition::new(ResourcePath::from_string("users/u1/orders").unwrap());
        let encoded = encode_structured_query(&serializer(), &definition);
        assert_eq!(encoded["from"][0]["collectionId"], "orders");
    }

    #[test]
    fn null_equality_becomes_unary_filter() {
        let definition = definition().with_filter(FieldFilter::new(
            field("discontinued_at"),
            FilterOperator::Equal,
            FirestoreValue::null(),
        ));
        let encoded = encode_structured_query(&serializer(), &definition);
        assert_eq!(
            encoded["where"],
            json!({
                "unaryFilter": {
                    "field": { "fieldPath": "discontinued_at" },
                    "op": "IS_NULL"
                }
            })
        );
    }
}
