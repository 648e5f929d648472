use std::cmp::Ordering;

use crate::api::query::{FieldFilter, FilterOperator, OrderBy, OrderDirection, QueryDefinition};
use crate::api::DocumentSnapshot;
use crate::value::{compare_values, same_type_class, FirestoreValue};

/// Filters, orders and truncates `documents` the way the backend evaluates
/// `definition`.
///
/// Documents missing a filtered field never match, documents missing the
/// ordering field are dropped, and ties are broken by document key in the
/// ordering direction.
pub(crate) fn apply_query_to_documents(
    documents: Vec<DocumentSnapshot>,
    definition: &QueryDefinition,
) -> Vec<DocumentSnapshot> {
    let mut filtered: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(|snapshot| snapshot.exists())
        .filter(|snapshot| document_satisfies_filters(snapshot, definition.filters()))
        .filter(|snapshot| match definition.order_by() {
            Some(order) => field_value(snapshot, order).is_some(),
            None => true,
        })
        .collect();

    filtered.sort_by(|left, right| compare_snapshots(left, right, definition.order_by()));

    if let Some(limit) = definition.limit() {
        filtered.truncate(limit as usize);
    }

    filtered
}

fn document_satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| {
        snapshot
            .map_value()
            .and_then(|map| map.get(filter.field()))
            .is_some_and(|value| evaluate_filter(filter, value))
    })
}

fn evaluate_filter(filter: &FieldFilter, value: &FirestoreValue) -> bool {
    let target = filter.value();
    match filter.operator() {
        FilterOperator::Equal => compare_values(value, target) == Ordering::Equal,
        FilterOperator::NotEqual => {
            !value.is_null() && compare_values(value, target) != Ordering::Equal
        }
        operator => {
            if !same_type_class(value, target) {
                return false;
            }
            let ordering = compare_values(value, target);
            match operator {
                FilterOperator::LessThan => ordering == Ordering::Less,
                FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
                FilterOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
    }
}

fn field_value<'a>(snapshot: &'a DocumentSnapshot, order: &OrderBy) -> Option<&'a FirestoreValue> {
    snapshot.map_value()?.get(order.field())
}

fn compare_snapshots(
    left: &DocumentSnapshot,
    right: &DocumentSnapshot,
    order_by: Option<&OrderBy>,
) -> Ordering {
    let Some(order) = order_by else {
        return left.key().cmp(right.key());
    };

    let by_field = match (field_value(left, order), field_value(right, order)) {
        (Some(l), Some(r)) => compare_values(l, r),
        _ => Ordering::Equal,
    };
    let ordering = by_field.then_with(|| left.key().cmp(right.key()));
    if order.direction() == OrderDirection::Descending {
        ordering.reverse()
    } else {
        ordering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentKey, FieldPath, ResourcePath};
    use crate::value::MapValue;
    use std::collections::BTreeMap;

    fn definition() -> QueryDefinition {
        QueryDefinition::new(ResourcePath::from_string("products").unwrap())
    }

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dot_separated(path).unwrap()
    }

    fn snapshot_for(id: &str, fields: Vec<(&str, FirestoreValue)>) -> DocumentSnapshot {
        let key = DocumentKey::from_string(&format!("products/{id}")).unwrap();
        let map: BTreeMap<String, FirestoreValue> = fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        DocumentSnapshot::new(key, Some(MapValue::new(map)))
    }

    fn ids(documents: &[DocumentSnapshot]) -> Vec<&str> {
        documents.iter().map(|doc| doc.id()).collect()
    }

    #[test]
    fn applies_limit_and_ordering() {
        let definition = definition()
            .with_order_by(field("price"), OrderDirection::Ascending)
            .with_limit(2);
        let docs = vec![
            snapshot_for("a", vec![("price", 10.into())]),
            snapshot_for("b", vec![("price", 30.into())]),
            snapshot_for("c", vec![("price", 20.into())]),
        ];

        let result = apply_query_to_documents(docs, &definition);
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn descending_breaks_ties_by_key() {
        let definition = definition().with_order_by(field("rank"), OrderDirection::Descending);
        let docs = vec![
            snapshot_for("a", vec![("rank", 1.into())]),
            snapshot_for("b", vec![("rank", 2.into())]),
            snapshot_for("c", vec![("rank", 1.into())]),
            snapshot_for("d", vec![]),
        ];

        let result = apply_query_to_documents(docs, &definition);
        assert_eq!(ids(&result), vec!["b", "c", "a"]);
    }

    #[test]
    fn filters_compare_numbers_across_integer_and_double() {
        let definition = definition().with_filter(FieldFilter::new(
            field("price"),
            FilterOperator::GreaterThanOrEqual,
            FirestoreValue::from_integer(1000),
        ));
        let docs = vec![
            snapshot_for("cheap", vec![("price", 999.5.into())]),
            snapshot_for("exact", vec![("price", 1000.0.into())]),
            snapshot_for("pricey", vec![("price", 2500.into())]),
            snapshot_for("text", vec![("price", "9999".into())]),
        ];

        let result = apply_query_to_documents(docs, &definition);
        assert_eq!(ids(&result), vec!["exact", "pricey"]);
    }

    #[test]
    fn not_equal_skips_missing_and_null_fields() {
        let definition = definition().with_filter(FieldFilter::new(
            field("category"),
            FilterOperator::NotEqual,
            FirestoreValue::from_string("cardiology"),
        ));
        let docs = vec![
            snapshot_for("a", vec![("category", "cardiology".into())]),
            snapshot_for("b", vec![("category", "neurology".into())]),
            snapshot_for("c", vec![("category", FirestoreValue::null())]),
            snapshot_for("d", vec![]),
        ];

        let result = apply_query_to_documents(docs, &definition);
        assert_eq!(ids(&result), vec!["b"]);
    }

    #[test]
    fn nested_field_filters() {
        let nested = MapValue::new(BTreeMap::from([(
            "power".to_string(),
            FirestoreValue::from_string("220V"),
        )]));
        let definition = definition().with_filter(FieldFilter::new(
            field("specifications.power"),
            FilterOperator::Equal,
            FirestoreValue::from_string("220V"),
        ));
        let docs = vec![
            snapshot_for("a", vec![("specifications", FirestoreValue::from(nested))]),
            snapshot_for("b", vec![("specifications", "220V".into())]),
        ];

        let result = apply_query_to_documents(docs, &definition);
        assert_eq!(ids(&result), vec!["a"]);
    }
}
