use firestore_rest_lite::api::FieldUpdate;
use firestore_rest_lite::{Firestore, FirestoreOptions, FirestoreValue, MapValue};
use std::collections::BTreeMap;

/// Uses the REST backend when `FIRESTORE_PROJECT_ID` (and usually
/// `FIRESTORE_ACCESS_TOKEN` or `FIRESTORE_EMULATOR_HOST`) is set, otherwise an
/// in-memory store.
fn connect() -> Result<Firestore, Box<dyn std::error::Error>> {
    match FirestoreOptions::from_env() {
        Ok(options) => Ok(Firestore::new(options)?),
        Err(_) => {
            eprintln!("FIRESTORE_PROJECT_ID not set; using an in-memory store.");
            Ok(Firestore::in_memory("product-catalog-demo"))
        }
    }
}

fn product(name: &str, category: &str, price: i64, model: &str) -> MapValue {
    let mut specifications = BTreeMap::new();
    specifications.insert("model".to_string(), FirestoreValue::from_string(model));
    specifications.insert("power".to_string(), FirestoreValue::from_string("110V"));

    let mut data = BTreeMap::new();
    data.insert("name".to_string(), FirestoreValue::from_string(name));
    data.insert("category".to_string(), FirestoreValue::from_string(category));
    data.insert("price".to_string(), FirestoreValue::from_integer(price));
    data.insert(
        "specifications".to_string(),
        FirestoreValue::from_map(specifications),
    );
    MapValue::new(data)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let firestore = connect()?;
    let products = firestore.collection("products")?;

    products
        .doc(Some("ecg-monitor"))?
        .set(product("ECG monitor", "cardiology", 4500, "E7"))?;
    products
        .doc(Some("stethoscope"))?
        .set(product("Stethoscope", "cardiology", 120, "S2"))?;
    products
        .doc(Some("eeg-headset"))?
        .set(product("EEG headset", "neurology", 2300, "N1"))?;

    let expensive_cardiology = products
        .where_field("category", "=", "cardiology")?
        .where_field("price", ">=", 1000)?
        .documents()?;
    for snapshot in &expensive_cardiology {
        println!("cardiology >= 1000: {} {}", snapshot.id(), snapshot.to_json());
    }

    let cheapest = products.order_by("price", "asc")?.limit(2)?.documents()?;
    let names: Vec<String> = cheapest.iter().map(|doc| doc.id().to_string()).collect();
    println!("two cheapest: {names:?}");

    let monitor = products.doc(Some("ecg-monitor"))?;
    monitor.update(vec![FieldUpdate::new("specifications.power", "220V")])?;
    let updated = monitor.get()?;
    println!(
        "after update: model={:?} power={:?}",
        updated.get("specifications.model")?.and_then(|v| v.as_str()),
        updated.get("specifications.power")?.and_then(|v| v.as_str())
    );

    let missing = products.doc(Some("nonexistent"))?.get()?;
    println!("nonexistent exists: {}", missing.exists());

    monitor.delete()?;
    monitor.delete()?;
    println!("remaining products: {}", products.documents()?.len());
    Ok(())
}
