mod array_value;
mod map_value;
mod ordering;
mod value;

pub use array_value::ArrayValue;
pub use map_value::MapValue;
pub use ordering::compare_values;
pub(crate) use ordering::same_type_class;
pub use value::{FirestoreValue, ValueKind};
