//! The opaque object flowing through conditions, transforms and processors.
//!
//! Inputs and outputs are `rhai::Dynamic`, so any `Clone + Send + Sync` type can
//! be carried and script leaves see the same values as native ones. The unit
//! value `()` stands for "absent", which no transform may produce.

use rhai::Dynamic;

/// Opaque evaluation object.
pub type Value = Dynamic;

/// Max characters kept by [`describe`].
const DESCRIBE_LIMIT: usize = 64;

/// The absent value.
pub fn absent() -> Value {
    Dynamic::UNIT
}

pub fn is_absent(value: &Value) -> bool {
    value.is_unit()
}

/// Wrap any carried type.
pub fn from<T>(value: T) -> Value
where
    T: Clone + Send + Sync + 'static,
{
    Dynamic::from(value)
}

/// Text view used by string leaves: strings as-is, everything else via `Display`.
pub fn to_text(value: &Value) -> String {
    if value.is_string() {
        value.clone().into_string().unwrap_or_default()
    } else {
        value.to_string()
    }
}

/// Short form for traces, e.g. `string(hello)`.
pub fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > DESCRIBE_LIMIT {
        let cut: String = text.chars().take(DESCRIBE_LIMIT).collect();
        format!("{}({}…)", value.type_name(), cut)
    } else {
        format!("{}({})", value.type_name(), text)
    }
}
