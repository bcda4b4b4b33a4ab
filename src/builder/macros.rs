//! Macros for ergonomic patch construction.

/// Build a [`Patch`](crate::core::Patch) from `key => value` pairs.
///
/// Values are JSON literals, as accepted by `serde_json::json!`. Wrap
/// arbitrary expressions in parentheses.
///
/// # Example
///
/// ```
/// use arbor::patch;
///
/// let count = 2;
/// let patch = patch! {
///     "loadState" => "ready",
///     "data" => { "items": [1, 2, 3] },
///     "count" => (count + 1),
/// };
///
/// assert_eq!(patch.len(), 3);
/// assert_eq!(patch.get("count"), Some(&serde_json::json!(3)));
/// ```
#[macro_export]
macro_rules! patch {
    () => {
        $crate::core::Patch::new()
    };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let mut patch = $crate::core::Patch::new();
        $(
            patch.insert($key, $crate::__serde_json::json!($value));
        )+
        patch
    }};
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn patch_macro_keeps_order_and_last_write() {
        let patch = patch! {
            "b" => 1,
            "a" => [true, null],
            "b" => 2,
        };

        assert_eq!(patch.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(patch.get("b"), Some(&json!(2)));
    }

    #[test]
    fn empty_patch_macro() {
        let patch = patch! {};
        assert!(patch.is_empty());
    }

    #[test]
    fn keys_may_be_expressions() {
        let key = String::from("dynamic");
        let patch = patch! { key.clone() => { "nested": 1 } };
        assert_eq!(patch.get("dynamic"), Some(&json!({ "nested": 1 })));
    }
}
