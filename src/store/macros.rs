//! Macros for declaring records.

/// Declare a record: a marker type implementing [`Record`](crate::store::Record).
///
/// Each field is written `name: Type = default => access`. The default is
/// checked against `Type` at compile time.
///
/// # Example
///
/// ```
/// use scenery::record;
/// use scenery::store::{Access, Record};
///
/// record! {
///     pub struct GameData {
///         health: i64 = 100 => Access::transient(["Play"]),
///         name: String = String::new() => Access::global(),
///         scores: Vec<(String, i64)> = Vec::new() => Access::static_in(["Play", "Leaderboard"]),
///     }
/// }
///
/// assert_eq!(GameData::fields().len(), 3);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $field:ident : $ty:ty = $default:expr => $access:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        $vis struct $name;

        impl $crate::store::Record for $name {
            fn fields() -> ::std::vec::Vec<$crate::store::FieldDecl> {
                ::std::vec![
                    $(
                        $crate::store::FieldDecl::new(stringify!($field))
                            .default_value::<$ty>($default)
                            .access($access)
                    ),*
                ]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::store::{Access, Record};

    record! {
        struct Sample {
            count: i64 = 3 => Access::global(),
            label: String = "hi".to_string() => Access::static_in(["A"]),
        }
    }

    #[test]
    fn record_macro_declares_fields_in_order() {
        let fields = Sample::fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name(), "count");
        assert_eq!(fields[0].type_name, "i64");
        assert_eq!(fields[0].default, Some(Ok(serde_json::json!(3))));
        assert_eq!(fields[1].name(), "label");
        assert_eq!(fields[1].default, Some(Ok(serde_json::json!("hi"))));
        assert!(fields.iter().all(|f| f.access.is_some()));
    }

    #[test]
    fn record_macro_supports_visibility_and_empty_records() {
        record! {
            pub struct Empty {}
        }

        assert!(Empty::fields().is_empty());
    }
}
