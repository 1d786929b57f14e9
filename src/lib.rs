pub mod error;
pub mod serializer;
pub mod tpl;
pub mod value;

pub use error::{CurlyError, EvaluateError, LexError, ParseError, Result};
pub use serializer::to_value;
pub use tpl::engine::{Engine, EngineOptions, Template, default_engine, render};
pub use tpl::resolver::{Lookup, resolve};
pub use value::{ToValue, Value};

/// Builds a `Value::Map` context from `key => value` pairs, where each value
/// implements `ToValue`.
///
/// ```
/// let ctx = curly::context! { "name" => "World", "items" => vec![1, 2] };
/// assert_eq!(curly::render("{{ name }}", &ctx).unwrap(), "World");
/// ```
#[macro_export]
macro_rules! context {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = ::std::collections::HashMap::<::std::string::String, $crate::value::Value>::new();
        $(
            map.insert(
                ::std::string::ToString::to_string(&$key),
                $crate::value::ToValue::to_value(&$value),
            );
        )*
        $crate::value::Value::Map(map)
    }};
}
