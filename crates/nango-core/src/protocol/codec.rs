//! Wire encoding
//!
//! Request format: every field is its literal text followed by a NUL byte,
//! with no length prefix and no call identifier:
//!
//! ```text
//! namespace \0  id \0  count \0  arg1 \0 ... argN \0
//! ```
//!
//! `count` is the number of arguments minus one. The reply is a single
//! newline-terminated text line.

use serde_json::Value as JsonValue;
use std::fmt;

use super::ProtocolError;

/// Terminator written after every field
pub const TERMINATOR: u8 = 0;

/// Spelling of `true` on the wire
pub const TRUE_LITERAL: &str = "True";
/// Spelling of `false` on the wire
pub const FALSE_LITERAL: &str = "False";

/// A scalar argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Sent as is
    Text(String),
    /// Sent in decimal
    Int(i64),
    /// Sent as `True` / `False`
    Bool(bool),
}

impl Arg {
    /// Literal text of the value, without terminator
    pub fn literal(&self) -> String {
        match self {
            Arg::Text(s) => s.clone(),
            Arg::Int(n) => n.to_string(),
            Arg::Bool(true) => TRUE_LITERAL.to_string(),
            Arg::Bool(false) => FALSE_LITERAL.to_string(),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

/// A call argument as passed by callers: a scalar, a nested list, or nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// A single field
    Value(Arg),
    /// Spliced into the argument list
    List(Vec<Param>),
    /// Dropped from the argument list
    Null,
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::$variant($conv(v))
                }
            }

            impl From<$ty> for Param {
                fn from(v: $ty) -> Self {
                    Param::Value(Arg::from(v))
                }
            }
        )*
    };
}

impl_from_scalar! {
    &str => Text(str::to_string),
    String => Text(std::convert::identity),
    &String => Text(String::clone),
    i64 => Int(std::convert::identity),
    i32 => Int(i64::from),
    i16 => Int(i64::from),
    u32 => Int(i64::from),
    u16 => Int(i64::from),
    u8 => Int(i64::from),
    bool => Bool(std::convert::identity),
}

impl From<Arg> for Param {
    fn from(arg: Arg) -> Self {
        Param::Value(arg)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Null, Into::into)
    }
}

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(items: Vec<T>) -> Self {
        Param::List(items.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<&JsonValue> for Param {
    type Error = ProtocolError;

    /// Conversion from untyped input. Floats and objects have no wire encoding.
    fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Null => Ok(Param::Null),
            JsonValue::Bool(b) => Ok(Param::from(*b)),
            JsonValue::String(s) => Ok(Param::from(s.as_str())),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Param::from)
                .ok_or_else(|| ProtocolError::UnsupportedType(format!("number {}", n))),
            JsonValue::Array(items) => items
                .iter()
                .map(Param::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Param::List),
            JsonValue::Object(_) => Err(ProtocolError::UnsupportedType("object".to_string())),
        }
    }
}

/// Convert untyped JSON arguments, failing on the first value without a wire encoding
pub fn params_from_json(values: &[JsonValue]) -> Result<Vec<Param>, ProtocolError> {
    values.iter().map(Param::try_from).collect()
}

/// Expand list arguments in place and drop nulls
pub fn flatten<'a>(params: impl IntoIterator<Item = &'a Param>) -> Vec<Arg> {
    fn push_all<'a>(out: &mut Vec<Arg>, params: impl IntoIterator<Item = &'a Param>) {
        for param in params {
            match param {
                Param::Value(arg) => out.push(arg.clone()),
                Param::List(items) => push_all(out, items),
                Param::Null => {}
            }
        }
    }

    let mut out = Vec::new();
    push_all(&mut out, params);
    out
}

/// Value of the count field for `arg_count` flattened arguments
pub fn count_field(arg_count: usize) -> Arg {
    Arg::Int(arg_count as i64 - 1)
}

/// Wire bytes for one field: literal text plus terminator
pub fn encode_value(arg: &Arg) -> Vec<u8> {
    let mut bytes = arg.literal().into_bytes();
    bytes.push(TERMINATOR);
    bytes
}

/// Reply line as text
pub fn decode_reply(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

/// A request as the firmware sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// First field
    pub namespace: String,
    /// Object id field
    pub id: i64,
    /// Argument fields, method name first
    pub args: Vec<String>,
}

/// Split one complete request back into its fields.
///
/// Returns `None` when the bytes are not exactly one well-formed request.
pub fn decode_request(bytes: &[u8]) -> Option<Request> {
    let body = bytes.strip_suffix(&[TERMINATOR])?;
    let mut fields = body
        .split(|&b| b == TERMINATOR)
        .map(|f| String::from_utf8_lossy(f).into_owned());

    let namespace = fields.next()?;
    let id = fields.next()?.parse().ok()?;
    let count: i64 = fields.next()?.parse().ok()?;
    let args: Vec<String> = fields.collect();

    if count + 1 != args.len() as i64 {
        return None;
    }
    Some(Request {
        namespace,
        id,
        args,
    })
}

/// Build a `Vec<Param>` from heterogeneous values
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::protocol::Param>::new() };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::protocol::Param::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&Arg::from("hello")), b"hello\0".to_vec());
        assert_eq!(encode_value(&Arg::from(42)), b"42\0".to_vec());
        assert_eq!(encode_value(&Arg::from(-7i64)), b"-7\0".to_vec());
        assert_eq!(encode_value(&Arg::from(true)), b"True\0".to_vec());
        assert_eq!(encode_value(&Arg::from(false)), b"False\0".to_vec());
    }

    #[test]
    fn test_count_field_is_off_by_one() {
        assert_eq!(count_field(1), Arg::Int(0));
        assert_eq!(count_field(3), Arg::Int(2));
        assert_eq!(count_field(0), Arg::Int(-1));
    }

    #[test]
    fn test_flatten_expands_lists_and_drops_nulls() {
        let params = vec![
            Param::from("write"),
            Param::Null,
            Param::from(vec![Param::from(1), Param::Null, Param::from(true)]),
            Param::from(None::<i64>),
            Param::from(Some("x")),
        ];
        assert_eq!(
            flatten(&params),
            vec![
                Arg::from("write"),
                Arg::from(1),
                Arg::from(true),
                Arg::from("x"),
            ]
        );
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let inputs = vec![
            params![],
            params![Param::Null],
            params!["a", vec![1, 2, 3], Param::Null],
            params![Param::List(vec![
                Param::List(vec![Param::from("deep"), Param::Null]),
                Param::from(false),
            ])],
            params![Vec::<Param>::new(), 9],
        ];
        for input in inputs {
            let once = flatten(&input);
            let as_params: Vec<Param> = once.iter().cloned().map(Param::from).collect();
            assert_eq!(flatten(&as_params), once);
        }
    }

    #[test]
    fn test_json_conversion() {
        let params = params_from_json(&[json!("dw"), json!(13), json!(null), json!([true, 2])]).unwrap();
        assert_eq!(
            flatten(&params),
            vec![Arg::from("dw"), Arg::from(13), Arg::from(true), Arg::from(2)]
        );
    }

    #[test]
    fn test_json_unsupported_types() {
        match params_from_json(&[json!("ok"), json!(1.5)]) {
            Err(ProtocolError::UnsupportedType(name)) => assert!(name.contains("1.5")),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
        assert!(matches!(
            Param::try_from(&json!({"pin": 13})),
            Err(ProtocolError::UnsupportedType(_))
        ));
        assert!(matches!(
            Param::try_from(&json!([1, [2, {"x": 1}]])),
            Err(ProtocolError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_decode_request() {
        let request = decode_request(b"A\x000\x002\x00dw\x0013\x001\x00").unwrap();
        assert_eq!(request.namespace, "A");
        assert_eq!(request.id, 0);
        assert_eq!(request.args, vec!["dw", "13", "1"]);

        // count disagrees with the number of arguments
        assert!(decode_request(b"A\x000\x005\x00dw\x00").is_none());
        // missing final terminator
        assert!(decode_request(b"A\x000\x000\x00dw").is_none());
    }

    #[test]
    fn test_decode_reply_is_identity() {
        assert_eq!(decode_reply(b"ok"), "ok");
        assert_eq!(decode_reply(b""), "");
    }
}
