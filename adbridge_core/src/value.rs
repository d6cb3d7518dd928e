use std::fmt;

/// Declared return type of an external callback method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnKind {
    Void,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Object,
}

/// A value crossing the SDK boundary: callback arguments and call results.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Void,
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
    List(Vec<Value>),
    /// Anything else, carried as its string form.
    Object(String),
}

impl Value {
    /// Harmless answer for a callback method whose result the bridge ignores.
    pub fn neutral(kind: ReturnKind) -> Value {
        match kind {
            ReturnKind::Void => Value::Void,
            ReturnKind::Bool => Value::Bool(false),
            ReturnKind::Byte => Value::Byte(0),
            ReturnKind::Short => Value::Short(0),
            ReturnKind::Int => Value::Int(0),
            ReturnKind::Long => Value::Long(0),
            ReturnKind::Float => Value::Float(0.0),
            ReturnKind::Double => Value::Double(0.0),
            ReturnKind::Char => Value::Char('\0'),
            ReturnKind::Object => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Void)
    }

    /// String form, `None` for null.
    pub fn to_text(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void | Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Str(s) | Value::Object(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
