use std::fmt;

pub type Int = i64;
pub type Real = f64;
pub type Var = String;

/// Value carried by a token or read from a code/data/input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(Int),
    Real(Real),
    Text(String),
}

impl Value {
    // integer if possible, otherwise real, otherwise the text itself
    pub fn parse(s: &str) -> Value {
        if let Ok(n) = s.parse::<Int>() {
            return Value::Int(n);
        }

        match s.parse::<Real>() {
            Ok(x) => Value::Real(x),
            Err(_) => Value::Text(s.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Real(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub name: Var,
    pub value: Option<Value>,
}

impl Token {
    pub fn new(name: impl Into<Var>) -> Self {
        Token {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<Var>, value: Value) -> Self {
        Token {
            name: name.into(),
            value: Some(value),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "({}, {})", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_integer_then_real_then_text() {
        assert_eq!(Value::parse("42"), Value::Int(42));
        assert_eq!(Value::parse("-7"), Value::Int(-7));
        assert_eq!(Value::parse("2.5"), Value::Real(2.5));
        assert_eq!(Value::parse("x1"), Value::Text("x1".into()));
    }

    #[test]
    fn token_display() {
        assert_eq!(Token::new("$put").to_string(), "$put");
        assert_eq!(
            Token::with_value("$id", Value::Text("x".into())).to_string(),
            "($id, x)"
        );
    }
}
