use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub solution_explanation: String,
    /// Executed in ascending `order` before any query runs.
    #[serde(default)]
    pub schemas: Vec<SchemaScript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Solution>,
}

impl Problem {
    /// The reference query, if one is configured and non-blank.
    pub fn reference_query(&self) -> Option<&str> {
        self.solution
            .as_ref()
            .map(|s| s.query.as_str())
            .filter(|q| !q.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaScript {
    pub order: u32,
    pub script: String,
}

impl SchemaScript {
    pub fn new(order: u32, script: impl Into<String>) -> Self {
        Self {
            order,
            script: script.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Solution {
    pub query: String,
}

/// A problem as read from content files, before it has a store identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemDraft {
    pub title: String,
    pub description: String,
    pub solution_explanation: String,
    pub schemas: Vec<SchemaScript>,
    pub solution: Option<Solution>,
}

impl ProblemDraft {
    pub fn into_problem(self, id: i64) -> Problem {
        Problem {
            id,
            title: self.title,
            description: self.description,
            solution_explanation: self.solution_explanation,
            schemas: self.schemas,
            solution: self.solution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Run,
    Submit,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Run => "run",
            Mode::Submit => "submit",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" => Ok(Mode::Run),
            "submit" => Ok(Mode::Submit),
            other => Err(format!("unknown mode '{}' (expected run|submit)", other)),
        }
    }
}

/// A single SQL value as captured from the scratch database.
///
/// Integers and reals compare by numeric value, so `Integer(5)` equals
/// `Real(5.0)`; every other pair of storage classes is never equal.
/// `Ord` is a total order used to canonicalize row sets; it ranks
/// Null < numbers < Text < Blob and then compares payloads.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Normalizes `-0.0` to `0.0` so that both compare equal.
    pub fn real(f: f64) -> Self {
        if f == 0.0 {
            Value::Real(0.0)
        } else {
            Value::Real(f)
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Real(_) => 1,
            Value::Text(_) => 2,
            Value::Blob(_) => 3,
        }
    }
}

impl From<rusqlite::types::Value> for Value {
    fn from(v: rusqlite::types::Value) -> Self {
        match v {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(i) => Value::Integer(i),
            rusqlite::types::Value::Real(f) => Value::real(f),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => Value::Blob(b),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Value::Integer(i), Value::Real(r)) => cmp_int_real(*i, *r),
            (Value::Real(r), Value::Integer(i)) => cmp_int_real(*i, *r).reverse(),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Exact comparison of an integer with a real, without rounding the integer
/// through `f64`. NaN sorts after every number.
fn cmp_int_real(i: i64, r: f64) -> Ordering {
    if r.is_nan() {
        return Ordering::Less;
    }
    // 2^63 as f64; every real in [-2^63, 2^63) truncates to a valid i64.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if r >= BOUND {
        return Ordering::Less;
    }
    if r < -BOUND {
        return Ordering::Greater;
    }
    let whole = r.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if r > whole => Ordering::Less,
        Ordering::Equal if r < whole => Ordering::Greater,
        other => other,
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "X'{}'", hex::encode_upper(b)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

pub type Row = Vec<Value>;

/// Columns and rows captured from one query execution, in the query's own order.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

/// Caller-facing result of one verification call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Results {
        #[serde(flatten)]
        result: ExecutionResult,
    },
    Verdict {
        correct: bool,
        #[serde(flatten)]
        result: ExecutionResult,
    },
    Error {
        subtype: crate::errors::ErrorKind,
        message: String,
        /// Only present when the candidate ran but no verdict could be given.
        #[serde(flatten)]
        result: Option<ExecutionResult>,
    },
}

impl Outcome {
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Outcome::Results { result } | Outcome::Verdict { result, .. } => Some(result),
            Outcome::Error { result, .. } => result.as_ref(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_order_ranks_storage_classes() {
        let mut vals = vec![
            Value::Blob(vec![1]),
            Value::Text("a".into()),
            Value::Real(0.5),
            Value::Integer(7),
            Value::Null,
        ];
        vals.sort();
        assert_eq!(
            vals,
            vec![
                Value::Null,
                Value::Real(0.5),
                Value::Integer(7),
                Value::Text("a".into()),
                Value::Blob(vec![1]),
            ]
        );
    }

    #[test]
    fn test_integer_and_real_compare_numerically() {
        assert_eq!(Value::Integer(5), Value::Real(5.0));
        assert_eq!(Value::Real(0.0), Value::Integer(0));
        assert!(Value::Integer(5) < Value::Real(5.5));
        assert!(Value::Real(-2.5) < Value::Integer(-2));
        assert!(Value::Integer(i64::MAX) < Value::Real(1e19));
        assert!(Value::Integer(i64::MIN) > Value::Real(-1e19));
        assert!(Value::Integer(1) < Value::Real(f64::NAN));
        assert_ne!(Value::Integer(1), Value::Text("1".into()));
    }

    #[test]
    fn test_large_integers_are_not_rounded() {
        // 2^53 + 1 has no exact f64, so it must not equal its rounded neighbour.
        let big = (1_i64 << 53) + 1;
        assert_ne!(Value::Integer(big), Value::Real((1_i64 << 53) as f64));
        assert!(Value::Integer(big) > Value::Real((1_i64 << 53) as f64));
        assert_ne!(Value::Integer(big), Value::Integer(1 << 53));
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(Value::real(-0.0), Value::real(0.0));
        let captured: Value = rusqlite::types::Value::Real(-0.0).into();
        assert_eq!(captured, Value::Real(0.0));
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = Outcome::Verdict {
            correct: true,
            result: ExecutionResult {
                columns: vec!["id".into(), "name".into()],
                rows: vec![vec![Value::Integer(1), Value::Text("a".into())]],
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "verdict",
                "correct": true,
                "columns": ["id", "name"],
                "rows": [[1, "a"]]
            })
        );
    }

    #[test]
    fn test_error_outcome_omits_missing_result() {
        let outcome = Outcome::Error {
            subtype: crate::errors::ErrorKind::Validation,
            message: "query is empty".into(),
            result: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "error",
                "subtype": "validation",
                "message": "query is empty"
            })
        );
    }

    #[test]
    fn test_blank_solution_is_not_a_reference() {
        let p = Problem {
            id: 1,
            title: "t".into(),
            description: String::new(),
            solution_explanation: String::new(),
            schemas: vec![],
            solution: Some(Solution {
                query: "   \n".into(),
            }),
        };
        assert!(p.reference_query().is_none());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Submit".parse::<Mode>().unwrap(), Mode::Submit);
        assert!("grade".parse::<Mode>().is_err());
    }
}
