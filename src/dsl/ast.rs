//! The DSL tree (§3.2): the canonical, serializable representation of a
//! screen, shared by the Translator (which builds it), the Validator
//! (which normalizes it), and the Compiler (which consumes it frozen).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Maximum nesting depth for logical nodes (§3.2, configurable via
/// `compiler.max_nesting_depth`, default enforced here is the spec default).
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 5;

/// The root of a screen: a filter tree plus optional sort/limit/meta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub meta: Option<Value>,
    pub filter: Node,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl Rule {
    /// The degenerate rule the Translator returns when it understood
    /// nothing: `{filter: {}}`, compiling to `WHERE 1=1`.
    pub fn empty() -> Self {
        Self {
            meta: None,
            filter: Node::Empty,
            sort: None,
            limit: None,
        }
    }
}

/// Sort clause: `sort.field` must exist in the catalog; `sort.order` is
/// `asc` or `desc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

/// A node in the filter tree: exactly one of and/or/not, or a leaf
/// condition. `Empty` represents the degenerate "no filter" tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Cond(Cond),
    Empty,
}

impl Node {
    /// Depth of the deepest logical nesting below this node (a bare
    /// `Cond` or `Empty` has depth 0).
    pub fn depth(&self) -> usize {
        match self {
            Node::And(children) | Node::Or(children) => {
                1 + children.iter().map(Node::depth).max().unwrap_or(0)
            }
            Node::Not(child) => 1 + child.depth(),
            Node::Cond(_) | Node::Empty => 0,
        }
    }
}

/// A single condition leaf (§3.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cond {
    pub field: String,
    pub operator: String,
    pub value: Value,
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub null_handling: Option<NullHandling>,
    #[serde(default)]
    pub value_is_field: bool,
}

/// A time window over which a condition applies (§3.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    #[serde(rename = "type")]
    pub period_type: PeriodType,
    pub n: u32,
    #[serde(default)]
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    LastNQuarters,
    LastNYears,
    TrailingTwelveMonths,
    QuarterOverQuarter,
    YearOverYear,
}

impl PeriodType {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "last_n_quarters" => PeriodType::LastNQuarters,
            "last_n_years" => PeriodType::LastNYears,
            "trailing_12_months" => PeriodType::TrailingTwelveMonths,
            "quarter_over_quarter" => PeriodType::QuarterOverQuarter,
            "year_over_year" => PeriodType::YearOverYear,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    All,
    Any,
    Avg,
    Sum,
    Min,
    Max,
    Trend,
    Latest,
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::All
    }
}

/// Null-handling strategy for a condition (§4.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    Exclude,
    Fail,
    UseDefault,
    UseLatest,
    Interpolate,
}

impl Default for NullHandling {
    fn default() -> Self {
        NullHandling::Exclude
    }
}

// ===========================================================================
// Manual Serialize/Deserialize for Node
//
// Node's wire shape is "exactly one of and/or/not, else condition fields"
// (§3.2). That's awkward for derive(Deserialize) + #[serde(untagged)]
// because a `Cond`'s required fields can't distinguish it from a
// malformed and/or/not shell at the type level; we go through
// `serde_json::Value` and branch on keys explicitly, which also gives
// the Validator's structural phase (§4.3 phase 1) a single place that
// already knows what "unknown top-level key" means.
// ===========================================================================

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            Node::And(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("and", children)?;
                map.end()
            }
            Node::Or(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("or", children)?;
                map.end()
            }
            Node::Not(child) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("not", child)?;
                map.end()
            }
            Node::Cond(cond) => cond.serialize(serializer),
            Node::Empty => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Node::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Error raised while decoding raw JSON into a [`Node`]. Kept distinct
/// from [`crate::validation::ValidationError`] — this is a shape error
/// in the wire format, not a semantic rule violation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecodeError(pub String);

impl fmt::Display for NodeDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NodeDecodeError {}

impl Node {
    pub fn from_value(value: Value) -> Result<Self, NodeDecodeError> {
        let obj: Map<String, Value> = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(NodeDecodeError(format!(
                    "expected a JSON object for a filter node, got {other}"
                )))
            }
        };

        if obj.is_empty() {
            return Ok(Node::Empty);
        }

        let logical_keys: Vec<&str> = ["and", "or", "not"]
            .into_iter()
            .filter(|k| obj.contains_key(*k))
            .collect();

        if logical_keys.len() > 1 {
            return Err(NodeDecodeError(format!(
                "node has more than one of and/or/not: {:?}",
                logical_keys
            )));
        }

        if let Some(key) = logical_keys.first() {
            return match *key {
                "and" => {
                    let children = expect_nonempty_array(&obj, "and")?;
                    Ok(Node::And(children))
                }
                "or" => {
                    let children = expect_nonempty_array(&obj, "or")?;
                    Ok(Node::Or(children))
                }
                "not" => {
                    let child = obj
                        .get("not")
                        .cloned()
                        .ok_or_else(|| NodeDecodeError("missing not body".into()))?;
                    Ok(Node::Not(Box::new(Node::from_value(child)?)))
                }
                _ => unreachable!(),
            };
        }

        // Otherwise this must be a condition leaf.
        let cond: Cond = serde_json::from_value(Value::Object(obj))
            .map_err(|e| NodeDecodeError(format!("invalid condition: {e}")))?;
        Ok(Node::Cond(cond))
    }
}

fn expect_nonempty_array(obj: &Map<String, Value>, key: &str) -> Result<Vec<Node>, NodeDecodeError> {
    let array = obj
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| NodeDecodeError(format!("'{key}' must be a JSON array")))?;
    if array.is_empty() {
        return Err(NodeDecodeError(format!("'{key}' must be non-empty")));
    }
    array
        .iter()
        .cloned()
        .map(Node::from_value)
        .collect::<Result<Vec<_>, _>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_condition() {
        let json = serde_json::json!({
            "filter": { "and": [ { "field": "pe_ratio", "operator": "<", "value": 15 } ] }
        });
        let rule: Rule = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(rule.filter.depth(), 1);
        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn empty_filter_parses_to_empty_node() {
        let json = serde_json::json!({ "filter": {} });
        let rule: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(rule.filter, Node::Empty);
    }

    #[test]
    fn rejects_multiple_logical_keys() {
        let json = serde_json::json!({ "and": [], "or": [] });
        let err = Node::from_value(json).unwrap_err();
        assert!(err.0.contains("more than one"));
    }

    #[test]
    fn nesting_depth_counts_logical_levels() {
        let json = serde_json::json!({
            "and": [
                { "or": [
                    { "field": "pe_ratio", "operator": "<", "value": 15 },
                    { "not": { "field": "sector", "operator": "=", "value": "Energy" } }
                ]}
            ]
        });
        let node = Node::from_value(json).unwrap();
        assert_eq!(node.depth(), 3);
    }
}
