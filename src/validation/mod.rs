//! The Validator (§4.3): normalizes and checks a DSL tree built by the
//! Translator (or submitted directly over the API) before it reaches the
//! Compiler. Collects every diagnostic in one pass rather than
//! failing fast on the first bad node, per §4.3's closing note.

mod error;

pub use error::{Diagnostic, ErrorKind};

use crate::catalog::{FieldCatalog, FieldKind, Operator};
use crate::dsl::{Aggregation, Cond, Node, NullHandling, Period, PeriodType, Rule, Sort};
use serde_json::Value;

/// Tunables the validator needs from `config` (§6.5 `[validator]`).
#[derive(Debug, Clone, Copy)]
pub struct ValidatorSettings {
    pub max_nesting_depth: usize,
    pub max_limit: u32,
    /// When true, warnings (`Ambiguity`, `DataAvailability`) are promoted
    /// to blocking errors. Off by default.
    pub strict_mode: bool,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            max_nesting_depth: crate::dsl::DEFAULT_MAX_NESTING_DEPTH,
            max_limit: 1000,
            strict_mode: false,
        }
    }
}

/// A validated rule plus any warnings collected along the way. Only
/// produced when no blocking diagnostic was raised.
#[derive(Debug, Clone)]
pub struct Validated {
    pub rule: Rule,
    pub warnings: Vec<Diagnostic>,
}

/// Validate and normalize `rule` in place, returning either the
/// normalized rule with its warnings, or every diagnostic collected
/// (blocking and warning) if at least one blocking diagnostic fired.
pub fn validate(
    mut rule: Rule,
    catalog: &FieldCatalog,
    settings: &ValidatorSettings,
) -> Result<Validated, Vec<Diagnostic>> {
    let mut diags = Vec::new();

    // Phase 1: structural — nesting depth.
    let depth = rule.filter.depth();
    if depth > settings.max_nesting_depth {
        diags.push(
            Diagnostic::new(
                "filter",
                ErrorKind::RuleValidity,
                format!(
                    "filter nests {depth} levels deep, exceeding the configured maximum of {}",
                    settings.max_nesting_depth
                ),
            )
            .with_suggestion("flatten sibling conditions into a single and/or where possible"),
        );
    }

    // Phase 2-8: walk the tree, resolving/canonicalizing fields and
    // operators and checking value shape, range, period legality, and
    // derived-metric safety.
    walk_node(&mut rule.filter, "filter", catalog, &mut diags);

    // Phase 7: logical conflict detection across AND siblings.
    check_conflicts(&rule.filter, "filter", &mut diags);

    // Phase 9: meta — limit and sort.
    if let Some(limit) = rule.limit {
        if limit == 0 || limit > settings.max_limit {
            diags.push(Diagnostic::new(
                "limit",
                ErrorKind::RuleValidity,
                format!("limit {limit} is outside the allowed range 1..={}", settings.max_limit),
            ));
        }
    }
    if let Some(sort) = &rule.sort {
        check_sort(sort, catalog, &mut diags);
    }

    let (blocking, warnings): (Vec<_>, Vec<_>) =
        diags.into_iter().partition(|d| !d.is_warning() || settings.strict_mode);

    if !blocking.is_empty() {
        let mut all = blocking;
        all.extend(warnings);
        return Err(all);
    }

    Ok(Validated { rule, warnings })
}

fn check_sort(sort: &Sort, catalog: &FieldCatalog, diags: &mut Vec<Diagnostic>) {
    if catalog.resolve(&sort.field).is_none() && catalog.resolve_alias(&sort.field).is_none() {
        diags.push(Diagnostic::new(
            "sort.field",
            ErrorKind::RuleValidity,
            format!("unknown sort field '{}'", sort.field),
        ));
    }
}

fn walk_node(node: &mut Node, path: &str, catalog: &FieldCatalog, diags: &mut Vec<Diagnostic>) {
    match node {
        Node::And(children) | Node::Or(children) => {
            for (i, child) in children.iter_mut().enumerate() {
                walk_node(child, &format!("{path}[{i}]"), catalog, diags);
            }
        }
        Node::Not(child) => walk_node(child, &format!("{path}.not"), catalog, diags),
        Node::Cond(cond) => validate_cond(cond, path, catalog, diags),
        Node::Empty => {}
    }
}

fn validate_cond(cond: &mut Cond, path: &str, catalog: &FieldCatalog, diags: &mut Vec<Diagnostic>) {
    // Phase 2: field resolution, alias rewrite to canonical name.
    let field = match catalog.resolve(&cond.field) {
        Some(field) => field,
        None => match catalog.resolve_alias(&cond.field) {
            Some(field) => {
                cond.field = field.name.to_string();
                field
            }
            None => {
                diags.push(Diagnostic::new(
                    format!("{path}.field"),
                    ErrorKind::RuleValidity,
                    format!("unknown field '{}'", cond.field),
                ));
                return;
            }
        },
    };

    // Phase 3: operator validity, with legacy spelling canonicalization.
    let canonical_op = match cond.operator.as_str() {
        "above" => ">",
        "below" => "<",
        other => other,
    };
    if canonical_op != cond.operator {
        cond.operator = canonical_op.to_string();
    }
    let op = match Operator::from_str(&cond.operator) {
        Some(op) => op,
        None => {
            diags.push(Diagnostic::new(
                format!("{path}.operator"),
                ErrorKind::RuleValidity,
                format!("unrecognized operator '{}'", cond.operator),
            ));
            return;
        }
    };
    if !field.allows(op) {
        diags.push(
            Diagnostic::new(
                format!("{path}.operator"),
                ErrorKind::RuleValidity,
                format!("operator '{}' is not permitted on field '{}'", op.as_str(), field.name),
            )
            .with_suggestion(format!(
                "allowed operators: {}",
                field
                    .allowed_operators
                    .iter()
                    .map(Operator::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        );
        return;
    }

    // Phase 6: period legality.
    if let Some(period) = &cond.period {
        if !field.time_series {
            diags.push(Diagnostic::new(
                format!("{path}.period"),
                ErrorKind::RuleValidity,
                format!("field '{}' is not a time series and cannot carry a period", field.name),
            ));
        } else {
            check_period(period, path, diags);
        }
    } else if op.is_trend() {
        diags.push(Diagnostic::new(
            format!("{path}.operator"),
            ErrorKind::RuleValidity,
            "trend operators require a period",
        ));
    } else if field.time_series {
        diags.push(
            Diagnostic::new(
                format!("{path}.period"),
                ErrorKind::Ambiguity,
                format!(
                    "'{}' is a time series but no period was given; defaulting to the latest snapshot",
                    field.name
                ),
            )
            .with_suggestion("add an explicit period to remove ambiguity"),
        );
    }

    // value_is_field: the value names another catalog field, not a literal.
    if cond.value_is_field {
        let referenced = cond
            .value
            .as_str()
            .and_then(|name| catalog.resolve(name).or_else(|| catalog.resolve_alias(name)));
        match referenced {
            Some(other) if other.kind == field.kind => {}
            Some(other) => {
                diags.push(Diagnostic::new(
                    format!("{path}.value"),
                    ErrorKind::RuleValidity,
                    format!(
                        "cross-field comparison between '{}' ({:?}) and '{}' ({:?}) has incompatible kinds",
                        field.name, field.kind, other.name, other.kind
                    ),
                ));
            }
            None => {
                diags.push(Diagnostic::new(
                    format!("{path}.value"),
                    ErrorKind::RuleValidity,
                    "value_is_field is set but value is not a known field name",
                ));
            }
        }
        return;
    }

    // Phase 4: value shape per operator arity, plus unit rescaling.
    normalize_value_scale(cond, field.kind, field.scale);
    check_value_shape(cond, op, path, diags);

    // Phase 5: range sanity (advisory).
    if let (Some(range), Some(n)) = (field.value_range, cond.value.as_f64()) {
        if n < range.min || n > range.max {
            diags.push(Diagnostic::new(
                format!("{path}.value"),
                ErrorKind::DataAvailability,
                format!(
                    "value {n} for '{}' is outside the observed historical range [{}, {}]",
                    field.name, range.min, range.max
                ),
            ));
        }
    }

    // Phase 8: derived-metric safety.
    if let Some(formula) = catalog.derived_formula(field) {
        if formula.guarded_inputs.is_empty() {
            diags.push(Diagnostic::new(
                path,
                ErrorKind::MetricSafety,
                format!(
                    "derived field '{}' has no declared guard for its denominator '{}'",
                    field.name, formula.denominator
                ),
            ));
        }
    }

    let _ = NullHandling::Exclude;
}

fn check_period(period: &Period, path: &str, diags: &mut Vec<Diagnostic>) {
    if period.n == 0 {
        diags.push(Diagnostic::new(
            format!("{path}.period.n"),
            ErrorKind::RuleValidity,
            "period.n must be at least 1",
        ));
        return;
    }
    if period.n > 20 {
        diags.push(Diagnostic::new(
            format!("{path}.period.n"),
            ErrorKind::RuleValidity,
            "period.n must not exceed 20",
        ));
        return;
    }

    // Phase 10: data-availability warnings for windows likely to exceed
    // the store's retained history.
    let likely_exceeds = match period.period_type {
        PeriodType::LastNQuarters => period.n > 12,
        PeriodType::LastNYears => period.n > 10,
        _ => false,
    };
    if likely_exceeds {
        diags.push(Diagnostic::new(
            format!("{path}.period.n"),
            ErrorKind::DataAvailability,
            format!("requested window of {} likely exceeds retained history", period.n),
        ));
    }

    if matches!(period.aggregation, Aggregation::Trend) && period.n < 2 {
        diags.push(Diagnostic::new(
            format!("{path}.period"),
            ErrorKind::RuleValidity,
            "trend aggregation requires at least 2 periods",
        ));
    }
}

fn check_value_shape(cond: &Cond, op: Operator, path: &str, diags: &mut Vec<Diagnostic>) {
    match op {
        Operator::Between => match cond.value.as_array() {
            Some(arr) if arr.len() == 2 => {
                if let (Some(lo), Some(hi)) = (arr[0].as_f64(), arr[1].as_f64()) {
                    if lo >= hi {
                        diags.push(Diagnostic::new(
                            format!("{path}.value"),
                            ErrorKind::RuleValidity,
                            "between requires value[0] < value[1]",
                        ));
                    }
                } else {
                    diags.push(Diagnostic::new(
                        format!("{path}.value"),
                        ErrorKind::RuleValidity,
                        "between requires two numeric bounds",
                    ));
                }
            }
            _ => diags.push(Diagnostic::new(
                format!("{path}.value"),
                ErrorKind::RuleValidity,
                "between requires a 2-element array [min, max]",
            )),
        },
        Operator::In | Operator::NotIn => match cond.value.as_array() {
            Some(arr) if !arr.is_empty() => {}
            _ => diags.push(Diagnostic::new(
                format!("{path}.value"),
                ErrorKind::RuleValidity,
                format!("{} requires a non-empty array", op.as_str()),
            )),
        },
        Operator::Exists => {
            if !cond.value.is_boolean() {
                diags.push(Diagnostic::new(
                    format!("{path}.value"),
                    ErrorKind::RuleValidity,
                    "exists requires a boolean value",
                ));
            }
        }
        Operator::Increasing | Operator::Decreasing | Operator::Stable => {
            // Trend operators ignore `value`; nothing to check.
        }
        Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge | Operator::Eq | Operator::Ne => {
            if cond.value.is_array() {
                diags.push(Diagnostic::new(
                    format!("{path}.value"),
                    ErrorKind::RuleValidity,
                    format!("{} requires a scalar value", op.as_str()),
                ));
            }
        }
    }
}

/// Rescale percent-like literals entered as whole numbers (e.g. `12` for
/// 12%) down to the fraction the store expects (`0.12`), per §4.1 step 5
/// and the lifecycle note in §3.2. Applied defensively here too, since a
/// DSL tree can arrive directly over the API without passing through the
/// Translator.
fn normalize_value_scale(cond: &mut Cond, kind: FieldKind, scale: crate::catalog::Scale) {
    if scale != crate::catalog::Scale::Fraction || kind != FieldKind::Percentage {
        return;
    }
    let rescale = |v: &mut Value| {
        if let Some(n) = v.as_f64() {
            if n.abs() > 1.0 {
                *v = serde_json::json!(n / 100.0);
            }
        }
    };
    match &mut cond.value {
        Value::Array(items) => items.iter_mut().for_each(rescale),
        v => rescale(v),
    }
}

/// Detect statically-unsatisfiable comparison sets among AND-level
/// siblings on the same field (§4.3 phase 7, §7 `LogicalConflict`).
/// Limited to the scalar comparison operators; `between`/`in` are left
/// to the compiler's `NOT EXISTS` semantics rather than approximated here.
fn check_conflicts(node: &Node, path: &str, diags: &mut Vec<Diagnostic>) {
    match node {
        Node::And(children) => {
            let mut by_field: std::collections::HashMap<&str, Vec<(&Cond, Operator)>> =
                std::collections::HashMap::new();
            for child in children {
                if let Node::Cond(cond) = child {
                    if cond.period.is_some() || cond.value_is_field {
                        continue;
                    }
                    if let Some(op) = Operator::from_str(&cond.operator) {
                        by_field.entry(cond.field.as_str()).or_default().push((cond, op));
                    }
                }
            }
            for (field, conds) in by_field {
                if let Some(msg) = find_interval_conflict(&conds) {
                    diags.push(Diagnostic::new(
                        path,
                        ErrorKind::LogicalConflict,
                        format!("conditions on '{field}' cannot all be satisfied: {msg}"),
                    ));
                }
            }
            for (i, child) in children.iter().enumerate() {
                check_conflicts(child, &format!("{path}[{i}]"), diags);
            }
        }
        Node::Or(children) => {
            for (i, child) in children.iter().enumerate() {
                check_conflicts(child, &format!("{path}[{i}]"), diags);
            }
        }
        Node::Not(child) => check_conflicts(child, &format!("{path}.not"), diags),
        Node::Cond(_) | Node::Empty => {}
    }
}

fn find_interval_conflict(conds: &[(&Cond, Operator)]) -> Option<String> {
    let mut lower: Option<f64> = None;
    let mut upper: Option<f64> = None;
    let mut equals: Vec<f64> = Vec::new();

    for (cond, op) in conds {
        let Some(n) = cond.value.as_f64() else { continue };
        match op {
            Operator::Gt | Operator::Ge => lower = Some(lower.map_or(n, |l: f64| l.max(n))),
            Operator::Lt | Operator::Le => upper = Some(upper.map_or(n, |u: f64| u.min(n))),
            Operator::Eq => equals.push(n),
            _ => {}
        }
    }

    if let (Some(l), Some(u)) = (lower, upper) {
        if l >= u {
            return Some(format!("lower bound {l} is not below upper bound {u}"));
        }
    }
    if let Some(first) = equals.first() {
        if equals.iter().any(|v| v != first) {
            return Some("requires equality to two different values at once".to_string());
        }
        if let Some(l) = lower {
            if *first <= l {
                return Some(format!("equality to {first} conflicts with lower bound {l}"));
            }
        }
        if let Some(u) = upper {
            if *first >= u {
                return Some(format!("equality to {first} conflicts with upper bound {u}"));
            }
        }
    }
    None
}
