//! The field catalog: the whitelist of screenable attributes (§3.1, §4.2).
//!
//! Loaded once at process start from the static table below and never
//! mutated again. Every other component (translator, validator, compiler)
//! is constructed with an owned `Arc<FieldCatalog>` — no dynamic lookup
//! service, per the design note in spec §9.

mod field;
mod table_data;

pub use field::{
    DerivedFormula, Field, FieldKind, FieldSource, Operator, Scale, TableRef, ValueRange,
};

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The process-wide field catalog.
#[derive(Debug)]
pub struct FieldCatalog {
    by_name: HashMap<&'static str, &'static Field>,
    by_alias: HashMap<String, &'static Field>,
}

/// The default, and only, catalog instance — a fixed financial-data schema.
pub static CATALOG: Lazy<FieldCatalog> = Lazy::new(FieldCatalog::build);

impl FieldCatalog {
    fn build() -> Self {
        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();

        for field in table_data::FIELDS {
            if by_name.insert(field.name, field).is_some() {
                panic!("duplicate catalog field name: {}", field.name);
            }
            for alias in field.aliases {
                by_alias.insert(normalize_phrase(alias), field);
            }
        }

        // Invariant check (§3.1): derived entries reference only
        // non-derived entries transitively. Our formulas are one level
        // deep (ratio of two plain columns), so this reduces to checking
        // that neither side of a derived formula is itself derived.
        for field in table_data::FIELDS {
            if let FieldSource::Derived(formula) = &field.source {
                for side in [formula.numerator, formula.denominator] {
                    let referenced = by_name
                        .get(side)
                        .unwrap_or_else(|| panic!("{} references unknown field {}", field.name, side));
                    assert!(
                        !referenced.is_derived(),
                        "{} references derived field {} transitively",
                        field.name,
                        side
                    );
                }
                for guard in formula.guarded_inputs {
                    assert!(
                        by_name.contains_key(guard),
                        "{} declares unknown guarded input {}",
                        field.name,
                        guard
                    );
                }
            }
        }

        Self { by_name, by_alias }
    }

    /// Resolve a canonical field name.
    pub fn resolve(&self, name: &str) -> Option<&'static Field> {
        self.by_name.get(name).copied()
    }

    /// Resolve a free-form phrase via alias lookup, used only by the
    /// Translator (§4.1 step 6): exact alias match, then longest-key
    /// substring match over normalized text.
    pub fn resolve_alias(&self, phrase: &str) -> Option<&'static Field> {
        let normalized = normalize_phrase(phrase);
        if let Some(field) = self.by_alias.get(&normalized) {
            return Some(field);
        }
        if let Some(field) = self.by_name.get(normalized.as_str()) {
            return Some(field);
        }

        let mut candidates: Vec<(&String, &&'static Field)> = self
            .by_alias
            .iter()
            .filter(|(alias, _)| normalized.contains(alias.as_str()))
            .collect();
        candidates.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));
        candidates.first().map(|(_, field)| **field)
    }

    pub fn allows(&self, field: &Field, op: Operator) -> bool {
        field.allows(op)
    }

    pub fn derived_formula(&self, field: &Field) -> Option<&DerivedFormula> {
        match &field.source {
            FieldSource::Derived(formula) => Some(formula),
            FieldSource::Column { .. } => None,
        }
    }

    /// The growth sibling of a base metric, used by the Translator for
    /// "increasing/growing <field>" phrases (§4.1 step 5).
    pub fn growth_sibling(&self, base: &str) -> Option<&'static Field> {
        self.resolve(&format!("{base}_growth_yoy"))
    }

    pub fn all_fields(&self) -> impl Iterator<Item = &'static Field> + '_ {
        self.by_name.values().copied()
    }
}

/// Lowercase and strip punctuation, collapsing whitespace — the
/// normalization the Translator and catalog alias lookup share (§4.1
/// step 6).
pub fn normalize_phrase(phrase: &str) -> String {
    let mut out = String::with_capacity(phrase.len());
    let mut last_was_space = true;
    for ch in phrase.to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds_without_panicking() {
        let _ = &*CATALOG;
    }

    #[test]
    fn resolves_canonical_name() {
        let field = CATALOG.resolve("pe_ratio").expect("pe_ratio in catalog");
        assert_eq!(field.name, "pe_ratio");
    }

    #[test]
    fn resolves_alias_case_and_punctuation_insensitive() {
        let field = CATALOG
            .resolve_alias("P/E Ratio")
            .expect("alias should resolve");
        assert_eq!(field.name, "pe_ratio");
    }

    #[test]
    fn unknown_phrase_does_not_resolve() {
        assert!(CATALOG.resolve_alias("quantum flux capacitor").is_none());
    }

    #[test]
    fn derived_fields_reference_only_plain_columns() {
        for field in CATALOG.all_fields() {
            if let FieldSource::Derived(formula) = &field.source {
                let num = CATALOG.resolve(formula.numerator).unwrap();
                let den = CATALOG.resolve(formula.denominator).unwrap();
                assert!(!num.is_derived());
                assert!(!den.is_derived());
            }
        }
    }
}
