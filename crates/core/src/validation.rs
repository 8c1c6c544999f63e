//! Validation groups: constraint sets selected by operation.
//!
//! A constraint is not attached to a field unconditionally; it is attached to
//! a field *for a set of groups* (e.g. `api_admin_allergen_add`). Validating
//! under a group activates only the rules listing that group, so the same
//! field can be required when one resource is added and optional when a
//! different resource referencing it is edited.
//!
//! Cross-row uniqueness cannot be decided in memory; [`unique_checks`] hands
//! those rules back to the caller, which asks the store.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{ValidateEmail, ValidateUrl};

use crate::error::ValidationErrors;

/// Operation tag selecting active constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Group(Cow<'static, str>);

impl Group {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Group {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Borrowed view of one field value, read by path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Text(&'a str),
    Integer(i64),
    Decimal(Decimal),
    Bool(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    /// The entity has no field at this path.
    Unknown,
}

impl FieldValue<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// JSON rendering matching how the field is serialized into a row.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match *self {
            FieldValue::Null | FieldValue::Unknown => Value::Null,
            FieldValue::Text(s) => Value::String(s.to_string()),
            FieldValue::Integer(i) => Value::from(i),
            FieldValue::Decimal(d) => serde_json::to_value(d).unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Timestamp(t) => serde_json::to_value(t).unwrap_or(Value::Null),
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(value)
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(value: &'a String) -> Self {
        FieldValue::Text(value)
    }
}

impl<'a> From<&'a Option<String>> for FieldValue<'a> {
    fn from(value: &'a Option<String>) -> Self {
        value.as_deref().map_or(FieldValue::Null, FieldValue::Text)
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Decimal> for FieldValue<'_> {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<&Decimal> for FieldValue<'_> {
    fn from(value: &Decimal) -> Self {
        FieldValue::Decimal(*value)
    }
}

impl From<&Option<Decimal>> for FieldValue<'_> {
    fn from(value: &Option<Decimal>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Decimal)
    }
}

impl From<&bool> for FieldValue<'_> {
    fn from(value: &bool) -> Self {
        FieldValue::Bool(*value)
    }
}

impl From<NaiveDate> for FieldValue<'_> {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl<T> From<Option<T>> for FieldValue<'_>
where
    T: Into<Uuid>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, |v| FieldValue::Uuid(v.into()))
    }
}

/// Declarative constraint vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Not null and, for text, not empty after trimming.
    NotBlank,
    NotNull,
    /// Character count bounds for text fields.
    Length { min: Option<usize>, max: Option<usize> },
    /// Non-negative decimal with at most `scale` fraction digits.
    Numeric { scale: u32 },
    Range { min: Option<i64>, max: Option<i64> },
    /// Integer code must be one of the listed values.
    Choice(&'static [i64]),
    Email,
    /// Absolute URL.
    Url,
    /// Text must follow a mask where `9` is any digit and every other
    /// character is literal, e.g. `(999) 999-9999`.
    Mask(&'static str),
    /// Date field must not precede the named date field.
    NotBefore(&'static str),
    /// No other row of the same type may share this field together with
    /// the listed sibling fields (list `space_id` for per-tenant keys).
    UniqueWith(&'static [&'static str]),
}

/// A constraint attached to one field for a set of groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub field: &'static str,
    pub constraint: Constraint,
    pub groups: &'static [&'static str],
}

impl Rule {
    pub const fn new(
        field: &'static str,
        constraint: Constraint,
        groups: &'static [&'static str],
    ) -> Self {
        Self {
            field,
            constraint,
            groups,
        }
    }

    pub fn applies_to(&self, groups: &[Group]) -> bool {
        groups
            .iter()
            .any(|g| self.groups.iter().any(|name| *name == g.as_str()))
    }
}

/// Entities exposing per-operation constraints.
///
/// `rules()` is the (entity type, operation) → constraints table; the
/// operation half is applied by [`Validate::constraints_for`].
pub trait Validate {
    fn rules() -> Vec<Rule>;

    /// Read a field by path. Unknown paths return [`FieldValue::Unknown`].
    fn field(&self, path: &str) -> FieldValue<'_>;

    fn constraints_for(groups: &[Group]) -> Vec<Rule> {
        Self::rules()
            .into_iter()
            .filter(|r| r.applies_to(groups))
            .collect()
    }

    /// Conditional checks that a flat rule table cannot express.
    fn check(&self, _groups: &[Group], _errors: &mut ValidationErrors) {}
}

/// Add/edit group names of a resource.
pub trait Operations {
    const ADD: &'static str;
    const EDIT: &'static str;

    fn add_groups() -> Vec<Group> {
        vec![Group::from_static(Self::ADD)]
    }

    fn edit_groups() -> Vec<Group> {
        vec![Group::from_static(Self::EDIT)]
    }
}

/// A uniqueness rule resolved against concrete values.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueCheck {
    /// Field path the violation is reported under.
    pub field: &'static str,
    pub columns: Vec<(&'static str, serde_json::Value)>,
}

/// Validate an entity under the given groups.
///
/// With no groups only group-less rules would apply, and the rule tables
/// declare none, so plain construction is never rejected here.
pub fn validate<T: Validate>(entity: &T, groups: &[Group]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for rule in T::constraints_for(groups) {
        if let Some(message) = violation(entity, &rule) {
            errors.add(rule.field, message);
        }
    }
    entity.check(groups, &mut errors);
    errors.into_result()
}

/// Uniqueness rules active under `groups`, bound to the entity's values.
///
/// Checks where the primary field is null are skipped: null never collides.
pub fn unique_checks<T: Validate>(entity: &T, groups: &[Group]) -> Vec<UniqueCheck> {
    T::constraints_for(groups)
        .into_iter()
        .filter_map(|rule| match rule.constraint {
            Constraint::UniqueWith(siblings) => {
                let value = entity.field(rule.field);
                if value.is_null() {
                    return None;
                }
                let mut columns = vec![(rule.field, value.to_json())];
                columns.extend(siblings.iter().map(|s| (*s, entity.field(s).to_json())));
                Some(UniqueCheck {
                    field: rule.field,
                    columns,
                })
            }
            _ => None,
        })
        .collect()
}

fn violation<T: Validate>(entity: &T, rule: &Rule) -> Option<String> {
    let value = entity.field(rule.field);
    match (&rule.constraint, value) {
        (_, FieldValue::Unknown) => {
            tracing::debug!(field = rule.field, "rule targets unknown field");
            None
        }
        (Constraint::NotBlank, FieldValue::Null) => Some(BLANK.to_string()),
        (Constraint::NotBlank, FieldValue::Text(s)) if s.trim().is_empty() => {
            Some(BLANK.to_string())
        }
        (Constraint::NotNull, FieldValue::Null) => Some("This value should not be null.".into()),
        (Constraint::Length { min, max }, FieldValue::Text(s)) => {
            let len = s.chars().count();
            if let Some(min) = min.filter(|m| len < *m) {
                return Some(format!(
                    "This value is too short. It should have {min} characters or more."
                ));
            }
            if let Some(max) = max.filter(|m| len > *m) {
                return Some(format!(
                    "This value is too long. It should have {max} characters or less."
                ));
            }
            None
        }
        (Constraint::Numeric { scale }, FieldValue::Decimal(d)) => {
            (!fits_scale(d, *scale)).then(|| numeric_message(*scale))
        }
        (Constraint::Numeric { scale }, FieldValue::Text(s)) => match Decimal::from_str(s.trim()) {
            Ok(d) if fits_scale(d, *scale) => None,
            _ => Some(numeric_message(*scale)),
        },
        (Constraint::Range { min, max }, FieldValue::Integer(i)) => {
            if min.is_some_and(|m| i < m) || max.is_some_and(|m| i > m) {
                Some(range_message(*min, *max))
            } else {
                None
            }
        }
        (Constraint::Choice(allowed), FieldValue::Integer(i)) => (!allowed.contains(&i))
            .then(|| "The value you selected is not a valid choice.".to_string()),
        (Constraint::Email, FieldValue::Text(s)) => (!s.validate_email())
            .then(|| "This value is not a valid email address.".to_string()),
        (Constraint::Url, FieldValue::Text(s)) if !s.is_empty() => {
            (!s.validate_url()).then(|| "This value is not a valid URL.".to_string())
        }
        (Constraint::Mask(mask), FieldValue::Text(s)) => {
            (!matches_mask(s, mask)).then(|| mask_message(mask))
        }
        (Constraint::NotBefore(other), FieldValue::Date(d)) => match entity.field(other) {
            FieldValue::Date(o) if d < o => Some(format!("This value should not be before {other}.")),
            _ => None,
        },
        _ => None,
    }
}

const BLANK: &str = "This value should not be blank.";

fn numeric_message(scale: u32) -> String {
    format!("This value should be a positive number with at most {scale} decimal places.")
}

fn range_message(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("This value should be between {min} and {max}."),
        (Some(min), None) => format!("This value should be {min} or more."),
        (None, Some(max)) => format!("This value should be {max} or less."),
        (None, None) => "This value is out of range.".to_string(),
    }
}

fn mask_message(mask: &str) -> String {
    format!("This value should match {mask}.")
}

/// Non-negative and no more fraction digits than `scale`.
fn fits_scale(d: Decimal, scale: u32) -> bool {
    !d.is_sign_negative() && d.normalize().scale() <= scale
}

/// Anchored pattern for a mask: `9` is one ASCII digit, anything else is
/// literal.
fn mask_pattern(mask: &str) -> String {
    let mut pattern = String::from("^");
    for c in mask.chars() {
        match c {
            '9' => pattern.push_str("[0-9]"),
            lit => pattern.push_str(&regex::escape(lit.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    pattern
}

/// Whether `value` follows `mask` (see [`Constraint::Mask`]).
pub fn matches_mask(value: &str, mask: &str) -> bool {
    match Regex::new(&mask_pattern(mask)) {
        Ok(re) => re.is_match(value),
        Err(e) => {
            tracing::warn!(mask, error = %e, "mask does not compile");
            false
        }
    }
}

/// Violation message for a value not following `mask`.
pub fn mask_violation(value: &str, mask: &str) -> Option<String> {
    (!matches_mask(value, mask)).then(|| mask_message(mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADD: &str = "widget_add";
    const EDIT: &str = "widget_edit";

    struct Widget {
        title: String,
        amount: Decimal,
        code: i64,
        email: Option<String>,
        website: Option<String>,
        start: NaiveDate,
        end: Option<NaiveDate>,
    }

    impl Validate for Widget {
        fn rules() -> Vec<Rule> {
            vec![
                Rule::new("title", Constraint::NotBlank, &[ADD, EDIT]),
                Rule::new("title", Constraint::Length { min: None, max: Some(5) }, &[ADD, EDIT]),
                Rule::new("title", Constraint::UniqueWith(&["space_id"]), &[ADD]),
                Rule::new("amount", Constraint::Numeric { scale: 2 }, &[ADD]),
                Rule::new("code", Constraint::Choice(&[1, 2]), &[EDIT]),
                Rule::new("email", Constraint::Email, &[ADD]),
                Rule::new("website", Constraint::Url, &[ADD]),
                Rule::new("end", Constraint::NotBefore("start"), &[ADD]),
            ]
        }

        fn field(&self, path: &str) -> FieldValue<'_> {
            match path {
                "title" => (&self.title).into(),
                "amount" => (&self.amount).into(),
                "code" => self.code.into(),
                "email" => (&self.email).into(),
                "website" => (&self.website).into(),
                "start" => self.start.into(),
                "end" => self.end.map_or(FieldValue::Null, FieldValue::Date),
                "space_id" => FieldValue::Text("space"),
                _ => FieldValue::Unknown,
            }
        }
    }

    fn widget() -> Widget {
        Widget {
            title: "ok".into(),
            amount: Decimal::new(1050, 2),
            code: 1,
            email: None,
            website: None,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: None,
        }
    }

    fn add() -> Vec<Group> {
        vec![Group::from_static(ADD)]
    }

    #[test]
    fn valid_widget_passes_add() {
        assert!(validate(&widget(), &add()).is_ok());
    }

    #[test]
    fn blank_title_only_fails_inside_a_group() {
        let mut w = widget();
        w.title = "   ".into();
        let errors = validate(&w, &add()).unwrap_err();
        assert!(errors.contains("title"));
        assert!(validate(&w, &[]).is_ok());
    }

    #[test]
    fn group_selects_rules() {
        let mut w = widget();
        w.code = 9;
        w.amount = Decimal::new(1234, 3);
        // `code` is only constrained on edit, `amount` only on add.
        let on_add = validate(&w, &add()).unwrap_err();
        assert!(on_add.contains("amount"));
        assert!(!on_add.contains("code"));

        let on_edit = validate(&w, &[Group::from_static(EDIT)]).unwrap_err();
        assert!(on_edit.contains("code"));
        assert!(!on_edit.contains("amount"));
    }

    #[test]
    fn length_email_and_date_order() {
        let mut w = widget();
        w.title = "too long".into();
        w.email = Some("nobody".into());
        w.website = Some("clinic dot example".into());
        w.end = NaiveDate::from_ymd_opt(2023, 12, 31);
        let errors = validate(&w, &add()).unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("email"));
        assert!(errors.contains("website"));
        assert!(errors.contains("end"));

        w.title = "ok".into();
        w.email = Some("nurse@example.org".into());
        w.website = Some("https://clinic.example/team".into());
        w.end = None;
        assert!(validate(&w, &add()).is_ok());
    }

    #[test]
    fn unique_checks_bind_values() {
        let checks = unique_checks(&widget(), &add());
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].field, "title");
        assert_eq!(
            checks[0].columns,
            vec![
                ("title", serde_json::json!("ok")),
                ("space_id", serde_json::json!("space")),
            ]
        );
        assert!(unique_checks(&widget(), &[Group::from_static(EDIT)]).is_empty());
    }

    #[test]
    fn numeric_scale_counts_significant_fraction_digits() {
        assert!(fits_scale(Decimal::new(1250, 2), 2));
        assert!(fits_scale(Decimal::new(12500, 3), 2));
        assert!(!fits_scale(Decimal::new(12505, 3), 2));
        assert!(!fits_scale(Decimal::new(-1, 0), 2));

        let rule = Rule::new("amount", Constraint::Numeric { scale: 2 }, &[ADD]);
        let mut w = widget();
        w.title = "12.50".into();
        let as_text = Rule { field: "title", ..rule.clone() };
        assert!(violation(&w, &as_text).is_none());
        w.title = "12.5x".into();
        assert!(violation(&w, &as_text).is_some());
        assert!(violation(&w, &rule).is_none());
    }

    #[test]
    fn masks_compile_to_anchored_patterns() {
        assert!(matches_mask("(555) 123-4567", "(999) 999-9999"));
        assert!(!matches_mask("555-123-4567", "(999) 999-9999"));
        assert!(!matches_mask("(555) 123-45678", "(999) 999-9999"));
        assert!(matches_mask("91203", "99999"));
        assert!(!matches_mask("9120", "99999"));
        assert_eq!(
            mask_violation("12", "99999").as_deref(),
            Some("This value should match 99999.")
        );
    }
}
