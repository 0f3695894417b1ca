//! String and boolean expressions over named configuration values
//!
//! A [`Property`] resolves to a string and a [`Condition`] to a boolean,
//! both against a [`Context`] that carries the active [`Provider`]. They are
//! re-evaluated at every node visit, so the same expression can yield
//! different values under differently scoped plans.

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Not};
use std::sync::Arc;

use regex::Regex;

use crate::provider::Provider;

/// Resolution context handed to properties, conditions and processors
#[derive(Clone, Copy)]
pub struct Context<'a> {
    properties: &'a Provider,
}

impl<'a> Context<'a> {
    pub fn new(properties: &'a Provider) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &'a Provider {
        self.properties
    }

    /// Value of a named property, or `""` if it is not defined
    pub fn get(&self, name: &str) -> String {
        self.properties.get(name).unwrap_or_default()
    }

    pub fn eval(&self, property: &Property) -> String {
        property.resolve(self)
    }

    pub fn check(&self, condition: &Condition) -> bool {
        condition.holds(self)
    }
}

/// A string-valued expression
#[derive(Clone)]
pub struct Property(Arc<dyn Fn(&Context<'_>) -> String + Send + Sync>);

impl Property {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A property whose value is the given text
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| text.clone())
    }

    /// A property looked up by name in the active provider
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |cx| cx.get(&name))
    }

    pub fn resolve(&self, cx: &Context<'_>) -> String {
        (self.0)(cx)
    }

    /// This property's value followed by `other`'s
    pub fn concat(&self, other: impl Into<Property>) -> Property {
        let (left, right) = (self.clone(), other.into());
        Property::new(move |cx| {
            let mut value = left.resolve(cx);
            value.push_str(&right.resolve(cx));
            value
        })
    }

    pub fn equals(&self, other: impl Into<Property>) -> Condition {
        self.compare(other.into(), |a, b| a == b)
    }

    pub fn not_equals(&self, other: impl Into<Property>) -> Condition {
        self.compare(other.into(), |a, b| a != b)
    }

    pub fn equals_ignore_case(&self, other: impl Into<Property>) -> Condition {
        self.compare(other.into(), eq_ignore_case)
    }

    pub fn not_equals_ignore_case(&self, other: impl Into<Property>) -> Condition {
        self.compare(other.into(), |a, b| !eq_ignore_case(a, b))
    }

    /// A condition that holds if the whole value matches `pattern`.
    ///
    /// The pattern is compiled here, so an invalid pattern fails immediately.
    pub fn matches(&self, pattern: &str) -> Result<Condition, regex::Error> {
        Regex::new(pattern)?;
        let regex = Regex::new(&format!(r"\A(?:{})\z", pattern))?;
        let prop = self.clone();
        Ok(Condition::new(move |cx| regex.is_match(&prop.resolve(cx))))
    }

    fn compare(&self, other: Property, op: fn(&str, &str) -> bool) -> Condition {
        let left = self.clone();
        Condition::new(move |cx| op(&left.resolve(cx), &other.resolve(cx)))
    }
}

/// Shorthand for [`Property::literal`]
pub fn literally(text: impl Into<String>) -> Property {
    Property::literal(text)
}

/// Shorthand for [`Property::named`]
pub fn property(name: impl Into<String>) -> Property {
    Property::named(name)
}

impl From<&str> for Property {
    fn from(text: &str) -> Self {
        Property::literal(text)
    }
}

impl From<String> for Property {
    fn from(text: String) -> Self {
        Property::literal(text)
    }
}

impl From<&Property> for Property {
    fn from(prop: &Property) -> Self {
        prop.clone()
    }
}

impl<P: Into<Property>> Add<P> for Property {
    type Output = Property;

    fn add(self, rhs: P) -> Property {
        self.concat(rhs)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Property(..)")
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// A boolean-valued expression
#[derive(Clone)]
pub struct Condition(Arc<dyn Fn(&Context<'_>) -> bool + Send + Sync>);

impl Condition {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// The condition that always holds
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn holds(&self, cx: &Context<'_>) -> bool {
        (self.0)(cx)
    }

    pub fn and(&self, other: &Condition) -> Condition {
        let (left, right) = (self.clone(), other.clone());
        Condition::new(move |cx| left.holds(cx) && right.holds(cx))
    }

    pub fn or(&self, other: &Condition) -> Condition {
        let (left, right) = (self.clone(), other.clone());
        Condition::new(move |cx| left.holds(cx) || right.holds(cx))
    }

    pub fn negate(&self) -> Condition {
        let inner = self.clone();
        Condition::new(move |cx| !inner.holds(cx))
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        self.and(&rhs)
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        self.or(&rhs)
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        self.negate()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// Holds if the named property spells out `value` (`"true"`/`"false"`), ignoring case
pub fn flag(value: bool, name: &str) -> Condition {
    flag_of(value, &property(name))
}

/// Holds if `prop` spells out `value` (`"true"`/`"false"`), ignoring case
pub fn flag_of(value: bool, prop: &Property) -> Condition {
    prop.equals_ignore_case(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        Provider::from_pairs([
            ("name", "Reffurence"),
            ("greeting", "Hello"),
            ("dark", "TRUE"),
            ("number", "#12"),
        ])
    }

    #[test]
    fn test_literal_and_named() {
        let p = provider();
        let cx = Context::new(&p);
        assert_eq!(cx.eval(&literally("x")), "x");
        assert_eq!(cx.eval(&property("name")), "Reffurence");
    }

    #[test]
    fn test_undefined_property_is_empty() {
        let p = Provider::empty();
        let cx = Context::new(&p);
        assert_eq!(cx.eval(&property("missing")), "");
        assert!(cx.check(&property("missing").equals("")));
    }

    #[test]
    fn test_concat() {
        let p = provider();
        let cx = Context::new(&p);
        let greeting = property("greeting") + ", " + property("name");
        assert_eq!(cx.eval(&greeting), "Hello, Reffurence");
    }

    #[test]
    fn test_equality() {
        let p = provider();
        let cx = Context::new(&p);
        assert!(cx.check(&property("name").equals("Reffurence")));
        assert!(!cx.check(&property("name").equals("reffurence")));
        assert!(cx.check(&property("name").not_equals(property("greeting"))));
        assert!(cx.check(&property("name").equals_ignore_case("REFFURENCE")));
        assert!(!cx.check(&property("name").not_equals_ignore_case("reffurence")));
    }

    #[test]
    fn test_ignore_case_is_unicode_aware() {
        let p = Provider::from_pairs([("city", "ÅRHUS")]);
        let cx = Context::new(&p);
        assert!(cx.check(&property("city").equals_ignore_case("århus")));
    }

    #[test]
    fn test_matches_is_full_match() {
        let p = provider();
        let cx = Context::new(&p);
        let numbered = property("number").matches(r"#\d+").unwrap();
        let partial = property("number").matches(r"\d").unwrap();
        assert!(cx.check(&numbered));
        assert!(!cx.check(&partial));
    }

    #[test]
    fn test_matches_alternation_is_anchored_as_a_whole() {
        let p = Provider::from_pairs([("v", "ab")]);
        let cx = Context::new(&p);
        let cond = property("v").matches("a|ab").unwrap();
        assert!(cx.check(&cond));
    }

    #[test]
    fn test_invalid_pattern_fails_at_construction() {
        assert!(property("x").matches("(unclosed").is_err());
    }

    #[test]
    fn test_connectives() {
        let p = provider();
        let cx = Context::new(&p);
        let yes = Condition::always();
        let no = !Condition::always();
        assert!(cx.check(&(yes.clone() & yes.clone())));
        assert!(!cx.check(&(yes.clone() & no.clone())));
        assert!(cx.check(&(no.clone() | yes)));
        assert!(!cx.check(&(no.clone() | no)));
    }

    #[test]
    fn test_flag() {
        let p = provider();
        let cx = Context::new(&p);
        assert!(cx.check(&flag(true, "dark")));
        assert!(!cx.check(&flag(false, "dark")));
        assert!(!cx.check(&flag(true, "missing")));
        assert!(cx.check(&flag_of(false, &literally("False"))));
    }

    #[test]
    fn test_conditions_follow_provider() {
        let cond = property("mode").equals("print");
        let print = Provider::from_pairs([("mode", "print")]);
        let screen = Provider::from_pairs([("mode", "screen")]);
        assert!(Context::new(&print).check(&cond));
        assert!(!Context::new(&screen).check(&cond));
    }
}
