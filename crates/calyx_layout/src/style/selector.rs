//! Simple selectors and specificity
//!
//! A selector is a flat set of constraints: an optional tag, an optional id,
//! a set of classes and a set of pseudo-classes, e.g. `Button.primary:hover`.
//! Combinators are not supported; characters that are not part of a token
//! are ignored, and anything inside `[...]` is skipped.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::take_until,
    character::complete::{anychar, char},
    combinator::{map, value},
    multi::many0,
    sequence::{delimited, preceded},
};
use smallvec::SmallVec;

use super::stylesheet::{identifier, ParseResult};

/// Precedence of a selector
///
/// Compared field by field in declaration order, so the id count dominates
/// the class count, which dominates the tag, which dominates the
/// pseudo-class count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub tags: u32,
    pub pseudo_classes: u32,
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.ids, self.classes, self.tags, self.pseudo_classes
        )
    }
}

/// A compiled simple selector
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: SmallVec<[String; 2]>,
    pub pseudo_classes: SmallVec<[String; 2]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token<'a> {
    Tag(&'a str),
    Id(&'a str),
    Class(&'a str),
    Pseudo(&'a str),
    Skip,
}

fn token(input: &str) -> ParseResult<'_, Token<'_>> {
    alt((
        map(preceded(char('#'), identifier), Token::Id),
        map(preceded(char('.'), identifier), Token::Class),
        map(
            preceded(char(':'), preceded(many0(char(':')), identifier)),
            Token::Pseudo,
        ),
        value(Token::Skip, delimited(char('['), take_until("]"), char(']'))),
        map(identifier, Token::Tag),
        value(Token::Skip, anychar),
    ))(input)
}

fn tokens(input: &str) -> Vec<Token<'_>> {
    match many0(token)(input) {
        Ok((_, tokens)) => tokens,
        Err(_) => Vec::new(),
    }
}

impl Selector {
    /// Parse selector text such as `Button#ok.primary:hover`
    ///
    /// Only the first bare identifier becomes the tag; the last `#id` wins.
    pub fn parse(text: &str) -> Self {
        let mut selector = Selector::default();
        for token in tokens(text) {
            match token {
                Token::Tag(tag) => {
                    if selector.tag.is_none() {
                        selector.tag = Some(tag.to_string());
                    }
                }
                Token::Id(id) => selector.id = Some(id.to_string()),
                Token::Class(class) => push_unique(&mut selector.classes, class),
                Token::Pseudo(pseudo) => push_unique(&mut selector.pseudo_classes, pseudo),
                Token::Skip => {}
            }
        }
        selector
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        push_unique(&mut self.classes, class);
        self
    }

    pub fn pseudo_class(mut self, pseudo: &str) -> Self {
        push_unique(&mut self.pseudo_classes, pseudo.trim_start_matches(':'));
        self
    }

    /// No constraints at all; matches every element
    pub fn is_universal(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.pseudo_classes.is_empty()
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            ids: self.id.is_some() as u32,
            classes: self.classes.len() as u32,
            tags: self.tag.is_some() as u32,
            pseudo_classes: self.pseudo_classes.len() as u32,
        }
    }

    /// Whether this rule selector matches `candidate`
    ///
    /// Tag and id compare case-insensitively; classes and pseudo-classes
    /// must each be present in the candidate's sets.
    pub fn matches(&self, candidate: &Selector) -> bool {
        implies(candidate, self)
    }
}

/// Whether `candidate` satisfies every constraint of `rule`
pub fn implies(candidate: &Selector, rule: &Selector) -> bool {
    let same = |wanted: &Option<String>, have: &Option<String>| match (wanted, have) {
        (None, _) => true,
        (Some(w), Some(h)) => w.eq_ignore_ascii_case(h),
        (Some(_), None) => false,
    };
    let subset = |wanted: &[String], have: &[String]| {
        wanted
            .iter()
            .all(|w| have.iter().any(|h| h.eq_ignore_ascii_case(w)))
    };

    same(&rule.tag, &candidate.tag)
        && same(&rule.id, &candidate.id)
        && subset(&rule.classes, &candidate.classes)
        && subset(&rule.pseudo_classes, &candidate.pseudo_classes)
}

fn push_unique(set: &mut SmallVec<[String; 2]>, name: &str) {
    if !set.iter().any(|s| s.eq_ignore_ascii_case(name)) {
        set.push(name.to_string());
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_universal() {
            return f.write_str("*");
        }
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        for pseudo in &self.pseudo_classes {
            write!(f, ":{}", pseudo)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_parts() {
        let s = Selector::parse("Button#save.primary.large:hover");
        assert_eq!(s.tag.as_deref(), Some("Button"));
        assert_eq!(s.id.as_deref(), Some("save"));
        assert_eq!(s.classes.as_slice(), &["primary".to_string(), "large".to_string()]);
        assert_eq!(s.pseudo_classes.as_slice(), &["hover".to_string()]);
    }

    #[test]
    fn test_absent_parts_are_none() {
        let s = Selector::parse(".card");
        assert_eq!(s.tag, None);
        assert_eq!(s.id, None);
        assert!(s.pseudo_classes.is_empty());

        let s = Selector::parse("");
        assert!(s.is_universal());
    }

    #[test]
    fn test_first_bare_identifier_is_tag() {
        let s = Selector::parse("Panel TextBlock");
        assert_eq!(s.tag.as_deref(), Some("Panel"));

        let s = Selector::parse("[Kind=Button] Panel");
        assert_eq!(s.tag.as_deref(), Some("Panel"));
    }

    #[test]
    fn test_double_colon_pseudo() {
        let s = Selector::parse("LineEdit::focus");
        assert_eq!(s.pseudo_classes.as_slice(), &["focus".to_string()]);
    }

    #[test]
    fn test_universal_selector_matches_everything() {
        let rule = Selector::default();
        assert!(rule.matches(&Selector::parse("Button#a.b:hover")));
        assert!(rule.matches(&Selector::default()));
    }

    #[test]
    fn test_class_superset_matching() {
        let rule = Selector::default().class("a").class("b");
        let abc = Selector::default().class("a").class("b").class("c");
        let a = Selector::default().class("a");
        assert!(implies(&abc, &rule));
        assert!(!implies(&a, &rule));
    }

    #[test]
    fn test_tag_and_id_case_insensitive() {
        let rule = Selector::parse("button#OK");
        let candidate = Selector::default().tag("Button").id("ok");
        assert!(rule.matches(&candidate));
        assert!(!rule.matches(&Selector::default().tag("Button")));
    }

    #[test]
    fn test_pseudo_classes_must_be_applied() {
        let rule = Selector::parse("Button:hover");
        let idle = Selector::default().tag("Button");
        let hovered = idle.clone().pseudo_class(":hover");
        assert!(!rule.matches(&idle));
        assert!(rule.matches(&hovered));
    }

    #[test]
    fn test_specificity_ordering() {
        let id = Selector::parse("#save").specificity();
        let classes = Selector::parse("Button.a.b.c:hover:focus").specificity();
        let two = Selector::parse(".a.b").specificity();
        let one = Selector::parse(".a").specificity();
        let tag = Selector::parse("Button").specificity();
        let pseudo = Selector::parse(":hover").specificity();

        assert!(id > classes);
        assert!(two > one);
        assert!(one > tag);
        assert!(tag > pseudo);
        assert!(Selector::parse("Button:hover").specificity() > tag);
    }
}
