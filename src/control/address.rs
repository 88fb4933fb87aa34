//! OSC-style address patterns.
//!
//! Patterns are matched segment-wise against incoming addresses: a literal
//! segment matches itself, `?` matches exactly one segment, and a trailing
//! `*` matches one or more remaining segments.  Wildcard segments are
//! captured so a handler can recover e.g. the joint id from
//! `/kV2/body/?`.
use std::fmt;

use crate::control::error::PatternError;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    One,
    Rest,
}

#[derive(Debug, Clone)]
pub struct AddressPattern {
    raw: String,
    segments: Vec<Segment>,
}

fn split_address(address: &str) -> Vec<&str> {
    // empty segments (leading slash, trailing slash as in "/link/") carry
    // no routing information
    address.split('/').filter(|s| !s.is_empty()).collect()
}

impl AddressPattern {
    pub fn parse(pattern: &str) -> Result<AddressPattern, PatternError> {
        let parts = split_address(pattern);
        if parts.is_empty() {
            return Err(PatternError::new(pattern, "pattern has no segments"));
        }
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let seg = match *part {
                "?" => Segment::One,
                "*" => {
                    if i + 1 != parts.len() {
                        return Err(PatternError::new(pattern, "'*' must be the final segment"));
                    }
                    Segment::Rest
                }
                lit => Segment::Literal(String::from(lit)),
            };
            segments.push(seg);
        }
        Ok(AddressPattern {
            raw: String::from(pattern),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// number of literal segments; dispatch runs most-specific-first
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match an incoming address.  Returns the segments captured by
    /// wildcards (in order) on a match, None otherwise.
    pub fn matches(&self, address: &str) -> Option<Vec<String>> {
        let segs = split_address(address);
        let mut captures = Vec::new();
        let mut i = 0;
        for seg in &self.segments {
            match seg {
                Segment::Literal(lit) => {
                    if i >= segs.len() || segs[i] != lit {
                        return None;
                    }
                    i += 1;
                }
                Segment::One => {
                    if i >= segs.len() {
                        return None;
                    }
                    captures.push(String::from(segs[i]));
                    i += 1;
                }
                Segment::Rest => {
                    // one or more remaining segments
                    if i >= segs.len() {
                        return None;
                    }
                    while i < segs.len() {
                        captures.push(String::from(segs[i]));
                        i += 1;
                    }
                }
            }
        }
        if i == segs.len() {
            Some(captures)
        } else {
            None
        }
    }
}

impl fmt::Display for AddressPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod test_address {
    use super::*;

    #[test]
    fn literal_match() {
        let p = AddressPattern::parse("/mousemove/1").unwrap();
        assert_eq!(p.matches("/mousemove/1"), Some(vec![]));
        assert_eq!(p.matches("/mousemove/2"), None);
        assert_eq!(p.matches("/mousemove"), None);
        assert_eq!(p.matches("/mousemove/1/x"), None);
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let p = AddressPattern::parse("/link/").unwrap();
        assert_eq!(p.matches("/link/"), Some(vec![]));
        assert_eq!(p.matches("/link"), Some(vec![]));
    }

    #[test]
    fn one_segment_wildcard() {
        let p = AddressPattern::parse("/kV2/body/?").unwrap();
        assert_eq!(
            p.matches("/kV2/body/7"),
            Some(vec![String::from("7")])
        );
        assert_eq!(p.matches("/kV2/body"), None);
        assert_eq!(p.matches("/kV2/body/7/x"), None);
    }

    #[test]
    fn rest_wildcard() {
        let p = AddressPattern::parse("/?/*").unwrap();
        assert_eq!(
            p.matches("/foo/bar"),
            Some(vec![String::from("foo"), String::from("bar")])
        );
        assert_eq!(
            p.matches("/a/b/c"),
            Some(vec![
                String::from("a"),
                String::from("b"),
                String::from("c")
            ])
        );
        // '*' needs at least one segment to eat
        assert_eq!(p.matches("/lonely"), None);
    }

    #[test]
    fn rest_must_be_last() {
        assert!(AddressPattern::parse("/*/body").is_err());
        assert!(AddressPattern::parse("/").is_err());
    }

    #[test]
    fn specificity_counts_literals() {
        assert_eq!(AddressPattern::parse("/mousemove/1").unwrap().specificity(), 2);
        assert_eq!(AddressPattern::parse("/kV2/body/?").unwrap().specificity(), 2);
        assert_eq!(AddressPattern::parse("/?/*").unwrap().specificity(), 0);
    }
}
