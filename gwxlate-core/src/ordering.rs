//! The total order over (pattern, operation) pairs that makes the data
//! plane's first-match-wins router behave correctly — specific routes
//! before generic ones, OPTIONS before same-path verbs, and otherwise
//! deterministic.
//!
//! The ordering is a comparator fed to a stable sort, applied to the
//! concatenation, across operations in `Operations` order, of all their
//! `HttpRule` patterns — so the final tiebreak (position of the operation
//! in `Operations`) falls out of the stable sort preserving the pre-sort
//! order rather than needing an explicit index comparison.

use gwxlate_kernel::model::{Pattern, Segment, ServiceModel};
use std::cmp::Ordering;

/// One (operation, pattern) pair to be placed in the route table.
#[derive(Debug, Clone)]
pub struct RouteKey {
    pub selector: String,
    pub pattern_index: usize,
}

/// Flatten `model.operations` into the pre-sort sequence described above,
/// then stable-sort it according to the rules below.
pub fn ordered_route_keys(model: &ServiceModel) -> Vec<RouteKey> {
    let mut keys = Vec::new();
    for selector in &model.operations {
        let Some(method) = model.methods.get(selector) else {
            continue;
        };
        for i in 0..method.http_rule.len() {
            keys.push(RouteKey {
                selector: selector.clone(),
                pattern_index: i,
            });
        }
    }
    keys.sort_by(|a, b| {
        let pa = pattern_of(model, a);
        let pb = pattern_of(model, b);
        compare_patterns(pa, pb)
    });
    keys
}

fn pattern_of<'a>(model: &'a ServiceModel, key: &RouteKey) -> &'a Pattern {
    &model.methods[&key.selector].http_rule[key.pattern_index]
}

fn is_exact(pattern: &Pattern) -> bool {
    !pattern.force_regex && pattern.template.is_exact_match()
}

/// literal < single-wildcard < named-capture < double-wildcard (rule 2).
fn segment_rank(seg: &Segment) -> u8 {
    match seg {
        Segment::Literal(_) => 0,
        Segment::SingleWildcard => 1,
        Segment::Capture { .. } => 2,
        Segment::DoubleWildcard => 3,
    }
}

fn wildcard_count(pattern: &Pattern) -> usize {
    pattern
        .template
        .segments()
        .iter()
        .filter(|s| !matches!(s, Segment::Literal(_)))
        .count()
}

fn segment_ranks(pattern: &Pattern) -> Vec<u8> {
    pattern.template.segments().iter().map(segment_rank).collect()
}

/// The total order, highest priority first (an "earlier" pattern sorts
/// `Less`).
pub fn compare_patterns(a: &Pattern, b: &Pattern) -> Ordering {
    // Rule 1: exact-match paths precede regex paths.
    let (ea, eb) = (is_exact(a), is_exact(b));
    match (ea, eb) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    if !ea {
        // Rule 2: fewer wildcards first, then segment-by-segment rank.
        match wildcard_count(a).cmp(&wildcard_count(b)) {
            Ordering::Equal => {}
            other => return other,
        }
        match segment_ranks(a).cmp(&segment_ranks(b)) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    // Rule 4: OPTIONS precedes a non-OPTIONS entry sharing the same regex.
    if a.template.regex() == b.template.regex() {
        let (oa, ob) = (a.http_method.as_str() == "OPTIONS", b.http_method.as_str() == "OPTIONS");
        match (oa, ob) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }

    // Rule 3: a non-wildcard method precedes the wildcard method.
    match (a.http_method.is_wildcard(), b.http_method.is_wildcard()) {
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        _ => {}
    }

    // Rule 5 falls out of the stable sort preserving pre-sort (Operations) order.
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwxlate_kernel::model::HttpVerb;

    fn pat(method: HttpVerb, template: &str) -> Pattern {
        Pattern::new(method, crate::uri_template::parse("t", template).unwrap())
    }

    #[test]
    fn exact_precedes_regex() {
        let exact = pat(HttpVerb::Get, "/shelves");
        let regex = pat(HttpVerb::Get, "/shelves/*");
        assert_eq!(compare_patterns(&exact, &regex), Ordering::Less);
    }

    #[test]
    fn fewer_wildcards_precedes_more() {
        let one = pat(HttpVerb::Get, "/a/*");
        let two = pat(HttpVerb::Get, "/a/*/*");
        assert_eq!(compare_patterns(&one, &two), Ordering::Less);
    }

    #[test]
    fn literal_segment_outranks_wildcard_segment_at_same_position() {
        let literal_first = pat(HttpVerb::Get, "/a/*");
        let wildcard_first = pat(HttpVerb::Get, "/*/a");
        // both have 1 wildcard; compare segment ranks [0,1] vs [1,0]
        assert_eq!(
            compare_patterns(&literal_first, &wildcard_first),
            Ordering::Less
        );
    }

    #[test]
    fn options_precedes_non_options_on_same_regex() {
        let options = pat(HttpVerb::Options, "/a/*");
        let get = pat(HttpVerb::Get, "/a/*");
        assert_eq!(compare_patterns(&options, &get), Ordering::Less);
    }

    #[test]
    fn concrete_method_precedes_wildcard_method() {
        let get = pat(HttpVerb::Get, "/a/*/b");
        let wildcard = pat(HttpVerb::Custom("*".to_string()), "/c/*/d");
        // different regex but identical structure (1 wildcard at position 1)
        assert_eq!(compare_patterns(&get, &wildcard), Ordering::Less);
    }
}
