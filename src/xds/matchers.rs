//! Route matcher translation.

use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier, query_parameter_matcher::QueryParameterMatchSpecifier,
    route_match::PathSpecifier as EnvoyPathSpecifier, HeaderMatcher as EnvoyHeaderMatcher,
    QueryParameterMatcher as EnvoyQueryParameterMatcher, RouteMatch,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{
    string_matcher::MatchPattern, RegexMatcher, StringMatcher,
};
use envoy_types::pb::google::protobuf::BoolValue;
use regex::Regex;

use crate::model::{HeaderMatcher, Matcher, PathSpecifier, QueryParameterMatcher};

/// Pseudo-header carrying the request method
pub const METHOD_HEADER: &str = ":method";

/// Matcher a route without matchers is given
pub fn default_matcher() -> Matcher {
    Matcher::prefix("/")
}

/// Translate a route matcher into an envoy route match.
///
/// A matcher without a path specifier yields a match without one; callers
/// report it through [`matcher_problems`].
pub fn translate_matcher(matcher: &Matcher) -> RouteMatch {
    let mut headers: Vec<EnvoyHeaderMatcher> =
        matcher.headers.iter().map(translate_header_matcher).collect();

    if !matcher.methods.is_empty() {
        headers.push(EnvoyHeaderMatcher {
            name: METHOD_HEADER.to_string(),
            header_match_specifier: Some(HeaderMatchSpecifier::StringMatch(regex_string_matcher(
                &matcher.methods.join("|"),
            ))),
            ..Default::default()
        });
    }

    RouteMatch {
        path_specifier: matcher.path_specifier.as_ref().map(translate_path_specifier),
        case_sensitive: matcher.case_sensitive.map(|value| BoolValue { value }),
        headers,
        query_parameters: matcher.query_parameters.iter().map(translate_query_matcher).collect(),
        ..Default::default()
    }
}

/// Problems that make a matcher invalid, as report messages
pub fn matcher_problems(matcher: &Matcher) -> Vec<String> {
    let mut problems = Vec::new();

    match &matcher.path_specifier {
        None => problems.push("no path specifier provided".to_string()),
        Some(PathSpecifier::Regex(regex)) => problems.extend(check_regex(regex)),
        Some(_) => {}
    }

    for header in matcher.headers.iter().filter(|header| header.regex) {
        problems.extend(check_regex(&header.value));
    }
    for query in matcher.query_parameters.iter().filter(|query| query.regex) {
        problems.extend(check_regex(&query.value));
    }

    problems
}

fn check_regex(regex: &str) -> Option<String> {
    Regex::new(regex).err().map(|err| format!("invalid regex {regex}: {err}"))
}

fn translate_path_specifier(path: &PathSpecifier) -> EnvoyPathSpecifier {
    match path {
        PathSpecifier::Prefix(prefix) => EnvoyPathSpecifier::Prefix(prefix.clone()),
        PathSpecifier::Exact(exact) => EnvoyPathSpecifier::Path(exact.clone()),
        PathSpecifier::Regex(regex) => {
            EnvoyPathSpecifier::SafeRegex(RegexMatcher { regex: regex.clone(), ..Default::default() })
        }
    }
}

fn translate_header_matcher(header: &HeaderMatcher) -> EnvoyHeaderMatcher {
    let header_match_specifier = if header.value.is_empty() {
        HeaderMatchSpecifier::PresentMatch(true)
    } else if header.regex {
        HeaderMatchSpecifier::StringMatch(regex_string_matcher(&header.value))
    } else {
        HeaderMatchSpecifier::StringMatch(exact_string_matcher(&header.value))
    };

    EnvoyHeaderMatcher {
        name: header.name.clone(),
        invert_match: header.invert_match,
        header_match_specifier: Some(header_match_specifier),
        ..Default::default()
    }
}

fn translate_query_matcher(query: &QueryParameterMatcher) -> EnvoyQueryParameterMatcher {
    let specifier = if query.value.is_empty() {
        QueryParameterMatchSpecifier::PresentMatch(true)
    } else if query.regex {
        QueryParameterMatchSpecifier::StringMatch(regex_string_matcher(&query.value))
    } else {
        QueryParameterMatchSpecifier::StringMatch(exact_string_matcher(&query.value))
    };

    EnvoyQueryParameterMatcher {
        name: query.name.clone(),
        query_parameter_match_specifier: Some(specifier),
        ..Default::default()
    }
}

fn exact_string_matcher(value: &str) -> StringMatcher {
    StringMatcher { match_pattern: Some(MatchPattern::Exact(value.to_string())), ignore_case: false }
}

fn regex_string_matcher(regex: &str) -> StringMatcher {
    StringMatcher {
        match_pattern: Some(MatchPattern::SafeRegex(RegexMatcher {
            regex: regex.to_string(),
            ..Default::default()
        })),
        ignore_case: false,
    }
}
