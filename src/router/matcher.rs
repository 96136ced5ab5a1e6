//! URL matching against a route table
//!
//! Matching runs three complete passes over the table, in this order:
//! 1. exact routes: pathname equals the pattern (one trailing `/` tolerated)
//! 2. dynamic routes: the pattern's literal part is contained in the pathname
//!    and both have the same number of segments
//! 3. catch-all routes: literal containment only
//!
//! Within a pass the first route in table order wins. A later pass never
//! overrides an earlier one, so `/blog/latest` always beats `/blog/[slug]`,
//! which always beats `/blog/[...rest]`.
//!
//! Matching is a pure function of `(table, url)`.

use super::route::{MatchResult, ParamValue, Params, Query, RouteDescriptor, RouteKind, RouteTable, SegmentParam};

/// Match a request URL (absolute, or path plus optional query) against the table.
///
/// Returns None when no route handles the URL; that is a normal outcome the
/// caller turns into a 404.
pub fn match_route(table: &RouteTable, url: &str) -> Option<MatchResult> {
    let (pathname, raw_query) = split_url(url);

    let (descriptor, params) = exact_pass(table, pathname)
        .map(|descriptor| (descriptor, None))
        .or_else(|| dynamic_pass(table, pathname))
        .or_else(|| catch_all_pass(table, pathname))?;

    Some(MatchResult {
        file_path: descriptor.file_path.clone(),
        kind: descriptor.kind,
        pathname: descriptor.pathname.clone(),
        query: parse_query(raw_query),
        params,
    })
}

fn exact_pass<'t>(table: &'t RouteTable, pathname: &str) -> Option<&'t RouteDescriptor> {
    table
        .descriptors()
        .filter(|route| route.kind == RouteKind::Exact)
        .find(|route| equals_with_trailing_slash(pathname, &route.pathname))
}

fn dynamic_pass<'t>(table: &'t RouteTable, pathname: &str) -> Option<(&'t RouteDescriptor, Option<Params>)> {
    let pathname = trim_trailing_slash(pathname);
    let actual_segments = segment_count(pathname);

    for route in table.descriptors().filter(|route| route.kind == RouteKind::Dynamic) {
        // Routes pre-resolved from a static-path enumerator carry a concrete
        // pathname and their own params.
        if let Some(params) = &route.static_params {
            if equals_with_trailing_slash(pathname, &route.pathname) {
                return Some((route, Some(params.clone())));
            }
            continue;
        }

        if segment_count(&route.pathname) != actual_segments {
            continue;
        }
        if pathname.contains(literal_part(&route.pathname).as_str()) {
            return Some((route, Some(get_dynamic_params(&route.pathname, pathname))));
        }
    }
    None
}

fn catch_all_pass<'t>(table: &'t RouteTable, pathname: &str) -> Option<(&'t RouteDescriptor, Option<Params>)> {
    let pathname = trim_trailing_slash(pathname);
    table
        .descriptors()
        .filter(|route| route.kind == RouteKind::CatchAll)
        .find(|route| pathname.contains(literal_part(&route.pathname).as_str()))
        .map(|route| (route, Some(get_dynamic_params(&route.pathname, pathname))))
}

/// Extract route parameters by walking pattern and pathname segments side by side.
///
/// `[name]` binds the segment at the same position. `[...name]` binds every
/// remaining segment (possibly none) and ends the walk. Segments are
/// percent-decoded.
pub fn get_dynamic_params(pattern: &str, pathname: &str) -> Params {
    let actual: Vec<&str> = pathname.split('/').collect();
    let mut params = Params::new();

    for (position, segment) in pattern.split('/').enumerate() {
        match SegmentParam::parse(segment) {
            Some(SegmentParam::Rest(name)) => {
                let rest = actual
                    .iter()
                    .skip(position)
                    .filter(|value| !value.is_empty())
                    .map(|value| decode_component(value))
                    .collect();
                params.insert(name.to_string(), ParamValue::Many(rest));
                break;
            }
            Some(SegmentParam::Single(name)) => {
                if let Some(value) = actual.get(position) {
                    params.insert(name.to_string(), ParamValue::Single(decode_component(value)));
                }
            }
            None => {}
        }
    }

    params
}

/// Parse a raw query string into key/value pairs.
///
/// Keys are case-sensitive, the last value for a repeated key wins, and a
/// key without `=` maps to the empty string.
pub fn parse_query(raw_query: Option<&str>) -> Query {
    let mut query = Query::new();
    let Some(raw) = raw_query else {
        return query;
    };

    for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }
        query.insert(decode_form_component(key), decode_form_component(value));
    }
    query
}

/// Split a request URL into pathname and raw query string.
///
/// Accepts absolute URLs (`https://host/path?q`) as well as origin-form
/// targets (`/path?q`). The fragment is discarded.
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    let url = url.split_once('#').map_or(url, |(before, _)| before);

    let target = match url.find("://") {
        Some(scheme_end) => {
            let after_scheme = &url[scheme_end + 3..];
            match after_scheme.find(|c: char| c == '/' || c == '?') {
                Some(path_start) => &after_scheme[path_start..],
                None => "",
            }
        }
        None => url,
    };

    let (pathname, query) = match target.split_once('?') {
        Some((pathname, query)) => (pathname, Some(query)),
        None => (target, None),
    };

    if pathname.is_empty() {
        ("/", query)
    } else {
        (pathname, query)
    }
}

/// The literal part of a pattern: parameter segments removed, trailing slash
/// dropped. `/blog/[slug]` becomes `/blog`, `/[...all]` becomes `/`.
fn literal_part(pattern: &str) -> String {
    let literal: Vec<&str> = pattern
        .split('/')
        .filter(|segment| SegmentParam::parse(segment).is_none())
        .collect();
    let joined = literal.join("/");
    let trimmed = joined.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn equals_with_trailing_slash(pathname: &str, pattern: &str) -> bool {
    pathname == pattern
        || pathname
            .strip_suffix('/')
            .is_some_and(|without_slash| without_slash == pattern)
}

fn trim_trailing_slash(pathname: &str) -> &str {
    if pathname.len() > 1 {
        pathname.strip_suffix('/').unwrap_or(pathname)
    } else {
        pathname
    }
}

fn segment_count(path: &str) -> usize {
    path.split('/').count()
}

fn decode_component(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn decode_form_component(value: &str) -> String {
    decode_component(&value.replace('+', " "))
}
