//! Route table and path matching.
//!
//! Patterns are made of literal segments and parameters, written either
//! `{name}` or `:name`:
//!
//! ```rust
//! use tollgate_server::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add(Method::GET, "/games/{gameId}/scores", "scores").unwrap();
//! router.add(Method::POST, "/games/:gameId", "update").unwrap();
//!
//! let found = router.match_route(&Method::GET, "/games/kud-42/scores").unwrap();
//! assert_eq!(*found.target(), "scores");
//! assert_eq!(found.param("gameId"), Some("kud-42"));
//!
//! // The same (method, shape) cannot be registered twice.
//! assert!(router.add(Method::POST, "/games/{id}", "again").is_err());
//! ```
//!
//! When several patterns match a path, the one with the most literal
//! segments wins, then the one registered first.

use http::Method;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A route with the same method and shape already exists.
    #[error("route [{method}] {pattern} is already registered as {existing}")]
    Duplicate {
        /// Method of the rejected route.
        method: Method,
        /// Pattern of the rejected route.
        pattern: String,
        /// Pattern of the route registered first.
        existing: String,
    },

    /// The pattern cannot be parsed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl RouteError {
    fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Route<T> {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    target: T,
}

impl<T> Route<T> {
    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    fn capture(&self, parts: &[&str]) -> Option<HashMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), decode(part));
                }
            }
        }
        Some(params)
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::invalid(pattern, "must start with '/'"));
    }

    let mut seen = HashSet::new();
    let mut segments = Vec::new();
    for part in split(pattern) {
        let name = part
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
            .or_else(|| part.strip_prefix(':'));

        let segment = match name {
            Some("") => return Err(RouteError::invalid(pattern, "empty parameter name")),
            Some(name) => {
                if !seen.insert(name) {
                    return Err(RouteError::invalid(
                        pattern,
                        format!("parameter '{name}' appears twice"),
                    ));
                }
                Segment::Param(name.to_string())
            }
            None if part.contains(['{', '}']) => {
                return Err(RouteError::invalid(pattern, format!("unbalanced braces in '{part}'")));
            }
            None => Segment::Literal(part.to_string()),
        };
        segments.push(segment);
    }
    Ok(segments)
}

/// A matched route and its decoded path parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    target: &'a T,
    pattern: &'a str,
    params: HashMap<String, String>,
}

impl<'a, T> RouteMatch<'a, T> {
    /// The value registered for the route.
    #[must_use]
    pub fn target(&self) -> &'a T {
        self.target
    }

    /// The pattern the route was registered with.
    #[must_use]
    pub fn pattern(&self) -> &'a str {
        self.pattern
    }

    /// A decoded path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Takes the decoded path parameters.
    #[must_use]
    pub fn into_params(self) -> HashMap<String, String> {
        self.params
    }
}

/// Maps `(method, path)` to a registered value.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    ///
    /// Two patterns with the same method and the same sequence of literals
    /// and parameter positions are duplicates, whatever the parameter names.
    pub fn add(&mut self, method: Method, pattern: &str, target: T) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;

        if let Some(existing) = self.routes.iter().find(|r| {
            r.method == method
                && r.segments.len() == segments.len()
                && r.segments.iter().zip(&segments).all(|(a, b)| a.same_shape(b))
        }) {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.to_string(),
                existing: existing.pattern.clone(),
            });
        }

        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            segments,
            target,
        });
        Ok(())
    }

    /// Finds the route for a request.
    ///
    /// A `HEAD` request without a `HEAD` route of its own falls back to the
    /// matching `GET` route.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let parts = split(path);
        let found = self.best_match(method, &parts);
        let (route, params) = match found {
            None if *method == Method::HEAD => self.best_match(&Method::GET, &parts)?,
            found => found?,
        };

        Some(RouteMatch {
            target: &route.target,
            pattern: &route.pattern,
            params,
        })
    }

    fn best_match(&self, method: &Method, parts: &[&str]) -> Option<(&Route<T>, HashMap<String, String>)> {
        let mut best: Option<(&Route<T>, HashMap<String, String>)> = None;
        for route in self.routes.iter().filter(|r| r.method == *method) {
            let Some(params) = route.capture(parts) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| route.literal_count() > current.literal_count());
            if better {
                best = Some((route, params));
            }
        }
        best
    }

    /// Whether any route exists for `path`, whatever the method.
    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        let parts = split(path);
        self.routes.iter().any(|r| r.capture(&parts).is_some())
    }

    /// Registered `(method, pattern)` pairs, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.pattern.as_str()))
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the router is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn router() -> Router<&'static str> {
        let mut router = Router::new();
        router.add(Method::GET, "/", "liveness").unwrap();
        router.add(Method::GET, "/games/{gameId}", "game").unwrap();
        router.add(Method::GET, "/games/current", "current").unwrap();
        router
            .add(Method::POST, "/games/:gameId/players/:playerId", "join")
            .unwrap();
        router
    }

    #[test]
    fn test_root() {
        let router = router();
        let found = router.match_route(&Method::GET, "/").unwrap();
        assert_eq!(*found.target(), "liveness");
        assert!(router.match_route(&Method::GET, "").is_some());
    }

    #[test]
    fn test_both_param_syntaxes() {
        let router = router();

        let found = router.match_route(&Method::GET, "/games/kud-1").unwrap();
        assert_eq!(found.param("gameId"), Some("kud-1"));
        assert_eq!(found.pattern(), "/games/{gameId}");

        let found = router
            .match_route(&Method::POST, "/games/kud-1/players/p7")
            .unwrap();
        let params = found.into_params();
        assert_eq!(params["gameId"], "kud-1");
        assert_eq!(params["playerId"], "p7");
    }

    #[test]
    fn test_literal_beats_param() {
        let router = router();
        let found = router.match_route(&Method::GET, "/games/current").unwrap();
        assert_eq!(*found.target(), "current");
    }

    #[test]
    fn test_method_and_shape_must_match() {
        let router = router();
        assert!(router.match_route(&Method::DELETE, "/games/kud-1").is_none());
        assert!(router.match_route(&Method::GET, "/games/kud-1/extra").is_none());
        assert!(router.has_path("/games/kud-1"));
        assert!(!router.has_path("/nothing"));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let mut router = router();
        let found = router.match_route(&Method::HEAD, "/games/kud-1").unwrap();
        assert_eq!(*found.target(), "game");
        assert_eq!(found.param("gameId"), Some("kud-1"));
        assert!(router.match_route(&Method::HEAD, "/games/kud-1/players/p1").is_none());

        router.add(Method::HEAD, "/games/{gameId}", "head-game").unwrap();
        let found = router.match_route(&Method::HEAD, "/games/kud-1").unwrap();
        assert_eq!(*found.target(), "head-game");
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let router = router();
        assert!(router.match_route(&Method::GET, "/games/kud-1/").is_some());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let router = router();
        let found = router
            .match_route(&Method::GET, "/games/space%20invaders")
            .unwrap();
        assert_eq!(found.param("gameId"), Some("space invaders"));
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let mut router = router();
        let err = router.add(Method::GET, "/games/:id", "other").unwrap_err();
        assert!(matches!(
            err,
            RouteError::Duplicate { ref existing, .. } if existing == "/games/{gameId}"
        ));
        assert!(router.add(Method::PUT, "/games/:id", "other").is_ok());
        assert_eq!(router.len(), 5);
    }

    #[test]
    fn test_invalid_patterns() {
        let mut router: Router<()> = Router::new();
        assert!(router.add(Method::GET, "games", ()).is_err());
        assert!(router.add(Method::GET, "/games/{}", ()).is_err());
        assert!(router.add(Method::GET, "/games/:", ()).is_err());
        assert!(router.add(Method::GET, "/a/{id}/b/{id}", ()).is_err());
        assert!(router.add(Method::GET, "/a/{id", ()).is_err());
        assert!(router.is_empty());
    }

    proptest! {
        #[test]
        fn prop_literal_paths_match_themselves(parts in prop::collection::vec("[a-z0-9_-]{1,12}", 0..6)) {
            let path = format!("/{}", parts.join("/"));
            let mut router = Router::new();
            router.add(Method::GET, &path, ()).unwrap();
            prop_assert!(router.match_route(&Method::GET, &path).is_some());
        }

        #[test]
        fn prop_param_captures_any_segment(value in "[A-Za-z0-9._~-]{1,24}") {
            let mut router = Router::new();
            router.add(Method::GET, "/items/{id}/detail", ()).unwrap();
            let path = format!("/items/{value}/detail");
            let found = router.match_route(&Method::GET, &path).unwrap();
            prop_assert_eq!(found.param("id"), Some(value.as_str()));
        }
    }
}
