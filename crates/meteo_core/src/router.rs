//! Resource path routing.
//!
//! # Responsibility
//! - Match resource paths against a fixed, ordered table of route patterns.
//! - Extract typed route parameters (location setting, dates).
//!
//! # Invariants
//! - First structural match wins; an unmatched path resolves to `None`.
//! - Extracted dates are normalized to the UTC day start.
//! - A `#` pattern segment only matches an all-digit path segment.

use crate::contract::{normalize_date, WeatherEntry, CONTENT_AUTHORITY, PATH_LOCATION, PATH_WEATHER};
use crate::path::ResourcePath;

/// Dispatch target for a matched resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `weather`
    Weather,
    /// `weather/*`
    WeatherByLocation,
    /// `weather/*/#`
    WeatherByLocationAndDate,
    /// `location`
    Location,
}

impl Route {
    /// Stable numeric route code.
    pub fn code(self) -> u32 {
        match self {
            Self::Weather => 100,
            Self::WeatherByLocation => 101,
            Self::WeatherByLocationAndDate => 102,
            Self::Location => 300,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::WeatherByLocation => "weather_by_location",
            Self::WeatherByLocationAndDate => "weather_by_location_and_date",
            Self::Location => "location",
        }
    }
}

/// Route plus the typed parameters extracted from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRoute {
    Weather,
    WeatherByLocation {
        location_setting: String,
        /// Normalized lower bound; `None` means no bound.
        start_date: Option<i64>,
    },
    WeatherByLocationAndDate {
        location_setting: String,
        /// Normalized day.
        date: i64,
    },
    Location,
}

impl ResolvedRoute {
    pub fn route(&self) -> Route {
        match self {
            Self::Weather => Route::Weather,
            Self::WeatherByLocation { .. } => Route::WeatherByLocation,
            Self::WeatherByLocationAndDate { .. } => Route::WeatherByLocationAndDate,
            Self::Location => Route::Location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    /// `*`: any single segment.
    Text,
    /// `#`: a single all-digit segment.
    Number,
}

impl PatternSegment {
    fn parse(raw: &str) -> Self {
        match raw {
            "*" => Self::Text,
            "#" => Self::Number,
            literal => Self::Literal(literal.to_string()),
        }
    }

    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == segment,
            Self::Text => !segment.is_empty(),
            Self::Number => !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

#[derive(Debug, Clone)]
struct RouteEntry {
    authority: String,
    pattern: Vec<PatternSegment>,
    route: Route,
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    entries: Vec<RouteEntry>,
}

impl RouteMatcher {
    /// Creates an empty matcher; every path is unmatched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher with the four weather/location routes under the crate authority.
    pub fn standard() -> Self {
        let mut matcher = Self::new();
        matcher.add(CONTENT_AUTHORITY, PATH_WEATHER, Route::Weather);
        matcher.add(
            CONTENT_AUTHORITY,
            &format!("{PATH_WEATHER}/*"),
            Route::WeatherByLocation,
        );
        matcher.add(
            CONTENT_AUTHORITY,
            &format!("{PATH_WEATHER}/*/#"),
            Route::WeatherByLocationAndDate,
        );
        matcher.add(CONTENT_AUTHORITY, PATH_LOCATION, Route::Location);
        matcher
    }

    /// Registers `pattern` (slash separated; `*` text, `#` number) for `route`.
    pub fn add(&mut self, authority: &str, pattern: &str, route: Route) {
        let pattern = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(PatternSegment::parse)
            .collect();
        self.entries.push(RouteEntry {
            authority: authority.to_string(),
            pattern,
            route,
        });
    }

    /// Returns the first route whose pattern matches `path`.
    pub fn match_path(&self, path: &ResourcePath) -> Option<Route> {
        let segments = path.segments();
        self.entries
            .iter()
            .find(|entry| {
                entry.authority == path.authority()
                    && entry.pattern.len() == segments.len()
                    && entry
                        .pattern
                        .iter()
                        .zip(segments)
                        .all(|(pattern, segment)| pattern.matches(segment))
            })
            .map(|entry| entry.route)
    }

    /// Matches `path` and extracts its typed parameters.
    ///
    /// Returns `None` when no route matches or a date parameter cannot be
    /// normalized.
    pub fn resolve(&self, path: &ResourcePath) -> Option<ResolvedRoute> {
        let resolved = match self.match_path(path)? {
            Route::Weather => ResolvedRoute::Weather,
            Route::Location => ResolvedRoute::Location,
            Route::WeatherByLocation => {
                let location_setting = WeatherEntry::location_setting_from_uri(path)?.to_string();
                let start_date = match WeatherEntry::start_date_from_uri(path) {
                    0 => None,
                    raw => Some(normalize_date(raw)?),
                };
                ResolvedRoute::WeatherByLocation {
                    location_setting,
                    start_date,
                }
            }
            Route::WeatherByLocationAndDate => {
                let location_setting = WeatherEntry::location_setting_from_uri(path)?.to_string();
                let date = normalize_date(WeatherEntry::date_from_uri(path)?)?;
                ResolvedRoute::WeatherByLocationAndDate {
                    location_setting,
                    date,
                }
            }
        };
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::{Route, RouteMatcher};
    use crate::path::ResourcePath;

    fn path(text: &str) -> ResourcePath {
        ResourcePath::parse(text).unwrap()
    }

    #[test]
    fn number_segment_requires_digits() {
        let matcher = RouteMatcher::standard();
        assert_eq!(
            matcher.match_path(&path("content://com.mhv.meteoapp/weather/94043/123")),
            Some(Route::WeatherByLocationAndDate)
        );
        assert_eq!(
            matcher.match_path(&path("content://com.mhv.meteoapp/weather/94043/12a")),
            None
        );
    }

    #[test]
    fn authority_must_match() {
        let matcher = RouteMatcher::standard();
        assert_eq!(matcher.match_path(&path("content://other.app/weather")), None);
    }

    #[test]
    fn empty_matcher_matches_nothing() {
        assert_eq!(
            RouteMatcher::new().match_path(&path("content://com.mhv.meteoapp/weather")),
            None
        );
    }

    #[test]
    fn route_codes_are_distinct() {
        let codes = [
            Route::Weather,
            Route::WeatherByLocation,
            Route::WeatherByLocationAndDate,
            Route::Location,
        ]
        .map(Route::code);
        let unique: std::collections::BTreeSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
