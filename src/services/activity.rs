// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity listing: query filters, ordering and page-number pagination.
//!
//! The store narrows by owner, date window and type. Everything else is
//! applied here over the fetched records.

use crate::db::ActivityRange;
use crate::error::AppError;
use crate::models::activity::to_hundredths;
use crate::models::{Activity, ActivityType};
use crate::time_utils::parse_query_date;
use serde::Deserialize;
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Raw query string for activity listings.
///
/// Every value is kept as a string so that a malformed filter is dropped
/// instead of failing the whole request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ActivityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub activity_type: Option<String>,
    pub min_duration: Option<String>,
    pub max_duration: Option<String>,
    pub min_distance: Option<String>,
    pub max_distance: Option<String>,
    pub min_calories: Option<String>,
    pub max_calories: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ActivityQuery {
    /// Filters described by this query.
    pub fn filter(&self) -> ActivityFilter {
        let (activity_type, unknown_type) = match non_empty(self.activity_type.as_deref()) {
            None => (None, false),
            Some(raw) => match ActivityType::parse(raw) {
                Some(t) => (Some(t), false),
                None => (None, true),
            },
        };

        ActivityFilter {
            range: ActivityRange {
                start: parse_query_date(self.start_date.as_deref()),
                end: parse_query_date(self.end_date.as_deref()),
                activity_type,
            },
            unknown_type,
            duration: Bounds::parse(self.min_duration.as_deref(), self.max_duration.as_deref()),
            distance: Bounds::parse(self.min_distance.as_deref(), self.max_distance.as_deref())
                .map(to_hundredths),
            calories: Bounds::parse(self.min_calories.as_deref(), self.max_calories.as_deref()),
        }
    }

    pub fn ordering(&self) -> ActivityOrdering {
        ActivityOrdering::parse(self.ordering.as_deref())
    }

    pub fn page_request(&self) -> Result<PageRequest, AppError> {
        PageRequest::from_params(self.page.as_deref(), self.page_size.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Inclusive lower/upper bound on a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self { min: None, max: None }
    }
}

impl<T: std::str::FromStr + PartialOrd + Copy> Bounds<T> {
    fn parse(min: Option<&str>, max: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| non_empty(raw).and_then(|v| v.parse().ok());
        Self {
            min: parse(min),
            max: parse(max),
        }
    }

    fn map<U>(self, f: impl Fn(T) -> U) -> Bounds<U> {
        Bounds {
            min: self.min.map(&f),
            max: self.max.map(&f),
        }
    }

    fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// An absent value only passes when there is no bound at all.
    pub fn contains(&self, value: Option<T>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Parsed activity filters.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Part of the filter the store evaluates
    pub range: ActivityRange,
    /// An activity type was requested that no record can have
    pub unknown_type: bool,
    pub duration: Bounds<u32>,
    /// Bounds in hundredths of a kilometre
    pub distance: Bounds<i64>,
    pub calories: Bounds<u32>,
}

impl ActivityFilter {
    /// True when no record can match, so the store need not be queried.
    pub fn matches_nothing(&self) -> bool {
        self.unknown_type
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        if self.unknown_type {
            return false;
        }
        let range = &self.range;
        range.start.map_or(true, |start| activity.date >= start)
            && range.end.map_or(true, |end| activity.date <= end)
            && range
                .activity_type
                .map_or(true, |t| activity.activity_type == t)
            && self.duration.contains(Some(activity.duration))
            && self.distance.contains(activity.distance.map(to_hundredths))
            && self.calories.contains(activity.calories_burned)
    }

    /// Keep only matching activities.
    pub fn apply(&self, activities: Vec<Activity>) -> Vec<Activity> {
        activities.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// Field an activity listing can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Date,
    Duration,
    CaloriesBurned,
    Distance,
}

impl OrderField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "date" => Some(OrderField::Date),
            "duration" => Some(OrderField::Duration),
            "calories_burned" => Some(OrderField::CaloriesBurned),
            "distance" => Some(OrderField::Distance),
            _ => None,
        }
    }
}

/// Sort order for activity listings, e.g. `-date` or `distance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for ActivityOrdering {
    fn default() -> Self {
        Self {
            field: OrderField::Date,
            descending: true,
        }
    }
}

impl ActivityOrdering {
    /// Parse an `ordering` parameter, falling back to `-date`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = non_empty(raw) else {
            return Self::default();
        };
        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        OrderField::parse(name)
            .map(|field| Self { field, descending })
            .unwrap_or_default()
    }

    /// Compare two activities. Missing values sort lowest; ties fall back
    /// to newest `created_at` first.
    pub fn compare(&self, a: &Activity, b: &Activity) -> Ordering {
        let primary = match self.field {
            OrderField::Date => a.date.cmp(&b.date),
            OrderField::Duration => a.duration.cmp(&b.duration),
            OrderField::CaloriesBurned => a.calories_burned.cmp(&b.calories_burned),
            OrderField::Distance => a.distance.map(to_hundredths).cmp(&b.distance.map(to_hundredths)),
        };
        let primary = if self.descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| b.created_at.cmp(&a.created_at))
    }

    pub fn sort(&self, activities: &mut [Activity]) {
        activities.sort_by(|a, b| self.compare(a, b));
    }
}

/// Requested page number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn from_params(page: Option<&str>, page_size: Option<&str>) -> Result<Self, AppError> {
        let page = match non_empty(page) {
            None => 1,
            Some("last") => usize::MAX,
            Some(raw) => parse_positive(raw, "Page must be a positive integer")?,
        };
        let page_size = match non_empty(page_size) {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => parse_positive(raw, "Page size must be a positive integer")?
                .min(MAX_PAGE_SIZE),
        };
        Ok(Self { page, page_size })
    }
}

fn parse_positive(raw: &str, message: &str) -> Result<usize, AppError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest(message.to_string())),
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: usize,
    /// 1-indexed page actually returned
    pub number: usize,
    pub num_pages: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<usize> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_number(&self) -> Option<usize> {
        self.has_previous().then(|| self.number - 1)
    }
}

/// Slice out the requested page. Pages past the end clamp to the last one.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let count = items.len();
    let page_size = request.page_size.max(1);
    let num_pages = count.div_ceil(page_size).max(1);
    let number = request.page.clamp(1, num_pages);

    let start = (number - 1) * page_size;
    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        count,
        number,
        num_pages,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn activity(
        id: &str,
        activity_type: ActivityType,
        duration: u32,
        distance: Option<f64>,
        calories: Option<u32>,
        day: u32,
        created_sec: u32,
    ) -> Activity {
        let created = Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, created_sec)
            .unwrap();
        Activity {
            id: id.to_string(),
            user_id: "u1".to_string(),
            activity_type,
            duration,
            distance,
            calories_burned: calories,
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            notes: String::new(),
            created_at: created,
            updated_at: created,
        }
    }

    fn sample() -> Vec<Activity> {
        vec![
            activity("a", ActivityType::Running, 30, Some(5.0), Some(200), 1, 1),
            activity("b", ActivityType::Running, 45, None, None, 2, 2),
            activity("c", ActivityType::Cycling, 90, Some(40.25), Some(800), 3, 3),
            activity("d", ActivityType::Yoga, 60, None, Some(150), 3, 4),
        ]
    }

    fn ids(activities: &[Activity]) -> Vec<&str> {
        activities.iter().map(|a| a.id.as_str()).collect()
    }

    fn query(pairs: &[(&str, &str)]) -> ActivityQuery {
        let mut q = ActivityQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "start_date" => q.start_date = v,
                "end_date" => q.end_date = v,
                "activity_type" => q.activity_type = v,
                "min_duration" => q.min_duration = v,
                "max_duration" => q.max_duration = v,
                "min_distance" => q.min_distance = v,
                "max_distance" => q.max_distance = v,
                "min_calories" => q.min_calories = v,
                "max_calories" => q.max_calories = v,
                "ordering" => q.ordering = v,
                "page" => q.page = v,
                "page_size" => q.page_size = v,
                other => panic!("unknown key {}", other),
            }
        }
        q
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let filter = query(&[]).filter();
        assert_eq!(filter.apply(sample()).len(), 4);
    }

    #[test]
    fn test_date_window_and_type() {
        let filter = query(&[
            ("start_date", "2025-01-02"),
            ("end_date", "2025-01-03"),
            ("activity_type", "running"),
        ])
        .filter();
        assert_eq!(filter.range.activity_type, Some(ActivityType::Running));
        assert_eq!(ids(&filter.apply(sample())), vec!["b"]);
    }

    #[test]
    fn test_unparseable_values_are_ignored() {
        let filter = query(&[
            ("start_date", "yesterday"),
            ("min_duration", "lots"),
            ("max_distance", ""),
        ])
        .filter();
        assert_eq!(filter.range.start, None);
        assert_eq!(filter.apply(sample()).len(), 4);
    }

    #[test]
    fn test_unknown_type_matches_nothing() {
        let filter = query(&[("activity_type", "curling")]).filter();
        assert!(filter.matches_nothing());
        assert!(filter.apply(sample()).is_empty());
    }

    #[test]
    fn test_numeric_bounds() {
        let filter = query(&[("min_duration", "45"), ("max_duration", "60")]).filter();
        assert_eq!(ids(&filter.apply(sample())), vec!["b", "d"]);

        // Absent distance never satisfies a distance bound
        let filter = query(&[("min_distance", "0")]).filter();
        assert_eq!(ids(&filter.apply(sample())), vec!["a", "c"]);

        let filter = query(&[("max_distance", "40.25")]).filter();
        assert_eq!(ids(&filter.apply(sample())), vec!["a", "c"]);

        let filter = query(&[("max_calories", "199")]).filter();
        assert_eq!(ids(&filter.apply(sample())), vec!["d"]);
    }

    #[test]
    fn test_default_ordering_is_newest_date_first() {
        let mut activities = sample();
        query(&[]).ordering().sort(&mut activities);
        // c and d share a date; newer created_at first
        assert_eq!(ids(&activities), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_ordering_by_field() {
        let mut activities = sample();
        ActivityOrdering::parse(Some("duration")).sort(&mut activities);
        assert_eq!(ids(&activities), vec!["a", "b", "d", "c"]);

        ActivityOrdering::parse(Some("-calories_burned")).sort(&mut activities);
        assert_eq!(ids(&activities), vec!["c", "a", "d", "b"]);

        // Missing distances sort lowest
        ActivityOrdering::parse(Some("distance")).sort(&mut activities);
        assert_eq!(ids(&activities), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_unknown_ordering_falls_back() {
        assert_eq!(
            ActivityOrdering::parse(Some("-notes")),
            ActivityOrdering::default()
        );
        assert_eq!(ActivityOrdering::parse(Some("")), ActivityOrdering::default());
    }

    #[test]
    fn test_page_request_parsing() {
        assert_eq!(PageRequest::from_params(None, None).unwrap(), PageRequest::default());

        let req = PageRequest::from_params(Some("3"), Some("500")).unwrap();
        assert_eq!(req.page, 3);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);

        assert!(matches!(
            PageRequest::from_params(Some("0"), None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            PageRequest::from_params(Some("two"), None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            PageRequest::from_params(None, Some("0")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=45).collect();

        let page = paginate(items.clone(), PageRequest { page: 1, page_size: 20 });
        assert_eq!(page.count, 45);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.items.len(), 20);
        assert_eq!(page.next_number(), Some(2));
        assert_eq!(page.previous_number(), None);

        let page = paginate(items.clone(), PageRequest { page: 3, page_size: 20 });
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert!(!page.has_next());
        assert!(page.has_previous());

        // Past the end clamps to the last page
        let page = paginate(items, PageRequest { page: 99, page_size: 20 });
        assert_eq!(page.number, 3);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), PageRequest::default());
        assert_eq!(page.count, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }
}
