/// Page-number pagination for list endpoints
///
/// Clients send `?page=N&limit=M` (1-based page, `limit` capped at
/// [`MAX_PAGE_SIZE`]) and receive:
///
/// ```json
/// {
///   "count": 23,
///   "next": "http://localhost:8080/api/recipes/?limit=6&page=3",
///   "previous": "http://localhost:8080/api/recipes/?limit=6&page=1",
///   "results": []
/// }
/// ```

use axum::http::Uri;
use serde::Serialize;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

/// Upper bound on `limit`
pub const MAX_PAGE_SIZE: i64 = 100;

/// Parses an optional query parameter, naming the field on failure
pub fn parse_param<T: FromStr>(field: &str, raw: Option<&str>) -> ApiResult<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::invalid(field, format!("Invalid value: {}", value))),
    }
}

/// Parses `1/0/true/false` query flags
pub fn parse_flag(field: &str, raw: Option<&str>) -> ApiResult<bool> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(ApiError::invalid(field, format!("Invalid flag: {}", other))),
    }
}

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn from_params(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: i64,
    ) -> ApiResult<Self> {
        let page = parse_param::<i64>("page", page)?.unwrap_or(1);
        if page < 1 {
            return Err(ApiError::invalid("page", "Page must be a positive integer"));
        }

        let limit = parse_param::<i64>("limit", limit)?.unwrap_or(default_limit);
        if limit < 1 {
            return Err(ApiError::invalid("limit", "Limit must be a positive integer"));
        }

        Ok(Self {
            page,
            limit: limit.min(MAX_PAGE_SIZE),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page; `next`/`previous` keep every other query parameter of `uri`
    pub fn new(results: Vec<T>, count: i64, request: PageRequest, public_url: &str, uri: &Uri) -> Self {
        let has_next = request.offset() + (results.len() as i64) < count;
        let next = has_next.then(|| page_url(public_url, uri, request.page + 1));
        let previous = (request.page > 1).then(|| page_url(public_url, uri, request.page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// `uri` with its `page` parameter replaced
fn page_url(public_url: &str, uri: &Uri, page: i64) -> String {
    let mut params: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty() && *p != "page" && !p.starts_with("page="))
        .collect();

    let page_param = format!("page={}", page);
    params.push(&page_param);

    format!("{}{}?{}", public_url, uri.path(), params.join("&"))
}
