//! Catalog query model.
//!
//! A listing request is normalised into a [`CatalogQuery`]: a
//! [`CatalogFilter`] (publication state, title substring, tag membership)
//! and a [`PageRequest`]. Store adapters translate the filter into their
//! own query language; [`CatalogFilter::matches`] and [`newest_first`] are
//! the reference semantics they must agree with.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Post, PostSummary};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Limits applied when normalising caller-supplied paging.
#[derive(Debug, Clone, Copy)]
pub struct CatalogSettings {
    /// Used when `limit` is missing or not positive.
    pub default_limit: u64,
    /// Larger limits are clamped down to this.
    pub max_limit: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Raw listing parameters as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    /// Comma separated tag names.
    pub tags: Option<String>,
}

/// Filter predicate shared by the page query and the count query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    text: Option<String>,
    tag_names: BTreeSet<String>,
    include_unpublished: bool,
    /// Author whose unpublished posts stay visible when the rest are hidden.
    unpublished_owner: Option<Uuid>,
}

impl CatalogFilter {
    /// Only published posts, no text or tag restriction.
    pub fn public() -> Self {
        Self::default()
    }

    pub fn including_unpublished(mut self) -> Self {
        self.include_unpublished = true;
        self.unpublished_owner = None;
        self
    }

    /// Published posts plus the unpublished posts of `owner`.
    pub fn including_unpublished_of(mut self, owner: Uuid) -> Self {
        self.include_unpublished = false;
        self.unpublished_owner = Some(owner);
        self
    }

    /// Case-insensitive title substring; blank input removes the predicate.
    pub fn with_text(mut self, text: &str) -> Self {
        let trimmed = text.trim();
        self.text = (!trimmed.is_empty()).then(|| trimmed.to_lowercase());
        self
    }

    pub fn with_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tag_names = names
            .into_iter()
            .filter_map(|n| crate::domain::Tag::normalize_name(n.as_ref()))
            .collect();
        self
    }

    /// Lowercased title needle, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn tag_names(&self) -> &BTreeSet<String> {
        &self.tag_names
    }

    pub fn include_unpublished(&self) -> bool {
        self.include_unpublished
    }

    pub fn unpublished_owner(&self) -> Option<Uuid> {
        self.unpublished_owner
    }

    /// Evaluate the predicate against a post and the names of its tags.
    ///
    /// Tag filtering has OR semantics: one matching tag is enough.
    pub fn matches(&self, post: &Post, post_tag_names: &[String]) -> bool {
        if !post.state.is_public()
            && !self.include_unpublished
            && self.unpublished_owner != Some(post.owner_id)
        {
            return false;
        }
        if let Some(needle) = &self.text {
            if !post.title.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if !self.tag_names.is_empty()
            && !post_tag_names.iter().any(|n| self.tag_names.contains(n))
        {
            return false;
        }
        true
    }
}

/// Catalog ordering: newest first, ties broken by id (insertion order) descending.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// A validated page window. Both fields are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Page metadata computed from the count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total_count: u64) -> Self {
        Self {
            current_page: request.page(),
            total_pages: total_count.div_ceil(request.limit()),
            total_count,
        }
    }
}

/// A fully normalised listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: CatalogFilter,
    pub page: PageRequest,
}

impl CatalogQuery {
    /// Normalise raw parameters.
    ///
    /// Missing or non-positive `page` becomes 1, missing or non-positive
    /// `limit` becomes the configured default, and oversized limits are
    /// clamped to the configured maximum.
    pub fn from_params(
        params: &CatalogParams,
        include_unpublished: bool,
        settings: &CatalogSettings,
    ) -> Self {
        let page = params.page.filter(|p| *p > 0).unwrap_or(1) as u64;
        let limit = params
            .limit
            .filter(|l| *l > 0)
            .map(|l| (l as u64).min(settings.max_limit.max(1)))
            .unwrap_or(settings.default_limit);

        let mut filter = CatalogFilter::public()
            .with_text(params.query.as_deref().unwrap_or_default())
            .with_tags(parse_tag_list(params.tags.as_deref().unwrap_or_default()));
        if include_unpublished {
            filter = filter.including_unpublished();
        }

        Self {
            filter,
            page: PageRequest::new(page, limit),
        }
    }
}

/// One page of catalog results.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub posts: Vec<PostSummary>,
    pub pagination: Pagination,
}

/// Split a comma separated tag list, dropping blanks and duplicates.
pub fn parse_tag_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .filter_map(crate::domain::Tag::normalize_name)
        .collect()
}
