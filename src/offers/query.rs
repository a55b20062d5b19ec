//! Search-plan construction for offer listing.
//!
//! Turns the optional query parameters of `GET /offers` into a store-ready
//! plan: filter, order, page window. Construction is pure; the repo applies
//! the same filter for both the page read and the total count.

use crate::offers::dto::OfferSearchParams;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    DateAsc,
    DateDesc,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    /// Recognize one of the four sort tokens; anything else means the store
    /// default order.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "date-asc" => Some(Self::DateAsc),
            "date-desc" => Some(Self::DateDesc),
            "price-asc" => Some(Self::PriceAsc),
            "price-desc" => Some(Self::PriceDesc),
            _ => None,
        }
    }

    /// ORDER BY fragment, relative to the `offers` table alias `o`.
    pub fn sql(self) -> &'static str {
        match self {
            Self::DateAsc => "o.created_at ASC",
            Self::DateDesc => "o.created_at DESC",
            Self::PriceAsc => "o.product_price ASC",
            Self::PriceDesc => "o.product_price DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub title: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub order: Option<SortOrder>,
    pub limit: i64,
    pub offset: i64,
}

impl SearchPlan {
    pub fn from_params(params: &OfferSearchParams) -> Self {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self {
            title: params
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            price_min: params.price_min,
            price_max: params.price_max,
            order: params.sort.as_deref().and_then(SortOrder::from_token),
            limit,
            offset: (page - 1) * limit,
        }
    }

    /// Case-insensitive substring pattern for the title filter, with LIKE
    /// wildcards in the user input escaped so they match literally.
    pub fn like_pattern(&self) -> Option<String> {
        self.title
            .as_deref()
            .map(|t| format!("%{}%", escape_like(t)))
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
