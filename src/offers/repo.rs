use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::offers::query::SearchPlan;
use crate::storage::ImageRef;

/// Persisted offer record, as written on publish. Offers carry no update or
/// delete surface; name and price are immutable after creation.
#[derive(Debug, Clone, FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub product_name: String,
    pub product_description: String,
    pub product_price: f64,
    pub product_details: Json<Value>,
    pub product_image: Option<Json<ImageRef>>,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Offer row with its owner's reduced profile joined in. The join is LEFT so
/// a dangling owner reference yields null columns instead of hiding the
/// offer.
#[derive(Debug, Clone, FromRow)]
pub struct OfferWithOwner {
    pub id: Uuid,
    pub product_name: String,
    pub product_description: String,
    pub product_price: f64,
    pub product_details: Json<Value>,
    pub product_image: Option<Json<ImageRef>>,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
    pub owner_username: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_avatar: Option<Json<ImageRef>>,
}

pub struct NewOffer {
    pub id: Uuid,
    pub product_name: String,
    pub product_description: String,
    pub product_price: f64,
    pub product_details: Value,
    pub product_image: Option<ImageRef>,
    pub owner_id: Uuid,
}

const SELECT_WITH_OWNER: &str = "\
SELECT o.id, o.product_name, o.product_description, o.product_price, \
o.product_details, o.product_image, o.owner_id, o.created_at, \
u.username AS owner_username, u.phone AS owner_phone, u.avatar AS owner_avatar \
FROM offers o LEFT JOIN users u ON u.id = o.owner_id";

/// Append the plan's filter as a WHERE clause. Shared between the page read
/// and the count so both always see the same matching set.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, plan: &SearchPlan) {
    let mut sep = " WHERE ";
    if let Some(pattern) = plan.like_pattern() {
        qb.push(sep)
            .push("o.product_name ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
        sep = " AND ";
    }
    if let Some(min) = plan.price_min {
        qb.push(sep).push("o.product_price >= ").push_bind(min);
        sep = " AND ";
    }
    if let Some(max) = plan.price_max {
        qb.push(sep).push("o.product_price <= ").push_bind(max);
    }
}

impl OfferWithOwner {
    /// Filtered, ordered, paginated page of offers.
    pub async fn search(db: &PgPool, plan: &SearchPlan) -> anyhow::Result<Vec<OfferWithOwner>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_WITH_OWNER);
        push_filters(&mut qb, plan);
        if let Some(order) = plan.order {
            qb.push(" ORDER BY ").push(order.sql());
        }
        qb.push(" LIMIT ")
            .push_bind(plan.limit)
            .push(" OFFSET ")
            .push_bind(plan.offset);

        let rows = qb
            .build_query_as::<OfferWithOwner>()
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Total number of offers matching the plan's filter, ignoring order and
    /// page window.
    pub async fn count(db: &PgPool, plan: &SearchPlan) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM offers o");
        push_filters(&mut qb, plan);
        let count: i64 = qb.build_query_scalar().fetch_one(db).await?;
        Ok(count)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<OfferWithOwner>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_WITH_OWNER);
        qb.push(" WHERE o.id = ").push_bind(id);
        let row = qb
            .build_query_as::<OfferWithOwner>()
            .fetch_optional(db)
            .await?;
        Ok(row)
    }
}

impl Offer {
    /// Single insert; the offer arrives fully built, image reference
    /// included.
    pub async fn insert(db: &PgPool, new: &NewOffer) -> anyhow::Result<Offer> {
        let offer = sqlx::query_as::<_, Offer>(
            r#"
            INSERT INTO offers (id, product_name, product_description, product_price,
                                product_details, product_image, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, product_name, product_description, product_price,
                      product_details, product_image, owner_id, created_at
            "#,
        )
        .bind(new.id)
        .bind(&new.product_name)
        .bind(&new.product_description)
        .bind(new.product_price)
        .bind(Json(new.product_details.clone()))
        .bind(new.product_image.clone().map(Json))
        .bind(new.owner_id)
        .fetch_one(db)
        .await?;
        Ok(offer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offers::dto::OfferSearchParams;
    use crate::offers::query::SortOrder;

    fn plan_for(params: OfferSearchParams) -> SearchPlan {
        SearchPlan::from_params(&params)
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM offers o");
        push_filters(&mut qb, &plan_for(OfferSearchParams::default()));
        assert_eq!(qb.into_sql(), "SELECT COUNT(*) FROM offers o");
    }

    #[test]
    fn title_filter_uses_case_insensitive_like() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM offers o");
        push_filters(
            &mut qb,
            &plan_for(OfferSearchParams {
                title: Some("shirt".into()),
                ..Default::default()
            }),
        );
        let sql = qb.into_sql();
        assert!(sql.contains("WHERE o.product_name ILIKE $1 ESCAPE '\\'"), "{sql}");
    }

    #[test]
    fn price_bounds_combine_into_one_range() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM offers o");
        push_filters(
            &mut qb,
            &plan_for(OfferSearchParams {
                price_min: Some(5.0),
                price_max: Some(30.0),
                ..Default::default()
            }),
        );
        let sql = qb.into_sql();
        assert!(sql.contains("o.product_price >= $1"), "{sql}");
        assert!(sql.contains("AND o.product_price <= $2"), "{sql}");
    }

    #[test]
    fn single_price_bound_stands_alone() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM offers o");
        push_filters(
            &mut qb,
            &plan_for(OfferSearchParams {
                price_max: Some(30.0),
                ..Default::default()
            }),
        );
        let sql = qb.into_sql();
        assert!(sql.contains("WHERE o.product_price <= $1"), "{sql}");
        assert!(!sql.contains(">="), "{sql}");
    }

    #[test]
    fn all_filters_chain_with_and() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM offers o");
        push_filters(
            &mut qb,
            &plan_for(OfferSearchParams {
                title: Some("shirt".into()),
                price_min: Some(5.0),
                price_max: Some(30.0),
                ..Default::default()
            }),
        );
        let sql = qb.into_sql();
        assert!(sql.contains("ILIKE $1"), "{sql}");
        assert!(sql.contains("AND o.product_price >= $2"), "{sql}");
        assert!(sql.contains("AND o.product_price <= $3"), "{sql}");
    }

    #[test]
    fn order_fragments_match_sort_tokens() {
        assert_eq!(SortOrder::PriceAsc.sql(), "o.product_price ASC");
        assert_eq!(SortOrder::PriceDesc.sql(), "o.product_price DESC");
        assert_eq!(SortOrder::DateAsc.sql(), "o.created_at ASC");
        assert_eq!(SortOrder::DateDesc.sql(), "o.created_at DESC");
    }
}
