//! The dashboard's pages, each one an endpoint plus its field map.
//!
//! Aliases list the spellings the backend has used for a field over time,
//! freshest first; the first alias is also the key writes are sent under.

use serde_json::json;

use crate::assets::AssetStrategy;
use crate::collection::{EndpointDescriptor, FieldMap, FieldSpec};
use crate::config::ViewConfig;
use crate::error::ClientResult;
use crate::view::SortState;

pub const UPLOAD_PATH: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct Resource {
    pub name: &'static str,
    pub title: &'static str,
    pub endpoint: EndpointDescriptor,
    /// Fixed page size; `None` follows the configured default
    pub page_size: Option<usize>,
    pub default_sort: Option<SortState>,
    pub assets: AssetStrategy,
    /// Fields that hold an image reference or data URL
    pub image_fields: Vec<&'static str>,
}

impl Resource {
    fn new(name: &'static str, title: &'static str, endpoint: EndpointDescriptor) -> Self {
        Self {
            name,
            title,
            endpoint,
            page_size: None,
            default_sort: None,
            assets: AssetStrategy::Inline,
            image_fields: Vec::new(),
        }
    }

    fn sorted_by(mut self, key: &str, ascending: bool) -> Self {
        self.default_sort = Some(SortState::by(key, ascending));
        self
    }

    fn with_images(mut self, strategy: AssetStrategy, fields: &[&'static str]) -> Self {
        self.assets = strategy;
        self.image_fields = fields.to_vec();
        self
    }

    fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn page_size_for(&self, view: &ViewConfig) -> usize {
        self.page_size.unwrap_or(view.default_page_size).max(1)
    }

    /// Column names in display order, id first
    pub fn columns(&self) -> Vec<String> {
        self.endpoint.field_map.fields().iter().map(|f| f.name.clone()).collect()
    }
}

pub fn catalogue() -> ClientResult<Vec<Resource>> {
    Ok(vec![
        banners()?,
        pricing()?,
        companies()?,
        dealers()?,
        restaurants()?,
        couriers()?,
        orders()?,
        pages()?,
        restaurant_orders()?,
        dealer_restaurants()?,
    ])
}

pub fn find(name: &str) -> ClientResult<Option<Resource>> {
    Ok(catalogue()?.into_iter().find(|r| r.name.eq_ignore_ascii_case(name)))
}

pub fn names() -> &'static [&'static str] {
    &[
        "banners",
        "pricing",
        "companies",
        "dealers",
        "restaurants",
        "couriers",
        "orders",
        "pages",
        "restaurant-orders",
        "dealer-restaurants",
    ]
}

fn banners() -> ClientResult<Resource> {
    let map = FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "banner_id"]),
            FieldSpec::text("title", &["title", "name", "heading"]).required().searchable(),
            FieldSpec::text("subtitle", &["subtitle", "sub_title", "description"]).searchable(),
            FieldSpec::text("image", &["image", "image_url", "imageUrl", "img"]),
            FieldSpec::text("link", &["link", "url", "href"]),
            FieldSpec::number("position", &["position", "order", "sort_order"]).with_default(json!(0)),
            FieldSpec::boolean("active", &["is_active", "active", "status"]),
            FieldSpec::date("created", &["created_at", "createdAt"]).read_only(),
        ],
    )?;
    Ok(Resource::new("banners", "Banners", EndpointDescriptor::conventional("banners", map))
        .sorted_by("position", true)
        .with_images(AssetStrategy::Inline, &["image"]))
}

fn pricing() -> ClientResult<Resource> {
    let map = FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "plan_id"]),
            FieldSpec::text("plan", &["plan_name", "name", "title"]).required().searchable(),
            FieldSpec::number("price", &["price", "amount", "monthly_price"]).required(),
            FieldSpec::text("currency", &["currency", "curr"]).with_default(json!("USD")),
            FieldSpec::text("period", &["billing_period", "period", "interval"]).searchable(),
            FieldSpec::json("features", &["features", "feature_list"]),
            FieldSpec::boolean("popular", &["is_popular", "popular", "highlighted"]),
        ],
    )?;
    Ok(Resource::new("pricing", "Pricing plans", EndpointDescriptor::conventional("pricing", map))
        .sorted_by("price", true))
}

fn companies() -> ClientResult<Resource> {
    let map = FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "company_id"]),
            FieldSpec::text("name", &["company_name", "name", "title"]).required().searchable(),
            FieldSpec::text("email", &["email", "contact_email"]).searchable(),
            FieldSpec::text("phone", &["phone", "phone_number", "contact_phone"]).searchable(),
            FieldSpec::text("tax_id", &["tax_id", "taxId", "vat", "inn"]),
            FieldSpec::text("address", &["address", "addr", "location"]),
            FieldSpec::text("logo", &["logo", "logo_url"]),
            FieldSpec::text("status", &["status", "state"]).searchable(),
        ],
    )?;
    Ok(Resource::new("companies", "Companies", EndpointDescriptor::conventional("companies", map))
        .sorted_by("name", true)
        .with_images(AssetStrategy::Upload { path: UPLOAD_PATH.to_string() }, &["logo"]))
}

fn dealers() -> ClientResult<Resource> {
    let map = FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "dealer_id"]),
            FieldSpec::text("name", &["full_name", "name", "dealer_name", "fullName"]).required().searchable(),
            FieldSpec::text("email", &["email", "mail"]).required().searchable(),
            FieldSpec::text("phone", &["phone", "phone_number", "tel"]).searchable(),
            FieldSpec::text("region", &["region", "city", "area"]).searchable(),
            FieldSpec::number("restaurants", &["restaurants_count", "restaurant_count", "restaurantsCount"]).read_only(),
            FieldSpec::text("status", &["status"]).searchable(),
            FieldSpec::date("joined", &["created_at", "createdAt", "joined_at"]).read_only(),
        ],
    )?;
    Ok(Resource::new("dealers", "Dealers", EndpointDescriptor::conventional("dealers", map))
        .sorted_by("name", true))
}

fn restaurants() -> ClientResult<Resource> {
    Ok(Resource::new(
        "restaurants",
        "Restaurants",
        EndpointDescriptor::conventional("restaurants", restaurant_map()?),
    )
    .sorted_by("name", true)
    .with_images(AssetStrategy::Inline, &["image"]))
}

fn restaurant_map() -> ClientResult<FieldMap> {
    FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "restaurant_id"]),
            FieldSpec::text("name", &["restaurant_name", "name", "title"]).required().searchable(),
            FieldSpec::text("phone", &["phone", "phone_number", "contact_phone"]).searchable(),
            FieldSpec::text("email", &["email", "contact_email"]).searchable(),
            FieldSpec::text("address", &["address", "street_address", "addr"]).searchable(),
            FieldSpec::text("country", &["country_id", "country"]),
            FieldSpec::text("state", &["state_id", "state", "province_id"]),
            FieldSpec::text("city", &["city_id", "city"]),
            FieldSpec::text("dealer", &["dealer_id", "dealerId"]),
            FieldSpec::text("image", &["image", "logo", "image_url"]),
            FieldSpec::text("status", &["status"]).searchable(),
        ],
    )
}

fn couriers() -> ClientResult<Resource> {
    let map = FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "courier_id"]),
            FieldSpec::text("name", &["full_name", "name", "courier_name", "fullName"]).required().searchable(),
            FieldSpec::text("phone", &["phone", "phone_number", "mobile"]).required().searchable(),
            FieldSpec::text("vehicle", &["vehicle_type", "vehicle", "transport"]).searchable(),
            FieldSpec::text("plate", &["plate_number", "plate", "license_plate"]).searchable(),
            FieldSpec::number("rating", &["rating", "avg_rating", "score"]).read_only(),
            FieldSpec::number("deliveries", &["deliveries_count", "total_deliveries", "orders_count"]).read_only(),
            FieldSpec::boolean("online", &["is_online", "online", "available"]),
            FieldSpec::text("status", &["status"]).searchable(),
        ],
    )?;
    Ok(Resource::new("couriers", "Couriers", EndpointDescriptor::conventional("couriers", map))
        .sorted_by("name", true))
}

fn order_map() -> ClientResult<FieldMap> {
    FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "order_id", "orderId"]),
            FieldSpec::text("number", &["order_number", "number", "code", "tracking_number"]).searchable().read_only(),
            FieldSpec::text("customer", &["customer_name", "customer", "client_name"]).required().searchable(),
            FieldSpec::text("phone", &["customer_phone", "phone", "phone_number"]).searchable(),
            FieldSpec::text("pickup", &["pickup_address", "from_address", "pickup"]).required(),
            FieldSpec::text("dropoff", &["delivery_address", "to_address", "dropoff"]).required().searchable(),
            FieldSpec::text("courier", &["courier_id", "courierId"]),
            FieldSpec::text("restaurant", &["restaurant_id", "restaurantId"]),
            FieldSpec::number("total", &["total_amount", "total", "amount", "price"]),
            FieldSpec::text("payment", &["payment_method", "paymentMethod", "payment_type"]).required(),
            FieldSpec::text("status", &["status", "order_status", "state"]).searchable(),
            FieldSpec::date("placed", &["created_at", "createdAt", "order_date"]).read_only(),
        ],
    )
}

fn orders() -> ClientResult<Resource> {
    Ok(Resource::new("orders", "Orders & shipments", EndpointDescriptor::conventional("orders", order_map()?))
        .sorted_by("placed", false)
        .with_page_size(20))
}

fn pages() -> ClientResult<Resource> {
    let map = FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", "page_id", "slug"]),
            FieldSpec::text("title", &["title", "name", "heading"]).required().searchable(),
            FieldSpec::text("slug", &["url_slug", "permalink", "path", "slug"]).searchable(),
            FieldSpec::text("body", &["content", "body", "html"]).required(),
            FieldSpec::text("locale", &["locale", "lang", "language"]).with_default(json!("en")),
            FieldSpec::boolean("published", &["is_published", "published"]),
            FieldSpec::date("updated", &["updated_at", "updatedAt", "modified_at"]).read_only(),
        ],
    )?;
    // Reads still carry the legacy `url_slug`; writes take `slug`
    let endpoint = EndpointDescriptor::conventional("pages", map).with_payload_key("slug", "slug");
    Ok(Resource::new("pages", "Content pages", endpoint)
        .sorted_by("title", true))
}

fn restaurant_orders() -> ClientResult<Resource> {
    let endpoint = EndpointDescriptor::restful("restaurant-orders", "/restaurant/{user_id}/orders", order_map()?)
        .with_update_method(reqwest::Method::PATCH);
    Ok(Resource::new("restaurant-orders", "My orders", endpoint)
        .sorted_by("placed", false)
        .with_page_size(20))
}

fn dealer_restaurants() -> ClientResult<Resource> {
    let endpoint = EndpointDescriptor::restful("dealer-restaurants", "/dealer/{user_id}/restaurants", restaurant_map()?);
    Ok(Resource::new("dealer-restaurants", "My restaurants", endpoint)
        .sorted_by("name", true)
        .with_images(AssetStrategy::Inline, &["image"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_map_validates() {
        let all = catalogue().unwrap();
        assert_eq!(all.len(), names().len());
        for (resource, name) in all.iter().zip(names()) {
            assert_eq!(resource.name, *name);
            if let Some(sort) = &resource.default_sort {
                let key = sort.key.as_deref().unwrap();
                assert!(resource.endpoint.field_map.field(key).is_some(), "{}: unknown sort key {}", name, key);
            }
            for field in &resource.image_fields {
                assert!(resource.endpoint.field_map.field(field).is_some(), "{}: unknown image field {}", name, field);
            }
            assert!(!resource.endpoint.field_map.searchable_fields().is_empty(), "{} has nothing to search", name);
        }
    }

    #[test]
    fn page_size_falls_back_to_the_configured_default() {
        let view = ViewConfig { default_page_size: 25 };
        assert_eq!(find("orders").unwrap().unwrap().page_size_for(&view), 20);
        assert_eq!(find("couriers").unwrap().unwrap().page_size_for(&view), 25);
        assert_eq!(find("couriers").unwrap().unwrap().page_size_for(&ViewConfig { default_page_size: 0 }), 1);
    }

    #[test]
    fn image_strategies_name_their_fields() {
        for resource in catalogue().unwrap() {
            if matches!(resource.assets, AssetStrategy::Upload { .. }) {
                assert!(!resource.image_fields.is_empty(), "{} uploads nothing", resource.name);
            }
        }
    }

    #[test]
    fn scoped_resources_use_the_session_user() {
        assert!(find("restaurant-orders").unwrap().unwrap().endpoint.is_scoped());
        assert!(!find("orders").unwrap().unwrap().endpoint.is_scoped());
        assert!(find("Couriers").unwrap().is_some());
        assert!(find("nope").unwrap().is_none());
    }
}
