use serde_json::{json, Value};

/// Location tree; children point at their parent by `country_id` / `state_id`
pub(super) struct GeoData {
    pub countries: Vec<Value>,
    pub states: Vec<Value>,
    pub cities: Vec<Value>,
}

impl GeoData {
    pub fn children(&self, items: &[Value], parent_key: &str, parent_id: &str) -> Vec<Value> {
        items
            .iter()
            .filter(|item| match item.get(parent_key) {
                Some(Value::Number(n)) => n.to_string() == parent_id,
                Some(Value::String(s)) => s == parent_id,
                _ => false,
            })
            .cloned()
            .collect()
    }
}

pub(super) fn geo() -> GeoData {
    GeoData {
        countries: vec![
            json!({ "id": 1, "name": "Uzbekistan" }),
            json!({ "id": 2, "name": "Kazakhstan" }),
        ],
        states: vec![
            json!({ "state_id": 10, "state_name": "Tashkent Region", "country_id": 1 }),
            json!({ "state_id": 11, "state_name": "Samarkand Region", "country_id": 1 }),
            json!({ "state_id": 20, "state_name": "Almaty Region", "country_id": 2 }),
        ],
        cities: vec![
            json!({ "city_id": 100, "city_name": "Chirchiq", "state_id": 10 }),
            json!({ "city_id": 101, "city_name": "Angren", "state_id": 10 }),
            json!({ "city_id": 110, "city_name": "Samarkand", "state_id": 11 }),
            json!({ "city_id": 200, "city_name": "Almaty", "state_id": 20 }),
        ],
    }
}

pub(super) fn demo_records() -> Vec<(&'static str, Vec<Value>)> {
    vec![
        (
            "banners",
            vec![
                json!({ "id": 1, "title": "Free delivery weekend", "position": 1, "is_active": true }),
                json!({ "id": 2, "title": "New restaurants nearby", "position": 2, "is_active": false }),
            ],
        ),
        (
            "pricing",
            vec![
                json!({ "id": "basic", "plan_name": "Basic", "price": 0, "billing_period": "month" }),
                json!({ "id": "pro", "plan_name": "Pro", "price": "29.90", "billing_period": "month", "is_popular": 1 }),
            ],
        ),
        (
            "couriers",
            vec![
                json!({ "_id": "c1", "full_name": "Aziz Karimov", "phone": "+998901112233", "vehicle_type": "bike", "rating": 4.8, "is_online": true }),
                json!({ "_id": "c2", "name": "Dina Saparova", "phone_number": "+77011234567", "vehicle": "car", "rating": "4.5" }),
            ],
        ),
        (
            "orders",
            vec![
                json!({
                    "id": 501, "order_number": "FD-0501", "customer_name": "Olim",
                    "pickup_address": "Amir Temur 1", "delivery_address": "Navoi 12",
                    "total_amount": 84000, "payment_method": "cash", "status": "delivered",
                    "created_at": "2026-10-01T09:30:00Z"
                }),
                json!({
                    "id": 502, "order_number": "FD-0502", "customer": "Madina",
                    "from_address": "Chilonzor 5", "to_address": "Yunusobod 9",
                    "total": "51000", "payment_method": "card", "order_status": "pending",
                    "createdAt": "2026-10-02 14:05:00"
                }),
            ],
        ),
    ]
}

pub(super) fn demo_owned_records() -> Vec<(&'static str, &'static str, Vec<Value>)> {
    vec![(
        "restaurant-orders",
        "42",
        vec![json!({
            "id": 900, "order_number": "FD-0900", "customer_name": "Bekzod",
            "pickup_address": "Kitchen 42", "delivery_address": "Mirzo Ulugbek 3",
            "total_amount": 120000, "payment_method": "cash", "status": "cooking",
            "created_at": "2026-10-03"
        })],
    )]
}
