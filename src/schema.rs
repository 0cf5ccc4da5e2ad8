// Manually maintained to match the DDL in `repository::context`.

diesel::table! {
    links (id) {
        id -> BigInt,
        loc -> Text,
        image -> Text,
        crawled -> Bool,
    }
}

diesel::table! {
    raw_products (id) {
        id -> BigInt,
        html -> Text,
    }
}

diesel::table! {
    products (id) {
        id -> BigInt,
        name -> Text,
        price -> BigInt,
        alcohol_by_volume -> Integer,
        volume -> Integer,
        price_per_alcohol -> Double,
    }
}

diesel::table! {
    categories (id) {
        id -> BigInt,
        name -> Text,
    }
}

diesel::table! {
    product_categories (product_id, category_id) {
        product_id -> BigInt,
        category_id -> BigInt,
    }
}

diesel::joinable!(product_categories -> products (product_id));
diesel::joinable!(product_categories -> categories (category_id));

diesel::allow_tables_to_appear_in_same_query!(
    links,
    raw_products,
    products,
    categories,
    product_categories,
);
