diesel::table! {
    bookings (id) {
        id -> Uuid,
        user_id -> Uuid,
        event_id -> Uuid,
        tickets -> Int4,
        total_price -> Numeric,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    events (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        location -> Varchar,
        starts_at -> Timestamptz,
        price -> Numeric,
        total_seats -> Int4,
        available_seats -> Int4,
        status -> Varchar,
        category -> Varchar,
        image_url -> Varchar,
        organizer_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(bookings -> events (event_id));

diesel::allow_tables_to_appear_in_same_query!(
    bookings,
    events,
);
