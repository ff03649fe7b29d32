//! Diesel table definitions for the PostgreSQL schema.
//!
//! These must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Accounts. `email` and `(oauth_provider, oauth_subject)` are unique.
    users (id) {
        id -> Uuid,
        email -> Varchar,
        password_hash -> Nullable<Text>,
        role -> Varchar,
        email_verified_at -> Nullable<Timestamptz>,
        first_name -> Varchar,
        last_name -> Varchar,
        contact_email -> Nullable<Varchar>,
        contact_phone -> Nullable<Varchar>,
        oauth_provider -> Nullable<Varchar>,
        oauth_subject -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One row per issued refresh token; `jti` links the paired access token.
    refresh_tokens (token) {
        token -> Text,
        user_id -> Uuid,
        jti -> Varchar,
        revoked -> Bool,
        expires_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Outstanding password-reset and email-change tokens.
    one_time_tokens (token) {
        token -> Text,
        user_id -> Uuid,
        purpose -> Varchar,
        new_email -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    categories (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    placemarks (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        street -> Varchar,
        house_number -> Varchar,
        zip -> Varchar,
        city -> Varchar,
        country -> Varchar,
        latitude -> Float8,
        longitude -> Float8,
        image_url -> Nullable<Text>,
        is_public -> Bool,
        view_count -> Int8,
        owner_id -> Uuid,
        category_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Reviews and replies; replies carry `parent_id`.
    reviews (id) {
        id -> Uuid,
        rating -> Nullable<Int2>,
        comment -> Text,
        author_id -> Uuid,
        placemark_id -> Uuid,
        parent_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(refresh_tokens -> users (user_id));
diesel::joinable!(one_time_tokens -> users (user_id));
diesel::joinable!(categories -> users (created_by));
diesel::joinable!(placemarks -> categories (category_id));
diesel::joinable!(reviews -> placemarks (placemark_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    refresh_tokens,
    one_time_tokens,
    categories,
    placemarks,
    reviews,
);
