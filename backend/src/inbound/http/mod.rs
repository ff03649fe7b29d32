//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

pub mod account;
pub mod admin;
pub mod auth;
pub mod categories;
pub mod cookies;
pub mod error;
pub mod health;
pub mod identity;
pub mod placemarks;
pub mod rate_limit;
pub mod responses;
pub mod reviews;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

/// Largest accepted raw request body, sized for placemark images.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Register extractor configuration and every route.
///
/// The caller supplies `web::Data<HttpState>` and `web::Data<HealthState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(validation::json_config())
        .app_data(validation::query_config())
        .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .service(health::ready)
        .service(health::live)
        .service(auth::register)
        .service(auth::login)
        .service(auth::refresh)
        .service(auth::logout)
        .service(auth::change_password)
        .service(auth::forgot_password)
        .service(auth::reset_password)
        .service(auth::verify_email)
        .service(auth::google_sign_in)
        .service(account::current_user)
        .service(account::update_profile)
        .service(account::delete_account)
        .service(account::request_email_change)
        .service(account::confirm_email_change)
        .service(categories::list_categories)
        .service(categories::create_category)
        .service(categories::delete_category)
        .service(placemarks::list_placemarks)
        .service(placemarks::create_placemark)
        .service(placemarks::get_placemark)
        .service(placemarks::update_placemark)
        .service(placemarks::delete_placemark)
        .service(placemarks::upload_image)
        .service(reviews::list_reviews)
        .service(reviews::create_review)
        .service(reviews::delete_review)
        .service(admin::list_users)
        .service(admin::delete_user)
        .service(admin::set_role);
}
