pub mod captcha;
pub mod catalog;
pub mod claimer;
pub mod http;

#[cfg(test)]
pub(crate) mod testing;

pub use captcha::{AntiCaptchaSolver, CaptchaSolver};
pub use catalog::{BookCatalog, CatalogConfig};
pub use claimer::{ClaimConfig, ClaimOutcome, ClaimedProduct, OfferClaimer};
pub use http::{ApiClient, ApiResponse, HttpClient};
