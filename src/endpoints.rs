//! The API endpoint URIs.

/// The unauthenticated liveness check.
pub const ROOT: &str = "/";
/// The route for creating a new user account.
pub const REGISTER: &str = "/api/register";
/// The route for logging in a user and obtaining a bearer token.
pub const LOG_IN: &str = "/api/login";
/// The route for fetching the account behind a bearer token.
pub const USER: &str = "/api/user";
/// The route for uploading a batch of transactions.
pub const UPLOAD_TRANSACTIONS: &str = "/api/transactions/upload";
/// The route for downloading all of a user's transactions.
pub const DOWNLOAD_TRANSACTIONS: &str = "/api/transactions/download";

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::REGISTER);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::USER);
        assert_endpoint_is_valid_uri(endpoints::UPLOAD_TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::DOWNLOAD_TRANSACTIONS);
    }
}
