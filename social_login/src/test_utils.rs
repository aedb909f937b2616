//! Shared test setup

use std::sync::Once;

/// Load `.env_test` (falling back to `.env`) once per test binary.
///
/// Variables already present in the environment win over the file.
pub(crate) fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
    });
}
