// Connection settings for the ignored `integration_*` tests.
//
// TEST_DATABASE_URL is read from the environment or a local `.env` file.

pub fn test_database_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a disposable PostgreSQL database")
}
