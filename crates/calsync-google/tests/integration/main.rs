//! Integration tests for calsync-google
//!
//! Uses wiremock to simulate the Google Calendar API and verifies
//! end-to-end behavior of the client, event listing, pagination,
//! cursor invalidation, and retry handling.

mod common;

mod test_events;
mod test_retry;
