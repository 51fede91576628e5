//! Integration suite: exercises the domain through its public surface
//! with recording hardware mocks.

mod automation_tests;
mod time_sync_tests;
