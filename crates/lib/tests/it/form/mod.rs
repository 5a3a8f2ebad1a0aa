//! Form root tests
//!
//! Submission flow, reset of submission state and observer notifications.

mod events;
