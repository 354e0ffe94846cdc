//! Data model shared between the flyer service and its clients.

pub mod jobs;
pub mod model;
pub mod requests;
