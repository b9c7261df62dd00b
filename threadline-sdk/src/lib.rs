//! Shared wire and API types for Threadline.
//!
//! Everything here is plain data: the JSON bodies exchanged with the HTTP
//! API and the lifecycle events fanned out between services.

pub mod objects;
