//! Route handlers for the HTTP API.

pub mod archive;
pub mod events;
pub mod page;
pub mod segments;
pub mod split;
pub mod status;
