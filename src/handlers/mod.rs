//! The three gateway operations. Each handler is a pure async function from
//! an [`ApiEvent`](crate::event::ApiEvent) to an
//! [`ApiResponse`](crate::event::ApiResponse): method gate, parse, one
//! provider call and/or one database round trip, format.

pub mod generate;
pub mod history;
pub mod templates;
