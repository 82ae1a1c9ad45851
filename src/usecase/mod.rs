//! Business operations behind the HTTP handlers.
//!
//! Both use cases are placeholders of this template. Their traits are the seam for real
//! implementations and for test doubles.

pub mod limit;
pub mod user;
