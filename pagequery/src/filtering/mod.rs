//! # Filter Grammar
//!
//! Turns flat query parameters into a structured [`PageRequest`](crate::PageRequest)
//! and back again.
//!
//! ## Query Parameter Examples
//!
//! ```text
//! // Single equality filter
//! GET /clusters?search[0].field=status&search[0].op=EQ&search[0].value=ACTIVE
//!
//! // Multi-valued IN, combined (AND) with a presence check
//! GET /clusters?search[0].field=region&search[0].op=IN&search[0].value=eu&search[0].value=us
//!              &search[1].field=deletedAt&search[1].op=NOT_EXISTS
//!
//! // (status = ACTIVE) OR (replicas >= 3 AND tier != free)
//! GET /clusters?or[0][0].field=status&or[0][0].op=EQ&or[0][0].value=ACTIVE
//!              &or[1][0].field=replicas&or[1][0].op=GE&or[1][0].value=3
//!              &or[1][1].field=tier&or[1][1].op=NE&or[1][1].value=free
//!
//! // Multi-key sort, paging and projection
//! GET /clusters?sort[0].field=name&sort[1].field=createdAt&sort[1].order=DESC
//!              &offset=40&limit=20&fields=name,status
//! ```
//!
//! Operator tokens are matched case-insensitively. Index gaps
//! (`search[2]` without `search[1]`) are rejected rather than skipped.

pub mod encode;
pub mod operator;
pub mod parser;

pub use encode::{to_query_pairs, to_query_string};
pub use operator::{Arity, FilterOperator};
pub use parser::{parse_params, parse_query_string};
