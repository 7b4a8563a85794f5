//! Timeline snapshot model and the read-only queries the export pipeline runs against it.

pub(crate) mod model;
pub(crate) mod query;
