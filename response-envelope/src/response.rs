//! Response envelope types.
//!
//! - [`ResponseEnvelope`]: status, headers and raw body of one exchange
//! - [`TypedResponseEnvelope`]: an envelope with a lazily materialized payload
//! - [`PagedResponseEnvelope`]: one page of a collection plus its continuation
//! - [`Metadata`]: read-only header view

mod envelope;
mod metadata;
mod paged;
mod typed;

pub use envelope::{ResponseEnvelope, ResponseEnvelopeBuilder};
pub use metadata::Metadata;
pub use paged::{Continuation, Page, PageFormat, PagedResponseEnvelope};
pub use typed::{PayloadState, TypedResponseEnvelope};
