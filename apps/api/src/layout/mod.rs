// Layout subsystem: section catalog, content selection, page resolution and
// the overflow check. Everything here is pure and synchronous; both renderers
// consume the `PagePlan` produced by `resolver::resolve`.

pub mod catalog;
pub mod overflow;
pub mod page_format;
pub mod resolver;
pub mod selector;

// Re-export the public API consumed by handlers and renderers.
pub use page_format::{PageFormat, PageGeometry};
pub use resolver::{resolve, PagePlan};
pub use selector::CvView;
