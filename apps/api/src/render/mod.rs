// Render targets. `preview` builds the presentation-neutral tree; `html` serializes
// that same tree into the print document handed to the PDF service.

pub mod html;
pub mod preview;
pub mod theme;

pub use html::render_document;
pub use preview::{build_preview, PreviewDocument};
