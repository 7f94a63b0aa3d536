// HTTP surface for CV documents. `handlers` covers storage-facing operations;
// `output` runs the layout pipeline and the exports.

pub mod handlers;
pub mod output;
