// Reusable profile library: the items CVs select from.

pub mod handlers;
