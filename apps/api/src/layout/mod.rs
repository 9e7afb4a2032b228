// Pagination: section model, height estimation and page allocation.
// Everything here is pure and synchronous except the workspace store.

pub mod estimator;
pub mod geometry;
pub mod handlers;
pub mod page_fill;
pub mod sections;
pub mod workspace;

pub use estimator::HeightEstimator;
pub use workspace::PaginationWorkspace;
