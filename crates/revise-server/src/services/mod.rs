//! Business logic services

pub mod catalog_sync;
pub mod dashboard;
pub mod notifier;
pub mod selection;

pub use catalog_sync::CatalogSync;
pub use dashboard::DashboardService;
pub use notifier::EmailNotifier;
pub use selection::SelectionJob;
