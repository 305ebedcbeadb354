//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod account_repo;
pub mod asset_repo;
pub mod category_repo;
pub mod component_repo;
pub mod component_version_repo;
pub mod license_repo;
pub mod magic_link_repo;
pub mod session_repo;
pub mod stripe_event_repo;
pub mod subcategory_repo;
pub mod user_repo;

pub use account_repo::AccountRepo;
pub use asset_repo::AssetRepo;
pub use category_repo::{CategoryRepo, NewCategory};
pub use component_repo::{ComponentRepo, NewComponent};
pub use component_version_repo::{ComponentVersionRepo, VersionDeletion};
pub use license_repo::{ActivateOutcome, LicenseRepo};
pub use magic_link_repo::MagicLinkRepo;
pub use session_repo::SessionRepo;
pub use stripe_event_repo::StripeEventRepo;
pub use subcategory_repo::{NewSubcategory, SubcategoryRepo};
pub use user_repo::UserRepo;
