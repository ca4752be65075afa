//! Brands domain module.
//!
//! Brand ("manufacturer") records keyed by slug, and the company application
//! moderation state machine that feeds them.

pub mod application;
pub mod brand;

pub use application::{ApplicantDetails, ApplicationStatus, CompanyApplication, Decision};
pub use brand::Brand;
