//! Route table, role-based navigation links and route-scoped request cancellation.

pub mod routes;
mod links;
mod navigator;

pub use links::{nav_links, NavAction, NavLink};
pub use navigator::Navigator;
pub use routes::{resolve, Access, RouteMatch, Screen, LANDING_PATH, LOGIN_PATH};
