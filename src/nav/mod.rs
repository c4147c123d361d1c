//! The navigation engine: intercepts link clicks, fetches replacement
//! content asynchronously instead of reloading whole pages, patches the
//! page model, and keeps the address-line fragment in sync with what is
//! displayed.

mod controller;
mod location;
pub mod popup;
mod watchdog;

pub use controller::{NavAction, NavMode, Navigator};
pub use location::{split_line_suffix, strip_site_prefix, Location};
pub use watchdog::Watchdog;
