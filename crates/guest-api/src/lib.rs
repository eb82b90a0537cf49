//! HTTP layer for the wedding guest client.
//!
//! The crate is built around a narrow [`HttpTransport`] seam. The real
//! implementation ([`ReqwestTransport`]) talks to the backend with reqwest;
//! tests script responses through the same trait. On top of the transport
//! sit two layers:
//!
//! - [`ApiClient`], the bearer-attaching wrapper that retries a request
//!   exactly once after a 401 if the installed refresh handler succeeds.
//! - Typed endpoint adapters ([`AuthApi`], [`RsvpApi`], [`PreferencesApi`],
//!   [`WishlistApi`], [`GalleryApi`]) that mirror the backend contract.

mod auth;
mod client;
mod error;
mod gallery;
mod preferences;
mod rsvp;
mod transport;
mod wishlist;

pub use auth::{AuthApi, RemoteConfig, ValidateResponse};
pub use client::{ApiClient, RefreshHandler};
pub use error::{ApiError, ApiResult};
pub use gallery::{ArchiveKind, FolderListing, GalleryApi, GalleryStatus};
pub use preferences::{FormOptions, Preferences, PreferencesApi};
pub use rsvp::{RsvpApi, RsvpStatus};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestTransport};
pub use wishlist::{OwnerType, Wishlist, WishlistApi, WishlistItem};
