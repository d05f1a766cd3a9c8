//! Zoho OAuth support for the Zoho Recruit adapter
//!
//! Zoho issues long-lived refresh tokens out of band (self-client console).
//! The adapter trades one for a short-lived access token when it is built:
//!
//! 1. `DataCenter` picks the accounts and Recruit API domains
//! 2. `token::refresh_access_token()` posts the refresh grant
//! 3. `token::acquire_or_placeholder()` wraps step 2 and never fails, falling
//!    back to `PLACEHOLDER_ACCESS_TOKEN` so startup continues without Zoho

pub mod constants;
pub mod error;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use token::{RefreshCredentials, TokenResponse, acquire_or_placeholder, refresh_access_token};
