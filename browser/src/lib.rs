//! Chrome DevTools binding for the `listmover` workflow.
//!
//! [`BrowserSession`] launches or attaches to Chrome and opens the working
//! page; [`ChromeSurface`] exposes that page as a
//! [`listmover_core::InteractiveSurface`].

mod error;
mod script;
mod session;
mod surface;

pub use error::BrowserError;
pub use session::BrowserSession;
pub use session::DEFAULT_START_URL;
pub use session::SessionOptions;
pub use surface::ChromeSurface;
pub use surface::ElementHandle;
pub use surface::ItemContainer;

pub type Result<T> = std::result::Result<T, BrowserError>;
