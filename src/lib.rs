//! Color-coded hit-testing for panorama tours.
//!
//! A tour is a set of rooms, each shown as an equirectangular panorama with a
//! pixel-aligned "ID map" whose flat colors mark clickable regions. Pointer
//! positions are projected into the ID map, the sampled color is matched
//! against global room hotspots and the current room's furniture, and the
//! [`session::Session`] turns the result into room switches, variant cycles,
//! tooltips and a highlight overlay.

pub mod assets;
pub mod color;
pub mod config;
pub mod error;
pub mod highlight;
pub mod i18n;
pub mod matcher;
pub mod projector;
pub mod raster;
pub mod registry;
pub mod session;
pub mod view;

pub use assets::{AssetProvider, AssetRequest, FsAssetProvider, LoadResult, LoadTicket};
pub use color::ColorKey;
pub use config::TourConfig;
pub use error::{AssetError, ConfigError};
pub use highlight::Overlay;
pub use matcher::HitTarget;
pub use projector::Viewport;
pub use raster::{IdMap, RasterPair};
pub use session::{ClickOutcome, FeedbackSink, RenderSurface, Session};
pub use view::{ProjectionMode, ViewTransform};
