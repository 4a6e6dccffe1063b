//! Health probe adapters
//!
//! Implementations of the [`HealthProbe`](conductor_application::HealthProbe)
//! port used by the health monitor.
//!
//! | Probe | Checks | Feature |
//! |-------|--------|---------|
//! | [`StaticProbe`] | A flag flipped in-process | always |
//! | `HttpProbe` | `GET <url>` returns 2xx | `http-probe` |

#[cfg(feature = "http-probe")]
mod http_probe;
mod static_probe;

#[cfg(feature = "http-probe")]
pub use http_probe::HttpProbe;
pub use static_probe::StaticProbe;
