//! Error types for iio-rotate
//!
//! Since we handle numerous types of error cases,
//! this will probably be expanded as-needed.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("D-Bus failure")]
    Bus(#[from] zbus::Error),

    #[error("D-Bus call rejected")]
    BusCall(#[from] zbus::fdo::Error),

    #[error("Unexpected property value shape")]
    Variant(#[from] zbus::zvariant::Error),

    #[error("Invalid transform table {0:?}, expected four digits like 0,1,2,3")]
    InvalidTransformTable(String),

    #[error("No monitor named {0:?} in the hyprctl listing")]
    UnknownMonitor(String),

    #[error("Unreadable monitor listing")]
    MonitorListing(#[from] serde_json::Error),

    #[error("Underlying I/O error")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
