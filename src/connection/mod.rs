//! Connection layer: a running session behind streams

mod live;

pub use live::AcquisitionConnection;

#[cfg(test)]
mod tests;
