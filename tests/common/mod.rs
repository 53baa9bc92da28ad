//! Common test utilities for live feed integration tests.

#![allow(dead_code)]

pub mod mock_connector;

use std::time::Duration;

#[allow(unused_imports)]
pub use mock_connector::{LinkHandle, LinkLog, MockConnector, Plan};

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
