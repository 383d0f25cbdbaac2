//! Page navigators for resolving aggregator links.
//!
//! [`http::HttpNavigator`] fetches the page and scans the HTML; with the
//! `browser` feature, [`chrome::ChromeNavigator`] renders it in headless Chromium.

#[cfg(feature = "browser")]
pub mod chrome;
pub mod html;
pub mod http;
