//! # DigiCal Entry Point
//!
//! ```text
//! $ digical calc "250×2"
//! {
//!   "success": true,
//!   "data": { "result": "500", "incentive": "₹50.00", ... }
//! }
//! ```
//!
//! The actual setup is in lib.rs so it can be tested.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    digical_cli::run().await
}
