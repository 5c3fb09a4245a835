//! Type definitions and constants.
//!
//! This module contains the iwd D-Bus names the crate uses.

pub(crate) mod constants;
