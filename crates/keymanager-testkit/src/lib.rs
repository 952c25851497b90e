//! # Key Manager Testkit
//!
//! Testing utilities for the key manager.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Key classification and prefix-masking cases
//! - **Generators**: Proptest strategies for keys, prefixes and nonces
//! - **Fixtures**: A memory account behind a key manager, with grant helpers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use keymanager_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed) in verify_all_vectors() {
//!     assert!(passed, "{name}");
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keymanager_testkit::fixtures::TestFixture;
//! use keymanager_core::Permission;
//!
//! let fixture = TestFixture::new();
//! let signer = fixture.controller(1, [Permission::Sign]).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{signers, ControllerSpec, TestFixture, FIXTURE_IDENTITY};
pub use generators::KeyPrefix;
pub use vectors::{classification_vectors, mask_vectors, verify_all_vectors};
