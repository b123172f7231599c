// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Doctest mocking harness.
//!
//! This crate contains the machinery used to validate documentation examples
//! for the Google Cloud Client Libraries for Rust without touching real
//! infrastructure. A documentation example is run against service doubles:
//! each double holds an ordered queue of expected calls and canned replies,
//! and the run fails if the example makes a call that was not expected, makes
//! it with the wrong argument shapes, or finishes without making all the
//! calls its setup promised.
//!
//! The harness has three parts:
//! - [registry] substitutes a caller-supplied factory for the normal client
//!   constructor of a named service, scoped to one example.
//! - [expectation] holds the per-double FIFO of (method, argument matchers,
//!   reply) tuples, consumed strictly in order as calls arrive.
//! - [dispatch] maps each documentation-example identifier to the setup that
//!   configures its doubles, and drives verification and teardown.
//!
//! The harness is synchronous and single-threaded by design: each example
//! runs to completion before the next is dispatched, and queues are serviced
//! in arrival order.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The example dispatch table and per-example scope.
pub mod dispatch;

/// Service doubles and their sub-client queues.
pub mod double;

/// The errors reported by the harness.
pub mod error;

/// Expectations, canned replies, and the FIFO queue.
pub mod expectation;

/// Argument matchers: exact equality, type-class wildcards, and named
/// predicates.
pub mod matcher;

/// Process-wide service double registration.
pub mod registry;
