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

//! Dispatching documentation examples to their mock setup.
//!
//! A dispatch table maps each documentation-example identifier to a setup
//! callback. Before an example runs, its callback installs one or more
//! service doubles and queues the expectations for the calls the example is
//! documented to make. After the example body returns, every double is
//! verified and torn down, in that order, whether or not the body succeeded.
//!
//! Keys may instead carry a skip marker for examples that are known to be
//! unmockable; those report a neutral pass without running any setup.

use crate::double::ServiceDouble;
use crate::registry::{self, InstallGuard};
use std::collections::BTreeMap;

/// The per-example verdict for successful runs.
///
/// Failures are reported through [Error][crate::error::Error]; a run that
/// returns `Ok` either passed with all expectations consumed, or was skipped
/// by marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Skipped,
}

/// The dependency-injection seam handed to setup callbacks.
///
/// A setup callback installs each double it needs through the scope. The
/// scope keeps the install guards alive for the duration of the example and
/// verifies every double it created before releasing the registry slots.
pub struct ExampleScope {
    guards: Vec<InstallGuard>,
}

impl ExampleScope {
    fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Installs a double for `service` and returns a handle to it.
    ///
    /// The handle is live: expectations queued on it are visible to clients
    /// the example body obtains from the registry.
    pub fn install<T, F>(&mut self, service: T, factory: F) -> crate::Result<ServiceDouble>
    where
        T: Into<String>,
        F: FnOnce() -> ServiceDouble,
    {
        let guard = registry::install(service, factory)?;
        let double = guard.double();
        self.guards.push(guard);
        Ok(double)
    }

    /// The doubles installed so far, in installation order.
    pub fn doubles(&self) -> Vec<ServiceDouble> {
        self.guards.iter().map(InstallGuard::double).collect()
    }

    fn verify(&self) -> crate::Result<()> {
        self.guards
            .iter()
            .try_for_each(|guard| guard.double().verify())
    }
}

type SetupFn = Box<dyn Fn(&mut ExampleScope) -> crate::Result<()> + Send + Sync>;

enum Entry {
    Setup(SetupFn),
    Skip,
}

/// Maps documentation-example identifiers to their mock setup.
///
/// # Example
/// ```
/// use google_cloud_doctest::dispatch::{DispatchTable, Verdict};
/// use google_cloud_doctest::double::ServiceDouble;
/// use google_cloud_doctest::expectation::Reply;
/// use google_cloud_doctest::matcher::Matcher;
/// use google_cloud_doctest::registry;
/// use serde_json::json;
///
/// let mut table = DispatchTable::new();
/// table.register("Storage::Bucket#delete", |scope| {
///     let storage = scope.install("storage", || ServiceDouble::new("storage"))?;
///     storage.expect(
///         "delete_bucket",
///         Reply::value(json!(null)),
///         [Matcher::equals("my-bucket"), Matcher::any_object()],
///     );
///     Ok(())
/// })?;
///
/// let verdict = table.run("Storage::Bucket#delete", || {
///     let storage = registry::new_client("storage")?;
///     storage.invoke("delete_bucket", &[json!("my-bucket"), json!({})])?;
///     Ok(())
/// })?;
/// assert_eq!(verdict, Verdict::Passed);
/// # Ok::<(), google_cloud_doctest::error::Error>(())
/// ```
#[derive(Default)]
pub struct DispatchTable {
    entries: BTreeMap<String, Entry>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setup callback for `key`.
    ///
    /// Keys are unique within the table; registering a key twice, or over a
    /// skip marker, is a configuration error.
    pub fn register<T, F>(&mut self, key: T, setup: F) -> crate::Result<()>
    where
        T: Into<String>,
        F: Fn(&mut ExampleScope) -> crate::Result<()> + Send + Sync + 'static,
    {
        self.insert(key.into(), Entry::Setup(Box::new(setup)))
    }

    /// Marks `key` as intentionally skipped.
    ///
    /// Running a skipped key bypasses setup and the example body entirely and
    /// reports [Verdict::Skipped].
    pub fn skip<T: Into<String>>(&mut self, key: T) -> crate::Result<()> {
        self.insert(key.into(), Entry::Skip)
    }

    fn insert(&mut self, key: String, entry: Entry) -> crate::Result<()> {
        if self.entries.contains_key(&key) {
            return Err(crate::error::Error::duplicate_example(key));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Runs one documentation example under its registered setup.
    ///
    /// Looks up the setup callback for `key`, executes it, executes `body`,
    /// then verifies every double created during setup and releases their
    /// registry slots, in that order. Verification and teardown run even when
    /// `body` fails; a body error takes precedence in the returned verdict.
    ///
    /// A lookup miss is reported as
    /// [unregistered_example][crate::error::Error::is_unregistered_example],
    /// distinct from verification failures: the former means a mock setup was
    /// never written, the latter that the setup does not match the real call
    /// sequence.
    pub fn run<B>(&self, key: &str, body: B) -> crate::Result<Verdict>
    where
        B: FnOnce() -> crate::Result<()>,
    {
        let entry = match self.entries.get(key) {
            None => return Err(crate::error::Error::unregistered_example(key)),
            Some(Entry::Skip) => {
                tracing::debug!(key, "example skipped by marker");
                return Ok(Verdict::Skipped);
            }
            Some(Entry::Setup(setup)) => setup,
        };
        tracing::debug!(key, "running example");
        let mut scope = ExampleScope::new();
        entry(&mut scope)?;
        let body_result = body();
        let verify_result = scope.verify();
        // Guards drop here, releasing the registry slots on every path.
        drop(scope);
        body_result?;
        verify_result?;
        Ok(Verdict::Passed)
    }
}
