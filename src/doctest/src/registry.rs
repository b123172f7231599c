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

//! Process-wide registration of service doubles.
//!
//! Code under test obtains its client through [new_client] instead of
//! constructing a real transport. With no double installed, [new_client]
//! always fails with a "not mocked" error; examples can never silently hit
//! real infrastructure.
//!
//! Installation is global per service name. Installing replaces the
//! constructor for that name until the returned [InstallGuard] is dropped,
//! which restores the failing default. Slots for distinct service names
//! coexist independently, but scopes for the same name must not nest.

use crate::double::ServiceDouble;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

fn slots() -> &'static Mutex<HashMap<String, ServiceDouble>> {
    static SLOTS: OnceLock<Mutex<HashMap<String, ServiceDouble>>> = OnceLock::new();
    SLOTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Releases a registry slot when dropped.
///
/// Dropping the guard restores the failing default constructor for the
/// service. Because teardown is tied to drop, the slot is released on every
/// exit path, including panics in the example body.
#[derive(Debug)]
pub struct InstallGuard {
    service: String,
    double: ServiceDouble,
}

impl InstallGuard {
    /// The double installed in this slot.
    pub fn double(&self) -> ServiceDouble {
        self.double.clone()
    }

    /// The service name this guard holds.
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        let mut slots = slots().lock().expect("registry lock is poisoned");
        slots.remove(&self.service);
        tracing::debug!(service = %self.service, "released service double slot");
    }
}

/// Replaces the constructor for `service` with `factory`.
///
/// The factory runs once, at install time; every [new_client] call for this
/// slot returns a shared handle to the double it produced. The slot stays
/// occupied until the returned guard is dropped.
///
/// Installing over an occupied slot of the same name is a usage error,
/// reported at install time as
/// [already_installed][crate::error::Error::is_already_installed].
///
/// # Example
/// ```
/// use google_cloud_doctest::double::ServiceDouble;
/// use google_cloud_doctest::registry;
/// let guard = registry::install("storage", || ServiceDouble::new("storage"))?;
/// let client = registry::new_client("storage")?;
/// assert_eq!(client.service(), "storage");
/// drop(guard);
/// assert!(registry::new_client("storage").is_err());
/// # Ok::<(), google_cloud_doctest::error::Error>(())
/// ```
pub fn install<T, F>(service: T, factory: F) -> crate::Result<InstallGuard>
where
    T: Into<String>,
    F: FnOnce() -> ServiceDouble,
{
    let service = service.into();
    let mut slots = slots().lock().expect("registry lock is poisoned");
    if slots.contains_key(&service) {
        return Err(crate::error::Error::already_installed(service));
    }
    let double = factory();
    slots.insert(service.clone(), double.clone());
    tracing::debug!(service = %service, "installed service double");
    Ok(InstallGuard { service, double })
}

/// Constructs a client for `service`.
///
/// Returns a handle to the installed double, or the
/// [not_mocked][crate::error::Error::is_not_mocked] error if no double is
/// installed for that name.
pub fn new_client(service: &str) -> crate::Result<ServiceDouble> {
    let slots = slots().lock().expect("registry lock is poisoned");
    slots
        .get(service)
        .cloned()
        .ok_or_else(|| crate::error::Error::not_mocked(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn install_and_release() -> crate::Result<()> {
        let guard = install("storage", || ServiceDouble::new("storage"))?;
        assert_eq!(guard.service(), "storage");
        let client = new_client("storage")?;
        assert_eq!(client.service(), "storage");
        drop(guard);
        let error = new_client("storage").unwrap_err();
        assert!(error.is_not_mocked(), "{error:?}");
        Ok(())
    }

    #[test]
    #[serial]
    fn uninstalled_default_fails() {
        let error = new_client("storage").unwrap_err();
        assert!(error.is_not_mocked(), "{error:?}");
        assert_eq!(error.service(), Some("storage"));
    }

    #[test]
    #[serial]
    fn same_name_must_not_nest() -> crate::Result<()> {
        let _guard = install("storage", || ServiceDouble::new("storage"))?;
        let error =
            install("storage", || ServiceDouble::new("storage")).unwrap_err();
        assert!(error.is_already_installed(), "{error:?}");
        Ok(())
    }

    #[test]
    #[serial]
    fn distinct_names_coexist() -> crate::Result<()> {
        let storage = install("storage", || ServiceDouble::new("storage"))?;
        let pubsub = install("pubsub", || ServiceDouble::new("pubsub"))?;
        assert_eq!(new_client("storage")?.service(), "storage");
        assert_eq!(new_client("pubsub")?.service(), "pubsub");
        // Releasing one slot must not disturb the other.
        drop(storage);
        assert!(new_client("storage").is_err());
        assert_eq!(new_client("pubsub")?.service(), "pubsub");
        drop(pubsub);
        assert!(new_client("pubsub").is_err());
        Ok(())
    }

    #[test]
    #[serial]
    fn factory_runs_once() -> crate::Result<()> {
        let guard = install("storage", || ServiceDouble::new("storage"))?;
        // Both handles reach the same queue state.
        guard.double().expect(
            "get_bucket",
            crate::expectation::Reply::value(serde_json::json!({})),
            [crate::matcher::Matcher::any_string()],
        );
        assert_eq!(new_client("storage")?.pending(), 1);
        Ok(())
    }
}
