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

//! A substitute for a real external-service client.
//!
//! A double stands in for one named service, e.g. `storage` or `pubsub`. It
//! owns one expectation queue per logical sub-client: most services have a
//! single transport and use the default queue, while a service like pub/sub
//! keeps separate publisher and subscriber queues under the one double.
//!
//! Handles are cheap to clone and share state. The test setup queues
//! expectations on one handle while the example body consumes them through
//! another, typically obtained from [registry::new_client][crate::registry::new_client].

use crate::expectation::{ExpectationQueue, Reply};
use crate::matcher::Matcher;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const DEFAULT_QUEUE: &str = "service";

/// A named service double with one or more expectation queues.
///
/// # Example
/// ```
/// use google_cloud_doctest::double::ServiceDouble;
/// use google_cloud_doctest::expectation::Reply;
/// use google_cloud_doctest::matcher::Matcher;
/// use serde_json::json;
/// let double = ServiceDouble::new("storage");
/// double.expect(
///     "get_bucket",
///     Reply::value(json!({"name": "my-bucket"})),
///     [Matcher::equals("my-bucket"), Matcher::any_object()],
/// );
/// let reply = double.invoke("get_bucket", &[json!("my-bucket"), json!({})])?;
/// assert_eq!(reply, json!({"name": "my-bucket"}));
/// double.verify()?;
/// # Ok::<(), google_cloud_doctest::error::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct ServiceDouble {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    service: String,
    queues: BTreeMap<String, ExpectationQueue>,
}

impl ServiceDouble {
    /// Creates a double for `service` with an empty default queue.
    pub fn new<T: Into<String>>(service: T) -> Self {
        let service = service.into();
        let mut queues = BTreeMap::new();
        queues.insert(DEFAULT_QUEUE.to_string(), ExpectationQueue::new(&service));
        Self {
            inner: Arc::new(Mutex::new(Inner { service, queues })),
        }
    }

    /// The service name this double stands in for.
    pub fn service(&self) -> String {
        self.lock().service.clone()
    }

    /// Appends an expectation to the default queue.
    pub fn expect<T, M>(&self, method: T, reply: Reply, matchers: M)
    where
        T: Into<String>,
        M: IntoIterator<Item = Matcher>,
    {
        self.expect_on(DEFAULT_QUEUE, method, reply, matchers)
    }

    /// Appends an expectation to the named sub-client queue.
    ///
    /// The queue is created on first use. Sub-queues are independent: each
    /// services its own calls in FIFO order and verifies separately at
    /// teardown.
    ///
    /// # Example
    /// ```
    /// use google_cloud_doctest::double::ServiceDouble;
    /// use google_cloud_doctest::expectation::Reply;
    /// use google_cloud_doctest::matcher::Matcher;
    /// use serde_json::json;
    /// let pubsub = ServiceDouble::new("pubsub");
    /// pubsub.expect_on(
    ///     "publisher",
    ///     "create_topic",
    ///     Reply::value(json!({})),
    ///     [Matcher::any_string(), Matcher::any_object()],
    /// );
    /// ```
    pub fn expect_on<T, M>(&self, queue: &str, method: T, reply: Reply, matchers: M)
    where
        T: Into<String>,
        M: IntoIterator<Item = Matcher>,
    {
        let mut inner = self.lock();
        let context = queue_context(&inner.service, queue);
        inner
            .queues
            .entry(queue.to_string())
            .or_insert_with(|| ExpectationQueue::new(context))
            .expect(method, reply, matchers);
    }

    /// Consumes the head expectation of the default queue.
    pub fn invoke(&self, method: &str, args: &[Value]) -> crate::Result<Value> {
        self.invoke_on(DEFAULT_QUEUE, method, args)
    }

    /// Consumes the head expectation of the named sub-client queue.
    ///
    /// Invoking a sub-queue that was never populated is an unexpected call,
    /// reported against that queue.
    pub fn invoke_on(&self, queue: &str, method: &str, args: &[Value]) -> crate::Result<Value> {
        let mut inner = self.lock();
        let context = queue_context(&inner.service, queue);
        inner
            .queues
            .entry(queue.to_string())
            .or_insert_with(|| ExpectationQueue::new(context))
            .invoke(method, args)
    }

    /// Verifies every queue independently, returning the first failure.
    pub fn verify(&self) -> crate::Result<()> {
        let inner = self.lock();
        inner.queues.values().try_for_each(ExpectationQueue::verify)
    }

    /// The total number of expectations not yet consumed, across all queues.
    pub fn pending(&self) -> usize {
        self.lock().queues.values().map(ExpectationQueue::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("service double lock is poisoned")
    }
}

fn queue_context(service: &str, queue: &str) -> String {
    if queue == DEFAULT_QUEUE {
        service.to_string()
    } else {
        format!("{service}/{queue}")
    }
}
