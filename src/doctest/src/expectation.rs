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

//! Ordered expectations and the FIFO queue that serves them.
//!
//! An expectation predicts one future call: the method name, a matcher for
//! each argument, and the canned reply to return. Expectations are consumed
//! strictly in arrival order; this models sequential example code, not
//! concurrent access. A queue that is not fully drained by the end of its
//! example fails verification.

use crate::matcher::Matcher;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// The canned response stored with an expectation.
///
/// Most expectations return a fixture value directly. Some fixtures are
/// cheaper, or only possible, to build at consumption time; those use a
/// zero-argument producer instead.
#[derive(Clone)]
pub struct Reply {
    kind: ReplyKind,
}

impl Reply {
    /// A reply holding an immediate value.
    ///
    /// # Example
    /// ```
    /// use google_cloud_doctest::expectation::Reply;
    /// use serde_json::json;
    /// let reply = Reply::value(json!({"name": "my-bucket"}));
    /// ```
    pub fn value<T: Into<Value>>(value: T) -> Self {
        Self {
            kind: ReplyKind::Value(value.into()),
        }
    }

    /// A reply serialized from a typed fixture.
    ///
    /// Fixtures are usually model types from the client library under test;
    /// this converts them to the JSON representation the queue stores.
    ///
    /// # Example
    /// ```
    /// use google_cloud_doctest::expectation::Reply;
    /// #[derive(serde::Serialize)]
    /// struct Bucket {
    ///     name: String,
    /// }
    /// let fixture = Bucket { name: "my-bucket".into() };
    /// let reply = Reply::from_serialize(&fixture)?;
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn from_serialize<T: serde::Serialize>(
        fixture: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::value(serde_json::to_value(fixture)?))
    }

    /// A reply computed when the expectation is consumed.
    pub fn from_fn<F>(producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            kind: ReplyKind::Producer(Arc::new(producer)),
        }
    }

    fn produce(&self) -> Value {
        match &self.kind {
            ReplyKind::Value(value) => value.clone(),
            ReplyKind::Producer(producer) => producer(),
        }
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ReplyKind::Value(value) => write!(f, "Reply({value})"),
            ReplyKind::Producer(_) => write!(f, "Reply(<producer>)"),
        }
    }
}

#[derive(Clone)]
enum ReplyKind {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

/// A recorded, one-time-use prediction of a future call and its reply.
#[derive(Clone, Debug)]
pub struct Expectation {
    method: String,
    matchers: Vec<Matcher>,
    reply: Reply,
}

impl Expectation {
    pub fn new<T, M>(method: T, reply: Reply, matchers: M) -> Self
    where
        T: Into<String>,
        M: IntoIterator<Item = Matcher>,
    {
        Self {
            method: method.into(),
            matchers: matchers.into_iter().collect(),
            reply,
        }
    }

    /// The expected method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// A human-readable sketch of the expected call.
    ///
    /// Used in diagnostics, e.g. `get_bucket("my-bucket", <any object>)`.
    pub fn describe(&self) -> String {
        let args = self
            .matchers
            .iter()
            .map(Matcher::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({args})", self.method)
    }
}

/// Formats an actual call the same way [Expectation::describe] formats an
/// expected one.
pub fn format_call(method: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{method}({args})")
}

/// An ordered, per-double list of expectations, consumed strictly in order.
///
/// # Example
/// ```
/// use google_cloud_doctest::expectation::{ExpectationQueue, Reply};
/// use google_cloud_doctest::matcher::Matcher;
/// use serde_json::json;
/// let mut queue = ExpectationQueue::new("storage");
/// queue.expect(
///     "get_bucket",
///     Reply::value(json!({"name": "my-bucket"})),
///     [Matcher::equals("my-bucket"), Matcher::any_object()],
/// );
/// let reply = queue.invoke("get_bucket", &[json!("my-bucket"), json!({})])?;
/// assert_eq!(reply, json!({"name": "my-bucket"}));
/// queue.verify()?;
/// # Ok::<(), google_cloud_doctest::error::Error>(())
/// ```
#[derive(Debug)]
pub struct ExpectationQueue {
    context: String,
    queue: VecDeque<Expectation>,
}

impl ExpectationQueue {
    /// Creates an empty queue.
    ///
    /// The `context` names the owning double (and sub-client, if any) in
    /// diagnostics, e.g. `storage` or `pubsub/publisher`.
    pub fn new<T: Into<String>>(context: T) -> Self {
        Self {
            context: context.into(),
            queue: VecDeque::new(),
        }
    }

    /// Appends an expectation.
    pub fn expect<T, M>(&mut self, method: T, reply: Reply, matchers: M)
    where
        T: Into<String>,
        M: IntoIterator<Item = Matcher>,
    {
        self.queue.push_back(Expectation::new(method, reply, matchers));
    }

    /// Pops and checks the head expectation, returning its reply.
    ///
    /// Fails with [unexpected_call][crate::error::Error::unexpected_call] if
    /// the queue is empty or the head names a different method, and with
    /// [argument_mismatch][crate::error::Error::argument_mismatch] if the
    /// arguments do not satisfy the head's matchers. Mismatched calls still
    /// consume the head: the example is failing and the remaining entries
    /// keep their positions for the verification report.
    pub fn invoke(&mut self, method: &str, args: &[Value]) -> crate::Result<Value> {
        let actual = format_call(method, args);
        let Some(head) = self.queue.pop_front() else {
            return Err(crate::error::Error::unexpected_call(
                &self.context,
                None,
                actual,
            ));
        };
        if head.method() != method {
            return Err(crate::error::Error::unexpected_call(
                &self.context,
                Some(head.describe()),
                actual,
            ));
        }
        if head.matchers.len() != args.len() {
            return Err(crate::error::Error::argument_mismatch(
                &self.context,
                None,
                head.describe(),
                actual,
            ));
        }
        for (position, (matcher, arg)) in head.matchers.iter().zip(args).enumerate() {
            if !matcher.accepts(arg) {
                return Err(crate::error::Error::argument_mismatch(
                    &self.context,
                    Some(position),
                    matcher.to_string(),
                    actual,
                ));
            }
        }
        Ok(head.reply.produce())
    }

    /// Fails if any expectations were never consumed.
    pub fn verify(&self) -> crate::Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        let remaining = self.queue.iter().map(Expectation::describe).collect();
        Err(crate::error::Error::unfulfilled_expectations(
            &self.context,
            remaining,
        ))
    }

    /// The number of expectations not yet consumed.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bucket_fixture() -> Value {
        json!({"name": "my-bucket", "location": "US"})
    }

    #[test]
    fn invoke_in_order() -> crate::Result<()> {
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "get_bucket",
            Reply::value(bucket_fixture()),
            [Matcher::equals("my-bucket"), Matcher::any_object()],
        );
        queue.expect(
            "delete_bucket",
            Reply::value(json!(null)),
            [Matcher::equals("my-bucket"), Matcher::any_object()],
        );
        assert_eq!(queue.len(), 2);

        let reply = queue.invoke("get_bucket", &[json!("my-bucket"), json!({})])?;
        assert_eq!(reply, bucket_fixture());
        let reply = queue.invoke("delete_bucket", &[json!("my-bucket"), json!({})])?;
        assert_eq!(reply, json!(null));
        assert!(queue.is_empty());
        queue.verify()
    }

    #[test]
    fn invoke_out_of_order() {
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "get_bucket",
            Reply::value(bucket_fixture()),
            [Matcher::equals("my-bucket")],
        );
        let error = queue
            .invoke("delete_bucket", &[json!("my-bucket")])
            .unwrap_err();
        assert!(error.is_unexpected_call(), "{error:?}");
        assert_eq!(
            error.expected_call(),
            Some("get_bucket(\"my-bucket\")"),
            "{error}"
        );
        assert_eq!(
            error.actual_call(),
            Some("delete_bucket(\"my-bucket\")"),
            "{error}"
        );
    }

    #[test]
    fn invoke_empty() {
        let mut queue = ExpectationQueue::new("storage");
        let error = queue.invoke("get_bucket", &[json!("my-bucket")]).unwrap_err();
        assert!(error.is_unexpected_call(), "{error:?}");
        assert_eq!(error.expected_call(), None, "{error}");
    }

    #[test]
    fn invoke_argument_mismatch() {
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "get_bucket",
            Reply::value(bucket_fixture()),
            [Matcher::equals("my-bucket"), Matcher::any_object()],
        );
        let error = queue
            .invoke("get_bucket", &[json!("other-bucket"), json!({})])
            .unwrap_err();
        assert!(error.is_argument_mismatch(), "{error:?}");
        let got = error.to_string();
        assert!(got.contains("position 0"), "{got}");
        assert!(got.contains("other-bucket"), "{got}");
    }

    #[test]
    fn invoke_arity_mismatch() {
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "get_bucket",
            Reply::value(bucket_fixture()),
            [Matcher::equals("my-bucket"), Matcher::any_object()],
        );
        let error = queue.invoke("get_bucket", &[json!("my-bucket")]).unwrap_err();
        assert!(error.is_argument_mismatch(), "{error:?}");
        let got = error.to_string();
        assert!(got.contains("argument count mismatch"), "{got}");
    }

    #[test]
    fn wildcard_matcher_accepts_any_mapping() -> crate::Result<()> {
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "patch_bucket",
            Reply::value(bucket_fixture()),
            [Matcher::equals("my-bucket"), Matcher::any_object()],
        );
        queue.invoke(
            "patch_bucket",
            &[json!("my-bucket"), json!({"labels": {"env": "test"}})],
        )?;
        queue.verify()
    }

    #[test]
    fn reply_producer_runs_at_consumption() -> crate::Result<()> {
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "get_bucket",
            Reply::from_fn(bucket_fixture),
            [Matcher::any_string()],
        );
        let reply = queue.invoke("get_bucket", &[json!("my-bucket")])?;
        assert_eq!(reply, bucket_fixture());
        Ok(())
    }

    #[test]
    fn reply_from_typed_fixture() -> anyhow::Result<()> {
        #[derive(serde::Serialize)]
        struct Bucket {
            name: String,
            location: String,
        }
        let fixture = Bucket {
            name: "my-bucket".into(),
            location: "US".into(),
        };
        let mut queue = ExpectationQueue::new("storage");
        queue.expect(
            "get_bucket",
            Reply::from_serialize(&fixture)?,
            [Matcher::equals("my-bucket")],
        );
        let reply = queue.invoke("get_bucket", &[json!("my-bucket")])?;
        assert_eq!(reply, json!({"name": "my-bucket", "location": "US"}));
        Ok(())
    }

    #[test]
    fn verify_names_remaining() {
        let mut queue = ExpectationQueue::new("pubsub/publisher");
        queue.expect(
            "create_topic",
            Reply::value(json!({})),
            [Matcher::equals("projects/my-project/topics/my-topic")],
        );
        let error = queue.verify().unwrap_err();
        assert!(error.is_unfulfilled_expectations(), "{error:?}");
        let remaining = error.remaining().unwrap();
        assert_eq!(
            remaining,
            ["create_topic(\"projects/my-project/topics/my-topic\")"]
        );
        let got = error.to_string();
        assert!(got.contains("pubsub/publisher"), "{got}");
    }

    #[test]
    fn describe() {
        let expectation = Expectation::new(
            "get_bucket",
            Reply::value(json!(null)),
            [Matcher::equals("my-bucket"), Matcher::any_object()],
        );
        assert_eq!(
            expectation.describe(),
            "get_bucket(\"my-bucket\", <any object>)"
        );
        assert_eq!(expectation.method(), "get_bucket");
    }

    #[test]
    fn format_actual_call() {
        let got = format_call("get_bucket", &[json!("my-bucket"), json!({})]);
        assert_eq!(got, "get_bucket(\"my-bucket\", {})");
    }
}
