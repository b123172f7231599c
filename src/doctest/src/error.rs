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

//! The error type reported by the doctest harness.

/// The error returned by all harness operations.
///
/// The harness reports errors from multiple sources. The example code may
/// construct a client for a service that was never mocked, it may invoke a
/// method that was never expected, or it may pass arguments that do not match
/// the expected shapes. The test setup itself may also be misconfigured, e.g.
/// registering the same documentation example twice.
///
/// Most callers just report the error, failing the example. The verification
/// driver may need to distinguish error kinds, for example, to separate "you
/// forgot to add a mock setup" from "your mock setup does not match the real
/// call sequence". This type offers a series of predicates to determine the
/// error kind, and accessors to query the error details.
///
/// # Example
/// ```
/// use google_cloud_doctest::error::Error;
/// fn report(e: Error) {
///     if e.is_unregistered_example() {
///         println!("missing a mock setup for {:?}", e.example_key());
///     } else {
///         println!("the example failed: {e}");
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates an error for a client constructed without an installed double.
    ///
    /// # Example
    /// ```
    /// use google_cloud_doctest::error::Error;
    /// let error = Error::not_mocked("storage");
    /// assert!(error.is_not_mocked());
    /// assert_eq!(error.service(), Some("storage"));
    /// ```
    pub fn not_mocked<T: Into<String>>(service: T) -> Self {
        Self {
            kind: ErrorKind::NotMocked {
                service: service.into(),
            },
        }
    }

    /// This code example is not yet mocked.
    ///
    /// A client was constructed for a service name with no installed factory.
    /// The default constructor always fails: examples must never silently
    /// reach real infrastructure.
    pub fn is_not_mocked(&self) -> bool {
        matches!(self.kind, ErrorKind::NotMocked { .. })
    }

    /// Creates an error for a call with no matching head expectation.
    ///
    /// The `expected` call is absent when the queue was already empty.
    pub fn unexpected_call<C, A>(context: C, expected: Option<String>, actual: A) -> Self
    where
        C: Into<String>,
        A: Into<String>,
    {
        let details = CallMismatch {
            context: context.into(),
            position: None,
            expected,
            actual: actual.into(),
        };
        Self {
            kind: ErrorKind::UnexpectedCall(Box::new(details)),
        }
    }

    /// A method was invoked with no matching head expectation.
    ///
    /// Either the expectation queue was already empty, or the head
    /// expectation named a different method.
    pub fn is_unexpected_call(&self) -> bool {
        matches!(self.kind, ErrorKind::UnexpectedCall(_))
    }

    /// Creates an error for an argument that failed its matcher.
    ///
    /// The `position` is the zero-based argument index, or `None` when the
    /// call had the wrong number of arguments.
    pub fn argument_mismatch<C, E, A>(
        context: C,
        position: Option<usize>,
        expected: E,
        actual: A,
    ) -> Self
    where
        C: Into<String>,
        E: Into<String>,
        A: Into<String>,
    {
        let details = CallMismatch {
            context: context.into(),
            position,
            expected: Some(expected.into()),
            actual: actual.into(),
        };
        Self {
            kind: ErrorKind::ArgumentMismatch(Box::new(details)),
        }
    }

    /// The method name matched but an argument matcher failed.
    pub fn is_argument_mismatch(&self) -> bool {
        matches!(self.kind, ErrorKind::ArgumentMismatch(_))
    }

    /// Creates an error for expectations left over at verification time.
    pub fn unfulfilled_expectations<C: Into<String>>(context: C, remaining: Vec<String>) -> Self {
        Self {
            kind: ErrorKind::UnfulfilledExpectations {
                context: context.into(),
                remaining,
            },
        }
    }

    /// The expectation queue was non-empty at teardown.
    ///
    /// The example finished without making all the calls its setup promised.
    /// [Error::remaining] lists the entries that were never consumed.
    pub fn is_unfulfilled_expectations(&self) -> bool {
        matches!(self.kind, ErrorKind::UnfulfilledExpectations { .. })
    }

    /// Creates an error for a dispatch lookup miss.
    pub fn unregistered_example<T: Into<String>>(key: T) -> Self {
        Self {
            kind: ErrorKind::UnregisteredExample { key: key.into() },
        }
    }

    /// The dispatch table has no entry and no skip marker for the key.
    ///
    /// This is a setup gap, not a logic gap: add a setup callback (or a skip
    /// marker) for the example before running it.
    pub fn is_unregistered_example(&self) -> bool {
        matches!(self.kind, ErrorKind::UnregisteredExample { .. })
    }

    /// Creates an error for registering the same example key twice.
    pub fn duplicate_example<T: Into<String>>(key: T) -> Self {
        Self {
            kind: ErrorKind::DuplicateExample { key: key.into() },
        }
    }

    /// The same example key was registered twice.
    ///
    /// This is a configuration error in the test suite, detected at
    /// registration time rather than while running examples.
    pub fn is_duplicate_example(&self) -> bool {
        matches!(self.kind, ErrorKind::DuplicateExample { .. })
    }

    /// Creates an error for installing over an occupied registry slot.
    pub fn already_installed<T: Into<String>>(service: T) -> Self {
        Self {
            kind: ErrorKind::AlreadyInstalled {
                service: service.into(),
            },
        }
    }

    /// A double for the same service name was already installed.
    ///
    /// Registry slots are process-wide per service name, so scopes for the
    /// same name must not nest. This is a usage error surfaced at install
    /// time.
    pub fn is_already_installed(&self) -> bool {
        matches!(self.kind, ErrorKind::AlreadyInstalled { .. })
    }

    /// The service name associated with this error, if any.
    pub fn service(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::NotMocked { service } => Some(service.as_str()),
            ErrorKind::AlreadyInstalled { service } => Some(service.as_str()),
            _ => None,
        }
    }

    /// The example key associated with this error, if any.
    pub fn example_key(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::UnregisteredExample { key } => Some(key.as_str()),
            ErrorKind::DuplicateExample { key } => Some(key.as_str()),
            _ => None,
        }
    }

    /// The expected call, if any, associated with this error.
    ///
    /// # Example
    /// ```
    /// use google_cloud_doctest::error::Error;
    /// let error = Error::unexpected_call(
    ///     "storage", Some("get_bucket(\"my-bucket\")".into()), "delete_bucket(\"my-bucket\")");
    /// assert_eq!(error.expected_call(), Some("get_bucket(\"my-bucket\")"));
    /// assert_eq!(error.actual_call(), Some("delete_bucket(\"my-bucket\")"));
    /// ```
    pub fn expected_call(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::UnexpectedCall(d) | ErrorKind::ArgumentMismatch(d) => {
                d.expected.as_deref()
            }
            _ => None,
        }
    }

    /// The actual call, if any, associated with this error.
    pub fn actual_call(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::UnexpectedCall(d) | ErrorKind::ArgumentMismatch(d) => {
                Some(d.actual.as_str())
            }
            _ => None,
        }
    }

    /// The expectations left unconsumed at verification time, if any.
    pub fn remaining(&self) -> Option<&[String]> {
        match &self.kind {
            ErrorKind::UnfulfilledExpectations { remaining, .. } => Some(remaining.as_slice()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::NotMocked { service } => {
                write!(
                    f,
                    "this code example is not yet mocked: no double installed for service `{service}`"
                )
            }
            ErrorKind::UnexpectedCall(d) => match &d.expected {
                Some(expected) => write!(
                    f,
                    "unexpected call on {}: expected {expected}, got {}",
                    d.context, d.actual
                ),
                None => write!(
                    f,
                    "unexpected call on {}: no expectations remain, got {}",
                    d.context, d.actual
                ),
            },
            ErrorKind::ArgumentMismatch(d) => {
                let expected = d.expected.as_deref().unwrap_or("<none>");
                match d.position {
                    Some(p) => write!(
                        f,
                        "argument mismatch on {} at position {p}: expected {expected}, got {}",
                        d.context, d.actual
                    ),
                    None => write!(
                        f,
                        "argument count mismatch on {}: expected {expected}, got {}",
                        d.context, d.actual
                    ),
                }
            }
            ErrorKind::UnfulfilledExpectations { context, remaining } => {
                write!(
                    f,
                    "expected calls not made on {context}: [{}]",
                    remaining.join(", ")
                )
            }
            ErrorKind::UnregisteredExample { key } => {
                write!(
                    f,
                    "no mock setup registered for example `{key}`; add a setup callback or a skip marker"
                )
            }
            ErrorKind::DuplicateExample { key } => {
                write!(f, "example `{key}` is already registered")
            }
            ErrorKind::AlreadyInstalled { service } => {
                write!(
                    f,
                    "a double for service `{service}` is already installed; scopes for the same service must not nest"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    NotMocked { service: String },
    UnexpectedCall(Box<CallMismatch>),
    ArgumentMismatch(Box<CallMismatch>),
    UnfulfilledExpectations { context: String, remaining: Vec<String> },
    UnregisteredExample { key: String },
    DuplicateExample { key: String },
    AlreadyInstalled { service: String },
}

#[derive(Debug)]
struct CallMismatch {
    context: String,
    position: Option<usize>,
    expected: Option<String>,
    actual: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_mocked() {
        let error = Error::not_mocked("pubsub");
        assert!(error.is_not_mocked(), "{error:?}");
        assert!(!error.is_unexpected_call(), "{error:?}");
        assert_eq!(error.service(), Some("pubsub"));
        let got = error.to_string();
        assert!(got.contains("not yet mocked"), "{got}");
        assert!(got.contains("pubsub"), "{got}");
    }

    #[test]
    fn unexpected_call_empty_queue() {
        let error = Error::unexpected_call("storage", None, "get_bucket(\"my-bucket\")");
        assert!(error.is_unexpected_call(), "{error:?}");
        assert_eq!(error.expected_call(), None);
        assert_eq!(error.actual_call(), Some("get_bucket(\"my-bucket\")"));
        let got = error.to_string();
        assert!(got.contains("no expectations remain"), "{got}");
        assert!(got.contains("get_bucket"), "{got}");
    }

    #[test]
    fn unexpected_call_wrong_method() {
        let error = Error::unexpected_call(
            "storage",
            Some("get_bucket(\"my-bucket\")".into()),
            "delete_bucket(\"my-bucket\")",
        );
        assert_eq!(error.expected_call(), Some("get_bucket(\"my-bucket\")"));
        let got = error.to_string();
        assert!(got.contains("expected get_bucket"), "{got}");
        assert!(got.contains("got delete_bucket"), "{got}");
    }

    #[test]
    fn argument_mismatch() {
        let error = Error::argument_mismatch(
            "storage",
            Some(0),
            "\"my-bucket\"",
            "get_bucket(\"other-bucket\")",
        );
        assert!(error.is_argument_mismatch(), "{error:?}");
        let got = error.to_string();
        assert!(got.contains("position 0"), "{got}");
        assert!(got.contains("my-bucket"), "{got}");
        assert!(got.contains("other-bucket"), "{got}");
    }

    #[test]
    fn argument_count_mismatch() {
        let error = Error::argument_mismatch("storage", None, "2 arguments", "3 arguments");
        let got = error.to_string();
        assert!(got.contains("argument count mismatch"), "{got}");
    }

    #[test]
    fn unfulfilled() {
        let error = Error::unfulfilled_expectations(
            "pubsub/publisher",
            vec!["create_topic(<any value>)".into()],
        );
        assert!(error.is_unfulfilled_expectations(), "{error:?}");
        assert_eq!(error.remaining().map(<[String]>::len), Some(1));
        let got = error.to_string();
        assert!(got.contains("expected calls not made"), "{got}");
        assert!(got.contains("create_topic"), "{got}");
    }

    #[test]
    fn unregistered_example() {
        let error = Error::unregistered_example("Storage::Bucket#create_file");
        assert!(error.is_unregistered_example(), "{error:?}");
        assert!(!error.is_unfulfilled_expectations(), "{error:?}");
        assert_eq!(error.example_key(), Some("Storage::Bucket#create_file"));
    }

    #[test]
    fn duplicate_example() {
        let error = Error::duplicate_example("Storage::Bucket#files");
        assert!(error.is_duplicate_example(), "{error:?}");
        assert_eq!(error.example_key(), Some("Storage::Bucket#files"));
    }

    #[test]
    fn already_installed() {
        let error = Error::already_installed("storage");
        assert!(error.is_already_installed(), "{error:?}");
        assert_eq!(error.service(), Some("storage"));
        let got = error.to_string();
        assert!(got.contains("must not nest"), "{got}");
    }
}
