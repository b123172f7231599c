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

//! Argument matchers for queued expectations.
//!
//! Each expected argument position holds one matcher. A matcher either
//! requires exact structural equality with a JSON value, accepts any value of
//! one JSON type class, or applies a named predicate. Type-class wildcards
//! are the typed rendition of matching on an argument's class, e.g. "any
//! mapping" for an options hash whose exact contents the example does not
//! control.

use serde_json::Value;
use std::sync::Arc;

/// Judges whether an actual argument satisfies an expected shape.
///
/// # Example
/// ```
/// use google_cloud_doctest::matcher::Matcher;
/// use serde_json::json;
/// let exact = Matcher::equals("my-bucket");
/// assert!(exact.accepts(&json!("my-bucket")));
/// assert!(!exact.accepts(&json!("other-bucket")));
///
/// let options = Matcher::any_object();
/// assert!(options.accepts(&json!({})));
/// assert!(options.accepts(&json!({"if_metageneration_match": 4})));
/// assert!(!options.accepts(&json!("not a mapping")));
/// ```
#[derive(Clone)]
pub struct Matcher {
    kind: MatcherKind,
}

impl Matcher {
    /// Matches only values structurally equal to `expected`.
    pub fn equals<T: Into<Value>>(expected: T) -> Self {
        Self {
            kind: MatcherKind::Equals(expected.into()),
        }
    }

    /// Matches any value, of any type class.
    pub fn any_value() -> Self {
        Self {
            kind: MatcherKind::AnyValue,
        }
    }

    /// Matches any JSON object ("any mapping").
    pub fn any_object() -> Self {
        Self {
            kind: MatcherKind::AnyObject,
        }
    }

    /// Matches any JSON array.
    pub fn any_array() -> Self {
        Self {
            kind: MatcherKind::AnyArray,
        }
    }

    /// Matches any string.
    pub fn any_string() -> Self {
        Self {
            kind: MatcherKind::AnyString,
        }
    }

    /// Matches any number.
    pub fn any_number() -> Self {
        Self {
            kind: MatcherKind::AnyNumber,
        }
    }

    /// Matches any boolean.
    pub fn any_bool() -> Self {
        Self {
            kind: MatcherKind::AnyBool,
        }
    }

    /// Matches values accepted by `predicate`.
    ///
    /// The `name` appears in mismatch diagnostics in place of an expected
    /// value.
    ///
    /// # Example
    /// ```
    /// use google_cloud_doctest::matcher::Matcher;
    /// use serde_json::json;
    /// let m = Matcher::predicate("topic name", |v| {
    ///     v.as_str().is_some_and(|s| s.starts_with("projects/"))
    /// });
    /// assert!(m.accepts(&json!("projects/my-project/topics/my-topic")));
    /// assert!(!m.accepts(&json!("my-topic")));
    /// ```
    pub fn predicate<N, F>(name: N, predicate: F) -> Self
    where
        N: Into<String>,
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: MatcherKind::Predicate(name.into(), Arc::new(predicate)),
        }
    }

    /// Returns true if `actual` satisfies this matcher.
    pub fn accepts(&self, actual: &Value) -> bool {
        match &self.kind {
            MatcherKind::Equals(expected) => expected == actual,
            MatcherKind::AnyValue => true,
            MatcherKind::AnyObject => actual.is_object(),
            MatcherKind::AnyArray => actual.is_array(),
            MatcherKind::AnyString => actual.is_string(),
            MatcherKind::AnyNumber => actual.is_number(),
            MatcherKind::AnyBool => actual.is_boolean(),
            MatcherKind::Predicate(_, predicate) => predicate(actual),
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MatcherKind::Equals(expected) => write!(f, "{expected}"),
            MatcherKind::AnyValue => write!(f, "<any value>"),
            MatcherKind::AnyObject => write!(f, "<any object>"),
            MatcherKind::AnyArray => write!(f, "<any array>"),
            MatcherKind::AnyString => write!(f, "<any string>"),
            MatcherKind::AnyNumber => write!(f, "<any number>"),
            MatcherKind::AnyBool => write!(f, "<any bool>"),
            MatcherKind::Predicate(name, _) => write!(f, "<{name}>"),
        }
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Matcher({self})")
    }
}

#[derive(Clone)]
enum MatcherKind {
    Equals(Value),
    AnyValue,
    AnyObject,
    AnyArray,
    AnyString,
    AnyNumber,
    AnyBool,
    Predicate(String, Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}
