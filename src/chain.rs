//! Annotated error chains.
//!
//! [`wrap`] layers a context message on top of a shared cause; rendering
//! the result with `Display` gives every annotation from the outside in,
//! followed by the innermost message, joined with `": "`. The innermost
//! [`RootError`] may carry a stack captured where it was created, which
//! [`stack_of`] finds from anywhere in the chain.

use crate::fields::Fields;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Error shared between every wrapper that refers to it.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Message of the innermost error produced by [`layered_failure`].
pub const INNERMOST_MESSAGE: &str = "innermost error occurred";

/// Innermost error of a chain.
#[derive(Debug)]
pub struct RootError {
    message: Cow<'static, str>,
    stack: Option<Backtrace>,
}

impl RootError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        RootError { message: message.into(), stack: None }
    }

    /// Like [`RootError::new`], capturing the stack at this point.
    pub fn traced(message: impl Into<Cow<'static, str>>) -> Self {
        RootError {
            message: message.into(),
            stack: Some(Backtrace::force_capture()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&Backtrace> {
        self.stack.as_ref()
    }

    pub fn into_shared(self) -> SharedError {
        Arc::new(self)
    }
}

impl fmt::Display for RootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for RootError {}

/// A cause with one annotation layered on top.
#[derive(Debug, Clone)]
pub struct Wrapped {
    annotation: String,
    cause: SharedError,
}

impl Wrapped {
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn cause(&self) -> &SharedError {
        &self.cause
    }

    pub fn into_shared(self) -> SharedError {
        Arc::new(self)
    }
}

impl fmt::Display for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.annotation, self.cause)
    }
}

impl Error for Wrapped {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Annotate `cause`. The cause is shared, not moved: the caller keeps its
/// handle and both refer to the same error.
pub fn wrap(cause: &SharedError, annotation: impl Into<String>) -> Wrapped {
    Wrapped {
        annotation: annotation.into(),
        cause: Arc::clone(cause),
    }
}

/// Apply `annotations` in order, innermost first. With no annotations the
/// cause itself is returned.
pub fn wrap_all<I>(cause: &SharedError, annotations: I) -> SharedError
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    annotations
        .into_iter()
        .fold(Arc::clone(cause), |err, annotation| wrap(&err, annotation).into_shared())
}

/// Whether the innermost error of [`layered_failure`] is created per call
/// or is one instance shared by the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorIdentity {
    #[default]
    Fresh,
    Shared,
}

impl ErrorIdentity {
    pub fn innermost(self) -> SharedError {
        match self {
            ErrorIdentity::Fresh => RootError::traced(INNERMOST_MESSAGE).into_shared(),
            ErrorIdentity::Shared => {
                static SHARED: OnceLock<SharedError> = OnceLock::new();
                Arc::clone(SHARED.get_or_init(|| RootError::traced(INNERMOST_MESSAGE).into_shared()))
            }
        }
    }
}

/// Simulate a failure `depth` calls deep.
///
/// The innermost error originates at level `depth`; every level above it
/// adds `"level<n> failed"`, so `depth = 3` renders as
/// `level1 failed: level2 failed: innermost error occurred`. A depth of 0
/// is treated as 1.
pub fn layered_failure(depth: usize, identity: ErrorIdentity) -> SharedError {
    let mut err = identity.innermost();
    for level in (1..depth.max(1)).rev() {
        err = wrap(&err, format!("level{level} failed")).into_shared();
    }
    err
}

/// Iterate `err` and its sources, outermost first.
pub fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// The stack captured by the innermost traced [`RootError`] in the chain.
pub fn stack_of<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a Backtrace> {
    chain(err)
        .filter_map(|e| e.downcast_ref::<RootError>().and_then(RootError::stack))
        .last()
}

/// What gets logged about an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    /// Full rendered message.
    pub error: String,
    /// Each level's own message, outermost first.
    pub causes: Vec<String>,
    pub stack: Option<String>,
}

impl ErrorReport {
    pub fn new(err: &(dyn Error + 'static)) -> Self {
        let causes = chain(err)
            .map(|e| match e.downcast_ref::<Wrapped>() {
                Some(wrapped) => wrapped.annotation().to_string(),
                None => e.to_string(),
            })
            .collect();
        let stack = stack_of(err)
            .filter(|bt| bt.status() == BacktraceStatus::Captured)
            .map(|bt| bt.to_string());

        ErrorReport { error: err.to_string(), causes, stack }
    }

    /// Use the current stack when the chain did not capture one.
    pub fn or_capture_here(mut self) -> Self {
        if self.stack.is_none() {
            let here = Backtrace::force_capture();
            if here.status() == BacktraceStatus::Captured {
                self.stack = Some(here.to_string());
            }
        }
        self
    }

    /// Fields for the log record: `error`, `causes` and, if requested and
    /// available, `stack`.
    pub fn fields(&self, include_stack: bool) -> Fields {
        let mut fields = Fields::new()
            .with("error", self.error.clone())
            .with(
                "causes",
                Value::Array(self.causes.iter().cloned().map(Value::String).collect()),
            );
        if include_stack {
            if let Some(stack) = &self.stack {
                fields.insert("stack", stack.clone());
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base(message: &'static str) -> SharedError {
        RootError::new(message).into_shared()
    }

    #[test]
    fn three_levels_render_outermost_first() {
        let inner = base(INNERMOST_MESSAGE);
        let err = wrap(&wrap(&inner, "level2 failed").into_shared(), "level1 failed");
        assert_eq!(err.to_string(), "level1 failed: level2 failed: innermost error occurred");
    }

    #[test]
    fn wrap_all_matches_nested_wraps() {
        let c = base("disk full");
        let annotations = ["write block", "flush page", "commit"];
        let err = wrap_all(&c, annotations);
        assert_eq!(err.to_string(), "commit: flush page: write block: disk full");
        assert_eq!(wrap_all(&c, Vec::<String>::new()).to_string(), "disk full");
    }

    #[test]
    fn cause_is_shared_not_moved() {
        let c = base("boom");
        let w = wrap(&c, "ctx");
        assert!(Arc::ptr_eq(&c, w.cause()));
        assert_eq!(Arc::strong_count(&c), 2);
        assert_eq!(c.to_string(), "boom");
    }

    #[test]
    fn source_chain_walks_every_level() {
        let err = layered_failure(3, ErrorIdentity::Fresh);
        let rendered: Vec<String> = chain(&*err).map(|e| e.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "level1 failed: level2 failed: innermost error occurred",
                "level2 failed: innermost error occurred",
                "innermost error occurred",
            ]
        );
    }

    #[test]
    fn chain_outlives_the_iterator() {
        let err = layered_failure(2, ErrorIdentity::Fresh);
        let innermost = {
            let mut it = chain(&*err);
            it.nth(1)
        };
        assert_eq!(innermost.map(|e| e.to_string()).as_deref(), Some(INNERMOST_MESSAGE));
    }

    #[test]
    fn layered_failure_depths() {
        assert_eq!(layered_failure(0, ErrorIdentity::Fresh).to_string(), INNERMOST_MESSAGE);
        assert_eq!(layered_failure(1, ErrorIdentity::Fresh).to_string(), INNERMOST_MESSAGE);
        assert_eq!(
            layered_failure(5, ErrorIdentity::Fresh).to_string(),
            "level1 failed: level2 failed: level3 failed: level4 failed: innermost error occurred"
        );
    }

    fn innermost_ptr(err: &SharedError) -> *const () {
        let inner = chain(&**err).last().unwrap();
        inner as *const (dyn Error + 'static) as *const ()
    }

    #[test]
    fn identity_controls_innermost_reuse() {
        let shared_a = layered_failure(3, ErrorIdentity::Shared);
        let shared_b = layered_failure(3, ErrorIdentity::Shared);
        assert_eq!(innermost_ptr(&shared_a), innermost_ptr(&shared_b));

        let fresh_a = layered_failure(3, ErrorIdentity::Fresh);
        let fresh_b = layered_failure(3, ErrorIdentity::Fresh);
        assert_ne!(innermost_ptr(&fresh_a), innermost_ptr(&fresh_b));
        assert_eq!(fresh_a.to_string(), shared_a.to_string());
    }

    #[test]
    fn stack_comes_from_the_innermost_error() {
        let err = layered_failure(3, ErrorIdentity::Fresh);
        assert!(stack_of(&*err).is_some());
        assert!(stack_of(&*base("untraced")).is_none());
    }

    #[test]
    fn report_fields() {
        let err = wrap_all(&base("innermost error occurred"), ["level2 failed", "level1 failed"]);
        let report = ErrorReport::new(&*err);

        assert_eq!(report.error, "level1 failed: level2 failed: innermost error occurred");
        assert_eq!(report.causes, vec!["level1 failed", "level2 failed", "innermost error occurred"]);
        assert_eq!(report.stack, None);

        let fields = report.fields(true);
        assert_eq!(fields.get("causes"), Some(&json!(["level1 failed", "level2 failed", "innermost error occurred"])));
        assert!(!fields.contains_key("stack"));
    }

    #[test]
    fn report_stack_is_opt_in() {
        let report = ErrorReport::new(&*base("sample error for stacktrace")).or_capture_here();
        assert!(!report.fields(false).contains_key("stack"));
        assert_eq!(report.fields(true).contains_key("stack"), report.stack.is_some());
    }
}
