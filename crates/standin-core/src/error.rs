//! Error types surfaced by the proxy engine.
//!
//! Every failure the engine reports is a [`ProxyError`]. The variants map to
//! distinct failure kinds so test code can assert on the specific kind:
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `ProxyCreationFailure` | A proxy type cannot be synthesized or constructed |
//! | `InvalidConfiguration` | A proxy is configured or queried incorrectly |
//! | `CallAmountViolation` | A call-count expectation does not hold |
//! | `ArgumentMismatch` | Recorded arguments differ from the expected ones |
//! | `MissingInvocation` | A call ordinal beyond the recorded calls is inspected |
//! | `UnresolvedSignature` | No member information exists for a signature lookup |
//! | `UnknownMember` | A proxy is asked to run a member it cannot dispatch |
//! | `ArityMismatch` | A call passes fewer or more arguments than the member accepts |
//! | `Raised` | User code (stand-in, configured failure, original body) raised an error |

use std::fmt;
use std::sync::Arc;

/// Result alias used throughout the engine.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// An error raised by user code and carried through the dispatcher untouched.
///
/// The inner error is shared, so the instance that was configured is the
/// instance the caller receives. Use [`RaisedError::same_instance`] to check
/// identity and [`RaisedError::downcast_ref`] to recover the concrete type.
#[derive(Clone)]
pub struct RaisedError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl RaisedError {
    /// Wrap an error so it can be configured as a call-time failure.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Create a raised error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(MessageError(message.into())))
    }

    /// Whether both handles point at the same underlying error instance.
    pub fn same_instance(&self, other: &RaisedError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Downcast the carried error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Borrow the carried error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl<E> From<E> for RaisedError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

/// Errors produced while synthesizing, configuring, calling or verifying proxies.
#[derive(Debug, Clone)]
pub enum ProxyError {
    /// A proxy type could not be built, or a proxy instance could not be constructed.
    ProxyCreationFailure {
        /// The target that was being proxied
        target: String,
        /// The underlying cause
        cause: Arc<anyhow::Error>,
    },

    /// Construction-time misuse of the configuration or verification API.
    InvalidConfiguration {
        /// What was being configured (usually `Target::member`)
        subject: String,
        /// Why the configuration was rejected
        reason: String,
    },

    /// A call-count expectation failed.
    CallAmountViolation {
        /// Member whose calls were counted
        member: String,
        /// Rendered expectation, e.g. "to be called at least twice"
        expectation: String,
        /// The count the expectation was built from
        expected: usize,
        /// The recorded count
        actual: usize,
    },

    /// Recorded arguments did not match the expected ones.
    ArgumentMismatch {
        /// Member whose call was inspected
        member: String,
        /// 1-indexed call ordinal
        ordinal: usize,
        /// Rendered comparison
        message: String,
    },

    /// A call ordinal beyond the recorded calls was inspected.
    MissingInvocation {
        /// Member whose call was inspected
        member: String,
        /// Requested 1-indexed call ordinal
        ordinal: usize,
        /// Number of recorded calls
        recorded: usize,
    },

    /// No member information was available to resolve a signature.
    UnresolvedSignature {
        /// Target the member was looked up on
        target: String,
        /// Member that could not be resolved
        member: String,
    },

    /// A proxy was asked to run a member it does not expose.
    UnknownMember {
        /// Generated proxy type name
        target: String,
        /// Requested member
        member: String,
    },

    /// A call passed an argument count the member's signature does not accept.
    /// The call is rejected before it is recorded.
    ArityMismatch {
        /// Member that was called
        member: String,
        /// Number of parameters without a default
        required: usize,
        /// Upper bound, `None` when the member is variadic
        accepted: Option<usize>,
        /// Number of arguments passed
        given: usize,
    },

    /// An error raised by user code, propagated unmodified.
    Raised(RaisedError),
}

impl ProxyError {
    /// Build a `ProxyCreationFailure` for `target`.
    pub fn creation(target: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        ProxyError::ProxyCreationFailure {
            target: target.into(),
            cause: Arc::new(cause.into()),
        }
    }

    /// Build an `InvalidConfiguration` error.
    pub fn invalid(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        ProxyError::InvalidConfiguration {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a user error as `Raised`.
    pub fn raised(error: impl Into<RaisedError>) -> Self {
        ProxyError::Raised(error.into())
    }

    /// The raised user error, if this is a `Raised` error.
    pub fn as_raised(&self) -> Option<&RaisedError> {
        match self {
            ProxyError::Raised(raised) => Some(raised),
            _ => None,
        }
    }
}

/// Describe a call count as a past-tense phrase: "never called", "called once", "called 3 times".
pub(crate) fn describe_calls(count: usize) -> String {
    match count {
        0 => "never called".to_string(),
        1 => "called once".to_string(),
        n => format!("called {} times", n),
    }
}

/// Render a count as "once" or "N times".
pub(crate) fn times(count: usize) -> String {
    match count {
        1 => "once".to_string(),
        n => format!("{} times", n),
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::ProxyCreationFailure { target, cause } => {
                write!(f, "Unable to create a proxy for `{}`: {:#}", target, cause)
            }
            ProxyError::InvalidConfiguration { subject, reason } => {
                write!(f, "Invalid configuration for `{}`: {}", subject, reason)
            }
            ProxyError::CallAmountViolation {
                member,
                expectation,
                actual,
                ..
            } => write!(
                f,
                "Expected `{}` {}, but it was {}.",
                member,
                expectation,
                describe_calls(*actual)
            ),
            ProxyError::ArgumentMismatch {
                member,
                ordinal,
                message,
            } => write!(
                f,
                "Argument mismatch on call #{} to `{}`: {}",
                ordinal, member, message
            ),
            ProxyError::MissingInvocation {
                member,
                ordinal,
                recorded,
            } => {
                let history = match recorded {
                    0 => "was never called".to_string(),
                    1 => "was only called once".to_string(),
                    n => format!("was only called {} times", n),
                };
                write!(
                    f,
                    "Cannot inspect call #{} to `{}`: it {}.",
                    ordinal, member, history
                )
            }
            ProxyError::UnresolvedSignature { target, member } => write!(
                f,
                "No signature information available for `{}::{}`",
                target, member
            ),
            ProxyError::UnknownMember { target, member } => {
                write!(f, "`{}` has no callable member `{}`", target, member)
            }
            ProxyError::ArityMismatch {
                member,
                required,
                accepted,
                given,
            } => {
                let bound = match accepted {
                    None => format!("at least {}", required),
                    Some(max) if max == required => format!("exactly {}", required),
                    Some(max) => format!("between {} and {}", required, max),
                };
                write!(
                    f,
                    "`{}` expects {} argument(s), but was called with {}",
                    member, bound, given
                )
            }
            ProxyError::Raised(raised) => write!(f, "{}", raised),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::ProxyCreationFailure { cause, .. } => {
                let cause: &(dyn std::error::Error + Send + Sync + 'static) = (**cause).as_ref();
                Some(cause)
            }
            ProxyError::Raised(raised) => Some(raised.inner()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_missing_invocation_messages() {
        let never = ProxyError::MissingInvocation {
            member: "Player::play".into(),
            ordinal: 1,
            recorded: 0,
        };
        assert!(never.to_string().contains("was never called"));

        let once = ProxyError::MissingInvocation {
            member: "Player::play".into(),
            ordinal: 2,
            recorded: 1,
        };
        assert!(once.to_string().contains("was only called once"));

        let many = ProxyError::MissingInvocation {
            member: "Player::play".into(),
            ordinal: 5,
            recorded: 3,
        };
        assert!(many.to_string().contains("was only called 3 times"));
    }

    #[test]
    fn test_raised_error_identity_and_downcast() {
        let raised = RaisedError::new(Boom);
        let copy = raised.clone();
        let other = RaisedError::new(Boom);

        assert!(raised.same_instance(&copy));
        assert!(!raised.same_instance(&other));
        assert!(raised.downcast_ref::<Boom>().is_some());
        assert_eq!(ProxyError::Raised(raised).to_string(), "boom");
    }

    #[test]
    fn test_creation_failure_exposes_cause() {
        use std::error::Error;

        let err = ProxyError::creation("app::Player", anyhow::anyhow!("compiler exploded"));
        assert!(err.to_string().contains("app::Player"));
        assert!(err.to_string().contains("compiler exploded"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_arity_mismatch_messages() {
        let exact = ProxyError::ArityMismatch {
            member: "Player::seek".into(),
            required: 1,
            accepted: Some(1),
            given: 0,
        };
        assert_eq!(
            exact.to_string(),
            "`Player::seek` expects exactly 1 argument(s), but was called with 0"
        );

        let range = ProxyError::ArityMismatch {
            member: "Player::load".into(),
            required: 1,
            accepted: Some(3),
            given: 4,
        };
        assert!(range.to_string().contains("between 1 and 3"));

        let variadic = ProxyError::ArityMismatch {
            member: "Player::queue".into(),
            required: 2,
            accepted: None,
            given: 1,
        };
        assert!(variadic.to_string().contains("at least 2"));
    }

    #[test]
    fn test_count_phrases() {
        assert_eq!(describe_calls(0), "never called");
        assert_eq!(describe_calls(1), "called once");
        assert_eq!(describe_calls(4), "called 4 times");
        assert_eq!(times(1), "once");
        assert_eq!(times(2), "2 times");
    }
}
