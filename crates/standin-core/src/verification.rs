//! # Verification
//!
//! Assertions over one member's [`InvocationLedger`].
//!
//! | Method | Fails with |
//! |--------|------------|
//! | `was_called(n)` and the other count checks | `CallAmountViolation` |
//! | `received_nothing(ordinal)` | `ArgumentMismatch` |
//! | `received(..)` / `received_on(ordinal, ..)` | `ArgumentMismatch`, or the evaluator's error |
//! | any ordinal past the recorded calls | `MissingInvocation` |
//!
//! Argument comparison is delegated to a [`PredicateEvaluator`]. The default
//! [`EqualityEvaluator`] compares values with `==` and runs predicates.
//!
//! ```
//! use standin_core::{
//!     args, Engine, Expected, MemberDescriptor, ParameterDescriptor, TargetDescriptor,
//! };
//!
//! let engine = Engine::new();
//! engine
//!     .register(TargetDescriptor::class("app::Player").with_member(
//!         MemberDescriptor::method("action")
//!             .param(ParameterDescriptor::new("code"))
//!             .returns("int"),
//!     ))
//!     .unwrap();
//!
//! let player = engine.new_stub("app::Player").unwrap();
//! player.call("action", args![808]).unwrap();
//!
//! engine
//!     .verify(&player, "action")
//!     .unwrap()
//!     .was_called_once()
//!     .unwrap()
//!     .received_on(1, [Expected::from(808)])
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use crate::descriptor::short_type_name;
use crate::dispatcher::Proxy;
use crate::error::{times, ProxyError, ProxyResult};
use crate::function_proxy::FunctionProxy;
use crate::ledger::InvocationLedger;
use crate::value::{Arguments, Callable, Value};

// =============================================================================
// Expectations
// =============================================================================

/// A named test over a single argument.
#[derive(Clone)]
pub struct Predicate {
    description: Arc<str>,
    test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new<F>(description: &str, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            description: Arc::from(description),
            test: Arc::new(test),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<predicate {}>", self.description)
    }
}

/// Expected value of one argument position.
#[derive(Debug, Clone)]
pub enum Expected {
    Value(Value),
    Predicate(Predicate),
}

impl Expected {
    /// Matches any argument.
    pub fn any() -> Self {
        Expected::Predicate(Predicate::new("anything", |_| true))
    }

    pub fn predicate<F>(description: &str, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Expected::Predicate(Predicate::new(description, test))
    }

    pub fn describe(&self) -> String {
        match self {
            Expected::Value(value) => value.render(),
            Expected::Predicate(predicate) => predicate.description().to_string(),
        }
    }
}

impl From<Predicate> for Expected {
    fn from(predicate: Predicate) -> Self {
        Expected::Predicate(predicate)
    }
}

macro_rules! expected_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expected {
                fn from(value: $ty) -> Self {
                    Expected::Value(Value::from(value))
                }
            }
        )*
    };
}

expected_value!(Value, bool, i64, i32, u32, f64, &str, String, Vec<Value>, Callable, Proxy, ());

/// Evaluates an expectation against a recorded argument.
///
/// Returning `Ok(false)` makes the verification raise `ArgumentMismatch`;
/// returning an error propagates that error unchanged.
pub trait PredicateEvaluator: Send + Sync {
    fn evaluate(&self, expected: &Expected, actual: &Value, description: &str)
        -> ProxyResult<bool>;
}

/// Equality for values, direct evaluation for predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualityEvaluator;

impl PredicateEvaluator for EqualityEvaluator {
    fn evaluate(
        &self,
        expected: &Expected,
        actual: &Value,
        _description: &str,
    ) -> ProxyResult<bool> {
        Ok(match expected {
            Expected::Value(value) => value == actual,
            Expected::Predicate(predicate) => predicate.test(actual),
        })
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Anything whose calls can be verified.
pub trait Verifiable {
    /// The ledger for `member`. An empty name selects the implicit member, if any.
    fn ledger_for(&self, member: &str) -> ProxyResult<InvocationLedger>;
}

impl Verifiable for Proxy {
    fn ledger_for(&self, member: &str) -> ProxyResult<InvocationLedger> {
        if member.is_empty() {
            return Err(ProxyError::invalid(
                self.target_name(),
                "a member name is required to verify an object proxy",
            ));
        }
        self.ledger(member)
    }
}

impl Verifiable for FunctionProxy {
    fn ledger_for(&self, member: &str) -> ProxyResult<InvocationLedger> {
        let name = self.name();
        let short = short_type_name(name);
        if member.is_empty() || member == name || member == short {
            Ok(self.ledger())
        } else {
            Err(ProxyError::invalid(
                name,
                format!("function proxies have no member `{}`", member),
            ))
        }
    }
}

/// Verify calls to `member` with the default [`EqualityEvaluator`].
pub fn verify<V: Verifiable + ?Sized>(target: &V, member: &str) -> ProxyResult<Verification> {
    Ok(Verification::new(target.ledger_for(member)?))
}

/// Call-count and argument assertions over one ledger.
#[derive(Clone)]
pub struct Verification {
    ledger: InvocationLedger,
    evaluator: Arc<dyn PredicateEvaluator>,
}

impl Verification {
    pub fn new(ledger: InvocationLedger) -> Self {
        Self {
            ledger,
            evaluator: Arc::new(EqualityEvaluator),
        }
    }

    /// Replace the argument evaluator for this verification.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn PredicateEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn member(&self) -> &str {
        self.ledger.member()
    }

    pub fn call_count(&self) -> usize {
        self.ledger.count()
    }

    pub fn arguments_of(&self, ordinal: usize) -> ProxyResult<Arguments> {
        self.ledger.arguments_of(ordinal)
    }

    fn check_count(
        &self,
        expectation: String,
        expected: usize,
        holds: impl Fn(usize) -> bool,
    ) -> ProxyResult<&Self> {
        let actual = self.ledger.count();
        if holds(actual) {
            Ok(self)
        } else {
            Err(ProxyError::CallAmountViolation {
                member: self.member().to_string(),
                expectation,
                expected,
                actual,
            })
        }
    }

    pub fn was_called(&self, count: usize) -> ProxyResult<&Self> {
        let expectation = match count {
            0 => "to never be called".to_string(),
            n => format!("to be called exactly {}", times(n)),
        };
        self.check_count(expectation, count, |actual| actual == count)
    }

    pub fn was_called_at_least(&self, count: usize) -> ProxyResult<&Self> {
        self.check_count(
            format!("to be called at least {}", times(count)),
            count,
            |actual| actual >= count,
        )
    }

    pub fn was_called_at_most(&self, count: usize) -> ProxyResult<&Self> {
        self.check_count(
            format!("to be called at most {}", times(count)),
            count,
            |actual| actual <= count,
        )
    }

    pub fn was_called_at_least_once(&self) -> ProxyResult<&Self> {
        self.was_called_at_least(1)
    }

    pub fn was_called_once(&self) -> ProxyResult<&Self> {
        self.was_called(1)
    }

    pub fn was_never_called(&self) -> ProxyResult<&Self> {
        self.was_called(0)
    }

    /// Call number `ordinal` received no arguments.
    pub fn received_nothing(&self, ordinal: usize) -> ProxyResult<&Self> {
        let args = self.ledger.arguments_of(ordinal)?;
        if args.is_empty() {
            return Ok(self);
        }
        Err(ProxyError::ArgumentMismatch {
            member: self.member().to_string(),
            ordinal,
            message: format!("expected no arguments, but received {}", render_args(&args)),
        })
    }

    /// The first call received `expected`.
    pub fn received<I, E>(&self, expected: I) -> ProxyResult<&Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expected>,
    {
        self.received_on(1, expected)
    }

    /// Call number `ordinal` received `expected`, position by position.
    ///
    /// Extra recorded arguments beyond the expected ones are not checked.
    pub fn received_on<I, E>(&self, ordinal: usize, expected: I) -> ProxyResult<&Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expected>,
    {
        let expected: Vec<Expected> = expected.into_iter().map(Into::into).collect();
        let args = self.ledger.arguments_of(ordinal)?;

        if args.len() < expected.len() {
            return Err(ProxyError::ArgumentMismatch {
                member: self.member().to_string(),
                ordinal,
                message: format!(
                    "expected at least {} argument(s), but only {} received: {}",
                    expected.len(),
                    args.len(),
                    render_args(&args)
                ),
            });
        }

        for (position, (expectation, actual)) in expected.iter().zip(args.iter()).enumerate() {
            let description = format!(
                "argument #{} of call #{} to `{}`",
                position + 1,
                ordinal,
                self.member()
            );
            if !self.evaluator.evaluate(expectation, actual, &description)? {
                return Err(ProxyError::ArgumentMismatch {
                    member: self.member().to_string(),
                    ordinal,
                    message: format!(
                        "{}: expected {}, got {}",
                        description,
                        expectation.describe(),
                        actual.render()
                    ),
                });
            }
        }
        Ok(self)
    }
}

impl fmt::Debug for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verification")
            .field("member", &self.member())
            .field("calls", &self.call_count())
            .finish()
    }
}

fn render_args(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::render).collect();
    format!("({})", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error::RaisedError;

    fn ledger_with(calls: &[Arguments]) -> InvocationLedger {
        let ledger = InvocationLedger::new("Player::action");
        for call in calls {
            ledger.record_call(call.clone());
        }
        ledger
    }

    #[test]
    fn test_exact_count() {
        let verification = Verification::new(ledger_with(&[args![1], args![2]]));
        assert!(verification.was_called(2).is_ok());

        let err = verification.was_called(3).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::CallAmountViolation {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Expected `Player::action` to be called exactly 3 times, but it was called 2 times."
        );
    }

    #[test]
    fn test_count_bounds_are_monotonic() {
        let verification = Verification::new(ledger_with(&[args![], args![], args![]]));
        for k in 0..=3 {
            assert!(verification.was_called_at_least(k).is_ok());
        }
        assert!(verification.was_called_at_least(4).is_err());
        for k in 3..6 {
            assert!(verification.was_called_at_most(k).is_ok());
        }
        assert!(verification.was_called_at_most(2).is_err());
        assert!(verification.was_called_at_least_once().is_ok());
        assert!(verification.was_called_once().is_err());
    }

    #[test]
    fn test_never_called_message() {
        let verification = Verification::new(ledger_with(&[args![]]));
        let err = verification.was_never_called().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected `Player::action` to never be called, but it was called once."
        );
        let empty = Verification::new(ledger_with(&[]));
        assert!(empty.was_never_called().is_ok());
        assert!(empty
            .was_called_once()
            .unwrap_err()
            .to_string()
            .ends_with("but it was never called."));
    }

    #[test]
    fn test_received_nothing() {
        let verification = Verification::new(ledger_with(&[args![], args![808]]));
        assert!(verification.received_nothing(1).is_ok());
        let err = verification.received_nothing(2).unwrap_err();
        assert!(err.to_string().contains("(808)"));
        assert!(matches!(
            verification.received_nothing(3),
            Err(ProxyError::MissingInvocation { .. })
        ));
    }

    #[test]
    fn test_received_with_values_and_predicates() {
        let verification = Verification::new(ledger_with(&[args![808, "foo", true]]));
        verification
            .received([Expected::from(808), Expected::any()])
            .unwrap()
            .received_on(
                1,
                [
                    Expected::any(),
                    Expected::predicate("a short string", |v| {
                        v.as_str().map(|s| s.len() < 5).unwrap_or(false)
                    }),
                ],
            )
            .unwrap();

        let err = verification.received([809]).unwrap_err();
        assert!(matches!(err, ProxyError::ArgumentMismatch { ordinal: 1, .. }));
        assert!(err.to_string().contains("expected 809, got 808"));
    }

    #[test]
    fn test_too_few_arguments() {
        let verification = Verification::new(ledger_with(&[args![1]]));
        let err = verification.received([1, 2]).unwrap_err();
        assert!(err.to_string().contains("only 1 received"));
    }

    struct StrictEvaluator;

    impl PredicateEvaluator for StrictEvaluator {
        fn evaluate(
            &self,
            expected: &Expected,
            actual: &Value,
            description: &str,
        ) -> ProxyResult<bool> {
            match expected {
                Expected::Value(value) if value == actual => Ok(true),
                _ => Err(ProxyError::raised(RaisedError::msg(format!(
                    "assertion failed for {}",
                    description
                )))),
            }
        }
    }

    #[test]
    fn test_evaluator_errors_propagate() {
        let verification = Verification::new(ledger_with(&[args![1]]))
            .with_evaluator(Arc::new(StrictEvaluator));
        assert!(verification.received([1]).is_ok());

        let err = verification.received([2]).unwrap_err();
        assert!(err.as_raised().is_some());
        assert!(err.to_string().contains("argument #1 of call #1"));
    }
}
