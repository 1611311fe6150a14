use crate::binding::{Binding, Constraint, Variance};
use crate::callback::{CallbackRef, Reply};
use crate::constants::policies;
use crate::error::Result;
use crate::filter::FilteredScope;
use crate::handler::{Handler, HandlerRef};
use crate::types::TypeHierarchy;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Which handler replies count as handling the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acceptance {
    /// Everything except the explicit `Unhandled` sentinel, including no value
    AnythingButUnhandled,
    /// Only an actual value
    ValueRequired,
}

/// Dispatch rules for one callback category
pub struct CallbackPolicy {
    name: &'static str,
    variance: Variance,
    acceptance: Acceptance,
    filters: FilteredScope,
}

impl CallbackPolicy {
    fn new(name: &'static str, variance: Variance, acceptance: Acceptance) -> Self {
        Self {
            name,
            variance,
            acceptance,
            filters: FilteredScope::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn variance(&self) -> Variance {
        self.variance
    }

    /// Policy-wide filter providers
    pub fn filters(&self) -> &FilteredScope {
        &self.filters
    }

    pub fn accept_result(&self, reply: &Reply) -> bool {
        match self.acceptance {
            Acceptance::AnythingButUnhandled => !reply.is_unhandled(),
            Acceptance::ValueRequired => !reply.is_unhandled() && !reply.is_nothing(),
        }
    }

    /// Rank `binding` relative to `other`: `Less` means `binding` is tried
    /// first. Literals precede types, types precede predicates, and
    /// unconstrained bindings come last. Among types, subtypes precede
    /// their ancestors; unrelated constraints keep insertion order.
    ///
    /// Indexes consult this once, when a binding is inserted, against the
    /// type hierarchy as declared at that moment. Declare type relationships
    /// before registering bindings that depend on them.
    pub fn compare(&self, binding: &Binding, other: &Binding) -> Ordering {
        let (left, right) = (binding.constraint(), other.constraint());
        match rank(left).cmp(&rank(right)) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (left, right) {
            (Constraint::Unconstrained, Constraint::Unconstrained) => Ordering::Equal,
            (Constraint::Literal(a), Constraint::Literal(b)) if a == b => Ordering::Equal,
            (Constraint::Type(a), Constraint::Type(b)) if a == b => Ordering::Equal,
            (Constraint::Type(a), Constraint::Type(b))
                if TypeHierarchy::global().is_assignable(a, b) =>
            {
                Ordering::Less
            }
            _ => Ordering::Greater,
        }
    }

    /// Dispatch `callback` to `handler` under this policy
    pub fn dispatch(
        &'static self,
        handler: &HandlerRef,
        callback: &CallbackRef,
        constraint: Option<&Constraint>,
        composer: &HandlerRef,
        greedy: bool,
    ) -> Result<bool> {
        handler.dispatch_policy(self, handler, callback, constraint, composer, greedy)
    }
}

fn rank(constraint: &Constraint) -> u8 {
    match constraint {
        Constraint::Literal(_) => 0,
        Constraint::Type(_) => 1,
        Constraint::Predicate(_) => 2,
        Constraint::Unconstrained => 3,
    }
}

impl PartialEq for CallbackPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CallbackPolicy {}

impl fmt::Debug for CallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPolicy")
            .field("name", &self.name)
            .field("variance", &self.variance)
            .finish()
    }
}

impl fmt::Display for CallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static HANDLES: OnceLock<CallbackPolicy> = OnceLock::new();
static PROVIDES: OnceLock<CallbackPolicy> = OnceLock::new();
static CREATES: OnceLock<CallbackPolicy> = OnceLock::new();
static LOOKSUP: OnceLock<CallbackPolicy> = OnceLock::new();

/// Commands: a handler declared for `T` receives any subtype of `T`
pub fn handles() -> &'static CallbackPolicy {
    HANDLES.get_or_init(|| {
        CallbackPolicy::new(policies::HANDLES, Variance::Covariant, Acceptance::AnythingButUnhandled)
    })
}

/// Inquiries: a provider of a subtype satisfies a request for its supertype
pub fn provides() -> &'static CallbackPolicy {
    PROVIDES.get_or_init(|| {
        CallbackPolicy::new(policies::PROVIDES, Variance::Contravariant, Acceptance::ValueRequired)
    })
}

/// Creations: a factory of a subtype satisfies a request for its supertype
pub fn creates() -> &'static CallbackPolicy {
    CREATES.get_or_init(|| {
        CallbackPolicy::new(policies::CREATES, Variance::Contravariant, Acceptance::ValueRequired)
    })
}

/// Lookups: exact key match only
pub fn looksup() -> &'static CallbackPolicy {
    LOOKSUP.get_or_init(|| {
        CallbackPolicy::new(policies::LOOKSUP, Variance::Invariant, Acceptance::ValueRequired)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{declare, Value};

    struct Message;
    struct Urgent;

    fn binding(constraint: impl Into<Constraint>) -> Binding {
        Binding::builder(constraint)
            .function(|_, _| Ok(Reply::Nothing))
            .build()
            .unwrap()
    }

    #[test]
    fn test_policies_are_singletons() {
        assert!(std::ptr::eq(handles(), handles()));
        assert_ne!(handles(), provides());
        assert_eq!(looksup().variance(), Variance::Invariant);
        assert_eq!(handles().variance(), Variance::Covariant);
        assert_eq!(provides().variance(), Variance::Contravariant);
        assert_eq!(creates().name(), "creates");
    }

    #[test]
    fn test_acceptance() {
        assert!(handles().accept_result(&Reply::Nothing));
        assert!(!handles().accept_result(&Reply::Unhandled));
        assert!(!provides().accept_result(&Reply::Nothing));
        assert!(provides().accept_result(&Reply::Value(Value::new(1_u8))));
        assert!(!looksup().accept_result(&Reply::Unhandled));
    }

    #[test]
    fn test_compare() {
        declare::<Urgent>().extends::<Message>();
        let policy = handles();
        let urgent = binding(Constraint::of::<Urgent>());
        let message = binding(Constraint::of::<Message>());
        let any = binding(Constraint::Unconstrained);
        let literal = binding("inbox");

        assert_eq!(policy.compare(&urgent, &message), Ordering::Less);
        assert_eq!(policy.compare(&message, &urgent), Ordering::Greater);
        assert_eq!(policy.compare(&message, &message), Ordering::Equal);
        assert_eq!(policy.compare(&any, &message), Ordering::Greater);
        assert_eq!(policy.compare(&literal, &message), Ordering::Less);
        assert_eq!(policy.compare(&any, &any), Ordering::Equal);
    }
}
