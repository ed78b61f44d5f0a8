//! Form Context
//!
//! Per-form submission state. Each form boundary owns one context; nested
//! forms get their own and inherit only configuration from the enclosing
//! scope. Handles are cheap clones sharing the same state.
//!
//! Every transition is applied in one step through a single private setter,
//! so readers never see a half-updated state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use fieldmark_tree::{Generation, ValidationError};

use crate::{ConfigScope, ErrorDisplayStrategy, Options, ResolvedConfig, SubmitError};

static NEXT_FORM_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique form identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormId(u32);

impl FormId {
    fn next() -> Self {
        FormId(NEXT_FORM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Runtime state of one form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormContextState {
    pub submitting_in_progress: bool,
    pub has_submitted_once: bool,
    pub active_strategy: ErrorDisplayStrategy,
}

/// What caused a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    /// Submission attempted but not handed to a handler
    SubmitAttempted,
    SubmitStarted,
    SubmitFinished,
    StrategyChanged,
    Reset,
}

/// Diagnostic record kept while `debug` is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugRecord {
    pub form: String,
    pub event: FormEvent,
    pub has_submitted_once: bool,
    pub submitting_in_progress: bool,
    pub strategy: ErrorDisplayStrategy,
}

#[derive(Debug)]
struct FormInner {
    id: FormId,
    name: String,
    /// DOM id prefix; nested forms extend their parent's
    prefix: String,
    scope: ConfigScope,
    config: ResolvedConfig,
    state: Cell<FormContextState>,
    form_errors: RefCell<Vec<ValidationError>>,
    revision: Cell<Generation>,
    journal: RefCell<Vec<DebugRecord>>,
}

/// Handle to a form boundary's state
#[derive(Debug, Clone)]
pub struct FormContext {
    inner: Rc<FormInner>,
}

impl FormContext {
    /// Establish a form boundary under `scope`.
    ///
    /// `strategy` overrides the scope's default strategy for this form and
    /// for forms nested inside it.
    pub fn new(name: &str, scope: &ConfigScope, strategy: Option<ErrorDisplayStrategy>) -> Self {
        Self::establish(name, scope, strategy, None)
    }

    fn establish(
        name: &str,
        scope: &ConfigScope,
        strategy: Option<ErrorDisplayStrategy>,
        parent_prefix: Option<&str>,
    ) -> Self {
        let id = FormId::next();
        let scope = scope.child(Options {
            default_error_strategy: strategy,
            ..Options::default()
        });
        let config = scope.resolve();
        let name = if name.is_empty() {
            format!("form{}", id.value())
        } else {
            name.to_string()
        };
        let prefix = match parent_prefix {
            Some(parent) => format!("{parent}-{name}"),
            None => name.clone(),
        };
        let state = FormContextState {
            active_strategy: config.default_error_strategy,
            ..FormContextState::default()
        };

        tracing::debug!(
            target: "fieldmark::form",
            form = %name,
            prefix = %prefix,
            strategy = %state.active_strategy,
            "form boundary created"
        );

        Self {
            inner: Rc::new(FormInner {
                id,
                name,
                prefix,
                scope,
                config,
                state: Cell::new(state),
                form_errors: RefCell::new(Vec::new()),
                revision: Cell::new(Generation::INITIAL),
                journal: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Form nested inside this one: inherits configuration (including this
    /// form's strategy override) but none of its submission state.
    ///
    /// Its DOM ids are prefixed with this form's prefix, so same-named
    /// nested forms under different parents never share ids.
    pub fn nested(&self, name: &str, strategy: Option<ErrorDisplayStrategy>) -> Self {
        Self::establish(name, &self.inner.scope, strategy, Some(&self.inner.prefix))
    }

    pub fn id(&self) -> FormId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Prefix of the DOM ids of this form's fields
    pub fn dom_prefix(&self) -> &str {
        &self.inner.prefix
    }

    pub fn scope(&self) -> &ConfigScope {
        &self.inner.scope
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.inner.config
    }

    pub fn state(&self) -> FormContextState {
        self.inner.state.get()
    }

    /// Bumped on every state or form-error change
    pub fn revision(&self) -> Generation {
        self.inner.revision.get()
    }

    pub fn form_errors(&self) -> Vec<ValidationError> {
        self.inner.form_errors.borrow().clone()
    }

    pub fn debug_records(&self) -> Vec<DebugRecord> {
        self.inner.journal.borrow().clone()
    }

    /// Apply a whole state transition at once
    fn transition(&self, event: FormEvent, apply: impl FnOnce(&mut FormContextState)) {
        let before = self.inner.state.get();
        let mut after = before;
        apply(&mut after);
        if after == before {
            return;
        }
        self.inner.state.set(after);
        self.bump_revision();

        if self.inner.config.debug {
            tracing::debug!(
                target: "fieldmark::form",
                form = %self.inner.name,
                ?event,
                has_submitted_once = after.has_submitted_once,
                submitting = after.submitting_in_progress,
                strategy = %after.active_strategy,
                "form state changed"
            );
            self.inner.journal.borrow_mut().push(DebugRecord {
                form: self.inner.name.clone(),
                event,
                has_submitted_once: after.has_submitted_once,
                submitting_in_progress: after.submitting_in_progress,
                strategy: after.active_strategy,
            });
        }
    }

    fn bump_revision(&self) {
        let mut revision = self.inner.revision.get();
        revision.bump();
        self.inner.revision.set(revision);
    }

    /// Record a submission attempt that never reached a handler
    pub fn mark_submitted(&self) {
        self.transition(FormEvent::SubmitAttempted, |s| s.has_submitted_once = true);
    }

    /// Enter the submitting state. The returned guard leaves it when dropped,
    /// whatever the handler's outcome.
    pub fn begin_submit(&self) -> Result<SubmitGuard, SubmitError> {
        if self.state().submitting_in_progress {
            return Err(SubmitError::AlreadySubmitting(self.inner.name.clone()));
        }
        self.clear_form_errors();
        self.transition(FormEvent::SubmitStarted, |s| {
            s.has_submitted_once = true;
            s.submitting_in_progress = true;
        });
        Ok(SubmitGuard { form: self.clone() })
    }

    fn end_submit(&self) {
        self.transition(FormEvent::SubmitFinished, |s| s.submitting_in_progress = false);
    }

    /// Change the active strategy of this form only
    pub fn set_strategy(&self, strategy: ErrorDisplayStrategy) {
        self.transition(FormEvent::StrategyChanged, |s| s.active_strategy = strategy);
    }

    /// Forget submission history and form-level errors
    pub fn reset(&self) {
        self.clear_form_errors();
        let strategy = self.inner.config.default_error_strategy;
        self.transition(FormEvent::Reset, |s| {
            s.has_submitted_once = false;
            s.submitting_in_progress = false;
            s.active_strategy = strategy;
        });
    }

    pub fn set_form_errors(&self, errors: Vec<ValidationError>) {
        *self.inner.form_errors.borrow_mut() = errors;
        self.bump_revision();
    }

    pub fn push_form_error(&self, error: ValidationError) {
        self.inner.form_errors.borrow_mut().push(error);
        self.bump_revision();
    }

    pub fn clear_form_errors(&self) {
        let had_errors = !self.inner.form_errors.borrow().is_empty();
        if had_errors {
            self.inner.form_errors.borrow_mut().clear();
            self.bump_revision();
        }
    }
}

/// Holds a form in the submitting state
#[derive(Debug)]
#[must_use = "dropping the guard ends the submission"]
pub struct SubmitGuard {
    form: FormContext,
}

impl SubmitGuard {
    pub fn form(&self) -> &FormContext {
        &self.form
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.form.end_submit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debug_scope() -> ConfigScope {
        ConfigScope::root(Options::new().debug(true))
    }

    #[test]
    fn test_initial_state() {
        let form = FormContext::new("signup", &ConfigScope::default(), None);
        assert_eq!(form.state(), FormContextState::default());
        assert_eq!(form.name(), "signup");
    }

    #[test]
    fn test_generated_name() {
        let form = FormContext::new("", &ConfigScope::default(), None);
        assert_eq!(form.name(), format!("form{}", form.id().value()));
    }

    #[test]
    fn test_submit_guard_lifecycle() {
        let form = FormContext::new("f", &debug_scope(), None);
        let guard = form.begin_submit().unwrap();
        assert!(form.state().submitting_in_progress);
        assert!(form.state().has_submitted_once);
        assert!(matches!(form.begin_submit(), Err(SubmitError::AlreadySubmitting(_))));

        drop(guard);
        assert!(!form.state().submitting_in_progress);
        assert!(form.state().has_submitted_once);

        let events: Vec<FormEvent> = form.debug_records().iter().map(|r| r.event).collect();
        assert_eq!(events, vec![FormEvent::SubmitStarted, FormEvent::SubmitFinished]);
    }

    #[test]
    fn test_guard_clears_on_panic() {
        let form = FormContext::new("f", &ConfigScope::default(), None);
        let handle = form.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = handle.begin_submit().unwrap();
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(!form.state().submitting_in_progress);
    }

    #[test]
    fn test_reset() {
        let strategy = Some(ErrorDisplayStrategy::OnSubmit);
        let form = FormContext::new("f", &ConfigScope::default(), strategy);
        form.mark_submitted();
        form.set_strategy(ErrorDisplayStrategy::Immediate);
        form.push_form_error(ValidationError::new("server"));

        form.reset();
        let state = form.state();
        assert!(!state.has_submitted_once);
        assert_eq!(state.active_strategy, ErrorDisplayStrategy::OnSubmit);
        assert!(form.form_errors().is_empty());
    }

    #[test]
    fn test_nested_forms_are_independent() {
        let outer = FormContext::new("outer", &debug_scope(), Some(ErrorDisplayStrategy::OnSubmit));
        let inner = outer.nested("inner", None);

        outer.mark_submitted();
        assert!(!inner.state().has_submitted_once);
        assert_eq!(inner.state().active_strategy, ErrorDisplayStrategy::OnSubmit);
        assert!(inner.config().debug);

        let overridden = outer.nested("other", Some(ErrorDisplayStrategy::Immediate));
        assert_eq!(overridden.state().active_strategy, ErrorDisplayStrategy::Immediate);
    }

    #[test]
    fn test_nested_prefixes() {
        let scope = ConfigScope::default();
        let billing = FormContext::new("billing", &scope, None);
        let shipping = FormContext::new("shipping", &scope, None);
        let a = billing.nested("address", None);
        let b = shipping.nested("address", None);

        assert_eq!(billing.dom_prefix(), "billing");
        assert_eq!(a.name(), "address");
        assert_eq!(a.dom_prefix(), "billing-address");
        assert_eq!(b.dom_prefix(), "shipping-address");
        assert_eq!(a.nested("geo", None).dom_prefix(), "billing-address-geo");
    }

    #[test]
    fn test_one_record_per_change() {
        let form = FormContext::new("f", &debug_scope(), None);
        form.mark_submitted();
        form.mark_submitted(); // no change, no record
        form.set_strategy(ErrorDisplayStrategy::OnSubmit);

        let records = form.debug_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].form, "f");
        assert!(records[0].has_submitted_once);
        assert_eq!(records[1].strategy, ErrorDisplayStrategy::OnSubmit);
    }

    #[test]
    fn test_no_records_without_debug() {
        let form = FormContext::new("f", &ConfigScope::default(), None);
        form.mark_submitted();
        assert!(form.debug_records().is_empty());
        assert_ne!(form.revision(), Generation::INITIAL);
    }
}
