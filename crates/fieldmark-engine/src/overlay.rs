//! Form Overlay
//!
//! Binds a field tree to its form context and serves per-field and per-form
//! views. Views are recomputed lazily from the derivation cache whenever one
//! of their inputs changed.

use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;

use serde_json::Value;

use fieldmark_a11y::busy_attribute;
use fieldmark_tree::{
    FieldId, FieldKey, FieldResolutionError, FieldTree, Generation, TreeError, ValidationError,
};

use crate::derive::{DerivationCache, FieldView, InputStamp, derive_field};
use crate::form::FormContext;
use crate::submit::{SUBMIT_FAILURE_KIND, ServerError, SubmitFailure, SubmitOutcome};
use crate::{ErrorDisplayStrategy, ResolvedConfig, SubmitError};

/// Per-form state for progress and summary UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub error_strategy: ErrorDisplayStrategy,
    pub has_submitted: bool,
    pub submitting_in_progress: bool,
    /// `None` when `autoFormBusy` is off
    pub busy: Option<bool>,
    /// No blocking field errors and no form-level errors
    pub valid: bool,
    pub form_errors: Vec<ValidationError>,
}

impl FormView {
    /// Attributes to set on the form element
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        self.busy.map(busy_attribute).into_iter().collect()
    }
}

/// One line of the error summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    /// `None` for form-level errors
    pub key: Option<FieldKey>,
    pub dom_id: Option<String>,
    pub error: ValidationError,
}

/// A form tree with its visibility and accessibility overlay
#[derive(Debug)]
pub struct FormOverlay {
    tree: FieldTree,
    form: FormContext,
    forced: HashSet<FieldId>,
    overrides: Generation,
    cache: RefCell<DerivationCache>,
}

impl FormOverlay {
    pub fn new(tree: FieldTree, form: FormContext) -> Self {
        Self {
            tree,
            form,
            forced: HashSet::new(),
            overrides: Generation::INITIAL,
            cache: RefCell::new(DerivationCache::default()),
        }
    }

    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    /// Mutable access for the form runtime.
    ///
    /// Structural edits are complete once the borrow ends; the next view
    /// read re-resolves every key against the new shape.
    pub fn tree_mut(&mut self) -> &mut FieldTree {
        &mut self.tree
    }

    pub fn form(&self) -> &FormContext {
        &self.form
    }

    pub fn config(&self) -> &ResolvedConfig {
        self.form.config()
    }

    /// Field currently at a dotted path
    pub fn lookup(&self, path: &str) -> Option<FieldId> {
        self.tree.lookup(&FieldKey::parse(path))
    }

    /// Value change from the user; with `autoTouch` it also touches the field
    pub fn set_value(&mut self, id: FieldId, value: Value) -> Result<(), TreeError> {
        self.tree.set_value(id, value)?;
        if self.config().auto_touch {
            self.tree.mark_touched(id)?;
        }
        Ok(())
    }

    /// Focus left the control
    pub fn blur(&mut self, id: FieldId) -> Result<(), TreeError> {
        self.tree.mark_touched(id)
    }

    /// Force (or stop forcing) display of messages for `id` and its subtree
    pub fn force_show(&mut self, id: FieldId, forced: bool) {
        let changed = if forced { self.forced.insert(id) } else { self.forced.remove(&id) };
        if changed {
            self.overrides.bump();
        }
    }

    /// Current view of one field
    pub fn field(&self, id: FieldId) -> Result<FieldView, FieldResolutionError> {
        let mut cache = self.cache.borrow_mut();
        cache.sync(&self.tree);
        let stamp = InputStamp::capture(&self.tree, id, &self.form, self.overrides);
        cache.get_or_compute(id, stamp, || derive_field(&self.tree, id, &self.form, &self.forced))
    }

    /// Views of every field reachable from the root, in document order
    pub fn fields(&self) -> Vec<FieldView> {
        self.tree.walk().into_iter().filter_map(|id| self.field(id).ok()).collect()
    }

    pub fn form_view(&self) -> FormView {
        let state = self.form.state();
        let form_errors = self.form.form_errors();
        FormView {
            error_strategy: state.active_strategy,
            has_submitted: state.has_submitted_once,
            submitting_in_progress: state.submitting_in_progress,
            busy: self.config().auto_form_busy.then_some(state.submitting_in_progress),
            valid: form_errors.is_empty() && self.tree.is_valid(),
            form_errors,
        }
    }

    /// Visible blocking errors in document order, then form-level errors
    pub fn error_summary(&self) -> Vec<SummaryEntry> {
        let mut entries = Vec::new();
        for view in self.fields() {
            if !view.visible() {
                continue;
            }
            for error in view.errors() {
                entries.push(SummaryEntry {
                    key: Some(view.key.clone()),
                    dom_id: Some(view.dom_id.clone()),
                    error: error.clone(),
                });
            }
        }
        for error in self.form.form_errors() {
            entries.push(SummaryEntry {
                key: None,
                dom_id: None,
                error,
            });
        }
        entries
    }

    /// Number of derived views computed so far
    pub fn recomputations(&self) -> u64 {
        self.cache.borrow().recomputations()
    }

    /// Submit the form.
    ///
    /// Every field is touched and the form is marked submitted. With blocking
    /// client errors the handler is not called. Otherwise the form is
    /// submitting until the handler settles, and rejected errors are
    /// applied to their fields (unknown fields fall back to form level).
    /// Dropping the returned future early also ends the submitting state.
    pub async fn submit<F, Fut>(&mut self, handler: F) -> Result<SubmitOutcome, SubmitError>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<(), SubmitFailure>>,
    {
        if self.form.state().submitting_in_progress {
            return Err(SubmitError::AlreadySubmitting(self.form.name().to_string()));
        }

        self.tree.mark_all_touched();
        self.tree.clear_server_errors();

        if !self.tree.is_valid() {
            self.form.clear_form_errors();
            self.form.mark_submitted();
            tracing::debug!(
                target: "fieldmark::form",
                form = %self.form.name(),
                "submission blocked by client errors"
            );
            return Ok(SubmitOutcome::Invalid);
        }

        let value = self.tree.value(self.tree.root()).unwrap_or(Value::Null);
        let guard = self.form.begin_submit()?;

        let outcome = match handler(value).await {
            Ok(()) => Ok(SubmitOutcome::Submitted),
            Err(SubmitFailure::Rejected(errors)) => Ok(self.apply_server_errors(errors)),
            Err(SubmitFailure::Failed(error)) => {
                tracing::warn!(
                    target: "fieldmark::form",
                    form = %self.form.name(),
                    error = %error,
                    "submit handler failed"
                );
                let record = ValidationError::with_message(SUBMIT_FAILURE_KIND, error.to_string());
                self.form.push_form_error(record);
                Err(SubmitError::Handler(error))
            }
        };

        drop(guard);
        outcome
    }

    /// [`FormOverlay::submit`] driven to completion on the current thread
    pub fn submit_blocking<F, Fut>(&mut self, handler: F) -> Result<SubmitOutcome, SubmitError>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<(), SubmitFailure>>,
    {
        smol::block_on(self.submit(handler))
    }

    fn apply_server_errors(&mut self, errors: Vec<ServerError>) -> SubmitOutcome {
        let mut field_errors = 0;
        let mut form_errors = 0;

        for error in errors {
            if let Some(id) = error.key().and_then(|key| self.tree.lookup(&key)) {
                if self.tree.apply_server_error(id, error.to_validation_error()).is_ok() {
                    field_errors += 1;
                    continue;
                }
            }
            if let Some(path) = &error.field {
                tracing::warn!(
                    target: "fieldmark::form",
                    field = %path,
                    kind = %error.kind,
                    "server error for unknown field, reporting at form level"
                );
            }
            self.form.push_form_error(error.to_validation_error());
            form_errors += 1;
        }

        SubmitOutcome::Rejected {
            field_errors,
            form_errors,
        }
    }

    /// Restore initial values and forget submission history
    pub fn reset(&mut self) {
        self.tree.reset();
        self.form.reset();
        if !self.forced.is_empty() {
            self.forced.clear();
            self.overrides.bump();
        }
    }
}
