use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run-wide abort signal.
///
/// It may be raised from any thread (Ctrl+C handler, host UI). The runner
/// polls it only at suite, case and step boundaries and never interrupts a
/// step that is already executing.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reporting granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// One check per test case
    #[default]
    Summary,
    /// One check per executed step
    Detailed,
}

/// Execution context threaded explicitly through the runners
#[derive(Debug, Default)]
pub struct RunContext {
    /// Hierarchical group label (`parent:suite`) used to tag checks
    group: Option<String>,

    cancellation: CancellationFlag,

    /// Host variables available to load-time placeholder substitution
    pub vars: HashMap<String, String>,
}

impl RunContext {
    pub fn new(cancellation: CancellationFlag) -> Self {
        Self {
            group: None,
            cancellation,
            vars: HashMap::new(),
        }
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn set_group(&mut self, group: Option<String>) {
        self.group = group;
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Enter a suite: the label becomes `suite`, or `current:suite` when a
    /// group is already active. The previous label comes back when the scope
    /// is dropped, whatever path leaves it.
    pub fn enter_group(&mut self, name: &str) -> GroupScope<'_> {
        let previous = self.group.take();
        self.group = Some(match &previous {
            Some(parent) => format!("{}:{}", parent, name),
            None => name.to_string(),
        });
        GroupScope {
            context: self,
            previous,
        }
    }

    /// Host variable set explicitly for this run
    pub fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }
}

/// Fallback for placeholders nothing else resolved: the process environment,
/// then the dynamic values `time`, `date`, `timestamp` and `uuid`.
///
/// Consulted at execution time, after case properties, so a property always
/// shadows an environment variable or dynamic value of the same name.
pub fn ambient_var(name: &str) -> Option<String> {
    if let Ok(v) = std::env::var(name) {
        return Some(v);
    }
    match name {
        "time" => Some(chrono::Local::now().format("%H:%M:%S").to_string()),
        "date" => Some(chrono::Local::now().format("%Y-%m-%d").to_string()),
        "timestamp" => Some(chrono::Utc::now().timestamp().to_string()),
        "uuid" => Some(uuid::Uuid::new_v4().to_string()),
        _ => None,
    }
}

/// Scoped group label; restores the previous label on drop
pub struct GroupScope<'a> {
    context: &'a mut RunContext,
    previous: Option<String>,
}

impl Deref for GroupScope<'_> {
    type Target = RunContext;

    fn deref(&self) -> &RunContext {
        self.context
    }
}

impl DerefMut for GroupScope<'_> {
    fn deref_mut(&mut self) -> &mut RunContext {
        self.context
    }
}

impl Drop for GroupScope<'_> {
    fn drop(&mut self) {
        self.context.group = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_scope_without_parent() {
        let mut ctx = RunContext::default();
        {
            let scope = ctx.enter_group("Invoices");
            assert_eq!(scope.group(), Some("Invoices"));
        }
        assert_eq!(ctx.group(), None);
    }

    #[test]
    fn test_group_scope_nests_under_parent() {
        let mut ctx = RunContext::default();
        ctx.set_group(Some("regression".to_string()));
        {
            let mut outer = ctx.enter_group("Invoices");
            assert_eq!(outer.group(), Some("regression:Invoices"));
            {
                let inner = outer.enter_group("Create");
                assert_eq!(inner.group(), Some("regression:Invoices:Create"));
            }
            assert_eq!(outer.group(), Some("regression:Invoices"));
        }
        assert_eq!(ctx.group(), Some("regression"));
    }

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let ctx = RunContext::new(flag.clone());
        assert!(!ctx.is_cancelled());
        flag.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_host_vars_only_hold_what_was_set() {
        let mut ctx = RunContext::default();
        ctx.set_var("time", "fixed");
        assert_eq!(ctx.get_var("time").as_deref(), Some("fixed"));
        assert!(ctx.get_var("date").is_none());
    }

    #[test]
    fn test_ambient_dynamic_values() {
        assert!(ambient_var("date").is_some());
        assert_eq!(ambient_var("uuid").map(|u| u.len()), Some(36));
        assert!(ambient_var("soapui_runner_surely_unset_var").is_none());
    }
}
