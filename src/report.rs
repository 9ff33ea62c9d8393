//! Feasibility diagnostics over an evaluated model.
//!
//! Four independent reports classify variables and constraints against their bounds
//! with an absolute tolerance. Each `log_*` entry point walks the model once and
//! emits one or more lines per flagged component through `tracing`; the `find_*`
//! layer underneath returns the same lines as [`Finding`] records for callers that
//! want to print or inspect them directly.
//!
//! An unset variable value is never an error here: any check that needs it logs a
//! skip line for that component and moves on.

use tracing::{debug, info};

use crate::{expr::Expr, model::Model, util::fmt_f64};

/// Default absolute tolerance for all reports.
pub const DEFAULT_TOL: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Debug,
}

/// One report line and the level it is logged at.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn info(message: String) -> Self {
        Self {
            severity: Severity::Info,
            message,
        }
    }

    fn debug(message: String) -> Self {
        Self {
            severity: Severity::Debug,
            message,
        }
    }
}

/// Verbosity switches for the infeasible-constraints report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintLogOptions {
    /// Append the constraint expression to each violation line.
    pub log_expression: bool,
    /// Append the names and values of the variables in the constraint body.
    pub log_variables: bool,
}

/// Logs every active constraint whose body violates its bounds.
pub fn log_infeasible_constraints(model: &Model, tol: f64, options: ConstraintLogOptions) {
    emit(&find_infeasible_constraints(model, tol, options));
}

/// Logs every variable whose value violates its bounds.
pub fn log_infeasible_bounds(model: &Model, tol: f64) {
    emit(&find_infeasible_bounds(model, tol));
}

/// Logs variables and constraints that sit within `tol` of a bound.
pub fn log_close_to_bounds(model: &Model, tol: f64) {
    emit(&find_close_to_bounds(model, tol));
}

/// Logs the name of every active constraint, in prefix depth-first order.
pub fn log_active_constraints(model: &Model) {
    emit(&find_active_constraints(model));
}

fn emit(findings: &[Finding]) {
    for finding in findings {
        match finding.severity {
            Severity::Info => info!("{}", finding.message),
            Severity::Debug => debug!("{}", finding.message),
        }
    }
}

pub fn find_infeasible_constraints(
    model: &Model,
    tol: f64,
    options: ConstraintLogOptions,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for c in model.constraints() {
        let constr = model.constraint(c);
        if !constr.is_active() {
            continue;
        }
        let Some(body) = constr.body().eval(model) else {
            let mut line = format!("CONSTR {}: missing variable value.", constr.name());
            if options.log_variables {
                push_var_printout(&mut line, model, constr.body());
            }
            findings.push(Finding::info(line));
            continue;
        };
        if let Some(target) = constr.equality_target() {
            if (body - target).abs() >= tol {
                let mut line = format!(
                    "CONSTR {}: {} =/= {}",
                    constr.name(),
                    fmt_f64(body),
                    fmt_f64(target)
                );
                if options.log_expression {
                    line.push_str(&format!(
                        "\n  {} =/= {}",
                        constr.body().display(model),
                        fmt_f64(target)
                    ));
                }
                if options.log_variables {
                    push_var_printout(&mut line, model, constr.body());
                }
                findings.push(Finding::info(line));
            }
            continue;
        }
        // Lower and upper side are checked independently; both may be violated.
        if let Some(lb) = constr.lower() {
            if lb - body >= tol {
                let mut line = format!(
                    "CONSTR {}: {} </= {}",
                    constr.name(),
                    fmt_f64(lb),
                    fmt_f64(body)
                );
                if options.log_expression {
                    line.push_str(&format!(
                        "\n  {} </= {}",
                        fmt_f64(lb),
                        constr.body().display(model)
                    ));
                }
                if options.log_variables {
                    push_var_printout(&mut line, model, constr.body());
                }
                findings.push(Finding::info(line));
            }
        }
        if let Some(ub) = constr.upper() {
            if body - ub >= tol {
                let mut line = format!(
                    "CONSTR {}: {} </= {}",
                    constr.name(),
                    fmt_f64(body),
                    fmt_f64(ub)
                );
                if options.log_expression {
                    line.push_str(&format!(
                        "\n  {} </= {}",
                        constr.body().display(model),
                        fmt_f64(ub)
                    ));
                }
                if options.log_variables {
                    push_var_printout(&mut line, model, constr.body());
                }
                findings.push(Finding::info(line));
            }
        }
    }
    findings
}

pub fn find_infeasible_bounds(model: &Model, tol: f64) -> Vec<Finding> {
    let mut findings = Vec::new();
    for v in model.variables() {
        let var = model.var(v);
        let Some(value) = var.value() else {
            findings.push(Finding::debug(format!(
                "Skipping VAR {} with no assigned value.",
                var.name()
            )));
            continue;
        };
        if let Some(lb) = var.lower() {
            if lb - value >= tol {
                findings.push(Finding::info(format!(
                    "VAR {}: {} < LB {}",
                    var.name(),
                    fmt_f64(value),
                    fmt_f64(lb)
                )));
            }
        }
        if let Some(ub) = var.upper() {
            if value - ub >= tol {
                findings.push(Finding::info(format!(
                    "VAR {}: {} > UB {}",
                    var.name(),
                    fmt_f64(value),
                    fmt_f64(ub)
                )));
            }
        }
    }
    findings
}

pub fn find_close_to_bounds(model: &Model, tol: f64) -> Vec<Finding> {
    let mut findings = Vec::new();
    for v in model.variables() {
        let var = model.var(v);
        if var.is_fixed() {
            continue;
        }
        let Some(value) = var.value() else {
            findings.push(Finding::debug(format!(
                "Skipping VAR {} with no assigned value.",
                var.name()
            )));
            continue;
        };
        if let (Some(lb), Some(ub)) = (var.lower(), var.upper()) {
            // A domain this narrow is effectively fixed; nothing to classify.
            if (ub - lb).abs() <= 2.0 * tol {
                continue;
            }
        }
        if let Some(lb) = var.lower().filter(|lb| (lb - value).abs() <= tol) {
            findings.push(Finding::info(format!(
                "{} near LB of {}",
                var.name(),
                fmt_f64(lb)
            )));
        } else if let Some(ub) = var.upper().filter(|ub| (ub - value).abs() <= tol) {
            findings.push(Finding::info(format!(
                "{} near UB of {}",
                var.name(),
                fmt_f64(ub)
            )));
        }
    }
    for c in model.constraints() {
        let constr = model.constraint(c);
        // Equality constraints are always at their bound when enforced.
        if !constr.is_active() || constr.is_equality() {
            continue;
        }
        let Some(body) = constr.body().eval(model) else {
            findings.push(Finding::info(format!(
                "Skipping CONSTR {}: missing variable value.",
                constr.name()
            )));
            continue;
        };
        if constr.upper().is_some_and(|ub| (body - ub).abs() <= tol) {
            findings.push(Finding::info(format!("{} near UB", constr.name())));
        }
        if constr.lower().is_some_and(|lb| (body - lb).abs() <= tol) {
            findings.push(Finding::info(format!("{} near LB", constr.name())));
        }
    }
    findings
}

pub fn find_active_constraints(model: &Model) -> Vec<Finding> {
    model
        .constraints()
        .into_iter()
        .map(|c| model.constraint(c))
        .filter(|constr| constr.is_active())
        .map(|constr| Finding::info(format!("{} active", constr.name())))
        .collect()
}

fn push_var_printout(line: &mut String, model: &Model, body: &Expr) {
    for v in body.variables() {
        let var = model.var(v);
        let value = var.value().map_or_else(|| "None".to_owned(), fmt_f64);
        line.push_str(&format!("\n  VAR {}: {}", var.name(), value));
    }
}
