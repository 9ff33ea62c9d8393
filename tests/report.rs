use expect_test::expect;

use feascheck::expr::Expr;
use feascheck::model::Model;
use feascheck::report::{
    find_active_constraints, find_close_to_bounds, find_infeasible_bounds,
    find_infeasible_constraints, ConstraintLogOptions, Finding, Severity, DEFAULT_TOL,
};

fn lines(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn equality_violation_logged() {
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(5.0), Some(5.1), Some(5.1));
    let findings =
        find_infeasible_constraints(&model, DEFAULT_TOL, ConstraintLogOptions::default());
    expect![[r#"CONSTR c: 5.0 =/= 5.1"#]].assert_eq(&lines(&findings));
}

#[test]
fn equality_within_tolerance_not_logged() {
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(5.0), Some(5.0), Some(5.0));
    let findings =
        find_infeasible_constraints(&model, DEFAULT_TOL, ConstraintLogOptions::default());
    assert!(findings.is_empty());
}

#[test]
fn equality_branch_excludes_range_checks() {
    // A violated equality produces exactly one line, never extra </= lines.
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(10.0), Some(5.0), Some(5.0));
    let findings =
        find_infeasible_constraints(&model, DEFAULT_TOL, ConstraintLogOptions::default());
    expect![[r#"CONSTR c: 10.0 =/= 5.0"#]].assert_eq(&lines(&findings));
}

#[test]
fn lower_bound_violation_logged() {
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(-1.0), Some(0.0), None);
    let findings =
        find_infeasible_constraints(&model, DEFAULT_TOL, ConstraintLogOptions::default());
    expect![[r#"CONSTR c: 0.0 </= -1.0"#]].assert_eq(&lines(&findings));
}

#[test]
fn inequality_sides_are_independent() {
    // Inverted bounds make both sides fire for the same constraint.
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(0.5), Some(1.0), Some(0.0));
    let findings =
        find_infeasible_constraints(&model, DEFAULT_TOL, ConstraintLogOptions::default());
    expect![[r#"
        CONSTR c: 1.0 </= 0.5
        CONSTR c: 0.5 </= 0.0"#]]
    .assert_eq(&lines(&findings));
}

#[test]
fn missing_value_is_a_soft_skip() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.add_constraint(root, "c", Expr::var(x) + Expr::constant(1.0), None, Some(0.0));
    let findings = find_infeasible_constraints(
        &model,
        DEFAULT_TOL,
        ConstraintLogOptions {
            log_expression: false,
            log_variables: true,
        },
    );
    expect![[r#"
        CONSTR c: missing variable value.
          VAR x: None"#]]
    .assert_eq(&lines(&findings));
    assert_eq!(findings.len(), 1);
}

#[test]
fn inactive_constraints_are_not_checked() {
    let mut model = Model::new();
    let root = model.root();
    let c = model.add_constraint(root, "c", Expr::constant(100.0), None, Some(0.0));
    model.deactivate(c);
    let findings =
        find_infeasible_constraints(&model, DEFAULT_TOL, ConstraintLogOptions::default());
    assert!(findings.is_empty());
}

#[test]
fn expression_option_appends_constraint_body() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.set_value(x, 3.0);
    model.add_constraint(
        root,
        "c",
        Expr::var(x) * Expr::constant(2.0),
        None,
        Some(1.0),
    );
    let findings = find_infeasible_constraints(
        &model,
        DEFAULT_TOL,
        ConstraintLogOptions {
            log_expression: true,
            log_variables: false,
        },
    );
    expect![[r#"
        CONSTR c: 6.0 </= 1.0
          (x * 2.0) </= 1.0"#]]
    .assert_eq(&lines(&findings));
}

#[test]
fn variable_bound_violations_logged() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.set_bounds(x, None, Some(10.0));
    model.set_value(x, 12.0);
    let y = model.add_variable(root, "y");
    model.set_bounds(y, Some(0.0), None);
    model.set_value(y, -1.0);
    let findings = find_infeasible_bounds(&model, DEFAULT_TOL);
    expect![[r#"
        VAR x: 12.0 > UB 10.0
        VAR y: -1.0 < LB 0.0"#]]
    .assert_eq(&lines(&findings));
}

#[test]
fn variable_bound_checks_are_independent() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.set_bounds(x, Some(1.0), Some(0.0));
    model.set_value(x, 0.5);
    let findings = find_infeasible_bounds(&model, DEFAULT_TOL);
    expect![[r#"
        VAR x: 0.5 < LB 1.0
        VAR x: 0.5 > UB 0.0"#]]
    .assert_eq(&lines(&findings));
}

#[test]
fn unset_variable_logs_one_debug_skip() {
    let mut model = Model::new();
    let root = model.root();
    let z = model.add_variable(root, "z");
    model.set_bounds(z, Some(0.0), Some(1.0));
    let findings = find_infeasible_bounds(&model, DEFAULT_TOL);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Debug);
    expect![[r#"Skipping VAR z with no assigned value."#]].assert_eq(&lines(&findings));
}

#[test]
fn narrow_domain_is_never_near_bound() {
    // Bound spread of exactly 2*tol: skipped even though the value sits on a bound.
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.set_bounds(x, Some(0.0), Some(2e-6));
    model.set_value(x, 0.0);
    let findings = find_close_to_bounds(&model, DEFAULT_TOL);
    assert!(findings.is_empty());
}

#[test]
fn variable_just_over_upper_bound_is_near_ub() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.set_bounds(x, Some(0.0), Some(10.0));
    model.set_value(x, 10.000_000_1);
    let findings = find_close_to_bounds(&model, DEFAULT_TOL);
    expect![[r#"x near UB of 10.0"#]].assert_eq(&lines(&findings));
}

#[test]
fn fixed_variables_are_excluded_from_near_bound() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.set_bounds(x, Some(0.0), Some(1.0));
    model.set_value(x, 0.0);
    model.fix(x);
    let findings = find_close_to_bounds(&model, DEFAULT_TOL);
    assert!(findings.is_empty());
}

#[test]
fn constraint_near_both_bounds_fires_twice() {
    // Unlike variables, the two constraint checks are independent ifs.
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(5e-8), Some(0.0), Some(1e-7));
    let findings = find_close_to_bounds(&model, DEFAULT_TOL);
    expect![[r#"
        c near UB
        c near LB"#]]
    .assert_eq(&lines(&findings));
}

#[test]
fn equality_constraints_are_excluded_from_near_bound() {
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "c", Expr::constant(5.0), Some(5.0), Some(5.0));
    let findings = find_close_to_bounds(&model, DEFAULT_TOL);
    assert!(findings.is_empty());
}

#[test]
fn near_bound_skip_line_for_unevaluable_constraint() {
    let mut model = Model::new();
    let root = model.root();
    let x = model.add_variable(root, "x");
    model.add_constraint(root, "c", Expr::var(x), Some(0.0), None);
    let findings = find_close_to_bounds(&model, DEFAULT_TOL);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Info);
    expect![[r#"Skipping CONSTR c: missing variable value."#]].assert_eq(&lines(&findings));
}

#[test]
fn active_constraints_in_prefix_depth_first_order() {
    let mut model = Model::new();
    let root = model.root();
    model.add_constraint(root, "a", Expr::constant(0.0), None, Some(1.0));
    let b = model.add_block(root, "b");
    model.add_constraint(b, "c", Expr::constant(0.0), None, Some(1.0));
    let inner = model.add_block(b, "inner");
    model.add_constraint(inner, "d", Expr::constant(0.0), None, Some(1.0));
    let e = model.add_constraint(root, "e", Expr::constant(0.0), None, Some(1.0));
    let findings = find_active_constraints(&model);
    expect![[r#"
        a active
        e active
        b.c active
        b.inner.d active"#]]
    .assert_eq(&lines(&findings));

    model.deactivate(e);
    let findings = find_active_constraints(&model);
    expect![[r#"
        a active
        b.c active
        b.inner.d active"#]]
    .assert_eq(&lines(&findings));
}
