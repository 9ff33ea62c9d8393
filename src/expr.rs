//! Numeric expression trees over model variables.
//!
//! Constraint bodies are immutable, shareable trees. Evaluation tolerates unset
//! variables by returning `None` instead of failing, which is the only missing-data
//! condition the reporter has to handle.

use std::{
    fmt,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    rc::Rc,
};

use rustc_hash::FxHashSet;

use crate::{
    model::{Model, VarId},
    util::fmt_f64,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(f64),
    Variable(VarId),
    Add(Expr, Expr),
    Mul(Expr, Expr),
    Pow(Expr, i32),
}

impl ExprKind {
    pub(crate) fn into_expr(self) -> Expr {
        Expr(Rc::new(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr(Rc<ExprKind>);

impl Expr {
    pub fn kind(&self) -> &ExprKind {
        self.0.as_ref()
    }

    pub fn constant(c: f64) -> Self {
        ExprKind::Constant(c).into_expr()
    }

    pub fn var(v: VarId) -> Self {
        ExprKind::Variable(v).into_expr()
    }

    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    pub fn one() -> Self {
        Self::constant(1.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(c) if *c == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(c) if *c == 1.0)
    }

    pub fn pow(self, exp: i32) -> Self {
        if exp == 0 {
            Self::one()
        } else if exp == 1 || (exp >= 0 && self.is_zero()) || self.is_one() {
            self
        } else if let ExprKind::Constant(c) = self.kind() {
            Self::constant(c.powi(exp))
        } else {
            ExprKind::Pow(self, exp).into_expr()
        }
    }

    pub fn inverse(self) -> Self {
        self.pow(-1)
    }

    pub fn extract_constant(&self) -> Option<f64> {
        match self.kind() {
            ExprKind::Constant(c) => Some(*c),
            _ => None,
        }
    }

    /// Evaluates against the current variable values of `model`.
    ///
    /// Returns `None` if any referenced variable has no assigned value.
    pub fn eval(&self, model: &Model) -> Option<f64> {
        match self.kind() {
            ExprKind::Constant(c) => Some(*c),
            ExprKind::Variable(v) => model.var(*v).value(),
            ExprKind::Add(lhs, rhs) => Some(lhs.eval(model)? + rhs.eval(model)?),
            ExprKind::Mul(lhs, rhs) => Some(lhs.eval(model)? * rhs.eval(model)?),
            ExprKind::Pow(base, exp) => Some(base.eval(model)?.powi(*exp)),
        }
    }

    /// The variables referenced by this expression, in first-occurrence order.
    pub fn variables(&self) -> Vec<VarId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        self.collect_variables(&mut seen, &mut order);
        order
    }

    fn collect_variables(&self, seen: &mut FxHashSet<VarId>, order: &mut Vec<VarId>) {
        match self.kind() {
            ExprKind::Constant(_) => {}
            ExprKind::Variable(v) => {
                if seen.insert(*v) {
                    order.push(*v);
                }
            }
            ExprKind::Add(lhs, rhs) | ExprKind::Mul(lhs, rhs) => {
                lhs.collect_variables(seen, order);
                rhs.collect_variables(seen, order);
            }
            ExprKind::Pow(base, _) => base.collect_variables(seen, order),
        }
    }

    /// Renders the expression with variable names resolved through `model`.
    pub fn display<'a>(&'a self, model: &'a Model) -> ExprDisplay<'a> {
        ExprDisplay { expr: self, model }
    }
}

impl From<f64> for Expr {
    fn from(c: f64) -> Self {
        Self::constant(c)
    }
}

impl Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        if self.is_zero() {
            self
        } else if let ExprKind::Constant(c) = self.kind() {
            Self::constant(-c)
        } else {
            Self::constant(-1.0) * self
        }
    }
}

impl Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if self.is_zero() {
            rhs
        } else if rhs.is_zero() {
            self
        } else {
            match (self.kind(), rhs.kind()) {
                (ExprKind::Constant(c1), ExprKind::Constant(c2)) => Self::constant(c1 + c2),
                _ => ExprKind::Add(self, rhs).into_expr(),
            }
        }
    }
}

impl AddAssign for Expr {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.clone() + rhs;
    }
}

impl Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        if self == rhs {
            Self::zero()
        } else {
            self + (-rhs)
        }
    }
}

impl SubAssign for Expr {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.clone() - rhs;
    }
}

impl Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.is_zero() || rhs.is_zero() {
            Self::zero()
        } else if self.is_one() {
            rhs
        } else if rhs.is_one() {
            self
        } else {
            match (self.kind(), rhs.kind()) {
                (ExprKind::Constant(c1), ExprKind::Constant(c2)) => Self::constant(c1 * c2),
                _ => ExprKind::Mul(self, rhs).into_expr(),
            }
        }
    }
}

impl MulAssign for Expr {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.clone() * rhs;
    }
}

impl Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        self * rhs.inverse()
    }
}

impl DivAssign for Expr {
    fn div_assign(&mut self, rhs: Self) {
        *self = self.clone() / rhs;
    }
}

pub struct ExprDisplay<'a> {
    expr: &'a Expr,
    model: &'a Model,
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_with_names(self.expr, self.model, f)
    }
}

fn fmt_with_names(expr: &Expr, model: &Model, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expr.kind() {
        ExprKind::Constant(c) => write!(f, "{}", fmt_f64(*c)),
        ExprKind::Variable(v) => write!(f, "{}", model.var(*v).name()),
        ExprKind::Add(lhs, rhs) => {
            write!(f, "(")?;
            fmt_with_names(lhs, model, f)?;
            write!(f, " + ")?;
            fmt_with_names(rhs, model, f)?;
            write!(f, ")")
        }
        ExprKind::Mul(lhs, rhs) => {
            write!(f, "(")?;
            fmt_with_names(lhs, model, f)?;
            write!(f, " * ")?;
            fmt_with_names(rhs, model, f)?;
            write!(f, ")")
        }
        ExprKind::Pow(base, exp) => {
            write!(f, "(")?;
            fmt_with_names(base, model, f)?;
            write!(f, " ^ {exp})")
        }
    }
}
