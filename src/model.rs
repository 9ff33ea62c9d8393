//! A minimal algebraic model: variables and constraints grouped in nested blocks.
//!
//! The reporter only reads this structure; the builder methods exist for the model
//! file loader and for tests. Components live in arenas on [`Model`] and are
//! addressed by index newtypes, so handles stay `Copy` and traversal is cheap.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{expr::Expr, util::fmt_f64};

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct VarId(usize);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConId(usize);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct BlockId(usize);

#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    value: Option<f64>,
    lower: Option<f64>,
    upper: Option<f64>,
    fixed: bool,
}

impl Variable {
    /// Fully qualified (dotted) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn lower(&self) -> Option<f64> {
        self.lower
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    pub fn has_lb(&self) -> bool {
        self.lower.is_some()
    }

    pub fn has_ub(&self) -> bool {
        self.upper.is_some()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    name: String,
    body: Expr,
    lower: Option<f64>,
    upper: Option<f64>,
    active: bool,
}

impl Constraint {
    /// Fully qualified (dotted) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn lower(&self) -> Option<f64> {
        self.lower
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// An equality constraint has coinciding lower and upper bounds and is enforced
    /// against that single target value, never as a range.
    pub fn is_equality(&self) -> bool {
        self.equality_target().is_some()
    }

    pub fn equality_target(&self) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(lb), Some(ub)) if lb == ub => Some(lb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct BlockData {
    path: String,
    vars: Vec<VarId>,
    cons: Vec<ConId>,
    children: Vec<BlockId>,
    parent: Option<BlockId>,
}

/// Container of variables and constraints, with nested sub-blocks.
///
/// Block 0 is the root. Traversal is prefix depth-first: a block's own components
/// in declaration order, then each child block recursively.
#[derive(Debug, Clone)]
pub struct Model {
    vars: Vec<Variable>,
    cons: Vec<Constraint>,
    blocks: Vec<BlockData>,
    var_names: FxHashMap<String, VarId>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            vars: Vec::new(),
            cons: Vec::new(),
            blocks: vec![BlockData {
                path: String::new(),
                vars: Vec::new(),
                cons: Vec::new(),
                children: Vec::new(),
                parent: None,
            }],
            var_names: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    pub fn add_block(&mut self, parent: BlockId, name: &str) -> BlockId {
        let path = self.qualify(parent, name);
        let id = BlockId(self.blocks.len());
        self.blocks.push(BlockData {
            path,
            vars: Vec::new(),
            cons: Vec::new(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.blocks[parent.0].children.push(id);
        id
    }

    pub fn add_variable(&mut self, block: BlockId, name: &str) -> VarId {
        let name = self.qualify(block, name);
        assert!(
            !self.var_names.contains_key(&name),
            "Duplicate variable {name}"
        );
        let id = VarId(self.vars.len());
        self.vars.push(Variable {
            name: name.clone(),
            value: None,
            lower: None,
            upper: None,
            fixed: false,
        });
        self.var_names.insert(name, id);
        self.blocks[block.0].vars.push(id);
        id
    }

    pub fn add_constraint(
        &mut self,
        block: BlockId,
        name: &str,
        body: Expr,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> ConId {
        let name = self.qualify(block, name);
        let id = ConId(self.cons.len());
        self.cons.push(Constraint {
            name,
            body,
            lower,
            upper,
            active: true,
        });
        self.blocks[block.0].cons.push(id);
        id
    }

    pub fn set_value(&mut self, v: VarId, value: f64) {
        self.vars[v.0].value = Some(value);
    }

    pub fn unset_value(&mut self, v: VarId) {
        self.vars[v.0].value = None;
    }

    pub fn set_bounds(&mut self, v: VarId, lower: Option<f64>, upper: Option<f64>) {
        self.vars[v.0].lower = lower;
        self.vars[v.0].upper = upper;
    }

    pub fn fix(&mut self, v: VarId) {
        self.vars[v.0].fixed = true;
    }

    pub fn deactivate(&mut self, c: ConId) {
        self.cons[c.0].active = false;
    }

    pub fn var(&self, v: VarId) -> &Variable {
        &self.vars[v.0]
    }

    pub fn constraint(&self, c: ConId) -> &Constraint {
        &self.cons[c.0]
    }

    /// Looks up a variable by its fully qualified name.
    pub fn variable_by_name(&self, name: &str) -> Option<VarId> {
        self.var_names.get(name).copied()
    }

    /// Resolves `name` against `block` and its enclosing blocks, innermost first.
    pub fn resolve_variable(&self, block: BlockId, name: &str) -> Option<VarId> {
        let mut current = Some(block);
        while let Some(b) = current {
            if let Some(v) = self.var_names.get(&self.qualify(b, name)) {
                return Some(*v);
            }
            current = self.blocks[b.0].parent;
        }
        None
    }

    /// All variables, prefix depth-first through nested blocks.
    pub fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::with_capacity(self.vars.len());
        self.visit_blocks(self.root(), &mut |b| out.extend_from_slice(&b.vars));
        out
    }

    /// All constraints, prefix depth-first through nested blocks.
    pub fn constraints(&self) -> Vec<ConId> {
        let mut out = Vec::with_capacity(self.cons.len());
        self.visit_blocks(self.root(), &mut |b| out.extend_from_slice(&b.cons));
        out
    }

    fn visit_blocks(&self, block: BlockId, f: &mut impl FnMut(&BlockData)) {
        let data = &self.blocks[block.0];
        f(data);
        for child in &data.children {
            self.visit_blocks(*child, f);
        }
    }

    fn qualify(&self, block: BlockId, name: &str) -> String {
        let path = &self.blocks[block.0].path;
        if path.is_empty() {
            name.to_owned()
        } else {
            format!("{path}.{name}")
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.variables() {
            let var = self.var(v);
            write!(f, "VAR {}", var.name())?;
            if var.has_lb() || var.has_ub() {
                let lb = var.lower().map_or_else(|| "-inf".to_owned(), fmt_f64);
                let ub = var.upper().map_or_else(|| "inf".to_owned(), fmt_f64);
                write!(f, " in [{lb}, {ub}]")?;
            }
            if let Some(value) = var.value() {
                write!(f, " = {}", fmt_f64(value))?;
            }
            if var.is_fixed() {
                write!(f, " [fixed]")?;
            }
            writeln!(f)?;
        }
        for c in self.constraints() {
            let constr = self.constraint(c);
            let body = constr.body().display(self);
            write!(f, "CONSTR {}: ", constr.name())?;
            if let Some(target) = constr.equality_target() {
                write!(f, "{body} == {}", fmt_f64(target))?;
            } else {
                match (constr.lower(), constr.upper()) {
                    (Some(lb), Some(ub)) => {
                        write!(f, "{} <= {body} <= {}", fmt_f64(lb), fmt_f64(ub))?;
                    }
                    (Some(lb), None) => write!(f, "{} <= {body}", fmt_f64(lb))?,
                    (None, Some(ub)) => write!(f, "{body} <= {}", fmt_f64(ub))?,
                    (None, None) => write!(f, "{body}")?,
                }
            }
            if !constr.is_active() {
                write!(f, " [inactive]")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
