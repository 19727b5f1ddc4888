//! Module container and external declarations.

use rustc_hash::FxHashMap;

use crate::{Function, IrType};

/// Code-generation target.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Target {
    /// 256-bit-word stack machine.
    Evm,
    /// 32/64-bit linear-memory bytecode.
    Ewasm,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Evm => "evm",
            Target::Ewasm => "ewasm",
        }
    }
}

/// An external function declaration (the environment interface and
/// helper functions live here).
#[derive(Clone, Debug)]
pub struct ExternalDecl {
    pub name: String,
    pub params: Vec<IrType>,
    pub ret: IrType,
}

/// One translation unit of IR.
pub struct Module {
    pub name: String,
    pub target: Target,
    externals: Vec<ExternalDecl>,
    external_index: FxHashMap<String, usize>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Module {
            name: name.into(),
            target,
            externals: Vec::new(),
            external_index: FxHashMap::default(),
            functions: Vec::new(),
        }
    }

    /// Declare an external function; redeclaration is a no-op.
    pub fn declare_external(&mut self, name: &str, params: Vec<IrType>, ret: IrType) {
        if self.external_index.contains_key(name) {
            return;
        }
        self.external_index.insert(name.to_owned(), self.externals.len());
        self.externals.push(ExternalDecl {
            name: name.to_owned(),
            params,
            ret,
        });
    }

    pub fn external(&self, name: &str) -> Option<&ExternalDecl> {
        self.external_index.get(name).map(|&i| &self.externals[i])
    }

    pub fn externals(&self) -> &[ExternalDecl] {
        &self.externals
    }

    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_declarations_dedup() {
        let mut module = Module::new("m", Target::Evm);
        module.declare_external("storageLoad", vec![IrType::I256], IrType::I256);
        module.declare_external("storageLoad", vec![IrType::I256], IrType::I256);
        assert_eq!(module.externals().len(), 1);
        assert!(module.external("storageLoad").is_some());
        assert!(module.external("storageStore").is_none());
    }
}
