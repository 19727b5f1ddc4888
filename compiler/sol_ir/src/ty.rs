//! The source type system.
//!
//! Types are interned: structurally equal types share one [`TyId`], so
//! structural equality downstream is handle equality.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{Name, StringInterner};

/// Signedness and width of an integer type.
///
/// Width is a multiple of 8 in `8..=256`. `uint`/`int` are the 256-bit
/// spellings.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct IntKind {
    pub signed: bool,
    pub bits: u16,
}

impl IntKind {
    pub const fn unsigned(bits: u16) -> Self {
        IntKind {
            signed: false,
            bits,
        }
    }

    pub const fn signed(bits: u16) -> Self {
        IntKind { signed: true, bits }
    }
}

/// State mutability of functions and of the address type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    NonPayable,
    Payable,
}

/// Placement of a reference value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum DataLocation {
    #[default]
    Unspecified,
    Storage,
    Memory,
    CallData,
}

/// Interned handle to a [`Ty`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct TyId(u32);

impl TyId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A source-level type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Ty {
    Bool,
    Integer(IntKind),
    /// `bytesN`, N in 1..=32.
    FixedBytes(u8),
    Bytes,
    String,
    Address(StateMutability),
    Array {
        elem: TyId,
        /// `None` for dynamically-sized arrays.
        len: Option<u64>,
        loc: DataLocation,
    },
    Mapping {
        key: TyId,
        value: TyId,
    },
    Function {
        params: Vec<TyId>,
        returns: Vec<TyId>,
        mutability: StateMutability,
    },
    UserDefined(Name),
}

impl Ty {
    /// Reference types live in a data location; value types do not.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Ty::Bytes | Ty::String | Ty::Array { .. } | Ty::Mapping { .. }
        )
    }

    /// Dynamically-sized in the ABI (head/tail encoded).
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Ty::Bytes | Ty::String | Ty::Array { len: None, .. })
    }

    pub fn as_integer(&self) -> Option<IntKind> {
        match self {
            Ty::Integer(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Interning table for types.
#[derive(Default)]
pub struct TypeTable {
    types: Vec<Ty>,
    lookup: FxHashMap<Ty, TyId>,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable::default()
    }

    /// Intern a type, returning its handle.
    pub fn intern(&mut self, ty: Ty) -> TyId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        let id = TyId(u32::try_from(self.types.len()).expect("type table overflow"));
        self.lookup.insert(ty.clone(), id);
        self.types.push(ty);
        id
    }

    #[inline]
    pub fn get(&self, id: TyId) -> &Ty {
        &self.types[id.0 as usize]
    }

    pub fn bool(&mut self) -> TyId {
        self.intern(Ty::Bool)
    }

    pub fn uint256(&mut self) -> TyId {
        self.intern(Ty::Integer(IntKind::unsigned(256)))
    }

    pub fn integer(&mut self, kind: IntKind) -> TyId {
        self.intern(Ty::Integer(kind))
    }

    pub fn address(&mut self, mutability: StateMutability) -> TyId {
        self.intern(Ty::Address(mutability))
    }

    /// Canonical ABI spelling of a type, as used in function signatures:
    /// `uint` canonicalizes to `uint256`, `int` to `int256`, arrays to
    /// `T[]`/`T[k]`.
    pub fn canonical_name(&self, id: TyId, interner: &StringInterner) -> String {
        match self.get(id) {
            Ty::Bool => "bool".to_owned(),
            Ty::Integer(IntKind { signed: false, bits }) => format!("uint{bits}"),
            Ty::Integer(IntKind { signed: true, bits }) => format!("int{bits}"),
            Ty::FixedBytes(n) => format!("bytes{n}"),
            Ty::Bytes => "bytes".to_owned(),
            Ty::String => "string".to_owned(),
            Ty::Address(_) => "address".to_owned(),
            Ty::Array { elem, len, .. } => {
                let elem = self.canonical_name(*elem, interner);
                match len {
                    Some(n) => format!("{elem}[{n}]"),
                    None => format!("{elem}[]"),
                }
            }
            Ty::Mapping { key, value } => format!(
                "mapping({} => {})",
                self.canonical_name(*key, interner),
                self.canonical_name(*value, interner)
            ),
            Ty::Function { .. } => "function".to_owned(),
            Ty::UserDefined(name) => interner.lookup(*name).to_owned(),
        }
    }
}

impl fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTable")
            .field("len", &self.types.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups_structurally_equal_types() {
        let mut table = TypeTable::new();
        let a = table.intern(Ty::Integer(IntKind::unsigned(256)));
        let b = table.uint256();
        assert_eq!(a, b);

        let arr_a = table.intern(Ty::Array {
            elem: a,
            len: Some(3),
            loc: DataLocation::Memory,
        });
        let arr_b = table.intern(Ty::Array {
            elem: b,
            len: Some(3),
            loc: DataLocation::Memory,
        });
        assert_eq!(arr_a, arr_b);
    }

    #[test]
    fn canonical_names() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let u256 = table.uint256();
        assert_eq!(table.canonical_name(u256, &interner), "uint256");

        let i8 = table.integer(IntKind::signed(8));
        assert_eq!(table.canonical_name(i8, &interner), "int8");

        let b4 = table.intern(Ty::FixedBytes(4));
        assert_eq!(table.canonical_name(b4, &interner), "bytes4");

        let dyn_arr = table.intern(Ty::Array {
            elem: u256,
            len: None,
            loc: DataLocation::Unspecified,
        });
        assert_eq!(table.canonical_name(dyn_arr, &interner), "uint256[]");

        let addr = table.address(StateMutability::Payable);
        assert_eq!(table.canonical_name(addr, &interner), "address");
    }

    #[test]
    fn reference_and_dynamic_classification() {
        let mut table = TypeTable::new();
        let u256 = table.uint256();
        assert!(!table.get(u256).is_reference());
        assert!(Ty::Bytes.is_reference());
        assert!(Ty::Bytes.is_dynamic());
        let fixed = Ty::Array {
            elem: u256,
            len: Some(3),
            loc: DataLocation::Memory,
        };
        assert!(fixed.is_reference());
        assert!(!fixed.is_dynamic());
    }
}
