use crate::decl::Decl;
use crate::expr::Expr;
use crate::intern::Interned;
use crate::Symbol;
use bitflags::bitflags;
use std::cell::OnceCell;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

pub type InternType<'ctx> = Interned<'ctx, Type<'ctx>>;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        const LOCAL = 1 << 2;
    }
}

/// A type reference plus qualifier bits. Cheap to copy; equality is
/// structural on (interned type, bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QualType<'ctx> {
    pub ty: InternType<'ctx>,
    pub quals: Qualifiers,
}

impl<'ctx> QualType<'ctx> {
    pub fn new(ty: InternType<'ctx>) -> Self {
        Self {
            ty,
            quals: Qualifiers::empty(),
        }
    }

    pub fn with_quals(ty: InternType<'ctx>, quals: Qualifiers) -> Self {
        Self { ty, quals }
    }

    pub fn is_const(&self) -> bool {
        self.quals.contains(Qualifiers::CONST)
    }

    pub fn is_volatile(&self) -> bool {
        self.quals.contains(Qualifiers::VOLATILE)
    }

    pub fn is_local(&self) -> bool {
        self.quals.contains(Qualifiers::LOCAL)
    }

    /// Follows alias chains and resolved references down to the type that
    /// determines representation and member lookup.
    pub fn canonical(&self) -> QualType<'ctx> {
        let mut current = *self;
        loop {
            match &*current.ty {
                Type::Alias(target) => {
                    let quals = current.quals | target.quals;
                    current = QualType::with_quals(target.ty, quals);
                }
                Type::Ref(r) => match r.target.get() {
                    Some(decl) => match decl.ty() {
                        Some(target) if target != current => {
                            let quals = current.quals | target.quals;
                            current = QualType::with_quals(target.ty, quals);
                        }
                        _ => return current,
                    },
                    None => return current,
                },
                _ => return current,
            }
        }
    }
}

impl<'ctx> Display for QualType<'ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_const() {
            write!(f, "const ")?;
        }
        if self.is_volatile() {
            write!(f, "volatile ")?;
        }
        self.ty.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Char,
    Void,
    ISize,
    USize,
    StringLit,
}

impl BuiltinKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Void => "void",
            Self::ISize => "isize",
            Self::USize => "usize",
            Self::StringLit => "string",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::ISize
                | Self::USize
                | Self::Char
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::ISize
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Bit width of the fixed-size integer kinds; pointer-sized and
    /// non-integer kinds have none.
    pub fn width(&self) -> Option<u32> {
        match self {
            Self::I8 | Self::U8 | Self::Char => Some(8),
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 => Some(32),
            Self::I64 | Self::U64 => Some(64),
            _ => None,
        }
    }
}

impl Display for BuiltinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct ArrayType<'ctx> {
    pub elem: QualType<'ctx>,
    pub size: Option<&'ctx Expr<'ctx>>,
    /// Filled by constant evaluation during analysis.
    pub len: OnceCell<u64>,
}

impl<'ctx> PartialEq for ArrayType<'ctx> {
    fn eq(&self, other: &Self) -> bool {
        if self.elem != other.elem {
            return false;
        }
        match (self.size, other.size) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

impl<'ctx> Eq for ArrayType<'ctx> {}

impl<'ctx> Hash for ArrayType<'ctx> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.elem.hash(state);
        self.size.map(|e| e as *const Expr).hash(state);
    }
}

/// A named type reference. Identity is `(home, qualifier, name)`: the module
/// the reference was written in is part of the key so unqualified references
/// from different modules never unify. The resolved target is filled in
/// place during analysis and takes no part in identity.
#[derive(Debug, Clone)]
pub struct RefType<'ctx> {
    pub home: Symbol<'ctx>,
    pub qualifier: Option<Symbol<'ctx>>,
    pub name: Symbol<'ctx>,
    pub target: OnceCell<&'ctx Decl<'ctx>>,
}

impl<'ctx> PartialEq for RefType<'ctx> {
    fn eq(&self, other: &Self) -> bool {
        self.home == other.home && self.qualifier == other.qualifier && self.name == other.name
    }
}

impl<'ctx> Eq for RefType<'ctx> {}

impl<'ctx> Hash for RefType<'ctx> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.home.hash(state);
        self.qualifier.hash(state);
        self.name.hash(state);
    }
}

fn hash_decls<H: Hasher>(decls: &[&Decl], state: &mut H) {
    for decl in decls {
        (*decl as *const Decl).hash(state);
    }
}

fn eq_decls<'a>(a: &[&Decl<'a>], b: &[&Decl<'a>]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| std::ptr::eq(*x, *y))
}

#[derive(Debug, Clone)]
pub struct StructType<'ctx> {
    pub is_union: bool,
    pub members: &'ctx [&'ctx Decl<'ctx>],
}

impl<'ctx> PartialEq for StructType<'ctx> {
    fn eq(&self, other: &Self) -> bool {
        self.is_union == other.is_union && eq_decls(self.members, other.members)
    }
}

impl<'ctx> Eq for StructType<'ctx> {}

impl<'ctx> Hash for StructType<'ctx> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_union.hash(state);
        hash_decls(self.members, state);
    }
}

#[derive(Debug, Clone)]
pub struct EnumType<'ctx> {
    pub constants: &'ctx [&'ctx Decl<'ctx>],
}

impl<'ctx> PartialEq for EnumType<'ctx> {
    fn eq(&self, other: &Self) -> bool {
        eq_decls(self.constants, other.constants)
    }
}

impl<'ctx> Eq for EnumType<'ctx> {}

impl<'ctx> Hash for EnumType<'ctx> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_decls(self.constants, state);
    }
}

#[derive(Debug, Clone)]
pub struct FuncType<'ctx> {
    pub params: &'ctx [&'ctx Decl<'ctx>],
    pub ret: QualType<'ctx>,
    pub variadic: bool,
}

impl<'ctx> PartialEq for FuncType<'ctx> {
    fn eq(&self, other: &Self) -> bool {
        self.ret == other.ret
            && self.variadic == other.variadic
            && eq_decls(self.params, other.params)
    }
}

impl<'ctx> Eq for FuncType<'ctx> {}

impl<'ctx> Hash for FuncType<'ctx> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ret.hash(state);
        self.variadic.hash(state);
        hash_decls(self.params, state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type<'ctx> {
    Builtin(BuiltinKind),
    Pointer(QualType<'ctx>),
    Array(ArrayType<'ctx>),
    Ref(RefType<'ctx>),
    Alias(QualType<'ctx>),
    Struct(StructType<'ctx>),
    Enum(EnumType<'ctx>),
    Func(FuncType<'ctx>),
    /// Sentinel for a module-name identifier during resolution; never part
    /// of a finished declaration.
    Module(Symbol<'ctx>),
}

impl<'ctx> Type<'ctx> {
    pub fn as_builtin(&self) -> Option<BuiltinKind> {
        if let Self::Builtin(kind) = self {
            Some(*kind)
        } else {
            None
        }
    }

    pub fn as_ref_type(&self) -> Option<&RefType<'ctx>> {
        if let Self::Ref(r) = self {
            Some(r)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType<'ctx>> {
        if let Self::Array(a) = self {
            Some(a)
        } else {
            None
        }
    }

    pub fn as_struct(&self) -> Option<&StructType<'ctx>> {
        if let Self::Struct(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType<'ctx>> {
        if let Self::Enum(e) = self {
            Some(e)
        } else {
            None
        }
    }

    pub fn as_func(&self) -> Option<&FuncType<'ctx>> {
        if let Self::Func(f) = self {
            Some(f)
        } else {
            None
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Builtin(BuiltinKind::Void))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(..))
    }
}

impl<'ctx> Display for Type<'ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Builtin(kind) => kind.fmt(f),
            Type::Pointer(pointee) => write!(f, "{pointee}*"),
            Type::Array(array) => {
                write!(f, "{}[", array.elem)?;
                if let Some(len) = array.len.get() {
                    write!(f, "{len}")?;
                }
                write!(f, "]")
            }
            Type::Ref(r) => match r.qualifier {
                Some(module) => write!(f, "{module}.{}", r.name),
                None => r.name.fmt(f),
            },
            Type::Alias(target) => target.fmt(f),
            Type::Struct(s) if s.is_union => write!(f, "union"),
            Type::Struct(..) => write!(f, "struct"),
            Type::Enum(..) => write!(f, "enum"),
            Type::Func(func) => {
                write!(f, "func {}(", func.ret)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match param.ty() {
                        Some(ty) => write!(f, "{ty}")?,
                        None => write!(f, "?")?,
                    }
                }
                if func.variadic {
                    if !func.params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            Type::Module(name) => write!(f, "module {name}"),
        }
    }
}
