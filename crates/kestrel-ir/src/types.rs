//! IR-level types.

use std::fmt;

use kestrel_core::DeclId;

/// The type of an IR value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Unit,
    Bool,
    Int,
    Float,
    /// Uninhabited; the result of calls that never return.
    Never,
    /// Reference to a heap instance of a class.
    Object(DeclId),
    /// A value-type aggregate.
    Struct(DeclId),
    /// Address of storage holding a value of the inner type.
    Address(Box<IrType>),
    /// A function value.
    Function(Box<FunctionType>),
}

impl IrType {
    /// Address of storage holding `ty`.
    pub fn address(ty: IrType) -> Self {
        IrType::Address(Box::new(ty))
    }

    #[inline]
    pub fn is_unit(&self) -> bool {
        matches!(self, IrType::Unit)
    }

    #[inline]
    pub fn is_never(&self) -> bool {
        matches!(self, IrType::Never)
    }

    /// Check if values of this type hold a counted reference.
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, IrType::Object(_))
    }

    /// The stored type, if this is an address.
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Address(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Unit => f.write_str("()"),
            IrType::Bool => f.write_str("bool"),
            IrType::Int => f.write_str("int"),
            IrType::Float => f.write_str("float"),
            IrType::Never => f.write_str("never"),
            IrType::Object(decl) => write!(f, "object{}", decl),
            IrType::Struct(decl) => write!(f, "struct{}", decl),
            IrType::Address(inner) => write!(f, "*{}", inner),
            IrType::Function(ty) => write!(f, "{}", ty),
        }
    }
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<IrType>,
    pub result: IrType,
}

impl FunctionType {
    pub fn new(params: Vec<IrType>, result: IrType) -> Self {
        Self { params, result }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.result)
    }
}
