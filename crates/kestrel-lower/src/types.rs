//! Mapping checked AST types onto IR types and function signatures.

use kestrel_ast::{FunctionType as AstFunctionType, NominalType, Param, Semantics, Type};
use kestrel_ir::{FunctionType, IrType};

/// Lower a checked type.
pub fn lower_type(ty: &Type<'_>) -> IrType {
    match ty {
        Type::Unit => IrType::Unit,
        Type::Bool => IrType::Bool,
        Type::Int => IrType::Int,
        Type::Float => IrType::Float,
        Type::Never => IrType::Never,
        Type::Nominal(nominal) => lower_nominal(nominal),
        Type::Function(f) => IrType::Function(Box::new(lower_function_type(f))),
    }
}

/// Lower a nominal type: classes become object references, structs values.
pub fn lower_nominal(nominal: &NominalType<'_>) -> IrType {
    match nominal.semantics {
        Semantics::Reference => IrType::Object(nominal.decl),
        Semantics::Value => IrType::Struct(nominal.decl),
    }
}

pub fn lower_function_type(ty: &AstFunctionType<'_>) -> FunctionType {
    FunctionType::new(
        ty.params.iter().map(lower_type).collect(),
        lower_type(&ty.result),
    )
}

/// Signature of a free function or closure.
pub fn signature(params: &[Param<'_>], result: &Type<'_>) -> FunctionType {
    FunctionType::new(
        params.iter().map(|p| lower_type(&p.ty)).collect(),
        lower_type(result),
    )
}

/// Signature with a leading `self` of the owner's type.
pub fn method_signature(
    owner: &NominalType<'_>,
    params: &[Param<'_>],
    result: IrType,
) -> FunctionType {
    let mut lowered = Vec::with_capacity(params.len() + 1);
    lowered.push(lower_nominal(owner));
    lowered.extend(params.iter().map(|p| lower_type(&p.ty)));
    FunctionType::new(lowered, result)
}
