//! End-to-end tests for lowering whole compilation units.
//!
//! Each test builds a small type-checked tree in an arena, lowers it, and
//! inspects the resulting module.

use std::collections::HashMap;

use bumpalo::Bump;
use kestrel::ast::{
    AssignStmt, BindingDecl, Block, CallExpr, CheckStage, ClosureExpr, CompilationUnit,
    ConstructorDecl, Decl, DestructorDecl, Expr, ExprStmt, ExternalDefinition, FieldDecl, FieldExpr,
    FunctionDecl, FunctionType, IfStmt, ImportedModule, LetStmt, Literal, LiteralExpr, LocalExpr,
    NominalType, Param, ReturnStmt, SelfExpr, Semantics, Stmt, TopLevelCode, Type, TypeDecl,
    UnitKind, VarDecl,
};
use kestrel::ir::{FunctionAttrs, Instr, IrFunction, IrModule, Terminator, ValueId};
use kestrel::{
    DeclId, LoweringError, LoweringOptions, LoweringTarget, Span, construct_module,
    construct_module_with_options, lower_into_module,
};

// =============================================================================
// Tree Builders
// =============================================================================

fn span() -> Span {
    Span::default()
}

fn int<'a>(value: i64) -> Expr<'a> {
    Expr::Literal(LiteralExpr {
        kind: Literal::Int(value),
        span: span(),
    })
}

fn boolean<'a>(value: bool) -> Expr<'a> {
    Expr::Literal(LiteralExpr {
        kind: Literal::Bool(value),
        span: span(),
    })
}

fn expr<'a>(arena: &'a Bump, expr: Expr<'a>) -> &'a Expr<'a> {
    arena.alloc(expr)
}

fn local<'a>(arena: &'a Bump, name: &'a str, ty: Type<'a>) -> &'a Expr<'a> {
    arena.alloc(Expr::Local(LocalExpr {
        name,
        ty,
        span: span(),
    }))
}

/// `self.<name>` inside a member of `owner`.
fn self_field<'a>(
    arena: &'a Bump,
    owner: NominalType<'a>,
    field: u32,
    name: &'a str,
    ty: Type<'a>,
) -> &'a Expr<'a> {
    let base: &Expr = arena.alloc(Expr::SelfRef(SelfExpr {
        ty: Type::Nominal(owner),
        span: span(),
    }));
    arena.alloc(Expr::Field(arena.alloc(FieldExpr {
        base,
        field,
        name,
        ty,
        span: span(),
    })))
}

fn let_stmt<'a>(name: &'a str, ty: Type<'a>, init: &'a Expr<'a>) -> Stmt<'a> {
    Stmt::Let(LetStmt {
        name,
        ty,
        init,
        span: span(),
    })
}

fn assign<'a>(target: &'a Expr<'a>, value: &'a Expr<'a>) -> Stmt<'a> {
    Stmt::Assign(AssignStmt {
        target,
        value,
        span: span(),
    })
}

fn field<'a>(name: &'a str, ty: Type<'a>) -> FieldDecl<'a> {
    FieldDecl {
        name,
        ty,
        span: span(),
    }
}

fn block<'a>(arena: &'a Bump, stmts: &[Stmt<'a>]) -> Block<'a> {
    Block {
        stmts: arena.alloc_slice_copy(stmts),
        span: span(),
    }
}

fn ret<'a>(value: Option<&'a Expr<'a>>) -> Stmt<'a> {
    Stmt::Return(ReturnStmt {
        value,
        span: span(),
    })
}

fn function<'a>(
    id: u32,
    name: &'a str,
    params: &'a [Param<'a>],
    result: Type<'a>,
    body: Option<Block<'a>>,
) -> FunctionDecl<'a> {
    FunctionDecl {
        id: DeclId(id),
        name,
        params,
        result,
        body,
        span: span(),
    }
}

fn param<'a>(name: &'a str, ty: Type<'a>) -> Param<'a> {
    Param {
        name,
        ty,
        span: span(),
    }
}

fn nominal<'a>(id: u32, name: &'a str, semantics: Semantics) -> NominalType<'a> {
    NominalType {
        decl: DeclId(id),
        name,
        semantics,
    }
}

fn class<'a>(
    id: u32,
    name: &'a str,
    constructors: &'a [ConstructorDecl<'a>],
    destructor: Option<DestructorDecl<'a>>,
) -> TypeDecl<'a> {
    TypeDecl {
        id: DeclId(id),
        name,
        semantics: Semantics::Reference,
        fields: &[],
        constructors,
        methods: &[],
        destructor,
        span: span(),
    }
}

fn unit<'a>(arena: &'a Bump, kind: UnitKind, decls: &[Decl<'a>]) -> CompilationUnit<'a> {
    CompilationUnit::new(kind, arena.alloc_slice_copy(decls))
}

// =============================================================================
// Inspection Helpers
// =============================================================================

fn returns(function: &IrFunction) -> usize {
    function
        .terminators()
        .filter(|t| matches!(t, Terminator::Return(_)))
        .count()
}

fn has_unreachable(function: &IrFunction) -> bool {
    function
        .terminators()
        .any(|t| matches!(t, Terminator::Unreachable))
}

fn stack_slots(function: &IrFunction) -> Vec<ValueId> {
    function
        .instrs()
        .filter_map(|i| match i {
            Instr::AllocStack { dst, .. } => Some(*dst),
            _ => None,
        })
        .collect()
}

fn loads(function: &IrFunction) -> Vec<ValueId> {
    function
        .instrs()
        .filter_map(|i| match i {
            Instr::Load { addr, .. } => Some(*addr),
            _ => None,
        })
        .collect()
}

fn release_count(function: &IrFunction) -> usize {
    function
        .instrs()
        .filter(|i| matches!(i, Instr::Release { .. }))
        .count()
}

/// The address each released value was loaded from, in emission order.
fn released_from(function: &IrFunction) -> Vec<ValueId> {
    let mut loaded_from = HashMap::new();
    let mut released = Vec::new();
    for instr in function.instrs() {
        match instr {
            Instr::Load { dst, addr } => {
                loaded_from.insert(*dst, *addr);
            }
            Instr::Release { value } => released.extend(loaded_from.get(value).copied()),
            _ => {}
        }
    }
    released
}

fn assert_all_verify(module: &IrModule) {
    for (target, function) in module.functions() {
        assert_eq!(function.verify(), Ok(()), "{target} failed verification");
    }
    if let Some(top) = module.top_level() {
        assert_eq!(top.verify(), Ok(()));
    }
}

// =============================================================================
// Single Emission
// =============================================================================

#[test]
fn test_each_function_is_lowered_once() {
    let arena = Bump::new();
    let decls = [
        Decl::Function(function(1, "first", &[], Type::Unit, Some(block(&arena, &[])))),
        Decl::Function(function(2, "second", &[], Type::Unit, Some(block(&arena, &[])))),
    ];
    let unit = unit(&arena, UnitKind::Library, &decls);

    let mut module = construct_module(&unit, 0).unwrap();
    assert_eq!(module.function_count(), 2);
    assert!(module.has_function(&LoweringTarget::function(DeclId(1))));
    assert_all_verify(&module);

    let err = lower_into_module(&mut module, &unit, 0, &LoweringOptions::default()).unwrap_err();
    assert_eq!(
        err,
        LoweringError::DuplicateTarget {
            target: "function #1".into()
        }
    );
}

#[test]
fn test_prototypes_produce_nothing() {
    let arena = Bump::new();
    let ctors = arena.alloc_slice_copy(&[ConstructorDecl {
        id: DeclId(11),
        params: &[],
        body: None,
        span: span(),
    }]);
    let decls = [
        Decl::Function(function(1, "extern_fn", &[], Type::Int, None)),
        Decl::Type(class(10, "Handle", ctors, None)),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();

    // Only the class destructor remains.
    assert_eq!(module.function_count(), 1);
    assert!(module.has_function(&LoweringTarget::destructor(DeclId(10))));
}

// =============================================================================
// Types
// =============================================================================

#[test]
fn test_class_constructor_fans_out_and_struct_constructor_does_not() {
    let arena = Bump::new();
    let class_ctors = arena.alloc_slice_copy(&[ConstructorDecl {
        id: DeclId(2),
        params: arena.alloc_slice_copy(&[param("size", Type::Int)]),
        body: Some(block(&arena, &[])),
        span: span(),
    }]);
    let struct_ctors = arena.alloc_slice_copy(&[ConstructorDecl {
        id: DeclId(6),
        params: &[],
        body: Some(block(&arena, &[])),
        span: span(),
    }]);
    let point = TypeDecl {
        id: DeclId(5),
        name: "Point",
        semantics: Semantics::Value,
        fields: &[],
        constructors: struct_ctors,
        methods: &[],
        destructor: None,
        span: span(),
    };
    let decls = [
        Decl::Type(class(1, "Buffer", class_ctors, None)),
        Decl::Type(point),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();

    let allocator = module
        .function(&LoweringTarget::allocator(DeclId(2)))
        .unwrap();
    let initializer = module
        .function(&LoweringTarget::initializer(DeclId(2)))
        .unwrap();
    assert_eq!(allocator.name(), "Buffer.init.allocator");
    assert_eq!(allocator.ty().params.len(), 1);
    assert_eq!(initializer.ty().params.len(), 2);
    assert!(initializer.ty().result.is_unit());
    assert!(allocator.instrs().any(|i| matches!(
        i,
        Instr::Call { callee, .. } if *callee == LoweringTarget::initializer(DeclId(2))
    )));

    assert!(module.has_function(&LoweringTarget::function(DeclId(6))));
    assert!(!module.has_function(&LoweringTarget::allocator(DeclId(6))));
    assert!(!module.has_function(&LoweringTarget::initializer(DeclId(6))));
    assert!(!module.has_function(&LoweringTarget::destructor(DeclId(5))));

    // Buffer: allocator, initializer, destructor. Point: constructor.
    assert_eq!(module.function_count(), 4);
    assert_all_verify(&module);
}

#[test]
fn test_every_class_gets_one_destructor() {
    let arena = Bump::new();
    let explicit = DestructorDecl {
        body: block(&arena, &[]),
        span: span(),
    };
    let decls = [
        Decl::Type(class(1, "Plain", &[], None)),
        Decl::Type(class(2, "Custom", &[], Some(explicit))),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();

    let plain = module
        .function(&LoweringTarget::destructor(DeclId(1)))
        .unwrap();
    let custom = module
        .function(&LoweringTarget::destructor(DeclId(2)))
        .unwrap();
    assert!(plain.attrs().contains(FunctionAttrs::SYNTHESIZED));
    assert!(!custom.attrs().contains(FunctionAttrs::SYNTHESIZED));

    for dtor in [plain, custom] {
        assert!(dtor.attrs().contains(FunctionAttrs::DESTRUCTOR));
        assert!(dtor.ty().result.is_unit());
        assert_eq!(returns(dtor), 1);
        assert!(
            dtor.instrs()
                .any(|i| matches!(i, Instr::DeallocObject { .. }))
        );
    }
}

#[test]
fn test_destructor_releases_reference_fields() {
    let arena = Bump::new();
    let child = Type::Nominal(nominal(1, "Tree", Semantics::Reference));
    let fields = arena.alloc_slice_copy(&[
        field("left", child),
        field("weight", Type::Int),
        field("right", child),
    ]);
    let tree = TypeDecl {
        fields,
        ..class(1, "Tree", &[], None)
    };
    let module =
        construct_module(&unit(&arena, UnitKind::Library, &[Decl::Type(tree)]), 0).unwrap();
    let dtor = module
        .function(&LoweringTarget::destructor(DeclId(1)))
        .unwrap();

    let released_fields: Vec<u32> = dtor
        .instrs()
        .filter_map(|i| match i {
            Instr::FieldAddr { field, .. } => Some(*field),
            _ => None,
        })
        .collect();
    assert_eq!(released_fields, vec![2, 0]);
    assert!(matches!(
        dtor.instrs().last(),
        Some(Instr::DeallocObject { .. })
    ));
}

#[test]
fn test_struct_constructor_converges_on_one_return() {
    let arena = Bump::new();
    let point_ty = nominal(5, "Point", Semantics::Value);
    let x = self_field(&arena, point_ty, 0, "x", Type::Int);
    let store = assign(x, expr(&arena, int(1)));
    let early = Stmt::If(arena.alloc(IfStmt {
        cond: expr(&arena, boolean(true)),
        then_block: block(&arena, &[ret(None)]),
        else_block: None,
        span: span(),
    }));
    let ctors = arena.alloc_slice_copy(&[ConstructorDecl {
        id: DeclId(6),
        params: &[],
        body: Some(block(&arena, &[early, store])),
        span: span(),
    }]);
    let fields = arena.alloc_slice_copy(&[field("x", Type::Int)]);
    let point = TypeDecl {
        id: DeclId(5),
        name: "Point",
        semantics: Semantics::Value,
        fields,
        constructors: ctors,
        methods: &[],
        destructor: None,
        span: span(),
    };

    let module =
        construct_module(&unit(&arena, UnitKind::Library, &[Decl::Type(point)]), 0).unwrap();
    let ctor = module
        .function(&LoweringTarget::function(DeclId(6)))
        .unwrap();
    assert_eq!(ctor.name(), "Point.init");
    assert_eq!(returns(ctor), 1);
    assert!(ctor.attrs().contains(FunctionAttrs::CONSTRUCTOR));
    assert_eq!(ctor.verify(), Ok(()));
}

// =============================================================================
// Epilogues and Cleanups
// =============================================================================

#[test]
fn test_missing_result_falls_into_unreachable() {
    let arena = Bump::new();
    let one = expr(&arena, int(1));
    let guarded = Stmt::If(arena.alloc(IfStmt {
        cond: expr(&arena, boolean(true)),
        then_block: block(&arena, &[ret(Some(one))]),
        else_block: None,
        span: span(),
    }));
    let decls = [
        Decl::Function(function(1, "maybe", &[], Type::Int, Some(block(&arena, &[guarded])))),
        Decl::Function(function(2, "nothing", &[], Type::Unit, Some(block(&arena, &[])))),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();

    let maybe = module
        .function(&LoweringTarget::function(DeclId(1)))
        .unwrap();
    assert_eq!(returns(maybe), 1);
    assert!(has_unreachable(maybe));

    let nothing = module
        .function(&LoweringTarget::function(DeclId(2)))
        .unwrap();
    assert_eq!(returns(nothing), 1);
    assert!(!has_unreachable(nothing));
    assert_all_verify(&module);
}

#[test]
fn test_cleanups_run_in_reverse_before_return() {
    let arena = Bump::new();
    let node = Type::Nominal(nominal(9, "Node", Semantics::Reference));
    let params = arena.alloc_slice_copy(&[param("a", node), param("b", node), param("c", node)]);
    let read_a = local(&arena, "a", node);
    let body = block(&arena, &[let_stmt("copy", node, read_a), ret(None)]);
    let decls = [
        Decl::Type(class(9, "Node", &[], None)),
        Decl::Function(function(1, "consume", params, Type::Unit, Some(body))),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let consume = module
        .function(&LoweringTarget::function(DeclId(1)))
        .unwrap();

    let slots = stack_slots(consume);
    assert_eq!(slots.len(), 4);
    let cleanup_loads: Vec<_> = loads(consume).into_iter().rev().take(4).collect();
    // Emitted innermost first (`copy`, `c`, `b`, `a`), read back in reverse.
    assert_eq!(cleanup_loads, vec![slots[0], slots[1], slots[2], slots[3]]);

    assert_eq!(release_count(consume), 4);
    assert_eq!(returns(consume), 1);
    assert_all_verify(&module);
}

#[test]
fn test_nested_scopes_release_innermost_first_when_falling_off_the_end() {
    let arena = Bump::new();
    let node = Type::Nominal(nominal(9, "Node", Semantics::Reference));
    let params = arena.alloc_slice_copy(&[param("n", node)]);
    let read_n = local(&arena, "n", node);
    let innermost = block(&arena, &[let_stmt("c", node, read_n)]);
    let inner = block(
        &arena,
        &[let_stmt("b", node, read_n), Stmt::Block(innermost)],
    );
    let body = block(&arena, &[let_stmt("a", node, read_n), Stmt::Block(inner)]);
    let decls = [
        Decl::Type(class(9, "Node", &[], None)),
        Decl::Function(function(1, "nest", params, Type::Unit, Some(body))),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let nest = module
        .function(&LoweringTarget::function(DeclId(1)))
        .unwrap();

    // Slots in declaration order: `n`, `a`, `b`, `c`.
    let slots = stack_slots(nest);
    assert_eq!(slots.len(), 4);
    assert_eq!(
        released_from(nest),
        vec![slots[3], slots[2], slots[1], slots[0]]
    );
    assert!(matches!(
        nest.blocks().last().and_then(|b| b.terminator.as_ref()),
        Some(Terminator::Return(_))
    ));
    assert_eq!(returns(nest), 1);
    assert_all_verify(&module);
}

// =============================================================================
// Ownership
// =============================================================================

/// `class Link { peer: Link }` whose initializer takes `a` and `b`.
fn link_with_initializer<'a>(arena: &'a Bump, body: Block<'a>) -> Decl<'a> {
    let link = nominal(20, "Link", Semantics::Reference);
    let ty = Type::Nominal(link);
    let ctors = arena.alloc_slice_copy(&[ConstructorDecl {
        id: DeclId(21),
        params: arena.alloc_slice_copy(&[param("a", ty), param("b", ty)]),
        body: Some(body),
        span: span(),
    }]);
    Decl::Type(TypeDecl {
        fields: arena.alloc_slice_copy(&[field("peer", ty)]),
        ..class(20, "Link", ctors, None)
    })
}

#[test]
fn test_second_store_to_a_field_in_an_initializer_releases_the_first() {
    let arena = Bump::new();
    let link = nominal(20, "Link", Semantics::Reference);
    let ty = Type::Nominal(link);
    let peer = self_field(&arena, link, 0, "peer", ty);
    let body = block(
        &arena,
        &[
            assign(peer, local(&arena, "a", ty)),
            assign(peer, local(&arena, "b", ty)),
        ],
    );
    let decls = [link_with_initializer(&arena, body)];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let init = module
        .function(&LoweringTarget::initializer(DeclId(21)))
        .unwrap();

    // The overwritten `a` straight from the field, then the parameters.
    let slots = stack_slots(init);
    let released = released_from(init);
    assert_eq!(released.len(), 3);
    assert!(!slots.contains(&released[0]));
    assert_eq!(released[1..], [slots[1], slots[0]]);
    assert_all_verify(&module);
}

#[test]
fn test_field_initialized_on_every_branch_is_released_when_overwritten() {
    let arena = Bump::new();
    let link = nominal(20, "Link", Semantics::Reference);
    let ty = Type::Nominal(link);
    let peer = self_field(&arena, link, 0, "peer", ty);
    let read_a = local(&arena, "a", ty);
    let read_b = local(&arena, "b", ty);
    let choose = Stmt::If(arena.alloc(IfStmt {
        cond: expr(&arena, boolean(true)),
        then_block: block(&arena, &[assign(peer, read_a)]),
        else_block: Some(block(&arena, &[assign(peer, read_b)])),
        span: span(),
    }));
    let body = block(&arena, &[choose, assign(peer, read_a)]);
    let decls = [link_with_initializer(&arena, body)];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let init = module
        .function(&LoweringTarget::initializer(DeclId(21)))
        .unwrap();

    // Neither branch releases; the store after the merge does.
    assert_eq!(release_count(init), 3);
    assert_all_verify(&module);
}

/// `struct Pair { head: Node, len: int, tail: Node }`.
fn pair<'a>(arena: &'a Bump) -> Decl<'a> {
    let node = Type::Nominal(nominal(9, "Node", Semantics::Reference));
    Decl::Type(TypeDecl {
        id: DeclId(30),
        name: "Pair",
        semantics: Semantics::Value,
        fields: arena.alloc_slice_copy(&[
            field("head", node),
            field("len", Type::Int),
            field("tail", node),
        ]),
        constructors: &[],
        methods: &[],
        destructor: None,
        span: span(),
    })
}

#[test]
fn test_struct_parameter_releases_its_reference_fields() {
    let arena = Bump::new();
    let pair_ty = Type::Nominal(nominal(30, "Pair", Semantics::Value));
    let params = arena.alloc_slice_copy(&[param("p", pair_ty)]);
    let decls = [
        Decl::Type(class(9, "Node", &[], None)),
        pair(&arena),
        Decl::Function(function(1, "take", params, Type::Unit, Some(block(&arena, &[])))),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let take = module
        .function(&LoweringTarget::function(DeclId(1)))
        .unwrap();

    let field_addrs: Vec<(ValueId, u32)> = take
        .instrs()
        .filter_map(|i| match i {
            Instr::FieldAddr { dst, field, .. } => Some((*dst, *field)),
            _ => None,
        })
        .collect();
    assert_eq!(
        field_addrs.iter().map(|f| f.1).collect::<Vec<_>>(),
        vec![0, 2]
    );
    // `tail` first, then `head`.
    assert_eq!(
        released_from(take),
        vec![field_addrs[1].0, field_addrs[0].0]
    );
    assert_all_verify(&module);
}

#[test]
fn test_destructor_releases_references_inside_struct_fields() {
    let arena = Bump::new();
    let pair_ty = Type::Nominal(nominal(30, "Pair", Semantics::Value));
    let holder = TypeDecl {
        fields: arena.alloc_slice_copy(&[field("count", Type::Int), field("pair", pair_ty)]),
        ..class(40, "Holder", &[], None)
    };
    let decls = [
        Decl::Type(class(9, "Node", &[], None)),
        pair(&arena),
        Decl::Type(holder),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let dtor = module
        .function(&LoweringTarget::destructor(DeclId(40)))
        .unwrap();

    let fields: Vec<u32> = dtor
        .instrs()
        .filter_map(|i| match i {
            Instr::FieldAddr { field, .. } => Some(*field),
            _ => None,
        })
        .collect();
    // `pair` itself, then its `head` and `tail`.
    assert_eq!(fields, vec![1, 0, 2]);
    assert_eq!(release_count(dtor), 2);
    assert!(matches!(
        dtor.instrs().last(),
        Some(Instr::DeallocObject { .. })
    ));
    assert_all_verify(&module);
}

#[test]
fn test_discarded_struct_result_releases_its_fields() {
    let arena = Bump::new();
    let pair_ty = Type::Nominal(nominal(30, "Pair", Semantics::Value));
    let make = expr(
        &arena,
        Expr::Call(arena.alloc(CallExpr {
            callee: DeclId(2),
            name: "make",
            receiver: None,
            args: &[],
            ty: pair_ty,
            span: span(),
        })),
    );
    let discard = Stmt::Expr(ExprStmt {
        expr: make,
        span: span(),
    });
    let decls = [
        Decl::Type(class(9, "Node", &[], None)),
        pair(&arena),
        Decl::Function(function(2, "make", &[], pair_ty, None)),
        Decl::Function(function(
            1,
            "discard",
            &[],
            Type::Unit,
            Some(block(&arena, &[discard])),
        )),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();
    let caller = module
        .function(&LoweringTarget::function(DeclId(1)))
        .unwrap();

    let extracted: Vec<u32> = caller
        .instrs()
        .filter_map(|i| match i {
            Instr::ExtractField { field, .. } => Some(*field),
            _ => None,
        })
        .collect();
    assert_eq!(extracted, vec![0, 2]);
    assert_eq!(release_count(caller), 2);
    assert_all_verify(&module);
}

// =============================================================================
// Top Level
// =============================================================================

#[test]
fn test_unreachable_top_level_code_is_not_emitted() {
    let arena = Bump::new();
    let fatal = expr(&arena, Expr::Call(arena.alloc(CallExpr {
        callee: DeclId(1),
        name: "fatal",
        receiver: None,
        args: &[],
        ty: Type::Never,
        span: span(),
    })));
    let var = VarDecl {
        id: DeclId(2),
        name: "answer",
        ty: Type::Int,
        span: span(),
    };
    let decls = [
        Decl::Function(function(1, "fatal", &[], Type::Never, None)),
        Decl::TopLevelCode(TopLevelCode {
            stmts: arena.alloc_slice_copy(&[Stmt::Expr(ExprStmt {
                expr: fatal,
                span: span(),
            })]),
            span: span(),
        }),
        Decl::Binding(BindingDecl {
            var,
            init: Some(expr(&arena, int(42))),
            span: span(),
        }),
    ];
    let module = construct_module(&unit(&arena, UnitKind::Main, &decls), 0).unwrap();

    assert_eq!(module.global_count(), 1);
    let top = module.top_level().unwrap();
    assert!(top.attrs().contains(FunctionAttrs::TOP_LEVEL));
    assert!(has_unreachable(top));
    assert_eq!(returns(top), 0);
    assert!(!top.instrs().any(|i| matches!(i, Instr::GlobalAddr { .. })));
    assert_all_verify(&module);
}

#[test]
fn test_library_bindings_only_register_globals() {
    let arena = Bump::new();
    let decls = [Decl::Binding(BindingDecl {
        var: VarDecl {
            id: DeclId(3),
            name: "limit",
            ty: Type::Int,
            span: span(),
        },
        init: Some(expr(&arena, int(10))),
        span: span(),
    })];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();

    assert_eq!(
        module.global(DeclId(3)).map(|g| g.name.as_str()),
        Some("limit")
    );
    assert_eq!(module.function_count(), 0);
    assert!(module.top_level().is_none());
}

#[test]
fn test_incremental_lowering_continues_from_start() {
    let arena = Bump::new();
    let var = VarDecl {
        id: DeclId(1),
        name: "x",
        ty: Type::Int,
        span: span(),
    };
    let decls = [
        Decl::Binding(BindingDecl {
            var,
            init: Some(expr(&arena, int(1))),
            span: span(),
        }),
        Decl::Function(function(2, "later", &[], Type::Unit, Some(block(&arena, &[])))),
    ];
    let options = LoweringOptions::default();

    let mut module = IrModule::new();
    let first = unit(&arena, UnitKind::Repl, &decls[..1]);
    lower_into_module(&mut module, &first, 0, &options).unwrap();
    assert_eq!(module.function_count(), 0);
    assert_eq!(module.global_count(), 1);

    let second = unit(&arena, UnitKind::Repl, &decls);
    lower_into_module(&mut module, &second, 1, &options).unwrap();
    assert_eq!(module.function_count(), 1);
    assert!(module.has_function(&LoweringTarget::function(DeclId(2))));

    // The second increment's top level only holds its own code.
    let top = module.top_level().unwrap();
    assert!(!top.instrs().any(|i| matches!(i, Instr::GlobalAddr { .. })));
}

#[test]
fn test_start_index_past_end_is_rejected() {
    let arena = Bump::new();
    let decls = [Decl::Function(function(1, "f", &[], Type::Unit, None))];
    let err = construct_module(&unit(&arena, UnitKind::Library, &decls), 2).unwrap_err();
    assert_eq!(
        err,
        LoweringError::StartIndexOutOfRange { start: 2, len: 1 }
    );
}

// =============================================================================
// Closures
// =============================================================================

#[test]
fn test_closures_are_lowered_as_functions() {
    let arena = Bump::new();
    let thunk: &FunctionType = arena.alloc(FunctionType {
        params: &[],
        result: Type::Int,
    });
    let seven = expr(&arena, int(7));
    let closure = expr(&arena, Expr::Closure(arena.alloc(ClosureExpr {
        id: DeclId(40),
        params: &[],
        result: Type::Int,
        body: block(&arena, &[ret(Some(seven))]),
        ty: Type::Function(thunk),
        span: span(),
    })));
    let decls = [Decl::Function(function(
        1,
        "make",
        &[],
        Type::Function(thunk),
        Some(block(&arena, &[ret(Some(closure))])),
    ))];
    let module = construct_module(&unit(&arena, UnitKind::Library, &decls), 0).unwrap();

    let lowered = module
        .function(&LoweringTarget::closure(DeclId(40)))
        .unwrap();
    assert!(lowered.attrs().contains(FunctionAttrs::CLOSURE));
    assert_eq!(returns(lowered), 1);

    let make = module
        .function(&LoweringTarget::function(DeclId(1)))
        .unwrap();
    assert!(make.instrs().any(|i| matches!(
        i,
        Instr::FunctionRef { target, .. } if *target == LoweringTarget::closure(DeclId(40))
    )));
    assert_all_verify(&module);
}

// =============================================================================
// External Definitions
// =============================================================================

#[test]
fn test_external_definitions_are_lowered_once_and_marked() {
    let arena = Bump::new();
    let helper = arena.alloc(Decl::Function(function(
        100,
        "helper",
        &[],
        Type::Unit,
        Some(block(&arena, &[])),
    )));
    let definitions: &[ExternalDefinition] = arena.alloc_slice_copy(&[ExternalDefinition {
        stage: CheckStage::TypeChecked,
        decl: helper,
    }]);
    let imports = arena.alloc_slice_copy(&[
        ImportedModule {
            name: "std",
            definitions,
        },
        ImportedModule {
            name: "std_again",
            definitions,
        },
    ]);
    let unit = unit(&arena, UnitKind::Library, &[]).with_imports(imports);

    let module = construct_module(&unit, 0).unwrap();
    let lowered = module
        .function(&LoweringTarget::function(DeclId(100)))
        .unwrap();
    assert!(lowered.attrs().contains(FunctionAttrs::EXTERNAL));
    assert_eq!(module.function_count(), 1);

    let skipped = construct_module_with_options(
        &unit,
        0,
        &LoweringOptions::new().with_external_definitions(false),
    )
    .unwrap();
    assert_eq!(skipped.function_count(), 0);
}

#[test]
fn test_unchecked_external_definition_is_an_error() {
    let arena = Bump::new();
    let pending = arena.alloc(Decl::Function(function(
        7,
        "pending",
        &[],
        Type::Unit,
        Some(block(&arena, &[])),
    )));
    let definitions = arena.alloc_slice_copy(&[ExternalDefinition {
        stage: CheckStage::NameBound,
        decl: pending,
    }]);
    let imports = arena.alloc_slice_copy(&[ImportedModule {
        name: "lazy",
        definitions,
    }]);
    let unit = unit(&arena, UnitKind::Library, &[]).with_imports(imports);

    let err = construct_module(&unit, 0).unwrap_err();
    assert_eq!(
        err,
        LoweringError::UncheckedExternal {
            name: "pending".into()
        }
    );
}

// =============================================================================
// Output
// =============================================================================

#[test]
fn test_module_display_lists_functions() {
    let arena = Bump::new();
    let decls = [Decl::Function(function(
        1,
        "entry",
        &[],
        Type::Unit,
        Some(block(&arena, &[])),
    ))];
    let module = construct_module(&unit(&arena, UnitKind::Main, &decls), 0).unwrap();
    let text = module.to_string();
    assert!(text.contains("entry"));
    assert!(text.contains("main"));
    assert!(text.contains("return"));
}
