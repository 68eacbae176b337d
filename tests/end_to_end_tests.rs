//! End-to-end tests: plan, compile and evaluate queries over the fixture catalog.


use std::str::FromStr;

use bigdecimal::BigDecimal;
use partiql::ast::builder::*;
use partiql::partiql_core::plan::{BinaryOp, JoinKind, PathStep, SetOp, SetQuantifier, SortOrder};
use partiql::partiql_planner::ProblemDetails;
use partiql::{Datum, EngineError, ErrorCode, PlanningResult, RelOp, RexOp, SourceLocation, StaticType, VarRef};
use test_data_gen::{elements, stmt, strict_engine};

#[test]
fn test_customer_lookup_plan_and_result() {
    let engine = strict_engine();
    let q = SelectBuilder::items(vec![all_of(id("c"))])
        .from(scan(id("Customer"), "c"))
        .filter(eq(path(id("c"), "primaryKey"), int(7)))
        .build();

    let result = engine.plan(&stmt(q.clone())).expect("planner failed");
    let plan = result.plan().expect("planning should succeed");
    let RexOp::Select { rel, .. } = &plan.plan.root.op else {
        panic!("expected a SELECT root");
    };
    let RelOp::Project { input, .. } = &rel.op else {
        panic!("expected project");
    };
    let RelOp::Filter { input, predicate } = &input.op else {
        panic!("expected filter");
    };
    assert!(matches!(predicate.op, RexOp::Binary { op: BinaryOp::Eq, .. }));
    assert!(matches!(
        &input.op,
        RelOp::Scan { rex } if matches!(rex.op, RexOp::Var(VarRef::Global(_)))
    ));

    let out = engine.execute(&stmt(q)).unwrap();
    assert_eq!(
        out,
        Datum::bag([Datum::tuple([
            ("primaryKey", Datum::Int(7)),
            ("name", Datum::string("Customer7")),
            ("city", Datum::string("Austin")),
        ])])
    );
}

#[test]
fn test_undefined_variable_is_a_planning_error() {
    let engine = strict_engine();
    let q = SelectBuilder::items(vec![all_of(id("undefined").at(1, 8))])
        .from(scan(id("Customer"), "c"))
        .build();
    let result = engine.plan(&stmt(q.clone())).unwrap();
    let PlanningResult::Error { problems } = &result else {
        panic!("expected planning to fail");
    };
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].loc, SourceLocation::new(1, 8));
    assert_eq!(
        problems[0].details,
        ProblemDetails::UndefinedVariable {
            name: "undefined".into(),
            case_sensitive: false,
        }
    );
    assert!(matches!(engine.execute(&stmt(q)), Err(EngineError::Problems(_))));
}

#[test]
fn test_useless_ands_are_optimized_away() {
    let engine = strict_engine();
    let both = engine
        .plan(&stmt(and(boolean(true), boolean(true))))
        .unwrap()
        .into_plan()
        .unwrap();
    assert_eq!(both.plan.root.to_string(), "(lit true)");

    let one = engine
        .plan(&stmt(and(boolean(true), lt(param(1), int(3)))))
        .unwrap()
        .into_plan()
        .unwrap();
    assert!(matches!(one.plan.root.op, RexOp::Binary { op: BinaryOp::Lt, .. }));
}

#[test]
fn test_int_equals_decimal_in_both_modes() {
    let one_point_oh = BigDecimal::from_str("1.0").unwrap();
    let q = eq(int(1), lit(one_point_oh));
    for engine in [test_data_gen::strict_engine(), test_data_gen::permissive_engine()] {
        let plan = engine.plan(&stmt(q.clone())).unwrap().into_plan().unwrap();
        assert_eq!(plan.plan.root.ty, StaticType::BOOL);
        assert_eq!(engine.execute(&stmt(q.clone())).unwrap(), Datum::Bool(true));
    }
}

#[test]
fn test_missing_equals_missing_is_null() {
    for engine in [test_data_gen::strict_engine(), test_data_gen::permissive_engine()] {
        assert_eq!(
            engine.execute(&stmt(eq(missing(), missing()))).unwrap(),
            Datum::Null
        );
    }
}

#[test]
fn test_group_by_with_missing_keys() {
    let engine = strict_engine();
    let q = SelectBuilder::items(vec![
        item_expr(path(id("c"), "city")),
        item(count_star(), "n"),
    ])
    .from(scan(id("Customer"), "c"))
    .group_by(vec![(path(id("c"), "city"), None)])
    .build();

    let row = |city: Datum, n: i64| Datum::tuple([("city", city), ("n", Datum::Int(n))]);
    assert_eq!(
        engine.execute(&stmt(q)).unwrap(),
        Datum::bag([
            row(Datum::string("Seattle"), 6),
            row(Datum::string("Austin"), 5),
            row(Datum::string("Boston"), 5),
            row(Datum::Null, 4),
        ])
    );
}

#[test]
fn test_implicit_aggregation_over_all_rows() {
    let engine = strict_engine();
    let q = SelectBuilder::items(vec![
        item(count_star(), "n"),
        item(agg("sum", vec![path(id("o"), "amount")]), "total"),
        item(agg_distinct("count", vec![path(id("o"), "customer")]), "buyers"),
    ])
    .from(scan(id("orders"), "o"))
    .build();

    // amount cycles through 10..=70: seven full cycles, then 10 for the last row.
    let total = 7 * (10 + 20 + 30 + 40 + 50 + 60 + 70) + 10;
    assert_eq!(
        engine.execute(&stmt(q)).unwrap(),
        Datum::bag([Datum::tuple([
            ("n", Datum::Int(50)),
            ("total", Datum::Int(total)),
            ("buyers", Datum::Int(20)),
        ])])
    );
}

#[test]
fn test_order_by_limit_offset_yields_a_list() {
    let engine = strict_engine();
    let q = SelectBuilder::value(path(id("c"), "primaryKey"))
        .from(scan(id("Customer"), "c"))
        .order_by(path(id("c"), "primaryKey"), SortOrder::Desc)
        .offset(int(1))
        .limit(int(3))
        .build();
    assert_eq!(
        engine.execute(&stmt(q)).unwrap(),
        Datum::list([Datum::Int(18), Datum::Int(17), Datum::Int(16)])
    );
}

#[test]
fn test_inner_join_with_filter() {
    let engine = strict_engine();
    let q = SelectBuilder::items(vec![
        item_expr(path(id("c"), "name")),
        item_expr(path(id("o"), "amount")),
    ])
    .from(join(
        JoinKind::Inner,
        scan(id("Customer"), "c"),
        scan(id("orders"), "o"),
        eq(path(id("c"), "primaryKey"), path(id("o"), "customer")),
    ))
    .filter(eq(path(id("c"), "primaryKey"), int(3)))
    .build();

    let row = |amount: i64| {
        Datum::tuple([
            ("name", Datum::string("Customer3")),
            ("amount", Datum::Int(amount)),
        ])
    };
    assert_eq!(
        engine.execute(&stmt(q)).unwrap(),
        Datum::bag([row(40), row(30), row(20)])
    );
}

#[test]
fn test_left_join_pads_with_null() {
    let engine = strict_engine();
    let q = SelectBuilder::value(id("o"))
        .from(join(
            JoinKind::Left,
            scan(id("Customer"), "c"),
            scan(id("orders"), "o"),
            boolean(false),
        ))
        .build();
    let rows = elements(engine.execute(&stmt(q)).unwrap());
    assert_eq!(rows.len(), 20);
    assert!(rows.iter().all(|d| *d == Datum::Null));
}

#[test]
fn test_correlated_scalar_subquery() {
    let engine = strict_engine();
    let inner = SelectBuilder::items(vec![item(agg("max", vec![path(id("o"), "amount")]), "m")])
        .from(scan(id("orders"), "o"))
        .filter(eq(path(id("o"), "customer"), path(id("c"), "primaryKey")))
        .build();
    let q = SelectBuilder::value(add(inner, int(0)))
        .from(scan(id("Customer"), "c"))
        .filter(eq(path(id("c"), "primaryKey"), int(0)))
        .build();
    // Orders 0, 20 and 40 belong to customer 0.
    assert_eq!(
        engine.execute(&stmt(q)).unwrap(),
        Datum::bag([Datum::Int(70)])
    );
}

#[test]
fn test_set_operations() {
    let engine = strict_engine();
    let lhs = || bag(vec![int(1), int(2), int(2)]);
    let rhs = || bag(vec![int(2), int(3)]);
    let run = |op, quantifier| {
        engine
            .execute(&stmt(set_op(op, quantifier, lhs(), rhs())))
            .unwrap()
    };
    let ints = |v: &[i64]| Datum::bag(v.iter().copied().map(Datum::Int));

    assert_eq!(run(SetOp::Union, SetQuantifier::Distinct), ints(&[1, 2, 3]));
    assert_eq!(run(SetOp::Union, SetQuantifier::All), ints(&[1, 2, 2, 2, 3]));
    assert_eq!(run(SetOp::Intersect, SetQuantifier::All), ints(&[2]));
    assert_eq!(run(SetOp::Except, SetQuantifier::All), ints(&[1, 2]));
}

#[test]
fn test_like_and_coalesce() {
    let engine = strict_engine();
    let names = SelectBuilder::value(path(id("c"), "name"))
        .from(scan(id("Customer"), "c"))
        .filter(like(path(id("c"), "name"), string("Customer1_")))
        .build();
    assert_eq!(elements(engine.execute(&stmt(names)).unwrap()).len(), 10);

    let cities = SelectBuilder::value(coalesce(vec![path(id("c"), "city"), string("unknown")]))
        .from(scan(id("Customer"), "c"))
        .build();
    let unknown = elements(engine.execute(&stmt(cities)).unwrap())
        .into_iter()
        .filter(|d| *d == Datum::string("unknown"))
        .count();
    assert_eq!(unknown, 4);
}

#[test]
fn test_parameters_and_unpivot() {
    let engine = strict_engine();
    let by_key = SelectBuilder::value(path(id("c"), "name"))
        .from(scan(id("Customer"), "c"))
        .filter(eq(path(id("c"), "primaryKey"), param(1)))
        .build();
    assert_eq!(
        engine.execute_with(&stmt(by_key), vec![Datum::Int(5)]).unwrap(),
        Datum::bag([Datum::string("Customer5")])
    );

    let keys = SelectBuilder::value(id("k"))
        .from(unpivot(tuple(vec![("a", int(1)), ("b", int(2))]), "v", "k"))
        .build();
    assert_eq!(
        engine.execute(&stmt(keys)).unwrap(),
        Datum::bag([Datum::string("a"), Datum::string("b")])
    );
}

#[test]
fn test_group_as_collects_rows() {
    let engine = strict_engine();
    let q = SelectBuilder::items(vec![
        item(id("city"), "city"),
        item(call("size", vec![id("g")]), "n"),
    ])
    .from(scan(id("Customer"), "c"))
    .filter(eq(path(id("c"), "city"), string("Boston")))
    .group_by(vec![(path(id("c"), "city"), Some("city"))])
    .group_as("g")
    .build();
    assert_eq!(
        engine.execute(&stmt(q)).unwrap(),
        Datum::bag([Datum::tuple([
            ("city", Datum::string("Boston")),
            ("n", Datum::Int(5)),
        ])])
    );
}

#[test]
fn test_strict_type_error_carries_location() {
    let engine = strict_engine();
    let q = SelectBuilder::value(add(path(id("m"), "v"), int(1)).at(2, 5))
        .from(scan(id("mixed"), "m"))
        .build();
    let Err(EngineError::Eval(err)) = engine.execute(&stmt(q)) else {
        panic!("expected an evaluation error");
    };
    assert_eq!(err.code(), ErrorCode::TypeMismatch);
    assert_eq!(err.properties()["line"], "2");
}

#[test]
fn test_path_step_is_case_insensitive_by_default() {
    let engine = strict_engine();
    let q = SelectBuilder::value(path(id("c"), "PRIMARYKEY"))
        .from(scan(id("Customer"), "c"))
        .filter(eq(path(id("c"), "primaryKey"), int(2)))
        .build();
    let plan = engine.plan(&stmt(q.clone())).unwrap().into_plan().unwrap();
    let RexOp::Select { rel, .. } = &plan.plan.root.op else {
        panic!("expected select");
    };
    let RelOp::Project { projections, .. } = &rel.op else {
        panic!("expected project");
    };
    assert!(matches!(
        &projections[0].op,
        RexOp::Path { step: PathStep::Symbol { case_sensitive: false, .. }, .. }
    ));
    assert_eq!(engine.execute(&stmt(q)).unwrap(), Datum::bag([Datum::Int(2)]));
}

fn customer_keys() -> partiql::ast::Expr {
    SelectBuilder::items(vec![item(path(id("c"), "primaryKey"), "k")])
        .from(scan(id("Customer"), "c"))
        .build()
}

#[test]
fn test_in_over_select_list_subquery() {
    let engine = strict_engine();
    let found = stmt(in_collection(int(7), customer_keys()));
    assert_eq!(engine.execute(&found).unwrap(), Datum::Bool(true));
    let absent = stmt(in_collection(int(25), customer_keys()));
    assert_eq!(engine.execute(&absent).unwrap(), Datum::Bool(false));
    let negated = stmt(not(in_collection(int(7), customer_keys())));
    assert_eq!(engine.execute(&negated).unwrap(), Datum::Bool(false));
}

#[test]
fn test_in_over_select_value_subquery() {
    let engine = strict_engine();
    let keys = SelectBuilder::value(path(id("c"), "primaryKey"))
        .from(scan(id("Customer"), "c"))
        .build();
    assert_eq!(
        engine.execute(&stmt(in_collection(int(7), keys))).unwrap(),
        Datum::Bool(true)
    );
}

#[test]
fn test_in_subquery_as_filter() {
    let engine = strict_engine();
    // Orders with amount 70 are i = 6, 13, ..., 48; their customers are i % 20.
    let buyers = SelectBuilder::items(vec![item(path(id("o"), "customer"), "who")])
        .from(scan(id("orders"), "o"))
        .filter(eq(path(id("o"), "amount"), int(70)))
        .build();
    let q = SelectBuilder::value(path(id("c"), "primaryKey"))
        .from(scan(id("Customer"), "c"))
        .filter(in_collection(path(id("c"), "primaryKey"), buyers))
        .build();
    let expected = Datum::bag([0, 1, 6, 7, 8, 13, 14].map(Datum::Int));
    assert_eq!(engine.execute(&stmt(q)).unwrap(), expected);
}

#[test]
fn test_distinct_keeps_large_ints_apart_from_nearby_floats() {
    let engine = strict_engine();
    let big = 1i64 << 53;
    let values = bag(vec![int(big + 1), lit(Datum::Float(big as f64)), int(big + 1)]);
    let q = SelectBuilder::value(id("x"))
        .distinct()
        .from(scan(values, "x"))
        .build();
    let out = elements(engine.execute(&stmt(q)).unwrap());
    assert_eq!(out.len(), 2);
    assert!(out.contains(&Datum::Int(big + 1)));
    assert!(out.contains(&Datum::Float(big as f64)));
}
