//! Planner entry point: syntax tree → optimized physical plan.

use serde::Serialize;

use partiql_core::config::{EngineConfig, PlanningMode};
use partiql_core::plan::Plan;
use partiql_operators::FunctionRegistry;

use crate::ast::Statement;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::logical::Translator;
use crate::physical::PhysicalPlan;
use crate::problem::Problem;
use crate::rules::Pipeline;

/// Outcome of planning one statement.
///
/// User errors are reported here, never through `PlannerError`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlanningResult {
    Success {
        plan: PhysicalPlan,
        warnings: Vec<Problem>,
    },
    Error {
        problems: Vec<Problem>,
    },
}

impl PlanningResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PlanningResult::Success { .. })
    }

    /// Warnings of a success, or the problems of a failure.
    pub fn problems(&self) -> &[Problem] {
        match self {
            PlanningResult::Success { warnings, .. } => warnings,
            PlanningResult::Error { problems } => problems,
        }
    }

    pub fn plan(&self) -> Option<&PhysicalPlan> {
        match self {
            PlanningResult::Success { plan, .. } => Some(plan),
            PlanningResult::Error { .. } => None,
        }
    }

    pub fn into_plan(self) -> Option<PhysicalPlan> {
        match self {
            PlanningResult::Success { plan, .. } => Some(plan),
            PlanningResult::Error { .. } => None,
        }
    }
}

/// Plans statements against one catalog and function registry.
///
/// A planner holds no per-statement state and can plan any number of
/// statements, from any number of threads.
pub struct Planner<'a> {
    catalog: &'a dyn Catalog,
    registry: &'a FunctionRegistry,
    mode: PlanningMode,
    max_problems: usize,
    pipeline: Pipeline,
}

impl<'a> Planner<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        registry: &'a FunctionRegistry,
        config: &EngineConfig,
    ) -> Self {
        Self {
            catalog,
            registry,
            mode: config.planning_mode,
            max_problems: config.max_problems,
            pipeline: Pipeline::default(),
        }
    }

    /// Replace the optimizer passes.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Plan `stmt`. `Err` only for a malformed tree or a broken planner
    /// invariant; problems in the query come back inside `PlanningResult`.
    pub fn plan(&self, stmt: &Statement) -> Result<PlanningResult> {
        let span = tracing::debug_span!("plan", mode = ?self.mode);
        let _guard = span.enter();

        let mut translator =
            Translator::new(self.catalog, self.registry, self.mode, self.max_problems);
        let root = translator.translate(stmt)?;
        let problems = translator.finish();

        if problems.iter().any(Problem::is_error) {
            tracing::debug!(problems = problems.len(), "planning failed");
            return Ok(PlanningResult::Error { problems });
        }

        let plan = PhysicalPlan::new(self.pipeline.run(Plan::new(root)))?;
        tracing::debug!(
            warnings = problems.len(),
            fingerprint = %plan.fingerprint.short(),
            "planned"
        );
        Ok(PlanningResult::Success {
            plan,
            warnings: problems,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builder::*;
    use crate::ast::Expr;
    use crate::catalog::MemoryCatalog;
    use crate::problem::{ProblemDetails, Severity};
    use partiql_core::datum::Datum;
    use partiql_core::location::SourceLocation;
    use partiql_core::plan::{BinaryOp, PathStep, Rel, RelOp, Rex, RexOp, VarRef};
    use partiql_core::types::StaticType;

    fn catalog() -> MemoryCatalog {
        let mut c = MemoryCatalog::new();
        c.declare("Customer", StaticType::bag(StaticType::open_struct()));
        c
    }

    fn plan_with(catalog: &MemoryCatalog, config: &EngineConfig, e: Expr) -> PlanningResult {
        let registry = FunctionRegistry::builtins();
        Planner::new(catalog, &registry, config)
            .plan(&query(e))
            .unwrap()
    }

    fn plan(e: Expr) -> PlanningResult {
        plan_with(&catalog(), &EngineConfig::default(), e)
    }

    fn permissive() -> EngineConfig {
        EngineConfig::default().with_planning_mode(PlanningMode::Permissive)
    }

    fn success(result: PlanningResult) -> Rex {
        match result {
            PlanningResult::Success { plan, .. } => plan.plan.root,
            PlanningResult::Error { problems } => panic!("planning failed: {problems:?}"),
        }
    }

    fn details(result: &PlanningResult) -> Vec<ProblemDetails> {
        result.problems().iter().map(|p| p.details.clone()).collect()
    }

    /// The relation under a SELECT node.
    fn rel_of(rex: &Rex) -> &Rel {
        match &rex.op {
            RexOp::Select { rel, .. } => rel,
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn customer_filter_plan() {
        let q = SelectBuilder::items(vec![all_of(id("c"))])
            .from(scan(id("Customer"), "c"))
            .filter(eq(path(id("c"), "primaryKey"), int(42)))
            .build();
        let result = plan(q);
        assert!(result.is_success());
        assert!(result.problems().is_empty());
        let root = success(result);

        let RelOp::Project { input, .. } = &rel_of(&root).op else {
            panic!("expected project");
        };
        let RelOp::Filter { input, predicate } = &input.op else {
            panic!("expected filter");
        };
        let RexOp::Binary { op, lhs, rhs } = &predicate.op else {
            panic!("expected comparison");
        };
        assert_eq!(*op, BinaryOp::Eq);
        assert!(matches!(
            &lhs.op,
            RexOp::Path { root, step: PathStep::Symbol { name, case_sensitive: false } }
                if name == "primaryKey"
                    && root.op == RexOp::Var(VarRef::Local { depth: 0, offset: 0 })
        ));
        assert_eq!(rhs.as_lit(), Some(&Datum::Int(42)));
        let RelOp::Scan { rex } = &input.op else {
            panic!("expected scan");
        };
        assert!(matches!(rex.op, RexOp::Var(VarRef::Global(_))));
    }

    #[test]
    fn undefined_variable_is_reported_at_its_location() {
        let q = SelectBuilder::items(vec![all_of(id("undefined").at(1, 8))])
            .from(scan(id("Customer"), "c"))
            .build();
        let result = plan(q);
        assert_eq!(
            result,
            PlanningResult::Error {
                problems: vec![Problem::error(
                    SourceLocation::new(1, 8),
                    ProblemDetails::UndefinedVariable {
                        name: "undefined".into(),
                        case_sensitive: false,
                    },
                )],
            }
        );
    }

    #[test]
    fn permissive_planning_lowers_undefined_to_missing() {
        let q = SelectBuilder::value(id("nope")).from(scan(id("Customer"), "c")).build();
        let result = plan_with(&catalog(), &permissive(), q);
        assert!(result.is_success());
        assert_eq!(result.problems()[0].severity, Severity::Warning);
        assert!(success(result).to_string().contains("(missing)"));
    }

    #[test]
    fn case_insensitive_ambiguity_is_an_error() {
        let mut c = catalog();
        c.declare("CUSTOMER", StaticType::Any);
        let ambiguous = SelectBuilder::star().from(scan(id("customer"), "c")).build();
        let result = plan_with(&c, &EngineConfig::default(), ambiguous);
        assert!(matches!(
            details(&result).as_slice(),
            [ProblemDetails::AmbiguousBinding { name, candidates }]
                if name == "customer" && candidates.len() == 2
        ));

        let exact = SelectBuilder::star().from(scan(id_cs("Customer"), "c")).build();
        assert!(plan_with(&c, &EngineConfig::default(), exact).is_success());
    }

    #[test]
    fn locals_shadow_globals_outside_from() {
        let mut c = catalog();
        c.declare("x", StaticType::INT4);
        let q = SelectBuilder::value(id("x"))
            .from(scan(bag(vec![string("a")]), "x"))
            .build();
        let root = success(plan_with(&c, &EngineConfig::default(), q));
        let RexOp::Select { rel, .. } = &root.op else {
            panic!("expected select");
        };
        let RelOp::Project { projections, .. } = &rel.op else {
            panic!("expected project");
        };
        assert_eq!(projections[0].op, RexOp::Var(VarRef::Local { depth: 0, offset: 0 }));
        assert_eq!(projections[0].ty, StaticType::STRING);
    }

    #[test]
    fn from_sources_prefer_globals_unless_qualified() {
        let mut c = catalog();
        let global = c.declare("items", StaticType::bag(StaticType::INT4));
        let source = |rhs: Expr| {
            SelectBuilder::value(id("i"))
                .from(cross(scan(list(vec![list(vec![])]), "items"), scan(rhs, "i")))
                .build()
        };

        let root = success(plan_with(&c, &EngineConfig::default(), source(id("items"))));
        let RelOp::Project { input, .. } = &rel_of(&root).op else {
            panic!("expected project");
        };
        let RelOp::Join { rhs, .. } = &input.op else {
            panic!("expected join");
        };
        let RelOp::Scan { rex } = &rhs.op else {
            panic!("expected scan");
        };
        assert_eq!(rex.op, RexOp::Var(VarRef::Global(global)));

        let root = success(plan_with(&c, &EngineConfig::default(), source(local("items"))));
        assert!(root.to_string().contains("(join inner (lit true) (scan (list (list))) (scan (var 0 0)))"));
    }

    #[test]
    fn group_keys_and_aggregates_become_columns() {
        let q = SelectBuilder::items(vec![
            item_expr(path(id("r"), "k")),
            item(count_star(), "n"),
            item(agg("sum", vec![path(id("r"), "v")]), "total"),
        ])
        .from(scan(id("Customer"), "r"))
        .group_by(vec![(path(id("r"), "k"), None)])
        .build();
        let root = success(plan(q));
        let RelOp::Project { input, projections } = &rel_of(&root).op else {
            panic!("expected project");
        };
        let RelOp::Aggregate { groups, calls, .. } = &input.op else {
            panic!("expected aggregate");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(calls.len(), 2);
        assert_eq!(input.ty.schema[0].name, "k");
        assert_eq!(
            projections[0].to_string(),
            "(struct ((lit 'k') (var 0 0)) ((lit 'n') (var 0 1)) ((lit 'total') (var 0 2)))"
        );
    }

    #[test]
    fn repeated_aggregates_share_a_column() {
        let q = SelectBuilder::value(add(count_star(), count_star()))
            .from(scan(id("Customer"), "r"))
            .build();
        let root = success(plan(q));
        let RelOp::Project { input, .. } = &rel_of(&root).op else {
            panic!("expected project");
        };
        let RelOp::Aggregate { groups, calls, .. } = &input.op else {
            panic!("expected implicit aggregate");
        };
        assert!(groups.is_empty());
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn ungrouped_reference_is_an_error() {
        let q = SelectBuilder::value(path(id("r"), "v"))
            .from(scan(id("Customer"), "r"))
            .group_by(vec![(path(id("r"), "k"), Some("k"))])
            .build();
        assert_eq!(details(&plan(q)), vec![ProblemDetails::NotGrouped]);
    }

    #[test]
    fn aggregate_in_where_is_misplaced() {
        let q = SelectBuilder::value(id("r"))
            .from(scan(id("Customer"), "r"))
            .filter(gt(count_star(), int(1)))
            .build();
        assert_eq!(
            details(&plan(q)),
            vec![ProblemDetails::MisplacedAggregate {
                function: "count_star".into()
            }]
        );
    }

    #[test]
    fn closed_struct_key_warns() {
        let mut c = MemoryCatalog::new();
        c.declare(
            "t",
            StaticType::bag(StaticType::closed_struct(vec![("a".into(), StaticType::INT4)])),
        );
        let q = SelectBuilder::value(path(id("r"), "b"))
            .from(scan(id("t"), "r"))
            .build();
        let result = plan_with(&c, &EngineConfig::default(), q);
        assert!(result.is_success());
        assert_eq!(
            details(&result),
            vec![ProblemDetails::PathKeyNeverSucceeds { key: "b".into() }]
        );
    }

    #[test]
    fn incompatible_operands_depend_on_mode() {
        let q = || add(int(1), string("a"));
        let strict = plan(q());
        assert!(!strict.is_success());
        assert!(matches!(
            details(&strict).as_slice(),
            [ProblemDetails::IncompatibleTypes { operator, .. }] if operator == "+"
        ));
        let relaxed = plan_with(&catalog(), &permissive(), q());
        assert!(relaxed.is_success());
        assert_eq!(relaxed.problems().len(), 1);
    }

    #[test]
    fn unknown_function_is_reported() {
        let result = plan(call("no_such_fn", vec![int(1)]));
        assert!(matches!(
            details(&result).as_slice(),
            [ProblemDetails::NoMatchingFunction { function, .. }] if function == "no_such_fn"
        ));
    }

    #[test]
    fn sql_subquery_operand_is_coerced() {
        let inner = SelectBuilder::items(vec![item(count_star(), "n")])
            .from(scan(id("Customer"), "c"))
            .build();
        let root = success(plan(add(inner, int(1))));
        let RexOp::Binary { lhs, .. } = &root.op else {
            panic!("expected addition");
        };
        assert!(matches!(lhs.op, RexOp::Subquery { .. }));
    }

    #[test]
    fn where_true_is_optimized_away() {
        let q = SelectBuilder::value(id("c"))
            .from(scan(id("Customer"), "c"))
            .filter(and(boolean(true), boolean(true)))
            .build();
        let root = success(plan(q));
        assert_eq!(
            root.to_string(),
            "(select (var 0 0) (project (var 0 0) (scan (global 0))))"
        );
    }

    #[test]
    fn order_by_makes_a_list() {
        let q = SelectBuilder::value(id("c"))
            .from(scan(id("Customer"), "c"))
            .order_by(path(id("c"), "name"), partiql_core::plan::SortOrder::Desc)
            .limit(int(10))
            .build();
        let root = success(plan(q));
        assert!(matches!(root.ty.singles().unwrap()[0], partiql_core::types::SingleType::List(_)));
    }

    #[test]
    fn problem_cap_truncates() {
        let config = EngineConfig {
            max_problems: 2,
            ..EngineConfig::default()
        };
        let q = list(vec![id("a"), id("b"), id("c")]);
        let result = plan_with(&catalog(), &config, q);
        let found = details(&result);
        assert_eq!(found.len(), 3);
        assert_eq!(found[2], ProblemDetails::TooManyProblems { limit: 2 });
    }

    #[test]
    fn planning_is_deterministic() {
        let q = || {
            SelectBuilder::items(vec![all_of(id("c"))])
                .from(scan(id("Customer"), "c"))
                .filter(eq(path(id("c"), "primaryKey"), int(42)))
                .build()
        };
        let a = plan(q()).into_plan().unwrap();
        let b = plan(q()).into_plan().unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}
