//! Engine: plan, compile and evaluate against one catalog.

use thiserror::Error;

use partiql_core::config::EngineConfig;
use partiql_core::datum::Datum;
use partiql_core::error::EvalError;
use partiql_eval::{CompileError, CompiledExpression, Compiler};
use partiql_operators::{EvaluationSession, FunctionRegistry};
use partiql_planner::ast::Statement;
use partiql_planner::{MemoryCatalog, PhysicalPlan, Planner, PlannerError, PlanningResult, Problem};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("planner: {0}")]
    Planner(#[from] PlannerError),
    #[error("query has {} problem(s); first: {}", .0.len(), first_problem(.0))]
    Problems(Vec<Problem>),
    #[error("compile: {0}")]
    Compile(#[from] CompileError),
    #[error("evaluation: {0}")]
    Eval(#[from] EvalError),
}

fn first_problem(problems: &[Problem]) -> String {
    problems
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine owns the configuration, the function registry and the catalog.
///
/// The registry is built once and only read afterwards; plans and compiled
/// expressions produced by one engine may be evaluated any number of times.
#[derive(Debug)]
pub struct Engine {
    cfg: EngineConfig,
    registry: FunctionRegistry,
    catalog: MemoryCatalog,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self::with_registry(cfg, FunctionRegistry::builtins())
    }

    /// Use `registry` instead of the builtin functions.
    pub fn with_registry(cfg: EngineConfig, registry: FunctionRegistry) -> Self {
        Self {
            cfg,
            registry,
            catalog: MemoryCatalog::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut MemoryCatalog {
        &mut self.catalog
    }

    pub fn plan(&self, stmt: &Statement) -> Result<PlanningResult> {
        Ok(Planner::new(&self.catalog, &self.registry, &self.cfg).plan(stmt)?)
    }

    pub fn compile(&self, plan: &PhysicalPlan) -> Result<CompiledExpression> {
        Ok(Compiler::new(&self.registry).compile(plan)?)
    }

    /// Plan and compile, turning planning problems into an error.
    pub fn prepare(&self, stmt: &Statement) -> Result<CompiledExpression> {
        match self.plan(stmt)? {
            PlanningResult::Success { plan, warnings } => {
                for w in &warnings {
                    tracing::debug!(problem = %w, "planning warning");
                }
                self.compile(&plan)
            }
            PlanningResult::Error { problems } => Err(EngineError::Problems(problems)),
        }
    }

    /// A session holding every catalog value, in the configured typing mode.
    pub fn session(&self) -> EvaluationSession {
        EvaluationSession::new()
            .with_globals(self.catalog.bindings())
            .typing_mode(self.cfg.typing_mode)
    }

    /// Plan, compile and evaluate `stmt`, materializing the result.
    pub fn execute(&self, stmt: &Statement) -> Result<Datum> {
        self.execute_with(stmt, vec![])
    }

    /// Like [`Engine::execute`], with positional parameters `?1`, `?2`, ...
    pub fn execute_with(&self, stmt: &Statement, parameters: Vec<Datum>) -> Result<Datum> {
        let compiled = self.prepare(stmt)?;
        let session = self.session().with_parameters(parameters);
        let value = compiled.eval(session)?;
        Ok(value.materialize()?)
    }
}

#[cfg(test)]
mod tests {
    use partiql_core::config::TypingMode;
    use partiql_planner::ast::builder::*;

    use super::*;

    #[test]
    fn scalar_expression_roundtrip() {
        let engine = Engine::default();
        let out = engine.execute(&query(add(int(1), int(2)))).unwrap();
        assert_eq!(out, Datum::Int(3));
    }

    #[test]
    fn parameters_are_bound_per_execution() {
        let engine = Engine::default();
        let stmt = query(mul(param(1), int(10)));
        assert_eq!(
            engine.execute_with(&stmt, vec![Datum::Int(4)]).unwrap(),
            Datum::Int(40)
        );
        assert!(matches!(
            engine.execute(&stmt),
            Err(EngineError::Eval(EvalError::ParameterOutOfRange { .. }))
        ));
    }

    #[test]
    fn planning_problems_surface_as_errors() {
        let engine = Engine::default();
        let err = engine.execute(&query(id("nowhere"))).unwrap_err();
        assert!(matches!(err, EngineError::Problems(ref p) if p.len() == 1));
        assert!(err.to_string().contains("1 problem"));
    }

    #[test]
    fn session_follows_config() {
        let engine = Engine::new(EngineConfig::default().with_typing_mode(TypingMode::Strict));
        assert_eq!(engine.session().mode(), TypingMode::Strict);
    }
}
