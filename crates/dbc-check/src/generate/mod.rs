//! Contract-driven input generation.
//!
//! The [`Driver`] probes a guarded operation with synthesized arguments and
//! reports every input on which a contract fails. Candidates are planned in a
//! fixed order:
//!
//! 1. regressions (saved counterexamples) replayed verbatim;
//! 2. the product of per-parameter boundary values;
//! 3. random members of each parameter's domain, from a `ChaCha8Rng` seeded
//!    with [`DriverConfig::seed`].
//!
//! Every probe runs with all contract kinds forced on for the current thread,
//! whatever the process-wide enablement says. An input that fails the probed
//! operation's own preconditions is skipped; any other violation is a
//! counterexample. The same seed, budget, and regressions produce the same
//! plan and the same report, in parallel mode too.
//!
//! Domains inferred from parameter types are narrowed with integer literals
//! compared against a parameter in precondition texts (`x >= 0` narrows
//! `x` to non-negative values). Explicit domains are used as given.

pub mod bounds;
pub mod error;
pub mod report;
pub mod sample;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use dbc_core::{Args, Domain, Value};

use crate::contracts::ContractKind;
use crate::enablement::Enablement;
use crate::engine::error::CallError;
use crate::engine::trace::{CallPhase, TracedCall};
use crate::engine::GuardedOperation;

use self::bounds::LiteralBound;
pub use self::error::GenerationError;
pub use self::report::{
    Candidate, CandidateSource, Counterexample, FailureReason, GenerationReport, HaltReason,
};

/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Knobs for a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub seed: u64,
    /// Maximum number of probes, regressions included.
    pub probe_budget: usize,
    /// Stop after this many counterexamples plus anomalies. Zero means no cap.
    pub max_counterexamples: usize,
    /// Random samples drawn after the boundary phase, budget permitting.
    pub random_samples: usize,
    /// Saved argument tuples probed before anything else.
    pub regressions: Vec<Vec<Value>>,
    /// Probe on the rayon pool. Results are folded in plan order.
    pub parallel: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            seed: DEFAULT_SEED,
            probe_budget: 512,
            max_counterexamples: 8,
            random_samples: 256,
            regressions: Vec::new(),
            parallel: false,
        }
    }
}

/// Classified outcome of one probe.
#[derive(Debug)]
enum Probe {
    Passed,
    Skipped,
    DeclaredError,
    Unimplemented,
    Counterexample(Counterexample),
    Anomaly(Counterexample),
}

/// Probes one guarded operation for counterexamples.
#[derive(Debug)]
pub struct Driver<'a> {
    operation: &'a GuardedOperation,
    domains: Vec<Domain>,
    explicit: Vec<bool>,
    config: DriverConfig,
}

impl<'a> Driver<'a> {
    /// Driver with every domain inferred from the parameter types.
    pub fn new(operation: &'a GuardedOperation, config: DriverConfig) -> Self {
        let domains: Vec<Domain> = operation
            .operation()
            .params
            .iter()
            .map(|(_, ty)| Domain::for_type(ty))
            .collect();
        let explicit = vec![false; domains.len()];
        Driver {
            operation,
            domains,
            explicit,
            config,
        }
    }

    /// Driver with one explicit domain per parameter, in declaration order.
    pub fn with_domains(
        operation: &'a GuardedOperation,
        domains: Vec<Domain>,
        config: DriverConfig,
    ) -> Result<Self, GenerationError> {
        let id = operation.operation();
        if domains.len() != id.arity() {
            return Err(GenerationError::DomainArity {
                operation: id.name.clone(),
                expected: id.arity(),
                got: domains.len(),
            });
        }
        for d in &domains {
            d.validate()?;
        }
        let explicit = vec![true; domains.len()];
        Ok(Driver {
            operation,
            domains,
            explicit,
            config,
        })
    }

    /// Overrides the domain of the parameter called `name`.
    pub fn domain(mut self, name: &str, domain: Domain) -> Result<Self, GenerationError> {
        let id = self.operation.operation();
        let pos = id
            .position(name)
            .ok_or_else(|| GenerationError::UnknownParameter {
                operation: id.name.clone(),
                name: name.to_string(),
            })?;
        domain.validate()?;
        self.domains[pos] = domain;
        self.explicit[pos] = true;
        Ok(self)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    // Literal bounds per parameter: (from preconditions, from all texts).
    fn literal_bounds(&self) -> (Vec<LiteralBound>, Vec<LiteralBound>) {
        let record = self.operation.record();
        let params: Vec<&str> = record.operation().param_names().collect();
        let from_conditions: Vec<LiteralBound> = record
            .preconditions()
            .iter()
            .flat_map(|c| bounds::scan(c.text(), &params))
            .collect();
        let mut all = from_conditions.clone();
        if let Some(text) = &record.descriptions().pre {
            all.extend(bounds::scan(text, &params));
        }
        (from_conditions, all)
    }

    /// Domains the driver actually samples from.
    pub fn effective_domains(&self) -> Vec<Domain> {
        let (narrowing, _) = self.literal_bounds();
        self.effective(&narrowing)
    }

    fn effective(&self, narrowing: &[LiteralBound]) -> Vec<Domain> {
        self.operation
            .operation()
            .param_names()
            .zip(&self.domains)
            .zip(&self.explicit)
            .map(|((name, domain), &explicit)| {
                if explicit {
                    domain.clone()
                } else {
                    let own: Vec<&LiteralBound> =
                        narrowing.iter().filter(|b| b.param == name).collect();
                    bounds::narrow(domain, &own)
                }
            })
            .collect()
    }

    /// The ordered candidate list, at most `probe_budget` long.
    pub fn plan(&self) -> Result<Vec<Candidate>, GenerationError> {
        let id = self.operation.operation();
        let budget = self.config.probe_budget;

        for (index, values) in self.config.regressions.iter().enumerate() {
            if values.len() != id.arity() {
                return Err(GenerationError::RegressionArity {
                    operation: id.name.clone(),
                    index,
                    expected: id.arity(),
                    got: values.len(),
                });
            }
        }

        let mut plan: Vec<Candidate> = self
            .config
            .regressions
            .iter()
            .take(budget)
            .map(|values| Candidate {
                source: CandidateSource::Regression,
                values: values.clone(),
            })
            .collect();

        let (narrowing, all_bounds) = self.literal_bounds();
        let domains = self.effective(&narrowing);

        let lists: Vec<Vec<Value>> = id
            .param_names()
            .zip(&domains)
            .map(|(name, domain)| {
                let literals: Vec<i64> = all_bounds
                    .iter()
                    .filter(|b| b.param == name)
                    .map(|b| b.literal)
                    .collect();
                sample::boundary_values(domain, &literals)
            })
            .collect();
        plan.extend(
            sample::product(&lists, budget - plan.len())
                .into_iter()
                .map(|values| Candidate {
                    source: CandidateSource::Boundary,
                    values,
                }),
        );

        let count = self.config.random_samples.min(budget - plan.len());
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        for _ in 0..count {
            let values = domains
                .iter()
                .map(|d| sample::random_value(d, &mut rng))
                .collect();
            plan.push(Candidate {
                source: CandidateSource::Random,
                values,
            });
        }

        Ok(plan)
    }

    /// Runs the plan and collects the report.
    ///
    /// Stops early once the counterexample cap is reached. A condition that
    /// errors or panics aborts the run with [`GenerationError::ContractDefect`].
    pub fn run(&self) -> Result<GenerationReport, GenerationError> {
        let id = self.operation.operation();
        let plan = self.plan()?;
        tracing::info!(
            operation = %id,
            seed = self.config.seed,
            candidates = plan.len(),
            parallel = self.config.parallel,
            "generation started"
        );

        let mut report = GenerationReport::new(id.clone(), self.config.seed);
        let mut capped = false;

        if self.config.parallel {
            let outcomes: Vec<Result<Probe, GenerationError>> =
                plan.par_iter().map(|c| self.probe(c)).collect();
            for outcome in outcomes {
                if self.absorb(&mut report, outcome?) {
                    capped = true;
                    break;
                }
            }
        } else {
            for candidate in &plan {
                if self.absorb(&mut report, self.probe(candidate)?) {
                    capped = true;
                    break;
                }
            }
        }

        report.halt = if capped {
            HaltReason::CounterexampleCap
        } else if plan.len() >= self.config.probe_budget {
            HaltReason::BudgetExhausted
        } else {
            HaltReason::CandidatesExhausted
        };

        tracing::info!(
            operation = %id,
            probes = report.probes_run,
            passed = report.passed,
            skipped = report.skipped,
            counterexamples = report.counterexamples.len(),
            anomalies = report.anomalies.len(),
            halt = ?report.halt,
            "generation finished"
        );
        Ok(report)
    }

    // Folds one outcome into the report; true when the cap is reached.
    fn absorb(&self, report: &mut GenerationReport, probe: Probe) -> bool {
        report.probes_run += 1;
        match probe {
            Probe::Passed => report.passed += 1,
            Probe::Skipped => report.skipped += 1,
            Probe::DeclaredError => report.declared_errors += 1,
            Probe::Unimplemented => report.unimplemented += 1,
            Probe::Counterexample(c) => report.counterexamples.push(c),
            Probe::Anomaly(c) => report.anomalies.push(c),
        }
        let cap = self.config.max_counterexamples;
        cap > 0 && report.failures() >= cap
    }

    fn probe(&self, candidate: &Candidate) -> Result<Probe, GenerationError> {
        let TracedCall { result, phases } = self
            .operation
            .call_traced(Enablement::ALL, candidate.values.clone());
        let executed = phases.contains(&CallPhase::Executing);
        let record = self.operation.record();

        let probe = match result {
            Ok(_) => Probe::Passed,
            Err(CallError::Violation(v)) if v.kind == ContractKind::Precondition && !executed => {
                Probe::Skipped
            }
            Err(CallError::Violation(v)) => {
                let reason = FailureReason::Violation {
                    contract: v.kind,
                    operation: v.operation.name.clone(),
                    condition: v.condition.clone(),
                    boundary: v.boundary,
                };
                Probe::Counterexample(self.counterexample(candidate, v.result, reason, phases)?)
            }
            Err(CallError::Operation(e)) if e.is_unimplemented() => Probe::Unimplemented,
            Err(CallError::Operation(e)) if record.declares(&e.kind) => Probe::DeclaredError,
            Err(CallError::Operation(e)) => {
                let reason = FailureReason::UndeclaredError {
                    error_kind: e.kind,
                    message: e.message,
                };
                Probe::Anomaly(self.counterexample(candidate, None, reason, phases)?)
            }
            Err(CallError::Engine(source)) => {
                return Err(GenerationError::ContractDefect {
                    operation: record.operation().name.clone(),
                    arguments: Args::bind(record.operation(), candidate.values.clone())?,
                    source,
                })
            }
            Err(CallError::Binding(err)) => return Err(err.into()),
        };

        tracing::debug!(
            operation = %record.operation().name,
            source = ?candidate.source,
            outcome = probe_label(&probe),
            "probe"
        );
        Ok(probe)
    }

    fn counterexample(
        &self,
        candidate: &Candidate,
        result: Option<Value>,
        reason: FailureReason,
        phases: Vec<CallPhase>,
    ) -> Result<Counterexample, GenerationError> {
        let id = self.operation.operation();
        Ok(Counterexample {
            operation: id.clone(),
            arguments: Args::bind(id, candidate.values.clone())?,
            result,
            reason,
            source: candidate.source,
            phases,
        })
    }
}

fn probe_label(probe: &Probe) -> &'static str {
    match probe {
        Probe::Passed => "passed",
        Probe::Skipped => "skipped",
        Probe::DeclaredError => "declared_error",
        Probe::Unimplemented => "unimplemented",
        Probe::Counterexample(_) => "counterexample",
        Probe::Anomaly(_) => "anomaly",
    }
}
