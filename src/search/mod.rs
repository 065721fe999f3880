//! Search driver
//!
//! A [`Search`] builds the field and the mask plan, then walks the
//! odometer over every planned pair. Each candidate whose denominator has
//! no root is tested for bijectivity, novelty and coprimality; accepted
//! candidates are expanded to their equivalence class and appended to the
//! result file. The sweep position is checkpointed so an interrupted run
//! can pick up where it stopped.

mod closure;
mod mask;
mod odometer;
mod progress;

pub use closure::{closure, Candidate, Coefficients, EquivalenceClass, ShiftClosure};
pub use mask::{
    choose_lock, fraction_denominator_masks, fraction_numerator_masks, polynomial_masks,
    CoefficientMask, Lock, MaskPair, Phase, PlannedPair, SearchMode, SearchPlan, Side,
};
pub use odometer::{Advance, EnumeratorState};
pub use progress::{estimate, ProgressEstimate, Ticker};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::algebra::{
    is_one, ArithmeticError, Element, Field, FieldBuilder, FieldPolynomial, Poly, PolyRing, ONE,
    ZERO,
};
use crate::ledger::{
    read_results, CheckpointRecord, CheckpointState, CheckpointStore, LedgerError, ResultLog,
};
use crate::orbit::RepresentativeTable;
use crate::{SearchConfig, SearchError};

/// Runtime knobs that do not change what a search finds.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Directory holding the result and checkpoint files.
    pub output_dir: PathBuf,
    /// Time between periodic checkpoints.
    pub checkpoint_interval: Duration,
    /// Set from outside to stop at the next candidate boundary.
    pub stop: Arc<AtomicBool>,
    /// Stop after checking this many candidates in this run.
    pub candidate_budget: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            checkpoint_interval: Duration::from_secs(60),
            stop: Arc::new(AtomicBool::new(false)),
            candidate_budget: None,
        }
    }
}

/// What a run achieved.
#[derive(Debug, Clone)]
pub struct SearchSummary {
    /// Defining polynomial of the field searched.
    pub irreducible: FieldPolynomial,
    /// Candidates accounted for, across resumed runs.
    pub count: u64,
    /// Candidates a complete search accounts for.
    pub total: u64,
    /// Distinct results recorded so far.
    pub found: usize,
    /// Result file.
    pub results_path: PathBuf,
    /// Checkpoint file.
    pub checkpoint_path: PathBuf,
    /// Wall time of this run.
    pub elapsed: Duration,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Every candidate was checked; the checkpoint is marked complete.
    Complete(SearchSummary),
    /// Stopped early; the checkpoint holds the next candidate.
    Interrupted(SearchSummary),
}

impl SearchOutcome {
    /// Summary of the run.
    pub fn summary(&self) -> &SearchSummary {
        match self {
            SearchOutcome::Complete(summary) | SearchOutcome::Interrupted(summary) => summary,
        }
    }

    /// True if the search finished.
    pub fn is_complete(&self) -> bool {
        matches!(self, SearchOutcome::Complete(_))
    }
}

/// A configured search.
#[derive(Debug, Clone)]
pub struct Search {
    config: SearchConfig,
    options: SearchOptions,
}

impl Search {
    /// Validate `config` and prepare a run.
    pub fn new(config: SearchConfig, options: SearchOptions) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self { config, options })
    }

    /// Parameters of this search.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run to completion or interruption, resuming from the checkpoint
    /// when one exists.
    pub fn run(&self) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let names = self.config.file_name();
        let mode = self.config.mode();
        let results_path = self.options.output_dir.join(names.results());
        let store = CheckpointStore::new(self.options.output_dir.join(names.checkpoint()));

        let resume = match store.load()? {
            Some(CheckpointState::Complete) => {
                return Err(SearchError::ResultFileCollision { path: results_path })
            }
            Some(CheckpointState::InProgress(record)) => Some(record),
            None => None,
        };

        let (field, found, log): (Field, HashSet<Candidate>, ResultLog) = match &resume {
            Some(record) => {
                let results = read_results(&results_path, &names)?;
                let field = rebuild_field(self.config.p, self.config.r, &results.header)?;
                let log = ResultLog::reopen(&results_path, &results, mode)?;
                info!(count = record.count, found = results.candidates.len(), "resuming search");
                (field, results.candidates.into_iter().collect(), log)
            }
            None => {
                let mut builder = FieldBuilder::new(self.config.p, self.config.r);
                if let Some(seed) = self.config.seed {
                    builder = builder.seed(seed);
                }
                let field = builder.build()?;
                let log = ResultLog::create(&results_path, field.irreducible(), mode)?;
                (field, HashSet::new(), log)
            }
        };

        let reps = RepresentativeTable::new(&field, self.config.f_degree.max(self.config.g_degree));
        let plan = SearchPlan::new(&self.config, reps);
        let mut sweep = Sweep {
            ring: PolyRing::new(&field),
            verbose: self.config.verbose,
            log,
            found,
        };

        let mut state = match &resume {
            Some(record) => restore(&plan, record)?,
            None => EnumeratorState::start(&plan, 0, 0),
        };
        let start_count = state.count;
        let mut checked = 0u64;
        let mut pending = false;

        if resume.is_none() {
            if let Some(base) = plan.base_candidate() {
                let ones = vec![ONE; field.order() as usize];
                pending = sweep.check(&base, &[ONE], &ones, ShiftClosure::None)?;
                state.count += 1;
                checked += 1;
            }
        }

        let summary = |state: &EnumeratorState, found: usize| SearchSummary {
            irreducible: field.irreducible().clone(),
            count: state.count,
            total: plan.total(),
            found,
            results_path: results_path.clone(),
            checkpoint_path: store.path().to_path_buf(),
            elapsed: started.elapsed(),
        };

        let ticker = Ticker::spawn(self.options.checkpoint_interval);
        while !state.is_done(&plan) {
            let budget_spent = self
                .options
                .candidate_budget
                .is_some_and(|budget| checked >= budget);
            if budget_spent || self.options.stop.load(Ordering::Relaxed) {
                store.save(&checkpoint_record(&plan, &state))?;
                info!(count = state.count, total = plan.total(), "search interrupted");
                return Ok(SearchOutcome::Interrupted(summary(&state, sweep.found.len())));
            }
            if ticker.take_checkpoint_due() || pending {
                store.save(&checkpoint_record(&plan, &state))?;
                pending = false;
            }
            if ticker.take_progress_due() {
                let est = estimate(state.count, plan.total(), start_count, started.elapsed());
                info!(
                    percent = %format!("{:.2}", est.percent),
                    elapsed_secs = est.elapsed.as_secs(),
                    remaining_secs = ?est.remaining.map(|d| d.as_secs()),
                    found = sweep.found.len(),
                    "progress"
                );
            }

            let pair = &plan.pairs()[state.pair];
            if state.g_values.is_none() {
                let values = sweep.ring.eval_all(&state.g);
                if values.contains(&ZERO) {
                    state.count = state.count.saturating_add(pair.numerator_block);
                    if state.advance_denominator(&plan) == Advance::Exhausted {
                        state.next_pair(&plan);
                    }
                    continue;
                }
                state.g_values = Some(values);
            }
            if let Some(g_values) = &state.g_values {
                if sweep.check(&state.f, &state.g, g_values, plan.shift_closure(pair))? {
                    pending = true;
                }
            }
            state.count += 1;
            checked += 1;
            if state.advance(&plan) == Advance::Exhausted {
                state.next_pair(&plan);
            }
        }
        drop(ticker);

        if state.count != plan.total() {
            warn!(count = state.count, total = plan.total(), "candidate count differs from plan");
        }
        store.mark_complete()?;
        let summary = summary(&state, sweep.found.len());
        info!(
            found = summary.found,
            count = summary.count,
            elapsed_secs = summary.elapsed.as_secs(),
            results = %summary.results_path.display(),
            "search complete"
        );
        Ok(SearchOutcome::Complete(summary))
    }
}

/// Candidate tests plus the state they update.
struct Sweep<'f> {
    ring: PolyRing<'f>,
    verbose: bool,
    log: ResultLog,
    found: HashSet<Candidate>,
}

impl Sweep<'_> {
    /// Test one candidate; on acceptance record its whole class.
    fn check(
        &mut self,
        f: &[Element],
        g: &[Element],
        g_values: &[Element],
        shift: ShiftClosure,
    ) -> Result<bool, SearchError> {
        if !is_permutation(&self.ring, f, g_values)? {
            return Ok(false);
        }
        let candidate = Candidate::new(f.to_vec(), g.to_vec());
        if self.found.contains(&candidate) || !is_one(&self.ring.gcd(f, g)) {
            return Ok(false);
        }

        // The accepted candidate goes last: if it reached the file, so did
        // the rest of its class.
        let class = closure(&self.ring, f, g, shift)?;
        let unseen = class
            .iter()
            .filter(|c| **c != candidate && !self.found.contains(*c))
            .chain(std::iter::once(&candidate));
        let written = self.log.write_class(unseen)?;
        self.found.extend(class);
        self.found.insert(candidate.clone());
        if self.verbose {
            info!(candidate = %candidate, new = written, found = self.found.len(), "accepted");
        } else {
            debug!(candidate = %candidate, new = written, found = self.found.len(), "accepted");
        }
        Ok(true)
    }
}

/// True if `x -> f(x) / g(x)` is a bijection, given the values of a
/// root-free `g` at every element.
pub fn is_permutation(
    ring: &PolyRing<'_>,
    f: &[Element],
    g_values: &[Element],
) -> Result<bool, ArithmeticError> {
    let field = ring.field();
    let mut hit = vec![false; field.order() as usize];
    for x in field.elements() {
        let value = field.div(ring.eval(f, x), g_values[x as usize])?;
        if std::mem::replace(&mut hit[value as usize], true) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn checkpoint_record(plan: &SearchPlan, state: &EnumeratorState) -> CheckpointRecord {
    let masks = &plan.pairs()[state.pair].masks;
    CheckpointRecord {
        count: state.count,
        masks: masks.to_string(),
        f: state.f.clone(),
        g: state.g.clone(),
        lock_cursor: state.lock_cursor,
        phase: masks.phase,
    }
}

/// Field named by the first line of an existing result file.
pub(crate) fn rebuild_field(p: u32, r: u32, header: &str) -> Result<Field, SearchError> {
    let poly = FieldPolynomial::parse(header, p).ok_or_else(|| {
        LedgerError::CorruptResults {
            line: 1,
            reason: format!("cannot parse defining polynomial {header:?}"),
        }
    })?;
    Ok(FieldBuilder::new(p, r)
        .irreducible(poly.coeffs().to_vec())
        .build()?)
}

/// Rebuild the odometer from a checkpoint, rejecting any position the plan
/// could not have produced.
fn restore(plan: &SearchPlan, record: &CheckpointRecord) -> Result<EnumeratorState, LedgerError> {
    let index = plan.find_pair(record.phase, &record.masks).ok_or_else(|| {
        LedgerError::checkpoint(2, format!("mask pair {:?} is not part of this search", record.masks))
    })?;
    if record.count > plan.total() {
        return Err(LedgerError::checkpoint(
            1,
            format!("count {} exceeds the total {}", record.count, plan.total()),
        ));
    }

    let mut state = EnumeratorState::start(plan, index, record.count);
    let pair = &plan.pairs()[index];
    check_digits(&record.f, &state.f, &pair.masks.f, plan.order())?;
    check_digits(&record.g, &state.g, &pair.masks.g, plan.order())?;

    match pair.lock {
        Some(lock) => {
            let value = match lock.side {
                Side::Numerator => record.f[lock.position],
                Side::Denominator => record.g[lock.position],
            };
            let reps = plan.representatives().get(lock.position);
            if reps.get(record.lock_cursor) != Some(value) {
                return Err(LedgerError::checkpoint(
                    4,
                    format!(
                        "lock cursor {} does not select coefficient {value}",
                        record.lock_cursor
                    ),
                ));
            }
        }
        None if record.lock_cursor != 0 => {
            return Err(LedgerError::checkpoint(4, "lock cursor set on an unlocked pair"));
        }
        None => {}
    }

    state.f = record.f.clone();
    state.g = record.g.clone();
    state.lock_cursor = record.lock_cursor;
    Ok(state)
}

fn check_digits(
    saved: &[Element],
    initial: &Poly,
    mask: &CoefficientMask,
    order: u32,
) -> Result<(), LedgerError> {
    if saved.len() != initial.len() {
        return Err(LedgerError::checkpoint(
            3,
            format!("expected {} coefficients, found {}", initial.len(), saved.len()),
        ));
    }
    for (pos, (&value, &start)) in saved.iter().zip(initial).enumerate() {
        let valid = if mask.is_free(pos) {
            value != ZERO && value < order
        } else {
            value == start
        };
        if !valid {
            return Err(LedgerError::checkpoint(
                3,
                format!("coefficient {value} at position {pos} is outside the sweep"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_permutation_polynomial() {
        let field = FieldBuilder::new(3, 1).build().unwrap();
        let ring = PolyRing::new(&field);
        let ones = vec![ONE; 3];
        // x^3 permutes GF(3), x^2 does not
        assert!(is_permutation(&ring, &[1, 0, 0, 0], &ones).unwrap());
        assert!(!is_permutation(&ring, &[1, 0, 0], &ones).unwrap());
    }

    #[test]
    fn test_is_permutation_fraction() {
        let field = FieldBuilder::new(3, 1).build().unwrap();
        let ring = PolyRing::new(&field);
        // x^2 + 1 has no root in GF(3) but is even, so 1/g repeats values
        let g = vec![1, 0, 1];
        let g_values = ring.eval_all(&g);
        assert!(!g_values.contains(&ZERO));
        assert!(!is_permutation(&ring, &[1], &g_values).unwrap());
    }

    #[test]
    fn test_restore_rejects_foreign_masks() {
        let config = SearchConfig::new(2, 2, 3, 0);
        let field = FieldBuilder::new(2, 2).seed(3).build().unwrap();
        let plan = SearchPlan::new(&config, RepresentativeTable::new(&field, 3));
        let state = EnumeratorState::start(&plan, 0, 1);
        let mut record = checkpoint_record(&plan, &state);
        assert_eq!(restore(&plan, &record).unwrap(), state);

        record.masks = "1111 / 0".to_string();
        assert!(matches!(
            restore(&plan, &record),
            Err(LedgerError::CorruptCheckpoint { line: 2, .. })
        ));
    }

    #[test]
    fn test_restore_rejects_out_of_sweep_values() {
        let config = SearchConfig::new(3, 1, 3, 1);
        let field = FieldBuilder::new(3, 1).build().unwrap();
        let plan = SearchPlan::new(&config, RepresentativeTable::new(&field, 3));
        let state = EnumeratorState::start(&plan, 0, 0);

        let mut record = checkpoint_record(&plan, &state);
        record.f[0] = 2;
        assert!(matches!(
            restore(&plan, &record),
            Err(LedgerError::CorruptCheckpoint { line: 3, .. })
        ));

        let mut record = checkpoint_record(&plan, &state);
        record.g.push(1);
        assert!(matches!(
            restore(&plan, &record),
            Err(LedgerError::CorruptCheckpoint { line: 3, .. })
        ));
    }
}
